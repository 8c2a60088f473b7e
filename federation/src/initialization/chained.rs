use super::{ParamGen, RandErr, Result};

/// A parameter generator that delegates every tensor to the next generator of a chain.
///
/// This becomes handy whenever one wants a different initialization for each tensor of the
/// model, e.g. Xavier for the weights and zeros for the biases.
pub struct ChainedParamGen {
    param_gens: Vec<Box<dyn ParamGen>>,
    curr: usize,
}

impl ChainedParamGen {
    /// Creates a new `ChainedParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `param_gens` - One generator per tensor, in order.
    pub fn new(param_gens: Vec<Box<dyn ParamGen>>) -> Self {
        Self {
            param_gens,
            curr: 0,
        }
    }
}

impl ParamGen for ChainedParamGen {
    fn sample(&mut self, shape: &[usize]) -> Result<Vec<f32>> {
        let Some(param_gen) = self.param_gens.get_mut(self.curr) else {
            return Err(RandErr::new(format!(
                "no generator left for tensor {} of shape {shape:?}",
                self.curr
            )));
        };

        self.curr += 1;
        param_gen.sample(shape)
    }
}
