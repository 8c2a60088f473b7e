use super::{ParamGen, Result};

/// A parameter generator that always generates the same value.
pub struct ConstParamGen {
    value: f32,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, shape: &[usize]) -> Result<Vec<f32>> {
        Ok(vec![self.value; shape.iter().product()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_the_shape() {
        let mut param_gen = ConstParamGen::new(1.);

        assert_eq!(param_gen.sample(&[2, 2]).unwrap(), vec![1.; 4]);
        assert_eq!(param_gen.sample(&[]).unwrap(), [1.]);
        assert!(param_gen.sample(&[0, 3]).unwrap().is_empty());
    }
}
