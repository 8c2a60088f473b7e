use super::Result;
use crate::parameters::{Parameters, Tensor};

/// A `ParamGen` generates values for the initial state of the global parameters.
pub trait ParamGen {
    /// Should generate the values of a tensor, in row-major order.
    ///
    /// # Arguments
    /// * `shape` - The shape of the tensor, its product is the amount of values to generate.
    ///
    /// # Returns
    /// The generated values or a `RandErr` if the generator can't produce them.
    fn sample(&mut self, shape: &[usize]) -> Result<Vec<f32>>;
}

/// Returns the `(fan_in, fan_out)` of a tensor.
///
/// Matrices are laid out as `[out, in]`, any trailing dimension is part of the receptive
/// field. Scalars and vectors use their length for both.
pub fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [out, input, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (input * receptive, out * receptive)
        }
    }
}

/// Generates a whole parameter set, one tensor per shape.
///
/// # Arguments
/// * `param_gen` - The generator to draw the values from.
/// * `shapes` - The shapes of the tensors, in order.
///
/// # Returns
/// The generated parameters or a `RandErr` if the generator failed.
pub fn generate(param_gen: &mut dyn ParamGen, shapes: &[Vec<usize>]) -> Result<Parameters> {
    shapes
        .iter()
        .map(|shape| -> Result<Tensor> {
            let data = param_gen.sample(shape)?;
            Ok(Tensor::new(shape.clone(), data)?)
        })
        .collect()
}
