use super::SizeMismatchErr;

/// A server side update rule, it moves the global parameters along the pseudo-gradient
/// of a round, the difference between the current parameters and the participants' average.
pub trait Optimizer: Send {
    /// Updates `params` in place.
    ///
    /// # Arguments
    /// * `grad` - The pseudo-gradient of one tensor.
    /// * `params` - The values of that same tensor.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad` and `params`.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<(), SizeMismatchErr>;
}
