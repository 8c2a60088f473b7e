use super::{Optimizer, SizeMismatchErr, error::check_sizes};

/// Adam on the pseudo-gradient, turns FedOpt into FedAdam.
///
/// Keeps the first and second moment estimates of one tensor across rounds, the step is
/// bias corrected by the number of rounds applied so far.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    steps: i32,
    first_moments: Vec<f32>,
    second_moments: Vec<f32>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The length of the tensor this instance updates.
    /// * `learning_rate` - The server learning rate.
    /// * `beta1` - Decay of the first moment estimate.
    /// * `beta2` - Decay of the second moment estimate.
    /// * `epsilon` - Keeps the adaptive step finite.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            steps: 0,
            first_moments: vec![0.; len],
            second_moments: vec![0.; len],
        }
    }

    /// The learning rate of the current step, scaled by both bias corrections.
    fn corrected_rate(&self) -> f32 {
        let first = 1. - self.beta1.powi(self.steps);
        let second = 1. - self.beta2.powi(self.steps);
        self.learning_rate * second.sqrt() / first
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<(), SizeMismatchErr> {
        check_sizes(grad, params)?;
        check_sizes(grad, &self.first_moments)?;

        self.steps = self.steps.saturating_add(1);
        let rate = self.corrected_rate();
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        let moments = self.first_moments.iter_mut().zip(&mut self.second_moments);

        for ((param, g), (m, v)) in params.iter_mut().zip(grad).zip(moments) {
            *m = beta1 * *m + (1. - beta1) * g;
            *v = beta2 * *v + (1. - beta2) * g * g;
            *param -= rate * *m / (v.sqrt() + epsilon);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_against_gradient() {
        let mut optimizer = Adam::new(2, 0.1, 0.9, 0.999, 1e-8);
        let mut params = [1., 1.];

        optimizer.update_params(&[1., -1.], &mut params).unwrap();
        assert!((params[0] - 0.9).abs() < 1e-4);
        assert!((params[1] - 1.1).abs() < 1e-4);
    }

    #[test]
    fn zero_gradient_keeps_parameters() {
        let mut optimizer = Adam::new(1, 0.1, 0.9, 0.999, 1e-8);
        let mut params = [3.];

        optimizer.update_params(&[0.], &mut params).unwrap();
        assert_eq!(params, [3.]);
    }

    #[test]
    fn rejects_foreign_tensors() {
        let mut optimizer = Adam::new(2, 0.1, 0.9, 0.999, 1e-8);
        let mut params = [0.; 3];

        let err = optimizer.update_params(&[0.; 3], &mut params).unwrap_err();
        assert_eq!(err, SizeMismatchErr { grad: 3, params: 2 });
    }
}
