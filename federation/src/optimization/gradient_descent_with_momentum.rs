use super::{Optimizer, SizeMismatchErr, error::check_sizes};

/// Gradient descent with server momentum, turns FedOpt into FedAvgM.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Vec<f32>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `len` - The length of the tensor this instance updates.
    /// * `learning_rate` - The server learning rate.
    /// * `momentum` - How much of the previous rounds' velocity is kept.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.; len],
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<(), SizeMismatchErr> {
        check_sizes(grad, params)?;
        check_sizes(grad, &self.velocity)?;

        let (lr, mu) = (self.learning_rate, self.momentum);

        for ((param, g), v) in params.iter_mut().zip(grad).zip(&mut self.velocity) {
            *v = mu * *v + g;
            *param -= lr * *v;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_accumulates() {
        let mut optimizer = GradientDescentWithMomentum::new(1, 1., 0.5);
        let mut params = [0.];

        optimizer.update_params(&[1.], &mut params).unwrap();
        assert_eq!(params, [-1.]);

        optimizer.update_params(&[1.], &mut params).unwrap();
        assert_eq!(params, [-2.5]);
    }
}
