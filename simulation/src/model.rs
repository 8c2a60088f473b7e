use federation::{Parameters, ParticipantErr, Tensor, participant};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

/// A linear regressor, `y = x · w + b`.
///
/// Its parameters are laid out as a `[1, features]` weights tensor followed by a `[1]` bias.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    weights: Array1<f32>,
    bias: f32,
}

impl LinearModel {
    pub fn new(weights: Array1<f32>, bias: f32) -> Self {
        Self { weights, bias }
    }

    pub fn zeros(features: usize) -> Self {
        Self::new(Array1::zeros(features), 0.)
    }

    /// Returns the shapes of the parameters of a model with `features` inputs.
    pub fn shapes(features: usize) -> Vec<Vec<usize>> {
        vec![vec![1, features], vec![1]]
    }

    /// Rebuilds a model from the global parameters.
    ///
    /// # Arguments
    /// * `params` - The global parameters.
    /// * `features` - The amount of inputs of the data the model will see.
    ///
    /// # Returns
    /// The model or a `ParticipantErr` if the parameters aren't the layout of a linear model
    /// with `features` inputs.
    pub fn from_parameters(params: &Parameters, features: usize) -> participant::Result<Self> {
        match params.tensors() {
            [weights, bias] if weights.len() == features && bias.len() == 1 => Ok(Self::new(
                Array1::from(weights.data().to_vec()),
                bias.data()[0],
            )),
            _ => Err(ParticipantErr::failed(format!(
                "expected a linear layout of {features} features, got {:?}",
                params.shapes()
            ))),
        }
    }

    pub fn into_parameters(self) -> participant::Result<Parameters> {
        let features = self.weights.len();
        let weights = Tensor::new(vec![1, features], self.weights.to_vec())?;
        let bias = Tensor::new(vec![1], vec![self.bias])?;
        Ok(Parameters::new(vec![weights, bias]))
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Array1<f32> {
        x.dot(&self.weights) + self.bias
    }

    /// Runs one epoch of mini-batch gradient descent over the mean squared error.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    /// * `y` - The targets.
    /// * `batch_size` - The amount of rows per step.
    /// * `learning_rate` - The step size.
    pub fn sgd_epoch(
        &mut self,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        batch_size: usize,
        learning_rate: f32,
    ) {
        let batch_size = batch_size.max(1);

        for (xb, yb) in x
            .axis_chunks_iter(Axis(0), batch_size)
            .zip(y.axis_chunks_iter(Axis(0), batch_size))
        {
            let scale = 2. / yb.len() as f32;
            let err = self.predict(xb) - yb;

            let grad_w = xb.t().dot(&err) * scale;
            let grad_b = err.sum() * scale;

            self.weights.scaled_add(-learning_rate, &grad_w);
            self.bias -= learning_rate * grad_b;
        }
    }

    /// Returns the mean squared and mean absolute errors over a set of samples.
    pub fn errors(&self, x: ArrayView2<f32>, y: ArrayView1<f32>) -> (f64, f64) {
        let err = self.predict(x) - y;
        let mse = err.mapv(|e| e.powi(2)).mean().unwrap_or_default();
        let mae = err.mapv(f32::abs).mean().unwrap_or_default();
        (mse as f64, mae as f64)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    #[test]
    fn parameters_layout() {
        let model = LinearModel::new(array![1., 2., 3.], 0.5);
        let params = model.clone().into_parameters().unwrap();

        assert_eq!(params.shapes(), LinearModel::shapes(3));
        assert_eq!(LinearModel::from_parameters(&params, 3).unwrap(), model);
    }

    #[test]
    fn rejects_foreign_layouts() {
        let params = Parameters::new(vec![Tensor::from_vec(vec![1.])]);
        assert!(LinearModel::from_parameters(&params, 1).is_err());
    }

    #[test]
    fn rejects_other_feature_counts() {
        let params = LinearModel::zeros(3).into_parameters().unwrap();
        let err = LinearModel::from_parameters(&params, 4).unwrap_err();

        assert!(matches!(err, ParticipantErr::Failed(_)));
    }

    #[test]
    fn gradient_descent_fits_a_line() {
        let x = Array2::from_shape_fn((64, 1), |(i, _)| i as f32 / 64.);
        let y = x.column(0).mapv(|v| 3. * v - 1.);

        let mut model = LinearModel::zeros(1);
        let (before, _) = model.errors(x.view(), y.view());

        for _ in 0..500 {
            model.sgd_epoch(x.view(), y.view(), 16, 0.1);
        }

        let (after, _) = model.errors(x.view(), y.view());
        assert!(after < before / 100.);
    }
}
