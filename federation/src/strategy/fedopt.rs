use log::debug;

use super::{AggregationErr, FedAvg, Instructions, Strategy};
use crate::{
    error::ConfigErr,
    optimization::Optimizer,
    parameters::Parameters,
    participant::{EvaluateRes, Failure, FitRes, ParticipantId},
    scalar::Metrics,
};

/// Federated averaging followed by a server side optimizer step.
///
/// Every round the weighted average produced by `FedAvg` is turned into a pseudo-gradient,
/// `current - average`, which the server optimizer applies to the current parameters. With
/// plain gradient descent and a learning rate of `1` this is exactly `FedAvg`, with momentum
/// it's FedAvgM and with Adam it's FedAdam.
///
/// The optimizer state advanced by a round is only kept once the next round starts from the
/// parameters that round produced, so abandoned or rejected rounds leave no trace.
pub struct FedOpt<O: Optimizer + Clone> {
    inner: FedAvg,
    optimizer_factory: Box<dyn Fn(usize) -> O + Send>,
    optimizers: Vec<O>,
    pending: Option<(Parameters, Vec<O>)>,
    current: Option<Parameters>,
}

impl<O: Optimizer + Clone> FedOpt<O> {
    /// Creates a new `FedOpt` strategy.
    ///
    /// # Arguments
    /// * `inner` - The averaging strategy handling sampling, configs and metrics.
    /// * `optimizer_factory` - Creates one optimizer per tensor given the tensor's length.
    ///
    /// # Returns
    /// A new `FedOpt` instance.
    pub fn new<F>(inner: FedAvg, optimizer_factory: F) -> Self
    where
        F: Fn(usize) -> O + Send + 'static,
    {
        Self {
            inner,
            optimizer_factory: Box::new(optimizer_factory),
            optimizers: Vec::new(),
            pending: None,
            current: None,
        }
    }

    /// Keeps the optimizer state of the previous round only if its parameters were committed.
    fn settle(&mut self, parameters: &Parameters) {
        let Some((produced, optimizers)) = self.pending.take() else {
            return;
        };

        if produced == *parameters {
            self.optimizers = optimizers;
        } else {
            debug!("previous round wasn't committed, discarding its optimizer state");
        }
    }

    /// Applies one optimizer step per tensor, moving `current` towards `average`.
    ///
    /// # Arguments
    /// * `current` - The parameters the round started from.
    /// * `average` - The weighted average of the participants' parameters.
    ///
    /// # Returns
    /// The updated parameters and the advanced optimizers, or an `AggregationErr` if the
    /// layouts differ.
    fn step(
        &self,
        mut current: Parameters,
        average: &Parameters,
    ) -> Result<(Parameters, Vec<O>), AggregationErr> {
        current.check_compatible(average)?;

        let mut optimizers = match self.optimizers.is_empty() {
            true => current
                .iter()
                .map(|tensor| (self.optimizer_factory)(tensor.len()))
                .collect(),
            false => self.optimizers.clone(),
        };

        for ((tensor, avg), optimizer) in current
            .tensors_mut()
            .iter_mut()
            .zip(average.iter())
            .zip(optimizers.iter_mut())
        {
            let grad: Vec<f32> = tensor
                .data()
                .iter()
                .zip(avg.data())
                .map(|(c, a)| c - a)
                .collect();

            optimizer.update_params(&grad, tensor.data_mut())?;
        }

        Ok((current, optimizers))
    }
}

impl<O: Optimizer + Clone> Strategy for FedOpt<O> {
    fn validate(&self, available: usize) -> Result<(), ConfigErr> {
        self.inner.validate(available)
    }

    fn initialize_parameters(&mut self) -> Option<Parameters> {
        self.inner.initialize_parameters()
    }

    fn configure_fit(
        &mut self,
        round: usize,
        parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Instructions, ConfigErr> {
        self.settle(parameters);
        self.current = Some(parameters.clone());
        self.inner.configure_fit(round, parameters, available)
    }

    fn aggregate_fit(
        &mut self,
        round: usize,
        results: Vec<(ParticipantId, FitRes)>,
        failures: &[Failure],
    ) -> Result<(Parameters, Metrics), AggregationErr> {
        let (average, metrics) = self.inner.aggregate_fit(round, results, failures)?;

        let Some(current) = self.current.take() else {
            return Ok((average, metrics));
        };

        debug!(round = round; "applying server optimizer step");
        let (parameters, optimizers) = self.step(current, &average)?;
        self.pending = Some((parameters.clone(), optimizers));
        Ok((parameters, metrics))
    }

    fn configure_evaluate(
        &mut self,
        round: usize,
        parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Option<Instructions>, ConfigErr> {
        self.inner.configure_evaluate(round, parameters, available)
    }

    fn aggregate_evaluate(
        &mut self,
        round: usize,
        results: Vec<(ParticipantId, EvaluateRes)>,
        failures: &[Failure],
    ) -> Result<(f64, Metrics), AggregationErr> {
        self.inner.aggregate_evaluate(round, results, failures)
    }

    fn evaluate(&mut self, round: usize, parameters: &Parameters) -> Option<(f64, Metrics)> {
        self.inner.evaluate(round, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        optimization::{GradientDescent, GradientDescentWithMomentum},
        parameters::Tensor,
        participant::ParticipantErr,
    };

    fn scalar_params(value: f32) -> Parameters {
        Parameters::new(vec![Tensor::from_vec(vec![value])])
    }

    fn fit_res(num_samples: u64, value: f32) -> FitRes {
        FitRes {
            parameters: scalar_params(value),
            num_samples,
            metrics: Metrics::new(),
        }
    }

    fn run_round<O: Optimizer + Clone>(
        strategy: &mut FedOpt<O>,
        round: usize,
        current: &Parameters,
        results: Vec<(ParticipantId, FitRes)>,
    ) -> Parameters {
        strategy.configure_fit(round, current, &[0, 1]).unwrap();
        strategy.aggregate_fit(round, results, &[]).unwrap().0
    }

    #[test]
    fn unit_learning_rate_matches_fedavg() {
        let mut strategy = FedOpt::new(FedAvg::new(), |_| GradientDescent::new(1.));
        let results = vec![(0, fit_res(400, 1.0)), (1, fit_res(100, 5.0))];

        let params = run_round(&mut strategy, 1, &scalar_params(0.), results);
        assert!((params.tensors()[0].data()[0] - 1.8).abs() < 1e-6);
    }

    #[test]
    fn momentum_keeps_moving() {
        let mut strategy = FedOpt::new(FedAvg::new(), |len| {
            GradientDescentWithMomentum::new(len, 1., 0.5)
        });

        let first = run_round(
            &mut strategy,
            1,
            &scalar_params(0.),
            vec![(0, fit_res(1, 1.0)), (1, fit_res(1, 1.0))],
        );
        assert!((first.tensors()[0].data()[0] - 1.0).abs() < 1e-6);

        // The participants agree with the current parameters, only the velocity moves them.
        let second = run_round(
            &mut strategy,
            2,
            &first,
            vec![(0, fit_res(1, 1.0)), (1, fit_res(1, 1.0))],
        );
        assert!((second.tensors()[0].data()[0] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn inner_rejections_propagate() {
        let mut strategy = FedOpt::new(FedAvg::new().with_accept_failures(false), |_| {
            GradientDescent::new(1.)
        });
        let failures = [Failure {
            participant: 1,
            error: ParticipantErr::failed("boom"),
        }];

        strategy.configure_fit(1, &scalar_params(0.), &[0, 1]).unwrap();
        let err = strategy
            .aggregate_fit(1, vec![(0, fit_res(1, 1.0))], &failures)
            .unwrap_err();
        assert_eq!(err, AggregationErr::FailuresNotAccepted { failures: 1 });
    }

    #[test]
    fn uncommitted_rounds_leave_no_momentum() {
        let mut strategy = FedOpt::new(FedAvg::new(), |len| {
            GradientDescentWithMomentum::new(len, 1., 0.5)
        });
        let results = || vec![(0, fit_res(1, 1.0)), (1, fit_res(1, 1.0))];

        let first = run_round(&mut strategy, 1, &scalar_params(0.), results());
        assert!((first.tensors()[0].data()[0] - 1.0).abs() < 1e-6);

        // The first round was abandoned, the next one starts again from zero.
        let retry = run_round(&mut strategy, 1, &scalar_params(0.), results());
        assert!((retry.tensors()[0].data()[0] - 1.0).abs() < 1e-6);
    }
}
