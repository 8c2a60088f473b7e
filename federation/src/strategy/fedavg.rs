use log::warn;

use super::{
    AggregationErr, ConfigPolicy, Instructions, Sampler, Strategy, weighted_average, weighted_loss,
};
use crate::{
    error::ConfigErr,
    metrics::MetricsAggregator,
    parameters::Parameters,
    participant::{EvaluateRes, Failure, FitRes, ParticipantId},
    scalar::Metrics,
};

/// A server side evaluation callback, it receives the round number and the global parameters.
pub type EvaluateFn = Box<dyn Fn(usize, &Parameters) -> Option<(f64, Metrics)> + Send>;

/// Federated averaging.
///
/// Samples a fraction of the participants every round and replaces the global parameters
/// with the average of the returned ones, weighted by each participant's sample count.
pub struct FedAvg {
    fraction_fit: f64,
    fraction_evaluate: f64,
    min_fit: usize,
    min_evaluate: usize,
    min_available: usize,
    accept_failures: bool,
    initial_parameters: Option<Parameters>,
    sampler: Sampler,
    fit_config: ConfigPolicy,
    evaluate_config: ConfigPolicy,
    fit_metrics: Option<Box<dyn MetricsAggregator>>,
    evaluate_metrics: Option<Box<dyn MetricsAggregator>>,
    evaluate_fn: Option<EvaluateFn>,
    missing_fit_metrics_warned: bool,
    missing_evaluate_metrics_warned: bool,
}

impl Default for FedAvg {
    fn default() -> Self {
        Self::new()
    }
}

impl FedAvg {
    /// Creates a new `FedAvg` strategy.
    ///
    /// Every participant is sampled for both phases, at least two participants are required
    /// and failures are tolerated. Use the `with_*` methods to change any of these.
    ///
    /// # Returns
    /// A new `FedAvg` instance.
    pub fn new() -> Self {
        Self {
            fraction_fit: 1.,
            fraction_evaluate: 1.,
            min_fit: 2,
            min_evaluate: 2,
            min_available: 2,
            accept_failures: true,
            initial_parameters: None,
            sampler: Sampler::new(None),
            fit_config: ConfigPolicy::default(),
            evaluate_config: ConfigPolicy::default(),
            fit_metrics: None,
            evaluate_metrics: None,
            evaluate_fn: None,
            missing_fit_metrics_warned: false,
            missing_evaluate_metrics_warned: false,
        }
    }

    /// Seeds the participant sampler, making selections reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampler = Sampler::new(Some(seed));
        self
    }

    /// Sets the fraction of participants sampled for the fit phase.
    pub fn with_fraction_fit(mut self, fraction: f64) -> Self {
        self.fraction_fit = fraction;
        self
    }

    /// Sets the fraction of participants sampled for the evaluate phase, `0` disables it.
    pub fn with_fraction_evaluate(mut self, fraction: f64) -> Self {
        self.fraction_evaluate = fraction;
        self
    }

    pub fn with_min_fit(mut self, min_fit: usize) -> Self {
        self.min_fit = min_fit;
        self
    }

    pub fn with_min_evaluate(mut self, min_evaluate: usize) -> Self {
        self.min_evaluate = min_evaluate;
        self
    }

    /// Sets the least amount of participants that must exist for the run to start.
    pub fn with_min_available(mut self, min_available: usize) -> Self {
        self.min_available = min_available;
        self
    }

    /// Whether a round with failed participants still aggregates the successful ones.
    pub fn with_accept_failures(mut self, accept_failures: bool) -> Self {
        self.accept_failures = accept_failures;
        self
    }

    pub fn with_initial_parameters(mut self, parameters: Parameters) -> Self {
        self.initial_parameters = Some(parameters);
        self
    }

    pub fn with_fit_config(mut self, policy: impl Into<ConfigPolicy>) -> Self {
        self.fit_config = policy.into();
        self
    }

    pub fn with_evaluate_config(mut self, policy: impl Into<ConfigPolicy>) -> Self {
        self.evaluate_config = policy.into();
        self
    }

    pub fn with_fit_metrics(mut self, aggregator: impl MetricsAggregator + 'static) -> Self {
        self.fit_metrics = Some(Box::new(aggregator));
        self
    }

    pub fn with_evaluate_metrics(mut self, aggregator: impl MetricsAggregator + 'static) -> Self {
        self.evaluate_metrics = Some(Box::new(aggregator));
        self
    }

    /// Sets the server side evaluation callback.
    pub fn with_evaluate_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &Parameters) -> Option<(f64, Metrics)> + Send + 'static,
    {
        self.evaluate_fn = Some(Box::new(f));
        self
    }

    fn check_fraction(fraction: f64) -> Result<(), ConfigErr> {
        match (0.0..=1.0).contains(&fraction) {
            true => Ok(()),
            false => Err(ConfigErr::InvalidFraction(fraction)),
        }
    }
}

/// Hands the metrics of every result to `aggregator`, never failing the round over them.
///
/// # Arguments
/// * `aggregator` - The configured metrics aggregator, if any.
/// * `warned` - Whether the missing aggregator was already reported.
/// * `phase` - The phase name, for logging.
/// * `pairs` - Pairs of sample count and metrics.
///
/// # Returns
/// The aggregated metrics, or an empty map if there's no aggregator or it failed.
fn combine_metrics(
    aggregator: Option<&dyn MetricsAggregator>,
    warned: &mut bool,
    phase: &str,
    pairs: Vec<(u64, Metrics)>,
) -> Metrics {
    let Some(aggregator) = aggregator else {
        if !*warned {
            warn!("no {phase} metrics aggregator configured, {phase} metrics are dropped");
            *warned = true;
        }
        return Metrics::new();
    };

    aggregator.aggregate(&pairs).unwrap_or_else(|e| {
        warn!("failed to aggregate {phase} metrics: {e}");
        Metrics::new()
    })
}

impl Strategy for FedAvg {
    fn validate(&self, available: usize) -> Result<(), ConfigErr> {
        Self::check_fraction(self.fraction_fit)?;
        Self::check_fraction(self.fraction_evaluate)?;

        if self.min_available > available {
            return Err(ConfigErr::UnsatisfiableSelection {
                minimum: self.min_available,
                available,
            });
        }

        Sampler::selection_size(available, self.fraction_fit, self.min_fit)?;

        if self.fraction_evaluate > 0. {
            Sampler::selection_size(available, self.fraction_evaluate, self.min_evaluate)?;
        }

        Ok(())
    }

    fn initialize_parameters(&mut self) -> Option<Parameters> {
        self.initial_parameters.take()
    }

    fn configure_fit(
        &mut self,
        round: usize,
        _parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Instructions, ConfigErr> {
        let participants = self
            .sampler
            .select(available, self.fraction_fit, self.min_fit)?;

        Ok(Instructions {
            participants,
            config: self.fit_config.config(round),
        })
    }

    fn aggregate_fit(
        &mut self,
        _round: usize,
        results: Vec<(ParticipantId, FitRes)>,
        failures: &[Failure],
    ) -> Result<(Parameters, Metrics), AggregationErr> {
        if results.is_empty() {
            return Err(AggregationErr::NoResults);
        }

        if !self.accept_failures && !failures.is_empty() {
            return Err(AggregationErr::FailuresNotAccepted {
                failures: failures.len(),
            });
        }

        let weighted: Vec<_> = results
            .iter()
            .map(|(_, res)| (res.num_samples, &res.parameters))
            .collect();
        let parameters = weighted_average(&weighted)?;

        let pairs = results
            .into_iter()
            .map(|(_, res)| (res.num_samples, res.metrics))
            .collect();
        let metrics = combine_metrics(
            self.fit_metrics.as_deref(),
            &mut self.missing_fit_metrics_warned,
            "fit",
            pairs,
        );

        Ok((parameters, metrics))
    }

    fn configure_evaluate(
        &mut self,
        round: usize,
        _parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Option<Instructions>, ConfigErr> {
        if self.fraction_evaluate == 0. {
            return Ok(None);
        }

        let participants =
            self.sampler
                .select(available, self.fraction_evaluate, self.min_evaluate)?;

        Ok(Some(Instructions {
            participants,
            config: self.evaluate_config.config(round),
        }))
    }

    fn aggregate_evaluate(
        &mut self,
        _round: usize,
        results: Vec<(ParticipantId, EvaluateRes)>,
        failures: &[Failure],
    ) -> Result<(f64, Metrics), AggregationErr> {
        if results.is_empty() {
            return Err(AggregationErr::NoResults);
        }

        if !self.accept_failures && !failures.is_empty() {
            return Err(AggregationErr::FailuresNotAccepted {
                failures: failures.len(),
            });
        }

        let losses: Vec<_> = results
            .iter()
            .map(|(_, res)| (res.num_samples, res.loss))
            .collect();
        let loss = weighted_loss(&losses)?;

        let pairs = results
            .into_iter()
            .map(|(_, res)| (res.num_samples, res.metrics))
            .collect();
        let metrics = combine_metrics(
            self.evaluate_metrics.as_deref(),
            &mut self.missing_evaluate_metrics_warned,
            "evaluate",
            pairs,
        );

        Ok((loss, metrics))
    }

    fn evaluate(&mut self, round: usize, parameters: &Parameters) -> Option<(f64, Metrics)> {
        let evaluate_fn = self.evaluate_fn.as_ref()?;
        evaluate_fn(round, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics::WeightedAverage,
        parameters::Tensor,
        participant::ParticipantErr,
        scalar::{Config, Scalar},
    };

    fn fit_res(num_samples: u64, values: &[f32]) -> FitRes {
        FitRes {
            parameters: Parameters::new(vec![Tensor::from_vec(values.to_vec())]),
            num_samples,
            metrics: Metrics::new(),
        }
    }

    fn eval_res(num_samples: u64, loss: f64, accuracy: f64) -> EvaluateRes {
        EvaluateRes {
            loss,
            num_samples,
            metrics: Metrics::from([("accuracy".to_string(), Scalar::Float(accuracy))]),
        }
    }

    fn failure(participant: ParticipantId) -> Failure {
        Failure {
            participant,
            error: ParticipantErr::failed("boom"),
        }
    }

    #[test]
    fn validate_rejects_unsatisfiable_minimums() {
        let strategy = FedAvg::new().with_min_fit(5);
        assert_eq!(
            strategy.validate(4).unwrap_err(),
            ConfigErr::UnsatisfiableSelection {
                minimum: 5,
                available: 4
            }
        );

        let strategy = FedAvg::new().with_min_fit(1).with_min_evaluate(1).with_min_available(3);
        assert!(strategy.validate(2).is_err());
        assert!(strategy.validate(3).is_ok());

        let strategy = FedAvg::new().with_fraction_fit(2.);
        assert_eq!(strategy.validate(10).unwrap_err(), ConfigErr::InvalidFraction(2.));
    }

    #[test]
    fn evaluation_minimum_only_matters_when_enabled() {
        let strategy = FedAvg::new()
            .with_min_fit(1)
            .with_min_available(1)
            .with_min_evaluate(10)
            .with_fraction_evaluate(0.);
        assert!(strategy.validate(2).is_ok());
    }

    #[test]
    fn configure_fit_samples_and_configures() {
        let config = Config::from([("epochs".to_string(), Scalar::Int(2))]);
        let mut strategy = FedAvg::new()
            .with_seed(3)
            .with_fraction_fit(0.5)
            .with_fit_config(config.clone());
        let available: Vec<_> = (0..10).collect();

        let instructions = strategy
            .configure_fit(1, &Parameters::default(), &available)
            .unwrap();
        assert_eq!(instructions.participants.len(), 5);
        assert_eq!(instructions.config, config);
    }

    #[test]
    fn zero_evaluate_fraction_skips_evaluation() {
        let mut strategy = FedAvg::new().with_fraction_evaluate(0.);
        let available: Vec<_> = (0..10).collect();

        let instructions = strategy
            .configure_evaluate(1, &Parameters::default(), &available)
            .unwrap();
        assert!(instructions.is_none());
    }

    #[test]
    fn aggregate_fit_weights_by_samples() {
        let mut strategy = FedAvg::new();
        let results = vec![(0, fit_res(400, &[1.0])), (1, fit_res(100, &[5.0]))];

        let (params, metrics) = strategy.aggregate_fit(1, results, &[]).unwrap();
        assert!((params.tensors()[0].data()[0] - 1.8).abs() < 1e-6);
        assert!(metrics.is_empty());
    }

    #[test]
    fn failures_are_tolerated_by_default() {
        let mut strategy = FedAvg::new();
        let results = vec![(0, fit_res(10, &[1.0]))];

        let (params, _) = strategy.aggregate_fit(1, results, &[failure(1)]).unwrap();
        assert_eq!(params.tensors()[0].data(), [1.0]);
    }

    #[test]
    fn failures_can_be_rejected() {
        let mut strategy = FedAvg::new().with_accept_failures(false);
        let results = vec![(0, fit_res(10, &[1.0]))];

        let err = strategy.aggregate_fit(1, results, &[failure(1)]).unwrap_err();
        assert_eq!(err, AggregationErr::FailuresNotAccepted { failures: 1 });
    }

    #[test]
    fn empty_results_skip_aggregation() {
        let mut strategy = FedAvg::new();

        let err = strategy.aggregate_fit(1, vec![], &[failure(0)]).unwrap_err();
        assert_eq!(err, AggregationErr::NoResults);

        let err = strategy.aggregate_evaluate(1, vec![], &[]).unwrap_err();
        assert_eq!(err, AggregationErr::NoResults);
    }

    #[test]
    fn aggregate_evaluate_delegates_metrics() {
        let mut strategy = FedAvg::new().with_evaluate_metrics(WeightedAverage::new(["accuracy"]));
        let results = vec![(0, eval_res(100, 1.0, 0.5)), (1, eval_res(50, 4.0, 0.8))];

        let (loss, metrics) = strategy.aggregate_evaluate(1, results, &[]).unwrap();
        assert!((loss - 2.0).abs() < 1e-12);

        let accuracy = metrics["accuracy"].as_f64().unwrap();
        assert!((accuracy - 0.6).abs() < 1e-12);
    }

    #[test]
    fn metrics_are_not_fused_without_an_aggregator() {
        let mut strategy = FedAvg::new();
        let results = vec![(0, eval_res(100, 1.0, 0.5))];

        let (_, metrics) = strategy.aggregate_evaluate(1, results, &[]).unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn initial_parameters_are_handed_out_once() {
        let params = Parameters::new(vec![Tensor::from_vec(vec![1.0])]);
        let mut strategy = FedAvg::new().with_initial_parameters(params.clone());

        assert_eq!(strategy.initialize_parameters(), Some(params));
        assert_eq!(strategy.initialize_parameters(), None);
    }

    #[test]
    fn centralized_evaluation() {
        let mut strategy = FedAvg::new().with_evaluate_fn(|round, params| {
            Some((round as f64 + params.numel() as f64, Metrics::new()))
        });
        let params = Parameters::new(vec![Tensor::zeros(vec![3])]);

        assert_eq!(strategy.evaluate(2, &params).map(|(loss, _)| loss), Some(5.0));
        assert!(FedAvg::new().evaluate(2, &params).is_none());
    }
}
