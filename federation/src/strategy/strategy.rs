use crate::{
    error::ConfigErr,
    parameters::Parameters,
    participant::{EvaluateRes, Failure, FitRes, ParticipantId},
    scalar::{Config, Metrics},
};

use super::AggregationErr;

/// What a strategy hands out for one phase of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct Instructions {
    /// The selected participants, distinct and in ascending order.
    pub participants: Vec<ParticipantId>,
    /// The configuration given verbatim to every selected participant.
    pub config: Config,
}

/// The pluggable policy deciding who participates in each round and how their results
/// are combined.
pub trait Strategy: Send {
    /// Should check that the strategy can run with `available` participants.
    ///
    /// # Returns
    /// A `ConfigErr` if any of the strategy's constraints is unsatisfiable.
    fn validate(&self, _available: usize) -> Result<(), ConfigErr> {
        Ok(())
    }

    /// Should return the initial global parameters, if the strategy has them.
    fn initialize_parameters(&mut self) -> Option<Parameters> {
        None
    }

    /// Should select the participants and build the configuration of a fit phase.
    ///
    /// # Arguments
    /// * `round` - The round number, starting at 1.
    /// * `parameters` - The current global parameters.
    /// * `available` - Every participant id of the run.
    fn configure_fit(
        &mut self,
        round: usize,
        parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Instructions, ConfigErr>;

    /// Should combine the fit results into new global parameters.
    ///
    /// # Arguments
    /// * `round` - The round number, starting at 1.
    /// * `results` - The successful results, ordered by participant id.
    /// * `failures` - The calls that failed.
    ///
    /// # Returns
    /// The new parameters and the aggregated fit metrics or the reason to skip the round.
    fn aggregate_fit(
        &mut self,
        round: usize,
        results: Vec<(ParticipantId, FitRes)>,
        failures: &[Failure],
    ) -> Result<(Parameters, Metrics), AggregationErr>;

    /// Should select the participants and build the configuration of an evaluate phase.
    ///
    /// # Returns
    /// `None` if the round has no distributed evaluation.
    fn configure_evaluate(
        &mut self,
        round: usize,
        parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Option<Instructions>, ConfigErr>;

    /// Should combine the evaluate results into a loss and metrics.
    fn aggregate_evaluate(
        &mut self,
        round: usize,
        results: Vec<(ParticipantId, EvaluateRes)>,
        failures: &[Failure],
    ) -> Result<(f64, Metrics), AggregationErr>;

    /// Should evaluate the global parameters on the server side, if the strategy can.
    ///
    /// # Arguments
    /// * `round` - The round number, `0` for the initial parameters.
    /// * `parameters` - The current global parameters.
    fn evaluate(&mut self, _round: usize, _parameters: &Parameters) -> Option<(f64, Metrics)> {
        None
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn validate(&self, available: usize) -> Result<(), ConfigErr> {
        (**self).validate(available)
    }

    fn initialize_parameters(&mut self) -> Option<Parameters> {
        (**self).initialize_parameters()
    }

    fn configure_fit(
        &mut self,
        round: usize,
        parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Instructions, ConfigErr> {
        (**self).configure_fit(round, parameters, available)
    }

    fn aggregate_fit(
        &mut self,
        round: usize,
        results: Vec<(ParticipantId, FitRes)>,
        failures: &[Failure],
    ) -> Result<(Parameters, Metrics), AggregationErr> {
        (**self).aggregate_fit(round, results, failures)
    }

    fn configure_evaluate(
        &mut self,
        round: usize,
        parameters: &Parameters,
        available: &[ParticipantId],
    ) -> Result<Option<Instructions>, ConfigErr> {
        (**self).configure_evaluate(round, parameters, available)
    }

    fn aggregate_evaluate(
        &mut self,
        round: usize,
        results: Vec<(ParticipantId, EvaluateRes)>,
        failures: &[Failure],
    ) -> Result<(f64, Metrics), AggregationErr> {
        (**self).aggregate_evaluate(round, results, failures)
    }

    fn evaluate(&mut self, round: usize, parameters: &Parameters) -> Option<(f64, Metrics)> {
        (**self).evaluate(round, parameters)
    }
}
