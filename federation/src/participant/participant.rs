use super::Result;
use crate::{
    parameters::Parameters,
    scalar::{Config, Metrics},
};

/// The outcome of a local training call.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRes {
    pub parameters: Parameters,
    /// The amount of local samples used, it's the weight of this result.
    pub num_samples: u64,
    pub metrics: Metrics,
}

/// The outcome of a local evaluation call.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateRes {
    pub loss: f64,
    /// The amount of local samples evaluated, it's the weight of this result.
    pub num_samples: u64,
    pub metrics: Metrics,
}

/// A member of the federation holding private data and a local copy of the model.
///
/// Instances are created by a `ParticipantFactory` for a single call and dropped
/// afterwards, so implementations must not rely on state surviving across rounds.
#[async_trait::async_trait]
pub trait Participant: Send {
    /// Should return the participant's current local parameters.
    ///
    /// # Arguments
    /// * `config` - The configuration for this call.
    async fn get_parameters(&mut self, config: &Config) -> Result<Parameters>;

    /// Should train the model locally starting from `parameters`.
    ///
    /// # Arguments
    /// * `parameters` - A snapshot of the global parameters.
    /// * `config` - The configuration of the current round.
    ///
    /// # Returns
    /// The updated parameters together with the sample count and local metrics.
    async fn fit(&mut self, parameters: &Parameters, config: &Config) -> Result<FitRes>;

    /// Should evaluate `parameters` against the participant's local data.
    ///
    /// # Arguments
    /// * `parameters` - A snapshot of the global parameters.
    /// * `config` - The configuration of the current round.
    ///
    /// # Returns
    /// The loss together with the sample count and local metrics.
    async fn evaluate(&mut self, parameters: &Parameters, config: &Config) -> Result<EvaluateRes>;
}
