pub mod error;
pub mod execution;
pub mod initialization;
pub mod metrics;
pub mod optimization;
pub mod parameters;
pub mod participant;
pub mod scalar;
pub mod specs;
pub mod strategy;

pub use error::{ConfigErr, RunErr};
pub use execution::{History, RoundCoordinator, RoundEvent, RoundSummary, RunOutcome};
pub use metrics::{MetricsAggregator, MetricsErr, WeightedAverage};
pub use parameters::{ParameterStore, Parameters, Tensor};
pub use participant::{
    EvaluateRes, Failure, FitRes, Participant, ParticipantErr, ParticipantFactory, ParticipantId,
};
pub use scalar::{Config, Metrics, Scalar};
pub use specs::{RunSpec, StrategyBuilder, StrategySpec};
pub use strategy::{AggregationErr, ConfigPolicy, FedAvg, FedOpt, Instructions, Sampler, Strategy};
