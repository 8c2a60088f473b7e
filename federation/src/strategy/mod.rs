mod aggregate;
mod config;
mod error;
mod fedavg;
mod fedopt;
mod sampling;
mod strategy;

pub use aggregate::{weighted_average, weighted_loss};
pub use config::ConfigPolicy;
pub use error::AggregationErr;
pub use fedavg::{EvaluateFn, FedAvg};
pub use fedopt::FedOpt;
pub use sampling::Sampler;
pub use strategy::{Instructions, Strategy};
