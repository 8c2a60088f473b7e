mod aggregator;
mod error;
mod weighted;

pub use aggregator::MetricsAggregator;
pub use error::MetricsErr;
pub use weighted::WeightedAverage;
