use std::{
    error::Error,
    fmt::{self, Display},
};

/// Errors returned by a `MetricsAggregator`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsErr {
    /// There were no results to aggregate.
    Empty,
    /// A user supplied aggregator rejected its input.
    Invalid(String),
}

impl Display for MetricsErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsErr::Empty => f.write_str("can't aggregate metrics of an empty result set"),
            MetricsErr::Invalid(msg) => write!(f, "invalid metrics: {msg}"),
        }
    }
}

impl Error for MetricsErr {}
