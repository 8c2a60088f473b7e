use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{
    optimization::SizeMismatchErr,
    parameters::{ShapeMismatchErr, StoreErr},
};

/// Reasons for a round's aggregation step to be skipped.
///
/// None of these are fatal, the previous parameters are carried forward and the
/// error is recorded in the round's history.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationErr {
    /// No participant returned a result with a positive sample count.
    NoResults,
    /// Some participants failed and the strategy doesn't accept failures.
    FailuresNotAccepted { failures: usize },
    /// The results don't share the same parameter layout.
    ShapeMismatch(ShapeMismatchErr),
    /// The parameter store rejected the aggregated parameters.
    Store(StoreErr),
    /// No participant was selected for the phase.
    NothingSelected,
    /// The server optimizer couldn't be applied.
    Optimizer(SizeMismatchErr),
}

impl Display for AggregationErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResults => f.write_str("no eligible results to aggregate"),
            Self::FailuresNotAccepted { failures } => {
                write!(f, "{failures} participant(s) failed and failures are not accepted")
            }
            Self::ShapeMismatch(e) => write!(f, "results don't agree on the layout, {e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::NothingSelected => f.write_str("no participants were selected"),
            Self::Optimizer(e) => write!(f, "{e}"),
        }
    }
}

impl Error for AggregationErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ShapeMismatch(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Optimizer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeMismatchErr> for AggregationErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self::ShapeMismatch(value)
    }
}

impl From<StoreErr> for AggregationErr {
    fn from(value: StoreErr) -> Self {
        Self::Store(value)
    }
}

impl From<SizeMismatchErr> for AggregationErr {
    fn from(value: SizeMismatchErr) -> Self {
        Self::Optimizer(value)
    }
}
