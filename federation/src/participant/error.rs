use std::{
    error::Error,
    fmt::{self, Display},
    time::Duration,
};

use super::ParticipantId;
use crate::parameters::ShapeMismatchErr;

/// The participant module's result type.
pub type Result<T> = std::result::Result<T, ParticipantErr>;

/// A single participant's call failure, it's recovered by excluding the participant
/// from the round's aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantErr {
    /// The participant reported an error.
    Failed(String),
    /// The call didn't finish within the configured limit.
    TimedOut(Duration),
    /// The call panicked or its task was cancelled.
    Aborted(String),
    /// The returned parameters don't share the global layout.
    ShapeMismatch(ShapeMismatchErr),
}

impl ParticipantErr {
    /// Shorthand for `ParticipantErr::Failed`.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl Display for ParticipantErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(msg) => write!(f, "participant failed: {msg}"),
            Self::TimedOut(limit) => write!(f, "participant timed out after {limit:?}"),
            Self::Aborted(msg) => write!(f, "participant call aborted: {msg}"),
            Self::ShapeMismatch(e) => write!(f, "participant returned {e}"),
        }
    }
}

impl Error for ParticipantErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ShapeMismatch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeMismatchErr> for ParticipantErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self::ShapeMismatch(value)
    }
}

/// A failed call, tied to the participant that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub participant: ParticipantId,
    pub error: ParticipantErr,
}
