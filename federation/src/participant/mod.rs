mod error;
mod factory;
mod participant;

pub use error::{Failure, ParticipantErr, Result};
pub use factory::ParticipantFactory;
pub use participant::{EvaluateRes, FitRes, Participant};

/// Identifies a participant inside the universe of a run, ids go from `0` to `M - 1`.
pub type ParticipantId = usize;
