mod coordinator;
mod dispatch;
mod history;

pub use coordinator::{RoundCoordinator, RunOutcome};
pub use history::{
    EvaluateReport, Evaluation, FitReport, History, PhaseReport, RoundEvent, RoundSummary,
};
