use crate::{
    participant::{Failure, ParticipantId},
    scalar::{Metrics, Scalar},
    strategy::AggregationErr,
};

/// A loss together with its metrics, produced either centrally or by aggregating the
/// participants' evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub metrics: Metrics,
}

impl From<(f64, Metrics)> for Evaluation {
    fn from((loss, metrics): (f64, Metrics)) -> Self {
        Self { loss, metrics }
    }
}

/// What happened during one phase of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport<T> {
    /// The participants the strategy selected.
    pub selected: Vec<ParticipantId>,
    /// How many of them returned a usable result.
    pub succeeded: usize,
    /// The calls that failed, ordered by participant id.
    pub failures: Vec<Failure>,
    /// The aggregated output or the reason it was skipped.
    pub outcome: Result<T, AggregationErr>,
}

/// The fit phase report, its output are the aggregated fit metrics.
pub type FitReport = PhaseReport<Metrics>;

/// The distributed evaluation phase report.
pub type EvaluateReport = PhaseReport<Evaluation>;

/// Everything recorded about a single round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub round: usize,
    pub fit: FitReport,
    /// The server side evaluation of the round's parameters, if the strategy has one.
    pub centralized: Option<Evaluation>,
    /// `None` when the strategy disabled distributed evaluation for the round.
    pub evaluate: Option<EvaluateReport>,
}

impl RoundSummary {
    /// Whether the round replaced the global parameters.
    pub fn committed(&self) -> bool {
        self.fit.outcome.is_ok()
    }
}

/// Published by the coordinator as the run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    Started { round: usize },
    Completed(RoundSummary),
}

/// The per round record of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    /// The centralized evaluation of the initial parameters.
    pub initial: Option<Evaluation>,
    /// One summary per completed round, in order.
    pub rounds: Vec<RoundSummary>,
}

impl History {
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Returns the aggregated distributed losses as `(round, loss)` pairs.
    pub fn losses_distributed(&self) -> Vec<(usize, f64)> {
        self.rounds
            .iter()
            .filter_map(|summary| {
                let evaluation = summary.evaluate.as_ref()?.outcome.as_ref().ok()?;
                Some((summary.round, evaluation.loss))
            })
            .collect()
    }

    /// Returns the centralized losses as `(round, loss)` pairs, round `0` being the
    /// initial parameters.
    pub fn losses_centralized(&self) -> Vec<(usize, f64)> {
        let initial = self.initial.as_ref().map(|evaluation| (0, evaluation.loss));

        initial
            .into_iter()
            .chain(self.rounds.iter().filter_map(|summary| {
                let evaluation = summary.centralized.as_ref()?;
                Some((summary.round, evaluation.loss))
            }))
            .collect()
    }

    /// Returns the values of an aggregated distributed evaluation metric as `(round, value)`
    /// pairs, rounds without it are skipped.
    pub fn metrics_distributed(&self, key: &str) -> Vec<(usize, Scalar)> {
        self.rounds
            .iter()
            .filter_map(|summary| {
                let evaluation = summary.evaluate.as_ref()?.outcome.as_ref().ok()?;
                let value = evaluation.metrics.get(key)?;
                Some((summary.round, value.clone()))
            })
            .collect()
    }

    /// Returns the values of an aggregated fit metric as `(round, value)` pairs.
    pub fn metrics_fit(&self, key: &str) -> Vec<(usize, Scalar)> {
        self.rounds
            .iter()
            .filter_map(|summary| {
                let value = summary.fit.outcome.as_ref().ok()?.get(key)?;
                Some((summary.round, value.clone()))
            })
            .collect()
    }
}
