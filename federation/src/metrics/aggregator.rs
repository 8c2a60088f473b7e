use super::MetricsErr;
use crate::scalar::Metrics;

/// Combines the metrics reported by many participants into a single summary.
///
/// Metric semantics are defined by the participants, so the coordinator never fuses
/// them on its own, it always goes through one of these.
pub trait MetricsAggregator: Send {
    /// Should combine every participant's metrics.
    ///
    /// # Arguments
    /// * `results` - Pairs of sample count and metrics, one per participant.
    ///
    /// # Returns
    /// The aggregated metrics or an error if `results` can't be combined.
    fn aggregate(&self, results: &[(u64, Metrics)]) -> Result<Metrics, MetricsErr>;
}

impl<F> MetricsAggregator for F
where
    F: Fn(&[(u64, Metrics)]) -> Result<Metrics, MetricsErr> + Send,
{
    fn aggregate(&self, results: &[(u64, Metrics)]) -> Result<Metrics, MetricsErr> {
        self(results)
    }
}
