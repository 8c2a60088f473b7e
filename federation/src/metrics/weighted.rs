use super::{MetricsAggregator, MetricsErr};
use crate::scalar::{Metrics, Scalar};

/// Weighted average of a set of numeric metric keys.
///
/// For every key the result is `Σ(n × v) / Σ n` over the participants that reported a
/// numeric value for it. Participants missing the key are left out of that key's sums
/// instead of counting as zero, keys nobody reported are omitted.
#[derive(Debug, Clone)]
pub struct WeightedAverage {
    keys: Vec<String>,
}

impl WeightedAverage {
    /// Creates a new `WeightedAverage` aggregator.
    ///
    /// # Arguments
    /// * `keys` - The metric keys to average, any other key is dropped.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl MetricsAggregator for WeightedAverage {
    fn aggregate(&self, results: &[(u64, Metrics)]) -> Result<Metrics, MetricsErr> {
        if results.is_empty() {
            return Err(MetricsErr::Empty);
        }

        let mut aggregated = Metrics::new();

        for key in &self.keys {
            let (weighted, total) = results
                .iter()
                .filter(|(n, _)| *n > 0)
                .filter_map(|(n, metrics)| Some((*n as f64, metrics.get(key)?.as_f64()?)))
                .fold((0., 0.), |(weighted, total), (n, v)| (weighted + n * v, total + n));

            if total > 0. {
                aggregated.insert(key.clone(), Scalar::Float(weighted / total));
            }
        }

        Ok(aggregated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, Scalar)]) -> Metrics {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn weighted_accuracy() {
        let results = vec![
            (100, metrics(&[("accuracy", Scalar::Float(0.5))])),
            (50, metrics(&[("accuracy", Scalar::Float(0.8))])),
        ];

        let aggregated = WeightedAverage::new(["accuracy"]).aggregate(&results).unwrap();
        let accuracy = aggregated["accuracy"].as_f64().unwrap();
        assert!((accuracy - 0.6).abs() < 1e-12);
    }

    #[test]
    fn absent_keys_are_excluded_not_zeroed() {
        let results = vec![
            (100, metrics(&[("accuracy", Scalar::Float(0.5))])),
            (300, metrics(&[])),
            (100, metrics(&[("accuracy", Scalar::Int(1))])),
        ];

        let aggregated = WeightedAverage::new(["accuracy"]).aggregate(&results).unwrap();
        assert_eq!(aggregated["accuracy"], Scalar::Float(0.75));
    }

    #[test]
    fn non_numeric_values_are_excluded() {
        let results = vec![
            (10, metrics(&[("loss", Scalar::from("n/a"))])),
            (10, metrics(&[("loss", Scalar::Int(2))])),
        ];

        let aggregated = WeightedAverage::new(["loss"]).aggregate(&results).unwrap();
        assert_eq!(aggregated["loss"], Scalar::Float(2.));
    }

    #[test]
    fn unreported_keys_are_omitted() {
        let results = vec![(10, metrics(&[("loss", Scalar::Int(1))]))];

        let aggregated = WeightedAverage::new(["loss", "accuracy"])
            .aggregate(&results)
            .unwrap();
        assert!(aggregated.contains_key("loss"));
        assert!(!aggregated.contains_key("accuracy"));
    }

    #[test]
    fn zero_samples_never_divide_by_zero() {
        let results = vec![(0, metrics(&[("loss", Scalar::Int(1))]))];

        let aggregated = WeightedAverage::new(["loss"]).aggregate(&results).unwrap();
        assert!(aggregated.is_empty());
    }

    #[test]
    fn empty_input_fails() {
        let err = WeightedAverage::new(["loss"]).aggregate(&[]).unwrap_err();
        assert_eq!(err, MetricsErr::Empty);
    }

    #[test]
    fn closures_are_aggregators() {
        let count = |results: &[(u64, Metrics)]| -> Result<Metrics, MetricsErr> {
            Ok(metrics(&[("count", Scalar::Int(results.len() as i64))]))
        };

        let aggregated = count.aggregate(&[(1, Metrics::new())]).unwrap();
        assert_eq!(aggregated["count"], Scalar::Int(1));
    }
}
