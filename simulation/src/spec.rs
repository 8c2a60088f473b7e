use std::{env, fs};

use anyhow::{Context, Result, bail};
use federation::RunSpec;
use serde::Deserialize;

use crate::model::LinearModel;

/// The environment variable holding the path of the simulation spec.
pub const SPEC_VAR: &str = "FEDERATION_SPEC";

const DEFAULT_SPEC: &str = r#"{
    "rounds": 10,
    "participants": 8,
    "call_timeout_ms": 5000,
    "strategy": {
        "fraction_fit": 0.5,
        "fraction_evaluate": 0.5,
        "seed": 42,
        "fit_config": { "local_epochs": 1, "learning_rate": 0.05, "batch_size": 16 },
        "fit_config_overrides": [{ "from_round": 5, "config": { "local_epochs": 2 } }],
        "fit_metrics": ["mse"],
        "evaluate_metrics": ["mse", "mae"]
    },
    "data": { "failure_rate": 0.1 }
}"#;

/// The synthetic data of a simulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSpec {
    pub features: usize,
    pub min_samples: usize,
    pub max_samples: usize,
    pub held_out: usize,
    /// The standard deviation of the targets' noise.
    pub noise: f32,
    /// The chance of every participant call to fail.
    pub failure_rate: f64,
    pub seed: u64,
}

impl Default for DataSpec {
    fn default() -> Self {
        Self {
            features: 4,
            min_samples: 20,
            max_samples: 200,
            held_out: 200,
            noise: 0.1,
            failure_rate: 0.,
            seed: 0,
        }
    }
}

/// A federated run over synthetic participants.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSpec {
    #[serde(flatten)]
    pub run: RunSpec,
    #[serde(default)]
    pub data: DataSpec,
}

impl SimulationSpec {
    /// Loads the spec from the file named by `FEDERATION_SPEC`, or the built-in one.
    pub fn load() -> Result<Self> {
        let json = match env::var(SPEC_VAR) {
            Ok(path) => {
                fs::read_to_string(&path).with_context(|| format!("failed to read spec {path}"))?
            }
            Err(_) => DEFAULT_SPEC.to_string(),
        };

        Self::parse(&json)
    }

    /// Parses a spec, rejecting initial parameters that don't fit the data.
    pub fn parse(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json).context("invalid simulation spec")?;

        if let Some(init) = &spec.run.strategy.initialization {
            let expected = LinearModel::shapes(spec.data.features);
            if init.shapes != expected {
                bail!(
                    "initialization shapes {:?} don't match {} features, expected {expected:?}",
                    init.shapes,
                    spec.data.features
                );
            }
        }

        Ok(spec)
    }
}
