use serde::{Deserialize, Serialize};

use crate::scalar::Config;

/// The specification of the strategy of a run, every field but the ones that are absent
/// take `FedAvg`'s defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySpec {
    pub fraction_fit: f64,
    pub fraction_evaluate: f64,
    pub min_fit: usize,
    pub min_evaluate: usize,
    pub min_available: usize,
    pub accept_failures: bool,
    /// Seeds the participant sampler.
    pub seed: Option<u64>,
    pub fit_config: Config,
    /// Keys merged over `fit_config` starting at a given round.
    pub fit_config_overrides: Vec<ConfigOverride>,
    pub evaluate_config: Config,
    /// The fit metric keys to weighted average.
    pub fit_metrics: Vec<String>,
    /// The evaluate metric keys to weighted average.
    pub evaluate_metrics: Vec<String>,
    /// Turns the strategy into `FedOpt` with the given server optimizer.
    pub server_optimizer: Option<ServerOptimizerSpec>,
    /// Generates the initial parameters on the server instead of asking a participant.
    pub initialization: Option<InitSpec>,
}

impl Default for StrategySpec {
    fn default() -> Self {
        Self {
            fraction_fit: 1.,
            fraction_evaluate: 1.,
            min_fit: 2,
            min_evaluate: 2,
            min_available: 2,
            accept_failures: true,
            seed: None,
            fit_config: Config::new(),
            fit_config_overrides: Vec::new(),
            evaluate_config: Config::new(),
            fit_metrics: Vec::new(),
            evaluate_metrics: Vec::new(),
            server_optimizer: None,
            initialization: None,
        }
    }
}

/// Config keys that replace the base ones from `from_round` onwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverride {
    pub from_round: usize,
    pub config: Config,
}

/// The specification for the server side `Optimizer` of `FedOpt`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerOptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
    },
}

/// The specification for a random distribution, the fans of `xavier_uniform` and `kaiming`
/// are taken from each tensor's shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionSpec {
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    XavierUniform,
    Kaiming,
}

/// The specification for the `ParamGen` trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenSpec {
    Const { value: f32 },
    Rand { distribution: DistributionSpec },
    Chained { specs: Vec<ParamGenSpec> },
}

/// The specification of the initial parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSpec {
    /// The shape of every tensor, in order.
    pub shapes: Vec<Vec<usize>>,
    pub param_gen: ParamGenSpec,
    /// Seeds the random generators, independent from the sampler's seed.
    #[serde(default)]
    pub seed: Option<u64>,
}
