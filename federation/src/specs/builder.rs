use std::{cell::RefCell, rc::Rc};

use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{ConfigOverride, DistributionSpec, InitSpec, ParamGenSpec, ServerOptimizerSpec, StrategySpec};
use crate::{
    error::ConfigErr,
    initialization::{self, ChainedParamGen, ConstParamGen, ParamGen, RandErr, RandParamGen},
    metrics::WeightedAverage,
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum},
    parameters::Parameters,
    scalar::{Config, Metrics},
    strategy::{ConfigPolicy, EvaluateFn, FedAvg, FedOpt, Strategy},
};

/// Builds `Strategy`s given a specification.
#[derive(Default)]
pub struct StrategyBuilder {
    evaluate_fn: Option<EvaluateFn>,
}

impl StrategyBuilder {
    /// Creates a new `StrategyBuilder`.
    ///
    /// # Returns
    /// A new `StrategyBuilder` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a centralized evaluation callback to the built strategy.
    pub fn with_evaluate_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &Parameters) -> Option<(f64, Metrics)> + Send + 'static,
    {
        self.evaluate_fn = Some(Box::new(f));
        self
    }

    /// Builds a new `Strategy` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification of the strategy.
    ///
    /// # Returns
    /// A new strategy or `ConfigErr::InvalidSpec` if the spec can't be resolved.
    pub fn build(self, spec: StrategySpec) -> Result<Box<dyn Strategy>, ConfigErr> {
        let fed_avg = self.resolve_fed_avg(&spec)?;
        Ok(Self::resolve_optimizer(spec.server_optimizer, fed_avg))
    }

    /// Resolves the `FedAvg` every strategy builds upon.
    fn resolve_fed_avg(self, spec: &StrategySpec) -> Result<FedAvg, ConfigErr> {
        let mut fed_avg = FedAvg::new()
            .with_fraction_fit(spec.fraction_fit)
            .with_fraction_evaluate(spec.fraction_evaluate)
            .with_min_fit(spec.min_fit)
            .with_min_evaluate(spec.min_evaluate)
            .with_min_available(spec.min_available)
            .with_accept_failures(spec.accept_failures)
            .with_fit_config(Self::resolve_fit_config(spec))
            .with_evaluate_config(spec.evaluate_config.clone());

        if let Some(seed) = spec.seed {
            fed_avg = fed_avg.with_seed(seed);
        }

        if !spec.fit_metrics.is_empty() {
            fed_avg = fed_avg.with_fit_metrics(WeightedAverage::new(spec.fit_metrics.clone()));
        }

        if !spec.evaluate_metrics.is_empty() {
            fed_avg =
                fed_avg.with_evaluate_metrics(WeightedAverage::new(spec.evaluate_metrics.clone()));
        }

        if let Some(init) = &spec.initialization {
            let parameters = Self::resolve_initial_parameters(init)
                .map_err(|e| ConfigErr::InvalidSpec(format!("initialization: {e}")))?;
            fed_avg = fed_avg.with_initial_parameters(parameters);
        }

        if let Some(evaluate_fn) = self.evaluate_fn {
            fed_avg = fed_avg.with_evaluate_fn(evaluate_fn);
        }

        Ok(fed_avg)
    }

    /// Resolves the fit `ConfigPolicy`, static unless there are overrides.
    fn resolve_fit_config(spec: &StrategySpec) -> ConfigPolicy {
        if spec.fit_config_overrides.is_empty() {
            return ConfigPolicy::Static(spec.fit_config.clone());
        }

        let base = spec.fit_config.clone();
        let mut overrides = spec.fit_config_overrides.clone();
        overrides.sort_by_key(|o| o.from_round);

        ConfigPolicy::per_round(move |round| merged_config(&base, &overrides, round))
    }

    /// Generates the initial parameters.
    fn resolve_initial_parameters(init: &InitSpec) -> initialization::Result<Parameters> {
        let rng = Rc::new(RefCell::new(match init.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }));

        let mut param_gen = Self::resolve_param_gen(rng, &init.param_gen)?;
        let parameters = initialization::generate(param_gen.as_mut(), &init.shapes)?;

        debug!(tensors = parameters.len(), numel = parameters.numel(); "generated initial parameters");
        Ok(parameters)
    }

    /// Resolves a `ParamGen`, chained generators share `rng`.
    fn resolve_param_gen<R>(
        rng: Rc<RefCell<R>>,
        spec: &ParamGenSpec,
    ) -> Result<Box<dyn ParamGen>, RandErr>
    where
        R: Rng + 'static,
    {
        let param_gen: Box<dyn ParamGen> = match spec {
            ParamGenSpec::Const { value } => Box::new(ConstParamGen::new(*value)),
            ParamGenSpec::Rand { distribution } => match *distribution {
                DistributionSpec::Uniform { low, high } => {
                    Box::new(RandParamGen::uniform(rng, low, high)?)
                }
                DistributionSpec::Normal { mean, std_dev } => {
                    Box::new(RandParamGen::normal(rng, mean, std_dev)?)
                }
                DistributionSpec::XavierUniform => Box::new(RandParamGen::xavier_uniform(rng)),
                DistributionSpec::Kaiming => Box::new(RandParamGen::kaiming(rng)),
            },
            ParamGenSpec::Chained { specs } => {
                let param_gens = specs
                    .iter()
                    .map(|spec| Self::resolve_param_gen(Rc::clone(&rng), spec))
                    .collect::<Result<_, _>>()?;
                Box::new(ChainedParamGen::new(param_gens))
            }
        };

        Ok(param_gen)
    }

    /// Resolves the server `Optimizer`, without one the strategy is plain `FedAvg`.
    fn resolve_optimizer(
        spec: Option<ServerOptimizerSpec>,
        fed_avg: FedAvg,
    ) -> Box<dyn Strategy> {
        let Some(spec) = spec else {
            return Box::new(fed_avg);
        };

        match spec {
            ServerOptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let factory = move |len| Adam::new(len, learning_rate, beta1, beta2, epsilon);
                Box::new(FedOpt::new(fed_avg, factory))
            }
            ServerOptimizerSpec::GradientDescent { learning_rate } => {
                let factory = move |_| GradientDescent::new(learning_rate);
                Box::new(FedOpt::new(fed_avg, factory))
            }
            ServerOptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => {
                let factory = move |len| GradientDescentWithMomentum::new(len, learning_rate, momentum);
                Box::new(FedOpt::new(fed_avg, factory))
            }
        }
    }
}

/// Merges every override whose `from_round` was reached over `base`, later ones win.
fn merged_config(base: &Config, overrides: &[ConfigOverride], round: usize) -> Config {
    let mut config = base.clone();

    for o in overrides.iter().take_while(|o| o.from_round <= round) {
        config.extend(o.config.clone());
    }

    config
}
