mod builder;
mod run;
mod strategy;

pub use builder::StrategyBuilder;
pub use run::RunSpec;
pub use strategy::{
    ConfigOverride, DistributionSpec, InitSpec, ParamGenSpec, ServerOptimizerSpec, StrategySpec,
};
