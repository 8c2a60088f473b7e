use crate::scalar::Config;

/// Decides the configuration handed to the participants of every round.
pub enum ConfigPolicy {
    /// The same configuration on every round.
    Static(Config),
    /// A configuration computed from the round number.
    PerRound(Box<dyn Fn(usize) -> Config + Send>),
}

impl ConfigPolicy {
    /// Creates a new `ConfigPolicy::PerRound` from a closure.
    pub fn per_round<F>(f: F) -> Self
    where
        F: Fn(usize) -> Config + Send + 'static,
    {
        Self::PerRound(Box::new(f))
    }

    /// Generates a fresh configuration for a round.
    ///
    /// # Arguments
    /// * `round` - The round number, starting at 1.
    pub fn config(&self, round: usize) -> Config {
        match self {
            Self::Static(config) => config.clone(),
            Self::PerRound(f) => f(round),
        }
    }
}

impl Default for ConfigPolicy {
    fn default() -> Self {
        Self::Static(Config::new())
    }
}

impl From<Config> for ConfigPolicy {
    fn from(value: Config) -> Self {
        Self::Static(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Scalar;

    #[test]
    fn static_policy_repeats() {
        let config = Config::from([("epochs".to_string(), Scalar::Int(1))]);
        let policy = ConfigPolicy::from(config.clone());

        assert_eq!(policy.config(1), config);
        assert_eq!(policy.config(7), config);
    }

    #[test]
    fn per_round_policy_ramps_epochs() {
        let policy = ConfigPolicy::per_round(|round| {
            let epochs = if round < 3 { 1 } else { 2 };
            Config::from([("epochs".to_string(), Scalar::Int(epochs))])
        });

        assert_eq!(policy.config(2)["epochs"], Scalar::Int(1));
        assert_eq!(policy.config(3)["epochs"], Scalar::Int(2));
    }
}
