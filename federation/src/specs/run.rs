use std::{num::NonZeroUsize, time::Duration};

use serde::{Deserialize, Serialize};

use super::StrategySpec;
use crate::error::ConfigErr;

/// The specification of a whole federated run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    pub rounds: NonZeroUsize,
    /// The size of the participant universe.
    pub participants: usize,
    /// The time limit of every participant call, in milliseconds.
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
    #[serde(default)]
    pub strategy: StrategySpec,
}

impl RunSpec {
    /// Parses a `RunSpec` from its JSON representation.
    ///
    /// # Returns
    /// The parsed spec or `ConfigErr::InvalidSpec` if `json` isn't a valid spec.
    pub fn from_json(json: &str) -> Result<Self, ConfigErr> {
        serde_json::from_str(json).map_err(|e| ConfigErr::InvalidSpec(e.to_string()))
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}
