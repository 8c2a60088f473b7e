use std::{error::Error, fmt};

use crate::{parameters::StoreErr, participant::ParticipantErr};

/// Unsatisfiable or invalid run configuration, always caught before the first round.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErr {
    /// The selection asks for more participants than there are available.
    UnsatisfiableSelection { minimum: usize, available: usize },
    /// A sampling fraction outside of `[0, 1]`.
    InvalidFraction(f64),
    /// The participant universe is empty.
    NoParticipants,
    /// A spec that can't be resolved into a strategy.
    InvalidSpec(String),
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsatisfiableSelection { minimum, available } => write!(
                f,
                "unsatisfiable selection: minimum of {minimum} participants but only {available} available"
            ),
            Self::InvalidFraction(fraction) => {
                write!(f, "invalid sampling fraction {fraction}, expected a value in [0, 1]")
            }
            Self::NoParticipants => f.write_str("no participants available"),
            Self::InvalidSpec(msg) => write!(f, "invalid spec: {msg}"),
        }
    }
}

impl Error for ConfigErr {}

/// The fatal outcomes of `RoundCoordinator::run`.
#[derive(Debug)]
pub enum RunErr {
    Config(ConfigErr),
    /// No initial parameters were given and the fallback participant couldn't provide them.
    Initialization(ParticipantErr),
    Store(StoreErr),
}

impl fmt::Display for RunErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::Initialization(e) => write!(f, "failed to initialize parameters: {e}"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl Error for RunErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Initialization(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<ConfigErr> for RunErr {
    fn from(value: ConfigErr) -> Self {
        Self::Config(value)
    }
}

impl From<StoreErr> for RunErr {
    fn from(value: StoreErr) -> Self {
        Self::Store(value)
    }
}
