use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::{NormalError, uniform::Error as UniformError};

use crate::parameters::ShapeMismatchErr;

/// The specific result type for the parameter generators.
pub type Result<T> = std::result::Result<T, RandErr>;

/// Error returned by the parameter generators whenever a distribution can't be built or
/// there's no generator left for a tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct RandErr(String);

impl RandErr {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<NormalError> for RandErr {
    fn from(value: NormalError) -> Self {
        Self(value.to_string())
    }
}

impl From<UniformError> for RandErr {
    fn from(value: UniformError) -> Self {
        Self(value.to_string())
    }
}

impl From<ShapeMismatchErr> for RandErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self(value.to_string())
    }
}

impl Display for RandErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for RandErr {}
