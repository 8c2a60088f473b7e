use std::{
    error::Error,
    fmt::{self, Display},
};

/// Error returned whenever a tensor buffer doesn't match its shape or two parameter
/// sets don't share the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMismatchErr {
    pub expected: Vec<Vec<usize>>,
    pub got: Vec<Vec<usize>>,
}

impl Display for ShapeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape mismatch: expected {:?}, got {:?}",
            self.expected, self.got
        )
    }
}

impl Error for ShapeMismatchErr {}

/// Errors returned by the `ParameterStore`.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreErr {
    AlreadyInitialized,
    Uninitialized,
    ShapeMismatch(ShapeMismatchErr),
}

impl Display for StoreErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErr::AlreadyInitialized => f.write_str("parameter store already initialized"),
            StoreErr::Uninitialized => f.write_str("parameter store is not initialized"),
            StoreErr::ShapeMismatch(e) => write!(f, "rejected replacement: {e}"),
        }
    }
}

impl Error for StoreErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreErr::ShapeMismatch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeMismatchErr> for StoreErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self::ShapeMismatch(value)
    }
}
