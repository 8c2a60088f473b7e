use std::{
    error::Error,
    fmt::{self, Display},
};

/// Error returned by an `Optimizer` whenever the pseudo-gradient and the parameters it's
/// applied to don't have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeMismatchErr {
    pub grad: usize,
    pub params: usize,
}

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "optimizer error: gradient of length {} for {} parameters",
            self.grad, self.params
        )
    }
}

impl Error for SizeMismatchErr {}

/// Checks that `grad` and `params` have the same length.
pub(super) fn check_sizes(grad: &[f32], params: &[f32]) -> Result<(), SizeMismatchErr> {
    if grad.len() != params.len() {
        return Err(SizeMismatchErr {
            grad: grad.len(),
            params: params.len(),
        });
    }

    Ok(())
}
