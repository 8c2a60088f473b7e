mod error;
mod store;
mod tensor;

pub use error::{ShapeMismatchErr, StoreErr};
pub use store::ParameterStore;
pub use tensor::{Parameters, Tensor};
