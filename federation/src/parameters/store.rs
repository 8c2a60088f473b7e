use std::sync::Arc;

use parking_lot::RwLock;

use super::{Parameters, StoreErr};

/// The holder of the global model parameters.
///
/// Readers get cheap `Arc` snapshots that stay valid after a replacement, only the
/// coordinator swaps the value, and always between rounds.
#[derive(Debug, Default)]
pub struct ParameterStore {
    current: RwLock<Option<Arc<Parameters>>>,
}

impl ParameterStore {
    /// Creates a new empty `ParameterStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial parameters, can only be done once.
    ///
    /// # Arguments
    /// * `params` - The initial parameters, their layout is fixed from now on.
    ///
    /// # Returns
    /// The stored snapshot or `StoreErr::AlreadyInitialized` on a second call.
    pub fn initialize(&self, params: Parameters) -> Result<Arc<Parameters>, StoreErr> {
        let mut current = self.current.write();

        if current.is_some() {
            return Err(StoreErr::AlreadyInitialized);
        }

        let params = Arc::new(params);
        *current = Some(Arc::clone(&params));
        Ok(params)
    }

    /// Returns the latest committed parameters, if any.
    pub fn current(&self) -> Option<Arc<Parameters>> {
        self.current.read().clone()
    }

    /// Atomically swaps the stored parameters.
    ///
    /// # Arguments
    /// * `params` - The new parameters.
    ///
    /// # Returns
    /// The stored snapshot, `StoreErr::Uninitialized` if nothing was stored before or
    /// `StoreErr::ShapeMismatch` if `params` doesn't share the previous layout.
    pub fn replace(&self, params: Parameters) -> Result<Arc<Parameters>, StoreErr> {
        let mut current = self.current.write();

        let Some(prev) = current.as_ref() else {
            return Err(StoreErr::Uninitialized);
        };

        prev.check_compatible(&params)?;

        let params = Arc::new(params);
        *current = Some(Arc::clone(&params));
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Tensor;

    fn params(values: &[f32]) -> Parameters {
        Parameters::new(vec![Tensor::from_vec(values.to_vec())])
    }

    #[test]
    fn initialize_once() {
        let store = ParameterStore::new();
        assert!(store.current().is_none());

        store.initialize(params(&[1., 2.])).unwrap();
        assert_eq!(
            store.initialize(params(&[3., 4.])).unwrap_err(),
            StoreErr::AlreadyInitialized
        );
        assert_eq!(*store.current().unwrap(), params(&[1., 2.]));
    }

    #[test]
    fn replace_requires_initialization() {
        let store = ParameterStore::new();
        assert_eq!(
            store.replace(params(&[1.])).unwrap_err(),
            StoreErr::Uninitialized
        );
    }

    #[test]
    fn replace_validates_shapes() {
        let store = ParameterStore::new();
        store.initialize(params(&[1., 2.])).unwrap();

        let err = store.replace(params(&[1., 2., 3.])).unwrap_err();
        assert!(matches!(err, StoreErr::ShapeMismatch(_)));
        assert_eq!(*store.current().unwrap(), params(&[1., 2.]));

        store.replace(params(&[5., 6.])).unwrap();
        assert_eq!(*store.current().unwrap(), params(&[5., 6.]));
    }

    #[test]
    fn snapshots_survive_replacement() {
        let store = ParameterStore::new();
        store.initialize(params(&[1.])).unwrap();

        let snapshot = store.current().unwrap();
        store.replace(params(&[2.])).unwrap();

        assert_eq!(*snapshot, params(&[1.]));
        assert_eq!(*store.current().unwrap(), params(&[2.]));
    }
}
