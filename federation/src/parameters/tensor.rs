use serde::{Deserialize, Serialize};

use super::ShapeMismatchErr;

/// A dense tensor, a shape and a flat row-major buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// A deserialized tensor whose buffer length wasn't checked yet.
#[derive(Deserialize)]
struct RawTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl TryFrom<RawTensor> for Tensor {
    type Error = ShapeMismatchErr;

    fn try_from(value: RawTensor) -> Result<Self, Self::Error> {
        Self::new(value.shape, value.data)
    }
}

impl Tensor {
    /// Creates a new `Tensor`.
    ///
    /// # Arguments
    /// * `shape` - The dimensions of the tensor, an empty shape is a scalar.
    /// * `data` - The flat buffer holding the values.
    ///
    /// # Returns
    /// A new tensor or a `ShapeMismatchErr` if `data` doesn't hold exactly as many
    /// values as the shape describes.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, ShapeMismatchErr> {
        let len: usize = shape.iter().product();

        if len != data.len() {
            return Err(ShapeMismatchErr {
                expected: vec![shape],
                got: vec![vec![data.len()]],
            });
        }

        Ok(Self { shape, data })
    }

    /// Creates a new `Tensor` filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.; len],
        }
    }

    /// Creates a new one dimensional `Tensor`.
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Returns the amount of values held by this tensor.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The ordered sequence of tensors making up the state of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters(Vec<Tensor>);

impl Parameters {
    /// Creates a new `Parameters` instance.
    ///
    /// # Arguments
    /// * `tensors` - The tensors of the model, in order.
    pub fn new(tensors: Vec<Tensor>) -> Self {
        Self(tensors)
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.0
    }

    pub fn tensors_mut(&mut self) -> &mut [Tensor] {
        &mut self.0
    }

    pub fn into_tensors(self) -> Vec<Tensor> {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.0.iter()
    }

    /// Returns the amount of tensors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the total amount of scalar values across all tensors.
    pub fn numel(&self) -> usize {
        self.0.iter().map(Tensor::len).sum()
    }

    /// Returns the shape of every tensor, in order.
    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.0.iter().map(|t| t.shape.clone()).collect()
    }

    /// Checks whether `other` has the same tensor count and the same shape at every index.
    pub fn is_compatible(&self, other: &Parameters) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a.shape == b.shape)
    }

    /// Like `is_compatible` but returning the offending layouts.
    ///
    /// # Arguments
    /// * `other` - The parameters to compare against.
    ///
    /// # Returns
    /// A `ShapeMismatchErr` with `self` as the expected layout if they differ.
    pub fn check_compatible(&self, other: &Parameters) -> Result<(), ShapeMismatchErr> {
        if self.is_compatible(other) {
            return Ok(());
        }

        Err(ShapeMismatchErr {
            expected: self.shapes(),
            got: other.shapes(),
        })
    }
}

impl From<Vec<Tensor>> for Parameters {
    fn from(value: Vec<Tensor>) -> Self {
        Self(value)
    }
}

impl FromIterator<Tensor> for Parameters {
    fn from_iter<I: IntoIterator<Item = Tensor>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
