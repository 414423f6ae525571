//! Tensor types for inference input/output.

use ndarray::{Array1, ArrayD, IxDyn};

/// Input tensor for inference.
///
/// Owns its backing storage. Handing an `InputTensor` to a backend by value
/// transfers that storage; it is freed exactly once when the backend drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: ArrayD<f32>,
}

impl InputTensor {
    /// Wrap a flat buffer as a rank-1 tensor. Takes ownership without copying.
    pub fn from_flat(data: Vec<f32>) -> Self {
        Self {
            data: Array1::from_vec(data).into_dyn(),
        }
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the underlying array.
    pub fn view(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Consume the tensor, handing its storage back without copying.
    pub fn into_vec(self) -> Vec<f32> {
        // Always rank-1 and contiguous, so raw order is logical order.
        self.data.into_raw_vec_and_offset().0
    }
}

/// Output tensor from inference.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    data: ArrayD<f32>,
}

impl OutputTensor {
    pub fn new(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    /// Build an output from a shape and row-major data.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self, ndarray::ShapeError> {
        ArrayD::from_shape_vec(IxDyn(shape), data).map(Self::new)
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy the tensor into an owned flat sequence.
    ///
    /// Walks the array by logical index, so strided or transposed layouts
    /// come out in row-major order.
    pub fn to_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for value in self.data.iter() {
            out.push(*value);
        }
        out
    }
}
