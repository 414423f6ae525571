//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

#[cfg(feature = "tract")]
pub mod tract;

pub mod operator;
pub mod stub;

use std::path::Path;

use crate::{DevicePolicy, InputTensor, LoadError, OutputTensor, PredictError};

/// Trait for model backends.
///
/// This trait abstracts over the runtime that actually executes the model,
/// so the same runner and harness work against ONNX Runtime, tract, the
/// built-in operator or a stub.
pub trait ModelBackend: Send + Sync {
    /// Load and compile the artifact at `path` for the given device policy.
    fn load(path: &Path, policy: DevicePolicy) -> Result<Self, LoadError>
    where
        Self: Sized;

    /// Run inference with the given inputs.
    ///
    /// # Arguments
    /// * `inputs` - Named input tensors. Taken by value; their storage is
    ///   released when this call returns, on success and on error alike.
    ///
    /// # Returns
    /// Named output tensors from the model
    fn run(&self, inputs: Vec<(&str, InputTensor)>) -> Result<Vec<(String, OutputTensor)>, PredictError>;

    /// Get the input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Get the output names produced by the model.
    fn output_names(&self) -> &[String];

    /// Number of values the model expects on its input, if known.
    fn input_len(&self) -> Option<usize> {
        None
    }
}

/// Pull the named input out of `inputs`, dropping the rest.
pub(crate) fn take_input(
    inputs: Vec<(&str, InputTensor)>,
    name: &str,
) -> Result<InputTensor, PredictError> {
    inputs
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, tensor)| tensor)
        .ok_or_else(|| PredictError::BackendFailure(format!("missing input feature '{}'", name)))
}
