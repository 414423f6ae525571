//! Error types for the inference layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::DevicePolicy;

/// Errors that can occur while loading a model artifact.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The artifact does not exist at the given path.
    #[error("model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// The artifact exists but could not be parsed or compiled.
    #[error("failed to compile model: {0}")]
    CompilationFailed(String),

    /// The backend refused the requested device policy.
    #[error("device policy '{policy}' rejected: {reason}")]
    ConfigurationRejected {
        policy: DevicePolicy,
        reason: String,
    },
}

impl LoadError {
    /// Map an I/O error on `path` to the matching load failure.
    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            LoadError::ArtifactNotFound(path.to_path_buf())
        } else {
            LoadError::CompilationFailed(format!("{}: {}", path.display(), err))
        }
    }
}

/// Errors that can occur during a single prediction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    /// The input length does not match the model's input arity.
    #[error("input shape mismatch: expected {expected} values, got {actual}")]
    InputShapeMismatch { expected: usize, actual: usize },

    /// The named output feature was not in the prediction result.
    #[error("output feature '{0}' missing from prediction result")]
    OutputFeatureMissing(String),

    /// Opaque failure reported by the backend.
    #[error("backend failure: {0}")]
    BackendFailure(String),
}
