//! Error types for the kora-core library.

use thiserror::Error;

/// Main error type for the kora library.
#[derive(Error, Debug)]
pub enum KoraError {
    /// A model failed to load.
    #[error(transparent)]
    Load(#[from] kora_inference::LoadError),

    /// A device policy failed to load part-way through a suite.
    ///
    /// `completed` holds the policies measured before the failure.
    #[error("device policy '{policy}' failed to load")]
    SuiteAborted {
        policy: kora_inference::DevicePolicy,
        completed: Box<crate::SuiteReport>,
        #[source]
        source: kora_inference::LoadError,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON (de)serialisation error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the kora library.
pub type Result<T> = std::result::Result<T, KoraError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::path::PathBuf;

    #[test]
    fn test_load_error_message_is_not_repeated() {
        let err = KoraError::from(kora_inference::LoadError::ArtifactNotFound(PathBuf::from(
            "missing.onnx",
        )));
        assert_eq!(err.to_string(), "model artifact not found: missing.onnx");
        // Transparent: the chain does not show the same message a second time.
        assert!(err.source().is_none());
    }
}
