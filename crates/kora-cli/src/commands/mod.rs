//! CLI command implementations.

pub mod bench;
pub mod config;
pub mod inspect;

use clap::ValueEnum;

use kora_core::BackendKind;

/// Backend selection on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BackendArg {
    /// ONNX Runtime
    Ort,
    /// Pure-Rust tract (CPU only)
    Tract,
    /// Built-in regulatory operator from JSON weights (CPU only)
    Operator,
    /// Deterministic stub, ignores the artifact contents
    Stub,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Ort => BackendKind::Ort,
            BackendArg::Tract => BackendKind::Tract,
            BackendArg::Operator => BackendKind::Operator,
            BackendArg::Stub => BackendKind::Stub,
        }
    }
}
