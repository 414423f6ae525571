//! Device-agnostic inference layer for kora.
//!
//! This crate wraps a single-input/single-output regression model behind a
//! [`ModelBackend`] and exposes it through [`InferenceRunner`], which handles
//! marshalling between flat `f32` buffers and the backend's tensors.
//!
//! Backends:
//! - `ort` with CPU or XNNPACK execution providers for native platforms
//! - `tract` for a pure-Rust CPU path
//! - a built-in rate-based regulatory operator loaded from JSON weights
//! - a deterministic stub for tests and dry runs

mod backend;
mod device;
mod error;
mod runner;
mod tensor;

pub use backend::ModelBackend;
pub use backend::operator::{Activation, OperatorBackend, OperatorSpec};
pub use backend::stub::{FailureMode, StubBackend};
pub use device::DevicePolicy;
pub use error::{LoadError, PredictError};
pub use runner::{InferenceRunner, Predictor};
pub use tensor::{InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "tract")]
pub use backend::tract::TractBackend;

/// Name of the model's input feature.
pub const INPUT_FEATURE: &str = "expression";

/// Name of the model's output feature.
pub const OUTPUT_FEATURE: &str = "regulation";
