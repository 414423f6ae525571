//! Core library for kora inference benchmarking.
//!
//! This crate provides:
//! - The benchmark harness (warmup, timed batch, failure accounting)
//! - Benchmark results with guarded throughput/latency derivation
//! - A serialisable benchmark configuration
//! - A suite driver that benchmarks one model across device policies

pub mod config;
pub mod error;
pub mod harness;
pub mod suite;

pub use config::{BackendKind, BenchConfig};
pub use error::{KoraError, Result};
pub use harness::{BenchmarkOutcome, BenchmarkResult, WARMUP_VALUE, benchmark, benchmark_detailed};
pub use suite::{DeviceReport, SuiteReport, run_suite};

/// Re-export inference types.
pub use kora_inference::{
    DevicePolicy, InferenceRunner, LoadError, ModelBackend, OperatorBackend, PredictError,
    Predictor, StubBackend,
};

#[cfg(feature = "native")]
pub use kora_inference::OrtBackend;

#[cfg(feature = "tract")]
pub use kora_inference::TractBackend;
