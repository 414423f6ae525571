//! Deterministic stand-in backend for tests and dry runs.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ndarray::Array1;
use tracing::trace;

use crate::backend::take_input;
use crate::{
    DevicePolicy, INPUT_FEATURE, InputTensor, LoadError, ModelBackend, OUTPUT_FEATURE,
    OutputTensor, PredictError,
};

/// How the stub misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    Never,
    /// Every call fails with a backend failure.
    Always,
    /// The first `n` calls fail, later calls succeed.
    First(usize),
    /// Calls succeed but the output feature is absent.
    OmitOutput,
}

/// Backend that computes `tanh(x)` element-wise after an optional delay.
///
/// Every call to [`ModelBackend::run`] bumps a shared counter, whether it
/// succeeds or not.
#[derive(Debug, Clone)]
pub struct StubBackend {
    input_len: Option<usize>,
    latency: Duration,
    failure: FailureMode,
    calls: Arc<AtomicUsize>,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl StubBackend {
    /// Create a stub expecting `input_len` values per call.
    pub fn new(input_len: usize) -> Self {
        Self {
            input_len: Some(input_len),
            ..Self::unsized_stub()
        }
    }

    fn unsized_stub() -> Self {
        Self {
            input_len: None,
            latency: Duration::ZERO,
            failure: FailureMode::Never,
            calls: Arc::new(AtomicUsize::new(0)),
            input_names: vec![INPUT_FEATURE.to_string()],
            output_names: vec![OUTPUT_FEATURE.to_string()],
        }
    }

    /// Sleep for `latency` on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_failure(mut self, failure: FailureMode) -> Self {
        self.failure = failure;
        self
    }

    /// Shared handle to the call counter.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelBackend for StubBackend {
    /// Any existing file is accepted; its contents are ignored and the
    /// input arity is left unchecked.
    fn load(path: &Path, _policy: DevicePolicy) -> Result<Self, LoadError> {
        std::fs::metadata(path).map_err(|e| LoadError::from_io(path, e))?;
        Ok(Self::unsized_stub())
    }

    fn run(&self, inputs: Vec<(&str, InputTensor)>) -> Result<Vec<(String, OutputTensor)>, PredictError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        trace!("stub call #{}", call + 1);

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let failing = match self.failure {
            FailureMode::Always => true,
            FailureMode::First(n) => call < n,
            FailureMode::Never | FailureMode::OmitOutput => false,
        };
        if failing {
            return Err(PredictError::BackendFailure(format!("stub failure on call {}", call + 1)));
        }

        let input = take_input(inputs, INPUT_FEATURE)?;
        if let Some(expected) = self.input_len {
            if input.len() != expected {
                return Err(PredictError::InputShapeMismatch {
                    expected,
                    actual: input.len(),
                });
            }
        }

        if self.failure == FailureMode::OmitOutput {
            return Ok(Vec::new());
        }

        let output = Array1::from_vec(input.into_vec()).mapv(f32::tanh);
        Ok(vec![(OUTPUT_FEATURE.to_string(), OutputTensor::new(output.into_dyn()))])
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn input_len(&self) -> Option<usize> {
        self.input_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input(values: Vec<f32>) -> Vec<(&'static str, InputTensor)> {
        vec![(INPUT_FEATURE, InputTensor::from_flat(values))]
    }

    #[test]
    fn test_stub_computes_tanh() {
        let stub = StubBackend::new(3);
        let outputs = stub.run(input(vec![0.0, 1.0, -1.0])).unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].0, OUTPUT_FEATURE);
        assert_eq!(outputs[0].1.to_flat(), vec![0.0, 1.0f32.tanh(), (-1.0f32).tanh()]);
    }

    #[test]
    fn test_stub_counts_failed_calls() {
        let stub = StubBackend::new(2).with_failure(FailureMode::First(2));
        let counter = stub.call_counter();

        assert!(stub.run(input(vec![0.5, 0.5])).is_err());
        assert!(stub.run(input(vec![0.5, 0.5])).is_err());
        assert!(stub.run(input(vec![0.5, 0.5])).is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(stub.calls(), 3);
    }

    #[test]
    fn test_stub_rejects_wrong_arity() {
        let stub = StubBackend::new(4);
        let err = stub.run(input(vec![0.5; 3])).unwrap_err();
        assert_eq!(err, PredictError::InputShapeMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn test_stub_missing_input_feature() {
        let stub = StubBackend::new(1);
        let err = stub
            .run(vec![("features", InputTensor::from_flat(vec![1.0]))])
            .unwrap_err();
        assert!(matches!(err, PredictError::BackendFailure(_)));
    }

    #[test]
    fn test_stub_load_requires_existing_file() {
        let missing = Path::new("/definitely/not/here.bin");
        let err = StubBackend::load(missing, DevicePolicy::CpuOnly).unwrap_err();
        assert!(matches!(err, LoadError::ArtifactNotFound(_)));

        let file = tempfile::NamedTempFile::new().unwrap();
        let stub = StubBackend::load(file.path(), DevicePolicy::AllAvailable).unwrap();
        assert_eq!(stub.input_len(), None);
    }
}
