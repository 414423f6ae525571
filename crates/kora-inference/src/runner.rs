//! Inference runner: a loaded model bound to a device policy.

use std::path::Path;

use tracing::{debug, info};

use crate::{
    DevicePolicy, INPUT_FEATURE, InputTensor, LoadError, ModelBackend, OUTPUT_FEATURE,
    PredictError,
};

/// Anything that maps a flat input buffer to a flat output buffer.
pub trait Predictor {
    /// Run one prediction. The input buffer is consumed.
    fn predict(&self, input: Vec<f32>) -> Result<Vec<f32>, PredictError>;
}

/// A model handle bound to a device policy for its whole lifetime.
///
/// The runner exclusively owns its backend; dropping the runner releases
/// the model.
pub struct InferenceRunner<B: ModelBackend> {
    backend: B,
    policy: DevicePolicy,
}

impl<B: ModelBackend> InferenceRunner<B> {
    /// Load the artifact at `path` under `policy`.
    pub fn load<P: AsRef<Path>>(path: P, policy: DevicePolicy) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let backend = B::load(path, policy)?;
        info!("Loaded {} for device policy '{}'", path.display(), policy);
        Ok(Self::from_backend(backend, policy))
    }

    /// Wrap an already loaded backend.
    pub fn from_backend(backend: B, policy: DevicePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> DevicePolicy {
        self.policy
    }

    /// Run one prediction.
    ///
    /// `input` is moved into the input tensor and from there into the
    /// backend, which frees it when the call returns on any path. Nothing
    /// is returned unless the whole call succeeds.
    pub fn predict(&self, input: Vec<f32>) -> Result<Vec<f32>, PredictError> {
        if let Some(expected) = self.backend.input_len() {
            if input.len() != expected {
                return Err(PredictError::InputShapeMismatch {
                    expected,
                    actual: input.len(),
                });
            }
        }

        let tensor = InputTensor::from_flat(input);
        let outputs = self.backend.run(vec![(INPUT_FEATURE, tensor)])?;

        let (_, output) = outputs
            .into_iter()
            .find(|(name, _)| name == OUTPUT_FEATURE)
            .ok_or_else(|| PredictError::OutputFeatureMissing(OUTPUT_FEATURE.to_string()))?;

        debug!("Prediction produced {} values", output.len());
        Ok(output.to_flat())
    }
}

impl<B: ModelBackend> Predictor for InferenceRunner<B> {
    fn predict(&self, input: Vec<f32>) -> Result<Vec<f32>, PredictError> {
        InferenceRunner::predict(self, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FailureMode, OperatorBackend, OutputTensor, StubBackend};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_predict_is_deterministic() {
        let runner = InferenceRunner::from_backend(StubBackend::new(64), DevicePolicy::CpuOnly);
        let input: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();

        let first = runner.predict(input.clone()).unwrap();
        let second = runner.predict(input).unwrap();

        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shape_mismatch_skips_backend() {
        let stub = StubBackend::new(10);
        let counter = stub.call_counter();
        let runner = InferenceRunner::from_backend(stub, DevicePolicy::CpuOnly);

        let err = runner.predict(vec![0.5; 9]).unwrap_err();

        assert_eq!(err, PredictError::InputShapeMismatch { expected: 10, actual: 9 });
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_output_feature() {
        let stub = StubBackend::new(2).with_failure(FailureMode::OmitOutput);
        let runner = InferenceRunner::from_backend(stub, DevicePolicy::AllAvailable);

        let err = runner.predict(vec![0.5, 0.5]).unwrap_err();
        assert_eq!(err, PredictError::OutputFeatureMissing(OUTPUT_FEATURE.to_string()));
    }

    #[test]
    fn test_backend_failure_propagates() {
        let stub = StubBackend::new(2).with_failure(FailureMode::Always);
        let runner = InferenceRunner::from_backend(stub, DevicePolicy::CpuOnly);

        assert!(matches!(
            runner.predict(vec![0.5, 0.5]),
            Err(PredictError::BackendFailure(_))
        ));
    }

    /// Counts how many input buffers the backend has released.
    struct DropTracking {
        released: Arc<AtomicUsize>,
        fail: bool,
        names: Vec<String>,
    }

    struct Tracked(InputTensor, Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.1.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ModelBackend for DropTracking {
        fn load(_path: &Path, _policy: DevicePolicy) -> Result<Self, LoadError> {
            Err(LoadError::CompilationFailed("not loadable".to_string()))
        }

        fn run(
            &self,
            inputs: Vec<(&str, InputTensor)>,
        ) -> Result<Vec<(String, OutputTensor)>, PredictError> {
            let tracked: Vec<Tracked> = inputs
                .into_iter()
                .map(|(_, t)| Tracked(t, Arc::clone(&self.released)))
                .collect();
            if self.fail {
                return Err(PredictError::BackendFailure("boom".to_string()));
            }
            let out = OutputTensor::new(tracked[0].0.view().clone());
            Ok(vec![(OUTPUT_FEATURE.to_string(), out)])
        }

        fn input_names(&self) -> &[String] {
            &self.names
        }

        fn output_names(&self) -> &[String] {
            &self.names
        }
    }

    #[test]
    fn test_input_released_once_on_every_path() {
        for fail in [false, true] {
            let released = Arc::new(AtomicUsize::new(0));
            let backend = DropTracking {
                released: Arc::clone(&released),
                fail,
                names: Vec::new(),
            };
            let runner = InferenceRunner::from_backend(backend, DevicePolicy::CpuOnly);

            let result = runner.predict(vec![1.0, 2.0, 3.0]);
            assert_eq!(result.is_err(), fail);
            assert_eq!(released.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_load_operator_runner() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"weights": [[1.0, 0.0], [0.0, 1.0]], "activation": "identity"}}"#).unwrap();

        let runner: InferenceRunner<OperatorBackend> =
            InferenceRunner::load(file.path(), DevicePolicy::CpuOnly).unwrap();

        assert_eq!(runner.policy(), DevicePolicy::CpuOnly);
        assert_eq!(runner.predict(vec![0.25, -0.5]).unwrap(), vec![0.25, -0.5]);
    }
}
