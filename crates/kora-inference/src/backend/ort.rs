//! ONNX Runtime (ort) backend for native platforms.

use std::path::Path;
use std::sync::Mutex;

use ort::ep::{CPU, ExecutionProviderDispatch, XNNPACK};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::{Tensor, ValueType};
use tracing::{debug, info};

use crate::backend::take_input;
use crate::{
    DevicePolicy, INPUT_FEATURE, InputTensor, LoadError, ModelBackend, OutputTensor,
    PredictError,
};

/// Default intra-op thread count.
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// Backend using ONNX Runtime for native inference.
pub struct OrtBackend {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    input_dims: Option<Vec<i64>>,
}

impl OrtBackend {
    /// Load a model from a file path with an explicit intra-op thread count.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        policy: DevicePolicy,
        intra_threads: usize,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!("Loading ONNX model from: {} ({})", path.display(), policy);

        let bytes = std::fs::read(path).map_err(|e| LoadError::from_io(path, e))?;

        Self::from_bytes(&bytes, policy, intra_threads)
    }

    /// Load a model from bytes.
    pub fn from_bytes(
        bytes: &[u8],
        policy: DevicePolicy,
        intra_threads: usize,
    ) -> Result<Self, LoadError> {
        debug!("Loading ONNX model from {} bytes", bytes.len());

        let session = Session::builder()
            .map_err(compilation_failed)?
            .with_execution_providers(execution_providers(policy))
            .map_err(|e| LoadError::ConfigurationRejected {
                policy,
                reason: e.to_string(),
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(compilation_failed)?
            .with_intra_threads(intra_threads.max(1))
            .map_err(compilation_failed)?
            .commit_from_memory(bytes)
            .map_err(compilation_failed)?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        // Dynamic dimensions are reported as -1 and leave the shape unknown.
        let input_dims = session.inputs().first().and_then(|input| match input.dtype() {
            ValueType::Tensor { shape, .. } if shape.iter().all(|&d| d >= 0) => {
                Some(shape.iter().copied().collect::<Vec<i64>>())
            }
            _ => None,
        });

        debug!("Model inputs: {:?} (dims {:?})", input_names, input_dims);
        debug!("Model outputs: {:?}", output_names);

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
            input_dims,
        })
    }
}

/// Shape to send a flat input of `len` values in.
///
/// Static declared dims (e.g. `[1, n]`) are used as-is when they hold
/// exactly `len` values; otherwise the input goes as rank 1.
fn input_shape(declared: Option<&[i64]>, len: usize) -> Vec<i64> {
    match declared {
        Some(dims) if dims.iter().product::<i64>() == len as i64 => dims.to_vec(),
        _ => vec![len as i64],
    }
}

fn compilation_failed<E: std::fmt::Display>(e: E) -> LoadError {
    LoadError::CompilationFailed(e.to_string())
}

/// Providers registered for a policy, in priority order.
///
/// Accelerated providers are required to register so an unsupported
/// configuration surfaces as a load error rather than a silent CPU fallback.
fn execution_providers(policy: DevicePolicy) -> Vec<ExecutionProviderDispatch> {
    match policy {
        DevicePolicy::CpuOnly => vec![CPU::default().build()],
        DevicePolicy::AllAvailable => vec![
            XNNPACK::default().build().error_on_failure(),
            CPU::default().build(),
        ],
    }
}

impl ModelBackend for OrtBackend {
    fn load(path: &Path, policy: DevicePolicy) -> Result<Self, LoadError> {
        Self::from_file(path, policy, DEFAULT_INTRA_THREADS)
    }

    fn run(&self, inputs: Vec<(&str, InputTensor)>) -> Result<Vec<(String, OutputTensor)>, PredictError> {
        let input = take_input(inputs, INPUT_FEATURE)?;
        let shape = input_shape(self.input_dims.as_deref(), input.len());

        // The buffer moves into the ort tensor and is freed with it.
        let value = Tensor::from_array((shape, input.into_vec()))
            .map_err(|e| PredictError::BackendFailure(e.to_string()))?;

        let mut session = self.session.lock().map_err(|e| {
            PredictError::BackendFailure(format!("Failed to lock session: {}", e))
        })?;

        let ort_inputs: Vec<(&str, ort::session::SessionInputValue<'static>)> =
            vec![(INPUT_FEATURE, value.into())];

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| PredictError::BackendFailure(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (name, value) in outputs.iter() {
            // Non-float outputs are not part of this model's contract.
            let Ok((shape_ref, data)) = value.try_extract_tensor::<f32>() else {
                debug!("Skipping non-f32 output '{}'", name);
                continue;
            };
            let shape: Vec<usize> = shape_ref.iter().map(|&s| s as usize).collect();
            let tensor = OutputTensor::from_shape_vec(&shape, data.to_vec())
                .map_err(|e| PredictError::BackendFailure(e.to_string()))?;
            results.push((name.to_string(), tensor));
        }

        Ok(results)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn input_len(&self) -> Option<usize> {
        self.input_dims
            .as_ref()
            .map(|dims| dims.iter().map(|&d| d as usize).product())
    }
}
