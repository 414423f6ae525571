//! Tract backend for pure-Rust CPU inference.

use std::path::Path;

use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::backend::take_input;
use crate::{
    DevicePolicy, INPUT_FEATURE, InputTensor, LoadError, ModelBackend, OUTPUT_FEATURE,
    OutputTensor, PredictError,
};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Backend using Tract for CPU-only ONNX inference.
pub struct TractBackend {
    model: Plan,
    input_len: usize,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load a model whose input is pinned to `[input_len]`.
    ///
    /// Needed for models exported with a symbolic input dimension.
    pub fn load_with_input_len<P: AsRef<Path>>(
        path: P,
        policy: DevicePolicy,
        input_len: usize,
    ) -> Result<Self, LoadError> {
        Self::build(path.as_ref(), policy, Some(input_len))
    }

    fn build(path: &Path, policy: DevicePolicy, input_len: Option<usize>) -> Result<Self, LoadError> {
        info!("Loading ONNX model with Tract from: {}", path.display());

        if !path.exists() {
            return Err(LoadError::ArtifactNotFound(path.to_path_buf()));
        }
        if policy != DevicePolicy::CpuOnly {
            return Err(LoadError::ConfigurationRejected {
                policy,
                reason: "tract only executes on the CPU".to_string(),
            });
        }

        let compile = |stage: &str, e: TractError| {
            LoadError::CompilationFailed(format!("{}: {}", stage, e))
        };

        let mut model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| compile("failed to load model", e))?;

        if let Some(n) = input_len {
            let shape: &[usize] = &[n];
            model
                .set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
                .map_err(|e| compile("failed to set input shape", e))?;
        }

        let typed = model
            .into_typed()
            .map_err(|e| compile("failed to type model", e))?;

        let declared = typed
            .input_fact(0)
            .map_err(|e| compile("model has no input", e))?
            .shape
            .as_concrete()
            .map(|dims| dims.iter().product::<usize>());
        let input_len = declared.ok_or_else(|| {
            LoadError::CompilationFailed(
                "model input has symbolic dimensions; load it with an explicit input length"
                    .to_string(),
            )
        })?;

        let label = |outlet: &OutletId| {
            typed
                .outlet_label(*outlet)
                .map(str::to_string)
                .unwrap_or_else(|| typed.node(outlet.node).name.clone())
        };
        let input_names: Vec<String> = typed
            .input_outlets()
            .map_err(|e| compile("inputs", e))?
            .iter()
            .map(label)
            .collect();
        let output_names: Vec<String> = typed
            .output_outlets()
            .map_err(|e| compile("outputs", e))?
            .iter()
            .map(label)
            .collect();

        let model = typed
            .into_optimized()
            .map_err(|e| compile("failed to optimize", e))?
            .into_runnable()
            .map_err(|e| compile("failed to plan", e))?;

        debug!(
            "Tract model ready: inputs {:?}, outputs {:?}, arity {}",
            input_names, output_names, input_len
        );

        Ok(Self {
            model,
            input_len,
            input_names,
            output_names,
        })
    }
}

impl ModelBackend for TractBackend {
    fn load(path: &Path, policy: DevicePolicy) -> Result<Self, LoadError> {
        Self::build(path, policy, None)
    }

    fn run(&self, inputs: Vec<(&str, InputTensor)>) -> Result<Vec<(String, OutputTensor)>, PredictError> {
        let input = take_input(inputs, INPUT_FEATURE)?;
        if input.len() != self.input_len {
            return Err(PredictError::InputShapeMismatch {
                expected: self.input_len,
                actual: input.len(),
            });
        }

        let tract_tensor = tract_ndarray::Array1::from_vec(input.into_vec()).into_dyn();
        let outputs = self
            .model
            .run(tvec!(tract_tensor.into_tvalue()))
            .map_err(|e| PredictError::BackendFailure(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .output_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| OUTPUT_FEATURE.to_string());

            let view = output
                .to_array_view::<f32>()
                .map_err(|e| PredictError::BackendFailure(format!("output '{}': {}", name, e)))?;
            let data: Vec<f32> = view.iter().copied().collect();
            let tensor = OutputTensor::from_shape_vec(view.shape(), data)
                .map_err(|e| PredictError::BackendFailure(e.to_string()))?;

            results.push((name, tensor));
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
        Some(self.input_len)
    }
}
