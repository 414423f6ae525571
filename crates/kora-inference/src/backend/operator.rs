//! Built-in rate-based regulatory operator.
//!
//! The artifact is a JSON weight matrix `W` where `W[i][j]` is the influence
//! of gene `i` on gene `j`. Prediction splits `Wᵀ` into an excitatory part
//! (positive weights) and an inhibitory part (magnitudes of negative weights)
//! and computes `activation(W⁺ᵀ·x − W⁻ᵀ·x + b)`, where the bias `b` is
//! optional and defaults to zero.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::take_input;
use crate::{
    DevicePolicy, INPUT_FEATURE, InputTensor, LoadError, ModelBackend, OUTPUT_FEATURE,
    OutputTensor, PredictError,
};

/// Output non-linearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
    Relu,
    Identity,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            Activation::Identity => x,
        }
    }
}

/// On-disk operator description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    /// Square weight matrix, `weights[source][target]`.
    pub weights: Vec<Vec<f32>>,

    /// Per-target bias, one entry per gene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<Vec<f32>>,

    #[serde(default)]
    pub activation: Activation,
}

/// CPU backend evaluating an [`OperatorSpec`] with `ndarray`.
#[derive(Debug, Clone)]
pub struct OperatorBackend {
    excitation: Array2<f32>,
    inhibition: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OperatorBackend {
    /// Compile an operator from an in-memory spec.
    pub fn from_spec(spec: OperatorSpec) -> Result<Self, LoadError> {
        let n = spec.weights.len();
        if n == 0 {
            return Err(LoadError::CompilationFailed("weight matrix is empty".to_string()));
        }
        if let Some((row, values)) = spec.weights.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(LoadError::CompilationFailed(format!(
                "weight matrix must be square: row {} has {} columns, expected {}",
                row,
                values.len(),
                n
            )));
        }

        let bias = match spec.bias {
            Some(bias) if bias.len() != n => {
                return Err(LoadError::CompilationFailed(format!(
                    "bias has {} entries, expected {}",
                    bias.len(),
                    n
                )));
            }
            Some(bias) => Array1::from_iter(bias.into_iter().map(finite_or_zero)),
            None => Array1::zeros(n),
        };

        let flat: Vec<f32> = spec
            .weights
            .into_iter()
            .flatten()
            .map(finite_or_zero)
            .collect();
        let weights = Array2::from_shape_vec((n, n), flat)
            .map_err(|e| LoadError::CompilationFailed(e.to_string()))?;

        // Rows of the transpose are targets, columns are sources.
        let transposed = weights.reversed_axes();
        let excitation = transposed.mapv(|w| w.max(0.0));
        let inhibition = transposed.mapv(|w| w.min(0.0).abs());

        debug!("Compiled {}x{} operator ({:?})", n, n, spec.activation);

        Ok(Self {
            excitation,
            inhibition,
            bias,
            activation: spec.activation,
            input_names: vec![INPUT_FEATURE.to_string()],
            output_names: vec![OUTPUT_FEATURE.to_string()],
        })
    }

    /// Number of genes the operator covers.
    pub fn n_genes(&self) -> usize {
        self.excitation.nrows()
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

impl ModelBackend for OperatorBackend {
    fn load(path: &Path, policy: DevicePolicy) -> Result<Self, LoadError> {
        info!("Loading operator weights from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;

        if policy != DevicePolicy::CpuOnly {
            return Err(LoadError::ConfigurationRejected {
                policy,
                reason: "the operator backend only executes on the CPU".to_string(),
            });
        }

        let spec: OperatorSpec = serde_json::from_str(&content)
            .map_err(|e| LoadError::CompilationFailed(format!("invalid operator file: {}", e)))?;

        Self::from_spec(spec)
    }

    fn run(&self, inputs: Vec<(&str, InputTensor)>) -> Result<Vec<(String, OutputTensor)>, PredictError> {
        let input = take_input(inputs, INPUT_FEATURE)?;
        let expected = self.n_genes();
        if input.len() != expected {
            return Err(PredictError::InputShapeMismatch {
                expected,
                actual: input.len(),
            });
        }

        let x = Array1::from_vec(input.into_vec());
        let net = self.excitation.dot(&x) - self.inhibition.dot(&x) + &self.bias;
        let activation = self.activation;
        let regulation = net.mapv(|v| activation.apply(v));

        Ok(vec![(OUTPUT_FEATURE.to_string(), OutputTensor::new(regulation.into_dyn()))])
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.n_genes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn predict(backend: &OperatorBackend, x: Vec<f32>) -> Vec<f32> {
        let outputs = backend
            .run(vec![(INPUT_FEATURE, InputTensor::from_flat(x))])
            .unwrap();
        outputs[0].1.to_flat()
    }

    #[test]
    fn test_operator_applies_transposed_weights() {
        // Gene 0 excites gene 1, gene 1 inhibits gene 0.
        let spec = OperatorSpec {
            weights: vec![vec![0.0, 2.0], vec![-1.0, 0.0]],
            bias: None,
            activation: Activation::Identity,
        };
        let backend = OperatorBackend::from_spec(spec).unwrap();

        assert_eq!(predict(&backend, vec![1.0, 3.0]), vec![-3.0, 2.0]);
    }

    #[test]
    fn test_operator_default_activation_is_tanh() {
        let spec: OperatorSpec = serde_json::from_str(r#"{"weights": [[1.0]]}"#).unwrap();
        assert_eq!(spec.activation, Activation::Tanh);

        let backend = OperatorBackend::from_spec(spec).unwrap();
        assert_eq!(predict(&backend, vec![0.5]), vec![0.5f32.tanh()]);
    }

    #[test]
    fn test_operator_adds_bias_before_activation() {
        let spec: OperatorSpec = serde_json::from_str(
            r#"{"weights": [[0.0, 2.0], [-1.0, 0.0]], "bias": [0.5, -4.0], "activation": "relu"}"#,
        )
        .unwrap();
        let backend = OperatorBackend::from_spec(spec).unwrap();

        // Net input is [-3.0 + 0.5, 2.0 - 4.0], both clamped by relu.
        assert_eq!(predict(&backend, vec![1.0, 3.0]), vec![0.0, 0.0]);
        assert_eq!(predict(&backend, vec![0.0, 0.0]), vec![0.5, 0.0]);
    }

    #[test]
    fn test_operator_rejects_bias_length() {
        let spec = OperatorSpec {
            weights: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            bias: Some(vec![0.1, 0.2, 0.3]),
            activation: Activation::Identity,
        };
        assert!(matches!(
            OperatorBackend::from_spec(spec),
            Err(LoadError::CompilationFailed(_))
        ));
    }

    #[test]
    fn test_operator_zeroes_non_finite_weights() {
        let spec = OperatorSpec {
            weights: vec![vec![f32::NAN, f32::INFINITY], vec![f32::NEG_INFINITY, 1.0]],
            bias: None,
            activation: Activation::Relu,
        };
        let backend = OperatorBackend::from_spec(spec).unwrap();
        assert_eq!(predict(&backend, vec![1.0, 1.0]), vec![0.0, 1.0]);
    }

    #[test]
    fn test_operator_rejects_non_square() {
        let spec = OperatorSpec {
            weights: vec![vec![1.0, 2.0], vec![3.0]],
            bias: None,
            activation: Activation::Tanh,
        };
        assert!(matches!(
            OperatorBackend::from_spec(spec),
            Err(LoadError::CompilationFailed(_))
        ));

        let empty = OperatorSpec {
            weights: Vec::new(),
            bias: None,
            activation: Activation::Tanh,
        };
        assert!(matches!(
            OperatorBackend::from_spec(empty),
            Err(LoadError::CompilationFailed(_))
        ));
    }

    #[test]
    fn test_operator_shape_mismatch() {
        let backend = OperatorBackend::from_spec(OperatorSpec {
            weights: vec![vec![1.0; 3]; 3],
            bias: None,
            activation: Activation::Tanh,
        })
        .unwrap();

        let err = backend
            .run(vec![(INPUT_FEATURE, InputTensor::from_flat(vec![1.0; 4]))])
            .unwrap_err();
        assert_eq!(err, PredictError::InputShapeMismatch { expected: 3, actual: 4 });
    }

    #[test]
    fn test_operator_load_errors() {
        let missing = OperatorBackend::load(Path::new("/no/such/operator.json"), DevicePolicy::CpuOnly);
        assert!(matches!(missing, Err(LoadError::ArtifactNotFound(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"weights": [[0.5, 0.0], [0.0, 0.5]]}}"#).unwrap();

        let rejected = OperatorBackend::load(file.path(), DevicePolicy::AllAvailable);
        assert!(matches!(
            rejected,
            Err(LoadError::ConfigurationRejected { policy: DevicePolicy::AllAvailable, .. })
        ));

        let backend = OperatorBackend::load(file.path(), DevicePolicy::CpuOnly).unwrap();
        assert_eq!(backend.input_len(), Some(2));

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert!(matches!(
            OperatorBackend::load(garbage.path(), DevicePolicy::CpuOnly),
            Err(LoadError::CompilationFailed(_))
        ));
    }
}
