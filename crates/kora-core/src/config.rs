//! Benchmark configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kora_inference::DevicePolicy;

use crate::{KoraError, Result};

/// Batch size used when none is given.
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Input width used when none is given.
pub const DEFAULT_INPUT_WIDTH: u32 = 5000;

/// Which backend executes the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick from the artifact's file extension.
    #[default]
    Auto,
    Ort,
    Tract,
    Operator,
    Stub,
}

impl BackendKind {
    /// Resolve `Auto` against the artifact path.
    ///
    /// `.json` files are operator weights; anything else is treated as ONNX.
    pub fn resolve(self, artifact_path: &Path) -> BackendKind {
        match self {
            BackendKind::Auto => {
                let extension = artifact_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_lowercase();
                match extension.as_str() {
                    "json" => BackendKind::Operator,
                    _ => BackendKind::Ort,
                }
            }
            other => other,
        }
    }
}

/// One benchmark run: a model, an input width, a batch size and the
/// device policies to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Path to the model artifact.
    pub artifact_path: PathBuf,

    /// Number of input values per prediction (genes).
    pub input_width: u32,

    /// Timed predictions per device policy.
    pub batch_size: u32,

    /// Device policies to benchmark, in order.
    pub device_policies: Vec<DevicePolicy>,

    /// Backend used to execute the model.
    pub backend: BackendKind,

    /// Intra-op threads for backends that support it.
    pub intra_threads: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::new(),
            input_width: DEFAULT_INPUT_WIDTH,
            batch_size: DEFAULT_BATCH_SIZE,
            device_policies: DevicePolicy::ALL.to_vec(),
            backend: BackendKind::Auto,
            intra_threads: 4,
        }
    }
}

impl BenchConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the configuration describes a runnable benchmark.
    pub fn validate(&self) -> Result<()> {
        if self.artifact_path.as_os_str().is_empty() {
            return Err(KoraError::Config("artifact path is not set".to_string()));
        }
        if self.input_width == 0 {
            return Err(KoraError::Config("input width must be at least 1".to_string()));
        }
        if self.device_policies.is_empty() {
            return Err(KoraError::Config("no device policies selected".to_string()));
        }
        Ok(())
    }

    /// Backend with `Auto` resolved.
    pub fn resolved_backend(&self) -> BackendKind {
        self.backend.resolve(&self.artifact_path)
    }
}
