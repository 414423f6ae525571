//! Benchmark one model across several device policies.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kora_inference::{DevicePolicy, LoadError, Predictor};

use crate::harness::{BenchmarkResult, benchmark_detailed};
use crate::{BenchConfig, KoraError, Result};

/// When a report was produced.
pub type Timestamp = DateTime<Utc>;

/// Measurements for a single device policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub policy: DevicePolicy,
    pub result: BenchmarkResult,
    pub failed_calls: u32,
    pub warmup_failed: bool,
}

impl DeviceReport {
    /// Report label (`cpu`, `npu`).
    pub fn label(&self) -> &'static str {
        self.policy.label()
    }
}

/// Measurements for every device policy of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub artifact_path: PathBuf,
    pub input_width: u32,
    pub batch_size: u32,
    pub generated_at: Timestamp,
    pub devices: Vec<DeviceReport>,
}

/// Benchmark the configured model under each device policy in order.
///
/// `loader` builds a runner for a policy. A load failure stops the suite
/// with [`KoraError::SuiteAborted`], which carries the reports of the
/// policies already measured; the failing policy and any after it get no
/// result and nothing is retried. Each runner is dropped before the next
/// policy is loaded.
pub fn run_suite<R, F>(config: BenchConfig, mut loader: F) -> Result<SuiteReport>
where
    R: Predictor,
    F: FnMut(&Path, DevicePolicy) -> std::result::Result<R, LoadError>,
{
    config.validate()?;

    let mut devices = Vec::with_capacity(config.device_policies.len());

    for &policy in &config.device_policies {
        info!("Benchmarking device policy '{}'", policy);

        let runner = match loader(&config.artifact_path, policy) {
            Ok(runner) => runner,
            Err(source) => {
                warn!("Device policy '{}' failed to load: {}", policy, source);
                return Err(KoraError::SuiteAborted {
                    policy,
                    completed: Box::new(SuiteReport {
                        artifact_path: config.artifact_path,
                        input_width: config.input_width,
                        batch_size: config.batch_size,
                        generated_at: Utc::now(),
                        devices,
                    }),
                    source,
                });
            }
        };
        let outcome = benchmark_detailed(&runner, config.input_width, config.batch_size);

        devices.push(DeviceReport {
            policy,
            result: outcome.result,
            failed_calls: outcome.failed_calls,
            warmup_failed: outcome.warmup_failed,
        });
    }

    Ok(SuiteReport {
        artifact_path: config.artifact_path,
        input_width: config.input_width,
        batch_size: config.batch_size,
        generated_at: Utc::now(),
        devices,
    })
}
