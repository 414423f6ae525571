//! Batch-timing harness.
//!
//! One warmup prediction, then `batch_size` sequential predictions timed
//! with a monotonic clock. Prediction failures never abort a run; they are
//! counted and logged so a fast-but-failing backend can be told apart from
//! a fast one.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use kora_inference::Predictor;

/// Value every element of the benchmark input is set to.
pub const WARMUP_VALUE: f32 = 0.5;

/// Elapsed time for one timed batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Wall-clock seconds spent in the timed loop.
    pub elapsed_seconds: f64,

    /// Number of timed predictions.
    pub batch_size: u32,
}

impl BenchmarkResult {
    /// Samples per second, or `None` when either side of the division is zero.
    pub fn throughput(&self) -> Option<f64> {
        (self.elapsed_seconds > 0.0 && self.batch_size > 0)
            .then(|| f64::from(self.batch_size) / self.elapsed_seconds)
    }

    /// Seconds per sample, or `None` for an empty batch.
    pub fn mean_latency(&self) -> Option<f64> {
        (self.batch_size > 0).then(|| self.elapsed_seconds / f64::from(self.batch_size))
    }
}

/// A [`BenchmarkResult`] plus the failures swallowed while producing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOutcome {
    pub result: BenchmarkResult,

    /// Timed predictions that returned an error.
    pub failed_calls: u32,

    /// Whether the untimed warmup prediction failed.
    pub warmup_failed: bool,
}

impl BenchmarkOutcome {
    pub fn elapsed_seconds(&self) -> f64 {
        self.result.elapsed_seconds
    }

    /// True when every timed prediction succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed_calls == 0
    }
}

/// Time `batch_size` predictions on `runner`, returning elapsed seconds.
pub fn benchmark<P: Predictor + ?Sized>(runner: &P, input_width: u32, batch_size: u32) -> f64 {
    benchmark_detailed(runner, input_width, batch_size).elapsed_seconds()
}

/// Like [`benchmark`], also reporting swallowed failures.
///
/// The same constant input is used for every call; it is cloned per call
/// because `predict` consumes its buffer.
pub fn benchmark_detailed<P: Predictor + ?Sized>(
    runner: &P,
    input_width: u32,
    batch_size: u32,
) -> BenchmarkOutcome {
    let input = vec![WARMUP_VALUE; input_width as usize];

    info!("Benchmarking {} predictions of width {}", batch_size, input_width);

    let warmup_failed = match runner.predict(input.clone()) {
        Ok(_) => false,
        Err(e) => {
            warn!("Warmup prediction failed: {}", e);
            true
        }
    };

    let mut failed_calls = 0u32;

    let start = Instant::now();
    for call in 0..batch_size {
        if let Err(e) = runner.predict(input.clone()) {
            failed_calls += 1;
            debug!("Timed prediction {} failed: {}", call, e);
        }
    }
    let elapsed_seconds = start.elapsed().as_secs_f64();

    if failed_calls > 0 {
        warn!(
            "{} of {} timed predictions failed; elapsed time does not reflect real inference",
            failed_calls, batch_size
        );
    }
    debug!("Timed loop finished in {:.6}s", elapsed_seconds);

    BenchmarkOutcome {
        result: BenchmarkResult {
            elapsed_seconds,
            batch_size,
        },
        failed_calls,
        warmup_failed,
    }
}
