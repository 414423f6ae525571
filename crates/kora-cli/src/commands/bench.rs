//! Bench command - time a model under each device policy.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use kora_core::{
    BackendKind, BenchConfig, DevicePolicy, InferenceRunner, KoraError, OperatorBackend,
    StubBackend, SuiteReport, run_suite,
};

use super::BackendArg;

/// Arguments for the bench command.
#[derive(Args)]
pub struct BenchArgs {
    /// Model artifact (.onnx, or .json operator weights)
    #[arg(required = true)]
    model_path: PathBuf,

    /// Number of input values (genes) per prediction
    #[arg(required = true)]
    n_genes: u32,

    /// Timed predictions per device policy [default: 100]
    batch_size: Option<u32>,

    /// Device policies to benchmark (cpu, all)
    #[arg(short, long, value_delimiter = ',')]
    device: Vec<DevicePolicy>,

    /// Backend used to run the model [default: from file extension]
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Intra-op threads for the ort backend
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary
    Text,
    /// device,time,throughput rows
    Csv,
    /// Full JSON report
    Json,
}

pub fn run(args: BenchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = if let Some(path) = config_path {
        BenchConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to read config file {}", path))?
    } else {
        BenchConfig::default()
    };

    config.artifact_path = args.model_path;
    config.input_width = args.n_genes;
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if !args.device.is_empty() {
        config.device_policies = args.device;
    }
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }
    if let Some(threads) = args.threads {
        config.intra_threads = threads;
    }

    info!("Loading model from {}...", config.artifact_path.display());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = execute(config, &spinner);
    spinner.finish_and_clear();

    match result {
        Ok(report) => emit(&report, args.format, args.output.as_deref()),
        Err(KoraError::SuiteAborted {
            policy,
            completed,
            source,
        }) => {
            // Policies measured before the failure are still reported.
            if !completed.devices.is_empty() {
                emit(&completed, args.format, args.output.as_deref())?;
            }
            Err(anyhow::Error::new(source)
                .context(format!("benchmark stopped at device policy '{}'", policy)))
        }
        Err(e) => Err(e.into()),
    }
}

fn emit(report: &SuiteReport, format: ReportFormat, output: Option<&Path>) -> anyhow::Result<()> {
    let rendered = match format {
        ReportFormat::Text => render_text(report),
        ReportFormat::Csv => render_csv(report)?,
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
    };

    if let Some(output_path) = output {
        fs::write(output_path, &rendered)?;
        println!(
            "{} Report written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", rendered);
    }

    Ok(())
}

/// Run the suite with the backend the config resolves to.
fn execute(config: BenchConfig, spinner: &ProgressBar) -> kora_core::Result<SuiteReport> {
    let backend = config.resolved_backend();
    debug!("Using {:?} backend", backend);

    let announce = |policy: DevicePolicy| {
        spinner.set_message(format!("Benchmarking {}", policy.title()));
    };

    let report = match backend {
        BackendKind::Operator => run_suite(config, |path, policy| {
            announce(policy);
            InferenceRunner::<OperatorBackend>::load(path, policy)
        })?,
        BackendKind::Stub => run_suite(config, |path, policy| {
            announce(policy);
            InferenceRunner::<StubBackend>::load(path, policy)
        })?,
        #[cfg(feature = "native")]
        BackendKind::Ort => {
            let threads = config.intra_threads;
            run_suite(config, |path, policy| {
                announce(policy);
                kora_core::OrtBackend::from_file(path, policy, threads)
                    .map(|backend| InferenceRunner::from_backend(backend, policy))
            })?
        }
        #[cfg(feature = "tract")]
        BackendKind::Tract => {
            // Pin the model input to the benchmark width.
            let width = config.input_width as usize;
            run_suite(config, |path, policy| {
                announce(policy);
                kora_core::TractBackend::load_with_input_len(path, policy, width)
                    .map(|backend| InferenceRunner::from_backend(backend, policy))
            })?
        }
        other => {
            return Err(KoraError::Config(format!(
                "backend {:?} is not available in this build",
                other
            )));
        }
    };

    Ok(report)
}

fn render_text(report: &SuiteReport) -> String {
    let mut output = String::new();

    for device in &report.devices {
        let result = &device.result;

        output.push_str(&format!("\n--- {} ---\n", device.policy.title()));
        output.push_str(&format!("Time: {:.4}s\n", result.elapsed_seconds));
        match result.throughput() {
            Some(throughput) => {
                output.push_str(&format!("Throughput: {:.2} samples/s\n", throughput))
            }
            None => output.push_str("Throughput: n/a\n"),
        }
        if let Some(latency) = result.mean_latency() {
            output.push_str(&format!("Mean latency: {:.3}ms\n", latency * 1000.0));
        }

        if device.warmup_failed {
            output.push_str(&format!("{}\n", style("! warmup prediction failed").yellow()));
        }
        if device.failed_calls > 0 {
            output.push_str(&format!(
                "{}\n",
                style(format!(
                    "! {} of {} predictions failed; timing is not meaningful",
                    device.failed_calls, result.batch_size
                ))
                .yellow()
            ));
        }
    }

    output
}

fn render_csv(report: &SuiteReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["device", "time", "throughput"])?;

    for device in &report.devices {
        let throughput = device
            .result
            .throughput()
            .map(|t| t.to_string())
            .unwrap_or_default();
        wtr.write_record([
            device.label(),
            &device.result.elapsed_seconds.to_string(),
            &throughput,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
