//! Inspect command - show what a model declares.

use std::path::PathBuf;

use clap::Args;
use console::style;

use kora_core::{BackendKind, DevicePolicy, ModelBackend, OperatorBackend, StubBackend};

use super::BackendArg;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Model artifact
    #[arg(required = true)]
    model_path: PathBuf,

    /// Backend used to load the model [default: from file extension]
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let backend = args
        .backend
        .map(BackendKind::from)
        .unwrap_or_default()
        .resolve(&args.model_path);

    let path = args.model_path.as_path();
    let policy = DevicePolicy::CpuOnly;

    match backend {
        BackendKind::Operator => describe(&OperatorBackend::load(path, policy)?),
        BackendKind::Stub => describe(&StubBackend::load(path, policy)?),
        #[cfg(feature = "native")]
        BackendKind::Ort => describe(&kora_core::OrtBackend::load(path, policy)?),
        #[cfg(feature = "tract")]
        BackendKind::Tract => describe(&kora_core::TractBackend::load(path, policy)?),
        other => anyhow::bail!("backend {:?} is not available in this build", other),
    }

    Ok(())
}

fn describe<B: ModelBackend>(backend: &B) {
    println!("{}", style("Inputs:").bold());
    for name in backend.input_names() {
        println!("  - {}", name);
    }

    println!("{}", style("Outputs:").bold());
    for name in backend.output_names() {
        println!("  - {}", name);
    }

    match backend.input_len() {
        Some(len) => println!("Input width: {}", len),
        None => println!("Input width: {}", style("dynamic").yellow()),
    }
}
