//! Config command - manage the benchmark configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use kora_core::BenchConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,

    /// Write a configuration file with default values
    Init {
        /// Where to write it [default: user config dir]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print one value by dotted path (e.g. "batch_size", "device_policies.1")
    Get {
        key: String,
    },

    /// Print where the configuration file lives
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let config_path = default_config_path();

    match args.command {
        ConfigCommand::Show => {
            let config = load_or_default(&config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Init { output, force } => {
            let target = output.unwrap_or(config_path);
            write_defaults(&target, force)?;
            println!(
                "{} Wrote default benchmark config to {}",
                style("✓").green(),
                target.display()
            );
        }
        ConfigCommand::Get { key } => {
            let json = serde_json::to_value(load_or_default(&config_path)?)?;
            let value = lookup(&json, &key)
                .ok_or_else(|| anyhow::anyhow!("no configuration value at '{}'", key))?;
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        ConfigCommand::Path => {
            let status = if config_path.exists() {
                style("present").green()
            } else {
                style("absent, defaults apply").yellow()
            };
            println!("{} ({})", config_path.display(), status);
        }
    }

    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kora")
        .join("config.json")
}

fn load_or_default(path: &Path) -> anyhow::Result<BenchConfig> {
    if path.exists() {
        Ok(BenchConfig::from_file(path)?)
    } else {
        Ok(BenchConfig::default())
    }
}

fn write_defaults(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to replace it",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    BenchConfig::default().save(path)?;
    Ok(())
}

/// Walk a dotted path through objects (by key) and arrays (by index).
fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Value {
        serde_json::to_value(BenchConfig::default()).unwrap()
    }

    #[test]
    fn test_lookup_top_level() {
        assert_eq!(lookup(&defaults(), "batch_size"), Some(&Value::from(100)));
    }

    #[test]
    fn test_lookup_array_index() {
        let json = defaults();
        assert_eq!(lookup(&json, "device_policies.0"), Some(&Value::from("cpu")));
        assert_eq!(lookup(&json, "device_policies.1"), Some(&Value::from("all")));
        assert_eq!(lookup(&json, "device_policies.2"), None);
    }

    #[test]
    fn test_lookup_missing_or_through_scalar() {
        let json = defaults();
        assert_eq!(lookup(&json, "nope"), None);
        assert_eq!(lookup(&json, "batch_size.value"), None);
    }

    #[test]
    fn test_write_defaults_respects_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kora").join("config.json");

        write_defaults(&path, false).unwrap();
        assert!(write_defaults(&path, false).is_err());
        write_defaults(&path, true).unwrap();
        assert_eq!(BenchConfig::from_file(&path).unwrap(), BenchConfig::default());
    }
}
