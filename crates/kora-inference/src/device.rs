//! Compute-device selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where inference executes. Fixed for a runner's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevicePolicy {
    /// Restrict execution to the CPU.
    #[serde(rename = "cpu")]
    CpuOnly,
    /// Let the backend use every accelerator it can find.
    #[serde(rename = "all")]
    AllAvailable,
}

impl DevicePolicy {
    /// All policies, in benchmark order.
    pub const ALL: [DevicePolicy; 2] = [DevicePolicy::CpuOnly, DevicePolicy::AllAvailable];

    /// Row label used in benchmark reports.
    pub fn label(&self) -> &'static str {
        match self {
            DevicePolicy::CpuOnly => "cpu",
            DevicePolicy::AllAvailable => "npu",
        }
    }

    /// Human-readable heading.
    pub fn title(&self) -> &'static str {
        match self {
            DevicePolicy::CpuOnly => "CPU Only",
            DevicePolicy::AllAvailable => "NPU/All",
        }
    }
}

impl fmt::Display for DevicePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePolicy::CpuOnly => write!(f, "cpu"),
            DevicePolicy::AllAvailable => write!(f, "all"),
        }
    }
}

impl FromStr for DevicePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" | "cpu-only" | "cpuonly" => Ok(DevicePolicy::CpuOnly),
            "all" | "npu" | "all-available" | "allavailable" => Ok(DevicePolicy::AllAvailable),
            other => Err(format!("unknown device policy: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("cpu".parse::<DevicePolicy>(), Ok(DevicePolicy::CpuOnly));
        assert_eq!("CPU-Only".parse::<DevicePolicy>(), Ok(DevicePolicy::CpuOnly));
        assert_eq!("npu".parse::<DevicePolicy>(), Ok(DevicePolicy::AllAvailable));
        assert_eq!(" all ".parse::<DevicePolicy>(), Ok(DevicePolicy::AllAvailable));
        assert!("gpu".parse::<DevicePolicy>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(DevicePolicy::CpuOnly.label(), "cpu");
        assert_eq!(DevicePolicy::AllAvailable.label(), "npu");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DevicePolicy::ALL).unwrap();
        assert_eq!(json, r#"["cpu","all"]"#);
        let parsed: Vec<DevicePolicy> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DevicePolicy::ALL.to_vec());
    }
}
