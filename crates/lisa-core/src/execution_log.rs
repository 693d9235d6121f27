use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Structured content of a harness execution log.
///
/// `tests` maps a test case name to the `(vm_name, result)` pair the
/// harness reported for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionLog {
    pub timestamp: String,
    #[serde(rename = "logPath", default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    #[serde(rename = "GuestOS", default, skip_serializing_if = "Option::is_none")]
    pub guest_os: Option<String>,
    #[serde(rename = "GuestDistro", default, skip_serializing_if = "Option::is_none")]
    pub guest_distro: Option<String>,
    #[serde(rename = "KernelVersion", default, skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    #[serde(default)]
    pub vms: BTreeMap<String, LoggedVm>,
    #[serde(default)]
    pub tests: BTreeMap<String, (String, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggedVm {
    #[serde(rename = "hostOS")]
    pub host_os: String,
    #[serde(rename = "hvServer")]
    pub hv_server: String,
    #[serde(rename = "TestLocation", default)]
    pub location: String,
}

impl ExecutionLog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read execution log: {}", path.display()))?;
        Self::parse(&raw)
            .with_context(|| format!("failed to parse execution log: {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let log: ExecutionLog = serde_yaml::from_str(raw)?;
        Ok(log)
    }
}
