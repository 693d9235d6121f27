use crate::errors::ConfigError;
use crate::perf::SuiteFamily;
use crate::run::{GuestFieldSource, RunOptions, DEFAULT_GUEST_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LisaConfig {
    #[serde(default = "default_version", rename = "configVersion", alias = "version")]
    pub version: u32,
    #[serde(default = "default_db")]
    pub db: PathBuf,
    /// Identity of the parsing host; falls back to `COMPUTERNAME`/`HOSTNAME`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_by: Option<String>,
    #[serde(default = "default_guest_size")]
    pub guest_size: String,
    #[serde(default = "default_kvp_fields")]
    pub kvp_fields: Vec<String>,
    #[serde(default)]
    pub guest_fields: GuestFieldSource,
    /// Guest OS recorded when the execution log carries no `GuestOS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_vm_check: Option<bool>,
    #[serde(default)]
    pub tables: TableConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableConfig {
    #[serde(default = "default_functional_table")]
    pub functional: String,
    #[serde(default = "default_fio_table")]
    pub fio: String,
    #[serde(default = "default_tcp_table")]
    pub tcp: String,
    #[serde(default = "default_udp_table")]
    pub udp: String,
    #[serde(default = "default_latency_table")]
    pub latency: String,
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

fn default_db() -> PathBuf {
    PathBuf::from("lisa.db")
}

fn default_guest_size() -> String {
    DEFAULT_GUEST_SIZE.to_string()
}

fn default_kvp_fields() -> Vec<String> {
    ["OSName", "OSMajorVersion", "OSBuildNumber"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_functional_table() -> String {
    "TestResults".into()
}

fn default_fio_table() -> String {
    "Perf_Storage_FIO".into()
}

fn default_tcp_table() -> String {
    "Perf_Network_TCP".into()
}

fn default_udp_table() -> String {
    "Perf_Network_UDP".into()
}

fn default_latency_table() -> String {
    "Perf_Network_Latency".into()
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            functional: default_functional_table(),
            fio: default_fio_table(),
            tcp: default_tcp_table(),
            udp: default_udp_table(),
            latency: default_latency_table(),
        }
    }
}

impl TableConfig {
    /// Destination table for a run; `None` selects the functional table.
    pub fn table_for(&self, family: Option<SuiteFamily>) -> &str {
        match family {
            None => &self.functional,
            Some(SuiteFamily::DiskIo) => &self.fio,
            Some(SuiteFamily::Tcp) => &self.tcp,
            Some(SuiteFamily::Udp) => &self.udp,
            Some(SuiteFamily::Latency) => &self.latency,
        }
    }
}

impl Default for LisaConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            db: default_db(),
            host_by: None,
            guest_size: default_guest_size(),
            kvp_fields: default_kvp_fields(),
            guest_fields: GuestFieldSource::default(),
            guest_os: None,
            skip_vm_check: None,
            tables: TableConfig::default(),
        }
    }
}

impl LisaConfig {
    pub fn resolve_host_by(&self) -> String {
        self.host_by
            .clone()
            .or_else(|| std::env::var("COMPUTERNAME").ok())
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or_default()
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            skip_vm_check: self.skip_vm_check,
            host_by: self.resolve_host_by(),
            guest_size: self.guest_size.clone(),
            guest_fields: self.guest_fields,
            guest_os: self.guest_os.clone(),
        }
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<LisaConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_config(&raw, strict)
        .map_err(|ConfigError(msg)| ConfigError(format!("{} (file: {})", msg, path.display())))
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(path: &Path, strict: bool) -> Result<LisaConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(event = "config_default", path = %path.display());
        return Ok(LisaConfig::default());
    }
    load_config(path, strict)
}

pub fn parse_config(raw: &str, strict: bool) -> Result<LisaConfig, ConfigError> {
    let mut ignored_keys = HashSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let cfg: LisaConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .cloned()
        .collect();

    if !meaningful_unknowns.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?}",
                meaningful_unknowns
            )));
        }
        tracing::warn!(
            event = "config_unknown_fields",
            fields = ?meaningful_unknowns,
            "Ignored unknown config fields"
        );
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"configVersion: 1
db: lisa.db
# host_by: LAB-HOST-01
guest_size: 8VP8G40G
kvp_fields: [OSName, OSMajorVersion, OSBuildNumber]
guest_fields: run_log
# guest_os: FreeBSD
tables:
  functional: TestResults
  fio: Perf_Storage_FIO
  tcp: Perf_Network_TCP
  udp: Perf_Network_UDP
  latency: Perf_Network_Latency
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
