use crate::model::TestProperties;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Declared content of a test suite: its name, test cases and VMs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SuiteDefinition {
    #[serde(rename = "suiteName")]
    pub suite_name: String,
    #[serde(default)]
    pub tests: BTreeMap<String, TestProperties>,
    #[serde(default)]
    pub vms: BTreeMap<String, VmDeclaration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VmDeclaration {
    #[serde(rename = "hvServer")]
    pub hv_server: String,
    #[serde(default)]
    pub os: String,
}

impl SuiteDefinition {
    /// Reads a suite definition document (YAML or JSON).
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read suite definition: {}", path.display()))?;
        Self::parse(&raw)
            .with_context(|| format!("failed to parse suite definition: {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let def: SuiteDefinition = serde_yaml::from_str(raw)?;
        Ok(def)
    }
}
