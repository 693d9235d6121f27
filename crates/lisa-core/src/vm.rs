use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualMachine {
    pub vm_name: String,
    pub hv_server: String,
    pub os: String,
    pub host_os: String,
    pub location: String,
    /// Whether the guest state is validated after the run.
    pub check: bool,
    /// Guest-reported key/value data, filled by introspection.
    pub kvp_info: BTreeMap<String, String>,
}

impl VirtualMachine {
    pub fn new(vm_name: &str, hv_server: &str, os: &str, check: bool) -> Self {
        Self {
            vm_name: vm_name.to_string(),
            hv_server: hv_server.to_string(),
            os: os.to_string(),
            check,
            ..Default::default()
        }
    }
}

/// Source of guest state for the VMs of a run.
///
/// Implementations update `kvp_info` (restricted to `kvp_fields`) and may
/// refresh `host_os`, `hv_server` and `location`. `stop_after` asks the
/// implementation to power the guest down once it has been inspected.
pub trait GuestIntrospector {
    fn refresh(
        &self,
        vm: &mut VirtualMachine,
        kvp_fields: &[String],
        stop_after: bool,
    ) -> anyhow::Result<()>;
}

/// Reads guest state from `<dir>/<vm_name>.json` snapshots captured by the
/// harness.
#[derive(Debug, Clone)]
pub struct SnapshotIntrospector {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct GuestSnapshot {
    #[serde(default)]
    kvp: BTreeMap<String, String>,
    #[serde(rename = "hostOS", default)]
    host_os: Option<String>,
    #[serde(rename = "hvServer", default)]
    hv_server: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

impl SnapshotIntrospector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn snapshot_path(&self, vm_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", vm_name))
    }
}

impl GuestIntrospector for SnapshotIntrospector {
    fn refresh(
        &self,
        vm: &mut VirtualMachine,
        kvp_fields: &[String],
        stop_after: bool,
    ) -> anyhow::Result<()> {
        let path = self.snapshot_path(&vm.vm_name);
        if !path.exists() {
            tracing::warn!(
                event = "guest_snapshot_missing",
                vm = %vm.vm_name,
                path = %path.display(),
                "No guest snapshot found for {}",
                vm.vm_name
            );
            return Ok(());
        }

        let snapshot = read_snapshot(&path)?;
        vm.kvp_info = snapshot
            .kvp
            .into_iter()
            .filter(|(key, _)| kvp_fields.iter().any(|f| f == key))
            .collect();
        if let Some(host_os) = snapshot.host_os {
            vm.host_os = host_os;
        }
        if let Some(hv_server) = snapshot.hv_server {
            vm.hv_server = hv_server;
        }
        if let Some(location) = snapshot.location {
            vm.location = location;
        }

        // Snapshots are taken from guests the harness already shut down.
        tracing::debug!(
            event = "guest_refreshed",
            vm = %vm.vm_name,
            fields = vm.kvp_info.len(),
            stop_requested = stop_after
        );
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<GuestSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read guest snapshot: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse guest snapshot: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_filters_kvp_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vm1.json"),
            r#"{"kvp": {"OSName": "FreeBSD", "OSMajorVersion": "12",
                        "IntegrationServicesVersion": "4.0"},
                "hostOS": "Windows Server 2019", "location": "Lab-3"}"#,
        )
        .unwrap();

        let mut vm = VirtualMachine::new("vm1", "HV01", "FreeBSD", true);
        let fields = vec!["OSName".to_string(), "OSMajorVersion".to_string()];
        SnapshotIntrospector::new(dir.path())
            .refresh(&mut vm, &fields, true)
            .unwrap();

        assert_eq!(vm.kvp_info.len(), 2);
        assert_eq!(vm.kvp_info["OSName"], "FreeBSD");
        assert_eq!(vm.host_os, "Windows Server 2019");
        assert_eq!(vm.hv_server, "HV01");
        assert_eq!(vm.location, "Lab-3");
    }

    #[test]
    fn test_missing_snapshot_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = VirtualMachine::new("ghost", "HV01", "Linux", false);
        SnapshotIntrospector::new(dir.path())
            .refresh(&mut vm, &[], false)
            .unwrap();
        assert!(vm.kvp_info.is_empty());
    }

    #[test]
    fn test_malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vm1.json"), "not json").unwrap();
        let mut vm = VirtualMachine::new("vm1", "HV01", "Linux", false);
        let err = SnapshotIntrospector::new(dir.path())
            .refresh(&mut vm, &[], false)
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse guest snapshot"));
    }
}
