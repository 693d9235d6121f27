use crate::errors::PipelineError;
use crate::execution_log::ExecutionLog;
use crate::model::{Record, TestCase};
use crate::perf::{PerfLogReader, PerfRun, SuiteFamily, SuiteProfile};
use crate::suite::SuiteDefinition;
use crate::vm::{GuestIntrospector, VirtualMachine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

mod flatten;
mod reconcile;

pub(crate) use flatten::FlatRow;

/// Column names of the generic insertion record.
pub mod columns {
    pub const TEST_RESULT: &str = "TestResult";
    pub const HOST_NAME: &str = "HostName";
    pub const HOST_VERSION: &str = "HostVersion";
    pub const TEST_CASE_NAME: &str = "TestCaseName";
    pub const TEST_AREA: &str = "TestArea";
    pub const TEST_DATE: &str = "TestDate";
    pub const GUEST_OS: &str = "GuestOS";
    pub const KERNEL_VERSION: &str = "KernelVersion";
    pub const GUEST_DISTRO: &str = "GuestDistro";
}

pub const DEFAULT_GUEST_SIZE: &str = "8VP8G40G";

/// Where the guest OS/kernel columns of a record come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestFieldSource {
    /// Run-level values harvested from the execution log.
    #[default]
    RunLog,
    /// Per-VM guest introspection data (`OSName`, `OSMajorVersion`,
    /// `OSBuildNumber`).
    PerVm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// `None` keeps the default of the run kind: functional runs validate
    /// VMs, performance runs do not.
    pub skip_vm_check: Option<bool>,
    /// Identity of the machine that parsed the run (`HostBy` column).
    pub host_by: String,
    pub guest_size: String,
    pub guest_fields: GuestFieldSource,
    /// Run-level guest OS used when the execution log does not report one.
    pub guest_os: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip_vm_check: None,
            host_by: String::new(),
            guest_size: DEFAULT_GUEST_SIZE.to_string(),
            guest_fields: GuestFieldSource::default(),
            guest_os: None,
        }
    }
}

#[derive(Debug)]
pub enum RunKind {
    Functional,
    Performance(PerfRun),
}

/// State of one harness invocation, built from the suite definition, the
/// execution log and guest state, then flattened into insertion records.
#[derive(Debug)]
pub struct TestRun {
    pub suite: String,
    pub timestamp: String,
    pub log_path: String,
    pub guest_os: String,
    pub guest_distro: String,
    pub kernel_version: String,
    pub vms: BTreeMap<String, VirtualMachine>,
    pub test_cases: BTreeMap<String, TestCase>,
    pub validate_vm: bool,
    pub(crate) options: RunOptions,
    kind: RunKind,
}

impl TestRun {
    pub fn functional(options: RunOptions) -> Self {
        let validate_vm = !options.skip_vm_check.unwrap_or(false);
        Self::with_kind(options, RunKind::Functional, validate_vm)
    }

    pub fn performance(
        options: RunOptions,
        perf_dir: impl Into<PathBuf>,
        reader: Box<dyn PerfLogReader>,
    ) -> Self {
        let validate_vm = !options.skip_vm_check.unwrap_or(true);
        let kind = RunKind::Performance(PerfRun::new(perf_dir.into(), reader));
        Self::with_kind(options, kind, validate_vm)
    }

    fn with_kind(options: RunOptions, kind: RunKind, validate_vm: bool) -> Self {
        Self {
            suite: String::new(),
            timestamp: String::new(),
            log_path: String::new(),
            guest_os: String::new(),
            guest_distro: String::new(),
            kernel_version: String::new(),
            vms: BTreeMap::new(),
            test_cases: BTreeMap::new(),
            validate_vm,
            options,
            kind,
        }
    }

    /// Test cases in emission order: fanned-out samples by sample index,
    /// everything else by name.
    pub fn ordered_test_cases(&self) -> Vec<&TestCase> {
        let mut cases: Vec<&TestCase> = self.test_cases.values().collect();
        cases.sort_by_key(|case| case.sample);
        cases
    }

    /// Performance family of the loaded suite, `None` for functional runs.
    pub fn perf_family(&self) -> Option<SuiteFamily> {
        match &self.kind {
            RunKind::Functional => None,
            RunKind::Performance(perf) => perf.profile().map(|p| p.family),
        }
    }

    pub fn load_suite(&mut self, definition: &SuiteDefinition) -> Result<(), PipelineError> {
        if let RunKind::Performance(perf) = &mut self.kind {
            let profile = SuiteProfile::for_suite(&definition.suite_name)?;
            if definition.tests.len() > 1 {
                return Err(PipelineError::AmbiguousPerfSuite {
                    suite: definition.suite_name.clone(),
                    count: definition.tests.len(),
                });
            }
            perf.set_profile(profile);
        }

        self.suite = definition.suite_name.clone();
        tracing::debug!(event = "suite_loaded", suite = %self.suite);

        for (name, props) in &definition.tests {
            tracing::debug!("Initializing TestCase object for {}", name);
            self.test_cases
                .insert(name.clone(), TestCase::new(name.as_str(), props));
        }

        for (name, decl) in &definition.vms {
            tracing::debug!("Initializing VirtualMachine object for {}", name);
            self.vms.insert(
                name.clone(),
                VirtualMachine::new(name, &decl.hv_server, &decl.os, self.validate_vm),
            );
        }
        Ok(())
    }

    /// Reconciles the declared suite against the execution log, then for
    /// performance runs fans the test case out over the measured samples.
    pub fn load_execution_log(&mut self, log: &ExecutionLog) -> anyhow::Result<()> {
        reconcile::reconcile(self, log)?;

        if let RunKind::Performance(perf) = &self.kind {
            let fanned = perf.fan_out(&self.test_cases)?;
            self.test_cases = fanned;
        }
        Ok(())
    }

    /// Removes the named test cases; unknown names are ignored.
    pub fn prune_missing<I, S>(&mut self, test_names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in test_names {
            if self.test_cases.remove(name.as_ref()).is_some() {
                tracing::debug!(event = "test_case_pruned", test = %name.as_ref());
            }
        }
    }

    pub fn ingest_guest_state(
        &mut self,
        introspector: &dyn GuestIntrospector,
        kvp_fields: &[String],
        stop_after: bool,
    ) -> anyhow::Result<()> {
        let stop_after = stop_after && self.validate_vm;
        for vm in self.vms.values_mut() {
            introspector.refresh(vm, kvp_fields, stop_after)?;
        }
        Ok(())
    }

    pub fn to_insertion_records(&self) -> Result<Vec<Record>, PipelineError> {
        let rows = flatten::flatten(self)?;
        match &self.kind {
            RunKind::Functional => Ok(rows.into_iter().map(|row| row.record).collect()),
            RunKind::Performance(perf) => perf.shape_records(self, rows),
        }
    }

    /// Turns a `M/D/Y ...` log timestamp into the `YMD` form of the
    /// database. Components are copied verbatim, without padding.
    pub fn format_date(raw: &str) -> Result<String, PipelineError> {
        let date = raw
            .split_whitespace()
            .next()
            .ok_or_else(|| PipelineError::MalformedTimestamp(raw.to_string()))?;
        let parts: Vec<&str> = date.split('/').collect();
        if parts.len() < 3 {
            return Err(PipelineError::MalformedTimestamp(raw.to_string()));
        }
        Ok(format!("{}{}{}", parts[2], parts[0], parts[1]))
    }
}
