//! Performance-suite specialization: per-tool sample fan-out and record
//! shaping.

use crate::errors::PipelineError;
use crate::model::{ColumnValue, Record, TestCase};
use crate::run::{columns, FlatRow, TestRun};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

mod reader;
pub mod shape;

pub use reader::{JsonlPerfReader, PerfLogReader};

/// Generic columns that carry no meaning for performance rows.
const DROPPED_COLUMNS: &[&str] = &[columns::TEST_RESULT, columns::TEST_AREA, columns::HOST_NAME];

/// Generic column -> performance table column.
const RENAMED_COLUMNS: &[(&str, &str)] = &[(columns::HOST_VERSION, "HostOS")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteFamily {
    DiskIo,
    Tcp,
    Udp,
    Latency,
}

/// Tool whose log output backs a performance suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfTool {
    FioSingleDisk,
    FioRaid,
    Ntttcp,
    Iperf,
    Latency,
}

impl PerfTool {
    /// Stem of the samples file this tool's results are stored under.
    pub fn file_stem(&self) -> &'static str {
        match self {
            PerfTool::FioSingleDisk => "fio",
            PerfTool::FioRaid => "fio-raid",
            PerfTool::Ntttcp => "ntttcp",
            PerfTool::Iperf => "iperf",
            PerfTool::Latency => "latency",
        }
    }
}

pub type Shaper = fn(&mut Record, &TestCase) -> Result<(), PipelineError>;

pub struct SuiteProfile {
    /// Lower-case suite names served by this profile.
    pub names: &'static [&'static str],
    pub tool: PerfTool,
    pub family: SuiteFamily,
    pub shaper: Shaper,
    pub sort_keys: &'static [&'static str],
    pub drops_result_columns: bool,
    pub tags_data_path: bool,
}

impl fmt::Debug for SuiteProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteProfile")
            .field("names", &self.names)
            .field("tool", &self.tool)
            .field("family", &self.family)
            .field("sort_keys", &self.sort_keys)
            .finish_non_exhaustive()
    }
}

static PROFILES: &[SuiteProfile] = &[
    SuiteProfile {
        names: &["fio-singledisk"],
        tool: PerfTool::FioSingleDisk,
        family: SuiteFamily::DiskIo,
        shaper: shape::shape_fio,
        sort_keys: &["QDepth", "BlockSize_KB"],
        drops_result_columns: true,
        tags_data_path: false,
    },
    SuiteProfile {
        names: &["fio-raid0-4disks"],
        tool: PerfTool::FioRaid,
        family: SuiteFamily::DiskIo,
        shaper: shape::shape_fio,
        sort_keys: &["QDepth", "BlockSize_KB"],
        drops_result_columns: true,
        tags_data_path: false,
    },
    SuiteProfile {
        names: &["ntttcp", "tcp"],
        tool: PerfTool::Ntttcp,
        family: SuiteFamily::Tcp,
        shaper: shape::shape_tcp,
        sort_keys: &["ProtocolType", "NumberOfConnections"],
        drops_result_columns: true,
        tags_data_path: true,
    },
    SuiteProfile {
        names: &["iperf", "udp"],
        tool: PerfTool::Iperf,
        family: SuiteFamily::Udp,
        shaper: shape::shape_udp,
        sort_keys: &["NumberOfConnections", "SendBufSize_KBytes"],
        drops_result_columns: true,
        tags_data_path: true,
    },
    SuiteProfile {
        names: &["latency"],
        tool: PerfTool::Latency,
        family: SuiteFamily::Latency,
        shaper: shape::shape_latency,
        sort_keys: &[],
        drops_result_columns: true,
        tags_data_path: true,
    },
];

impl SuiteProfile {
    /// Looks up the profile for a suite name, ignoring case.
    pub fn for_suite(suite: &str) -> Result<&'static SuiteProfile, PipelineError> {
        let normalized = suite.trim().to_lowercase();
        PROFILES
            .iter()
            .find(|p| p.names.iter().any(|name| *name == normalized))
            .ok_or_else(|| PipelineError::UnknownPerfSuite(suite.to_string()))
    }
}

#[derive(Debug)]
pub struct PerfRun {
    perf_dir: PathBuf,
    reader: Box<dyn PerfLogReader>,
    profile: Option<&'static SuiteProfile>,
}

impl PerfRun {
    pub(crate) fn new(perf_dir: PathBuf, reader: Box<dyn PerfLogReader>) -> Self {
        Self {
            perf_dir,
            reader,
            profile: None,
        }
    }

    pub fn profile(&self) -> Option<&'static SuiteProfile> {
        self.profile
    }

    pub(crate) fn set_profile(&mut self, profile: &'static SuiteProfile) {
        self.profile = Some(profile);
    }

    /// Reads the tool samples and clones the run's test case once per
    /// sample, keyed `name + index` (1-based). Each clone remembers its
    /// index so rows can be emitted in reader order.
    pub(crate) fn fan_out(
        &self,
        test_cases: &BTreeMap<String, TestCase>,
    ) -> anyhow::Result<BTreeMap<String, TestCase>> {
        let profile = self.profile.ok_or(PipelineError::SuiteNotLoaded)?;
        let samples = self.reader.read_samples(profile.tool, &self.perf_dir)?;
        tracing::debug!(
            event = "perf_samples",
            tool = profile.tool.file_stem(),
            count = samples.len()
        );

        // Suite loading guarantees at most one declared test case.
        let Some(template) = test_cases.values().next() else {
            tracing::warn!(
                event = "perf_without_test_case",
                samples = samples.len(),
                "No test case left to attach {} performance samples to",
                samples.len()
            );
            return Ok(BTreeMap::new());
        };

        let fanned = samples
            .into_iter()
            .enumerate()
            .map(|(index, sample)| {
                let mut case = template.clone();
                case.name = format!("{}{}", template.name, index + 1);
                case.perf = sample;
                case.sample = Some(index + 1);
                (case.name.clone(), case)
            })
            .collect();
        Ok(fanned)
    }

    /// Turns generic rows into performance-table rows for the suite family.
    pub(crate) fn shape_records(
        &self,
        run: &TestRun,
        rows: Vec<FlatRow<'_>>,
    ) -> Result<Vec<Record>, PipelineError> {
        let profile = self.profile.ok_or(PipelineError::SuiteNotLoaded)?;
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let mut record = row.record;
            if profile.drops_result_columns {
                for column in DROPPED_COLUMNS {
                    record.remove(*column);
                }
            }
            for (from, to) in RENAMED_COLUMNS {
                if let Some(value) = record.remove(*from) {
                    record.insert(to.to_string(), value);
                }
            }
            record.insert("HostBy".into(), ColumnValue::from(run.options.host_by.as_str()));
            record.insert("HostType".into(), ColumnValue::from(row.vm.location.as_str()));
            // TODO: derive the guest size from the VM's hardware profile once the harness logs it.
            record.insert("GuestSize".into(), ColumnValue::from(run.options.guest_size.as_str()));

            (profile.shaper)(&mut record, row.test)?;

            if profile.tags_data_path {
                record.insert("DataPath".into(), shape::data_path(&row.test.name).into());
            }
            record.insert(
                columns::TEST_CASE_NAME.into(),
                shape::strip_sample_suffix(&row.test.name).into(),
            );
            records.push(record);
        }

        shape::sort_records(&mut records, profile.sort_keys);
        Ok(records)
    }
}
