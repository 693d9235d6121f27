use super::columns::*;
use super::{GuestFieldSource, TestRun};
use crate::errors::PipelineError;
use crate::model::{ColumnValue, Record, TestCase};
use crate::vm::VirtualMachine;

/// A generic record together with the entities it was built from.
pub(crate) struct FlatRow<'a> {
    pub test: &'a TestCase,
    pub vm: &'a VirtualMachine,
    pub record: Record,
}

struct GuestFields {
    os: String,
    kernel: String,
}

pub(crate) fn flatten(run: &TestRun) -> Result<Vec<FlatRow<'_>>, PipelineError> {
    let mut rows = Vec::new();

    for test in run.ordered_test_cases() {
        let test_name = &test.name;
        for (vm_name, vm) in &run.vms {
            let Some(result) = test.results.get(vm_name) else {
                tracing::error!(
                    event = "result_not_found",
                    test = %test_name,
                    vm = %vm_name,
                    "Unable to find test result for {} on vm {}",
                    test_name,
                    vm_name
                );
                tracing::info!("Skipping {} for database insertion", test_name);
                continue;
            };

            let guest = guest_fields(run, vm);
            let mut record = Record::new();
            record.insert(TEST_RESULT.into(), ColumnValue::from(result.as_str()));
            record.insert(HOST_NAME.into(), ColumnValue::from(vm.hv_server.as_str()));
            record.insert(HOST_VERSION.into(), ColumnValue::from(vm.host_os.as_str()));
            record.insert(TEST_CASE_NAME.into(), ColumnValue::from(test_name.as_str()));
            record.insert(TEST_AREA.into(), ColumnValue::from(run.suite.as_str()));
            record.insert(TEST_DATE.into(), TestRun::format_date(&run.timestamp)?.into());
            record.insert(GUEST_OS.into(), guest.os.into());
            record.insert(KERNEL_VERSION.into(), guest.kernel.into());
            record.insert(GUEST_DISTRO.into(), ColumnValue::from(run.guest_distro.as_str()));

            tracing::debug!("Parsed line {:?} for insertion", record);
            rows.push(FlatRow { test, vm, record });
        }
    }

    Ok(rows)
}

fn guest_fields(run: &TestRun, vm: &VirtualMachine) -> GuestFields {
    match run.options.guest_fields {
        GuestFieldSource::RunLog => GuestFields {
            os: run.guest_os.clone(),
            kernel: run.kernel_version.clone(),
        },
        GuestFieldSource::PerVm => guest_fields_from_kvp(vm),
    }
}

fn guest_fields_from_kvp(vm: &VirtualMachine) -> GuestFields {
    if vm.kvp_info.is_empty() {
        tracing::warn!(
            event = "kvp_missing",
            vm = %vm.vm_name,
            "No values found for VM Distro and VM Kernel Version"
        );
        return GuestFields {
            os: String::new(),
            kernel: String::new(),
        };
    }

    let name = vm.kvp_info.get("OSName").cloned().unwrap_or_default();
    // Some distros report an empty OSMajorVersion.
    let os = match vm.kvp_info.get("OSMajorVersion") {
        Some(major) if !major.is_empty() => format!("{} {}", name, major),
        _ => name,
    };
    GuestFields {
        os,
        kernel: vm.kvp_info.get("OSBuildNumber").cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunOptions;

    fn run_with(source: GuestFieldSource, kvp: &[(&str, &str)]) -> TestRun {
        let mut run = TestRun::functional(RunOptions {
            guest_fields: source,
            ..Default::default()
        });
        run.suite = "Network".into();
        run.timestamp = "3/7/2021 10:00:00".into();
        run.guest_os = "FreeBSD".into();
        run.guest_distro = "FreeBSD 12.2".into();
        run.kernel_version = "12.2-RELEASE".into();

        let mut vm = VirtualMachine::new("vm1", "HV01", "FreeBSD", true);
        vm.host_os = "Windows Server 2019".into();
        vm.kvp_info = kvp
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        run.vms.insert("vm1".into(), vm);

        let mut tc = TestCase::new("NET-Basic", &Default::default());
        tc.update_results(("vm1", "Success"));
        run.test_cases.insert("NET-Basic".into(), tc);
        run
    }

    #[test]
    fn test_generic_record_columns() {
        let run = run_with(
            GuestFieldSource::RunLog,
            &[("OSName", "Ubuntu"), ("OSMajorVersion", "18")],
        );
        let rows = flatten(&run).unwrap();
        assert_eq!(rows.len(), 1);

        let rec = &rows[0].record;
        assert_eq!(rec.len(), 9);
        assert_eq!(rec[TEST_RESULT], ColumnValue::from("Success"));
        assert_eq!(rec[HOST_NAME], ColumnValue::from("HV01"));
        assert_eq!(rec[HOST_VERSION], ColumnValue::from("Windows Server 2019"));
        assert_eq!(rec[TEST_AREA], ColumnValue::from("Network"));
        assert_eq!(rec[TEST_DATE], ColumnValue::from("202137"));
        // Run-level values win over the VM's own guest data.
        assert_eq!(rec[GUEST_OS], ColumnValue::from("FreeBSD"));
        assert_eq!(rec[KERNEL_VERSION], ColumnValue::from("12.2-RELEASE"));
        assert_eq!(rec[GUEST_DISTRO], ColumnValue::from("FreeBSD 12.2"));
    }

    #[test]
    fn test_per_vm_guest_fields() {
        let run = run_with(
            GuestFieldSource::PerVm,
            &[("OSName", "Ubuntu"), ("OSMajorVersion", "18"), ("OSBuildNumber", "4.15.0")],
        );
        let rec = &flatten(&run).unwrap()[0].record;
        assert_eq!(rec[GUEST_OS], ColumnValue::from("Ubuntu 18"));
        assert_eq!(rec[KERNEL_VERSION], ColumnValue::from("4.15.0"));

        let empty_major = run_with(
            GuestFieldSource::PerVm,
            &[("OSName", "CentOS"), ("OSMajorVersion", ""), ("OSBuildNumber", "3.10")],
        );
        assert_eq!(flatten(&empty_major).unwrap()[0].record[GUEST_OS], ColumnValue::from("CentOS"));

        let no_kvp = run_with(GuestFieldSource::PerVm, &[]);
        let rec = &flatten(&no_kvp).unwrap()[0].record;
        assert_eq!(rec[GUEST_OS], ColumnValue::from(""));
        assert_eq!(rec[KERNEL_VERSION], ColumnValue::from(""));
    }

    #[test]
    fn test_pair_without_result_is_skipped() {
        let mut run = run_with(GuestFieldSource::RunLog, &[]);
        run.vms
            .insert("vm2".into(), VirtualMachine::new("vm2", "HV02", "FreeBSD", true));
        let rows = flatten(&run).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vm.vm_name, "vm1");
    }

    #[test]
    fn test_malformed_timestamp_is_fatal() {
        let mut run = run_with(GuestFieldSource::RunLog, &[]);
        run.timestamp = "yesterday".into();
        assert!(matches!(
            flatten(&run),
            Err(PipelineError::MalformedTimestamp(_))
        ));
    }
}
