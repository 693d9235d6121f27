use super::TestRun;
use crate::errors::PipelineError;
use crate::execution_log::ExecutionLog;
use std::collections::BTreeSet;

/// Merges observed results into the declared suite.
///
/// Test cases without a logged result and VMs that no logged result refers
/// to are removed, so neither can produce rows downstream.
pub(crate) fn reconcile(run: &mut TestRun, log: &ExecutionLog) -> Result<(), PipelineError> {
    run.timestamp = log.timestamp.clone();
    tracing::debug!(event = "timestamp", timestamp = %run.timestamp);

    record_run_metadata(run, log);

    if let Some(undeclared) = log.vms.keys().find(|name| !run.vms.contains_key(*name)) {
        return Err(PipelineError::UndeclaredVm(undeclared.clone()));
    }
    for (vm_name, logged) in &log.vms {
        if let Some(vm) = run.vms.get_mut(vm_name) {
            tracing::debug!("Updating VM, {}, with details from execution log", vm_name);
            vm.host_os = logged.host_os.clone();
            vm.hv_server = logged.hv_server.clone();
            vm.location = logged.location.clone();
        }
    }

    let mut unused_vms: BTreeSet<String> = run.vms.keys().cloned().collect();
    let mut missing = Vec::new();

    for (test_name, test_case) in run.test_cases.iter_mut() {
        match log.tests.get(test_name) {
            Some((vm_name, result)) => {
                test_case.update_results((vm_name.as_str(), result.as_str()));
                unused_vms.remove(vm_name);
                tracing::debug!("Saving test result for {} - {}", test_name, result);
            }
            None => {
                tracing::warn!(
                    event = "result_missing",
                    test = %test_name,
                    "Result for {} was not found in execution log",
                    test_name
                );
                missing.push(test_name.clone());
            }
        }
    }

    for vm_name in &unused_vms {
        tracing::debug!(event = "vm_pruned", vm = %vm_name);
        run.vms.remove(vm_name);
    }
    run.prune_missing(&missing);
    Ok(())
}

fn record_run_metadata(run: &mut TestRun, log: &ExecutionLog) {
    let fields = [
        ("logPath", &log.log_path, &mut run.log_path),
        ("GuestDistro", &log.guest_distro, &mut run.guest_distro),
        ("KernelVersion", &log.kernel_version, &mut run.kernel_version),
    ];

    for (key, source, target) in fields {
        match source {
            Some(value) => {
                tracing::debug!("Saving {} - {}", key, value);
                *target = value.clone();
            }
            // Normal for guest families whose harness does not report it.
            None => tracing::warn!(
                event = "log_field_missing",
                field = key,
                "{} not found in execution log",
                key
            ),
        }
    }

    // Most harnesses never log the guest OS; the configured value stands in.
    match log.guest_os.clone().or_else(|| run.options.guest_os.clone()) {
        Some(os) => {
            tracing::debug!("Saving GuestOS - {}", os);
            run.guest_os = os;
        }
        None => tracing::debug!(event = "guest_os_unknown"),
    }
}
