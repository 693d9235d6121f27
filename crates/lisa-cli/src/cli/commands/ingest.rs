use super::exit_codes;
use crate::cli::args::IngestArgs;
use anyhow::Context;
use lisa_core::config::{load_config_or_default, LisaConfig};
use lisa_core::execution_log::ExecutionLog;
use lisa_core::model::Record;
use lisa_core::perf::JsonlPerfReader;
use lisa_core::run::TestRun;
use lisa_core::storage::Store;
use lisa_core::suite::SuiteDefinition;
use lisa_core::vm::SnapshotIntrospector;

pub fn run(args: IngestArgs) -> anyhow::Result<i32> {
    let cfg = match load_config_or_default(&args.config, false) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(event = "config_error", error = %e);
            eprintln!("config error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    match ingest(&args, &cfg) {
        Ok(inserted) => {
            tracing::info!(event = "ingest_done", records = inserted);
            Ok(exit_codes::OK)
        }
        Err(e) => {
            tracing::error!(event = "ingest_failed", error = %format!("{e:#}"));
            eprintln!("ingest failed: {e:#}");
            Ok(exit_codes::INGEST_FAILED)
        }
    }
}

fn ingest(args: &IngestArgs, cfg: &LisaConfig) -> anyhow::Result<usize> {
    let mut options = cfg.run_options();
    if args.skip_vm_check {
        options.skip_vm_check = Some(true);
    }

    let mut run = match &args.perf_dir {
        Some(dir) => TestRun::performance(options, dir, Box::new(JsonlPerfReader)),
        None => TestRun::functional(options),
    };

    let suite = SuiteDefinition::from_path(&args.suite)?;
    run.load_suite(&suite)
        .with_context(|| format!("loading suite {}", args.suite.display()))?;

    let log = ExecutionLog::from_path(&args.log)?;
    run.load_execution_log(&log)
        .with_context(|| format!("reconciling execution log {}", args.log.display()))?;

    if let Some(kvp_dir) = &args.kvp_dir {
        let introspector = SnapshotIntrospector::new(kvp_dir);
        run.ingest_guest_state(&introspector, &cfg.kvp_fields, true)?;
    }

    let records = run.to_insertion_records()?;
    tracing::info!(
        event = "records_built",
        suite = %run.suite,
        tests = run.test_cases.len(),
        vms = run.vms.len(),
        records = records.len()
    );

    if let Some(out) = &args.out {
        write_records(out, &records)?;
    }

    if args.dry_run {
        tracing::info!(event = "dry_run", "Skipping database insertion");
        return Ok(0);
    }

    let db_path = args.db.as_ref().unwrap_or(&cfg.db);
    let store = Store::open(db_path)?;
    if args.init_schema {
        store.init_schema(&cfg.tables)?;
    }
    let table = cfg.tables.table_for(run.perf_family());
    let inserted = store.insert_records(table, &records)?;
    tracing::info!(event = "records_inserted", table = table, count = inserted);
    Ok(inserted)
}

fn write_records(path: &std::path::Path, records: &[Record]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write records to {}", path.display()))?;
    Ok(())
}
