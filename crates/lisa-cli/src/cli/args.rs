use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lisa-parser",
    version,
    about = "Parses LISA test runs and stores their results"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Log filter (tracing EnvFilter syntax); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile a suite definition with its execution log and store the results
    Ingest(IngestArgs),
    /// Write a sample lisa.yaml
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct IngestArgs {
    /// Suite definition (YAML/JSON)
    #[arg(long)]
    pub suite: PathBuf,

    /// Execution log produced by the harness (YAML/JSON)
    #[arg(long)]
    pub log: PathBuf,

    /// Directory holding `<tool>.jsonl` samples; switches to a performance run
    #[arg(long)]
    pub perf_dir: Option<PathBuf>,

    /// Directory holding `<vm>.json` guest snapshots
    #[arg(long)]
    pub kvp_dir: Option<PathBuf>,

    #[arg(long, default_value = "lisa.yaml")]
    pub config: PathBuf,

    /// Database path; overrides `db` from the config
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Do not validate declared VMs against guest snapshots
    #[arg(long)]
    pub skip_vm_check: bool,

    /// Create the result tables before inserting
    #[arg(long)]
    pub init_schema: bool,

    /// Build the records without touching the database
    #[arg(long)]
    pub dry_run: bool,

    /// Write the insertion records as JSON to this path
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "lisa.yaml")]
    pub config: PathBuf,
}
