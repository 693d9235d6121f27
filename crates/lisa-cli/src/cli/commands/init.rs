use super::exit_codes;
use crate::cli::args::InitArgs;
use lisa_core::config::write_sample_config;

pub fn run(args: InitArgs) -> anyhow::Result<i32> {
    if args.config.exists() {
        eprintln!("config already exists: {}", args.config.display());
        return Ok(exit_codes::CONFIG_ERROR);
    }
    write_sample_config(&args.config)?;
    eprintln!("Created {}", args.config.display());
    Ok(exit_codes::OK)
}
