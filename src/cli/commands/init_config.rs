//! Write a sample logging policy

use crate::cli::{CliRunner, InitConfigArgs, OutputFormat};
use anyhow::{bail, Result};
use taglog::logging::config::write_sample_config;

pub fn run(runner: &CliRunner, args: InitConfigArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        );
    }

    write_sample_config(&args.path)?;

    match runner.format() {
        OutputFormat::Json => runner.print_json(&serde_json::json!({
            "path": args.path,
            "written": true,
        })),
        OutputFormat::Text => {
            runner.print_success(&format!(
                "Sample logging configuration written to {}",
                args.path.display()
            ));
            runner.print_info("Edit features and modules to choose what gets logged.");
            Ok(())
        }
    }
}
