//! taglog - dual-tag structured logging toolkit
//!
//! Offline inspection of policy files and stored logs: gate checks, queries,
//! statistics, analysis reports, archive listings and exports.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::cli::{Cli, CliRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize diagnostics
    let log_level = match cli.log_level.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    debug!("taglog v{}", env!("CARGO_PKG_VERSION"));

    let runner = CliRunner::new(&cli);
    if let Err(e) = runner.run(cli.command).await {
        runner.print_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}
