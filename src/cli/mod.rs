//! Command-line interface for inspecting tagged logs
//!
//! Every subcommand works offline against files on disk: the policy file, a
//! storage directory, or a base directory holding session archives. Nothing
//! here starts a logging session.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

pub mod commands;

/// taglog - dual-tag structured logging toolkit
#[derive(Parser)]
#[command(
    name = "taglog",
    about = "Inspect, query and analyze dual-tag structured logs",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level for taglog's own diagnostics (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format for command results
    #[arg(long = "output-format", global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a sample logging policy file
    InitConfig(InitConfigArgs),

    /// Evaluate the logging gate for a level and tag pair
    Check(CheckArgs),

    /// Query stored log entries
    Query(QueryArgs),

    /// Show aggregate counters of a storage directory
    Stats(StatsArgs),

    /// Generate an analysis report
    Report(ReportArgs),

    /// Detect log volume anomalies
    Anomalies(AnomaliesArgs),

    /// List archived sessions under a base directory
    Archives(ArchivesArgs),

    /// Export stored log entries to JSON or CSV
    Export(ExportArgs),
}

#[derive(Args)]
pub struct InitConfigArgs {
    /// Where to write the policy file
    #[arg(long, default_value = "logging.json")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Policy file
    #[arg(long, default_value = "logging.json")]
    pub config: PathBuf,

    /// Log level (DEBUG, INFO, WARN, ERROR, FATAL)
    pub level: String,

    /// Feature tag
    pub feature: String,

    /// Module tag
    pub module: String,
}

/// Storage location plus the filters shared by reading commands
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Storage directory
    #[arg(long, default_value = "./logs")]
    pub dir: PathBuf,

    /// Also read every archived session below the directory
    #[arg(long)]
    pub archived: bool,
}

#[derive(Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Exact level match
    #[arg(long)]
    pub level: Option<String>,

    #[arg(long)]
    pub feature: Option<String>,

    #[arg(long)]
    pub module: Option<String>,

    /// Context user id
    #[arg(long)]
    pub user: Option<String>,

    /// Only entries from the last N hours
    #[arg(long)]
    pub since_hours: Option<i64>,

    #[arg(long, default_value = "50")]
    pub limit: usize,

    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Multi-line output with parameters and context
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Storage directory
    #[arg(long, default_value = "./logs")]
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only entries from the last N hours
    #[arg(long)]
    pub since_hours: Option<i64>,

    /// Skip the per-feature section
    #[arg(long)]
    pub no_features: bool,

    /// Skip the per-module section
    #[arg(long)]
    pub no_modules: bool,

    /// Skip anomaly detection
    #[arg(long)]
    pub no_anomalies: bool,
}

#[derive(Args)]
pub struct AnomaliesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Window size in hours
    #[arg(long, default_value = "1")]
    pub window_hours: u32,

    /// Standard deviations above the mean
    #[arg(long, default_value = "3.0")]
    pub threshold: f64,
}

#[derive(Args)]
pub struct ArchivesArgs {
    /// Base log directory
    #[arg(long, default_value = "./logs")]
    pub base: PathBuf,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Export format (json, csv)
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Output file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Shared output helpers for every command
pub struct CliRunner {
    quiet: bool,
    format: OutputFormat,
}

impl CliRunner {
    pub fn new(cli: &Cli) -> Self {
        if cli.no_color {
            colored::control::set_override(false);
        }
        Self {
            quiet: cli.quiet,
            format: cli.format,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn print_output(&self, content: &str) {
        println!("{}", content);
    }

    /// Print `value` as pretty JSON
    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn print_header(&self, title: &str) {
        if !self.quiet {
            println!("{}", title.bold());
            println!("{}", "=".repeat(title.len()));
        }
    }

    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "✓".green(), message);
        }
    }

    pub fn print_warning(&self, message: &str) {
        eprintln!("{} {}", "!".yellow(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("{}", message.dimmed());
        }
    }

    /// Execute the parsed command
    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::InitConfig(args) => commands::init_config::run(self, args),
            Commands::Check(args) => commands::check::run(self, args).await,
            Commands::Query(args) => commands::query::run(self, args).await,
            Commands::Stats(args) => commands::stats::run(self, args).await,
            Commands::Report(args) => commands::report::run(self, args).await,
            Commands::Anomalies(args) => commands::anomalies::run(self, args).await,
            Commands::Archives(args) => commands::archives::run(self, args),
            Commands::Export(args) => commands::export::run(self, args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_arguments() {
        let cli = Cli::parse_from([
            "taglog", "query", "--dir", "/tmp/logs", "--level", "error", "--feature", "AUTH",
            "--limit", "5", "--archived",
        ]);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.source.dir, PathBuf::from("/tmp/logs"));
                assert!(args.source.archived);
                assert_eq!(args.level.as_deref(), Some("error"));
                assert_eq!(args.feature.as_deref(), Some("AUTH"));
                assert_eq!(args.limit, 5);
                assert_eq!(args.offset, 0);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["taglog", "check", "INFO", "AUTH", "SERVICES", "--output-format", "json", "-q"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn test_report_section_flags() {
        let cli = Cli::parse_from(["taglog", "report", "--no-anomalies"]);
        match cli.command {
            Commands::Report(args) => {
                assert!(args.no_anomalies);
                assert!(!args.no_features);
                assert_eq!(args.source.dir, PathBuf::from("./logs"));
            }
            _ => panic!("expected report command"),
        }
    }
}
