//! Aggregate counters of a storage directory

use super::utils::{format_file_size, require_directory};
use crate::cli::{CliRunner, OutputFormat, StatsArgs};
use anyhow::Result;
use std::collections::BTreeMap;
use taglog::logging::stats::BackendInfo;
use taglog::logging::{FileLogStorage, FileStorageOptions, LogStorage};

pub async fn run(runner: &CliRunner, args: StatsArgs) -> Result<()> {
    require_directory(&args.dir)?;
    let storage = FileLogStorage::with_options(&args.dir, FileStorageOptions::default())?;
    let stats = storage.get_statistics().await?;

    if runner.format() == OutputFormat::Json {
        return runner.print_json(&stats);
    }

    runner.print_header(&format!("Log statistics for {}", args.dir.display()));
    runner.print_output(&format!("Total logs: {}", stats.counters.total_logs));
    print_counts(runner, "By level", &stats.counters.by_level);
    print_counts(runner, "By feature", &stats.counters.by_feature);
    print_counts(runner, "By module", &stats.counters.by_module);

    if let BackendInfo::File(file) = &stats.backend {
        runner.print_output(&format!(
            "Current file: {} of {} ({} backups max{})",
            format_file_size(file.current_file_size),
            format_file_size(file.max_file_size),
            file.max_files,
            if file.compress_rotated { ", gzip" } else { "" }
        ));
    }

    let files = storage.log_files();
    runner.print_info(&format!("{} log files on disk", files.len()));
    Ok(())
}

fn print_counts(runner: &CliRunner, title: &str, counts: &BTreeMap<String, u64>) {
    if counts.is_empty() {
        return;
    }
    runner.print_output(&format!("{}:", title));
    let mut ranked: Vec<_> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (name, count) in ranked {
        runner.print_output(&format!("  {:<20} {}", name, count));
    }
}
