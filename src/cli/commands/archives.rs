//! List archived sessions

use super::utils::require_directory;
use crate::cli::{ArchivesArgs, CliRunner, OutputFormat};
use anyhow::Result;
use taglog::logging::storage::list_archive_directories;

pub fn run(runner: &CliRunner, args: ArchivesArgs) -> Result<()> {
    require_directory(&args.base)?;
    let archives = list_archive_directories(&args.base, None);

    if runner.format() == OutputFormat::Json {
        return runner.print_json(&archives);
    }

    if archives.is_empty() {
        runner.print_info(&format!("No archives under {}", args.base.display()));
        return Ok(());
    }

    runner.print_header(&format!("Archives under {}", args.base.display()));
    for archive in &archives {
        runner.print_output(&format!(
            "{:<32} {:>3} files  created {}  modified {}",
            archive.name,
            archive.file_count,
            archive.created.format("%Y-%m-%d %H:%M:%S"),
            archive.modified.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    Ok(())
}
