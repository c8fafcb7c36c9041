//! Export stored entries to a file

use super::utils::load_entries;
use crate::cli::{CliRunner, ExportArgs, OutputFormat};
use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use taglog::logging::export::export_entries;
use taglog::logging::{ExportFormat, LogQuery};

/// `logs_export_<YYYYmmdd_HHMMSS>.<ext>` in the working directory
pub fn default_output(format: ExportFormat) -> PathBuf {
    PathBuf::from(format!(
        "logs_export_{}.{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

pub async fn run(runner: &CliRunner, args: ExportArgs) -> Result<()> {
    let format: ExportFormat = args.format.parse()?;
    let entries = load_entries(&args.source, &LogQuery::new()).await?;
    let output = args.output.unwrap_or_else(|| default_output(format));

    export_entries(&entries, format, &output)?;

    match runner.format() {
        OutputFormat::Json => runner.print_json(&serde_json::json!({
            "path": output,
            "entries": entries.len(),
            "format": format.to_string(),
        })),
        OutputFormat::Text => {
            runner.print_success(&format!(
                "Exported {} entries to {}",
                entries.len(),
                output.display()
            ));
            Ok(())
        }
    }
}
