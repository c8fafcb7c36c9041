//! Flatten log entries to JSON or CSV files.

use crate::logging::{LogEntry, LoggingError};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Fixed CSV column order
pub const CSV_COLUMNS: [&str; 11] = [
    "timestamp",
    "level",
    "feature_tag",
    "module_tag",
    "function_name",
    "message",
    "parameters",
    "user_id",
    "session_id",
    "request_id",
    "exception",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// File extension for default export names
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(LoggingError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Pretty JSON array with one object per entry
pub fn to_json(entries: &[LogEntry]) -> Result<String, LoggingError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// CSV document with a header row
pub fn to_csv(entries: &[LogEntry]) -> Result<String, LoggingError> {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');

    for entry in entries {
        let parameters = match &entry.parameters {
            Some(p) if !p.is_empty() => serde_json::to_string(p)?,
            _ => String::new(),
        };
        let context = entry.context.as_ref();
        let exception = entry
            .exception
            .as_ref()
            .map(|e| format!("{}: {}", e.exception_type, e.message))
            .unwrap_or_default();

        let row = [
            entry.timestamp.to_rfc3339(),
            entry.level.to_string(),
            entry.feature_tag.clone(),
            entry.module_tag.clone(),
            entry.function_name.clone(),
            entry.message.clone(),
            parameters,
            context.and_then(|c| c.user_id.clone()).unwrap_or_default(),
            context.and_then(|c| c.session_id.clone()).unwrap_or_default(),
            context.and_then(|c| c.request_id.clone()).unwrap_or_default(),
            exception,
        ];

        let fields: Vec<String> = row.iter().map(|f| escape_csv_field(f)).collect();
        writeln!(out, "{}", fields.join(",")).map_err(|e| LoggingError::ExportError(e.to_string()))?;
    }

    Ok(out)
}

/// Write `entries` to `output` in the requested format
pub fn export_entries(
    entries: &[LogEntry],
    format: ExportFormat,
    output: &Path,
) -> Result<(), LoggingError> {
    let content = match format {
        ExportFormat::Json => to_json(entries)?,
        ExportFormat::Csv => to_csv(entries)?,
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, content)?;
    info!("Exported {} log entries to {}", entries.len(), output.display());
    Ok(())
}

/// Escape CSV field if it contains special characters
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
