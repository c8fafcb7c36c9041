//! Log formatting implementations for JSON and human-readable output.

use crate::logging::{LogContext, LogEntry, LogException, LogLevel, LoggingError, Parameters};
use colored::*;
use serde_json::Value;

/// Trait for log formatters
pub trait LogFormatter: std::fmt::Debug + Send + Sync {
    /// Format a log entry into a string
    fn format(&self, entry: &LogEntry) -> Result<String, LoggingError>;

    /// Whether this formatter emits ANSI colour codes
    fn supports_color(&self) -> bool {
        false
    }
}

/// JSON formatter; one object per entry
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Single-line JSON regardless of this instance's setting
    pub fn format_compact(&self, entry: &LogEntry) -> Result<String, LoggingError> {
        Ok(serde_json::to_string(entry)?)
    }

    /// Indented JSON regardless of this instance's setting
    pub fn format_pretty(&self, entry: &LogEntry) -> Result<String, LoggingError> {
        Ok(serde_json::to_string_pretty(entry)?)
    }
}

impl LogFormatter for JsonFormatter {
    fn format(&self, entry: &LogEntry) -> Result<String, LoggingError> {
        if self.pretty {
            self.format_pretty(entry)
        } else {
            self.format_compact(entry)
        }
    }
}

/// Human-readable formatter with per-section toggles
#[derive(Debug, Clone)]
pub struct PrettyFormatter {
    show_timestamp: bool,
    show_level: bool,
    show_tags: bool,
    show_function: bool,
    show_parameters: bool,
    show_context: bool,
    show_exception: bool,
    timestamp_format: String,
    use_colors: bool,
}

impl Default for PrettyFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrettyFormatter {
    /// Every section shown, coloured
    pub fn new() -> Self {
        Self {
            show_timestamp: true,
            show_level: true,
            show_tags: true,
            show_function: true,
            show_parameters: true,
            show_context: true,
            show_exception: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            use_colors: true,
        }
    }

    /// Console variant: coloured, context omitted
    pub fn console() -> Self {
        Self::new().show_context(false)
    }

    /// File variant: everything shown, no colour
    pub fn file() -> Self {
        Self::new().colored(false)
    }

    pub fn colored(mut self, colored: bool) -> Self {
        self.use_colors = colored;
        self
    }

    pub fn show_timestamp(mut self, show: bool) -> Self {
        self.show_timestamp = show;
        self
    }

    pub fn show_level(mut self, show: bool) -> Self {
        self.show_level = show;
        self
    }

    pub fn show_tags(mut self, show: bool) -> Self {
        self.show_tags = show;
        self
    }

    pub fn show_function(mut self, show: bool) -> Self {
        self.show_function = show;
        self
    }

    pub fn show_parameters(mut self, show: bool) -> Self {
        self.show_parameters = show;
        self
    }

    pub fn show_context(mut self, show: bool) -> Self {
        self.show_context = show;
        self
    }

    pub fn show_exception(mut self, show: bool) -> Self {
        self.show_exception = show;
        self
    }

    pub fn timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Timestamp, level and message only
    pub fn format_compact(&self, entry: &LogEntry) -> Result<String, LoggingError> {
        PrettyFormatter::new()
            .colored(self.use_colors)
            .show_tags(false)
            .show_function(false)
            .show_parameters(false)
            .show_context(false)
            .show_exception(false)
            .format(entry)
    }

    /// Every section
    pub fn format_detailed(&self, entry: &LogEntry) -> Result<String, LoggingError> {
        PrettyFormatter::new()
            .colored(self.use_colors)
            .format(entry)
    }

    fn colorize(&self, text: &str, level: LogLevel) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        match level {
            LogLevel::Debug => text.cyan().to_string(),
            LogLevel::Info => text.green().to_string(),
            LogLevel::Warn => text.yellow().to_string(),
            LogLevel::Error => text.red().to_string(),
            LogLevel::Fatal => text.magenta().to_string(),
        }
    }

    fn format_parameters(parameters: &Parameters) -> String {
        let fields = parameters
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}='{}'", key, s),
                other => format!("{}={}", key, other),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{}}}", fields)
    }

    fn format_context(context: &LogContext) -> String {
        let mut fields = Vec::new();
        if let Some(user_id) = &context.user_id {
            fields.push(format!("user_id={}", user_id));
        }
        if let Some(session_id) = &context.session_id {
            fields.push(format!("session_id={}", session_id));
        }
        if let Some(request_id) = &context.request_id {
            fields.push(format!("request_id={}", request_id));
        }
        for (key, value) in &context.additional_context {
            match value {
                Value::String(s) => fields.push(format!("{}={}", key, s)),
                other => fields.push(format!("{}={}", key, other)),
            }
        }
        format!("{{{}}}", fields.join(", "))
    }

    fn format_exception(exception: &LogException) -> String {
        format!("{}: {}", exception.exception_type, exception.message)
    }
}

impl LogFormatter for PrettyFormatter {
    fn format(&self, entry: &LogEntry) -> Result<String, LoggingError> {
        let mut parts = Vec::new();

        if self.show_timestamp {
            let timestamp = entry.timestamp.format(&self.timestamp_format).to_string();
            parts.push(format!("[{}]", timestamp));
        }

        if self.show_level {
            let level = format!("{:<5}", entry.level.as_str());
            parts.push(self.colorize(&level, entry.level));
        }

        if self.show_tags {
            parts.push(format!("[{}:{}]", entry.feature_tag, entry.module_tag));
        }

        if self.show_function {
            parts.push(format!("{}()", entry.function_name));
        }

        parts.push(format!("- {}", self.colorize(&entry.message, entry.level)));

        let mut lines = vec![parts.join(" ")];

        if self.show_parameters {
            if let Some(parameters) = entry.parameters.as_ref().filter(|p| !p.is_empty()) {
                lines.push(format!("  Parameters: {}", Self::format_parameters(parameters)));
            }
        }

        if self.show_context {
            if let Some(context) = entry.context.as_ref().filter(|c| !c.is_empty()) {
                lines.push(format!("  Context: {}", Self::format_context(context)));
            }
        }

        if self.show_exception {
            if let Some(exception) = &entry.exception {
                lines.push(format!("  Exception: {}", Self::format_exception(exception)));
            }
        }

        Ok(lines.join("\n"))
    }

    fn supports_color(&self) -> bool {
        self.use_colors
    }
}
