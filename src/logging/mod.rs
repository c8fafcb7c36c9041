//! Dual-tag structured logging.
//!
//! Every log call names a feature tag (a user-facing capability) and a module
//! tag (an internal code area). The [`LoggingConfigManager`] policy must enable
//! both, plus the global switch and level threshold, before anything happens.
//! Admitted entries are sanitized, stamped with a context snapshot, and fanned
//! out to every registered storage and formatter. Failures in one backend are
//! reported through `tracing` and never reach the caller.

pub mod analyzer;
pub mod config;
pub mod context;
pub mod export;
pub mod formatter;
pub mod sanitize;
pub mod stats;
pub mod storage;
pub mod tags;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

pub use analyzer::{LogAnalyzer, ReportOptions, TimeWindow};
pub use config::{LogLevel, LoggingConfig, LoggingConfigManager, DEFAULT_CONFIG_FILE};
pub use context::LogContext;
pub use export::ExportFormat;
pub use formatter::{JsonFormatter, LogFormatter, PrettyFormatter};
pub use sanitize::{sanitize_parameters, REDACTED};
pub use stats::{LogCounters, LoggerStatistics, StorageStatistics};
pub use storage::{
    ArchivedFileLogStorage, FileLogStorage, FileStorageOptions, LogQuery, LogStorage,
    MemoryLogStorage,
};

/// Structured parameters attached to a log call
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Error details carried by ERROR and FATAL entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogException {
    /// Short type name of the error
    #[serde(rename = "type")]
    pub exception_type: String,
    pub message: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LogException {
    pub fn new(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            exception_type: exception_type.into(),
            args: vec![message.clone()],
            message,
        }
    }

    /// Capture an error value: its type name, Display text and source chain
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        let mut args = vec![error.to_string()];
        let mut source = error.source();
        while let Some(cause) = source {
            args.push(cause.to_string());
            source = cause.source();
        }

        Self {
            exception_type: short_type_name(std::any::type_name::<E>()),
            message: error.to_string(),
            args,
        }
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// One log occurrence; immutable once handed to storages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock creation time
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub feature_tag: String,
    pub module_tag: String,
    pub function_name: String,
    pub message: String,
    /// Sanitized parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    /// Context snapshot taken when the entry was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<LogException>,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        feature_tag: impl Into<String>,
        module_tag: impl Into<String>,
        function_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            feature_tag: feature_tag.into(),
            module_tag: module_tag.into(),
            function_name: function_name.into(),
            message: message.into(),
            parameters: None,
            context: None,
            exception: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Empty maps are stored as absent
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters).filter(|p| !p.is_empty());
        self
    }

    /// Empty contexts are stored as absent
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context).filter(|c| !c.is_empty());
        self
    }

    pub fn with_exception(mut self, exception: LogException) -> Self {
        self.exception = Some(exception);
        self
    }
}

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Formatter error: {0}")]
    FormatterError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),
}

/// Arguments of one log call on their way through the facade
struct LogCall<'a> {
    level: LogLevel,
    feature_tag: &'a str,
    module_tag: &'a str,
    function_name: &'a str,
    message: String,
    parameters: Option<Parameters>,
    exception: Option<LogException>,
}

/// The facade: policy gate, sanitizer, storages and formatters
#[derive(Debug)]
pub struct Logger {
    config: Arc<LoggingConfigManager>,
    storages: Vec<Arc<dyn LogStorage>>,
    formatters: Vec<Arc<dyn LogFormatter>>,
    context: RwLock<Option<LogContext>>,
}

impl Logger {
    /// Logger with no storages or formatters
    pub fn new(config: impl Into<Arc<LoggingConfigManager>>) -> Self {
        Self {
            config: config.into(),
            storages: Vec::new(),
            formatters: Vec::new(),
            context: RwLock::new(None),
        }
    }

    pub fn builder(config: impl Into<Arc<LoggingConfigManager>>) -> LoggerBuilder {
        LoggerBuilder {
            config: config.into(),
            storages: Vec::new(),
            formatters: Vec::new(),
            context: None,
        }
    }

    pub fn config(&self) -> &Arc<LoggingConfigManager> {
        &self.config
    }

    pub fn storages(&self) -> &[Arc<dyn LogStorage>] {
        &self.storages
    }

    pub fn add_storage(&mut self, storage: Arc<dyn LogStorage>) {
        self.storages.push(storage);
    }

    pub fn add_formatter(&mut self, formatter: Arc<dyn LogFormatter>) {
        self.formatters.push(formatter);
    }

    /// Replace the ambient context
    pub async fn set_context(&self, context: LogContext) {
        *self.context.write().await = Some(context);
    }

    /// Mutate the ambient context in place, creating it if absent
    pub async fn update_context<F>(&self, updater: F)
    where
        F: FnOnce(&mut LogContext),
    {
        let mut guard = self.context.write().await;
        updater(guard.get_or_insert_with(LogContext::new));
    }

    pub async fn clear_context(&self) {
        *self.context.write().await = None;
    }

    pub async fn get_context(&self) -> Option<LogContext> {
        self.context.read().await.clone()
    }

    /// Handle with the feature and module tags bound
    pub fn tagged(&self, feature_tag: impl Into<String>, module_tag: impl Into<String>) -> TaggedLogger<'_> {
        TaggedLogger {
            logger: self,
            feature_tag: feature_tag.into(),
            module_tag: module_tag.into(),
        }
    }

    /// Handle that attaches `context` to every call, over the ambient context
    pub fn scoped(&self, context: LogContext) -> ScopedLogger<'_> {
        ScopedLogger {
            logger: self,
            context,
        }
    }

    pub async fn debug(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        parameters: Option<Parameters>,
    ) {
        self.emit(
            LogCall {
                level: LogLevel::Debug,
                feature_tag,
                module_tag,
                function_name,
                message: message.into(),
                parameters,
                exception: None,
            },
            None,
        )
        .await;
    }

    pub async fn info(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        parameters: Option<Parameters>,
    ) {
        self.emit(
            LogCall {
                level: LogLevel::Info,
                feature_tag,
                module_tag,
                function_name,
                message: message.into(),
                parameters,
                exception: None,
            },
            None,
        )
        .await;
    }

    pub async fn warn(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        parameters: Option<Parameters>,
    ) {
        self.emit(
            LogCall {
                level: LogLevel::Warn,
                feature_tag,
                module_tag,
                function_name,
                message: message.into(),
                parameters,
                exception: None,
            },
            None,
        )
        .await;
    }

    pub async fn error(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.emit(
            LogCall {
                level: LogLevel::Error,
                feature_tag,
                module_tag,
                function_name,
                message: message.into(),
                parameters,
                exception,
            },
            None,
        )
        .await;
    }

    pub async fn fatal(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.emit(
            LogCall {
                level: LogLevel::Fatal,
                feature_tag,
                module_tag,
                function_name,
                message: message.into(),
                parameters,
                exception,
            },
            None,
        )
        .await;
    }

    /// Log at an explicit level
    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        level: LogLevel,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.emit(
            LogCall {
                level,
                feature_tag,
                module_tag,
                function_name,
                message: message.into(),
                parameters,
                exception,
            },
            None,
        )
        .await;
    }

    async fn emit(&self, call: LogCall<'_>, scoped: Option<&LogContext>) {
        if !self
            .config
            .should_log(call.level, call.feature_tag, call.module_tag)
            .await
        {
            return;
        }

        let parameters = call.parameters.map(|p| sanitize_parameters(&p));
        let context = self.snapshot_context(scoped).await;

        let mut entry = LogEntry::new(
            call.level,
            call.feature_tag,
            call.module_tag,
            call.function_name,
            call.message,
        );
        entry.parameters = parameters.filter(|p| !p.is_empty());
        entry.context = context;
        entry.exception = call.exception;

        for storage in &self.storages {
            if let Err(e) = storage.store(&entry).await {
                error!("Failed to store log entry in {} storage: {}", storage.name(), e);
            }
        }

        for formatter in &self.formatters {
            match formatter.format(&entry) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to format log entry: {}", e),
            }
        }
    }

    /// Copy of the context for a new entry; explicit fields win over ambient ones
    async fn snapshot_context(&self, scoped: Option<&LogContext>) -> Option<LogContext> {
        let ambient = self.context.read().await.clone();
        let merged = match (scoped, ambient) {
            (Some(explicit), Some(ambient)) => {
                let mut merged = explicit.clone();
                merged.merge(&ambient);
                Some(merged)
            }
            (Some(explicit), None) => Some(explicit.clone()),
            (None, ambient) => ambient,
        };
        merged.filter(|c| !c.is_empty())
    }

    /// Query every storage, merge newest-first and paginate once
    pub async fn query_logs(&self, query: &LogQuery) -> Vec<LogEntry> {
        let wide = query.for_merge();
        let mut sources = Vec::with_capacity(self.storages.len());

        for storage in &self.storages {
            match storage.query(&wide).await {
                Ok(entries) => sources.push(entries),
                Err(e) => warn!("Failed to query {} storage: {}", storage.name(), e),
            }
        }

        storage::merge_results(sources, query)
    }

    /// Counters summed across every storage that answered
    pub async fn get_statistics(&self) -> LoggerStatistics {
        let mut stats = LoggerStatistics {
            formatters: self.formatters.len(),
            ..LoggerStatistics::default()
        };

        for storage in &self.storages {
            match storage.get_statistics().await {
                Ok(storage_stats) => {
                    stats.counters.merge(&storage_stats.counters);
                    stats.storage_backends.push(storage_stats);
                }
                Err(e) => warn!("Failed to get statistics from {} storage: {}", storage.name(), e),
            }
        }

        stats
    }

    pub async fn clear_logs(&self) {
        for storage in &self.storages {
            if let Err(e) = storage.clear().await {
                error!("Failed to clear {} storage: {}", storage.name(), e);
            }
        }
    }
}

/// Assembles a [`Logger`]
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Arc<LoggingConfigManager>,
    storages: Vec<Arc<dyn LogStorage>>,
    formatters: Vec<Arc<dyn LogFormatter>>,
    context: Option<LogContext>,
}

impl LoggerBuilder {
    pub fn storage(mut self, storage: Arc<dyn LogStorage>) -> Self {
        self.storages.push(storage);
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn LogFormatter>) -> Self {
        self.formatters.push(formatter);
        self
    }

    /// Initial ambient context
    pub fn context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            config: self.config,
            storages: self.storages,
            formatters: self.formatters,
            context: RwLock::new(self.context),
        }
    }
}

/// Logger handle with both tags bound
#[derive(Debug, Clone)]
pub struct TaggedLogger<'a> {
    logger: &'a Logger,
    feature_tag: String,
    module_tag: String,
}

impl<'a> TaggedLogger<'a> {
    pub fn feature_tag(&self) -> &str {
        &self.feature_tag
    }

    pub fn module_tag(&self) -> &str {
        &self.module_tag
    }

    pub async fn debug(&self, function_name: &str, message: impl Into<String>, parameters: Option<Parameters>) {
        self.logger
            .debug(&self.feature_tag, &self.module_tag, function_name, message, parameters)
            .await;
    }

    pub async fn info(&self, function_name: &str, message: impl Into<String>, parameters: Option<Parameters>) {
        self.logger
            .info(&self.feature_tag, &self.module_tag, function_name, message, parameters)
            .await;
    }

    pub async fn warn(&self, function_name: &str, message: impl Into<String>, parameters: Option<Parameters>) {
        self.logger
            .warn(&self.feature_tag, &self.module_tag, function_name, message, parameters)
            .await;
    }

    pub async fn error(
        &self,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.logger
            .error(&self.feature_tag, &self.module_tag, function_name, message, exception, parameters)
            .await;
    }

    pub async fn fatal(
        &self,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.logger
            .fatal(&self.feature_tag, &self.module_tag, function_name, message, exception, parameters)
            .await;
    }
}

/// Logger handle carrying an explicit, immutable context.
///
/// Concurrent tasks each hold their own `ScopedLogger`, so they never observe
/// one another's context the way a shared ambient context would allow.
#[derive(Debug, Clone)]
pub struct ScopedLogger<'a> {
    logger: &'a Logger,
    context: LogContext,
}

impl<'a> ScopedLogger<'a> {
    pub fn context(&self) -> &LogContext {
        &self.context
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        level: LogLevel,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.logger
            .emit(
                LogCall {
                    level,
                    feature_tag,
                    module_tag,
                    function_name,
                    message: message.into(),
                    parameters,
                    exception,
                },
                Some(&self.context),
            )
            .await;
    }

    pub async fn debug(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        parameters: Option<Parameters>,
    ) {
        self.log(LogLevel::Debug, feature_tag, module_tag, function_name, message, None, parameters)
            .await;
    }

    pub async fn info(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        parameters: Option<Parameters>,
    ) {
        self.log(LogLevel::Info, feature_tag, module_tag, function_name, message, None, parameters)
            .await;
    }

    pub async fn warn(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        parameters: Option<Parameters>,
    ) {
        self.log(LogLevel::Warn, feature_tag, module_tag, function_name, message, None, parameters)
            .await;
    }

    pub async fn error(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.log(LogLevel::Error, feature_tag, module_tag, function_name, message, exception, parameters)
            .await;
    }

    pub async fn fatal(
        &self,
        feature_tag: &str,
        module_tag: &str,
        function_name: &str,
        message: impl Into<String>,
        exception: Option<LogException>,
        parameters: Option<Parameters>,
    ) {
        self.log(LogLevel::Fatal, feature_tag, module_tag, function_name, message, exception, parameters)
            .await;
    }
}

/// Options for a ready-made logger: memory storage, session-archiving file
/// storage and a console formatter, each optional
#[derive(Debug, Clone)]
pub struct LoggingSetup {
    pub config_file: PathBuf,
    pub use_console: bool,
    pub use_file: bool,
    pub use_memory: bool,
    pub log_directory: PathBuf,
    pub max_memory_entries: usize,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LoggingSetup {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            use_console: true,
            use_file: true,
            use_memory: true,
            log_directory: PathBuf::from("./logs"),
            max_memory_entries: storage::memory::DEFAULT_MAX_ENTRIES,
            max_file_size: storage::file::DEFAULT_MAX_FILE_SIZE,
            max_files: storage::file::DEFAULT_MAX_FILES,
        }
    }
}

impl LoggingSetup {
    pub fn build(&self) -> Result<Logger, LoggingError> {
        let mut builder = Logger::builder(LoggingConfigManager::new(&self.config_file));

        if self.use_memory {
            builder = builder.storage(Arc::new(MemoryLogStorage::new(self.max_memory_entries)));
        }

        if self.use_file {
            let options = FileStorageOptions::default()
                .max_file_size(self.max_file_size)
                .max_files(self.max_files);
            builder = builder.storage(Arc::new(ArchivedFileLogStorage::new(
                &self.log_directory,
                options,
                true,
            )?));
        }

        if self.use_console {
            builder = builder.formatter(Arc::new(PrettyFormatter::console()));
        }

        Ok(builder.build())
    }
}

/// Convenience macros for tagged logging with format arguments
#[macro_export]
macro_rules! tag_debug {
    ($logger:expr, $feature:expr, $module:expr, $function:expr, $($arg:tt)*) => {
        $logger.debug($feature, $module, $function, format!($($arg)*), None).await
    };
}

#[macro_export]
macro_rules! tag_info {
    ($logger:expr, $feature:expr, $module:expr, $function:expr, $($arg:tt)*) => {
        $logger.info($feature, $module, $function, format!($($arg)*), None).await
    };
}

#[macro_export]
macro_rules! tag_warn {
    ($logger:expr, $feature:expr, $module:expr, $function:expr, $($arg:tt)*) => {
        $logger.warn($feature, $module, $function, format!($($arg)*), None).await
    };
}

#[macro_export]
macro_rules! tag_error {
    ($logger:expr, $feature:expr, $module:expr, $function:expr, $($arg:tt)*) => {
        $logger.error($feature, $module, $function, format!($($arg)*), None, None).await
    };
}
