// Dual-tag structured logging library
//
// Log calls carry a feature tag and a module tag; a JSON policy decides which
// combinations are recorded. Entries are sanitized, stored in memory or in
// rotating session-archived files, and can be queried and analyzed.

pub mod logging;

// Re-export commonly used types
pub use logging::{
    LogContext, LogEntry, LogException, LogLevel, LogQuery, LogStorage, Logger, LoggerBuilder,
    LoggingConfig, LoggingConfigManager, LoggingError, LoggingSetup, Parameters, ScopedLogger,
    TaggedLogger,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
