//! Configuration structures and the dual-tag policy gate for the logging system.
//!
//! The policy lives in a JSON file (`logging.json` by default) that independently
//! enables each feature tag and module tag. A log call is emitted only when the
//! global switch, the level threshold and both tags all allow it.

use crate::logging::tags::{feature, module, FEATURE_TAGS, MODULE_TAGS};
use crate::logging::LoggingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default policy file name
pub const DEFAULT_CONFIG_FILE: &str = "logging.json";

/// Log level enumeration, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    /// All levels in ascending severity
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ERROR and FATAL both count as errors for analysis purposes
    pub fn is_error(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// The dual-tag logging policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global kill switch
    pub enabled: bool,

    /// Minimum level to emit
    #[serde(rename = "logLevel")]
    pub log_level: LogLevel,

    /// Feature tag switches
    pub features: BTreeMap<String, bool>,

    /// Module tag switches
    pub modules: BTreeMap<String, bool>,
}

impl Default for LoggingConfig {
    /// Everything disabled except the error-handling and logging features and
    /// the handlers module, so error paths survive a missing policy file.
    fn default() -> Self {
        let features = FEATURE_TAGS
            .iter()
            .map(|tag| {
                let on = *tag == feature::ERROR_HANDLING || *tag == feature::LOGGING;
                (tag.to_string(), on)
            })
            .collect();

        let modules = MODULE_TAGS
            .iter()
            .map(|tag| (tag.to_string(), *tag == module::HANDLERS))
            .collect();

        Self {
            enabled: false,
            log_level: LogLevel::Info,
            features,
            modules,
        }
    }
}

impl LoggingConfig {
    /// Check whether logging is globally enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check whether `level` meets the configured minimum
    pub fn is_level_enabled(&self, level: LogLevel) -> bool {
        level >= self.log_level
    }

    /// Unknown feature tags are denied
    pub fn is_feature_enabled(&self, feature_tag: &str) -> bool {
        self.features.get(feature_tag).copied().unwrap_or(false)
    }

    /// Unknown module tags are denied
    pub fn is_module_enabled(&self, module_tag: &str) -> bool {
        self.modules.get(module_tag).copied().unwrap_or(false)
    }

    /// The single predicate gating every write
    pub fn should_log(&self, level: LogLevel, feature_tag: &str, module_tag: &str) -> bool {
        self.is_enabled()
            && self.is_level_enabled(level)
            && self.is_feature_enabled(feature_tag)
            && self.is_module_enabled(module_tag)
    }

    /// Force the always-on tags back to `true`
    fn pin_defaults(&mut self) {
        self.features.insert(feature::ERROR_HANDLING.to_string(), true);
        self.features.insert(feature::LOGGING.to_string(), true);
        self.modules.insert(module::HANDLERS.to_string(), true);
    }

    /// Apply a parsed policy file over this configuration
    fn apply(&mut self, file: ConfigFile) -> Result<(), LoggingError> {
        let log_level = match file.log_level {
            Some(raw) => raw.parse::<LogLevel>().map_err(LoggingError::ConfigError)?,
            None => LogLevel::Info,
        };

        self.enabled = file.enabled.unwrap_or(false);
        self.log_level = log_level;
        self.features.extend(file.features);
        self.modules.extend(file.modules);
        Ok(())
    }

    /// Policy written by `create_sample_config`
    pub fn sample() -> Self {
        let disabled_features = [
            feature::DEBUG,
            feature::TESTING,
            feature::PERFORMANCE,
        ];
        let features = FEATURE_TAGS
            .iter()
            .map(|tag| (tag.to_string(), !disabled_features.contains(tag)))
            .collect();
        let modules = MODULE_TAGS
            .iter()
            .map(|tag| (tag.to_string(), *tag != module::TESTS))
            .collect();

        Self {
            enabled: true,
            log_level: LogLevel::Info,
            features,
            modules,
        }
    }
}

/// On-disk shape of the policy file; every key is optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    enabled: Option<bool>,
    #[serde(rename = "logLevel")]
    log_level: Option<String>,
    #[serde(default)]
    features: BTreeMap<String, bool>,
    #[serde(default)]
    modules: BTreeMap<String, bool>,
}

/// Loads the policy file and answers `should_log` for the facade
#[derive(Debug)]
pub struct LoggingConfigManager {
    config_file: PathBuf,
    pinned_defaults: bool,
    config: RwLock<LoggingConfig>,
}

impl LoggingConfigManager {
    /// Load the policy from `config_file`, falling back to defaults on any failure
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        let config_file = config_file.into();
        let config = Self::load(&config_file, false);
        Self {
            config_file,
            pinned_defaults: false,
            config: RwLock::new(config),
        }
    }

    /// Manager with an in-memory policy and no backing file
    pub fn from_config(config: LoggingConfig) -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            pinned_defaults: false,
            config: RwLock::new(config),
        }
    }

    /// When pinned, the policy file cannot disable the always-on tags
    pub fn with_pinned_defaults(mut self, pinned: bool) -> Self {
        self.pinned_defaults = pinned;
        if pinned {
            self.config.get_mut().pin_defaults();
        }
        self
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    fn load(path: &Path, pinned: bool) -> LoggingConfig {
        let mut config = LoggingConfig::default();

        if path.exists() {
            match Self::read_file(path) {
                Ok(file) => {
                    if let Err(e) = config.apply(file) {
                        warn!(
                            "Failed to load logging config from {}: {}; using default configuration",
                            path.display(),
                            e
                        );
                        config = LoggingConfig::default();
                    } else {
                        debug!("Loaded logging config from {}", path.display());
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to load logging config from {}: {}; using default configuration",
                        path.display(),
                        e
                    );
                }
            }
        }

        if pinned {
            config.pin_defaults();
        }
        config
    }

    fn read_file(path: &Path) -> Result<ConfigFile, LoggingError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Re-read the policy file on demand
    pub async fn reload_config(&self) {
        let fresh = Self::load(&self.config_file, self.pinned_defaults);
        *self.config.write().await = fresh;
    }

    /// Snapshot of the current policy
    pub async fn get_config(&self) -> LoggingConfig {
        self.config.read().await.clone()
    }

    /// Replace the policy programmatically
    pub async fn set_config(&self, mut config: LoggingConfig) {
        if self.pinned_defaults {
            config.pin_defaults();
        }
        *self.config.write().await = config;
    }

    pub async fn is_enabled(&self) -> bool {
        self.config.read().await.is_enabled()
    }

    pub async fn is_level_enabled(&self, level: LogLevel) -> bool {
        self.config.read().await.is_level_enabled(level)
    }

    pub async fn is_feature_enabled(&self, feature_tag: &str) -> bool {
        self.config.read().await.is_feature_enabled(feature_tag)
    }

    pub async fn is_module_enabled(&self, module_tag: &str) -> bool {
        self.config.read().await.is_module_enabled(module_tag)
    }

    pub async fn should_log(&self, level: LogLevel, feature_tag: &str, module_tag: &str) -> bool {
        self.config
            .read()
            .await
            .should_log(level, feature_tag, module_tag)
    }

    /// Write the sample policy to the manager's config file
    pub fn create_sample_config(&self) -> Result<(), LoggingError> {
        write_sample_config(&self.config_file)
    }
}

impl Default for LoggingConfigManager {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

/// Write the sample policy to `path`
pub fn write_sample_config(path: &Path) -> Result<(), LoggingError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(&LoggingConfig::sample())?;
    std::fs::write(path, content)?;
    info!("Sample logging configuration created at {}", path.display());
    Ok(())
}
