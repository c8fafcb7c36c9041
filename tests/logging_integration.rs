//! End-to-end tests for the tagged logging pipeline
//!
//! Covers the policy gate, sanitization across storages, failure isolation,
//! context handling, cross-storage queries and session archiving.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tempfile::tempdir;

use taglog::logging::stats::{BackendInfo, StorageStatistics};
use taglog::logging::storage::query_base_directory;
use taglog::logging::{
    ArchivedFileLogStorage, FileLogStorage, FileStorageOptions, LogAnalyzer, LogContext, LogEntry,
    LogException, LogFormatter, LogLevel, LogQuery, LogStorage, Logger, LoggingConfigManager, LoggingError,
    LoggingSetup, MemoryLogStorage, Parameters, REDACTED,
};

fn write_policy(path: &Path) {
    let policy = json!({
        "enabled": true,
        "logLevel": "INFO",
        "features": { "AUTH": true },
        "modules": { "SERVICES": true }
    });
    std::fs::write(path, serde_json::to_string_pretty(&policy).unwrap()).unwrap();
}

fn params(pairs: &[(&str, serde_json::Value)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Storage whose every operation fails
#[derive(Debug)]
struct FailingStorage;

#[async_trait]
impl LogStorage for FailingStorage {
    fn name(&self) -> &str {
        "failing"
    }

    async fn store(&self, _entry: &LogEntry) -> Result<(), LoggingError> {
        Err(LoggingError::StorageError("disk on fire".to_string()))
    }

    async fn query(&self, _query: &LogQuery) -> Result<Vec<LogEntry>, LoggingError> {
        Err(LoggingError::StorageError("disk on fire".to_string()))
    }

    async fn clear(&self) -> Result<(), LoggingError> {
        Err(LoggingError::StorageError("disk on fire".to_string()))
    }

    async fn get_statistics(&self) -> Result<StorageStatistics, LoggingError> {
        Err(LoggingError::StorageError("disk on fire".to_string()))
    }
}

/// Formatter that rejects every entry
#[derive(Debug)]
struct FailingFormatter;

impl LogFormatter for FailingFormatter {
    fn format(&self, _entry: &LogEntry) -> Result<String, LoggingError> {
        Err(LoggingError::FormatterError("cannot render".to_string()))
    }
}

/// Formatter that counts the entries it renders
#[derive(Debug, Default)]
struct CountingFormatter {
    calls: AtomicUsize,
}

impl LogFormatter for CountingFormatter {
    fn format(&self, entry: &LogEntry) -> Result<String, LoggingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(entry.message.clone())
    }
}

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_policy_gate_and_redaction_reach_every_storage() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);

        let memory = Arc::new(MemoryLogStorage::new(100));
        let file = Arc::new(FileLogStorage::new(dir.path().join("logs")).unwrap());
        let logger = Logger::builder(LoggingConfigManager::new(&policy))
            .storage(memory.clone())
            .storage(file.clone())
            .build();

        logger
            .info(
                "AUTH",
                "SERVICES",
                "login",
                "User logged in",
                Some(params(&[("username", json!("alice")), ("password", json!("hunter2"))])),
            )
            .await;
        logger.debug("AUTH", "SERVICES", "login", "below threshold", None).await;
        logger.error("AUTH", "UI", "login", "module disabled", None, None).await;
        logger.error("UI", "SERVICES", "login", "feature disabled", None, None).await;

        let storages: [Arc<dyn LogStorage>; 2] = [memory.clone(), file.clone()];
        for storage in storages {
            let entries = storage.query(&LogQuery::new()).await.unwrap();
            assert_eq!(entries.len(), 1, "{} storage", storage.name());
            let stored = entries[0].parameters.as_ref().unwrap();
            assert_eq!(stored["username"], json!("alice"));
            assert_eq!(stored["password"], json!(REDACTED));
        }

        let raw = std::fs::read_to_string(file.current_file_path()).unwrap();
        assert!(!raw.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_reload_applies_new_policy() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);

        let memory = Arc::new(MemoryLogStorage::new(100));
        let logger = Logger::builder(LoggingConfigManager::new(&policy))
            .storage(memory.clone())
            .build();

        logger.info("SECURITY", "SERVICES", "scan", "dropped", None).await;

        std::fs::write(
            &policy,
            r#"{"enabled": true, "features": {"SECURITY": true}, "modules": {"SERVICES": true}}"#,
        )
        .unwrap();
        logger.config().reload_config().await;
        logger.info("SECURITY", "SERVICES", "scan", "kept", None).await;
        logger.info("AUTH", "SERVICES", "login", "AUTH reverted to default", None).await;

        let entries = memory.query(&LogQuery::new()).await.unwrap();
        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["kept"]);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_failing_storage_is_isolated() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);

        let memory = Arc::new(MemoryLogStorage::new(100));
        let logger = Logger::builder(LoggingConfigManager::new(&policy))
            .storage(Arc::new(FailingStorage))
            .storage(memory.clone())
            .build();

        logger.info("AUTH", "SERVICES", "login", "still stored", None).await;

        assert_eq!(memory.get_entries_count().await, 1);
        assert!(logs_contain("Failed to store log entry in failing storage"));

        let results = logger.query_logs(&LogQuery::new()).await;
        assert_eq!(results.len(), 1);

        let stats = logger.get_statistics().await;
        assert_eq!(stats.counters.total_logs, 1);
        assert_eq!(stats.storage_backends.len(), 1);

        logger.clear_logs().await;
        assert_eq!(memory.get_entries_count().await, 0);
        assert!(logs_contain("Failed to clear failing storage"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_failing_formatter_is_isolated() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);

        let memory = Arc::new(MemoryLogStorage::new(100));
        let counting = Arc::new(CountingFormatter::default());
        let logger = Logger::builder(LoggingConfigManager::new(&policy))
            .storage(memory.clone())
            .formatter(Arc::new(FailingFormatter))
            .formatter(counting.clone())
            .build();

        logger.info("AUTH", "SERVICES", "login", "rendered once", None).await;

        assert_eq!(memory.get_entries_count().await, 1);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Failed to format log entry"));
    }
}

mod context_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_scoped_loggers_keep_their_context() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);

        let memory = Arc::new(MemoryLogStorage::new(1000));
        let logger = Arc::new(
            Logger::builder(LoggingConfigManager::new(&policy))
                .storage(memory.clone())
                .context(LogContext::new().with_session_id("shared"))
                .build(),
        );

        let mut handles = Vec::new();
        for user in 0..4 {
            let logger = logger.clone();
            handles.push(tokio::spawn(async move {
                let scoped = logger.scoped(LogContext::new().with_user_id(format!("user{}", user)));
                for i in 0..10 {
                    scoped
                        .info("AUTH", "SERVICES", "work", format!("step {}", i), None)
                        .await;
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for user in 0..4 {
            let user_id = format!("user{}", user);
            let entries = memory.query(&LogQuery::new().user(user_id.as_str())).await.unwrap();
            assert_eq!(entries.len(), 10);
            assert!(entries.iter().all(|e| {
                let ctx = e.context.as_ref().unwrap();
                ctx.user_id.as_deref() == Some(user_id.as_str())
                    && ctx.session_id.as_deref() == Some("shared")
            }));
        }
    }

    #[tokio::test]
    async fn test_tagged_logger_with_exception() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);

        let memory = Arc::new(MemoryLogStorage::new(100));
        let logger = Logger::builder(LoggingConfigManager::new(&policy))
            .storage(memory.clone())
            .build();

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "token store missing");
        logger
            .tagged("AUTH", "SERVICES")
            .error(
                "refresh",
                "Token refresh failed",
                Some(LogException::from_error(&io_error)),
                Some(params(&[("api_key", json!("k-123")), ("attempt", json!(2))])),
            )
            .await;

        let entries = memory.query(&LogQuery::new().level(LogLevel::Error)).await.unwrap();
        let entry = &entries[0];
        let exception = entry.exception.as_ref().unwrap();
        assert_eq!(exception.exception_type, "Error");
        assert_eq!(exception.message, "token store missing");
        let stored = entry.parameters.as_ref().unwrap();
        assert_eq!(stored["api_key"], json!(REDACTED));
        assert_eq!(stored["attempt"], json!(2));
    }
}

mod storage_tests {
    use super::*;

    #[tokio::test]
    async fn test_cross_storage_query_paginates_once() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);

        let logger = Logger::builder(LoggingConfigManager::new(&policy))
            .storage(Arc::new(MemoryLogStorage::new(100)))
            .storage(Arc::new(FileLogStorage::new(dir.path().join("logs")).unwrap()))
            .build();

        for i in 0..5 {
            logger
                .info("AUTH", "SERVICES", "step", format!("m{}", i), None)
                .await;
        }

        assert_eq!(logger.query_logs(&LogQuery::new()).await.len(), 10);
        assert_eq!(
            logger.query_logs(&LogQuery::new().offset(8).limit(5)).await.len(),
            2
        );

        let stats = logger.get_statistics().await;
        assert_eq!(stats.counters.total_logs, 10);
        assert_eq!(stats.counters.by_feature["AUTH"], 10);
        let types: Vec<_> = stats
            .storage_backends
            .iter()
            .map(|s| s.backend.storage_type())
            .collect();
        assert_eq!(types, vec!["memory", "file"]);
    }

    #[tokio::test]
    async fn test_setup_archives_previous_run() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("logging.json");
        write_policy(&policy);
        let log_dir = dir.path().join("logs");
        std::fs::create_dir_all(&log_dir).unwrap();

        let old = LogEntry::new(LogLevel::Warn, "AUTH", "SERVICES", "old", "from last run");
        std::fs::write(
            log_dir.join("app.log"),
            format!("{}\n", serde_json::to_string(&old).unwrap()),
        )
        .unwrap();

        let setup = LoggingSetup {
            config_file: policy,
            use_console: false,
            log_directory: log_dir.clone(),
            ..LoggingSetup::default()
        };
        let logger = setup.build().unwrap();
        logger.info("AUTH", "SERVICES", "new", "this run", None).await;

        assert!(!log_dir.join("app.log").exists());

        let stats = logger.get_statistics().await;
        let archived = stats
            .storage_backends
            .iter()
            .find_map(|s| match &s.backend {
                BackendInfo::ArchivedFile { archive_count, .. } => Some(*archive_count),
                _ => None,
            })
            .unwrap();
        assert_eq!(archived, 1);

        let all = query_base_directory(&log_dir, &FileStorageOptions::default(), &LogQuery::new())
            .await
            .unwrap();
        let messages: Vec<_> = all.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"from last run"));
        assert!(messages.contains(&"this run"));
    }

    #[tokio::test]
    async fn test_archived_storage_export() {
        let dir = tempdir().unwrap();
        let storage = ArchivedFileLogStorage::with_defaults(dir.path().join("logs")).unwrap();
        storage
            .store(&LogEntry::new(LogLevel::Info, "AUTH", "SERVICES", "f", "exported"))
            .await
            .unwrap();

        let output = dir.path().join("export").join("session.csv");
        let written = storage
            .export_logs(None, "csv".parse().unwrap(), Some(&output))
            .await
            .unwrap();
        assert_eq!(written, output);

        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains(",INFO,AUTH,SERVICES,f,exported,"));
    }
}

mod analyzer_tests {
    use super::*;

    #[tokio::test]
    async fn test_analyzer_over_file_storage() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(FileLogStorage::new(dir.path()).unwrap());

        let entries = [
            (LogLevel::Info, "AUTH", "SERVICES"),
            (LogLevel::Error, "AUTH", "SERVICES"),
            (LogLevel::Fatal, "SECURITY", "SERVICES"),
            (LogLevel::Error, "SECURITY", "UTILS"),
        ];
        for (level, feature, module) in entries {
            storage
                .store(&LogEntry::new(level, feature, module, "f", "m"))
                .await
                .unwrap();
        }

        let analyzer = LogAnalyzer::new(storage);
        let errors = analyzer.find_errors(None, Some("SECURITY"), None).await;
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.level.is_error()));

        let stats = analyzer
            .get_statistics(taglog::logging::TimeWindow::all())
            .await;
        assert_eq!(stats.total_logs, 4);
        assert!((stats.error_rate - 0.75).abs() < 1e-9);
        assert_eq!(stats.error_distribution.by_feature["SECURITY"], 2);
    }
}
