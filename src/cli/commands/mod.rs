//! CLI command implementations
//!
//! One module per subcommand. Reading commands share the loaders in [`utils`].

pub mod anomalies;
pub mod archives;
pub mod check;
pub mod export;
pub mod init_config;
pub mod query;
pub mod report;
pub mod stats;

/// Common utilities for command implementations
pub mod utils {
    use crate::cli::SourceArgs;
    use anyhow::{anyhow, bail, Result};
    use std::path::Path;
    use std::sync::Arc;
    use taglog::logging::storage::query_base_directory;
    use taglog::logging::{
        FileLogStorage, FileStorageOptions, LogEntry, LogLevel, LogQuery, LogStorage,
        MemoryLogStorage,
    };

    /// Parse a level name, accepting any case and `WARNING`
    pub fn parse_level(value: &str) -> Result<LogLevel> {
        value.parse::<LogLevel>().map_err(|e| anyhow!(e))
    }

    /// Reject missing directories instead of creating them
    pub fn require_directory(path: &Path) -> Result<()> {
        if !path.is_dir() {
            bail!("Log directory does not exist: {}", path.display());
        }
        Ok(())
    }

    /// Entries matching `query` from the source directory, newest first
    pub async fn load_entries(source: &SourceArgs, query: &LogQuery) -> Result<Vec<LogEntry>> {
        require_directory(&source.dir)?;
        let options = FileStorageOptions::default();

        if source.archived {
            Ok(query_base_directory(&source.dir, &options, query).await?)
        } else {
            let storage = FileLogStorage::with_options(&source.dir, options)?;
            Ok(storage.query(query).await?)
        }
    }

    /// Load every entry into a memory storage so the analyzer can run over it
    pub async fn snapshot(source: &SourceArgs) -> Result<Arc<MemoryLogStorage>> {
        let entries = load_entries(source, &LogQuery::new()).await?;
        let memory = MemoryLogStorage::new(entries.len().max(1));
        for entry in entries.iter().rev() {
            memory.store(entry).await?;
        }
        Ok(Arc::new(memory))
    }

    /// Format file size in human readable format
    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

        if size == 0 {
            return "0 B".to_string();
        }

        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        }
    }

    /// Render ranked (name, count) pairs on one line
    pub fn format_ranked(ranked: &[(String, usize)]) -> String {
        if ranked.is_empty() {
            return "-".to_string();
        }
        ranked
            .iter()
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::cli::SourceArgs;
        use tempfile::tempdir;

        #[test]
        fn test_format_file_size() {
            assert_eq!(format_file_size(0), "0 B");
            assert_eq!(format_file_size(512), "512 B");
            assert_eq!(format_file_size(1536), "1.5 KB");
            assert_eq!(format_file_size(10 * 1024 * 1024), "10.0 MB");
        }

        #[test]
        fn test_format_ranked() {
            assert_eq!(format_ranked(&[]), "-");
            assert_eq!(
                format_ranked(&[("AUTH".to_string(), 3), ("UI".to_string(), 1)]),
                "AUTH (3), UI (1)"
            );
        }

        #[tokio::test]
        async fn test_missing_directory_is_not_created() {
            let base = tempdir().unwrap();
            let source = SourceArgs {
                dir: base.path().join("missing"),
                archived: false,
            };
            assert!(load_entries(&source, &LogQuery::new()).await.is_err());
            assert!(!source.dir.exists());
        }

        #[tokio::test]
        async fn test_snapshot_keeps_every_entry() {
            let base = tempdir().unwrap();
            let storage = FileLogStorage::new(base.path()).unwrap();
            for i in 0..3 {
                storage
                    .store(&LogEntry::new(LogLevel::Info, "AUTH", "SERVICES", "f", format!("m{}", i)))
                    .await
                    .unwrap();
            }

            let source = SourceArgs {
                dir: base.path().to_path_buf(),
                archived: false,
            };
            let memory = snapshot(&source).await.unwrap();
            assert_eq!(memory.get_entries_count().await, 3);
        }
    }
}
