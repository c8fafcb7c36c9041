//! Session-archiving file storage.
//!
//! Each run writes into a fresh `<base>/<YYYY-MM-DD_HH-MM-SS>/` directory.
//! Loose log files left directly in `<base>` by older runs are moved into an
//! `archived_<timestamp>` directory named after their latest modification time.

use super::file::{FileLogStorage, FileStorageOptions, STATS_FILE};
use super::{merge_results, LogQuery, LogStorage};
use crate::logging::export::{export_entries, ExportFormat};
use crate::logging::stats::{ArchiveSummary, BackendInfo, StorageStatistics};
use crate::logging::{LogEntry, LoggingError};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

const SESSION_DIR_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const ARCHIVE_PREFIX: &str = "archived_";

/// A previous session or archive directory under the base directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub name: String,
    pub path: PathBuf,
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
    pub log_files: Vec<String>,
    pub file_count: usize,
}

impl ArchiveInfo {
    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            name: self.name.clone(),
            file_count: self.file_count,
            created: self.created,
            modified: self.modified,
        }
    }
}

/// File storage scoped to one session directory
#[derive(Debug)]
pub struct ArchivedFileLogStorage {
    base_directory: PathBuf,
    current_session_dir: PathBuf,
    inner: FileLogStorage,
}

impl ArchivedFileLogStorage {
    /// Start a new session under `base_directory`, migrating loose legacy
    /// files first when `archive_previous_sessions` is set
    pub fn new(
        base_directory: impl Into<PathBuf>,
        options: FileStorageOptions,
        archive_previous_sessions: bool,
    ) -> Result<Self, LoggingError> {
        let base_directory = base_directory.into();
        fs::create_dir_all(&base_directory)?;

        let session_name = Local::now().format(SESSION_DIR_FORMAT).to_string();
        let current_session_dir = base_directory.join(session_name);
        fs::create_dir_all(&current_session_dir)?;

        if archive_previous_sessions {
            archive_existing_logs(&base_directory);
        }

        let inner = FileLogStorage::with_options(&current_session_dir, options)?;
        info!(
            "Logging session started in {}",
            current_session_dir.display()
        );

        Ok(Self {
            base_directory,
            current_session_dir,
            inner,
        })
    }

    /// Default options with archiving enabled
    pub fn with_defaults(base_directory: impl Into<PathBuf>) -> Result<Self, LoggingError> {
        Self::new(base_directory, FileStorageOptions::default(), true)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn current_session_dir(&self) -> &Path {
        &self.current_session_dir
    }

    /// The file storage backing the current session
    pub fn session_storage(&self) -> &FileLogStorage {
        &self.inner
    }

    /// Sibling session and archive directories, newest first
    pub fn get_archive_directories(&self) -> Vec<ArchiveInfo> {
        list_archive_directories(&self.base_directory, Some(&self.current_session_dir))
    }

    /// Query a single archive directory by name; unknown names yield nothing
    pub async fn query_archived_logs(
        &self,
        archive_name: &str,
        query: &LogQuery,
    ) -> Result<Vec<LogEntry>, LoggingError> {
        let archive_path = self.base_directory.join(archive_name);
        if !archive_path.is_dir() {
            return Ok(Vec::new());
        }

        let archive = FileLogStorage::with_options(&archive_path, self.inner.options().clone())?;
        archive.query(query).await
    }

    /// Current session, optionally merged with every archive
    pub async fn query_with_archives(
        &self,
        query: &LogQuery,
        include_archived: bool,
    ) -> Result<Vec<LogEntry>, LoggingError> {
        if !include_archived {
            return self.inner.query(query).await;
        }

        let wide = query.for_merge();
        let mut sources = vec![self.inner.query(&wide).await?];

        for archive in self.get_archive_directories() {
            match self.query_archived_logs(&archive.name, &wide).await {
                Ok(entries) => sources.push(entries),
                Err(e) => warn!(
                    "Failed to query archived logs from {}: {}",
                    archive.name, e
                ),
            }
        }

        Ok(merge_results(sources, query))
    }

    /// Export an archive (or the current session) and return the written path.
    ///
    /// Without `output_file` the name is `logs_export_<archive>.<ext>` or
    /// `logs_export_<YYYYmmdd_HHMMSS>.<ext>` in the working directory.
    pub async fn export_logs(
        &self,
        archive_name: Option<&str>,
        format: ExportFormat,
        output_file: Option<&Path>,
    ) -> Result<PathBuf, LoggingError> {
        let all = LogQuery::new();
        let (entries, default_name) = match archive_name {
            Some(name) => (
                self.query_archived_logs(name, &all).await?,
                format!("logs_export_{}.{}", name, format.extension()),
            ),
            None => (
                self.inner.query(&all).await?,
                format!(
                    "logs_export_{}.{}",
                    Local::now().format("%Y%m%d_%H%M%S"),
                    format.extension()
                ),
            ),
        };

        let output = output_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(default_name));
        export_entries(&entries, format, &output)?;
        Ok(output)
    }
}

#[async_trait]
impl LogStorage for ArchivedFileLogStorage {
    fn name(&self) -> &str {
        "archived_file"
    }

    async fn store(&self, entry: &LogEntry) -> Result<(), LoggingError> {
        self.inner.store(entry).await
    }

    /// Current session only; see `query_with_archives`
    async fn query(&self, query: &LogQuery) -> Result<Vec<LogEntry>, LoggingError> {
        self.inner.query(query).await
    }

    async fn clear(&self) -> Result<(), LoggingError> {
        self.inner.clear().await
    }

    async fn get_statistics(&self) -> Result<StorageStatistics, LoggingError> {
        let base = self.inner.get_statistics().await?;
        let archives = self.get_archive_directories();

        Ok(StorageStatistics {
            counters: base.counters,
            backend: BackendInfo::ArchivedFile {
                file: self.inner.backend_info(),
                current_session_dir: self.current_session_dir.clone(),
                archive_count: archives.len(),
                archives: archives.iter().map(ArchiveInfo::summary).collect(),
            },
        })
    }
}

/// Files a pre-session run would have left in the base directory
fn is_legacy_log_file(name: &str) -> bool {
    if name.starts_with(STATS_FILE) || name.ends_with(".log") || name.ends_with(".log.gz") {
        return true;
    }

    // rotated backups: <name>.log.<N>[.gz]
    let trimmed = name.strip_suffix(".gz").unwrap_or(name);
    match trimmed.rsplit_once('.') {
        Some((stem, index)) => {
            stem.ends_with(".log") && !index.is_empty() && index.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_log_file(name: &str) -> bool {
    name.ends_with(".log") || name.ends_with(".log.gz")
}

/// Move loose legacy files into `archived_<latest mtime>`; failures are per file
fn archive_existing_logs(base_directory: &Path) {
    let read_dir = match fs::read_dir(base_directory) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            warn!(
                "Failed to scan {} for previous logs: {}",
                base_directory.display(),
                e
            );
            return;
        }
    };

    let mut legacy: Vec<(PathBuf, SystemTime)> = Vec::new();
    for item in read_dir.flatten() {
        let path = item.path();
        let name = item.file_name().to_string_lossy().to_string();
        if !path.is_file() || !is_legacy_log_file(&name) {
            continue;
        }
        let modified = item
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        legacy.push((path, modified));
    }

    let Some(latest) = legacy.iter().map(|(_, modified)| *modified).max() else {
        return;
    };

    let stamp = DateTime::<Local>::from(latest).format(SESSION_DIR_FORMAT);
    let archive_dir = base_directory.join(format!("{}{}", ARCHIVE_PREFIX, stamp));
    if let Err(e) = fs::create_dir_all(&archive_dir) {
        warn!(
            "Failed to create archive directory {}: {}",
            archive_dir.display(),
            e
        );
        return;
    }

    let mut moved = 0;
    for (path, _) in legacy {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = archive_dir.join(file_name);
        match fs::rename(&path, &target) {
            Ok(()) => moved += 1,
            Err(e) => warn!("Failed to archive {}: {}", path.display(), e),
        }
    }
    info!(
        "Archived {} previous log files into {}",
        moved,
        archive_dir.display()
    );
}

/// Every subdirectory of `base` except `exclude`, newest first.
/// Unreadable directories are skipped with a warning.
pub fn list_archive_directories(base: &Path, exclude: Option<&Path>) -> Vec<ArchiveInfo> {
    let read_dir = match fs::read_dir(base) {
        Ok(read_dir) => read_dir,
        Err(_) => return Vec::new(),
    };

    let mut archives = Vec::new();
    for item in read_dir.flatten() {
        let path = item.path();
        if !path.is_dir() || exclude.map_or(false, |skip| skip == path.as_path()) {
            continue;
        }

        match describe_archive(&path) {
            Ok(info) => archives.push(info),
            Err(e) => warn!("Failed to read archive directory {}: {}", path.display(), e),
        }
    }

    archives.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.name.cmp(&a.name)));
    archives
}

fn describe_archive(path: &Path) -> Result<ArchiveInfo, LoggingError> {
    let metadata = fs::metadata(path)?;
    let modified = metadata.modified()?;
    let created = metadata.created().unwrap_or(modified);

    let mut log_files: Vec<String> = fs::read_dir(path)?
        .flatten()
        .map(|item| item.file_name().to_string_lossy().to_string())
        .filter(|name| is_log_file(name))
        .collect();
    log_files.sort();

    Ok(ArchiveInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path: path.to_path_buf(),
        created: created.into(),
        modified: modified.into(),
        file_count: log_files.len(),
        log_files,
    })
}

/// Read everything below `base` without starting a session: loose files in
/// `base` itself plus every subdirectory, merged and paginated once.
pub async fn query_base_directory(
    base: &Path,
    options: &FileStorageOptions,
    query: &LogQuery,
) -> Result<Vec<LogEntry>, LoggingError> {
    let wide = query.for_merge();
    let mut sources = Vec::new();

    let loose = FileLogStorage::with_options(base, options.clone())?;
    sources.push(loose.query(&wide).await?);

    for archive in list_archive_directories(base, None) {
        let storage = FileLogStorage::with_options(&archive.path, options.clone())?;
        match storage.query(&wide).await {
            Ok(entries) => sources.push(entries),
            Err(e) => warn!("Failed to query {}: {}", archive.path.display(), e),
        }
    }

    Ok(merge_results(sources, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use tempfile::tempdir;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, "AUTH", "SERVICES", "f", message)
    }

    #[test]
    fn test_legacy_file_detection() {
        assert!(is_legacy_log_file("app.log"));
        assert!(is_legacy_log_file("app.log.gz"));
        assert!(is_legacy_log_file("app.log.3"));
        assert!(is_legacy_log_file("app.log.3.gz"));
        assert!(is_legacy_log_file(".stats.json"));
        assert!(!is_legacy_log_file("notes.txt"));
        assert!(!is_legacy_log_file("app.log.old"));
        assert!(!is_legacy_log_file("logging.json"));
    }

    #[tokio::test]
    async fn test_loose_files_are_migrated() {
        let base = tempdir().unwrap();
        fs::write(base.path().join("app.log"), "").unwrap();
        fs::write(base.path().join("app.log.1.gz"), "").unwrap();
        fs::write(base.path().join("keep.txt"), "x").unwrap();

        let storage = ArchivedFileLogStorage::with_defaults(base.path()).unwrap();

        assert!(!base.path().join("app.log").exists());
        assert!(base.path().join("keep.txt").exists());

        let archives = storage.get_archive_directories();
        assert_eq!(archives.len(), 1);
        assert!(archives[0].name.starts_with(ARCHIVE_PREFIX));
        assert!(archives[0].path.join("app.log").exists());
        assert!(archives[0].path.join("app.log.1.gz").exists());
        assert_eq!(archives[0].file_count, 1);

        assert!(storage.current_session_dir().is_dir());
        assert!(storage.query(&LogQuery::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_archiving_can_be_disabled() {
        let base = tempdir().unwrap();
        fs::write(base.path().join("app.log"), "").unwrap();

        let storage =
            ArchivedFileLogStorage::new(base.path(), FileStorageOptions::default(), false).unwrap();
        assert!(base.path().join("app.log").exists());
        assert!(storage.get_archive_directories().is_empty());
    }

    #[tokio::test]
    async fn test_query_with_archives_merges_sessions() {
        let base = tempdir().unwrap();
        let old_session = base.path().join("2020-01-01_00-00-00");
        let old = FileLogStorage::new(&old_session).unwrap();
        old.store(&entry("old")).await.unwrap();

        let storage = ArchivedFileLogStorage::with_defaults(base.path()).unwrap();
        storage.store(&entry("new")).await.unwrap();

        let current = storage.query(&LogQuery::new()).await.unwrap();
        assert_eq!(current.len(), 1);

        let merged = storage
            .query_with_archives(&LogQuery::new(), true)
            .await
            .unwrap();
        let messages: Vec<_> = merged.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["new", "old"]);

        let page = storage
            .query_with_archives(&LogQuery::new().offset(1).limit(1), true)
            .await
            .unwrap();
        assert_eq!(page[0].message, "old");

        let single = storage
            .query_archived_logs("2020-01-01_00-00-00", &LogQuery::new())
            .await
            .unwrap();
        assert_eq!(single.len(), 1);
        assert!(storage
            .query_archived_logs("missing", &LogQuery::new())
            .await
            .unwrap()
            .is_empty());

        let all = query_base_directory(base.path(), &FileStorageOptions::default(), &LogQuery::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_export_current_session() {
        let base = tempdir().unwrap();
        let storage = ArchivedFileLogStorage::with_defaults(base.path().join("logs")).unwrap();
        storage.store(&entry("exported")).await.unwrap();

        let target = base.path().join("export.csv");
        let written = storage
            .export_logs(None, ExportFormat::Csv, Some(&target))
            .await
            .unwrap();
        assert_eq!(written, target);
        let content = fs::read_to_string(&target).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("exported"));
    }

    #[tokio::test]
    async fn test_statistics_report_archives() {
        let base = tempdir().unwrap();
        fs::create_dir_all(base.path().join("2020-01-01_00-00-00")).unwrap();

        let storage = ArchivedFileLogStorage::with_defaults(base.path()).unwrap();
        storage.store(&entry("x")).await.unwrap();

        let stats = storage.get_statistics().await.unwrap();
        assert_eq!(stats.counters.total_logs, 1);
        match stats.backend {
            BackendInfo::ArchivedFile {
                archive_count,
                current_session_dir,
                ..
            } => {
                assert_eq!(archive_count, 1);
                assert_eq!(current_session_dir, storage.current_session_dir().to_path_buf());
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }
}
