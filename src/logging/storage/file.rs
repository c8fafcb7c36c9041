//! Rotating newline-delimited JSON file storage.
//!
//! The current file is `<directory>/<filename>`; rotated backups are
//! `<filename>.1` (newest) through `<filename>.<max_files>` (oldest), with a
//! `.gz` suffix when compression is enabled. Aggregate counters persist in a
//! `.stats.json` sidecar so statistics survive restarts.

use super::{LogQuery, LogStorage};
use crate::logging::formatter::{JsonFormatter, LogFormatter};
use crate::logging::stats::{BackendInfo, FileBackendInfo, LogCounters, StorageStatistics};
use crate::logging::{LogEntry, LoggingError};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Name of the statistics sidecar inside a storage directory
pub const STATS_FILE: &str = ".stats.json";

pub const DEFAULT_FILENAME: &str = "app.log";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB
pub const DEFAULT_MAX_FILES: usize = 5;

/// Rotation and naming settings
#[derive(Debug, Clone, PartialEq)]
pub struct FileStorageOptions {
    pub filename: String,
    pub max_file_size: u64,
    /// Number of rotated backups kept
    pub max_files: usize,
    pub compress_rotated: bool,
}

impl Default for FileStorageOptions {
    fn default() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            compress_rotated: true,
        }
    }
}

impl FileStorageOptions {
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    pub fn compress_rotated(mut self, compress: bool) -> Self {
        self.compress_rotated = compress;
        self
    }
}

/// File storage with size-based rotation
#[derive(Debug)]
pub struct FileLogStorage {
    directory: PathBuf,
    options: FileStorageOptions,
    current_path: PathBuf,
    formatter: JsonFormatter,
    counters: Mutex<LogCounters>,
}

impl FileLogStorage {
    /// Storage in `directory` with default options
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, LoggingError> {
        Self::with_options(directory, FileStorageOptions::default())
    }

    pub fn with_options(
        directory: impl Into<PathBuf>,
        options: FileStorageOptions,
    ) -> Result<Self, LoggingError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        let current_path = directory.join(&options.filename);
        let counters = load_counters(&directory);

        Ok(Self {
            directory,
            options,
            current_path,
            formatter: JsonFormatter::new(),
            counters: Mutex::new(counters),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn options(&self) -> &FileStorageOptions {
        &self.options
    }

    pub fn current_file_path(&self) -> &Path {
        &self.current_path
    }

    /// Size of the current file, 0 when it does not exist
    pub fn current_file_size(&self) -> u64 {
        fs::metadata(&self.current_path)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Backup path for `index`, honouring the compression setting
    pub fn rotated_path(&self, index: usize) -> PathBuf {
        let name = if self.options.compress_rotated {
            format!("{}.{}.gz", self.options.filename, index)
        } else {
            format!("{}.{}", self.options.filename, index)
        };
        self.directory.join(name)
    }

    /// Both spellings of a backup, plain and gzip
    fn rotated_variants(&self, index: usize) -> [PathBuf; 2] {
        [
            self.directory
                .join(format!("{}.{}", self.options.filename, index)),
            self.directory
                .join(format!("{}.{}.gz", self.options.filename, index)),
        ]
    }

    pub(crate) fn backend_info(&self) -> FileBackendInfo {
        FileBackendInfo {
            directory: self.directory.clone(),
            current_file_size: self.current_file_size(),
            max_file_size: self.options.max_file_size,
            max_files: self.options.max_files,
            compress_rotated: self.options.compress_rotated,
        }
    }

    fn rotate(&self) -> Result<(), LoggingError> {
        if !self.current_path.exists() {
            return Ok(());
        }

        let max_files = self.options.max_files;
        if max_files == 0 {
            fs::remove_file(&self.current_path)?;
            return Ok(());
        }

        for oldest in self.rotated_variants(max_files) {
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
        }

        for index in (1..max_files).rev() {
            let from = self.rotated_variants(index);
            let to = self.rotated_variants(index + 1);
            for (source, target) in from.iter().zip(to.iter()) {
                if source.exists() {
                    fs::rename(source, target)?;
                }
            }
        }

        let target = self.rotated_path(1);
        if self.options.compress_rotated {
            let mut raw = Vec::new();
            File::open(&self.current_path)?.read_to_end(&mut raw)?;
            let mut encoder = GzEncoder::new(File::create(&target)?, Compression::default());
            encoder.write_all(&raw)?;
            encoder.finish()?;
            fs::remove_file(&self.current_path)?;
        } else {
            fs::rename(&self.current_path, &target)?;
        }

        debug!("Rotated {} to {}", self.current_path.display(), target.display());
        Ok(())
    }

    fn save_counters(&self, counters: &LogCounters) {
        let path = self.directory.join(STATS_FILE);
        let result = serde_json::to_string_pretty(counters)
            .map_err(LoggingError::from)
            .and_then(|content| fs::write(&path, content).map_err(LoggingError::from));

        if let Err(e) = result {
            warn!("Failed to save statistics to {}: {}", path.display(), e);
        }
    }

    /// Current file followed by every existing backup, newest first
    pub fn log_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if self.current_path.exists() {
            files.push(self.current_path.clone());
        }
        for index in 1..=self.options.max_files {
            files.extend(self.rotated_variants(index).into_iter().filter(|p| p.exists()));
        }
        files
    }

    /// Decode every readable entry across current and rotated files
    pub fn read_all(&self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        for path in self.log_files() {
            match read_entries(&path) {
                Ok(mut found) => entries.append(&mut found),
                Err(e) => warn!("Failed to read log file {}: {}", path.display(), e),
            }
        }
        entries
    }
}

#[async_trait]
impl LogStorage for FileLogStorage {
    fn name(&self) -> &str {
        "file"
    }

    async fn store(&self, entry: &LogEntry) -> Result<(), LoggingError> {
        let line = self.formatter.format(entry)?;
        let line_len = line.len() as u64 + 1;

        let mut counters = self.counters.lock().await;

        let current_size = self.current_file_size();
        if current_size > 0 && current_size + line_len > self.options.max_file_size {
            self.rotate()?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.current_path)?;
        writeln!(file, "{}", line)?;

        counters.record(entry);
        self.save_counters(&counters);
        Ok(())
    }

    async fn query(&self, query: &LogQuery) -> Result<Vec<LogEntry>, LoggingError> {
        let _guard = self.counters.lock().await;
        Ok(query.apply(self.read_all()))
    }

    async fn clear(&self) -> Result<(), LoggingError> {
        let mut counters = self.counters.lock().await;

        if self.current_path.exists() {
            fs::remove_file(&self.current_path)?;
        }
        for index in 1..=self.options.max_files {
            for path in self.rotated_variants(index) {
                if path.exists() {
                    fs::remove_file(&path)?;
                }
            }
        }

        counters.reset();
        self.save_counters(&counters);
        Ok(())
    }

    async fn get_statistics(&self) -> Result<StorageStatistics, LoggingError> {
        let counters = self.counters.lock().await.clone();
        Ok(StorageStatistics {
            counters,
            backend: BackendInfo::File(self.backend_info()),
        })
    }
}

/// Counters from the sidecar in `directory`, or zeroes when absent or unreadable
pub fn load_counters(directory: &Path) -> LogCounters {
    let path = directory.join(STATS_FILE);
    if !path.exists() {
        return LogCounters::new();
    }

    match fs::read_to_string(&path)
        .map_err(LoggingError::from)
        .and_then(|content| serde_json::from_str(&content).map_err(LoggingError::from))
    {
        Ok(counters) => counters,
        Err(e) => {
            warn!("Ignoring unreadable statistics file {}: {}", path.display(), e);
            LogCounters::new()
        }
    }
}

/// Read one log file, decompressing `.gz` files and skipping undecodable lines
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>, LoggingError> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!("Skipping undecodable line in {}: {}", path.display(), e),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    /// Every entry serializes to the same line length
    fn entry(i: i64) -> LogEntry {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::nanoseconds(123_456_789);
        LogEntry::new(LogLevel::Info, "AUTH", "SERVICES", "f", format!("message {:04}", i))
            .with_timestamp(base + Duration::seconds(i))
    }

    fn line_len(e: &LogEntry) -> u64 {
        JsonFormatter::new().format(e).unwrap().len() as u64 + 1
    }

    #[tokio::test]
    async fn test_store_and_query_round_trip() {
        let dir = tempdir().unwrap();
        let storage = FileLogStorage::new(dir.path()).unwrap();

        for i in 0..3 {
            storage.store(&entry(i)).await.unwrap();
        }

        let result = storage.query(&LogQuery::new()).await.unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].message, "message 0002");

        let content = fs::read_to_string(storage.current_file_path()).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_rotation_keeps_at_most_max_files() {
        let dir = tempdir().unwrap();
        let per_line = line_len(&entry(0));
        // two lines fit, the third rotates
        let options = FileStorageOptions::default()
            .max_file_size(per_line * 2)
            .max_files(3)
            .compress_rotated(false);
        let storage = FileLogStorage::with_options(dir.path(), options).unwrap();

        // 2 lines per file: 10 entries produce 4 rotations
        for i in 0..10 {
            storage.store(&entry(i)).await.unwrap();
        }

        assert!(storage.rotated_path(1).exists());
        assert!(storage.rotated_path(2).exists());
        assert!(storage.rotated_path(3).exists());
        assert!(!dir.path().join("app.log.4").exists());

        // .1 holds the most recently rotated pair
        let newest = read_entries(&storage.rotated_path(1)).unwrap();
        let messages: Vec<_> = newest.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["message 0006", "message 0007"]);

        // the oldest pair was deleted
        let all = storage.query(&LogQuery::new()).await.unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all.last().unwrap().message, "message 0002");
    }

    #[tokio::test]
    async fn test_rotation_count_below_ceiling() {
        let dir = tempdir().unwrap();
        let per_line = line_len(&entry(0));
        let options = FileStorageOptions::default()
            .max_file_size(per_line)
            .max_files(5)
            .compress_rotated(false);
        let storage = FileLogStorage::with_options(dir.path(), options).unwrap();

        // one line per file: 3 entries rotate twice
        for i in 0..3 {
            storage.store(&entry(i)).await.unwrap();
        }
        assert!(storage.rotated_path(1).exists());
        assert!(storage.rotated_path(2).exists());
        assert!(!storage.rotated_path(3).exists());
    }

    #[tokio::test]
    async fn test_compressed_backups_are_queryable() {
        let dir = tempdir().unwrap();
        let per_line = line_len(&entry(0));
        let options = FileStorageOptions::default().max_file_size(per_line);
        let storage = FileLogStorage::with_options(dir.path(), options).unwrap();

        for i in 0..3 {
            storage.store(&entry(i)).await.unwrap();
        }

        assert!(dir.path().join("app.log.1.gz").exists());
        assert!(dir.path().join("app.log.2.gz").exists());
        let all = storage.query(&LogQuery::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_bad_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let storage = FileLogStorage::new(dir.path()).unwrap();
        storage.store(&entry(1)).await.unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(storage.current_file_path())
            .unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(file, "{{\"level\": \"INFO\"}}").unwrap();
        drop(file);

        storage.store(&entry(2)).await.unwrap();
        assert_eq!(storage.query(&LogQuery::new()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_statistics_survive_restart() {
        let dir = tempdir().unwrap();
        {
            let storage = FileLogStorage::new(dir.path()).unwrap();
            storage.store(&entry(1)).await.unwrap();
            storage.store(&entry(2)).await.unwrap();
        }

        let reopened = FileLogStorage::new(dir.path()).unwrap();
        let stats = reopened.get_statistics().await.unwrap();
        assert_eq!(stats.counters.total_logs, 2);
        assert_eq!(stats.counters.by_feature.get("AUTH"), Some(&2));
        match stats.backend {
            BackendInfo::File(info) => {
                assert_eq!(info.max_files, DEFAULT_MAX_FILES);
                assert!(info.current_file_size > 0);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_removes_files_and_counters() {
        let dir = tempdir().unwrap();
        let per_line = line_len(&entry(0));
        let options = FileStorageOptions::default().max_file_size(per_line);
        let storage = FileLogStorage::with_options(dir.path(), options).unwrap();
        for i in 0..3 {
            storage.store(&entry(i)).await.unwrap();
        }

        storage.clear().await.unwrap();
        assert!(storage.log_files().is_empty());
        assert!(storage.query(&LogQuery::new()).await.unwrap().is_empty());
        assert_eq!(load_counters(dir.path()), LogCounters::new());
    }
}
