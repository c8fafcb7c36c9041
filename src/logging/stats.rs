//! Aggregate counters kept by every storage backend.
//!
//! Counters are maintained incrementally on `store` so `get_statistics` never
//! has to rescan the stored entries.

use crate::logging::LogEntry;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Running totals by level, feature tag and module tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCounters {
    /// Total number of entries counted
    #[serde(default)]
    pub total_logs: u64,

    #[serde(default)]
    pub by_level: BTreeMap<String, u64>,

    #[serde(default)]
    pub by_feature: BTreeMap<String, u64>,

    #[serde(default)]
    pub by_module: BTreeMap<String, u64>,
}

impl LogCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a newly stored entry
    pub fn record(&mut self, entry: &LogEntry) {
        self.total_logs += 1;
        *self
            .by_level
            .entry(entry.level.as_str().to_string())
            .or_insert(0) += 1;
        *self.by_feature.entry(entry.feature_tag.clone()).or_insert(0) += 1;
        *self.by_module.entry(entry.module_tag.clone()).or_insert(0) += 1;
    }

    /// Remove an evicted entry's contribution. Keys that reach zero are dropped
    /// and nothing ever goes below zero.
    pub fn forget(&mut self, entry: &LogEntry) {
        self.total_logs = self.total_logs.saturating_sub(1);
        decrement(&mut self.by_level, entry.level.as_str());
        decrement(&mut self.by_feature, &entry.feature_tag);
        decrement(&mut self.by_module, &entry.module_tag);
    }

    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &LogCounters) {
        self.total_logs += other.total_logs;
        for (target, source) in [
            (&mut self.by_level, &other.by_level),
            (&mut self.by_feature, &other.by_feature),
            (&mut self.by_module, &other.by_module),
        ] {
            for (key, count) in source {
                *target.entry(key.clone()).or_insert(0) += count;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = LogCounters::new();
    }
}

fn decrement(counts: &mut BTreeMap<String, u64>, key: &str) {
    if let Some(count) = counts.get_mut(key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(key);
        }
    }
}

/// Settings and sizes of a rotating file store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBackendInfo {
    pub directory: PathBuf,
    pub current_file_size: u64,
    pub max_file_size: u64,
    pub max_files: usize,
    pub compress_rotated: bool,
}

/// One archived session as reported in statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub name: String,
    pub file_count: usize,
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
}

/// Backend-specific part of a storage's statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "storage_type", rename_all = "snake_case")]
pub enum BackendInfo {
    Memory {
        max_entries: usize,
        current_entries: usize,
    },
    File(FileBackendInfo),
    ArchivedFile {
        #[serde(flatten)]
        file: FileBackendInfo,
        current_session_dir: PathBuf,
        archive_count: usize,
        archives: Vec<ArchiveSummary>,
    },
}

impl BackendInfo {
    pub fn storage_type(&self) -> &'static str {
        match self {
            BackendInfo::Memory { .. } => "memory",
            BackendInfo::File(_) => "file",
            BackendInfo::ArchivedFile { .. } => "archived_file",
        }
    }
}

/// What `LogStorage::get_statistics` returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStatistics {
    #[serde(flatten)]
    pub counters: LogCounters,
    pub backend: BackendInfo,
}

/// Aggregated statistics across every storage of a `Logger`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggerStatistics {
    /// Counters summed over all backends that answered
    #[serde(flatten)]
    pub counters: LogCounters,
    pub storage_backends: Vec<StorageStatistics>,
    pub formatters: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogEntry, LogLevel};
    use pretty_assertions::assert_eq;

    fn entry(level: LogLevel, feature: &str, module: &str) -> LogEntry {
        LogEntry::new(level, feature, module, "test_fn", "message")
    }

    #[test]
    fn test_record_and_forget() {
        let mut counters = LogCounters::new();
        let a = entry(LogLevel::Info, "AUTH", "SERVICES");
        let b = entry(LogLevel::Error, "AUTH", "UTILS");
        counters.record(&a);
        counters.record(&b);

        assert_eq!(counters.total_logs, 2);
        assert_eq!(counters.by_feature.get("AUTH"), Some(&2));
        assert_eq!(counters.by_level.get("ERROR"), Some(&1));

        counters.forget(&b);
        assert_eq!(counters.total_logs, 1);
        assert_eq!(counters.by_level.get("ERROR"), None);
        assert_eq!(counters.by_module.get("UTILS"), None);
        assert_eq!(counters.by_feature.get("AUTH"), Some(&1));
    }

    #[test]
    fn test_forget_never_underflows() {
        let mut counters = LogCounters::new();
        counters.forget(&entry(LogLevel::Info, "AUTH", "SERVICES"));
        assert_eq!(counters, LogCounters::new());
    }

    #[test]
    fn test_merge_sums_keys() {
        let mut left = LogCounters::new();
        left.record(&entry(LogLevel::Info, "AUTH", "SERVICES"));
        let mut right = LogCounters::new();
        right.record(&entry(LogLevel::Info, "SECURITY", "SERVICES"));

        left.merge(&right);
        assert_eq!(left.total_logs, 2);
        assert_eq!(left.by_module.get("SERVICES"), Some(&2));
        assert_eq!(left.by_feature.len(), 2);
    }

    #[test]
    fn test_sidecar_shape() {
        let mut counters = LogCounters::new();
        counters.record(&entry(LogLevel::Warn, "AUTH", "SERVICES"));
        let value = serde_json::to_value(&counters).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "total_logs": 1,
                "by_level": {"WARN": 1},
                "by_feature": {"AUTH": 1},
                "by_module": {"SERVICES": 1},
            })
        );
    }

    #[test]
    fn test_storage_statistics_serializes_flat() {
        let stats = StorageStatistics {
            counters: LogCounters::new(),
            backend: BackendInfo::Memory {
                max_entries: 10,
                current_entries: 0,
            },
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["total_logs"], 0);
        assert_eq!(value["backend"]["storage_type"], "memory");
        assert_eq!(stats.backend.storage_type(), "memory");
    }
}
