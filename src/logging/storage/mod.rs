//! Storage backends for log entries.
//!
//! Every backend implements [`LogStorage`]: write-once `store`, filtered
//! `query` returning entries newest-first, bulk `clear`, and incremental
//! statistics.

use crate::logging::stats::StorageStatistics;
use crate::logging::{LogEntry, LogLevel, LoggingError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod archived;
pub mod file;
pub mod memory;

pub use archived::{
    list_archive_directories, query_base_directory, ArchiveInfo, ArchivedFileLogStorage,
};
pub use file::{FileLogStorage, FileStorageOptions};
pub use memory::MemoryLogStorage;

/// Trait for log storage backends
#[async_trait]
pub trait LogStorage: std::fmt::Debug + Send + Sync {
    /// Short backend name used in diagnostics
    fn name(&self) -> &str;

    /// Persist one entry
    async fn store(&self, entry: &LogEntry) -> Result<(), LoggingError>;

    /// Entries matching `query`, newest first, paginated
    async fn query(&self, query: &LogQuery) -> Result<Vec<LogEntry>, LoggingError>;

    /// Drop every stored entry and reset counters
    async fn clear(&self) -> Result<(), LoggingError>;

    async fn get_statistics(&self) -> Result<StorageStatistics, LoggingError>;
}

/// Conjunctive filter plus pagination shared by every backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogQuery {
    pub level: Option<LogLevel>,
    pub feature_tag: Option<String>,
    pub module_tag: Option<String>,
    /// Matches `context.user_id`
    pub user_id: Option<String>,
    /// Inclusive lower bound
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn feature(mut self, feature_tag: impl Into<String>) -> Self {
        self.feature_tag = Some(feature_tag.into());
        self
    }

    pub fn module(mut self, module_tag: impl Into<String>) -> Self {
        self.module_tag = Some(module_tag.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn since(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn until(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Check every filter against `entry`
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(feature_tag) = &self.feature_tag {
            if &entry.feature_tag != feature_tag {
                return false;
            }
        }
        if let Some(module_tag) = &self.module_tag {
            if &entry.module_tag != module_tag {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            let entry_user = entry.context.as_ref().and_then(|c| c.user_id.as_ref());
            if entry_user != Some(user_id) {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if entry.timestamp > end {
                return false;
            }
        }
        true
    }

    /// Filter, sort newest-first, then paginate
    pub fn apply<I>(&self, entries: I) -> Vec<LogEntry>
    where
        I: IntoIterator<Item = LogEntry>,
    {
        let mut matched: Vec<LogEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        sort_newest_first(&mut matched);
        self.paginate(matched)
    }

    /// Apply offset then limit to an already sorted result set
    pub fn paginate(&self, entries: Vec<LogEntry>) -> Vec<LogEntry> {
        let offset = self.offset.unwrap_or(0);
        let iter = entries.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }

    /// Same filters, no offset, and a limit large enough to cover this page.
    /// Used when merging results from several sources before paginating once.
    pub fn for_merge(&self) -> LogQuery {
        LogQuery {
            offset: None,
            limit: self
                .limit
                .map(|limit| limit.saturating_add(self.offset.unwrap_or(0))),
            ..self.clone()
        }
    }
}

/// Stable sort by timestamp, newest first
pub fn sort_newest_first(entries: &mut [LogEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Merge several per-source result sets and paginate them once
pub fn merge_results(sources: Vec<Vec<LogEntry>>, query: &LogQuery) -> Vec<LogEntry> {
    let mut combined: Vec<LogEntry> = sources.into_iter().flatten().collect();
    sort_newest_first(&mut combined);
    query.paginate(combined)
}
