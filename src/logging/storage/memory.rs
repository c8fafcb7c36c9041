//! Bounded in-memory storage.

use super::{sort_newest_first, LogQuery, LogStorage};
use crate::logging::stats::{BackendInfo, LogCounters, StorageStatistics};
use crate::logging::{LogEntry, LoggingError};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Rough per-entry footprint used by `get_memory_usage_estimate`
const ESTIMATED_ENTRY_SIZE: usize = 500;

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Default)]
struct MemoryState {
    entries: VecDeque<LogEntry>,
    counters: LogCounters,
}

/// Ring buffer that evicts the oldest entry once `max_entries` is reached
#[derive(Debug)]
pub struct MemoryLogStorage {
    max_entries: usize,
    state: Mutex<MemoryState>,
}

impl MemoryLogStorage {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Current number of retained entries
    pub async fn get_entries_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Approximate bytes held by retained entries
    pub async fn get_memory_usage_estimate(&self) -> usize {
        self.get_entries_count().await * ESTIMATED_ENTRY_SIZE
    }
}

impl Default for MemoryLogStorage {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[async_trait]
impl LogStorage for MemoryLogStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store(&self, entry: &LogEntry) -> Result<(), LoggingError> {
        let mut state = self.state.lock().await;
        state.entries.push_back(entry.clone());
        state.counters.record(entry);

        while state.entries.len() > self.max_entries {
            if let Some(evicted) = state.entries.pop_front() {
                state.counters.forget(&evicted);
            }
        }
        Ok(())
    }

    async fn query(&self, query: &LogQuery) -> Result<Vec<LogEntry>, LoggingError> {
        let mut matched: Vec<LogEntry> = {
            let state = self.state.lock().await;
            state
                .entries
                .iter()
                .filter(|e| query.matches(e))
                .cloned()
                .collect()
        };
        sort_newest_first(&mut matched);
        Ok(query.paginate(matched))
    }

    async fn clear(&self) -> Result<(), LoggingError> {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.counters.reset();
        Ok(())
    }

    async fn get_statistics(&self) -> Result<StorageStatistics, LoggingError> {
        let state = self.state.lock().await;
        Ok(StorageStatistics {
            counters: state.counters.clone(),
            backend: BackendInfo::Memory {
                max_entries: self.max_entries,
                current_entries: state.entries.len(),
            },
        })
    }
}
