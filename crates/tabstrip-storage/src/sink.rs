//! Persistence sink contract

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One entry of the persisted tab strip, in strip order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    pub tab_id: i32,
    pub parent_id: Option<i32>,
    pub url: Option<String>,
    pub title: String,
    pub is_private: bool,
    pub position: usize,
    pub last_used: DateTime<Utc>,
}

/// Accepts the full ordered tab list and writes it durably.
///
/// Called from a background thread; implementations may block.
pub trait PersistenceSink: Send + Sync {
    fn persist_tabs(&self, tabs: &[TabRecord]) -> Result<()>;
}

/// Keeps every flushed list in memory. Useful for hosts without storage and
/// for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    flushes: Mutex<Vec<Vec<TabRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently persisted list
    pub fn latest(&self) -> Option<Vec<TabRecord>> {
        self.flushes.lock().last().cloned()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.lock().len()
    }
}

impl PersistenceSink for MemorySink {
    fn persist_tabs(&self, tabs: &[TabRecord]) -> Result<()> {
        self.flushes.lock().push(tabs.to_vec());
        Ok(())
    }
}
