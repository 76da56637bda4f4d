//! Per-tab session history mirror
//!
//! The engine owns the real back/forward list; this keeps a copy in sync
//! from `SessionHistory:*` messages so the chrome can render it.

use serde::{Deserialize, Serialize};

use crate::error::TabError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryCommand {
    New { url: String, title: String },
    Back,
    Forward,
    Goto { index: usize },
    Purge { num_entries: usize },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
    /// Index of the current entry, `None` while empty
    index: Option<usize>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: HistoryCommand) -> Result<()> {
        match command {
            HistoryCommand::New { url, title } => {
                // Navigating drops every forward entry
                let keep = self.index.map_or(0, |i| i + 1);
                self.entries.truncate(keep);
                self.entries.push(HistoryEntry { url, title });
                self.index = Some(self.entries.len() - 1);
                Ok(())
            }
            HistoryCommand::Back => match self.index {
                Some(i) if i > 0 => {
                    self.index = Some(i - 1);
                    Ok(())
                }
                _ => Err(self.out_of_range(0)),
            },
            HistoryCommand::Forward => match self.index {
                Some(i) if i + 1 < self.entries.len() => {
                    self.index = Some(i + 1);
                    Ok(())
                }
                Some(i) => Err(self.out_of_range(i + 1)),
                None => Err(self.out_of_range(0)),
            },
            HistoryCommand::Goto { index } => {
                if index >= self.entries.len() {
                    return Err(self.out_of_range(index));
                }
                self.index = Some(index);
                Ok(())
            }
            HistoryCommand::Purge { num_entries } => {
                // Never purge the current entry
                let current = self.index.unwrap_or(0);
                let purge = num_entries.min(current);
                if purge < num_entries {
                    tracing::warn!(
                        requested = num_entries,
                        purged = purge,
                        "Clamped session history purge"
                    );
                }
                self.entries.drain(0..purge);
                self.index = self.index.map(|i| i - purge);
                Ok(())
            }
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.index.and_then(|i| self.entries.get(i))
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.index.is_some_and(|i| i + 1 < self.entries.len())
    }

    fn out_of_range(&self, index: usize) -> TabError {
        TabError::HistoryIndex {
            index,
            len: self.entries.len(),
        }
    }
}
