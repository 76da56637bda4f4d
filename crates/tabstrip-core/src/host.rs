//! Host binding
//!
//! What the registry borrows from the UI host it is attached to: a
//! background runtime, the persistence sink, and optionally the sync
//! account state that gates persistence.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;

use tabstrip_storage::{Database, PersistenceSink};

use crate::config::Config;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(pub u64);

/// Whether a sync account exists; local tabs are only written while one does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    NotConfigured,
    Configured,
}

#[derive(Clone)]
pub struct HostContext {
    id: HostId,
    runtime: Handle,
    sink: Arc<dyn PersistenceSink>,
    sync_state: Option<watch::Receiver<SyncState>>,
}

impl HostContext {
    pub fn new(id: HostId, runtime: Handle, sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            id,
            runtime,
            sink,
            sync_state: None,
        }
    }

    /// Host backed by the SQLite store at `config.database_path`
    pub fn open(id: HostId, runtime: Handle, config: &Config) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        Ok(Self::new(id, runtime, Arc::new(db)))
    }

    /// Gate persistence on sync accounts and flush whenever they change
    pub fn with_sync_state(mut self, sync_state: watch::Receiver<SyncState>) -> Self {
        self.sync_state = Some(sync_state);
        self
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn sink(&self) -> Arc<dyn PersistenceSink> {
        Arc::clone(&self.sink)
    }

    pub fn sync_state(&self) -> Option<watch::Receiver<SyncState>> {
        self.sync_state.clone()
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("id", &self.id)
            .field("sync_gated", &self.sync_state.is_some())
            .finish()
    }
}
