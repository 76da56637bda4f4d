//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] tabstrip_storage::StorageError),

    #[error("No sync account is set up")]
    SyncNotConfigured,

    #[error("Persist task failed: {0}")]
    Task(String),
}
