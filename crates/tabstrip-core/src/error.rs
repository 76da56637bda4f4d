//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tabstrip_storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tab registry is not attached to a host")]
    NotAttached,

    #[error("No tab ids left to allocate")]
    TabIdsExhausted,
}

/// Why an inbound engine message was dropped
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed payload for {event}: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing field {field} in {event}")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    #[error("Tab error: {0}")]
    Tab(#[from] tabstrip_tabs::TabError),
}
