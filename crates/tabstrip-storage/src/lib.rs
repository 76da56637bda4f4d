//! Tabstrip Storage Layer
//!
//! Durable home for the ordered list of open tabs. The registry only sees
//! the [`PersistenceSink`] trait; [`Database`] is the SQLite-backed sink.

mod database;
mod error;
mod migrations;
mod sink;

pub use database::Database;
pub use error::StorageError;
pub use sink::{MemorySink, PersistenceSink, TabRecord};

pub type Result<T> = std::result::Result<T, StorageError>;
