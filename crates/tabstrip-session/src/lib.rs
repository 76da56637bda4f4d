//! Tabstrip Session Persistence
//!
//! - The ordered tab strip is written out after activity settles, not on
//!   every mutation
//! - Writes happen on a background runtime, never on the UI thread
//! - A failed write is logged and dropped; the next flush supersedes it

mod error;
mod scheduler;

pub use error::SessionError;
pub use scheduler::{PersistJob, PersistScheduler, DEFAULT_PERSIST_DELAY};

pub type Result<T> = std::result::Result<T, SessionError>;
