//! Tabstrip Tabs
//!
//! The per-tab state container and the vocabulary shared by the registry:
//! load states, tab events and `load_url` flags.

mod error;
mod event;
mod flags;
mod history;
mod state;
mod tab;

pub use error::TabError;
pub use event::TabEvent;
pub use flags::LoadFlags;
pub use history::{HistoryCommand, HistoryEntry, SessionHistory};
pub use state::LoadState;
pub use tab::{SecurityIdentity, Tab, TabId, DEFAULT_BACKGROUND_COLOR};

pub type Result<T> = std::result::Result<T, TabError>;
