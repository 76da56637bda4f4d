//! Tabstrip Core
//!
//! The tab registry and everything wired around it: the UI-thread
//! notification queue, the engine message bridge and the host binding that
//! supplies persistence and a background runtime.

mod bridge;
mod config;
mod error;
mod fanout;
mod host;
mod message;
mod registry;

pub use bridge::{EngineChannel, EventBridge};
pub use config::Config;
pub use error::{BridgeError, CoreError};
pub use fanout::{EventData, ListenerId, Notification, TabsChangedListener, UiLoop};
pub use host::{HostContext, HostId, SyncState};
pub use message::{InboundMessage, LoadRequest, OutboundMessage, StateChange, TabAdded};
pub use registry::TabRegistry;

pub use tabstrip_session::{PersistScheduler, SessionError};
pub use tabstrip_storage::{Database, MemorySink, PersistenceSink, StorageError, TabRecord};
pub use tabstrip_tabs::{
    HistoryCommand, HistoryEntry, LoadFlags, LoadState, SecurityIdentity, SessionHistory, Tab,
    TabError, TabEvent, TabId,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A host may have installed its own subscriber already
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
