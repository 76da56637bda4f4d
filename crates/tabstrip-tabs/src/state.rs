//! Tab load state machine
//!
//! ```text
//! Idle ──start──> Loading ──stop──> Stopped
//!  │                 ^                 │
//!  └─delay─> Delayed ┘<────start───────┘
//! ```
//!
//! `Stopped` is not terminal: a fresh navigation moves the tab back to
//! `Loading`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Created, nothing requested from the engine yet
    #[default]
    Idle,
    /// A network-level navigation is in progress
    Loading,
    /// Created in the background; the engine has not started loading it
    Delayed,
    /// The last navigation finished (successfully or not)
    Stopped,
}

impl LoadState {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: LoadState) -> bool {
        match (self, target) {
            // Any state may begin a navigation
            (_, LoadState::Loading) => true,
            (LoadState::Loading, LoadState::Stopped) => true,
            // The engine can stop a load whose start never reached us
            (LoadState::Idle | LoadState::Delayed, LoadState::Stopped) => true,
            // Deferred creation only applies to a tab that never loaded
            (LoadState::Idle, LoadState::Delayed) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Delayed => "delayed",
            LoadState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(LoadState::Idle),
            "loading" => Ok(LoadState::Loading),
            "delayed" => Ok(LoadState::Delayed),
            "stopped" => Ok(LoadState::Stopped),
            _ => Err(format!("Unknown load state: {}", s)),
        }
    }
}
