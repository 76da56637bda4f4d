//! Registry configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tabstrip_session::DEFAULT_PERSIST_DELAY;

use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the local tabs database
    pub database_path: PathBuf,
    /// Page opened when the last tab is closed
    pub home_url: String,
    /// Quiet period before the tab strip is written out
    pub persist_delay_ms: u64,
    /// Write the strip once more when detaching from a host
    pub flush_on_detach: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("tabs.db"),
            home_url: "about:home".to_string(),
            persist_delay_ms: DEFAULT_PERSIST_DELAY.as_millis() as u64,
            flush_on_detach: false,
        }
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn persist_delay(&self) -> Duration {
        Duration::from_millis(self.persist_delay_ms)
    }

    pub fn data_dir() -> PathBuf {
        platform_data_dir()
            .map(|d| d.join("tabstrip"))
            .unwrap_or_else(|| PathBuf::from(".tabstrip"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

/// Platform data directory: `%LOCALAPPDATA%`, `~/Library/Application Support`
/// or the XDG data home
fn platform_data_dir() -> Option<PathBuf> {
    let home = || std::env::var_os("HOME").map(PathBuf::from);

    if cfg!(target_os = "windows") {
        std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
    } else if cfg!(target_os = "macos") {
        home().map(|h| h.join("Library/Application Support"))
    } else {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home().map(|h| h.join(".local/share")))
    }
}
