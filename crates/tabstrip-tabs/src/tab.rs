//! Tab data structure
//!
//! Identity (id, parent, privacy) is fixed at construction. Everything the
//! engine reports about the page lives behind a per-tab lock so a tab can be
//! shared between the registry, the UI thread and observers as `Arc<Tab>`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::TabError;
use crate::history::{HistoryCommand, SessionHistory};
use crate::state::LoadState;
use crate::Result;

pub type TabId = i32;

pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";

/// Security summary reported by the engine for the current page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityIdentity {
    /// e.g. "unknown", "identified", "verified", "mixed_content"
    pub mode: String,
    pub origin: Option<String>,
    pub host: Option<String>,
    pub owner: Option<String>,
    pub verifier: Option<String>,
}

#[derive(Debug)]
struct TabData {
    url: Option<String>,
    title: String,
    state: LoadState,
    last_load_succeeded: bool,
    show_progress: bool,
    desktop_mode: bool,
    favicon_url: Option<String>,
    favicon_size: u32,
    thumbnail: Option<String>,
    identity: Option<SecurityIdentity>,
    reader_enabled: bool,
    feeds_enabled: bool,
    background_color: String,
    history: SessionHistory,
    destroyed: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Tab {
    id: TabId,
    parent_id: Option<TabId>,
    is_private: bool,
    external: bool,
    created_at: DateTime<Utc>,
    data: RwLock<TabData>,
}

impl Tab {
    pub fn new(
        id: TabId,
        url: Option<String>,
        external: bool,
        parent_id: Option<TabId>,
        title: String,
        is_private: bool,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            parent_id,
            is_private,
            external,
            created_at: now,
            data: RwLock::new(TabData {
                url,
                title,
                state: LoadState::Idle,
                last_load_succeeded: false,
                show_progress: false,
                desktop_mode: false,
                favicon_url: None,
                favicon_size: 0,
                thumbnail: None,
                identity: None,
                reader_enabled: false,
                feeds_enabled: false,
                background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
                history: SessionHistory::new(),
                destroyed: false,
                updated_at: now,
            }),
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn parent_id(&self) -> Option<TabId> {
        self.parent_id
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.data.read().updated_at
    }

    pub fn url(&self) -> Option<String> {
        self.data.read().url.clone()
    }

    pub fn title(&self) -> String {
        self.data.read().title.clone()
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> String {
        let data = self.data.read();
        if data.title.is_empty() {
            data.url.clone().unwrap_or_default()
        } else {
            data.title.clone()
        }
    }

    pub fn state(&self) -> LoadState {
        self.data.read().state
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    pub fn last_load_succeeded(&self) -> bool {
        self.data.read().last_load_succeeded
    }

    pub fn show_progress(&self) -> bool {
        self.data.read().show_progress
    }

    pub fn desktop_mode(&self) -> bool {
        self.data.read().desktop_mode
    }

    pub fn favicon_url(&self) -> Option<String> {
        self.data.read().favicon_url.clone()
    }

    pub fn thumbnail(&self) -> Option<String> {
        self.data.read().thumbnail.clone()
    }

    pub fn identity(&self) -> Option<SecurityIdentity> {
        self.data.read().identity.clone()
    }

    pub fn reader_enabled(&self) -> bool {
        self.data.read().reader_enabled
    }

    pub fn feeds_enabled(&self) -> bool {
        self.data.read().feeds_enabled
    }

    pub fn background_color(&self) -> String {
        self.data.read().background_color.clone()
    }

    pub fn history(&self) -> SessionHistory {
        self.data.read().history.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.data.read().destroyed
    }

    /// Attempt to transition to a new load state
    pub fn set_state(&self, new_state: LoadState) -> Result<()> {
        let mut data = self.data.write();
        Self::transition(self.id, &mut data, new_state)
    }

    fn transition(id: TabId, data: &mut TabData, new_state: LoadState) -> Result<()> {
        if data.destroyed {
            return Err(TabError::Destroyed(id));
        }

        if !data.state.can_transition_to(new_state) {
            return Err(TabError::InvalidTransition {
                from: data.state.to_string(),
                to: new_state.to_string(),
            });
        }

        tracing::debug!(
            tab_id = id,
            from = %data.state,
            to = %new_state,
            "Tab load state transition"
        );

        data.state = new_state;
        data.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the URL without touching any other page state.
    ///
    /// Used when the engine confirms an optimistically created tab.
    pub fn update_url(&self, url: Option<String>) {
        let mut data = self.data.write();
        data.url = url;
        data.updated_at = Utc::now();
    }

    /// Update page title. Returns whether it changed.
    pub fn update_title(&self, title: String) -> bool {
        let mut data = self.data.write();
        if data.title == title {
            return false;
        }
        data.title = title;
        data.updated_at = Utc::now();
        true
    }

    /// The tab committed a new location.
    ///
    /// A same-document navigation (fragment change, pushState) keeps the
    /// page-derived state; anything else resets it.
    pub fn handle_location_change(&self, url: String, same_document: bool) {
        let mut data = self.data.write();
        data.url = Some(url);
        if !same_document {
            data.favicon_url = None;
            data.favicon_size = 0;
            data.feeds_enabled = false;
            data.reader_enabled = false;
        }
        data.updated_at = Utc::now();
    }

    pub fn handle_document_start(&self, show_progress: bool, url: Option<String>) -> Result<()> {
        let mut data = self.data.write();
        Self::transition(self.id, &mut data, LoadState::Loading)?;
        data.show_progress = show_progress;
        data.identity = None;
        if url.is_some() {
            data.url = url;
        }
        Ok(())
    }

    pub fn handle_document_stop(&self, success: bool) -> Result<()> {
        let mut data = self.data.write();
        Self::transition(self.id, &mut data, LoadState::Stopped)?;
        data.last_load_succeeded = success;
        data.show_progress = false;
        Ok(())
    }

    pub fn handle_session_history(&self, command: HistoryCommand) -> Result<()> {
        let mut data = self.data.write();
        data.history.apply(command)?;
        data.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_desktop_mode(&self, enabled: bool) {
        let mut data = self.data.write();
        data.desktop_mode = enabled;
        data.updated_at = Utc::now();
    }

    /// Record a favicon advertised by the page, keeping the largest one seen.
    ///
    /// Returns whether the stored favicon changed.
    pub fn update_favicon_url(&self, href: String, size: u32) -> bool {
        let mut data = self.data.write();
        if data.favicon_url.is_some() && size < data.favicon_size {
            return false;
        }
        data.favicon_url = Some(href);
        data.favicon_size = size;
        data.updated_at = Utc::now();
        true
    }

    pub fn set_thumbnail(&self, thumbnail: Option<String>) {
        self.data.write().thumbnail = thumbnail;
    }

    pub fn update_identity(&self, identity: SecurityIdentity) {
        let mut data = self.data.write();
        data.identity = Some(identity);
        data.updated_at = Utc::now();
    }

    pub fn set_reader_enabled(&self, enabled: bool) {
        self.data.write().reader_enabled = enabled;
    }

    pub fn set_feeds_enabled(&self, enabled: bool) {
        self.data.write().feeds_enabled = enabled;
    }

    pub fn set_background_color(&self, color: Option<String>) {
        self.data.write().background_color =
            color.unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string());
    }

    /// Release page resources once the tab has left the registry.
    pub fn on_destroy(&self) {
        let mut data = self.data.write();
        data.destroyed = true;
        data.favicon_url = None;
        data.favicon_size = 0;
        data.thumbnail = None;
        tracing::debug!(tab_id = self.id, "Tab destroyed");
    }
}
