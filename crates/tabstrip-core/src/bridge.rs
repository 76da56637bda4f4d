//! Engine message bridge
//!
//! Turns named engine messages into registry operations and per-tab
//! updates. A bad message is logged and dropped; it never affects other
//! tabs or later messages.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use tabstrip_tabs::{LoadState, Tab, TabEvent};

use crate::error::BridgeError;
use crate::fanout::EventData;
use crate::message::{InboundMessage, OutboundMessage, StateChange, TabAdded};
use crate::registry::TabRegistry;

/// Outbound side of the engine connection.
///
/// The registry sends while holding its lock, so implementations must not
/// call back into the registry.
pub trait EngineChannel: Send + Sync {
    fn send(&self, message: OutboundMessage);
}

impl EngineChannel for mpsc::UnboundedSender<OutboundMessage> {
    fn send(&self, message: OutboundMessage) {
        if let Err(e) = mpsc::UnboundedSender::send(self, message) {
            tracing::warn!(event = e.0.name(), "Engine channel closed, dropping message");
        }
    }
}

pub struct EventBridge {
    registry: TabRegistry,
}

impl EventBridge {
    pub fn new(registry: TabRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    /// Entry point for the engine's message listener
    pub fn handle_message(&self, event: &str, payload: &Value) {
        let outcome = InboundMessage::decode(event, payload).and_then(|message| self.dispatch(message));
        if let Err(e) = outcome {
            tracing::warn!(event, error = %e, "Dropped engine message");
        }
    }

    /// Same as [`EventBridge::handle_message`] for a raw JSON payload
    pub fn handle_json(&self, event: &str, raw: &str) {
        match serde_json::from_str::<Value>(raw) {
            Ok(payload) => self.handle_message(event, &payload),
            Err(source) => {
                let e = BridgeError::Payload {
                    event: event.to_string(),
                    source,
                };
                tracing::warn!(event, error = %e, "Dropped engine message");
            }
        }
    }

    pub fn dispatch(&self, message: InboundMessage) -> Result<(), BridgeError> {
        let message = match message {
            InboundMessage::RestoreEnd => {
                self.registry
                    .notify_listeners(None, TabEvent::Restored, EventData::None);
                return Ok(());
            }
            InboundMessage::TabAdded(added) => return self.tab_added(added),
            other => other,
        };

        let Some(tab_id) = message.tab_id() else {
            return Ok(());
        };

        // Already closed on our side
        let Some(tab) = self.registry.get_tab(tab_id) else {
            tracing::debug!(tab_id, "Message for unknown tab dropped");
            return Ok(());
        };

        match message {
            InboundMessage::TabClose { .. } => self.registry.close_tab(&tab),
            InboundMessage::TabSelect { .. } => {
                self.registry.select_tab(tab_id);
            }
            InboundMessage::LocationChange {
                uri, same_document, ..
            } => {
                tab.handle_location_change(uri, same_document);
                self.notify(&tab, TabEvent::LocationChange);
            }
            InboundMessage::SecurityChange { identity, .. } => {
                tab.update_identity(identity);
                self.notify(&tab, TabEvent::SecurityChange);
            }
            InboundMessage::ReaderEnabled { .. } => {
                tab.set_reader_enabled(true);
                self.notify(&tab, TabEvent::ReaderEnabled);
            }
            InboundMessage::StateChange(change) => self.state_change(&tab, change)?,
            InboundMessage::LoadError { .. } => self.notify(&tab, TabEvent::LoadError),
            InboundMessage::PageShow { .. } => self.notify(&tab, TabEvent::PageShow),
            InboundMessage::DomContentLoaded { bg_color, .. } => {
                tab.set_background_color(bg_color);
                self.notify(&tab, TabEvent::Loaded);
            }
            InboundMessage::TitleChanged { title, .. } => {
                if tab.update_title(title) {
                    self.notify(&tab, TabEvent::Title);
                }
            }
            InboundMessage::LinkFavicon { href, size, .. } => {
                tab.update_favicon_url(href, size);
                self.notify(&tab, TabEvent::LinkFavicon);
            }
            InboundMessage::LinkFeed { .. } => {
                tab.set_feeds_enabled(true);
                self.notify(&tab, TabEvent::LinkFeed);
            }
            InboundMessage::DesktopModeChanged { desktop_mode, .. } => {
                tab.set_desktop_mode(desktop_mode);
                self.notify(&tab, TabEvent::DesktopModeChange);
            }
            InboundMessage::SessionHistory { command, .. } => {
                tab.handle_session_history(command)?;
            }
            InboundMessage::RestoreEnd | InboundMessage::TabAdded(_) => {}
        }

        Ok(())
    }

    fn tab_added(&self, added: TabAdded) -> Result<(), BridgeError> {
        let existing = self.registry.get_tab(added.tab_id);

        let tab = if added.stub {
            // Confirms a tab we created optimistically
            let Some(tab) = existing else {
                tracing::debug!(tab_id = added.tab_id, "Stub for closed tab dropped");
                return Ok(());
            };
            tab.update_url(added.uri.clone());
            tab
        } else {
            self.registry.add_tab(
                added.tab_id,
                added.uri.clone(),
                added.external,
                added.parent(),
                added.title.clone(),
                added.is_private,
            )
        };

        if added.desktop_mode {
            tab.set_desktop_mode(true);
        }
        if added.selected {
            self.registry.select_tab(tab.id());
        }
        // Last: a tab that already started loading refuses Delayed
        if added.delay_load {
            tab.set_state(LoadState::Delayed)?;
        }

        Ok(())
    }

    fn state_change(&self, tab: &Arc<Tab>, change: StateChange) -> Result<(), BridgeError> {
        const EVENT: &str = "Content:StateChange";

        if change.is_network_start() {
            let show_progress = change.show_progress.ok_or(BridgeError::MissingField {
                event: EVENT,
                field: "showProgress",
            })?;
            tab.handle_document_start(show_progress, change.uri)?;
            self.registry.notify_listeners(
                Some(Arc::clone(tab)),
                TabEvent::Start,
                EventData::ShowProgress(show_progress),
            );
        } else if change.is_network_stop() {
            let success = change.success.ok_or(BridgeError::MissingField {
                event: EVENT,
                field: "success",
            })?;
            tab.handle_document_stop(success)?;
            self.notify(tab, TabEvent::Stop);
        }

        Ok(())
    }

    fn notify(&self, tab: &Arc<Tab>, event: TabEvent) {
        self.registry
            .notify_listeners(Some(Arc::clone(tab)), event, EventData::None);
    }
}
