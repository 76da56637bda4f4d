//! Engine message vocabulary
//!
//! Inbound messages arrive as an event name plus a JSON payload and are
//! decoded exactly once, here, into [`InboundMessage`]. Outbound commands
//! are typed [`OutboundMessage`] values that know their wire name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tabstrip_tabs::{HistoryCommand, SecurityIdentity, TabId};

use crate::error::BridgeError;

/// Wire value for "no parent tab"
pub const NO_PARENT: TabId = -1;

pub const STATE_START: u32 = 0x0000_0001;
pub const STATE_STOP: u32 = 0x0000_0010;
pub const STATE_IS_NETWORK: u32 = 0x0004_0000;

fn parent_from_wire(parent_id: TabId) -> Option<TabId> {
    (parent_id >= 0).then_some(parent_id)
}

fn no_parent() -> TabId {
    NO_PARENT
}

/// A stub only refreshes a tab that already exists, so the engine may send
/// it without the fields that describe a new tab.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabAdded {
    #[serde(rename = "tabID")]
    pub tab_id: TabId,
    pub uri: Option<String>,
    pub stub: bool,
    #[serde(default)]
    pub external: bool,
    #[serde(default = "no_parent")]
    pub parent_id: TabId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub delay_load: bool,
    #[serde(default)]
    pub desktop_mode: bool,
}

impl TabAdded {
    pub fn parent(&self) -> Option<TabId> {
        parent_from_wire(self.parent_id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    #[serde(rename = "tabID")]
    pub tab_id: TabId,
    pub state: u32,
    pub show_progress: Option<bool>,
    pub uri: Option<String>,
    pub success: Option<bool>,
}

impl StateChange {
    pub fn is_network_start(&self) -> bool {
        self.state & STATE_IS_NETWORK != 0 && self.state & STATE_START != 0
    }

    pub fn is_network_stop(&self) -> bool {
        self.state & STATE_IS_NETWORK != 0
            && self.state & STATE_START == 0
            && self.state & STATE_STOP != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    TabAdded(TabAdded),
    TabClose { tab_id: TabId },
    TabSelect { tab_id: TabId },
    LocationChange { tab_id: TabId, uri: String, same_document: bool },
    SecurityChange { tab_id: TabId, identity: SecurityIdentity },
    ReaderEnabled { tab_id: TabId },
    StateChange(StateChange),
    LoadError { tab_id: TabId },
    PageShow { tab_id: TabId },
    DomContentLoaded { tab_id: TabId, bg_color: Option<String> },
    TitleChanged { tab_id: TabId, title: String },
    LinkFavicon { tab_id: TabId, href: String, size: u32 },
    LinkFeed { tab_id: TabId },
    DesktopModeChanged { tab_id: TabId, desktop_mode: bool },
    RestoreEnd,
    SessionHistory { tab_id: TabId, command: HistoryCommand },
}

#[derive(Deserialize)]
struct TabRef {
    #[serde(rename = "tabID")]
    tab_id: TabId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationPayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    uri: String,
    #[serde(default)]
    same_document: bool,
}

#[derive(Deserialize)]
struct SecurityPayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    identity: SecurityIdentity,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentLoadedPayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    bg_color: Option<String>,
}

#[derive(Deserialize)]
struct TitlePayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    title: String,
}

#[derive(Deserialize)]
struct FaviconPayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    href: String,
    size: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DesktopModePayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    desktop_mode: bool,
}

#[derive(Deserialize)]
struct HistoryNewPayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    url: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct HistoryGotoPayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    index: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPurgePayload {
    #[serde(rename = "tabID")]
    tab_id: TabId,
    num_entries: usize,
}

fn parse<T: DeserializeOwned>(event: &str, payload: &Value) -> Result<T, BridgeError> {
    T::deserialize(payload).map_err(|source| BridgeError::Payload {
        event: event.to_string(),
        source,
    })
}

impl InboundMessage {
    pub fn decode(event: &str, payload: &Value) -> Result<Self, BridgeError> {
        let message = match event {
            "Session:RestoreEnd" => InboundMessage::RestoreEnd,
            "Tab:Added" => InboundMessage::TabAdded(parse(event, payload)?),
            "Tab:Close" => {
                let p: TabRef = parse(event, payload)?;
                InboundMessage::TabClose { tab_id: p.tab_id }
            }
            "Tab:Select" => {
                let p: TabRef = parse(event, payload)?;
                InboundMessage::TabSelect { tab_id: p.tab_id }
            }
            "Content:LocationChange" => {
                let p: LocationPayload = parse(event, payload)?;
                InboundMessage::LocationChange {
                    tab_id: p.tab_id,
                    uri: p.uri,
                    same_document: p.same_document,
                }
            }
            "Content:SecurityChange" => {
                let p: SecurityPayload = parse(event, payload)?;
                InboundMessage::SecurityChange {
                    tab_id: p.tab_id,
                    identity: p.identity,
                }
            }
            "Content:ReaderEnabled" => {
                let p: TabRef = parse(event, payload)?;
                InboundMessage::ReaderEnabled { tab_id: p.tab_id }
            }
            "Content:StateChange" => InboundMessage::StateChange(parse(event, payload)?),
            "Content:LoadError" => {
                let p: TabRef = parse(event, payload)?;
                InboundMessage::LoadError { tab_id: p.tab_id }
            }
            "Content:PageShow" => {
                let p: TabRef = parse(event, payload)?;
                InboundMessage::PageShow { tab_id: p.tab_id }
            }
            "DOMContentLoaded" => {
                let p: ContentLoadedPayload = parse(event, payload)?;
                InboundMessage::DomContentLoaded {
                    tab_id: p.tab_id,
                    bg_color: p.bg_color,
                }
            }
            "DOMTitleChanged" => {
                let p: TitlePayload = parse(event, payload)?;
                InboundMessage::TitleChanged {
                    tab_id: p.tab_id,
                    title: p.title,
                }
            }
            "Link:Favicon" => {
                let p: FaviconPayload = parse(event, payload)?;
                InboundMessage::LinkFavicon {
                    tab_id: p.tab_id,
                    href: p.href,
                    size: p.size,
                }
            }
            "Link:Feed" => {
                let p: TabRef = parse(event, payload)?;
                InboundMessage::LinkFeed { tab_id: p.tab_id }
            }
            "DesktopMode:Changed" => {
                let p: DesktopModePayload = parse(event, payload)?;
                InboundMessage::DesktopModeChanged {
                    tab_id: p.tab_id,
                    desktop_mode: p.desktop_mode,
                }
            }
            "SessionHistory:New" => {
                let p: HistoryNewPayload = parse(event, payload)?;
                InboundMessage::SessionHistory {
                    tab_id: p.tab_id,
                    command: HistoryCommand::New {
                        url: p.url,
                        title: p.title,
                    },
                }
            }
            "SessionHistory:Back" | "SessionHistory:Forward" => {
                let p: TabRef = parse(event, payload)?;
                let command = if event.ends_with("Back") {
                    HistoryCommand::Back
                } else {
                    HistoryCommand::Forward
                };
                InboundMessage::SessionHistory {
                    tab_id: p.tab_id,
                    command,
                }
            }
            "SessionHistory:Goto" => {
                let p: HistoryGotoPayload = parse(event, payload)?;
                InboundMessage::SessionHistory {
                    tab_id: p.tab_id,
                    command: HistoryCommand::Goto { index: p.index },
                }
            }
            "SessionHistory:Purge" => {
                let p: HistoryPurgePayload = parse(event, payload)?;
                InboundMessage::SessionHistory {
                    tab_id: p.tab_id,
                    command: HistoryCommand::Purge {
                        num_entries: p.num_entries,
                    },
                }
            }
            other => return Err(BridgeError::UnknownEvent(other.to_string())),
        };

        Ok(message)
    }

    /// Every message except `Session:RestoreEnd` targets one tab
    pub fn tab_id(&self) -> Option<TabId> {
        match self {
            InboundMessage::RestoreEnd => None,
            InboundMessage::TabAdded(added) => Some(added.tab_id),
            InboundMessage::StateChange(change) => Some(change.tab_id),
            InboundMessage::TabClose { tab_id }
            | InboundMessage::TabSelect { tab_id }
            | InboundMessage::LocationChange { tab_id, .. }
            | InboundMessage::SecurityChange { tab_id, .. }
            | InboundMessage::ReaderEnabled { tab_id }
            | InboundMessage::LoadError { tab_id }
            | InboundMessage::PageShow { tab_id }
            | InboundMessage::DomContentLoaded { tab_id, .. }
            | InboundMessage::TitleChanged { tab_id, .. }
            | InboundMessage::LinkFavicon { tab_id, .. }
            | InboundMessage::LinkFeed { tab_id }
            | InboundMessage::DesktopModeChanged { tab_id, .. }
            | InboundMessage::SessionHistory { tab_id, .. } => Some(*tab_id),
        }
    }
}

/// Payload of `Tab:Load`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    pub url: String,
    pub engine: Option<String>,
    pub parent_id: TabId,
    pub user_entered: bool,
    pub new_tab: bool,
    pub is_private: bool,
    pub pinned: bool,
    pub delay_load: bool,
    pub desktop_mode: bool,
    pub selected: bool,
    #[serde(rename = "tabID", skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Load(LoadRequest),
    Selected { tab_id: TabId },
    Closed { tab_id: TabId },
}

impl OutboundMessage {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundMessage::Load(_) => "Tab:Load",
            OutboundMessage::Selected { .. } => "Tab:Selected",
            OutboundMessage::Closed { .. } => "Tab:Closed",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            OutboundMessage::Load(request) => json!(request),
            OutboundMessage::Selected { tab_id } | OutboundMessage::Closed { tab_id } => {
                json!({ "tabID": tab_id })
            }
        }
    }
}
