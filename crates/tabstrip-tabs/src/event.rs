//! Tab change events delivered to registry observers

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabEvent {
    Closed,
    Start,
    Loaded,
    LoadError,
    Stop,
    Favicon,
    Thumbnail,
    Title,
    Selected,
    Unselected,
    Added,
    /// Session restore finished; carries no tab
    Restored,
    LocationChange,
    MenuUpdated,
    PageShow,
    LinkFavicon,
    LinkFeed,
    SecurityChange,
    ReaderEnabled,
    DesktopModeChange,
}

impl TabEvent {
    /// Events after which the ordered tab list should be written out.
    ///
    /// Adding or closing a tab always selects/unselects one, so SELECTED
    /// covers those too.
    pub fn schedules_persist(&self) -> bool {
        matches!(self, TabEvent::LocationChange | TabEvent::Selected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabEvent::Closed => "CLOSED",
            TabEvent::Start => "START",
            TabEvent::Loaded => "LOADED",
            TabEvent::LoadError => "LOAD_ERROR",
            TabEvent::Stop => "STOP",
            TabEvent::Favicon => "FAVICON",
            TabEvent::Thumbnail => "THUMBNAIL",
            TabEvent::Title => "TITLE",
            TabEvent::Selected => "SELECTED",
            TabEvent::Unselected => "UNSELECTED",
            TabEvent::Added => "ADDED",
            TabEvent::Restored => "RESTORED",
            TabEvent::LocationChange => "LOCATION_CHANGE",
            TabEvent::MenuUpdated => "MENU_UPDATED",
            TabEvent::PageShow => "PAGE_SHOW",
            TabEvent::LinkFavicon => "LINK_FAVICON",
            TabEvent::LinkFeed => "LINK_FEED",
            TabEvent::SecurityChange => "SECURITY_CHANGE",
            TabEvent::ReaderEnabled => "READER_ENABLED",
            TabEvent::DesktopModeChange => "DESKTOP_MODE_CHANGE",
        }
    }
}

impl std::fmt::Display for TabEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
