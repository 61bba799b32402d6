// Platform-neutral message types produced by the notification formatter.

use serde::{Deserialize, Serialize};

/// Most rich units the platform renders in one message.
pub const MAX_UNITS_PER_MESSAGE: usize = 5;

/// One rich notification card (an "embed") describing a single mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationUnit {
    pub title: String,
    pub description: String,
    /// Image shown on the card. Adult mods get a placeholder instead.
    pub thumbnail_url: Option<String>,
    /// Hex colour, e.g. `#fa8a43`.
    pub colour: String,
    pub icon_url: String,
    /// Mod page on the Nexus site.
    pub url: String,
}

/// One platform message: an optional text line plus up to
/// `MAX_UNITS_PER_MESSAGE` cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub units: Vec<NotificationUnit>,
}

/// A channel the bot can post to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: Option<String>,
}

impl ChannelHandle {
    /// Name for log lines, falling back to the raw id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
