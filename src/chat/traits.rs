// Chat platform trait: delivery capability injected into the orchestrator.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{ChannelHandle, OutgoingMessage};

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Resolve a channel id to something we can send to.
    ///
    /// `Ok(None)` means the platform doesn't know the channel (deleted, or
    /// the bot was removed from the server). Errors are transport failures.
    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<ChannelHandle>>;

    /// Post one message to a resolved channel.
    async fn send_message(&self, channel: &ChannelHandle, message: &OutgoingMessage) -> Result<()>;
}
