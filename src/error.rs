// Failure taxonomy for the sync pipeline.
//
// Internals propagate `anyhow::Error` with context. The orchestrator
// classifies failures into a FeedError at the game/channel boundary so the
// cycle report says which stage broke and for whom.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The mod source API returned a non-success status or a payload we
    /// couldn't parse.
    #[error("mod source unavailable for {game}: {reason}")]
    SourceUnavailable { game: String, reason: String },

    /// A subscription or ledger operation failed.
    #[error("storage unavailable ({context}): {reason}")]
    StorageUnavailable { context: String, reason: String },

    /// A channel could not be resolved or a send to it failed.
    #[error("delivery to channel {channel_id} failed: {reason}")]
    DeliveryFailure { channel_id: String, reason: String },

    /// Required environment variables are missing. Fatal at startup.
    #[error(
        "missing required configuration: {}. Add them to your .env file (see .env.example).",
        .0.join(", ")
    )]
    ConfigurationMissing(Vec<String>),
}

impl FeedError {
    pub fn source_unavailable(game: &str, err: &anyhow::Error) -> Self {
        FeedError::SourceUnavailable {
            game: game.to_string(),
            reason: format!("{err:#}"),
        }
    }

    pub fn storage_unavailable(context: impl Into<String>, err: &anyhow::Error) -> Self {
        FeedError::StorageUnavailable {
            context: context.into(),
            reason: format!("{err:#}"),
        }
    }

    pub fn delivery_failure(channel_id: &str, err: &anyhow::Error) -> Self {
        FeedError::DeliveryFailure {
            channel_id: channel_id.to_string(),
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_missing_lists_every_variable() {
        let err = FeedError::ConfigurationMissing(vec![
            "BOT_TOKEN".to_string(),
            "API_KEY".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("BOT_TOKEN, API_KEY"), "got: {msg}");
    }

    #[test]
    fn source_unavailable_keeps_context_chain() {
        let inner = anyhow::anyhow!("HTTP 500").context("Nexus request failed");
        let err = FeedError::source_unavailable("skyrimspecialedition", &inner);
        let msg = err.to_string();
        assert!(msg.contains("skyrimspecialedition"));
        assert!(msg.contains("Nexus request failed: HTTP 500"), "got: {msg}");
    }
}
