use std::env;
use std::time::Duration;

use anyhow::Result;

use crate::error::FeedError;

/// Default Nexus Mods API base (v1 REST).
pub const DEFAULT_NEXUS_API_URL: &str = "https://api.nexusmods.com/v1";

/// Default chat platform REST base.
pub const DEFAULT_CHAT_API_URL: &str = "https://stoat.chat/api";

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token for the chat platform (BOT_TOKEN).
    pub bot_token: String,
    /// Nexus Mods personal API key (API_KEY).
    pub api_key: String,
    /// Default channel: receives `nimbusfeed ping` test messages (CHANNEL_ID).
    pub default_channel_id: String,
    pub db_path: String,
    /// PostgreSQL connection URL (when set and starts with postgres://, uses Postgres backend)
    pub database_url: Option<String>,
    pub nexus_api_url: String,
    pub chat_api_url: String,
    /// Minutes between sync cycles in `run` mode.
    pub sync_interval_minutes: u64,
    /// How many games may be fetched from Nexus at once.
    pub fetch_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Never fails on missing secrets: commands that only touch the
    /// database (`init`, `enable`, `feeds`, ...) don't need them. Call
    /// `require_bot()` before anything that talks to Nexus or the chat platform.
    pub fn load() -> Result<Self> {
        let sync_interval_minutes = match env::var("NIMBUS_SYNC_INTERVAL_MINUTES") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("NIMBUS_SYNC_INTERVAL_MINUTES must be a whole number, got {raw:?}")
            })?,
            Err(_) => 10,
        };

        let fetch_concurrency = match env::var("NIMBUS_FETCH_CONCURRENCY") {
            Ok(raw) => raw.parse::<usize>().map_err(|_| {
                anyhow::anyhow!("NIMBUS_FETCH_CONCURRENCY must be a whole number, got {raw:?}")
            })?,
            Err(_) => 4,
        };

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").unwrap_or_default(),
            api_key: env::var("API_KEY").unwrap_or_default(),
            default_channel_id: env::var("CHANNEL_ID").unwrap_or_default(),
            db_path: env::var("NIMBUS_DB_PATH").unwrap_or_else(|_| "./nimbusfeed.db".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            nexus_api_url: env::var("NEXUS_API_URL")
                .unwrap_or_else(|_| DEFAULT_NEXUS_API_URL.to_string()),
            chat_api_url: env::var("CHAT_API_URL")
                .unwrap_or_else(|_| DEFAULT_CHAT_API_URL.to_string()),
            sync_interval_minutes: sync_interval_minutes.max(1),
            fetch_concurrency: fetch_concurrency.max(1),
        })
    }

    /// Check that every secret the bot needs is present.
    ///
    /// Reports all missing variables at once so the operator can fix the
    /// .env file in one go.
    pub fn require_bot(&self) -> Result<()> {
        let missing: Vec<String> = [
            ("BOT_TOKEN", &self.bot_token),
            ("API_KEY", &self.api_key),
            ("CHANNEL_ID", &self.default_channel_id),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect();

        if !missing.is_empty() {
            return Err(FeedError::ConfigurationMissing(missing).into());
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_minutes * 60)
    }
}
