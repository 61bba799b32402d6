// Storage traits: backend-agnostic async interface for all DB operations.
//
// Implementors: SqliteDatabase (wraps rusqlite), PgDatabase (wraps sqlx).
// All methods are async so both sync (rusqlite via Mutex) and native async
// (sqlx) backends fit behind a single interface.
//
// The subscription store and the seen-mod ledger are separate traits so the
// dedup engine only needs the ledger. `Database` bundles everything the CLI
// and the orchestrator hold as `Arc<dyn Database>`.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;

use super::models::{SeenKey, SeenMod};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Subscribe a channel to a game. Returns false if the channel already
    /// has a feed (for any game): one feed per channel.
    async fn add_subscription(&self, game_name: &str, channel_id: &str) -> Result<bool>;

    /// Remove the channel's feed. Returns false if it had none.
    async fn remove_subscription(&self, channel_id: &str) -> Result<bool>;

    /// The game a channel is subscribed to, if any.
    async fn subscription_for_channel(&self, channel_id: &str) -> Result<Option<String>>;

    /// All feeds grouped by game. Channel lists are sorted.
    async fn list_subscriptions_by_game(&self) -> Result<BTreeMap<String, Vec<String>>>;
}

#[async_trait]
pub trait SeenModLedger: Send + Sync {
    /// Every key already recorded for a game.
    async fn seen_keys(&self, game_name: &str) -> Result<HashSet<SeenKey>>;

    /// Record a key if it isn't there yet. Atomic: returns true only for
    /// the caller whose insert actually created the row. `mod_name` is
    /// informational and not part of the key.
    async fn try_insert_seen(
        &self,
        game_name: &str,
        key: &SeenKey,
        mod_name: Option<&str>,
    ) -> Result<bool>;

    /// Most recently recorded ledger rows, newest first.
    async fn recent_seen(&self, limit: u32) -> Result<Vec<SeenMod>>;

    /// Total rows in the ledger (for `status`).
    async fn seen_count(&self) -> Result<i64>;
}

#[async_trait]
pub trait Database: SubscriptionStore + SeenModLedger {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Scan state ---

    /// Get a scan state value by key (e.g., "last_sync_at").
    async fn get_scan_state(&self, key: &str) -> Result<Option<String>>;

    /// Set a scan state value (upsert).
    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()>;
}
