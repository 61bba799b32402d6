// SqliteDatabase: rusqlite backend implementing the storage traits.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{SeenKey, SeenMod};
use super::traits::{Database, SeenModLedger, SubscriptionStore};

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Fresh in-memory database with the schema applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        super::schema::create_tables(&conn)?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl SubscriptionStore for SqliteDatabase {
    async fn add_subscription(&self, game_name: &str, channel_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::add_subscription(&conn, game_name, channel_id)
    }

    async fn remove_subscription(&self, channel_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::remove_subscription(&conn, channel_id)
    }

    async fn subscription_for_channel(&self, channel_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::subscription_for_channel(&conn, channel_id)
    }

    async fn list_subscriptions_by_game(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let conn = self.conn.lock().await;
        super::queries::list_subscriptions_by_game(&conn)
    }
}

#[async_trait]
impl SeenModLedger for SqliteDatabase {
    async fn seen_keys(&self, game_name: &str) -> Result<HashSet<SeenKey>> {
        let conn = self.conn.lock().await;
        super::queries::seen_keys(&conn, game_name)
    }

    async fn try_insert_seen(
        &self,
        game_name: &str,
        key: &SeenKey,
        mod_name: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::try_insert_seen(&conn, game_name, key, mod_name)
    }

    async fn recent_seen(&self, limit: u32) -> Result<Vec<SeenMod>> {
        let conn = self.conn.lock().await;
        super::queries::recent_seen(&conn, limit)
    }

    async fn seen_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::seen_count(&conn)
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_scan_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_scan_state(&conn, key)
    }

    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_scan_state(&conn, key, value)
    }
}
