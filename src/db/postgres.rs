// PgDatabase: PostgreSQL backend implementing the storage traits.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.
//
// Key differences from SQLite:
// - TIMESTAMPTZ instead of TEXT for timestamps
// - BOOLEAN for has_version
// - $1/$2 parameter syntax (handled by sqlx)
// - ON CONFLICT DO NOTHING instead of INSERT OR IGNORE

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx_core::pool::Pool;
use sqlx_core::row::Row;
use sqlx_postgres::Postgres;

use super::models::{SeenKey, SeenMod};
use super::traits::{Database, SeenModLedger, SubscriptionStore};

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect to PostgreSQL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations.
    ///
    /// Holds a session-level advisory lock on a dedicated connection for the
    /// whole sequence so two processes starting together don't both apply
    /// the same migration. The unlock always runs, even if a migration fails.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "NIMBUSFD" as a big-endian i64.
        const MIGRATION_LOCK_KEY: i64 = 0x4E494D4255534644_u64 as i64;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [(
                1,
                include_str!("../../migrations/postgres/0001_initial.sql"),
            )];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .unwrap_or(false);

                if !applied {
                    // Each migration records its own schema_version row, so
                    // the DDL and the bookkeeping commit together.
                    let mut tx = self.pool.begin().await?;
                    sqlx_core::raw_sql::raw_sql(sql).execute(&mut *tx).await?;
                    tx.commit().await?;
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        // Migration error takes priority over unlock error.
        migration_result?;
        unlock_result?;

        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for PgDatabase {
    async fn add_subscription(&self, game_name: &str, channel_id: &str) -> Result<bool> {
        let result = sqlx_core::query::query(
            "INSERT INTO tracked_channels (channel_id, game_name)
             VALUES ($1, $2)
             ON CONFLICT (channel_id) DO NOTHING",
        )
        .bind(channel_id)
        .bind(game_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_subscription(&self, channel_id: &str) -> Result<bool> {
        let result = sqlx_core::query::query("DELETE FROM tracked_channels WHERE channel_id = $1")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn subscription_for_channel(&self, channel_id: &str) -> Result<Option<String>> {
        let row =
            sqlx_core::query::query("SELECT game_name FROM tracked_channels WHERE channel_id = $1")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn list_subscriptions_by_game(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let rows = sqlx_core::query::query(
            "SELECT game_name, channel_id FROM tracked_channels ORDER BY game_name, channel_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.get::<String, _>(0))
                .or_default()
                .push(row.get::<String, _>(1));
        }
        Ok(grouped)
    }
}

#[async_trait]
impl SeenModLedger for PgDatabase {
    async fn seen_keys(&self, game_name: &str) -> Result<HashSet<SeenKey>> {
        let rows = sqlx_core::query::query(
            "SELECT mod_id, has_version, version, updated_at FROM recent_mods WHERE game_name = $1",
        )
        .bind(game_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                SeenKey::from_columns(
                    r.get::<i64, _>(0),
                    r.get::<bool, _>(1),
                    r.get::<String, _>(2),
                    r.get::<i64, _>(3),
                )
            })
            .collect())
    }

    async fn try_insert_seen(
        &self,
        game_name: &str,
        key: &SeenKey,
        mod_name: Option<&str>,
    ) -> Result<bool> {
        let (has_version, version) = key.version_columns();
        let result = sqlx_core::query::query(
            "INSERT INTO recent_mods (game_name, mod_id, has_version, version, updated_at, mod_name)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT DO NOTHING",
        )
        .bind(game_name)
        .bind(i64::try_from(key.mod_id).context("mod_id exceeds i64 range")?)
        .bind(has_version)
        .bind(version)
        .bind(key.updated_at)
        .bind(mod_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn recent_seen(&self, limit: u32) -> Result<Vec<SeenMod>> {
        let rows = sqlx_core::query::query(
            "SELECT game_name, mod_id, has_version, version, updated_at, mod_name,
                    to_char(seen_at, 'YYYY-MM-DD HH24:MI:SS') AS seen_at
             FROM recent_mods
             ORDER BY id DESC
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| SeenMod {
                game_name: r.get::<String, _>(0),
                key: SeenKey::from_columns(
                    r.get::<i64, _>(1),
                    r.get::<bool, _>(2),
                    r.get::<String, _>(3),
                    r.get::<i64, _>(4),
                ),
                mod_name: r.get::<Option<String>, _>(5),
                seen_at: r.get::<String, _>(6),
            })
            .collect())
    }

    async fn seen_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query("SELECT COUNT(*)::bigint FROM recent_mods")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn table_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query(
            "SELECT COUNT(*)::bigint FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn get_scan_state(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx_core::query::query("SELECT value FROM scan_state WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()> {
        sqlx_core::query::query(
            "INSERT INTO scan_state (key, value, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT(key) DO UPDATE SET value = $2, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
