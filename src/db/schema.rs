// Database schema: table creation.
//
// A `schema_version` table records the applied schema version so a later
// release can migrate from it. Everything currently lives in version 1.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent: safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Feeds: one row per subscribed channel
        CREATE TABLE IF NOT EXISTS tracked_channels (
            channel_id TEXT PRIMARY KEY,       -- one feed per channel
            game_name TEXT NOT NULL,           -- Nexus game domain, e.g. skyrimspecialedition
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Seen-mod ledger: every mod state we've already announced
        CREATE TABLE IF NOT EXISTS recent_mods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_name TEXT NOT NULL,
            mod_id INTEGER NOT NULL,
            has_version INTEGER NOT NULL,      -- 0 when upstream sent no version
            version TEXT NOT NULL DEFAULT '',
            updated_at INTEGER NOT NULL,       -- Nexus updated_timestamp (unix seconds)
            mod_name TEXT,                     -- for `status`; not part of the key
            seen_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (game_name, mod_id, has_version, version, updated_at)
        );

        -- Scan state: last sync timestamp and similar bookkeeping
        CREATE TABLE IF NOT EXISTS scan_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Index for grouping feeds by game
        CREATE INDEX IF NOT EXISTS idx_channels_game
            ON tracked_channels(game_name);

        -- Index for loading a game's ledger keys
        CREATE INDEX IF NOT EXISTS idx_recent_mods_game
            ON recent_mods(game_name);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
