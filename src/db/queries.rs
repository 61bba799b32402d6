// Database queries: CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{SeenKey, SeenMod};

// --- Scan state ---

/// Get a scan state value by key (e.g., "last_sync_at").
pub fn get_scan_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM scan_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a scan state value (upsert).
pub fn set_scan_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Subscriptions ---

/// Add a feed. The channel_id primary key enforces one feed per channel;
/// a second enable for the same channel affects zero rows.
pub fn add_subscription(conn: &Connection, game_name: &str, channel_id: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO tracked_channels (channel_id, game_name) VALUES (?1, ?2)",
        params![channel_id, game_name],
    )?;
    Ok(inserted == 1)
}

/// Remove a channel's feed.
pub fn remove_subscription(conn: &Connection, channel_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM tracked_channels WHERE channel_id = ?1",
        params![channel_id],
    )?;
    Ok(deleted == 1)
}

/// Look up which game a channel follows.
pub fn subscription_for_channel(conn: &Connection, channel_id: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT game_name FROM tracked_channels WHERE channel_id = ?1")?;
    let result = stmt
        .query_row(params![channel_id], |row| row.get(0))
        .optional()?;
    Ok(result)
}

/// All feeds grouped by game, both levels sorted.
pub fn list_subscriptions_by_game(conn: &Connection) -> Result<BTreeMap<String, Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT game_name, channel_id FROM tracked_channels ORDER BY game_name, channel_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        let (game, channel) = row?;
        grouped.entry(game).or_default().push(channel);
    }
    Ok(grouped)
}

// --- Seen-mod ledger ---

/// Load every recorded key for a game.
pub fn seen_keys(conn: &Connection, game_name: &str) -> Result<HashSet<SeenKey>> {
    let mut stmt = conn.prepare(
        "SELECT mod_id, has_version, version, updated_at FROM recent_mods WHERE game_name = ?1",
    )?;
    let rows = stmt.query_map(params![game_name], |row| {
        Ok(SeenKey::from_columns(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
        ))
    })?;

    let mut keys = HashSet::new();
    for row in rows {
        keys.insert(row?);
    }
    Ok(keys)
}

/// Insert a ledger row unless the key already exists.
///
/// `INSERT OR IGNORE` against the UNIQUE constraint is the race guard:
/// whichever writer gets there first sees one affected row, everyone
/// else sees zero.
pub fn try_insert_seen(
    conn: &Connection,
    game_name: &str,
    key: &SeenKey,
    mod_name: Option<&str>,
) -> Result<bool> {
    let (has_version, version) = key.version_columns();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO recent_mods (game_name, mod_id, has_version, version, updated_at, mod_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            game_name,
            key.mod_id as i64,
            has_version,
            version,
            key.updated_at,
            mod_name
        ],
    )?;
    Ok(inserted == 1)
}

/// Newest ledger rows first.
pub fn recent_seen(conn: &Connection, limit: u32) -> Result<Vec<SeenMod>> {
    let mut stmt = conn.prepare(
        "SELECT game_name, mod_id, has_version, version, updated_at, mod_name, seen_at
         FROM recent_mods
         ORDER BY id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(SeenMod {
            game_name: row.get(0)?,
            key: SeenKey::from_columns(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
            mod_name: row.get(5)?,
            seen_at: row.get(6)?,
        })
    })?;

    let mut seen = Vec::new();
    for row in rows {
        seen.push(row?);
    }
    Ok(seen)
}

/// Total ledger rows.
pub fn seen_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM recent_mods", [], |row| row.get(0))?;
    Ok(count)
}
