// System status display: DB location and size, feed counts, ledger size,
// last sync time, most recent announcements.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::db::{Database, SeenModLedger, SubscriptionStore};
use crate::output::terminal;
use crate::pipeline::sync::LAST_SYNC_KEY;

const RECENT_ROWS: u32 = 5;

/// Display system status to the terminal.
///
/// `db_display_path` is the SQLite file path, or the redacted URL when
/// running against Postgres (`is_file` false skips the size check).
pub async fn show(db: &Arc<dyn Database>, db_display_path: &str, is_file: bool) -> Result<()> {
    if is_file {
        if !Path::new(db_display_path).exists() {
            println!("Database: not initialized");
            println!("\nRun `nimbusfeed init` to set up the database.");
            return Ok(());
        }

        let file_size = std::fs::metadata(db_display_path)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        println!("Database: {} ({})", db_display_path, file_size);
    } else {
        println!("Database: {}", db_display_path);
    }

    let feeds = db.list_subscriptions_by_game().await?;
    let channel_total: usize = feeds.values().map(Vec::len).sum();
    if feeds.is_empty() {
        println!("Feeds: none configured");
        println!("  Run `nimbusfeed enable <channel> <game>` to add one");
    } else {
        println!("Feeds: {} channels across {} games", channel_total, feeds.len());
        for (game, channels) in &feeds {
            println!("  {}: {}", game, channels.len());
        }
    }

    match db.get_scan_state(LAST_SYNC_KEY).await? {
        Some(at) => println!("Last sync: {}", at),
        None => {
            println!("Last sync: never");
            println!("  Run `nimbusfeed sync` or `nimbusfeed run`");
        }
    }

    let seen = db.seen_count().await?;
    println!("Mods recorded: {}", seen);

    let recent = db.recent_seen(RECENT_ROWS).await?;
    if !recent.is_empty() {
        println!("Most recent:");
        terminal::display_recent_seen(&recent);
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
