// Colored terminal output for the CLI: feed lists, cycle reports, ledger rows.

use std::collections::BTreeMap;

use colored::Colorize;

use crate::db::models::SeenMod;
use crate::pipeline::sync::{CycleReport, GameOutcome};

/// Display every feed grouped by game.
pub fn display_feed_list(feeds: &BTreeMap<String, Vec<String>>) {
    if feeds.is_empty() {
        println!("No feeds configured. Run `nimbusfeed enable <channel> <game>` to add one.");
        return;
    }

    let channel_total: usize = feeds.values().map(Vec::len).sum();
    println!(
        "\n{}",
        format!(
            "=== Feeds ({} games, {} channels) ===",
            feeds.len(),
            channel_total
        )
        .bold()
    );
    println!();

    for (game, channels) in feeds {
        println!("  {} {}", game.bold(), format!("({})", channels.len()).dimmed());
        for channel in channels {
            println!("    - {channel}");
        }
    }
    println!();
}

/// Display the outcome of one sync cycle, one line per game.
pub fn display_cycle_report(report: &CycleReport) {
    if report.games.is_empty() {
        println!("No feeds configured, nothing to sync.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Sync Report ({} games) ===", report.games.len()).bold()
    );
    println!();

    for game in &report.games {
        let label = format!("{:<24}", game.game);
        match &game.outcome {
            GameOutcome::NoNewMods => {
                println!("  {} {} {}", "-".dimmed(), label, "no new mods".dimmed());
            }
            GameOutcome::Delivered(d) => {
                let marker = if d.channel_failures.is_empty() {
                    "+".green()
                } else {
                    "!".yellow()
                };
                println!(
                    "  {} {} {} new, {} messages to {}/{} channels",
                    marker,
                    label,
                    d.new_mods,
                    d.messages,
                    d.channels_delivered,
                    game.channels
                );
                if d.discarded > 0 {
                    println!("      {} discarded (no name)", d.discarded);
                }
                if d.changelog_failures > 0 {
                    println!(
                        "      {} sent without changelog",
                        d.changelog_failures.to_string().yellow()
                    );
                }
                if d.channels_skipped > 0 {
                    println!("      {} channels not found", d.channels_skipped);
                }
                for failure in &d.channel_failures {
                    println!("      {}", failure.to_string().red());
                }
            }
            GameOutcome::Failed(err) => {
                println!("  {} {} {}", "x".red().bold(), label, err.to_string().red());
            }
        }
    }

    println!();
    let new_mods = report.new_mod_count();
    let failed = report.failed_game_count();
    if new_mods > 0 {
        println!("  {} {} new mods announced", "+".green(), new_mods);
    }
    if failed > 0 {
        println!("  {} {} games failed, will retry next cycle", "x".red(), failed);
    }
}

/// Display the most recently recorded mods.
pub fn display_recent_seen(rows: &[SeenMod]) {
    for row in rows {
        let version = row.key.version.as_deref().unwrap_or("-");
        let name = row.mod_name.as_deref().unwrap_or("(unnamed)");
        println!(
            "  {:<20} #{:<8} {:<32} v{:<10} {}",
            row.game_name,
            row.key.mod_id,
            super::truncate_chars(name, 32),
            version,
            row.seen_at.dimmed()
        );
    }
}
