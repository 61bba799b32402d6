// Reconciliation: decide which fetched mods are genuinely new.
//
// A mod is new when its (mod_id, version, updated_at) key is not in the
// ledger for its game. Presence in the pre-loaded key set is only a fast
// path; the atomic insert is what decides. Two cycles racing on the same
// key both try to insert, exactly one sees an affected row, and only that
// one announces the mod.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::db::SeenModLedger;
use crate::nexus::models::FetchedMod;

/// Return the subset of `fetched` that was newly recorded, in input order.
///
/// Fails only if the game's existing keys can't be loaded. A failed insert
/// for one mod is logged and that mod left out, so the next cycle sees it
/// as unrecorded and tries again.
pub async fn reconcile<L>(ledger: &L, game: &str, fetched: &[FetchedMod]) -> Result<Vec<FetchedMod>>
where
    L: SeenModLedger + ?Sized,
{
    let existing = ledger
        .seen_keys(game)
        .await
        .with_context(|| format!("Failed to load seen mods for {game}"))?;

    let mut new_mods = Vec::new();

    for m in fetched {
        let key = m.seen_key();
        if existing.contains(&key) {
            continue;
        }

        match ledger.try_insert_seen(game, &key, m.name.as_deref()).await {
            Ok(true) => {
                info!(game = game, mod_id = m.mod_id, version = ?m.version, "Recorded new mod state");
                new_mods.push(m.clone());
            }
            Ok(false) => {
                // Someone else recorded it between our read and our insert,
                // or the same key appeared twice in this fetch.
                debug!(game = game, mod_id = m.mod_id, "Mod state already recorded, skipping");
            }
            Err(e) => {
                warn!(
                    game = game,
                    mod_id = m.mod_id,
                    error = %e,
                    "Failed to record mod state, will retry next cycle"
                );
            }
        }
    }

    Ok(new_mods)
}
