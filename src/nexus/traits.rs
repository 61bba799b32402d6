// Mod source trait: the seam between the pipeline and the Nexus API.
//
// Tests swap in scripted fakes so a sync cycle can run without network access.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Changelog, FetchedMod};

/// Upstream source of mod records.
#[async_trait]
pub trait ModSource: Send + Sync {
    /// The most recently updated mods for `game`, newest first, at most
    /// `RECENT_MODS_LIMIT` of them.
    async fn fetch_recent_mods(&self, game: &str) -> Result<Vec<FetchedMod>>;

    /// The changelog for one mod, in upstream order.
    async fn fetch_changelog(&self, game: &str, mod_id: u64) -> Result<Changelog>;
}

/// Nexus returns ten records from `latest_updated.json`; anything beyond
/// that is dropped so a changed upstream page size can't flood a channel.
pub const RECENT_MODS_LIMIT: usize = 10;
