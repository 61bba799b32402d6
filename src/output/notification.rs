// Notification formatter: turns newly seen mods into chat messages.
//
// One card per mod. Updates get the latest changelog entry appended, adult
// mods get a notice and a placeholder image, and cards are packed five to a
// message with the summary line on the first message only.

use tracing::{debug, warn};

use crate::chat::models::{NotificationUnit, OutgoingMessage, MAX_UNITS_PER_MESSAGE};
use crate::nexus::models::{ChangelogEntry, FetchedMod};
use crate::nexus::traits::ModSource;

use super::truncate_chars;

pub const EMBED_COLOUR: &str = "#fa8a43";
pub const EMBED_ICON_URL: &str = "https://i.imgur.com/6uCNdws.png";
/// Shown instead of the mod's own picture when it's flagged adult.
pub const ADULT_PLACEHOLDER_THUMBNAIL: &str = "https://i.ibb.co/yBsNLDNs/mambo.png";
pub const ADULT_CONTENT_NOTICE: &str = "(Contains Adult Content)";

/// Longest changelog excerpt put on a card.
pub const CHANGELOG_MAX_CHARS: usize = 1000;
/// Card titles longer than this are cut (the platform rejects >100).
pub const TITLE_MAX_CHARS: usize = 97;

/// Messages for one game in one cycle, ready to send to every subscriber.
#[derive(Debug, Clone, Default)]
pub struct FormattedBatch {
    pub messages: Vec<OutgoingMessage>,
    /// Cards across all messages.
    pub unit_count: usize,
    /// Mods dropped because upstream sent no name.
    pub discarded: usize,
    /// Updates that went out without a changelog because the fetch failed.
    pub changelog_failures: usize,
}

impl FormattedBatch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Format a game's new mods, fetching changelogs for updates.
///
/// A failed changelog fetch only affects that one mod: it is still
/// announced, just without the changelog section.
pub async fn format_new_mods(
    source: &dyn ModSource,
    game: &str,
    new_mods: &[FetchedMod],
) -> FormattedBatch {
    let mut batch = FormattedBatch::default();
    let mut kept: Vec<(&FetchedMod, NotificationUnit)> = Vec::new();

    for m in new_mods {
        if !is_presentable(m) {
            debug!(game = game, mod_id = m.mod_id, "Discarding mod with missing name");
            batch.discarded += 1;
            continue;
        }

        let changelog = if m.is_update() {
            match source.fetch_changelog(game, m.mod_id).await {
                Ok(log) => log.latest().cloned(),
                Err(e) => {
                    warn!(
                        game = game,
                        mod_id = m.mod_id,
                        error = %e,
                        "Changelog fetch failed, announcing without it"
                    );
                    batch.changelog_failures += 1;
                    None
                }
            }
        } else {
            None
        };

        if let Some(unit) = render_unit(m, game, changelog.as_ref()) {
            kept.push((m, unit));
        }
    }

    if kept.is_empty() {
        return batch;
    }

    let kept_mods: Vec<&FetchedMod> = kept.iter().map(|(m, _)| *m).collect();
    let summary = summary_line(&kept_mods);
    let units: Vec<NotificationUnit> = kept.into_iter().map(|(_, unit)| unit).collect();

    batch.unit_count = units.len();
    batch.messages = pack_messages(summary, units);
    batch
}

/// A card needs a title. The body always has at least the author line, so a
/// missing summary only leaves that part blank.
fn is_presentable(m: &FetchedMod) -> bool {
    m.name.is_some()
}

/// Build the card for one mod. Returns None when the record has no name.
pub fn render_unit(
    m: &FetchedMod,
    game: &str,
    changelog: Option<&ChangelogEntry>,
) -> Option<NotificationUnit> {
    let name = m.name.as_deref()?;
    let mut description = m.summary.clone().unwrap_or_default();

    if m.contains_adult_content {
        description.push_str("\n\n");
        description.push_str(ADULT_CONTENT_NOTICE);
    }

    if m.is_update() {
        if let Some(entry) = changelog {
            description.push_str(&format!(
                "\n\n**Changelog (v{}):**\n{}",
                entry.version,
                truncate_chars(&entry.text, CHANGELOG_MAX_CHARS)
            ));
        }
    }

    let author = m.author.as_deref().unwrap_or("Unknown");
    let uploader = match (&m.uploaded_by, &m.uploaded_users_profile_url) {
        (Some(name), Some(url)) => format!("[{name}]({url})"),
        (Some(name), None) => name.clone(),
        (None, _) => "Unknown".to_string(),
    };
    description.push_str(&format!(
        "\n\n**Author:** {author} | **Uploader:** {uploader}\n\n{game} | <t:{}:f>",
        m.updated_timestamp
    ));

    let thumbnail_url = if m.contains_adult_content {
        Some(ADULT_PLACEHOLDER_THUMBNAIL.to_string())
    } else {
        m.picture_url.clone()
    };

    Some(NotificationUnit {
        title: truncate_chars(name, TITLE_MAX_CHARS),
        description: description.trim_start_matches('\n').to_string(),
        thumbnail_url,
        colour: EMBED_COLOUR.to_string(),
        icon_url: EMBED_ICON_URL.to_string(),
        url: mod_url(game, m.mod_id),
    })
}

/// Nexus site page for a mod.
pub fn mod_url(game: &str, mod_id: u64) -> String {
    format!("https://www.nexusmods.com/{game}/mods/{mod_id}")
}

/// Heading for a batch, based on what kinds of mods it announces.
pub fn summary_line(mods: &[&FetchedMod]) -> &'static str {
    let has_update = mods.iter().any(|m| m.is_update());
    let has_upload = mods.iter().any(|m| !m.is_update());

    if mods.len() > 1 {
        match (has_update, has_upload) {
            (true, true) => "New Mod Uploads/Updates:",
            (true, false) => "New Mod Updates:",
            _ => "New Mod Uploads:",
        }
    } else if has_update {
        "New Mod Update:"
    } else {
        "New Mod Upload:"
    }
}

/// Split cards into platform messages. Only the first carries the summary.
pub fn pack_messages(summary: &str, units: Vec<NotificationUnit>) -> Vec<OutgoingMessage> {
    units
        .chunks(MAX_UNITS_PER_MESSAGE)
        .enumerate()
        .map(|(i, chunk)| OutgoingMessage {
            content: (i == 0).then(|| summary.to_string()),
            units: chunk.to_vec(),
        })
        .collect()
}
