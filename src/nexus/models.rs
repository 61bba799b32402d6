// Nexus Mods API payloads.
//
// Upstream records are untrusted: anything beyond the id and timestamps may
// be missing (hidden or removed mods come back with most fields stripped),
// so those fields are Options and the formatter decides what to do.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::models::SeenKey;

/// One entry from `latest_updated.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedMod {
    pub mod_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub uploaded_users_profile_url: Option<String>,
    pub created_timestamp: i64,
    pub updated_timestamp: i64,
    #[serde(default)]
    pub contains_adult_content: bool,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl FetchedMod {
    /// Nexus doesn't say whether a record is an update. A differing
    /// updated timestamp is the only signal we get.
    pub fn is_update(&self) -> bool {
        self.created_timestamp != self.updated_timestamp
    }

    /// Ledger identity for this exact state of the mod.
    pub fn seen_key(&self) -> SeenKey {
        SeenKey {
            mod_id: self.mod_id,
            version: self.version.clone(),
            updated_at: self.updated_timestamp,
        }
    }
}

/// A single changelog entry: version label plus its change text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub version: String,
    pub text: String,
}

/// A mod's changelog in the order Nexus returned it.
///
/// `changelogs.json` is a JSON object keyed by version. Object key order is
/// the only ordering Nexus gives us, so we keep it exactly rather than
/// letting a map type re-sort the keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    pub entries: Vec<ChangelogEntry>,
}

impl Changelog {
    /// The last entry in upstream order.
    pub fn latest(&self) -> Option<&ChangelogEntry> {
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Changelog values are usually a list of lines, occasionally a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChangelogText {
    Lines(Vec<Option<String>>),
    Single(Option<String>),
}

impl ChangelogText {
    fn into_text(self) -> String {
        match self {
            ChangelogText::Lines(lines) => lines
                .into_iter()
                .flatten()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            ChangelogText::Single(text) => text.unwrap_or_default().trim().to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for Changelog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChangelogVisitor;

        impl<'de> Visitor<'de> for ChangelogVisitor {
            type Value = Changelog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping version labels to changelog text")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Changelog, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((version, text)) = map.next_entry::<String, ChangelogText>()? {
                    entries.push(ChangelogEntry {
                        version,
                        text: text.into_text(),
                    });
                }
                Ok(Changelog { entries })
            }

            // Mods without a changelog come back as `[]`.
            fn visit_seq<A>(self, mut seq: A) -> Result<Changelog, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}
                Ok(Changelog::default())
            }
        }

        deserializer.deserialize_any(ChangelogVisitor)
    }
}
