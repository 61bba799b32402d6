// Data models: Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use serde::{Deserialize, Serialize};

/// Identity of one notified state of a mod.
///
/// `version: None` is its own value: a mod with no version string is a
/// different key from one whose version is `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeenKey {
    pub mod_id: u64,
    pub version: Option<String>,
    pub updated_at: i64,
}

impl SeenKey {
    /// Split the version into the (has_version, version) column pair.
    ///
    /// NULLs never collide in a UNIQUE index, so the ledger stores absence
    /// as an explicit flag next to a non-null text column.
    pub fn version_columns(&self) -> (bool, &str) {
        match &self.version {
            Some(v) => (true, v.as_str()),
            None => (false, ""),
        }
    }

    /// Inverse of `version_columns`.
    pub fn from_columns(mod_id: i64, has_version: bool, version: String, updated_at: i64) -> Self {
        Self {
            mod_id: mod_id as u64,
            version: has_version.then_some(version),
            updated_at,
        }
    }
}

/// A ledger row, as shown by `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenMod {
    pub game_name: String,
    pub key: SeenKey,
    pub mod_name: Option<String>,
    pub seen_at: String,
}
