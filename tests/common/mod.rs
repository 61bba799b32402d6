// Shared fakes for integration tests: a scripted mod source and a
// recording chat platform. No network access.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use nimbusfeed::chat::models::{ChannelHandle, OutgoingMessage};
use nimbusfeed::chat::traits::ChatPlatform;
use nimbusfeed::nexus::models::{Changelog, ChangelogEntry, FetchedMod};
use nimbusfeed::nexus::traits::ModSource;

/// Builder-style constructor for a fetched mod record.
pub fn mod_record(mod_id: u64) -> FetchedMod {
    FetchedMod {
        mod_id,
        name: Some(format!("Mod {mod_id}")),
        summary: Some(format!("Summary of mod {mod_id}")),
        author: Some("Author".to_string()),
        uploaded_by: Some("uploader".to_string()),
        uploaded_users_profile_url: Some("https://www.nexusmods.com/users/1".to_string()),
        created_timestamp: 1_700_000_000,
        updated_timestamp: 1_700_000_000,
        contains_adult_content: false,
        picture_url: Some(format!("https://staticdelivery.nexusmods.com/{mod_id}.png")),
        version: Some("1.0".to_string()),
    }
}

/// A mod whose updated timestamp differs from its created one.
pub fn updated_record(mod_id: u64) -> FetchedMod {
    FetchedMod {
        updated_timestamp: 1_700_100_000,
        version: Some("1.1".to_string()),
        ..mod_record(mod_id)
    }
}

pub fn changelog(entries: &[(&str, &str)]) -> Changelog {
    Changelog {
        entries: entries
            .iter()
            .map(|(version, text)| ChangelogEntry {
                version: version.to_string(),
                text: text.to_string(),
            })
            .collect(),
    }
}

/// Mod source answering from in-memory tables.
#[derive(Default)]
pub struct FakeSource {
    pub mods: Mutex<HashMap<String, Vec<FetchedMod>>>,
    pub changelogs: Mutex<HashMap<u64, Changelog>>,
    /// Games whose recent-mods fetch fails (simulated upstream 500).
    pub failing_games: Mutex<HashSet<String>>,
    /// Mod ids whose changelog fetch fails.
    pub failing_changelogs: Mutex<HashSet<u64>>,
    /// Every changelog request, in order.
    pub changelog_requests: Mutex<Vec<u64>>,
    /// When set, fetches wait for this before answering.
    pub gate: Option<Notify>,
}

impl FakeSource {
    pub fn set_mods(&self, game: &str, mods: Vec<FetchedMod>) {
        self.mods.lock().unwrap().insert(game.to_string(), mods);
    }

    pub fn set_changelog(&self, mod_id: u64, log: Changelog) {
        self.changelogs.lock().unwrap().insert(mod_id, log);
    }

    pub fn fail_game(&self, game: &str) {
        self.failing_games.lock().unwrap().insert(game.to_string());
    }

    pub fn fail_changelog(&self, mod_id: u64) {
        self.failing_changelogs.lock().unwrap().insert(mod_id);
    }

    pub fn changelog_requests(&self) -> Vec<u64> {
        self.changelog_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModSource for FakeSource {
    async fn fetch_recent_mods(&self, game: &str) -> Result<Vec<FetchedMod>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.failing_games.lock().unwrap().contains(game) {
            anyhow::bail!("Nexus API returned 500 Internal Server Error");
        }
        Ok(self
            .mods
            .lock()
            .unwrap()
            .get(game)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_changelog(&self, _game: &str, mod_id: u64) -> Result<Changelog> {
        self.changelog_requests.lock().unwrap().push(mod_id);
        if self.failing_changelogs.lock().unwrap().contains(&mod_id) {
            anyhow::bail!("Nexus API returned 502 Bad Gateway");
        }
        Ok(self
            .changelogs
            .lock()
            .unwrap()
            .get(&mod_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Chat platform that records every send.
#[derive(Default)]
pub struct FakeChat {
    /// Channels that resolve to None.
    pub missing: Mutex<HashSet<String>>,
    /// Channels whose sends fail.
    pub failing: Mutex<HashSet<String>>,
    pub sent: Mutex<Vec<(String, OutgoingMessage)>>,
}

impl FakeChat {
    pub fn mark_missing(&self, channel_id: &str) {
        self.missing.lock().unwrap().insert(channel_id.to_string());
    }

    pub fn mark_failing(&self, channel_id: &str) {
        self.failing.lock().unwrap().insert(channel_id.to_string());
    }

    pub fn sent_to(&self, channel_id: &str) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == channel_id)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn total_sent(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<ChannelHandle>> {
        if self.missing.lock().unwrap().contains(channel_id) {
            return Ok(None);
        }
        Ok(Some(ChannelHandle {
            id: channel_id.to_string(),
            name: Some(format!("#{channel_id}")),
        }))
    }

    async fn send_message(&self, channel: &ChannelHandle, message: &OutgoingMessage) -> Result<()> {
        if self.failing.lock().unwrap().contains(&channel.id) {
            anyhow::bail!("Send to channel {} returned 500", channel.id);
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.id.clone(), message.clone()));
        Ok(())
    }
}
