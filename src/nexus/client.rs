// HTTP client for the Nexus Mods v1 REST API.
//
// Two read-only endpoints are used:
//   GET /games/{game}/mods/latest_updated.json
//   GET /games/{game}/mods/{id}/changelogs.json
// Both need the personal API key in the `apikey` header.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{Changelog, FetchedMod};
use super::traits::{ModSource, RECENT_MODS_LIMIT};
use crate::output::truncate_error_body;

const USER_AGENT: &str = "nimbusfeed/0.1 (mod-update-feeds)";

/// Upper bound on a single Nexus request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the Nexus Mods REST API.
pub struct NexusClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NexusClient {
    /// Create a new Nexus client pointing at the given base URL
    /// (normally `https://api.nexusmods.com/v1`).
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// GET a path under the API base and deserialize the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        debug!(path = path, "Nexus GET request");

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .header("apikey", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Nexus request failed: {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Nexus {path} returned {status}: {}", truncate_error_body(&body));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse Nexus {path} response"))
    }
}

#[async_trait]
impl ModSource for NexusClient {
    async fn fetch_recent_mods(&self, game: &str) -> Result<Vec<FetchedMod>> {
        let path = format!("/games/{game}/mods/latest_updated.json");
        let mut mods: Vec<FetchedMod> = self.get_json(&path).await?;
        mods.truncate(RECENT_MODS_LIMIT);
        debug!(game = game, count = mods.len(), "Fetched recent mods");
        Ok(mods)
    }

    async fn fetch_changelog(&self, game: &str, mod_id: u64) -> Result<Changelog> {
        let path = format!("/games/{game}/mods/{mod_id}/changelogs.json");
        self.get_json(&path).await
    }
}
