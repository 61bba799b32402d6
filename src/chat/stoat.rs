// REST client for the Stoat chat platform.
//
// Only two endpoints are needed:
//   GET  /channels/{id}          : does the channel exist / can we see it?
//   POST /channels/{id}/messages : content line plus embeds
// Authentication is the bot token in the `x-bot-token` header.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{ChannelHandle, NotificationUnit, OutgoingMessage};
use super::traits::ChatPlatform;
use crate::output::truncate_error_body;

const USER_AGENT: &str = "nimbusfeed/0.1 (mod-update-feeds)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct StoatClient {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl StoatClient {
    pub fn new(base_url: &str, bot_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }
}

#[async_trait]
impl ChatPlatform for StoatClient {
    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<ChannelHandle>> {
        let url = format!("{}/channels/{}", self.base_url, channel_id);

        let response = self
            .client
            .get(&url)
            .header("x-bot-token", &self.bot_token)
            .send()
            .await
            .with_context(|| format!("Channel lookup failed for {channel_id}"))?;

        // Unknown or no-longer-visible channels are not transport errors
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Channel lookup for {channel_id} returned {status}: {}",
                truncate_error_body(&body)
            );
        }

        let channel: ChannelResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse channel {channel_id}"))?;

        Ok(Some(ChannelHandle {
            id: channel.id,
            name: channel.name,
        }))
    }

    async fn send_message(&self, channel: &ChannelHandle, message: &OutgoingMessage) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel.id);
        let body = SendMessageBody::from(message);

        debug!(
            channel_id = %channel.id,
            embeds = body.embeds.len(),
            "Sending message"
        );

        let response = self
            .client
            .post(&url)
            .header("x-bot-token", &self.bot_token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Send to channel {} failed", channel.id))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Send to channel {} returned {status}: {}",
                channel.id,
                truncate_error_body(&body)
            );
        }

        Ok(())
    }
}

// --- Wire types ---

#[derive(Deserialize)]
struct ChannelResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<SendableEmbed>,
}

#[derive(Debug, Serialize)]
struct SendableEmbed {
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<String>,
    colour: String,
    icon_url: String,
    url: String,
}

impl From<&OutgoingMessage> for SendMessageBody {
    fn from(message: &OutgoingMessage) -> Self {
        Self {
            content: message.content.clone(),
            embeds: message.units.iter().map(SendableEmbed::from).collect(),
        }
    }
}

impl From<&NotificationUnit> for SendableEmbed {
    fn from(unit: &NotificationUnit) -> Self {
        Self {
            title: unit.title.clone(),
            description: unit.description.clone(),
            media: unit.thumbnail_url.clone(),
            colour: unit.colour.clone(),
            icon_url: unit.icon_url.clone(),
            url: unit.url.clone(),
        }
    }
}
