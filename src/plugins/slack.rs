//! Slack plugin - recent direct messages

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{http_client, require, ConfigField, Plugin};
use crate::config::SourceConfig;
use crate::notification::sanitize::truncate_chars;
use crate::notification::Notification;

const API_BASE: &str = "https://slack.com/api";
/// DM channels inspected per fetch
const MAX_CHANNELS: usize = 5;
/// Only messages newer than this are reported
const MAX_MESSAGE_AGE_SECS: f64 = 3600.0;

pub struct SlackPlugin;

#[derive(Debug, Deserialize)]
struct AuthTest {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    team: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationList {
    ok: bool,
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct History {
    ok: bool,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    ts: String,
    #[serde(default)]
    text: Option<String>,
}

/// Slack `ts` ("1700000000.000100") to a timestamp
fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let secs: f64 = ts.parse().ok()?;
    Utc.timestamp_millis_opt((secs * 1000.0) as i64).single()
}

fn dm_notification(channel_id: &str, msg: &Message, timestamp: DateTime<Utc>) -> Notification {
    let text = msg.text.as_deref().unwrap_or("").trim();
    let title = if text.is_empty() {
        "DM: (attachment)".to_string()
    } else {
        format!("DM: {}", truncate_chars(text, 50))
    };

    Notification::new(format!("slack-{}-{}", channel_id, msg.ts), "slack", title)
        .with_body(truncate_chars(text, 200))
        .with_url("https://app.slack.com")
        .with_timestamp(timestamp)
}

#[async_trait]
impl Plugin for SlackPlugin {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn display_name(&self) -> &'static str {
        "Slack"
    }

    fn required_config(&self) -> Vec<ConfigField> {
        vec![ConfigField::new("token", "Slack Bot Token (xoxb-...)")
            .secret()
            .instructions(
                "1. Go to api.slack.com/apps -> Create New App\n\
                 2. From Scratch -> name it 'vibenotifications'\n\
                 3. OAuth & Permissions -> Add Bot Token Scopes:\n   \
                    im:history, im:read, users:read\n\
                 4. Install to Workspace\n\
                 5. Copy the Bot User OAuth Token (xoxb-...)",
            )
            .validate(|v| {
                if v.trim().starts_with("xox") {
                    Ok(())
                } else {
                    Err("Slack tokens start with 'xox'".to_string())
                }
            })]
    }

    async fn setup(&self, config: &SourceConfig) -> Result<serde_json::Value> {
        let token = require(config, "token")?;
        let auth: AuthTest = http_client()?
            .get(format!("{}/auth.test", API_BASE))
            .bearer_auth(token)
            .send()
            .await?
            .json()
            .await?;
        if !auth.ok {
            bail!("Slack auth failed: {}", auth.error.unwrap_or_default());
        }
        Ok(json!({ "connected": true, "user": auth.user, "team": auth.team }))
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Notification>> {
        let token = require(config, "token")?;
        let client = http_client()?;

        let list: ConversationList = client
            .get(format!("{}/conversations.list", API_BASE))
            .query(&[("types", "im"), ("limit", "10")])
            .bearer_auth(token)
            .send()
            .await?
            .json()
            .await?;
        if !list.ok {
            bail!("Slack conversations.list failed");
        }

        let now = Utc::now();
        let mut notifications = Vec::new();
        for channel in list.channels.iter().take(MAX_CHANNELS) {
            let history: History = client
                .get(format!("{}/conversations.history", API_BASE))
                .query(&[("channel", channel.id.as_str()), ("limit", "1")])
                .bearer_auth(token)
                .send()
                .await?
                .json()
                .await?;
            if !history.ok {
                debug!(channel = %channel.id, "Skipping unreadable DM channel");
                continue;
            }

            let Some(msg) = history.messages.first() else {
                continue;
            };
            let Some(timestamp) = parse_ts(&msg.ts) else {
                continue;
            };
            let age = (now - timestamp).num_milliseconds() as f64 / 1000.0;
            if age < MAX_MESSAGE_AGE_SECS {
                notifications.push(dm_notification(&channel.id, msg, timestamp));
            }
        }

        Ok(notifications)
    }
}
