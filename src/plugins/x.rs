//! X plugin - mentions of the configured user

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{http_client, require, ConfigField, Plugin};
use crate::config::SourceConfig;
use crate::notification::{Notification, Priority};

const API_BASE: &str = "https://api.x.com/2";

pub struct XPlugin;

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: String,
    #[serde(default)]
    text: String,
    created_at: Option<DateTime<Utc>>,
}

fn validate_user_id(value: &str) -> Result<(), String> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("The user ID is numeric. Look it up from your @handle first.".to_string())
    }
}

fn to_notification(tweet: ApiTweet) -> Notification {
    let headline: String = tweet.text.chars().take(50).collect();
    let body: String = tweet.text.chars().take(200).collect();
    let n = Notification::new(format!("x-{}", tweet.id), "x", format!("@mention: {}", headline))
        .with_body(body)
        .with_url(format!("https://x.com/i/status/{}", tweet.id))
        .with_priority(Priority::Normal);
    match tweet.created_at {
        Some(at) => n.with_timestamp(at),
        None => n,
    }
}

#[async_trait]
impl Plugin for XPlugin {
    fn name(&self) -> &'static str {
        "x"
    }

    fn display_name(&self) -> &'static str {
        "X/Twitter"
    }

    fn required_config(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("bearerToken", "X API Bearer Token")
                .secret()
                .instructions(
                    "1. Go to developer.x.com/en/portal/dashboard\n\
                     2. Create a project and app\n\
                     3. Open Keys and Tokens\n\
                     4. Copy the Bearer Token",
                ),
            ConfigField::new("userId", "Your X user ID (numeric)")
                .instructions("Find it at tweeterid.com by entering your @handle")
                .validate(validate_user_id),
        ]
    }

    async fn setup(&self, config: &SourceConfig) -> Result<serde_json::Value> {
        let token = require(config, "bearerToken")?;
        let user_id = require(config, "userId")?;
        let res = http_client()?
            .get(format!("{}/users/{}", API_BASE, user_id))
            .bearer_auth(token)
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("Invalid X API credentials (HTTP {})", res.status());
        }
        let user: ApiEnvelope<ApiUser> = res.json().await?;
        Ok(json!({ "connected": true, "user": user.data.map(|u| u.username) }))
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Notification>> {
        let token = require(config, "bearerToken")?;
        let user_id = require(config, "userId")?;
        let res = http_client()?
            .get(format!("{}/users/{}/mentions", API_BASE, user_id))
            .query(&[("max_results", "10"), ("tweet.fields", "created_at,author_id,text")])
            .bearer_auth(token)
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("X API returned HTTP {}", res.status());
        }
        let mentions: ApiEnvelope<Vec<ApiTweet>> = res.json().await?;
        Ok(mentions
            .data
            .unwrap_or_default()
            .into_iter()
            .map(to_notification)
            .collect())
    }
}
