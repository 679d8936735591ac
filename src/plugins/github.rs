//! GitHub plugin - review requests, CI activity and other notifications

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{http_client, require, ConfigField, Plugin};
use crate::config::SourceConfig;
use crate::notification::{Notification, Priority};

const API_BASE: &str = "https://api.github.com";

pub struct GithubPlugin;

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiNotification {
    id: String,
    reason: String,
    updated_at: DateTime<Utc>,
    subject: ApiSubject,
    repository: ApiRepository,
}

#[derive(Debug, Deserialize)]
struct ApiSubject {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    full_name: String,
    html_url: String,
}

/// Reasons that need the user's attention
fn is_actionable_reason(reason: &str) -> bool {
    matches!(reason, "review_requested" | "ci_activity")
}

fn to_notification(n: ApiNotification) -> Notification {
    let actionable = is_actionable_reason(&n.reason);
    Notification::new(format!("github-{}", n.id), "github", n.subject.title)
        .with_body(format!("{} in {}", n.reason, n.repository.full_name))
        .with_url(n.repository.html_url)
        .with_priority(if actionable { Priority::High } else { Priority::Normal })
        .with_timestamp(n.updated_at)
        .with_actionable(actionable)
}

#[async_trait]
impl Plugin for GithubPlugin {
    fn name(&self) -> &'static str {
        "github"
    }

    fn display_name(&self) -> &'static str {
        "GitHub"
    }

    fn required_config(&self) -> Vec<ConfigField> {
        vec![ConfigField::new("token", "GitHub Personal Access Token")
            .secret()
            .instructions(
                "1. Go to github.com/settings/tokens/new\n\
                 2. Name: vibenotifications\n\
                 3. Select scopes: notifications, repo\n\
                 4. Generate and copy the token",
            )]
    }

    async fn setup(&self, config: &SourceConfig) -> Result<serde_json::Value> {
        let token = require(config, "token")?;
        let res = http_client()?
            .get(format!("{}/user", API_BASE))
            .bearer_auth(token)
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("Invalid GitHub token (HTTP {})", res.status());
        }
        let user: ApiUser = res.json().await?;
        Ok(json!({ "connected": true, "user": user.login }))
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Notification>> {
        let token = require(config, "token")?;
        let res = http_client()?
            .get(format!("{}/notifications", API_BASE))
            .bearer_auth(token)
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("GitHub API returned HTTP {}", res.status());
        }
        let items: Vec<ApiNotification> = res.json().await?;
        Ok(items.into_iter().map(to_notification).collect())
    }
}
