//! MCP bridge plugin - report MCP servers configured in Claude Code

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;

use super::Plugin;
use crate::config::{read_json, SourceConfig};
use crate::notification::{Notification, Priority};

pub struct McpBridgePlugin {
    /// Host settings files searched in order
    settings_paths: Vec<PathBuf>,
}

impl McpBridgePlugin {
    pub fn new() -> Self {
        let claude_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".claude");
        Self::with_settings_paths(vec![
            claude_dir.join("settings.json"),
            claude_dir.join("settings.local.json"),
        ])
    }

    pub fn with_settings_paths(settings_paths: Vec<PathBuf>) -> Self {
        Self { settings_paths }
    }

    /// Server names from the first settings file that declares any
    fn server_names(&self) -> Vec<String> {
        for path in &self.settings_paths {
            if !path.exists() {
                continue;
            }
            let settings: serde_json::Value = match read_json(path) {
                Ok(v) => v,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable settings");
                    continue;
                }
            };
            if let Some(servers) = settings.get("mcpServers").and_then(|v| v.as_object()) {
                if !servers.is_empty() {
                    return servers.keys().cloned().collect();
                }
            }
        }
        Vec::new()
    }
}

impl Default for McpBridgePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for McpBridgePlugin {
    fn name(&self) -> &'static str {
        "mcp-bridge"
    }

    fn display_name(&self) -> &'static str {
        "MCP Bridge"
    }

    async fn setup(&self, _config: &SourceConfig) -> Result<serde_json::Value> {
        let servers = self.server_names();
        if servers.is_empty() {
            return Ok(json!({
                "connected": true,
                "note": "No MCP servers found. Configure MCPs in Claude Code first."
            }));
        }
        Ok(json!({ "connected": true, "servers": servers.len() }))
    }

    async fn fetch(&self, _config: &SourceConfig) -> Result<Vec<Notification>> {
        let now = Utc::now();
        let day = now.format("%Y%m%d");
        Ok(self
            .server_names()
            .into_iter()
            .map(|name| {
                Notification::new(
                    format!("mcp-{}-{}", name, day),
                    "mcp-bridge",
                    format!("MCP: {} connected", name),
                )
                .with_body(format!("MCP server '{}' is available", name))
                .with_priority(Priority::Low)
                .with_timestamp(now)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_lists_servers() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("settings.json");
        let local = dir.path().join("settings.local.json");
        fs::write(&empty, r#"{"mcpServers": {}}"#).unwrap();
        fs::write(&local, r#"{"mcpServers": {"github": {}, "postgres": {}}}"#).unwrap();

        let plugin = McpBridgePlugin::with_settings_paths(vec![empty, local]);
        let notifications = plugin.fetch(&SourceConfig::enabled()).await.unwrap();

        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().all(|n| n.priority == Priority::Low));
        assert!(notifications[0].id.starts_with("mcp-github-"));
        assert_eq!(notifications[1].title, "MCP: postgres connected");
    }

    #[tokio::test]
    async fn test_no_settings_is_empty() {
        let dir = TempDir::new().unwrap();
        let plugin = McpBridgePlugin::with_settings_paths(vec![dir.path().join("missing.json")]);
        assert!(plugin.fetch(&SourceConfig::enabled()).await.unwrap().is_empty());
        let setup = plugin.setup(&SourceConfig::enabled()).await.unwrap();
        assert!(setup.get("note").is_some());
    }
}
