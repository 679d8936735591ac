//! Source plugins - one per integration
//!
//! Every plugin implements `Plugin`. The registry is built once at startup
//! and passed down to the daemon and CLI; there is no runtime discovery.

pub mod calendar;
pub mod github;
pub mod mcp_bridge;
pub mod slack;
pub mod stocks;
pub mod x;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::config::{Settings, SourceConfig};
use crate::notification::Notification;

/// Validator for a config value; `Err` carries the message shown to the user
pub type Validator = fn(&str) -> Result<(), String>;

/// One config value a plugin needs from the user
#[derive(Debug, Clone)]
pub struct ConfigField {
    pub key: &'static str,
    pub label: &'static str,
    pub instructions: Option<&'static str>,
    pub placeholder: Option<&'static str>,
    /// Read with a hidden prompt
    pub secret: bool,
    /// May be left empty
    pub optional: bool,
    pub validate: Option<Validator>,
}

impl ConfigField {
    pub fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            instructions: None,
            placeholder: None,
            secret: false,
            optional: false,
            validate: None,
        }
    }

    pub fn instructions(mut self, text: &'static str) -> Self {
        self.instructions = Some(text);
        self
    }

    pub fn placeholder(mut self, text: &'static str) -> Self {
        self.placeholder = Some(text);
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    /// Check a (trimmed) value: required fields must be non-empty, then the validator runs
    pub fn check(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            return if self.optional {
                Ok(())
            } else {
                Err("This field is required.".to_string())
            };
        }
        match self.validate {
            Some(validate) => validate(value),
            None => Ok(()),
        }
    }
}

/// A notification source
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Registry key, also the key under `sources` in settings
    fn name(&self) -> &'static str;

    /// Human readable name
    fn display_name(&self) -> &'static str;

    /// Config collected by `add`
    fn required_config(&self) -> Vec<ConfigField> {
        Vec::new()
    }

    /// Verify credentials/config; returns connection details for display
    async fn setup(&self, config: &SourceConfig) -> Result<serde_json::Value>;

    /// Fetch current notifications
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Notification>>;
}

/// Static plugin registry
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Registry without plugins
    pub fn empty() -> Self {
        Self { plugins: Vec::new() }
    }

    /// All built-in plugins
    pub fn builtin() -> Self {
        Self::empty()
            .with(Box::new(calendar::CalendarPlugin))
            .with(Box::new(github::GithubPlugin))
            .with(Box::new(mcp_bridge::McpBridgePlugin::new()))
            .with(Box::new(slack::SlackPlugin))
            .with(Box::new(stocks::StocksPlugin))
            .with(Box::new(x::XPlugin))
    }

    /// Register a plugin; a later plugin with the same name replaces the earlier one
    pub fn with(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.retain(|p| p.name() != plugin.name());
        self.plugins.push(plugin);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    /// Enabled sources that have a registered plugin
    pub fn enabled<'a>(&'a self, settings: &'a Settings) -> Vec<(&'a dyn Plugin, &'a SourceConfig)> {
        let mut enabled = Vec::new();
        for (name, config) in &settings.sources {
            if !config.enabled {
                continue;
            }
            match self.get(name) {
                Some(plugin) => enabled.push((plugin, config)),
                None => warn!(source = %name, "Source enabled but no such plugin"),
            }
        }
        enabled
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shared HTTP client settings for plugins
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .user_agent(concat!("vibenotifications/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Required string option
pub(crate) fn require<'a>(config: &'a SourceConfig, key: &str) -> Result<&'a str> {
    config
        .option(key)
        .with_context(|| format!("Missing config value '{}'", key))
}
