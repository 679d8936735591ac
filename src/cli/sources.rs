//! Source management - list, add and remove notification sources

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use serde::Serialize;
use tracing::info;

use super::output::format_output;
use crate::config::{Paths, SettingsStore, SourceConfig};
use crate::plugins::{ConfigField, Plugin, PluginRegistry};

/// One row of `sources`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub name: &'static str,
    pub display_name: &'static str,
    pub enabled: bool,
    pub configured: bool,
}

/// Every registered plugin with its state in settings
pub fn list_sources(registry: &PluginRegistry, paths: &Paths) -> Vec<SourceRow> {
    let settings = SettingsStore::load(paths);
    registry
        .iter()
        .map(|plugin| {
            let config = settings.sources.get(plugin.name());
            SourceRow {
                name: plugin.name(),
                display_name: plugin.display_name(),
                enabled: config.map(|c| c.enabled).unwrap_or(false),
                configured: config.is_some(),
            }
        })
        .collect()
}

/// Handle `sources`
pub fn handle_sources(registry: &PluginRegistry, paths: &Paths, json: bool) -> Result<()> {
    let rows = list_sources(registry, paths);
    println!(
        "{}",
        format_output(&rows, json, |rows| {
            let mut out = String::from("Available sources:\n");
            for row in rows {
                let state = if row.enabled {
                    " (enabled)"
                } else if row.configured {
                    " (disabled)"
                } else {
                    ""
                };
                out.push_str(&format!("  {:<12} {}{}\n", row.name, row.display_name, state));
            }
            out.push_str("\nEnable one with: vibenotify add <name>");
            out
        })
    );
    Ok(())
}

/// Prompt for one config value until it validates
fn prompt_field(field: &ConfigField) -> Result<String> {
    if let Some(instructions) = field.instructions {
        println!("  {}", instructions);
    }

    let label = match field.placeholder {
        Some(placeholder) => format!("{} ({})", field.label, placeholder),
        None => field.label.to_string(),
    };

    if field.secret {
        loop {
            let value = Password::new()
                .with_prompt(&label)
                .allow_empty_password(field.optional)
                .interact()
                .with_context(|| format!("Failed to read {}", field.key))?;
            match field.check(value.trim()) {
                Ok(()) => return Ok(value.trim().to_string()),
                Err(message) => println!("  ⚠ {}", message),
            }
        }
    }

    let value: String = Input::new()
        .with_prompt(&label)
        .allow_empty(true)
        .validate_with(|v: &String| field.check(v.trim()))
        .interact_text()
        .with_context(|| format!("Failed to read {}", field.key))?;
    Ok(value.trim().to_string())
}

/// Build an enabled source config from collected values; empty optionals are left out
pub fn source_config_from(values: Vec<(&'static str, String)>) -> SourceConfig {
    values
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .fold(SourceConfig::enabled(), |config, (key, value)| config.with_option(key, value))
}

/// Verify `config` with the plugin and store it; `false` when setup failed
pub async fn enable_source(plugin: &dyn Plugin, config: SourceConfig, paths: &Paths) -> Result<bool> {
    match plugin.setup(&config).await {
        Ok(details) => {
            println!("  Connected! {}", details);
            let mut settings = SettingsStore::load(paths);
            settings.sources.insert(plugin.name().to_string(), config);
            SettingsStore::save(paths, &settings)?;
            info!(source = plugin.name(), "Source enabled");
            println!("  Saved.");
            Ok(true)
        }
        Err(e) => {
            println!("  Failed: {:#}", e);
            Ok(false)
        }
    }
}

/// Handle `add <plugin>`
pub async fn handle_add(registry: &PluginRegistry, paths: &Paths, name: &str) -> Result<()> {
    let Some(plugin) = registry.get(name) else {
        println!("Unknown plugin: {}", name);
        println!("Plugins: {}", registry.names().join(", "));
        return Ok(());
    };

    println!("Setting up {}...", plugin.display_name());
    let mut values = Vec::new();
    for field in plugin.required_config() {
        let value = prompt_field(&field)?;
        values.push((field.key, value));
    }

    enable_source(plugin, source_config_from(values), paths).await?;
    Ok(())
}

/// Delete a source entry; `false` when it was not configured
pub fn remove_source(paths: &Paths, name: &str) -> Result<bool> {
    let mut settings = SettingsStore::load(paths);
    if settings.sources.remove(name).is_none() {
        return Ok(false);
    }
    SettingsStore::save(paths, &settings)?;
    info!(source = name, "Source removed");
    Ok(true)
}

/// Handle `remove <plugin>`
pub fn handle_remove(paths: &Paths, name: &str) -> Result<()> {
    if remove_source(paths, name)? {
        println!("Removed {}.", name);
    } else {
        println!("{} is not enabled.", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Notification;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct CheckedPlugin;

    #[async_trait]
    impl Plugin for CheckedPlugin {
        fn name(&self) -> &'static str {
            "checked"
        }

        fn display_name(&self) -> &'static str {
            "Checked"
        }

        async fn setup(&self, config: &SourceConfig) -> Result<serde_json::Value> {
            match config.option("token") {
                Some("good") => Ok(serde_json::json!({"connected": true})),
                _ => anyhow::bail!("bad token"),
            }
        }

        async fn fetch(&self, _config: &SourceConfig) -> Result<Vec<Notification>> {
            Ok(Vec::new())
        }
    }

    fn test_paths(dir: &TempDir) -> Paths {
        Paths::with_root(dir.path().join("data"), dir.path().join("host.json"))
    }

    #[test]
    fn test_source_config_from_skips_empty() {
        let config = source_config_from(vec![("source", "ics".to_string()), ("lookahead", String::new())]);
        assert!(config.enabled);
        assert_eq!(config.option("source"), Some("ics"));
        assert!(!config.options.contains_key("lookahead"));
    }

    #[tokio::test]
    async fn test_enable_source_saves_only_on_success() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);

        let bad = SourceConfig::enabled().with_option("token", "nope");
        assert!(!enable_source(&CheckedPlugin, bad, &paths).await.unwrap());
        assert!(SettingsStore::load(&paths).sources.is_empty());

        let good = SourceConfig::enabled().with_option("token", "good");
        assert!(enable_source(&CheckedPlugin, good, &paths).await.unwrap());
        assert_eq!(SettingsStore::load(&paths).enabled_sources(), vec!["checked"]);
    }

    #[test]
    fn test_remove_source() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        let mut settings = SettingsStore::load(&paths);
        settings.sources.insert("github".to_string(), SourceConfig::enabled());
        SettingsStore::save(&paths, &settings).unwrap();

        assert!(remove_source(&paths, "github").unwrap());
        assert!(!remove_source(&paths, "github").unwrap());
        assert!(SettingsStore::load(&paths).sources.is_empty());
    }

    #[test]
    fn test_list_sources() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        let mut settings = SettingsStore::load(&paths);
        settings.sources.insert("github".to_string(), SourceConfig::enabled());
        settings.sources.insert("slack".to_string(), SourceConfig::default());
        SettingsStore::save(&paths, &settings).unwrap();

        let rows = list_sources(&PluginRegistry::builtin(), &paths);
        assert_eq!(rows.len(), 6);
        let github = rows.iter().find(|r| r.name == "github").unwrap();
        assert!(github.enabled);
        let slack = rows.iter().find(|r| r.name == "slack").unwrap();
        assert!(!slack.enabled && slack.configured);
        let stocks = rows.iter().find(|r| r.name == "stocks").unwrap();
        assert!(!stocks.configured);
    }
}
