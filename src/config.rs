//! Settings and file locations
//!
//! All state lives under one data directory (`~/.vibenotifications` by
//! default, overridable with `VIBENOTIFY_HOME`). The host's own settings
//! file is only touched by the spinner surface and hook setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::notification::Priority;

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "VIBENOTIFY_HOME";

/// Resolved file locations
#[derive(Debug, Clone)]
pub struct Paths {
    data_dir: PathBuf,
    host_settings: PathBuf,
}

impl Paths {
    /// Default locations under the user's home directory
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".vibenotifications"));

        Self {
            data_dir,
            host_settings: home.join(".claude").join("settings.json"),
        }
    }

    /// Explicit locations, used by tests
    pub fn with_root(data_dir: impl Into<PathBuf>, host_settings: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            host_settings: host_settings.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Host (Claude Code) settings.json
    pub fn host_settings(&self) -> &Path {
        &self.host_settings
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn notifications_file(&self) -> PathBuf {
        self.data_dir.join("notifications.json")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.data_dir.join("daemon.pid")
    }

    /// Status pointer side file
    pub fn current_file(&self) -> PathBuf {
        self.data_dir.join("current-notification.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("daemon.log")
    }

    /// Create the data directory if missing
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub version: String,
    /// Seconds between daemon fetch cycles
    pub fetch_interval: u64,
    /// Plugin name -> source config
    pub sources: BTreeMap<String, SourceConfig>,
    pub surfaces: SurfaceConfig,
    pub priority: PriorityConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            fetch_interval: 60,
            sources: BTreeMap::new(),
            surfaces: SurfaceConfig::default(),
            priority: PriorityConfig::default(),
        }
    }
}

impl Settings {
    /// Names of enabled sources, in map order
    pub fn enabled_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Interval clamped to at least one second
    pub fn interval_secs(&self) -> u64 {
        self.fetch_interval.max(1)
    }
}

/// Per-source config: an enabled flag plus plugin-specific options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl SourceConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }

    /// String option, trimmed; empty strings count as missing
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurfaceConfig {
    pub spinner_verbs: SpinnerConfig,
    pub status_line: ToggleConfig,
    pub context_injection: ContextInjectionConfig,
    pub session_summary: ToggleConfig,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            spinner_verbs: SpinnerConfig::default(),
            status_line: ToggleConfig { enabled: true },
            context_injection: ContextInjectionConfig::default(),
            session_summary: ToggleConfig { enabled: true },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpinnerConfig {
    pub enabled: bool,
    /// Character budget for `[source] title`
    pub max_length: usize,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_length: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    pub enabled: bool,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextInjectionConfig {
    pub enabled: bool,
    /// Probability (0.0 - 1.0) of injecting on each hook call
    pub rate: f64,
}

impl Default for ContextInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 0.3,
        }
    }
}

/// Minimum priority for each surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityConfig {
    pub min_spinner: Priority,
    pub min_status_line: Priority,
    pub min_context_injection: Priority,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            min_spinner: Priority::Normal,
            min_status_line: Priority::Low,
            min_context_injection: Priority::High,
        }
    }
}

/// Reads and writes `settings.json`
pub struct SettingsStore;

impl SettingsStore {
    /// Load settings; a missing or corrupt file yields defaults
    pub fn load(paths: &Paths) -> Settings {
        let path = paths.settings_file();
        if !path.exists() {
            return Settings::default();
        }

        match read_json::<Settings>(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Settings unreadable, using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(paths: &Paths, settings: &Settings) -> Result<()> {
        paths.ensure_dir()?;
        write_json_atomic(&paths.settings_file(), settings)
    }
}

/// Parse a JSON file
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Write pretty JSON through a uniquely named temp file in the same directory, then rename
///
/// Concurrent writers each publish a complete file; the last rename wins.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(serde_json::to_string_pretty(value)?.as_bytes())
        .with_context(|| format!("Failed to write {}", temp.path().display()))?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
