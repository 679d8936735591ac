//! Spinner verbs surface - ambient `[source] title` lines in the host spinner
//!
//! Writes `spinnerVerbs: { mode: "replace", verbs: [...] }` into the host's
//! settings.json, leaving every other key untouched.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};

use super::{SendResult, Surface};
use crate::config::{read_json, write_json_atomic};
use crate::notification::sanitize::{sanitize_field, truncate_chars};
use crate::notification::{filter_by_min_priority, Notification, Priority};

/// Max number of verbs handed to the host
pub const MAX_VERBS: usize = 20;

/// Host settings key
pub const SPINNER_KEY: &str = "spinnerVerbs";

pub struct SpinnerSurface {
    host_settings: PathBuf,
    max_length: usize,
    min_priority: Priority,
}

impl SpinnerSurface {
    pub fn new(host_settings: &Path, max_length: usize, min_priority: Priority) -> Self {
        Self {
            host_settings: host_settings.to_path_buf(),
            max_length,
            min_priority,
        }
    }
}

impl Surface for SpinnerSurface {
    fn name(&self) -> &str {
        "spinner"
    }

    fn deliver(&self, ranked: &[Notification]) -> Result<SendResult> {
        let verbs = format_verbs(ranked, self.max_length, self.min_priority);
        write_verbs(&self.host_settings, verbs)
    }
}

/// Format the ranked queue as spinner verbs
///
/// `[source] title` shares one `max_length` budget; at most 20 entries.
pub fn format_verbs(ranked: &[Notification], max_length: usize, min_priority: Priority) -> Vec<String> {
    filter_by_min_priority(ranked, min_priority)
        .into_iter()
        .map(|n| format_verb(n, max_length))
        .take(MAX_VERBS)
        .collect()
}

fn format_verb(n: &Notification, max_length: usize) -> String {
    let prefix = format!("[{}]", sanitize_field(&n.source));
    let budget = max_length.saturating_sub(prefix.chars().count() + 1);
    let title = truncate_chars(&sanitize_field(&n.title), budget);
    truncate_chars(&format!("{} {}", prefix, title), max_length)
}

/// Replace the host's spinner verbs
///
/// A missing host settings file means the host is not installed; skip.
pub fn write_verbs(host_settings: &Path, verbs: Vec<String>) -> Result<SendResult> {
    if verbs.is_empty() {
        return Ok(SendResult::Skipped("no notifications above threshold".to_string()));
    }
    if !host_settings.exists() {
        return Ok(SendResult::Skipped("host settings not found".to_string()));
    }

    let mut settings: serde_json::Value = read_json(host_settings)?;
    let obj = settings
        .as_object_mut()
        .context("Host settings is not a JSON object")?;
    obj.insert(SPINNER_KEY.to_string(), json!({ "mode": "replace", "verbs": verbs }));

    write_json_atomic(host_settings, &settings)?;
    Ok(SendResult::Sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_verb_budget_shared() {
        let n = Notification::new("a", "github", "x".repeat(100));
        let verb = format_verb(&n, 60);
        assert_eq!(verb.chars().count(), 60);
        assert!(verb.starts_with("[github] xxx"));
    }

    #[test]
    fn test_format_verb_prefix_longer_than_budget() {
        let n = Notification::new("a", "a-very-long-source-name", "title");
        let verb = format_verb(&n, 10);
        assert_eq!(verb.chars().count(), 10);
    }

    #[test]
    fn test_format_verbs_sanitizes() {
        let n = Notification::new("a", "<slack>", "hi\n<script>");
        let verbs = format_verbs(&[n], 60, Priority::Low);
        assert_eq!(verbs, vec!["[slack] hiscript".to_string()]);
    }

    #[test]
    fn test_format_verbs_filters_and_caps() {
        let mut items: Vec<Notification> = (0..30)
            .map(|i| Notification::new(format!("n{}", i), "x", format!("t{}", i)))
            .collect();
        items.push(Notification::new("low", "x", "quiet").with_priority(Priority::Low));

        let verbs = format_verbs(&items, 60, Priority::Normal);
        assert_eq!(verbs.len(), MAX_VERBS);
        assert!(!verbs.iter().any(|v| v.contains("quiet")));
    }

    #[test]
    fn test_write_verbs_preserves_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"model": "opus", "spinnerVerbs": {"mode": "append", "verbs": ["x"]}}"#).unwrap();

        let result = write_verbs(&path, vec!["[github] PR".to_string()]).unwrap();
        assert_eq!(result, SendResult::Sent);

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["model"], "opus");
        assert_eq!(json["spinnerVerbs"]["mode"], "replace");
        assert_eq!(json["spinnerVerbs"]["verbs"][0], "[github] PR");
    }

    #[test]
    fn test_write_verbs_missing_host_is_skipped() {
        let dir = TempDir::new().unwrap();
        let result = write_verbs(&dir.path().join("nope.json"), vec!["x".to_string()]).unwrap();
        assert!(matches!(result, SendResult::Skipped(_)));
    }

    #[test]
    fn test_write_verbs_corrupt_host_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(write_verbs(&path, vec!["x".to_string()]).is_err());
        // Host file untouched
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }
}
