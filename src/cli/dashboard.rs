//! Dashboard - queue overview per source plus daemon state

use anyhow::Result;
use serde::Serialize;

use super::output::format_output;
use crate::config::{Paths, SettingsStore};
use crate::daemon::{DaemonController, DaemonState};
use crate::notification::{sanitize_field, Notification, NotificationStore};

/// Titles shown per source
const TITLES_PER_SOURCE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub source: String,
    pub count: usize,
    pub important: usize,
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total: usize,
    pub sources: Vec<SourceSummary>,
    pub enabled_sources: Vec<String>,
    pub daemon: DaemonState,
    pub fetch_interval: u64,
}

/// Group the queue by source, keeping first-appearance order
pub fn summarize_sources(notifications: &[Notification]) -> Vec<SourceSummary> {
    let mut summaries: Vec<SourceSummary> = Vec::new();
    for n in notifications {
        let idx = match summaries.iter().position(|s| s.source == n.source) {
            Some(idx) => idx,
            None => {
                summaries.push(SourceSummary {
                    source: n.source.clone(),
                    count: 0,
                    important: 0,
                    titles: Vec::new(),
                });
                summaries.len() - 1
            }
        };
        let summary = &mut summaries[idx];
        summary.count += 1;
        if n.priority.is_important() {
            summary.important += 1;
        }
        if summary.titles.len() < TITLES_PER_SOURCE {
            summary.titles.push(n.title.clone());
        }
    }
    summaries
}

pub fn build_dashboard(paths: &Paths) -> Dashboard {
    let settings = SettingsStore::load(paths);
    let notifications = NotificationStore::load(paths);

    Dashboard {
        total: notifications.len(),
        sources: summarize_sources(&notifications),
        enabled_sources: settings.enabled_sources().into_iter().map(String::from).collect(),
        daemon: DaemonController::new(paths.clone()).status(),
        fetch_interval: settings.fetch_interval,
    }
}

pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut lines = vec![
        String::new(),
        "vibenotifications Dashboard".to_string(),
        "----------------------------".to_string(),
    ];

    if dashboard.sources.is_empty() {
        lines.push("No notifications yet. Run 'vibenotify fetch' to check.".to_string());
    }
    for summary in &dashboard.sources {
        let important = if summary.important > 0 {
            format!(" ({} important)", summary.important)
        } else {
            String::new()
        };
        // source and titles come from third parties; keep escapes off the terminal
        lines.push(format!(
            "  {}: {} notifications{}",
            sanitize_field(&summary.source),
            summary.count,
            important
        ));
        for title in &summary.titles {
            lines.push(format!("    - {}", sanitize_field(title)));
        }
    }

    lines.push(String::new());
    let sources = if dashboard.enabled_sources.is_empty() {
        "none".to_string()
    } else {
        dashboard.enabled_sources.join(", ")
    };
    lines.push(format!("Sources:    {}", sources));
    lines.push(format!(
        "Daemon:     {}",
        match dashboard.daemon {
            DaemonState::Running { pid } => format!("running (pid {})", pid),
            DaemonState::Stopped => "stopped".to_string(),
        }
    ));
    lines.push(format!("Interval:   {}s", dashboard.fetch_interval));
    lines.join("\n")
}

/// Handle `dashboard`
pub fn handle_dashboard(paths: &Paths, json: bool) -> Result<()> {
    let dashboard = build_dashboard(paths);
    println!("{}", format_output(&dashboard, json, render_dashboard));
    Ok(())
}
