//! `fetch` command

use anyhow::Result;

use crate::config::Paths;
use crate::daemon::{fetch_once, CycleReport};
use crate::plugins::PluginRegistry;

/// Text report for one cycle; ends with the session digest when one was built
pub fn render_cycle(report: &CycleReport) -> String {
    if report.sources.is_empty() {
        return "No sources enabled. Run 'vibenotify add <plugin>' first.".to_string();
    }

    let mut lines = Vec::new();
    for source in &report.sources {
        match &source.error {
            Some(e) => lines.push(format!("  {}: failed ({})", source.source, e)),
            None => lines.push(format!("  {}: {}", source.source, source.fetched)),
        }
    }
    lines.push(format!(
        "Fetched {} notifications ({} new), {} stored.",
        report.fetched(),
        report.added,
        report.stored
    ));

    if let Some(summary) = report.route.as_ref().and_then(|r| r.summary.as_ref()) {
        lines.push(String::new());
        lines.push(summary.clone());
    }
    lines.join("\n")
}

pub async fn handle_fetch(registry: &PluginRegistry, paths: &Paths) -> Result<()> {
    let report = fetch_once(registry, paths).await?;
    println!("{}", render_cycle(&report));
    Ok(())
}
