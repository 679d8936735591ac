//! Session summary - plain-text digest printed by the session-start hook

use crate::notification::sanitize::sanitize_field;
use crate::notification::Notification;

pub const SUMMARY_HEADER: &str = "[vibenotifications] Here's what you missed:";

/// Group the ranked queue by source and render one line per source
///
/// Sources appear in order of their highest-ranked notification. The first
/// urgent/high title of each source is included as an example.
pub fn session_summary(ranked: &[Notification]) -> Option<String> {
    if ranked.is_empty() {
        return None;
    }

    let mut groups: Vec<(&str, Vec<&Notification>)> = Vec::new();
    for n in ranked {
        match groups.iter_mut().find(|(source, _)| *source == n.source.as_str()) {
            Some((_, items)) => items.push(n),
            None => groups.push((n.source.as_str(), vec![n])),
        }
    }

    let mut lines = vec![SUMMARY_HEADER.to_string()];
    for (source, items) in groups {
        let source = sanitize_field(source);
        let important: Vec<&&Notification> = items.iter().filter(|n| n.priority.is_important()).collect();
        match important.first() {
            Some(example) => lines.push(format!(
                "  - {}: {} notifications ({} important: {})",
                source,
                items.len(),
                important.len(),
                sanitize_field(&example.title)
            )),
            None => lines.push(format!("  - {}: {} notifications", source, items.len())),
        }
    }

    Some(lines.join("\n"))
}
