//! Status pointer surface - "current notification" for the host status line
//!
//! The pointer is valid for `STATUS_TTL_SECS`; after that readers fall back
//! to the head of the persisted queue.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use super::{SendResult, Surface};
use crate::config::{read_json, write_json_atomic, Paths};
use crate::notification::sanitize::{safe_url, sanitize_field};
use crate::notification::{filter_by_min_priority, Notification, NotificationStore, Priority};

/// Pointer time-to-live (5 minutes)
pub const STATUS_TTL_SECS: i64 = 5 * 60;

/// On-disk pointer: `{ notification, timestamp }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPointer {
    pub notification: Notification,
    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl StatusPointer {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp < Duration::seconds(STATUS_TTL_SECS)
    }
}

pub struct StatusSurface {
    path: PathBuf,
    min_priority: Priority,
}

impl StatusSurface {
    pub fn new(path: PathBuf, min_priority: Priority) -> Self {
        Self { path, min_priority }
    }
}

impl Surface for StatusSurface {
    fn name(&self) -> &str {
        "status"
    }

    fn deliver(&self, ranked: &[Notification]) -> Result<SendResult> {
        let Some(top) = filter_by_min_priority(ranked, self.min_priority).into_iter().next() else {
            return Ok(SendResult::Skipped("no notifications above threshold".to_string()));
        };

        let pointer = StatusPointer {
            notification: top.clone(),
            timestamp: Utc::now(),
        };
        write_json_atomic(&self.path, &pointer)?;
        Ok(SendResult::Sent)
    }
}

/// Notification the status line should show at `now`
///
/// Fresh pointer first, otherwise the top of the queue.
pub fn read_current(paths: &Paths, now: DateTime<Utc>) -> Option<Notification> {
    let path = paths.current_file();
    if path.exists() {
        match read_json::<StatusPointer>(&path) {
            Ok(pointer) if pointer.is_fresh(now) => return Some(pointer.notification),
            Ok(_) => debug!("Status pointer expired, falling back to queue"),
            Err(e) => debug!(error = %e, "Status pointer unreadable, falling back to queue"),
        }
    }
    NotificationStore::top(paths)
}

/// Render the status line (ANSI colors, OSC 8 hyperlink for the url)
pub fn render_statusline(notification: Option<&Notification>) -> String {
    let Some(n) = notification else {
        return "\x1b[90mvibenotifications | no new notifications\x1b[0m".to_string();
    };

    let tag = sanitize_field(&n.source).to_uppercase();
    let mut out = format!("\x1b[33m[{}]\x1b[0m {}", tag, sanitize_field(&n.title));
    if let Some(url) = safe_url(n.url.as_deref()) {
        out.push_str(&format!(
            "\n\x1b[90m  \x1b]8;;{url}\x07{url}\x1b]8;;\x07\x1b[0m",
            url = url
        ));
    }
    out
}
