//! Notification store - the persisted, ranked queue (`notifications.json`)
//!
//! There is no locking: a manual `fetch` racing the daemon's own cycle
//! means the last writer wins.

use anyhow::Result;
use std::fs;
use tracing::{debug, warn};

use super::record::Notification;
use crate::config::{write_json_atomic, Paths};

/// Persisted notification queue
pub struct NotificationStore;

impl NotificationStore {
    /// Load the stored queue
    ///
    /// Missing file -> empty. A corrupt file is logged and treated as empty;
    /// individual malformed records are skipped.
    pub fn load(paths: &Paths) -> Vec<Notification> {
        let path = paths.notifications_file();
        if !path.exists() {
            return Vec::new();
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read notifications");
                return Vec::new();
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Notification store corrupt, starting empty");
                return Vec::new();
            }
        };

        let total = values.len();
        let records: Vec<Notification> = values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();

        if records.len() < total {
            debug!(skipped = total - records.len(), "Skipped malformed notification records");
        }
        records
    }

    /// Replace the stored queue
    pub fn save(paths: &Paths, notifications: &[Notification]) -> Result<()> {
        paths.ensure_dir()?;
        write_json_atomic(&paths.notifications_file(), notifications)
    }

    /// Head of the queue, if any
    pub fn top(paths: &Paths) -> Option<Notification> {
        Self::load(paths).into_iter().next()
    }
}
