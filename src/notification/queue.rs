//! Notification queue operations - merge, rank, trim, filter
//!
//! All functions here are pure: they take sequences and return new ones.
//!
//! ## Dedup policy
//! Merge never overwrites. Once an id is stored, later fetches carrying the
//! same id are ignored until the stored copy ages out through `trim`.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::debug;

use super::priority::{meets_threshold, Priority};
use super::record::Notification;

/// Default retention window
pub const MAX_AGE_HOURS: i64 = 24;
/// Default number of notifications kept
pub const MAX_COUNT: usize = 100;

/// Merge freshly fetched notifications into the stored set
///
/// Incoming items whose id is already stored are dropped; the rest are
/// placed ahead of the existing items. Records without an id are discarded,
/// and a stored id that appears twice keeps only its first copy.
pub fn merge(existing: Vec<Notification>, incoming: Vec<Notification>) -> Vec<Notification> {
    let mut seen: HashSet<String> = HashSet::with_capacity(existing.len() + incoming.len());
    let existing: Vec<Notification> = existing
        .into_iter()
        .filter(|n| n.has_id() && seen.insert(n.id.clone()))
        .collect();

    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    for n in incoming {
        if !n.has_id() {
            debug!(source = %n.source, "Dropping notification without id");
            continue;
        }
        // insert() also collapses duplicates inside the same batch
        if seen.insert(n.id.clone()) {
            merged.push(n);
        }
    }
    merged.extend(existing);
    merged
}

/// Order by priority (urgent first), then by timestamp (newest first)
///
/// The sort is stable, so equal keys keep their incoming order.
pub fn rank(mut notifications: Vec<Notification>) -> Vec<Notification> {
    notifications.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    notifications
}

/// Drop entries older than `max_age`, then keep the first `max_count`
///
/// The count cap applies to the current order of the input, which is not
/// necessarily priority order.
pub fn trim(notifications: Vec<Notification>, max_age: Duration, max_count: usize) -> Vec<Notification> {
    trim_at(notifications, Utc::now(), max_age, max_count)
}

/// `trim` against an explicit clock
pub fn trim_at(
    notifications: Vec<Notification>,
    now: DateTime<Utc>,
    max_age: Duration,
    max_count: usize,
) -> Vec<Notification> {
    let cutoff = now - max_age;
    notifications
        .into_iter()
        .filter(|n| n.timestamp > cutoff)
        .take(max_count)
        .collect()
}

/// `trim` with the default 24h / 100 entries policy
pub fn trim_default(notifications: Vec<Notification>) -> Vec<Notification> {
    trim(notifications, Duration::hours(MAX_AGE_HOURS), MAX_COUNT)
}

/// Keep notifications at or above `min` priority
pub fn filter_by_min_priority(notifications: &[Notification], min: Priority) -> Vec<&Notification> {
    notifications
        .iter()
        .filter(|n| meets_threshold(n.priority, min))
        .collect()
}
