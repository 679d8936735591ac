//! Notification pipeline core
//!
//! # Flow
//! 1. `queue::merge` folds freshly fetched items into the stored set (dedup by id)
//! 2. `queue::trim` drops stale entries and caps the count
//! 3. `queue::rank` orders by priority, then recency
//! 4. `NotificationStore::save` persists the ranked queue
//!
//! Anything shown to the host goes through `sanitize` first.

pub mod priority;
pub mod queue;
pub mod record;
pub mod sanitize;
pub mod store;

pub use priority::{meets_threshold, parse_priority, Priority};
pub use queue::{filter_by_min_priority, merge, rank, trim, trim_at, trim_default, MAX_AGE_HOURS, MAX_COUNT};
pub use record::Notification;
pub use sanitize::{safe_url, sanitize, sanitize_field, MAX_FIELD_LEN};
pub use store::NotificationStore;
