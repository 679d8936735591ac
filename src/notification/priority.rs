//! Priority classification for notifications
//!
//! Priority decides both ordering and which surfaces a notification reaches:
//! - URGENT: starting now / blocking (meeting in 5 minutes)
//! - HIGH: should act soon (review requested, CI failing, big market move)
//! - NORMAL: worth knowing (new DM, regular GitHub activity)
//! - LOW: background noise (far-away events, connected MCP servers)

use serde::{Deserialize, Deserializer, Serialize};

/// Priority level for notifications
///
/// Values that fail to parse (or are missing) fall back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

/// Any JSON value is accepted; names go through `parse_priority`, anything else is `Normal`
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(parse_priority).unwrap_or_default())
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_priority(s))
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Sort rank, smaller is more urgent
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }

    /// `urgent` or `high`
    pub fn is_important(&self) -> bool {
        self.rank() <= Priority::High.rank()
    }
}

/// Parse a priority name (case-insensitive); unknown names are `Normal`
pub fn parse_priority(value: &str) -> Priority {
    match value.trim().to_lowercase().as_str() {
        "urgent" => Priority::Urgent,
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Normal,
    }
}

/// Check whether a notification priority satisfies a surface threshold
pub fn meets_threshold(priority: Priority, min: Priority) -> bool {
    priority.rank() <= min.rank()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meets_threshold() {
        // Urgent always passes
        assert!(meets_threshold(Priority::Urgent, Priority::Urgent));
        assert!(meets_threshold(Priority::Urgent, Priority::Low));

        // Normal passes normal and low
        assert!(!meets_threshold(Priority::Normal, Priority::High));
        assert!(meets_threshold(Priority::Normal, Priority::Normal));
        assert!(meets_threshold(Priority::Normal, Priority::Low));

        // Low only passes low
        assert!(!meets_threshold(Priority::Low, Priority::Normal));
        assert!(meets_threshold(Priority::Low, Priority::Low));
    }

    #[test]
    fn test_parse_priority_unknown_is_normal() {
        assert_eq!(parse_priority("URGENT"), Priority::Urgent);
        assert_eq!(parse_priority(" high "), Priority::High);
        assert_eq!(parse_priority("low"), Priority::Low);
        assert_eq!(parse_priority("critical"), Priority::Normal);
        assert_eq!(parse_priority(""), Priority::Normal);
    }

    #[test]
    fn test_priority_deserialize_unknown_value() {
        let p: Priority = serde_json::from_str(r#""whenever""#).unwrap();
        assert_eq!(p, Priority::Normal);
        let p: Priority = serde_json::from_str(r#""urgent""#).unwrap();
        assert_eq!(p, Priority::Urgent);
        let p: Priority = serde_json::from_str(r#""HIGH""#).unwrap();
        assert_eq!(p, Priority::High);
    }

    #[test]
    fn test_priority_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::Urgent).unwrap(), r#""urgent""#);
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(format!("{}", Priority::Urgent), "urgent");
        assert_eq!(Priority::Low.to_string(), "low");
    }

    #[test]
    fn test_is_important() {
        assert!(Priority::Urgent.is_important());
        assert!(Priority::High.is_important());
        assert!(!Priority::Normal.is_important());
        assert!(!Priority::Low.is_important());
    }
}
