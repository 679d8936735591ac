//! Calendar plugin - upcoming meetings from an ICS feed or macOS Calendar
//!
//! Priority follows how soon the meeting starts:
//! - URGENT: within 5 minutes either side of the start
//! - HIGH: within the configured lookahead
//! - LOW: later today / within the next hour past the lookahead

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use super::{http_client, require, ConfigField, Plugin};
use crate::config::SourceConfig;
use crate::notification::{Notification, Priority};

/// Default alert lookahead in minutes
const DEFAULT_LOOKAHEAD: i64 = 10;
/// Minutes around the start time that count as "starting now"
const STARTING_NOW_MINUTES: f64 = 5.0;

pub struct CalendarPlugin;

/// A parsed VEVENT
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub location: Option<String>,
    pub uid: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CalendarSource {
    Macos,
    Ics,
}

impl CalendarSource {
    fn from_config(config: &SourceConfig) -> Option<Self> {
        match config.option("source")?.to_lowercase().as_str() {
            "macos" => Some(Self::Macos),
            "ics" => Some(Self::Ics),
            _ => None,
        }
    }
}

fn lookahead(config: &SourceConfig) -> i64 {
    config
        .option("lookahead")
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| (1..=120).contains(v))
        .unwrap_or(DEFAULT_LOOKAHEAD)
}

/// Priority and body prefix for a meeting `minutes_until` away; `None` if past
fn classify(minutes_until: f64, lookahead: i64) -> Option<(Priority, String)> {
    if minutes_until <= -STARTING_NOW_MINUTES {
        return None;
    }
    if minutes_until <= STARTING_NOW_MINUTES {
        return Some((Priority::Urgent, "Starting now!".to_string()));
    }
    if minutes_until <= lookahead as f64 {
        return Some((Priority::High, format!("In {} min", minutes_until.round() as i64)));
    }
    Some((Priority::Low, String::new()))
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

fn slug(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase()
}

// ---------------------------------------------------------------------------
// ICS
// ---------------------------------------------------------------------------

fn ics_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})(\d{2})(\d{2})T?(\d{2})?(\d{2})?(\d{2})?(Z)?").unwrap()
    })
}

/// Parse a DTSTART value ("20260301T100000Z", "TZID=Europe/Paris:20260301T100000", "20260301")
///
/// Values without `Z` are read as local time.
pub fn parse_ics_date(value: &str) -> Option<DateTime<Utc>> {
    let clean = value.rsplit(':').next().unwrap_or(value);
    let caps = ics_date_regex().captures(clean)?;
    let num = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, num(2)?, num(3)?)?;
    let naive: NaiveDateTime = date.and_hms_opt(num(4)?, num(5)?, num(6)?)?;
    if caps.get(7).is_some() {
        Some(Utc.from_utc_datetime(&naive))
    } else {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Extract `NAME:value` / `NAME;params:value` from a VEVENT block
fn ics_field(block: &str, name: &str) -> Option<String> {
    block.lines().find_map(|line| {
        let line = line.trim_end_matches('\r');
        let rest = line.strip_prefix(name)?;
        let value = rest.strip_prefix(':').or_else(|| rest.strip_prefix(';'))?;
        Some(value.trim().to_string())
    })
}

/// Parse every VEVENT with a summary and a start time
pub fn parse_ics(text: &str) -> Vec<CalendarEvent> {
    text.split("BEGIN:VEVENT")
        .skip(1)
        .filter_map(|chunk| {
            let block = chunk.split("END:VEVENT").next().unwrap_or("");
            let summary = ics_field(block, "SUMMARY")?;
            let start = ics_field(block, "DTSTART").and_then(|v| parse_ics_date(&v))?;
            Some(CalendarEvent {
                summary,
                start,
                location: ics_field(block, "LOCATION").filter(|s| !s.is_empty()),
                uid: ics_field(block, "UID").filter(|s| !s.is_empty()),
                url: ics_field(block, "URL").filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

/// Turn parsed events into notifications as of `now`
pub fn ics_notifications(events: &[CalendarEvent], now: DateTime<Utc>, lookahead: i64) -> Vec<Notification> {
    let window_end = now + chrono::Duration::minutes(lookahead + 60);

    events
        .iter()
        .filter(|e| e.start <= window_end)
        .filter_map(|event| {
            let (priority, mut body) = classify(minutes_between(now, event.start), lookahead)?;
            if body.is_empty() {
                body = format!("At {}", event.start.with_timezone(&Local).format("%H:%M"));
            }
            if let Some(location) = &event.location {
                body.push_str(&format!(" - {}", location));
            }

            let key = event.uid.clone().unwrap_or_else(|| slug(&event.summary));
            Some(
                Notification::new(
                    format!("calendar-ics-{}-{}", key, event.start.format("%Y-%m-%d")),
                    "calendar",
                    format!("Meeting: {}", event.summary),
                )
                .with_body(body)
                .with_url(event.url.clone().unwrap_or_default())
                .with_priority(priority)
                .with_timestamp(now)
                .with_actionable(priority.is_important()),
            )
        })
        .collect()
}

async fn fetch_ics_text(url: &str) -> Result<String> {
    let res = http_client()?.get(url).send().await?;
    if !res.status().is_success() {
        bail!("HTTP {}", res.status());
    }
    Ok(res.text().await?)
}

// ---------------------------------------------------------------------------
// macOS (icalBuddy)
// ---------------------------------------------------------------------------

fn icalbuddy_title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[•\-]\s*(.+?)(?:\s*\(([^)]+)\))?$").unwrap())
}

fn icalbuddy_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*([AP]M)").unwrap())
}

/// "10:30 AM" today, local time
fn parse_clock(caps: &regex::Captures<'_>, today: NaiveDate) -> Option<DateTime<Utc>> {
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let pm = caps[3].eq_ignore_ascii_case("PM");
    if pm && hour != 12 {
        hour += 12;
    }
    if !pm && hour == 12 {
        hour = 0;
    }
    let naive = today.and_hms_opt(hour, minute, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse `icalBuddy -nc -nrd -ea -n` output
pub fn parse_icalbuddy(output: &str, now: DateTime<Utc>, lookahead: i64) -> Vec<Notification> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let today = now.with_timezone(&Local).date_naive();
    let mut notifications = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = icalbuddy_title_regex().captures(line.trim()) else {
            continue;
        };
        let title = caps[1].trim().to_string();
        let calendar = caps.get(2).map(|m| m.as_str().to_string());
        let mut body = calendar.map(|c| format!("Calendar: {}", c)).unwrap_or_default();
        let mut priority = Priority::Normal;

        let time_caps = lines.get(i + 1).and_then(|l| icalbuddy_time_regex().captures(l));
        if let Some(start) = time_caps.as_ref().and_then(|c| parse_clock(c, today)) {
            match classify(minutes_between(now, start), lookahead) {
                Some((p, prefix)) => {
                    priority = p;
                    let prefix = if prefix.is_empty() {
                        format!("At {}", start.with_timezone(&Local).format("%H:%M"))
                    } else {
                        prefix
                    };
                    body = if body.is_empty() {
                        prefix
                    } else {
                        format!("{}. {}", prefix, body)
                    };
                }
                None => continue,
            }
        }

        notifications.push(
            Notification::new(
                format!("calendar-{}-{}", slug(&title), today.format("%Y-%m-%d")),
                "calendar",
                format!("Meeting: {}", title),
            )
            .with_body(body)
            .with_priority(priority)
            .with_timestamp(now)
            .with_actionable(priority.is_important()),
        );
    }

    notifications
}

async fn run_icalbuddy() -> Result<String> {
    let output = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::process::Command::new("icalBuddy")
            .args(["-nc", "-nrd", "-ea", "-n", "-li", "10", "eventsFrom:today", "to:today"])
            .output(),
    )
    .await
    .context("icalBuddy timed out")??;

    if !output.status.success() {
        bail!("icalBuddy exited with {}", output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl Plugin for CalendarPlugin {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn display_name(&self) -> &'static str {
        "Calendar"
    }

    fn required_config(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("source", "Calendar source (macos or ics)")
                .placeholder("ics")
                .instructions(
                    "Choose your calendar source:\n   \
                     macos - Apple Calendar (requires icalBuddy: brew install icalbuddy)\n   \
                     ics   - Google Calendar, Outlook, or any .ics URL",
                )
                .validate(|v| match v.trim().to_lowercase().as_str() {
                    "macos" | "ics" => Ok(()),
                    _ => Err("Enter 'macos' or 'ics'.".to_string()),
                }),
            ConfigField::new("icsUrl", "ICS calendar URL")
                .placeholder("https://calendar.google.com/calendar/ical/.../basic.ics")
                .instructions("Paste the full .ics URL (leave empty for macos).")
                .optional()
                .validate(|v| {
                    if v.starts_with("https://") {
                        Ok(())
                    } else {
                        Err("URL must start with https://".to_string())
                    }
                }),
            ConfigField::new("lookahead", "Alert minutes before meeting")
                .placeholder("10")
                .optional()
                .validate(|v| match v.parse::<i64>() {
                    Ok(n) if (1..=120).contains(&n) => Ok(()),
                    _ => Err("Enter a number between 1 and 120.".to_string()),
                }),
        ]
    }

    async fn setup(&self, config: &SourceConfig) -> Result<serde_json::Value> {
        let lookahead = lookahead(config);
        match CalendarSource::from_config(config) {
            Some(CalendarSource::Macos) => {
                if !cfg!(target_os = "macos") {
                    bail!("macOS Calendar is only available on macOS.");
                }
                which::which("icalBuddy")
                    .context("icalBuddy not found. Install it with: brew install icalbuddy")?;
                Ok(json!({
                    "connected": true,
                    "source": "Apple Calendar (icalBuddy)",
                    "lookahead": format!("{}min", lookahead),
                }))
            }
            Some(CalendarSource::Ics) => {
                let url = require(config, "icsUrl")?;
                let text = fetch_ics_text(url)
                    .await
                    .context("Could not fetch calendar")?;
                if !text.contains("BEGIN:VCALENDAR") {
                    bail!("URL does not contain valid ICS data.");
                }
                Ok(json!({
                    "connected": true,
                    "source": "ICS feed",
                    "lookahead": format!("{}min", lookahead),
                }))
            }
            None => bail!("Choose 'macos' or 'ics' as your calendar source."),
        }
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Notification>> {
        let lookahead = lookahead(config);
        match CalendarSource::from_config(config) {
            Some(CalendarSource::Macos) => {
                if !cfg!(target_os = "macos") {
                    return Ok(Vec::new());
                }
                let output = run_icalbuddy().await?;
                Ok(parse_icalbuddy(&output, Utc::now(), lookahead))
            }
            Some(CalendarSource::Ics) => {
                let text = fetch_ics_text(require(config, "icsUrl")?).await?;
                let events = parse_ics(&text);
                debug!(events = events.len(), "Parsed ICS feed");
                Ok(ics_notifications(&events, Utc::now(), lookahead))
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const SAMPLE_ICS: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:abc-123\r\n\
SUMMARY:Standup\r\n\
DTSTART:20260301T100000Z\r\n\
LOCATION:Room 4\r\n\
URL:https://meet.example.com/standup\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Planning\r\n\
DTSTART;TZID=Europe/Paris:20260301T150000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:no-summary\r\n\
DTSTART:20260301T100000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_ics_date_utc() {
        let dt = parse_ics_date("20260301T100000Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_ics_date_with_params_and_date_only() {
        assert!(parse_ics_date("TZID=Europe/Paris:20260301T150000").is_some());
        assert!(parse_ics_date("VALUE=DATE:20260301").is_some());
        assert!(parse_ics_date("garbage").is_none());
    }

    #[test]
    fn test_parse_ics() {
        let events = parse_ics(SAMPLE_ICS);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "Standup");
        assert_eq!(events[0].uid.as_deref(), Some("abc-123"));
        assert_eq!(events[0].location.as_deref(), Some("Room 4"));
        assert_eq!(events[0].url.as_deref(), Some("https://meet.example.com/standup"));
        assert_eq!(events[1].summary, "Planning");
        assert!(events[1].uid.is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(-10.0, 10), None);
        assert_eq!(classify(-2.0, 10).unwrap().0, Priority::Urgent);
        assert_eq!(classify(3.0, 10).unwrap().0, Priority::Urgent);
        let (p, body) = classify(8.0, 10).unwrap();
        assert_eq!(p, Priority::High);
        assert_eq!(body, "In 8 min");
        assert_eq!(classify(45.0, 10).unwrap().0, Priority::Low);
    }

    #[test]
    fn test_ics_notifications_window_and_priority() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let event = |summary: &str, offset_min: i64| CalendarEvent {
            summary: summary.to_string(),
            start: start + ChronoDuration::minutes(offset_min),
            location: None,
            uid: None,
            url: None,
        };
        let events = vec![
            event("Past", -30),
            event("Now", 2),
            event("Soon", 8),
            event("Later", 50),
            event("Tomorrow", 24 * 60),
        ];

        let notifications = ics_notifications(&events, start, 10);
        let titles: Vec<&str> = notifications.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Meeting: Now", "Meeting: Soon", "Meeting: Later"]);
        assert_eq!(notifications[0].priority, Priority::Urgent);
        assert!(notifications[0].actionable);
        assert_eq!(notifications[1].priority, Priority::High);
        assert_eq!(notifications[2].priority, Priority::Low);
        assert!(!notifications[2].actionable);
        assert_eq!(notifications[0].id, "calendar-ics-now-2026-03-01");
    }

    #[test]
    fn test_ics_notification_uses_uid_and_location() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 55, 0).unwrap();
        let events = parse_ics(SAMPLE_ICS);
        let notifications = ics_notifications(&events[..1], now, 10);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].id, "calendar-ics-abc-123-2026-03-01");
        assert_eq!(notifications[0].body, "Starting now! - Room 4");
        assert_eq!(notifications[0].url.as_deref(), Some("https://meet.example.com/standup"));
    }

    #[test]
    fn test_parse_icalbuddy_without_times() {
        let output = "• Team sync (Work)\n• Lunch\n";
        let notifications = parse_icalbuddy(output, Utc::now(), 10);
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].title, "Meeting: Team sync");
        assert_eq!(notifications[0].body, "Calendar: Work");
        assert_eq!(notifications[0].priority, Priority::Normal);
        assert!(notifications[1].id.starts_with("calendar-lunch-"));
    }

    #[test]
    fn test_lookahead_config() {
        assert_eq!(lookahead(&SourceConfig::enabled()), 10);
        assert_eq!(lookahead(&SourceConfig::enabled().with_option("lookahead", "30")), 30);
        assert_eq!(lookahead(&SourceConfig::enabled().with_option("lookahead", "500")), 10);
    }
}
