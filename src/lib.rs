//! vibe-notifications - aggregate notifications from your tools into Claude Code

pub mod cli;
pub mod config;
pub mod daemon;
pub mod notification;
pub mod plugins;
pub mod surface;

pub use config::{Paths, Settings, SettingsStore, SourceConfig};
pub use daemon::{
    fetch_once, fetch_once_with_timeout, run_loop, CycleReport, DaemonController, DaemonState,
    SourceOutcome, StartOutcome, StopOutcome,
};
pub use notification::{Notification, NotificationStore, Priority};
pub use plugins::{Plugin, PluginRegistry};
pub use surface::{RouteReport, SendResult, SurfaceRouter};
