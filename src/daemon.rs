//! Daemon - background polling process and the fetch cycle it runs
//!
//! The daemon is a detached `vibenotify daemon-loop` process. Its pid is kept
//! in a plain-text marker file; uniqueness rests on that marker only, so two
//! concurrent `start`s can race.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{Paths, Settings, SettingsStore, SourceConfig};
use crate::notification::{merge, rank, trim_default, Notification, NotificationStore};
use crate::plugins::{Plugin, PluginRegistry};
use crate::surface::{RouteReport, SurfaceRouter};

/// Upper bound for a single plugin fetch
pub const PLUGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Subcommand the spawned daemon runs
pub const LOOP_SUBCOMMAND: &str = "daemon-loop";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DaemonState {
    Running { pid: u32 },
    Stopped,
}

impl DaemonState {
    pub fn is_running(&self) -> bool {
        matches!(self, DaemonState::Running { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: u32 },
    AlreadyRunning { pid: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { pid: u32 },
    NotRunning,
}

/// Starts, stops and probes the background daemon
pub struct DaemonController {
    paths: Paths,
    /// Program and args to spawn instead of `current_exe daemon-loop`
    command: Option<(PathBuf, Vec<String>)>,
}

impl DaemonController {
    pub fn new(paths: Paths) -> Self {
        Self { paths, command: None }
    }

    /// Controller that spawns `program args...` verbatim (tests use `sleep`)
    pub fn with_command(paths: Paths, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            paths,
            command: Some((program.into(), args)),
        }
    }

    pub fn pid_file_path(&self) -> PathBuf {
        self.paths.pid_file()
    }

    /// Pid of a live daemon
    ///
    /// A marker pointing at a dead process (or holding garbage) is stale and
    /// gets removed here.
    pub fn probe(&self) -> Option<u32> {
        let pid_file = self.pid_file_path();
        if !pid_file.exists() {
            return None;
        }

        match self.read_pid() {
            Ok(Some(pid)) if process_exists(pid) => return Some(pid),
            Ok(Some(pid)) => debug!(pid, "Daemon marker is stale, removing"),
            Ok(None) => debug!("Daemon marker unreadable, removing"),
            Err(e) => warn!(error = %e, "Failed to read daemon marker"),
        }

        if let Err(e) = self.remove_pid() {
            warn!(error = %e, "Failed to remove stale daemon marker");
        }
        None
    }

    pub fn is_running(&self) -> bool {
        self.probe().is_some()
    }

    pub fn status(&self) -> DaemonState {
        match self.probe() {
            Some(pid) => DaemonState::Running { pid },
            None => DaemonState::Stopped,
        }
    }

    pub fn write_pid(&self, pid: u32) -> Result<()> {
        self.paths.ensure_dir()?;
        fs::write(self.pid_file_path(), pid.to_string())
            .with_context(|| format!("Failed to write {}", self.pid_file_path().display()))?;
        Ok(())
    }

    /// Pid recorded in the marker; `None` when missing or not a number
    pub fn read_pid(&self) -> Result<Option<u32>> {
        let pid_file = self.pid_file_path();
        if !pid_file.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&pid_file)?;
        Ok(content.trim().parse().ok())
    }

    pub fn remove_pid(&self) -> Result<()> {
        let pid_file = self.pid_file_path();
        if pid_file.exists() {
            fs::remove_file(pid_file)?;
        }
        Ok(())
    }

    /// Spawn the daemon unless one is already alive
    pub fn start(&self, interval: u64) -> Result<StartOutcome> {
        if let Some(pid) = self.probe() {
            return Ok(StartOutcome::AlreadyRunning { pid });
        }

        self.paths.ensure_dir()?;
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.paths.log_file())
            .with_context(|| format!("Failed to open {}", self.paths.log_file().display()))?;

        let (program, args) = match &self.command {
            Some((program, args)) => (program.clone(), args.clone()),
            None => (
                std::env::current_exe().context("Cannot locate own executable")?,
                vec![
                    LOOP_SUBCOMMAND.to_string(),
                    "--interval".to_string(),
                    interval.max(1).to_string(),
                ],
            ),
        };

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log));
        // Own process group, so killing the caller's job leaves the daemon alive
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program.display()))?;

        let pid = child.id();
        self.write_pid(pid)?;
        info!(pid, interval, "Daemon started");
        Ok(StartOutcome::Started { pid })
    }

    /// Terminate the daemon and remove the marker
    pub fn stop(&self) -> Result<StopOutcome> {
        let Some(pid) = self.probe() else {
            return Ok(StopOutcome::NotRunning);
        };

        let signalled = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !signalled {
            warn!(pid, "kill -TERM failed");
        }

        self.remove_pid()?;
        info!(pid, "Daemon stopped");
        Ok(StopOutcome::Stopped { pid })
    }
}

/// `kill -0` existence check
fn process_exists(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Per-source result of one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub fetched: usize,
    /// Error message when the plugin failed or timed out
    pub error: Option<String>,
}

/// What one fetch cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub sources: Vec<SourceOutcome>,
    /// Notifications that were not already stored
    pub added: usize,
    /// Size of the persisted queue after the cycle
    pub stored: usize,
    /// `None` when no source was enabled
    pub route: Option<RouteReport>,
}

impl CycleReport {
    pub fn fetched(&self) -> usize {
        self.sources.iter().map(|s| s.fetched).sum()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.source.as_str())
            .collect()
    }
}

/// One fetch cycle with the default plugin timeout
pub async fn fetch_once(registry: &PluginRegistry, paths: &Paths) -> Result<CycleReport> {
    fetch_once_with_timeout(registry, paths, PLUGIN_TIMEOUT).await
}

/// Fetch every enabled source, merge into the store, and route the result
///
/// Plugins run one after another. A plugin that errors or exceeds
/// `plugin_timeout` contributes nothing; the rest of the cycle carries on.
pub async fn fetch_once_with_timeout(
    registry: &PluginRegistry,
    paths: &Paths,
    plugin_timeout: Duration,
) -> Result<CycleReport> {
    let settings = SettingsStore::load(paths);
    let enabled = registry.enabled(&settings);
    let mut report = CycleReport::default();

    if enabled.is_empty() {
        info!("No sources enabled, nothing to fetch");
        return Ok(report);
    }

    let mut incoming: Vec<Notification> = Vec::new();
    for (plugin, config) in enabled {
        let outcome = match fetch_isolated(plugin, config, plugin_timeout).await {
            Ok(items) => {
                debug!(source = plugin.name(), count = items.len(), "Fetched");
                let fetched = items.len();
                incoming.extend(items);
                SourceOutcome {
                    source: plugin.name().to_string(),
                    fetched,
                    error: None,
                }
            }
            Err(e) => {
                warn!(source = plugin.name(), error = %e, "Fetch failed");
                SourceOutcome {
                    source: plugin.name().to_string(),
                    fetched: 0,
                    error: Some(format!("{:#}", e)),
                }
            }
        };
        report.sources.push(outcome);
    }

    let existing = NotificationStore::load(paths);
    let existing_count = existing
        .iter()
        .filter(|n| n.has_id())
        .map(|n| n.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let merged = merge(existing, incoming);
    report.added = merged.len().saturating_sub(existing_count);

    let ranked = rank(trim_default(merged));
    NotificationStore::save(paths, &ranked)?;
    report.stored = ranked.len();

    report.route = Some(route(paths, &settings, &ranked));
    Ok(report)
}

async fn fetch_isolated(
    plugin: &dyn Plugin,
    config: &SourceConfig,
    plugin_timeout: Duration,
) -> Result<Vec<Notification>> {
    match tokio::time::timeout(plugin_timeout, plugin.fetch(config)).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("timed out after {}s", plugin_timeout.as_secs()),
    }
}

fn route(paths: &Paths, settings: &Settings, ranked: &[Notification]) -> RouteReport {
    SurfaceRouter::new(paths.clone()).route(
        ranked,
        &settings.surfaces,
        &settings.priority,
        &mut rand::thread_rng(),
    )
}

/// Body of `daemon-loop`: fetch, sleep, repeat until SIGTERM / Ctrl-C
pub async fn run_loop(registry: PluginRegistry, paths: Paths, interval: u64) -> Result<()> {
    let controller = DaemonController::new(paths.clone());
    let own_pid = std::process::id();
    controller.write_pid(own_pid)?;

    let interval = interval.max(1);
    info!(pid = own_pid, interval, "Daemon loop running");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        match fetch_once(&registry, &paths).await {
            Ok(report) => info!(
                fetched = report.fetched(),
                added = report.added,
                stored = report.stored,
                failed = report.failed().len(),
                "Fetch cycle complete"
            ),
            Err(e) => error!(error = %e, "Fetch cycle failed"),
        }

        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Only clear the marker if it is still ours
    if matches!(controller.read_pid(), Ok(Some(pid)) if pid == own_pid) {
        controller.remove_pid()?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths(dir: &TempDir) -> Paths {
        Paths::with_root(dir.path().join("data"), dir.path().join("host.json"))
    }

    /// Pid of a process that has already exited and been reaped
    fn dead_pid() -> u32 {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn test_pid_file_path() {
        let dir = TempDir::new().unwrap();
        let controller = DaemonController::new(test_paths(&dir));
        assert!(controller.pid_file_path().ends_with("daemon.pid"));
    }

    #[test]
    fn test_not_running_without_marker() {
        let dir = TempDir::new().unwrap();
        let controller = DaemonController::new(test_paths(&dir));
        assert!(!controller.is_running());
        assert_eq!(controller.status(), DaemonState::Stopped);
    }

    #[test]
    fn test_write_and_read_pid() {
        let dir = TempDir::new().unwrap();
        let controller = DaemonController::new(test_paths(&dir));
        let own_pid = std::process::id();

        controller.write_pid(own_pid).unwrap();
        assert_eq!(controller.read_pid().unwrap(), Some(own_pid));
        assert_eq!(controller.status(), DaemonState::Running { pid: own_pid });

        controller.remove_pid().unwrap();
        assert!(!controller.is_running());
    }

    #[test]
    fn test_probe_removes_stale_marker() {
        let dir = TempDir::new().unwrap();
        let controller = DaemonController::new(test_paths(&dir));
        controller.write_pid(dead_pid()).unwrap();

        assert_eq!(controller.probe(), None);
        assert!(!controller.pid_file_path().exists());
    }

    #[test]
    fn test_probe_removes_garbage_marker() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        paths.ensure_dir().unwrap();
        fs::write(paths.pid_file(), "not-a-pid").unwrap();

        let controller = DaemonController::new(paths);
        assert!(!controller.is_running());
        assert!(!controller.pid_file_path().exists());
    }

    #[test]
    fn test_stop_when_not_running() {
        let dir = TempDir::new().unwrap();
        let controller = DaemonController::new(test_paths(&dir));
        assert_eq!(controller.stop().unwrap(), StopOutcome::NotRunning);
    }

    #[test]
    fn test_daemon_state_serializes() {
        let json = serde_json::to_value(DaemonState::Running { pid: 42 }).unwrap();
        assert_eq!(json, serde_json::json!({"state": "running", "pid": 42}));
        let json = serde_json::to_value(DaemonState::Stopped).unwrap();
        assert_eq!(json, serde_json::json!({"state": "stopped"}));
    }

    #[tokio::test]
    async fn test_fetch_once_without_sources_is_noop() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        let report = fetch_once(&PluginRegistry::builtin(), &paths).await.unwrap();

        assert!(report.sources.is_empty());
        assert!(report.route.is_none());
        assert!(!paths.notifications_file().exists());
    }
}
