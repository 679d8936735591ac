//! Uninstall - stop the daemon, remove host hooks, delete all local state

use anyhow::{Context, Result};
use std::fs;
use tracing::warn;

use super::setup::remove_host_hooks;
use crate::config::Paths;
use crate::daemon::{DaemonController, StopOutcome};

/// Handle `uninstall`
pub fn handle_uninstall(paths: &Paths) -> Result<()> {
    println!();

    match DaemonController::new(paths.clone()).stop() {
        Ok(StopOutcome::Stopped { pid }) => println!("  Stopped daemon (pid {})", pid),
        Ok(StopOutcome::NotRunning) => {}
        Err(e) => warn!(error = %e, "Failed to stop daemon"),
    }

    if remove_host_hooks(paths)? {
        println!("  Removed Claude Code hooks");
    }

    let data_dir = paths.data_dir();
    if data_dir.exists() {
        fs::remove_dir_all(data_dir)
            .with_context(|| format!("Failed to delete {}", data_dir.display()))?;
        println!("  Cleaned up {}", data_dir.display());
    }

    println!();
    println!("vibenotifications removed.");
    Ok(())
}
