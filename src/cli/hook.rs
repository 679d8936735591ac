//! Host hook entrypoints: `hook post-tool`, `hook session-start`, `statusline`
//!
//! These run inside the host's own hook pipeline, so they never fail:
//! errors are logged to stderr and the command still exits 0.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use rand::Rng;
use std::io::Read;
use tracing::debug;

use crate::config::{Paths, Settings, SettingsStore};
use crate::notification::NotificationStore;
use crate::surface::{
    context_injection, deliver_fail_open, read_current, render_statusline, session_summary,
    SpinnerSurface,
};

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// After each tool call: refresh spinner verbs, maybe inject context
    PostTool,
    /// At session start: print the "what you missed" summary
    SessionStart,
}

/// Output for the post-tool hook: refresh the spinner, then sample an injection
pub fn post_tool_output<R: Rng + ?Sized>(paths: &Paths, settings: &Settings, rng: &mut R) -> Option<String> {
    let ranked = NotificationStore::load(paths);
    if ranked.is_empty() {
        return None;
    }

    let surfaces = &settings.surfaces;
    if surfaces.spinner_verbs.enabled {
        let spinner = SpinnerSurface::new(
            paths.host_settings(),
            surfaces.spinner_verbs.max_length,
            settings.priority.min_spinner,
        );
        deliver_fail_open(&spinner, &ranked);
    }

    if !surfaces.context_injection.enabled {
        return None;
    }
    let output = context_injection(
        &ranked,
        settings.priority.min_context_injection,
        surfaces.context_injection.rate,
        rng,
    )?;
    match serde_json::to_string(&output) {
        Ok(line) => Some(line),
        Err(e) => {
            debug!(error = %e, "Failed to encode hook output");
            None
        }
    }
}

/// Output for the session-start hook
pub fn session_start_output(paths: &Paths, settings: &Settings) -> Option<String> {
    if !settings.surfaces.session_summary.enabled {
        return None;
    }
    session_summary(&NotificationStore::load(paths))
}

/// Status line text at `now`
pub fn statusline_output(paths: &Paths, now: DateTime<Utc>) -> String {
    render_statusline(read_current(paths, now).as_ref())
}

/// Handle `hook <event>`
pub fn handle_hook(event: HookEvent, paths: &Paths) {
    // The host pipes a JSON event on stdin; drain it so the writer never blocks
    drain_input(std::io::stdin());

    let settings = SettingsStore::load(paths);
    let output = match event {
        HookEvent::PostTool => post_tool_output(paths, &settings, &mut rand::thread_rng()),
        HookEvent::SessionStart => session_start_output(paths, &settings),
    };
    if let Some(text) = output {
        println!("{}", text);
    }
}

/// Handle `statusline`
pub fn handle_statusline(paths: &Paths) {
    drain_input(std::io::stdin());
    println!("{}", statusline_output(paths, Utc::now()));
}

/// Read `reader` to the end; a read error is logged and yields what was read so far
pub fn drain_input<R: Read>(mut reader: R) -> String {
    let mut input = String::new();
    if let Err(e) = reader.read_to_string(&mut input) {
        debug!(error = %e, "Failed to read hook input");
    }
    input
}
