// src/cli/setup.rs
//! Setup command - install our hooks into the host settings
//!
//! Adds a `PostToolUse` hook, a `SessionStart` hook and the `statusLine`
//! command. Hook groups of ours are recognised by their command containing
//! the binary name, so re-running setup replaces them instead of stacking.

use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Confirm;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::{read_json, write_json_atomic, Paths};
use crate::surface::spinner::SPINNER_KEY;

/// Substring identifying commands we installed
pub const HOOK_MARKER: &str = "vibenotify";

const POST_TOOL_MATCHER: &str = "Bash|Write|Edit|Read";
const SESSION_START_MATCHER: &str = "startup|resume";

/// Setup command arguments
#[derive(Args, Debug, Default)]
pub struct SetupArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show the resulting settings without writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Handle `setup`
pub fn handle_setup(args: SetupArgs, paths: &Paths) -> Result<()> {
    let host_settings = paths.host_settings();
    let exe = own_command()?;

    println!("Installing hooks into {}", host_settings.display());

    let mut settings = load_host_settings(host_settings)?;
    install_hooks(&mut settings, &exe)?;

    if args.dry_run {
        println!("\n--- Resulting settings ---");
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    if !args.yes {
        let apply = Confirm::new()
            .with_prompt("Apply changes?")
            .default(true)
            .interact()
            .unwrap_or(false);
        if !apply {
            println!("Aborted.");
            return Ok(());
        }
    }

    if host_settings.exists() {
        let backup = host_settings.with_extension("json.vibenotify.bak");
        fs::copy(host_settings, &backup)
            .with_context(|| format!("Failed to back up {}", host_settings.display()))?;
        println!("✓ Backed up to {}", backup.display());
    }

    write_json_atomic(host_settings, &settings)?;
    info!(path = %host_settings.display(), "Hooks installed");
    println!("✓ Updated {}", host_settings.display());
    Ok(())
}

/// Remove our hooks from the host settings; `false` when there was no file
pub fn remove_host_hooks(paths: &Paths) -> Result<bool> {
    let host_settings = paths.host_settings();
    if !host_settings.exists() {
        return Ok(false);
    }

    let mut settings = load_host_settings(host_settings)?;
    remove_hooks(&mut settings);
    write_json_atomic(host_settings, &settings)?;
    info!(path = %host_settings.display(), "Hooks removed");
    Ok(true)
}

/// Host settings as a JSON object; missing file -> `{}`
///
/// A corrupt file is an error: writing over it would lose the user's settings.
fn load_host_settings(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(json!({}));
    }
    let value: Value = read_json(path)?;
    if !value.is_object() {
        bail!("{} is not a JSON object", path.display());
    }
    Ok(value)
}

/// Quoted path of the running binary
fn own_command() -> Result<String> {
    let exe = std::env::current_exe().context("Cannot locate own executable")?;
    let exe = exe.display().to_string();
    Ok(if exe.contains(' ') {
        format!("\"{}\"", exe)
    } else {
        exe
    })
}

/// Whether a hook group was installed by us
pub fn is_our_hook(group: &Value) -> bool {
    group
        .get("hooks")
        .and_then(|h| h.as_array())
        .map(|hooks| {
            hooks.iter().any(|h| {
                h.get("command")
                    .and_then(|c| c.as_str())
                    .map(|c| c.contains(HOOK_MARKER))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// Replace our hook group under `event`, keeping everyone else's
fn replace_hook_group(hooks: &mut Map<String, Value>, event: &str, group: Value) {
    let entry = hooks.entry(event.to_string()).or_insert_with(|| json!([]));
    if !entry.is_array() {
        *entry = json!([]);
    }
    if let Some(groups) = entry.as_array_mut() {
        groups.retain(|g| !is_our_hook(g));
        groups.push(group);
    }
}

/// Merge our hooks and status line into `settings`
pub fn install_hooks(settings: &mut Value, exe: &str) -> Result<()> {
    let root = settings
        .as_object_mut()
        .context("Host settings are not a JSON object")?;

    let hooks = root.entry("hooks").or_insert_with(|| json!({}));
    if !hooks.is_object() {
        *hooks = json!({});
    }
    let hooks = hooks
        .as_object_mut()
        .context("Host hooks are not a JSON object")?;

    replace_hook_group(
        hooks,
        "PostToolUse",
        json!({
            "matcher": POST_TOOL_MATCHER,
            "hooks": [{
                "type": "command",
                "command": format!("{} hook post-tool", exe),
                "timeout": 3
            }]
        }),
    );
    replace_hook_group(
        hooks,
        "SessionStart",
        json!({
            "matcher": SESSION_START_MATCHER,
            "hooks": [{
                "type": "command",
                "command": format!("{} hook session-start", exe),
                "statusMessage": "Loading your notifications...",
                "timeout": 10
            }]
        }),
    );

    root.insert(
        "statusLine".to_string(),
        json!({
            "type": "command",
            "command": format!("{} statusline", exe)
        }),
    );
    Ok(())
}

/// Strip our hooks, status line and spinner verbs from `settings`
pub fn remove_hooks(settings: &mut Value) {
    let Some(root) = settings.as_object_mut() else {
        return;
    };

    if let Some(hooks) = root.get_mut("hooks").and_then(|h| h.as_object_mut()) {
        for groups in hooks.values_mut() {
            if let Some(groups) = groups.as_array_mut() {
                groups.retain(|g| !is_our_hook(g));
            }
        }
        hooks.retain(|_, groups| groups.as_array().map(|g| !g.is_empty()).unwrap_or(true));
    }

    let ours = root
        .get("statusLine")
        .and_then(|s| s.get("command"))
        .and_then(|c| c.as_str())
        .map(|c| c.contains(HOOK_MARKER))
        .unwrap_or(false);
    if ours {
        root.remove("statusLine");
    }

    root.remove(SPINNER_KEY);
}
