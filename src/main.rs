//! vibenotify CLI
//!
//! Aggregates notifications from external sources and surfaces them inside
//! Claude Code (spinner verbs, status line, context injection, session summary).

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vibe_notifications::{
    cli::{self, HookEvent, SetupArgs},
    run_loop, DaemonController, DaemonState, Paths, PluginRegistry,
    SettingsStore, StartOutcome, StopOutcome,
};

#[derive(Parser)]
#[command(name = "vibenotify")]
#[command(about = "vibenotifications - customizable notifications for Claude Code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch notifications once (no daemon)
    Fetch,
    /// Start the background daemon
    Start,
    /// Stop the background daemon
    Stop,
    /// Show whether the daemon is running
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// View stored notifications
    Dashboard {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List available sources
    Sources {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable a source
    Add {
        /// Plugin name (see `sources`)
        plugin: String,
    },
    /// Remove a source
    Remove {
        /// Plugin name
        plugin: String,
    },
    /// Install hooks and status line into Claude Code
    Setup(SetupArgs),
    /// Stop the daemon, remove hooks and delete all data
    Uninstall,
    /// Print the status line (called by Claude Code)
    Statusline,
    /// Hook entrypoints (called by Claude Code)
    Hook {
        #[command(subcommand)]
        event: HookEvent,
    },
    /// Background polling loop (internal, spawned by `start`)
    #[command(hide = true)]
    DaemonLoop {
        /// Seconds between fetch cycles
        #[arg(long, short, default_value = "60")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries hook payloads.
    // e.g. RUST_LOG=debug vibenotify fetch
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vibe_notifications=info,vibenotify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let paths = Paths::new();
    let registry = PluginRegistry::builtin();

    match cli.command {
        Commands::Fetch => cli::handle_fetch(&registry, &paths).await?,
        Commands::Start => {
            let settings = SettingsStore::load(&paths);
            let controller = DaemonController::new(paths.clone());
            match controller.start(settings.interval_secs())? {
                StartOutcome::Started { pid } => println!(
                    "Daemon started (pid {}, every {}s). Logs: {}",
                    pid,
                    settings.interval_secs(),
                    paths.log_file().display()
                ),
                StartOutcome::AlreadyRunning { pid } => {
                    println!("Daemon already running (pid {})", pid)
                }
            }
        }
        Commands::Stop => match DaemonController::new(paths.clone()).stop()? {
            StopOutcome::Stopped { pid } => println!("Daemon stopped (pid {})", pid),
            StopOutcome::NotRunning => println!("Daemon is not running"),
        },
        Commands::Status { json } => {
            let state = DaemonController::new(paths.clone()).status();
            println!(
                "{}",
                cli::format_output(&state, json, |state| match state {
                    DaemonState::Running { pid } => format!("Daemon: running (pid {})", pid),
                    DaemonState::Stopped => "Daemon: stopped".to_string(),
                })
            );
        }
        Commands::Dashboard { json } => cli::handle_dashboard(&paths, json)?,
        Commands::Sources { json } => cli::handle_sources(&registry, &paths, json)?,
        Commands::Add { plugin } => cli::handle_add(&registry, &paths, &plugin).await?,
        Commands::Remove { plugin } => cli::handle_remove(&paths, &plugin)?,
        Commands::Setup(args) => cli::handle_setup(args, &paths)?,
        Commands::Uninstall => cli::handle_uninstall(&paths)?,
        Commands::Statusline => cli::handle_statusline(&paths),
        Commands::Hook { event } => cli::handle_hook(event, &paths),
        Commands::DaemonLoop { interval } => run_loop(registry, paths, interval).await?,
    }

    Ok(())
}
