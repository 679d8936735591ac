//! Surface routing - project the ranked queue onto every output channel
//!
//! # Surfaces
//! - `spinner`: ambient spinner verbs written into the host settings
//! - `status`: short-lived "current notification" pointer for the status line
//! - `context`: probabilistic context injection for the per-tool hook
//! - `summary`: plain-text digest for the session-start hook
//!
//! Writes are fail-open: every surface returns a `Result`, and the router
//! logs and discards errors so a broken surface never reaches the host.

pub mod context;
pub mod spinner;
pub mod status;
pub mod summary;

use anyhow::Result;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{Paths, PriorityConfig, SurfaceConfig};
use crate::notification::Notification;

pub use context::{context_injection, render_injection, select_for_injection, HookOutput};
pub use spinner::{format_verbs, SpinnerSurface};
pub use status::{read_current, render_statusline, StatusPointer, StatusSurface, STATUS_TTL_SECS};
pub use summary::session_summary;

/// Outcome of delivering to one surface
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// Written
    Sent,
    /// Nothing to do (disabled, filtered out, target missing)
    Skipped(String),
    /// Write failed; already logged
    Failed(String),
}

/// A surface that persists something for the host to pick up
pub trait Surface: Send + Sync {
    /// Surface name (for logs and reports)
    fn name(&self) -> &str;

    /// Deliver the ranked queue
    fn deliver(&self, ranked: &[Notification]) -> Result<SendResult>;
}

/// Everything one routing pass produced
///
/// `context` and `summary` are not persisted. The host receives them through
/// the hook commands, which build their own; here they are returned for
/// callers that print them (`fetch` shows the summary). The daemon loop only
/// logs `results`.
#[derive(Debug, Clone, Default)]
pub struct RouteReport {
    /// (surface name, result) for each written surface
    pub results: Vec<(String, SendResult)>,
    /// Context injection payload, when the sample hit
    pub context: Option<HookOutput>,
    /// Session summary text
    pub summary: Option<String>,
}

impl RouteReport {
    pub fn result(&self, name: &str) -> Option<&SendResult> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}

/// Routes the ranked queue to every enabled surface
pub struct SurfaceRouter {
    paths: Paths,
}

impl SurfaceRouter {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Build the write surfaces enabled in `surfaces`
    pub fn surfaces_for(&self, surfaces: &SurfaceConfig, priority: &PriorityConfig) -> Vec<Box<dyn Surface>> {
        let mut enabled: Vec<Box<dyn Surface>> = Vec::new();
        if surfaces.spinner_verbs.enabled {
            enabled.push(Box::new(SpinnerSurface::new(
                self.paths.host_settings(),
                surfaces.spinner_verbs.max_length,
                priority.min_spinner,
            )));
        }
        if surfaces.status_line.enabled {
            enabled.push(Box::new(StatusSurface::new(
                self.paths.current_file(),
                priority.min_status_line,
            )));
        }
        enabled
    }

    /// Route `ranked` (already in priority order) to all enabled surfaces
    pub fn route<R: Rng + ?Sized>(
        &self,
        ranked: &[Notification],
        surfaces: &SurfaceConfig,
        priority: &PriorityConfig,
        rng: &mut R,
    ) -> RouteReport {
        let mut report = RouteReport::default();
        if ranked.is_empty() {
            debug!("No notifications to route");
            return report;
        }

        for surface in self.surfaces_for(surfaces, priority) {
            let name = surface.name().to_string();
            let result = deliver_fail_open(surface.as_ref(), ranked);
            report.results.push((name, result));
        }

        if surfaces.context_injection.enabled {
            report.context = context_injection(
                ranked,
                priority.min_context_injection,
                surfaces.context_injection.rate,
                rng,
            );
        }

        if surfaces.session_summary.enabled {
            report.summary = session_summary(ranked);
        }

        report
    }
}

/// Deliver to one surface; errors are logged and returned as `Failed`
pub fn deliver_fail_open(surface: &dyn Surface, ranked: &[Notification]) -> SendResult {
    match surface.deliver(ranked) {
        Ok(result) => {
            debug!(surface = surface.name(), result = ?result, "Surface delivered");
            result
        }
        Err(e) => {
            warn!(surface = surface.name(), error = %e, "Surface write failed, ignoring");
            SendResult::Failed(e.to_string())
        }
    }
}
