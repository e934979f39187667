//! Logging facilities for Horizon A11y.
//!
//! Horizon A11y uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. To see logs, install one in the host:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_a11y=debug")
//!     .init();
//! ```
//!
//! Each subsystem logs under its own target (see [`targets`]) so output can
//! be filtered per component, e.g. `horizon_a11y::focus=trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "horizon_a11y_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_a11y_core::signal";
    /// Timer system target.
    pub const TIMER: &str = "horizon_a11y_core::timer";

    /// Item registry target.
    pub const REGISTRY: &str = "horizon_a11y::registry";
    /// Focus tracking target.
    pub const FOCUS: &str = "horizon_a11y::focus";
    /// Event bus target.
    pub const EVENTS: &str = "horizon_a11y::events";
    /// Announcement target.
    pub const ANNOUNCE: &str = "horizon_a11y::announce";
    /// Speech output target.
    pub const SPEECH: &str = "horizon_a11y::speech";
    /// Repeat hotkey target.
    pub const HOTKEY: &str = "horizon_a11y::hotkey";
    /// Controller lifecycle target.
    pub const CONTROLLER: &str = "horizon_a11y::controller";
    /// Platform adapter target.
    pub const ADAPTER: &str = "horizon_a11y::adapter";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing a whole operation, such as a full tree rebuild.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_a11y::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
