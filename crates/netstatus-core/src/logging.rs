//! Logging facilities for netstatus.
//!
//! netstatus uses the `tracing` crate for instrumentation. Nothing is printed
//! unless the application installs a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
//!         .init();
//! }
//! ```
//!
//! Every event is emitted with one of the [`targets`] below, so a filter such
//! as `RUST_LOG=netstatus::status=info,netstatus::detector=debug` selects a
//! single subsystem.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "netstatus_core";
    /// Listener registry target.
    pub const SIGNAL: &str = "netstatus_core::signal";
    /// Interface prober target.
    pub const PROBE: &str = "netstatus::probe";
    /// Change detector target.
    pub const DETECTOR: &str = "netstatus::detector";
    /// Status cache and service lifecycle target.
    pub const STATUS: &str = "netstatus::status";
}

/// Span names used for tracing.
pub mod span_names {
    /// Span wrapping one debounced probe-compare-notify step.
    pub const TRANSITION: &str = "netstatus::transition";
}
