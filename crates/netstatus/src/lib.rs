//! Network availability monitoring.
//!
//! This crate answers one question, "does the host have a usable network
//! path right now?", and tells registered listeners exactly once each time
//! the answer changes.
//!
//! - **Point-in-time checks**: [`NetworkStatus::is_available`]
//! - **Change notification**: [`NetworkStatus::subscribe`] /
//!   [`NetworkStatus::availability_changed`]
//! - **Configuration**: [`MonitorConfig`], loadable from TOML
//!
//! # Example
//!
//! ```no_run
//! use netstatus::NetworkStatus;
//!
//! fn main() -> Result<(), netstatus::StatusError> {
//!     let status = NetworkStatus::new()?;
//!
//!     if status.is_available() {
//!         println!("... Network is available");
//!     }
//!
//!     status.subscribe(|change| {
//!         println!("... Network is {}", change.current);
//!     });
//!
//!     // Watch in the background until `status` is dropped or stopped.
//!     status.start()?;
//!     Ok(())
//! }
//! ```
//!
//! # Threading
//!
//! Change detection runs on a dedicated thread, and listener callbacks are
//! invoked on it. Callbacks should return quickly; marshal to another thread
//! for anything slow.
//!
//! # Custom sources
//!
//! The builder accepts any [`Probe`], [`InterfaceSource`] or
//! [`ChangeSource`], which makes the service usable with platform
//! integrations this crate does not ship, and deterministic in tests:
//!
//! ```
//! use std::sync::Arc;
//! use netstatus::{ManualChangeSource, NetworkStatus};
//!
//! let source = Arc::new(ManualChangeSource::new());
//! let status = NetworkStatus::builder()
//!     .prober(|| true)
//!     .change_source(source.clone())
//!     .build()?;
//!
//! status.start()?;
//! assert!(status.is_available());
//! source.notify();
//! # Ok::<(), netstatus::StatusError>(())
//! ```

mod config;
mod error;
pub mod network_info;

pub use config::MonitorConfig;
pub use error::{Result, StatusError};

pub use network_info::{
    Availability, AvailabilityChange, ChangeSource, InterfaceSource, ManualChangeSource,
    NetworkInterface, NetworkStatus, NetworkStatusBuilder, Probe, ProbePolicy,
};

pub use netstatus_core::{ConnectionGuard, ConnectionId, Signal};
