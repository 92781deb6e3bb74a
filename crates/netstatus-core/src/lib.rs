//! Core systems for netstatus.
//!
//! This crate provides the pieces of the network status monitor that do not
//! touch the operating system:
//!
//! - **Listener Registry**: [`Signal`], a thread-safe set of callbacks with
//!   tagged [`ConnectionId`] handles
//! - **Logging**: `tracing` target names shared by every netstatus crate
//!
//! # Example
//!
//! ```
//! use netstatus_core::Signal;
//!
//! let availability_changed = Signal::<(bool, bool)>::new();
//!
//! let conn_id = availability_changed.connect(|(old, new)| {
//!     println!("availability {} -> {}", old, new);
//! });
//!
//! availability_changed.emit((true, false));
//! availability_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;

pub use signal::{ConnectionGuard, ConnectionId, Signal};
