//! Network availability monitoring.
//!
//! Data flows leaf first:
//!
//! - **Interface enumeration** ([`NetworkInterface`]): snapshot the host's
//!   interfaces via `netdev`
//! - **Probing** ([`InterfaceProber`]): reduce the snapshot to one boolean
//!   using a [`ProbePolicy`]
//! - **Change detection** ([`ChangeDetector`]): debounce raw OS notifications
//!   from a [`ChangeSource`] into [`ChangeEvent`]s on a dedicated thread
//! - **Status cache** ([`StatusCache`]): re-probe on each event and notify
//!   only on real transitions
//! - **Service** ([`NetworkStatus`]): lifecycle and listener registration
//!
//! # Example
//!
//! ```ignore
//! use netstatus::network_info::NetworkStatus;
//!
//! let status = NetworkStatus::new()?;
//!
//! status.subscribe(|change| {
//!     println!("{} -> {}", change.previous, change.current);
//! });
//!
//! status.start()?;
//! ```

mod detector;
mod interface;
mod monitor;
mod prober;
mod status;

pub use detector::{
    ChangeCallback, ChangeDetector, ChangeEvent, ChangeSource, DetectorStats, ManualChangeSource,
    SystemChangeSource, WatchGuard,
};
pub use interface::{InterfaceType, Ipv4Info, Ipv6Info, NetworkInterface};
pub use monitor::{NetworkStatus, NetworkStatusBuilder};
pub use prober::{InterfaceProber, InterfaceSource, Probe, ProbePolicy, SystemInterfaces};
pub use status::{Availability, AvailabilityChange, StatusCache};
