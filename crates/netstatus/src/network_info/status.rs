//! Cached availability state and transition notification.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use netstatus_core::Signal;
use netstatus_core::logging::{span_names, targets};
use parking_lot::Mutex;

use super::prober::Probe;

/// Whether the host has a usable network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    /// At least one usable network path exists.
    Available,
    /// No usable network path exists.
    Unavailable,
}

impl Availability {
    /// Returns true for [`Availability::Available`].
    pub fn is_available(self) -> bool {
        self == Availability::Available
    }
}

impl From<bool> for Availability {
    fn from(available: bool) -> Self {
        if available {
            Availability::Available
        } else {
            Availability::Unavailable
        }
    }
}

impl From<Availability> for bool {
    fn from(availability: Availability) -> Self {
        availability.is_available()
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::Unavailable => write!(f, "not available"),
        }
    }
}

/// Payload delivered to availability listeners.
///
/// `previous` and `current` always differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityChange {
    /// State before the transition.
    pub previous: Availability,
    /// State after the transition.
    pub current: Availability,
}

impl AvailabilityChange {
    /// Returns true if the network became available.
    pub fn became_available(&self) -> bool {
        self.current.is_available()
    }
}

/// Holds the last probed availability and notifies on transitions.
///
/// Probe, compare, update and notify happen as one step under a mutex, so
/// listeners observe exactly one notification per real transition, in the
/// order the transitions happened.
pub struct StatusCache {
    prober: Arc<dyn Probe>,
    available: AtomicBool,
    transition: Mutex<()>,
    changed: Arc<Signal<AvailabilityChange>>,
}

impl StatusCache {
    /// Create a cache seeded by an immediate probe. No notification is sent
    /// for the initial state.
    pub fn new(prober: Arc<dyn Probe>, changed: Arc<Signal<AvailabilityChange>>) -> Self {
        let initial = prober.probe();
        tracing::debug!(target: targets::STATUS, available = initial, "initial availability");
        Self {
            prober,
            available: AtomicBool::new(initial),
            transition: Mutex::new(()),
            changed,
        }
    }

    /// The last probed availability.
    pub fn cached(&self) -> Availability {
        self.available.load(Ordering::Acquire).into()
    }

    /// Probe directly, bypassing the cache. Does not update it.
    pub fn probe_now(&self) -> Availability {
        self.prober.probe().into()
    }

    /// Re-probe and notify listeners if the state changed.
    ///
    /// Returns the transition, or `None` if the state is unchanged. Listeners
    /// run on the calling thread before this returns and must not call
    /// `apply` themselves.
    pub fn apply(&self) -> Option<AvailabilityChange> {
        let _span = tracing::trace_span!(target: targets::STATUS, span_names::TRANSITION).entered();
        let _guard = self.transition.lock();

        let current = self.prober.probe();
        let previous = self.available.swap(current, Ordering::AcqRel);
        if previous == current {
            tracing::trace!(target: targets::STATUS, available = current, "availability unchanged");
            return None;
        }

        let change = AvailabilityChange {
            previous: previous.into(),
            current: current.into(),
        };
        tracing::info!(
            target: targets::STATUS,
            previous = %change.previous,
            current = %change.current,
            "network availability changed"
        );
        let delivered = self.changed.emit(change);
        tracing::trace!(target: targets::STATUS, delivered, "availability change delivered");
        Some(change)
    }
}
