//! Listener registry for netstatus.
//!
//! A [`Signal`] holds a set of callbacks (slots) keyed by [`ConnectionId`].
//! Emitting a signal invokes every connected slot on the emitting thread.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The registry that listeners connect to
//! - [`ConnectionId`] - Tagged handle returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Delivery
//!
//! `emit` takes a snapshot of the connected slots and releases the registry
//! lock before calling any of them, so slots may connect or disconnect other
//! slots (including themselves) while a delivery is in flight.
//!
//! - A slot connected during a delivery may or may not see that delivery,
//!   but sees every later one.
//! - A slot disconnected during a delivery is skipped unless it was already
//!   being invoked.
//! - A panicking slot is logged and the remaining slots still run.
//!
//! There is no ordering guarantee between independent slots.
//!
//! # Example
//!
//! ```
//! use netstatus_core::Signal;
//!
//! let changed = Signal::<bool>::new();
//!
//! let id = changed.connect(|online| {
//!     println!("online: {}", online);
//! });
//!
//! changed.emit(true);
//! changed.disconnect(id);
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a connected slot.
    ///
    /// Use this ID to disconnect a specific slot via [`Signal::disconnect`].
    /// The ID stays valid until the slot is disconnected or the signal is
    /// dropped. IDs are never reused for a different slot of the same signal.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Internal storage for a single connection.
struct Connection<Args> {
    slot: Slot<Args>,
    /// Cleared on disconnect so in-flight deliveries skip the slot.
    active: Arc<AtomicBool>,
}

struct Registry<Args> {
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
}

impl<Args> Registry<Args> {
    fn disconnect(&self, id: ConnectionId) -> bool {
        match self.connections.lock().remove(id) {
            Some(conn) => {
                conn.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }
}

/// A thread-safe registry of callbacks notified on [`emit`](Self::emit).
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots by reference.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync` when `Args` is, and every method can be
/// called concurrently from any thread.
pub struct Signal<Args> {
    registry: Arc<Registry<Args>>,
}

impl<Args: Send + Sync + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + Sync + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                connections: Mutex::new(SlotMap::with_key()),
            }),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    ///
    /// # Example
    ///
    /// ```
    /// use netstatus_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {}", s));
    /// signal.emit("Hello".to_string());
    /// assert!(signal.disconnect(id));
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let connection = Connection {
            slot: Arc::new(slot),
            active: Arc::new(AtomicBool::new(true)),
        };
        let id = self.registry.connections.lock().insert(connection);
        tracing::trace!(target: targets::SIGNAL, ?id, "slot connected");
        id
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    ///
    /// The guard holds a weak reference to the signal, so it may safely
    /// outlive it.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.disconnect(id);
        tracing::trace!(target: targets::SIGNAL, ?id, removed, "slot disconnected");
        removed
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        let mut connections = self.registry.connections.lock();
        for (_, conn) in connections.drain() {
            conn.active.store(false, Ordering::Release);
        }
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.registry.connections.lock().len()
    }

    /// Emit the signal, invoking all connected slots on the current thread.
    ///
    /// Returns the number of slots that completed without panicking.
    #[tracing::instrument(skip_all, target = "netstatus_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> usize {
        let snapshot: Vec<(ConnectionId, Slot<Args>, Arc<AtomicBool>)> = {
            let connections = self.registry.connections.lock();
            connections
                .iter()
                .map(|(id, conn)| (id, conn.slot.clone(), conn.active.clone()))
                .collect()
        };
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        let mut delivered = 0;
        for (id, slot, active) in snapshot {
            if !active.load(Ordering::Acquire) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| slot(&args))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        target: targets::SIGNAL,
                        ?id,
                        panic = panic_message(payload.as_ref()),
                        "slot panicked during delivery"
                    );
                }
            }
        }
        delivered
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// Created via [`Signal::connect_scoped`].
///
/// # Example
///
/// ```
/// use netstatus_core::Signal;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
///
/// let signal = Signal::<i32>::new();
/// let counter = Arc::new(AtomicI32::new(0));
/// {
///     let counter_clone = counter.clone();
///     let _guard = signal.connect_scoped(move |&n| {
///         counter_clone.fetch_add(n, Ordering::SeqCst);
///     });
///     signal.emit(42);
/// }
/// signal.emit(43);
/// assert_eq!(counter.load(Ordering::SeqCst), 42);
/// ```
pub struct ConnectionGuard<Args> {
    registry: Weak<Registry<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// The ID of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.disconnect(self.id);
        }
    }
}
