//! Change detection: turn raw OS network notifications into debounced
//! [`ChangeEvent`]s on a dedicated thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use parking_lot::Mutex;

use netstatus_core::logging::targets;

use crate::config::MonitorConfig;
use crate::error::{Result, StatusError};

/// Callback a [`ChangeSource`] invokes for every raw notification.
///
/// May be called from any thread, any number of times.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Keeps a change subscription alive. Dropping it unsubscribes.
pub struct WatchGuard {
    _inner: Box<dyn Send>,
}

impl WatchGuard {
    /// Wrap any value whose drop tears down a subscription.
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl std::fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchGuard").finish_non_exhaustive()
    }
}

/// A feed of raw "something about the network changed" notifications.
pub trait ChangeSource: Send + Sync {
    /// Start delivering notifications to `on_change` until the returned
    /// guard is dropped.
    fn subscribe(&self, on_change: ChangeCallback) -> Result<WatchGuard>;
}

/// Change source backed by the platform's interface watcher (`netwatcher`).
///
/// Uses netlink on Linux, `NotifyIpInterfaceChange` on Windows and the
/// system configuration store on Apple platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemChangeSource;

impl ChangeSource for SystemChangeSource {
    fn subscribe(&self, on_change: ChangeCallback) -> Result<WatchGuard> {
        let handle = netwatcher::watch_interfaces(move |update| {
            tracing::trace!(
                target: targets::DETECTOR,
                added = update.diff.added.len(),
                removed = update.diff.removed.len(),
                interfaces = update.interfaces.len(),
                "interface update from OS"
            );
            on_change();
        })
        .map_err(|e| StatusError::subscription(e.to_string()))?;

        Ok(WatchGuard::new(handle))
    }
}

/// An in-process change source driven by [`notify`](Self::notify).
///
/// Useful for feeding events from a custom platform integration, and as a
/// deterministic source in tests.
#[derive(Default)]
pub struct ManualChangeSource {
    inner: Arc<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    next_key: AtomicU64,
    subscribers: Mutex<Vec<(u64, ChangeCallback)>>,
}

struct ManualSubscription {
    inner: Weak<ManualInner>,
    key: u64,
}

impl Drop for ManualSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().retain(|(key, _)| *key != self.key);
        }
    }
}

impl ManualChangeSource {
    /// Create a source with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise one raw change notification to every subscriber.
    pub fn notify(&self) {
        let callbacks: Vec<ChangeCallback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in callbacks {
            cb();
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl ChangeSource for ManualChangeSource {
    fn subscribe(&self, on_change: ChangeCallback) -> Result<WatchGuard> {
        let key = self.inner.next_key.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((key, on_change));
        Ok(WatchGuard::new(ManualSubscription {
            inner: Arc::downgrade(&self.inner),
            key,
        }))
    }
}

impl<T: ChangeSource + ?Sized> ChangeSource for Arc<T> {
    fn subscribe(&self, on_change: ChangeCallback) -> Result<WatchGuard> {
        (**self).subscribe(on_change)
    }
}

/// A debounced "availability may have changed" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// When the most recent raw notification folded into this event arrived.
    pub raised_at: Instant,
}

impl ChangeEvent {
    fn now() -> Self {
        Self {
            raised_at: Instant::now(),
        }
    }
}

/// Counters describing detector activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    /// Raw notifications received from the change source.
    pub raw_events: u64,
    /// Debounced events handed to the handler.
    pub change_events: u64,
}

/// The single pending-event slot between the change source and the
/// detector thread. A newer event replaces one still waiting.
#[derive(Clone)]
struct EventSlot {
    tx: Sender<ChangeEvent>,
    rx: Receiver<ChangeEvent>,
}

impl EventSlot {
    fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    fn offer(&self, event: ChangeEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                let _ = self.rx.try_recv();
                if self.tx.try_send(event).is_err() {
                    tracing::trace!(target: targets::DETECTOR, "change event coalesced into pending event");
                }
            }
        }
    }
}

#[derive(Default)]
struct Counters {
    raw_events: AtomicU64,
    change_events: AtomicU64,
}

/// Owns the OS subscription and the thread that debounces it.
///
/// The handler runs on the detector thread, one [`ChangeEvent`] at a time.
pub struct ChangeDetector {
    guard: Option<WatchGuard>,
    slot: Option<EventSlot>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl ChangeDetector {
    /// Subscribe to `source` and start the detector thread.
    ///
    /// Fails with [`StatusError::Subscription`] if the source refuses the
    /// subscription, in which case no thread is started.
    pub fn spawn<S, H>(source: &S, config: &MonitorConfig, handler: H) -> Result<Self>
    where
        S: ChangeSource + ?Sized,
        H: FnMut(ChangeEvent) + Send + 'static,
    {
        let slot = EventSlot::new();
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let counters = Arc::new(Counters::default());

        let raw_counters = counters.clone();
        let raw_slot = slot.clone();
        let on_change: ChangeCallback = Arc::new(move || {
            raw_counters.raw_events.fetch_add(1, Ordering::Relaxed);
            raw_slot.offer(ChangeEvent::now());
        });

        let guard = source.subscribe(on_change).inspect_err(|err| {
            tracing::error!(target: targets::DETECTOR, error = %err, "change subscription failed");
        })?;

        let debounce = config.debounce;
        let max_delay = config.max_delay;
        let event_rx = slot.rx.clone();
        let loop_counters = counters.clone();
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                detector_loop(event_rx, shutdown_rx, debounce, max_delay, loop_counters, handler);
            })
            .map_err(StatusError::Spawn)?;

        tracing::debug!(
            target: targets::DETECTOR,
            ?debounce,
            ?max_delay,
            "change detector started"
        );

        Ok(Self {
            guard: Some(guard),
            slot: Some(slot),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            counters,
        })
    }

    /// Tear down the OS subscription and stop the detector thread.
    ///
    /// Waits for an in-progress handler call to finish unless called from
    /// the detector thread itself. Calling `stop` again does nothing.
    pub fn stop(&mut self) {
        // Unsubscribe first so no new raw events arrive during shutdown.
        self.guard = None;
        self.slot = None;
        self.shutdown = None;

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!(target: targets::DETECTOR, "detector thread panicked");
            }
            tracing::debug!(target: targets::DETECTOR, "change detector stopped");
        }
    }

    /// Queue a change event as if the source had raised one.
    ///
    /// The handler runs on the detector thread after the usual debounce.
    /// Not counted as a raw event. Does nothing once stopped.
    pub fn trigger(&self) {
        if let Some(slot) = &self.slot {
            slot.offer(ChangeEvent::now());
        }
    }

    /// Check whether the detector thread is still active.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> DetectorStats {
        DetectorStats {
            raw_events: self.counters.raw_events.load(Ordering::Relaxed),
            change_events: self.counters.change_events.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ChangeDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn detector_loop<H>(
    events: Receiver<ChangeEvent>,
    shutdown: Receiver<()>,
    debounce: Duration,
    max_delay: Duration,
    counters: Arc<Counters>,
    mut handler: H,
) where
    H: FnMut(ChangeEvent),
{
    loop {
        let first = select! {
            recv(shutdown) -> _ => break,
            recv(events) -> msg => match msg {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        let Some(event) = settle(first, &events, &shutdown, debounce, max_delay) else {
            break;
        };

        counters.change_events.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: targets::DETECTOR,
            waited = ?event.raised_at.saturating_duration_since(first.raised_at),
            "debounced network change"
        );
        handler(event);
    }
}

/// Wait until the source stays quiet for `debounce`, or until `max_delay`
/// has passed since `first`. Returns `None` on shutdown.
fn settle(
    first: ChangeEvent,
    events: &Receiver<ChangeEvent>,
    shutdown: &Receiver<()>,
    debounce: Duration,
    max_delay: Duration,
) -> Option<ChangeEvent> {
    let deadline = first.raised_at + max_delay;
    let mut latest = first;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Some(latest);
        }
        let wait = debounce.min(remaining);

        select! {
            recv(shutdown) -> _ => return None,
            recv(events) -> msg => match msg {
                Ok(event) => latest = event,
                Err(_) => return Some(latest),
            },
            default(wait) => return Some(latest),
        }
    }
}
