//! The network status service.

use std::sync::Arc;

use netstatus_core::logging::targets;
use netstatus_core::{ConnectionId, Signal};
use parking_lot::Mutex;

use super::detector::{ChangeDetector, ChangeSource, DetectorStats, SystemChangeSource};
use super::interface::NetworkInterface;
use super::prober::{InterfaceProber, InterfaceSource, Probe, SystemInterfaces};
use super::status::{Availability, AvailabilityChange, StatusCache};
use crate::config::MonitorConfig;
use crate::error::Result;

/// Monitors network availability and notifies listeners on transitions.
///
/// The service probes once when built. After [`start`](Self::start) it
/// watches the operating system for interface and address changes,
/// debounces them, re-probes, and emits [`availability_changed`] only when
/// the answer actually flips.
///
/// Listener callbacks run on the detector thread, except for transitions
/// found by [`refresh`](Self::refresh), which run on its caller. Keep them
/// short: a slow callback delays processing of later changes. Callbacks must
/// not call `refresh`.
///
/// # Example
///
/// ```no_run
/// use netstatus::NetworkStatus;
///
/// let status = NetworkStatus::new()?;
/// println!("available: {}", status.is_available());
///
/// let id = status.subscribe(|change| {
///     println!("network is now {}", change.current);
/// });
///
/// status.start()?;
/// // ...
/// status.unsubscribe(id);
/// status.stop();
/// # Ok::<(), netstatus::StatusError>(())
/// ```
///
/// [`availability_changed`]: Self::availability_changed
pub struct NetworkStatus {
    availability_changed: Arc<Signal<AvailabilityChange>>,
    cache: Arc<StatusCache>,
    source: Arc<dyn ChangeSource>,
    interfaces: Arc<dyn InterfaceSource>,
    config: MonitorConfig,
    detector: Mutex<Option<ChangeDetector>>,
}

impl NetworkStatus {
    /// Create a service for the host's interfaces with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Start building a customized service.
    pub fn builder() -> NetworkStatusBuilder {
        NetworkStatusBuilder::default()
    }

    /// Start watching for network changes.
    ///
    /// After subscribing, a re-probe is queued on the detector thread so a
    /// change that happened since the service was built is reported. Calling
    /// `start` on a running service does nothing.
    ///
    /// Returns [`StatusError::Subscription`](crate::StatusError::Subscription)
    /// if change notifications cannot be established; the service then stays
    /// stopped and [`is_available`](Self::is_available) falls back to direct
    /// probes.
    pub fn start(&self) -> Result<()> {
        let mut detector = self.detector.lock();
        if detector.is_some() {
            return Ok(());
        }

        let cache = Arc::clone(&self.cache);
        let spawned = ChangeDetector::spawn(&*self.source, &self.config, move |_event| {
            cache.apply();
        })?;
        // Reconcile on the detector thread, like every later change.
        spawned.trigger();
        *detector = Some(spawned);

        tracing::info!(target: targets::STATUS, "network status monitoring started");
        Ok(())
    }

    /// Stop watching for network changes and release the OS subscription.
    pub fn stop(&self) {
        let detector = self.detector.lock().take();
        if let Some(mut detector) = detector {
            detector.stop();
            tracing::info!(target: targets::STATUS, "network status monitoring stopped");
        }
    }

    /// Check if the service is watching for changes.
    pub fn is_running(&self) -> bool {
        self.detector.lock().is_some()
    }

    /// Check whether a usable network path currently exists.
    ///
    /// While running this is the cached state maintained by change
    /// detection. While stopped it is a direct probe.
    pub fn is_available(&self) -> bool {
        self.availability().is_available()
    }

    /// Current availability; see [`is_available`](Self::is_available).
    pub fn availability(&self) -> Availability {
        if self.is_running() {
            self.cache.cached()
        } else {
            self.cache.probe_now()
        }
    }

    /// Re-probe now and notify listeners if the state changed.
    ///
    /// Unlike detected changes, this notification is delivered on the
    /// calling thread before `refresh` returns.
    pub fn refresh(&self) -> Option<AvailabilityChange> {
        self.cache.apply()
    }

    /// Signal emitted with `(previous, current)` on every availability
    /// transition.
    pub fn availability_changed(&self) -> &Signal<AvailabilityChange> {
        &self.availability_changed
    }

    /// Register a listener for availability transitions.
    pub fn subscribe<F>(&self, listener: F) -> ConnectionId
    where
        F: Fn(&AvailabilityChange) + Send + Sync + 'static,
    {
        self.availability_changed.connect(listener)
    }

    /// Remove a listener. Returns `false` if the handle was unknown.
    ///
    /// A notification already being delivered to this listener may still
    /// complete; no later one is delivered.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.availability_changed.disconnect(id)
    }

    /// Snapshot of the interfaces the prober sees. Empty if the query fails.
    pub fn interfaces(&self) -> Vec<NetworkInterface> {
        self.interfaces.query_interfaces().unwrap_or_else(|err| {
            tracing::warn!(target: targets::PROBE, error = %err, "interface query failed");
            Vec::new()
        })
    }

    /// Detector activity counters, or `None` while stopped.
    pub fn detector_stats(&self) -> Option<DetectorStats> {
        self.detector.lock().as_ref().map(ChangeDetector::stats)
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

impl Drop for NetworkStatus {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`NetworkStatus`].
///
/// Every collaborator defaults to the host implementation: interfaces from
/// `netdev`, change notifications from `netwatcher`.
#[derive(Default)]
pub struct NetworkStatusBuilder {
    config: MonitorConfig,
    prober: Option<Arc<dyn Probe>>,
    interfaces: Option<Arc<dyn InterfaceSource>>,
    source: Option<Arc<dyn ChangeSource>>,
}

impl NetworkStatusBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom availability probe instead of the interface prober.
    pub fn prober(mut self, prober: impl Probe + 'static) -> Self {
        let prober: Arc<dyn Probe> = Arc::new(prober);
        self.prober = Some(prober);
        self
    }

    /// Use a custom interface source. The default prober applies the
    /// configured [`ProbePolicy`](crate::ProbePolicy) to it.
    pub fn interface_source(mut self, source: impl InterfaceSource + 'static) -> Self {
        let source: Arc<dyn InterfaceSource> = Arc::new(source);
        self.interfaces = Some(source);
        self
    }

    /// Use a custom change notification source.
    pub fn change_source(mut self, source: impl ChangeSource + 'static) -> Self {
        let source: Arc<dyn ChangeSource> = Arc::new(source);
        self.source = Some(source);
        self
    }

    /// Validate the configuration, probe once and create the service.
    pub fn build(self) -> Result<NetworkStatus> {
        self.config.validate()?;

        let interfaces: Arc<dyn InterfaceSource> = match self.interfaces {
            Some(interfaces) => interfaces,
            None => Arc::new(SystemInterfaces),
        };
        let prober: Arc<dyn Probe> = match self.prober {
            Some(prober) => prober,
            None => Arc::new(InterfaceProber::new(
                SharedInterfaces(interfaces.clone()),
                self.config.probe.clone(),
            )),
        };
        let source: Arc<dyn ChangeSource> = match self.source {
            Some(source) => source,
            None => Arc::new(SystemChangeSource),
        };

        let availability_changed = Arc::new(Signal::new());
        let cache = Arc::new(StatusCache::new(prober, availability_changed.clone()));

        Ok(NetworkStatus {
            availability_changed,
            cache,
            source,
            interfaces,
            config: self.config,
            detector: Mutex::new(None),
        })
    }
}

/// Lets the default prober and [`NetworkStatus::interfaces`] share one source.
struct SharedInterfaces(Arc<dyn InterfaceSource>);

impl InterfaceSource for SharedInterfaces {
    fn query_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        self.0.query_interfaces()
    }
}
