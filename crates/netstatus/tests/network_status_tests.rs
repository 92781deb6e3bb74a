//! Network status service tests.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, unbounded};
use parking_lot::Mutex;

use netstatus::network_info::{
    ChangeCallback, ChangeSource, InterfaceType, Ipv4Info, WatchGuard,
};
use netstatus::{
    Availability, AvailabilityChange, ConnectionId, InterfaceSource, ManualChangeSource,
    MonitorConfig, NetworkInterface, NetworkStatus, ProbePolicy, Result, StatusError,
};

/// A controllable link: the probe reports `up` and counts calls.
#[derive(Clone, Default)]
struct Link {
    up: Arc<AtomicBool>,
    probes: Arc<AtomicUsize>,
}

impl Link {
    fn new(up: bool) -> Self {
        let link = Self::default();
        link.set(up);
        link
    }

    fn set(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn prober(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let link = self.clone();
        move || {
            let up = link.up.load(Ordering::SeqCst);
            link.probes.fetch_add(1, Ordering::SeqCst);
            up
        }
    }
}

struct RefusingSource;

impl ChangeSource for RefusingSource {
    fn subscribe(&self, _on_change: ChangeCallback) -> Result<WatchGuard> {
        Err(StatusError::subscription("change notifications not permitted"))
    }
}

fn test_config() -> MonitorConfig {
    MonitorConfig::new()
        .debounce(Duration::from_millis(100))
        .max_delay(Duration::from_secs(1))
        .thread_name("netstatus-test")
}

fn monitored(link: &Link) -> (NetworkStatus, Arc<ManualChangeSource>) {
    let source = Arc::new(ManualChangeSource::new());
    let status = NetworkStatus::builder()
        .config(test_config())
        .prober(link.prober())
        .change_source(source.clone())
        .build()
        .expect("Failed to build network status");
    (status, source)
}

fn record(status: &NetworkStatus) -> Receiver<AvailabilityChange> {
    let (tx, rx) = unbounded();
    status.subscribe(move |change| {
        let _ = tx.send(*change);
    });
    rx
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Start monitoring and wait for the startup reconciliation probe.
fn start_settled(status: &NetworkStatus, link: &Link) {
    let before = link.probes();
    status.start().expect("Failed to start monitoring");
    assert!(
        wait_until(Duration::from_secs(2), || link.probes() > before),
        "Start should re-probe on the detector thread"
    );
}

#[test]
fn test_startup_then_link_down_then_flaps() {
    let link = Link::new(true);
    let (status, source) = monitored(&link);
    let changes = record(&status);

    start_settled(&status, &link);
    assert!(status.is_available());
    assert!(
        changes.recv_timeout(Duration::from_millis(300)).is_err(),
        "Initial state must not be reported as a change"
    );

    link.set(false);
    source.notify();
    let change = changes
        .recv_timeout(Duration::from_secs(2))
        .expect("Expected a transition notification");
    assert_eq!(change.previous, Availability::Available);
    assert_eq!(change.current, Availability::Unavailable);
    assert!(!status.is_available());

    // Two flaps that both settle on "down" are not a transition.
    source.notify();
    thread::sleep(Duration::from_millis(150));
    source.notify();
    assert!(changes.recv_timeout(Duration::from_millis(500)).is_err());
    assert!(!status.is_available());
}

#[test]
fn test_burst_is_probed_once() {
    let link = Link::new(true);
    let (status, source) = monitored(&link);
    let changes = record(&status);
    start_settled(&status, &link);

    let baseline = link.probes();
    for _ in 0..20 {
        source.notify();
    }

    assert!(wait_until(Duration::from_secs(2), || link.probes() > baseline));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(link.probes(), baseline + 1);
    assert!(changes.try_recv().is_err());

    let stats = status.detector_stats().expect("Detector should be running");
    assert_eq!(stats.raw_events, 20);
    // The startup reconciliation plus the burst.
    assert_eq!(stats.change_events, 2);
}

#[test]
fn test_each_transition_notified_exactly_once() {
    let link = Link::new(false);
    let (status, source) = monitored(&link);
    let changes = record(&status);
    start_settled(&status, &link);

    let script = [true, true, false, true, false, false, true];
    let mut expected = Vec::new();
    let mut previous = false;
    for &up in &script {
        link.set(up);
        let before = link.probes();
        source.notify();
        assert!(wait_until(Duration::from_secs(2), || link.probes() > before));
        if up != previous {
            expected.push((previous, up));
        }
        previous = up;
    }

    thread::sleep(Duration::from_millis(200));
    let seen: Vec<(bool, bool)> = changes
        .try_iter()
        .map(|c| (c.previous.is_available(), c.current.is_available()))
        .collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_change_since_build_reported_on_start() {
    let link = Link::new(true);
    let (status, _source) = monitored(&link);
    let changes = record(&status);

    link.set(false);
    status.start().expect("Failed to start monitoring");

    let change = changes
        .recv_timeout(Duration::from_secs(1))
        .expect("Start should report a change that happened since build");
    assert_eq!(change.current, Availability::Unavailable);
}

#[test]
fn test_listeners_run_on_detector_thread() {
    let link = Link::new(true);
    let (status, source) = monitored(&link);
    let (tx, threads) = unbounded();
    status.subscribe(move |_| {
        let _ = tx.send(thread::current().name().map(str::to_owned));
    });

    // A change since build, delivered by the startup reconciliation.
    link.set(false);
    status.start().expect("Failed to start monitoring");
    let name = threads
        .recv_timeout(Duration::from_secs(2))
        .expect("Start should report the change");
    assert_eq!(name.as_deref(), Some("netstatus-test"));

    link.set(true);
    source.notify();
    let name = threads
        .recv_timeout(Duration::from_secs(2))
        .expect("Expected a transition notification");
    assert_eq!(name.as_deref(), Some("netstatus-test"));
}

#[test]
fn test_subscription_failure() {
    let link = Link::new(true);
    let status = NetworkStatus::builder()
        .config(test_config())
        .prober(link.prober())
        .change_source(RefusingSource)
        .build()
        .expect("Failed to build network status");
    let changes = record(&status);

    let err = status.start().expect_err("Start should surface the failure");
    assert!(err.is_subscription());
    assert!(!status.is_running());
    assert!(status.detector_stats().is_none());

    // Point-in-time checks keep working through direct probes.
    assert!(status.is_available());
    link.set(false);
    assert!(!status.is_available());
    link.set(true);
    assert!(status.is_available());

    assert!(changes.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let link = Link::new(true);
    let (status, source) = monitored(&link);

    let removed_count = Arc::new(AtomicUsize::new(0));
    let removed_clone = removed_count.clone();
    let removed_id = status.subscribe(move |_| {
        removed_clone.fetch_add(1, Ordering::SeqCst);
    });
    let kept = record(&status);

    status.start().expect("Failed to start monitoring");
    assert!(status.unsubscribe(removed_id));
    assert!(!status.unsubscribe(removed_id));

    link.set(false);
    source.notify();
    assert!(kept.recv_timeout(Duration::from_secs(2)).is_ok());
    assert_eq!(removed_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_can_unsubscribe_itself() {
    let link = Link::new(true);
    let (status, source) = monitored(&link);
    let status = Arc::new(status);

    let calls = Arc::new(AtomicUsize::new(0));
    let own_id = Arc::new(Mutex::new(None::<ConnectionId>));
    let id = {
        let status_weak = Arc::downgrade(&status);
        let calls = calls.clone();
        let own_id = own_id.clone();
        status.subscribe(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let (Some(status), Some(id)) = (status_weak.upgrade(), *own_id.lock()) {
                status.unsubscribe(id);
            }
        })
    };
    *own_id.lock() = Some(id);
    let observer = record(&status);

    status.start().expect("Failed to start monitoring");
    link.set(false);
    source.notify();
    assert!(observer.recv_timeout(Duration::from_secs(2)).is_ok());
    link.set(true);
    source.notify();
    assert!(observer.recv_timeout(Duration::from_secs(2)).is_ok());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.availability_changed().connection_count(), 1);
}

#[test]
fn test_panicking_listener_does_not_stop_monitoring() {
    let link = Link::new(true);
    let (status, source) = monitored(&link);
    status.subscribe(|_| panic!("listener failure"));
    let changes = record(&status);
    status.start().expect("Failed to start monitoring");

    link.set(false);
    source.notify();
    assert!(changes.recv_timeout(Duration::from_secs(2)).is_ok());

    link.set(true);
    source.notify();
    let change = changes
        .recv_timeout(Duration::from_secs(2))
        .expect("Detector should survive a panicking listener");
    assert!(change.became_available());
}

#[test]
fn test_start_stop_lifecycle() {
    let link = Link::new(true);
    let (status, source) = monitored(&link);
    assert!(!status.is_running());

    status.start().expect("Failed to start monitoring");
    assert!(status.is_running());
    assert_eq!(source.subscriber_count(), 1);

    // Starting again should be a no-op.
    status.start().expect("Starting again should succeed");
    assert_eq!(source.subscriber_count(), 1);

    status.stop();
    assert!(!status.is_running());
    assert_eq!(source.subscriber_count(), 0);

    status.start().expect("Restart should succeed");
    assert_eq!(source.subscriber_count(), 1);
    drop(status);
    assert_eq!(source.subscriber_count(), 0);
}

#[test]
fn test_refresh_without_detector() {
    let link = Link::new(true);
    let (status, _source) = monitored(&link);
    let changes = record(&status);

    assert_eq!(status.refresh(), None);
    link.set(false);
    let change = status.refresh().expect("Refresh should report the transition");
    assert_eq!(change.previous, Availability::Available);
    assert_eq!(
        changes.try_recv().expect("Listener should be notified"),
        change
    );
}

struct FixedInterfaces(Vec<NetworkInterface>);

impl InterfaceSource for FixedInterfaces {
    fn query_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        Ok(self.0.clone())
    }
}

fn ethernet(name: &str, up: bool) -> NetworkInterface {
    NetworkInterface {
        interface_type: InterfaceType::Ethernet,
        is_up: up,
        ipv4_addresses: vec![Ipv4Info {
            address: Ipv4Addr::new(10, 1, 2, 3),
            prefix_len: 16,
        }],
        ..NetworkInterface::new(name)
    }
}

#[test]
fn test_interface_source_with_policy() {
    let status = NetworkStatus::builder()
        .config(test_config().probe_policy(ProbePolicy::new().ignore_interface("eth1")))
        .interface_source(FixedInterfaces(vec![ethernet("eth0", false), ethernet("eth1", true)]))
        .change_source(ManualChangeSource::new())
        .build()
        .expect("Failed to build network status");

    assert_eq!(status.interfaces().len(), 2);
    assert!(!status.is_available());

    let status = NetworkStatus::builder()
        .config(test_config())
        .interface_source(FixedInterfaces(vec![ethernet("eth0", false), ethernet("eth1", true)]))
        .change_source(ManualChangeSource::new())
        .build()
        .expect("Failed to build network status");
    assert!(status.is_available());
}

#[test]
fn test_invalid_config_rejected() {
    let result = NetworkStatus::builder()
        .config(MonitorConfig::new().debounce(Duration::ZERO))
        .prober(|| true)
        .build();
    assert!(matches!(result, Err(StatusError::InvalidConfig(_))));
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("netstatus.toml");
    std::fs::write(
        &path,
        "debounce_ms = 150\nmax_delay_ms = 900\n\n[probe]\ninclude_tunnels = true\n",
    )
    .unwrap();

    let config = MonitorConfig::load(&path).expect("Failed to load config");
    assert_eq!(config.debounce, Duration::from_millis(150));
    assert_eq!(config.max_delay, Duration::from_millis(900));
    assert!(config.probe.include_tunnels);

    let missing = MonitorConfig::load(dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(StatusError::ConfigIo { .. })));
}

#[test]
fn test_system_monitor_start_stop() {
    let status = NetworkStatus::new().expect("Failed to create network status");
    // Actual availability depends on the host.
    let _available = status.is_available();

    match status.start() {
        Ok(()) => {
            assert!(status.is_running());
            status.stop();
            assert!(!status.is_running());
        }
        // Sandboxed hosts may refuse netlink/route sockets.
        Err(err) => assert!(err.is_subscription(), "Unexpected error: {err}"),
    }
}
