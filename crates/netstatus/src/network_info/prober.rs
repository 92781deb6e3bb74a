//! Interface probing: reduce the host's interfaces to one availability flag.

use serde::Deserialize;

use netstatus_core::logging::targets;

use super::interface::NetworkInterface;
use crate::error::Result;

/// Something that can enumerate the host's network interfaces.
pub trait InterfaceSource: Send + Sync {
    /// Return a snapshot of the current interfaces.
    fn query_interfaces(&self) -> Result<Vec<NetworkInterface>>;
}

/// Interface source backed by the operating system (via `netdev`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn query_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        Ok(NetworkInterface::list())
    }
}

/// A synchronous, side-effect free availability check.
///
/// Implementations must not fail: a check that cannot be completed reports
/// `false`.
pub trait Probe: Send + Sync {
    /// Returns `true` if at least one usable network path exists.
    fn probe(&self) -> bool;
}

impl<F> Probe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn probe(&self) -> bool {
        self()
    }
}

/// Rules deciding which interfaces count as a usable network path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProbePolicy {
    /// Count tunnel interfaces (VPN, TUN/TAP) as usable.
    pub include_tunnels: bool,
    /// Count adapters whose name or description mentions "virtual".
    pub include_virtual: bool,
    /// Require a known gateway on the interface.
    pub require_gateway: bool,
    /// Interface names that are never considered (exact match).
    pub ignored_interfaces: Vec<String>,
}

impl ProbePolicy {
    /// Create the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether tunnel interfaces count.
    pub fn include_tunnels(mut self, include: bool) -> Self {
        self.include_tunnels = include;
        self
    }

    /// Set whether virtual adapters count.
    pub fn include_virtual(mut self, include: bool) -> Self {
        self.include_virtual = include;
        self
    }

    /// Set whether a gateway is required.
    pub fn require_gateway(mut self, require: bool) -> Self {
        self.require_gateway = require;
        self
    }

    /// Never consider the named interface.
    pub fn ignore_interface(mut self, name: impl Into<String>) -> Self {
        self.ignored_interfaces.push(name.into());
        self
    }

    /// Check whether a single interface is a usable network path.
    pub fn is_usable(&self, iface: &NetworkInterface) -> bool {
        iface.is_up
            && !iface.is_loopback()
            && (self.include_tunnels || !iface.is_tunnel())
            && (self.include_virtual || !iface.is_virtual())
            && (!self.require_gateway || iface.has_gateway)
            && !self.ignored_interfaces.iter().any(|name| *name == iface.name)
            && !iface.routable_addresses().is_empty()
    }

    /// Check whether any interface in the list is usable.
    pub fn any_usable(&self, interfaces: &[NetworkInterface]) -> bool {
        interfaces.iter().any(|iface| self.is_usable(iface))
    }
}

/// Probe that queries an [`InterfaceSource`] and applies a [`ProbePolicy`].
#[derive(Debug, Clone, Default)]
pub struct InterfaceProber<S = SystemInterfaces> {
    source: S,
    policy: ProbePolicy,
}

impl InterfaceProber<SystemInterfaces> {
    /// Create a prober for the host's interfaces.
    pub fn system(policy: ProbePolicy) -> Self {
        Self::new(SystemInterfaces, policy)
    }
}

impl<S: InterfaceSource> InterfaceProber<S> {
    /// Create a prober over a custom interface source.
    pub fn new(source: S, policy: ProbePolicy) -> Self {
        Self { source, policy }
    }

    /// The policy applied by this prober.
    pub fn policy(&self) -> &ProbePolicy {
        &self.policy
    }

    /// The interface source queried by this prober.
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: InterfaceSource> Probe for InterfaceProber<S> {
    fn probe(&self) -> bool {
        match self.source.query_interfaces() {
            Ok(interfaces) => {
                let available = self.policy.any_usable(&interfaces);
                tracing::trace!(
                    target: targets::PROBE,
                    interface_count = interfaces.len(),
                    available,
                    "probed interfaces"
                );
                available
            }
            Err(err) => {
                tracing::warn!(target: targets::PROBE, error = %err, "interface query failed, reporting unavailable");
                false
            }
        }
    }
}
