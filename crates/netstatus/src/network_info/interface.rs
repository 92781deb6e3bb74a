//! Network interface information.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A snapshot of one network interface on the system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInterface {
    /// Interface index.
    pub index: u32,
    /// Interface name (e.g., "eth0", "en0", "Wi-Fi").
    pub name: String,
    /// Human-readable description (Windows only, empty on other platforms).
    pub description: String,
    /// Interface type (Ethernet, Loopback, Tunnel, ...).
    pub interface_type: InterfaceType,
    /// Whether the interface is currently up.
    pub is_up: bool,
    /// IPv4 addresses assigned to this interface.
    pub ipv4_addresses: Vec<Ipv4Info>,
    /// IPv6 addresses assigned to this interface.
    pub ipv6_addresses: Vec<Ipv6Info>,
    /// Whether a gateway (next hop) is known for this interface.
    pub has_gateway: bool,
}

/// IPv4 address information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Info {
    /// The IPv4 address.
    pub address: Ipv4Addr,
    /// Network prefix length (CIDR notation).
    pub prefix_len: u8,
}

/// IPv6 address information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Info {
    /// The IPv6 address.
    pub address: Ipv6Addr,
    /// Network prefix length.
    pub prefix_len: u8,
}

/// Type of network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// Ethernet or other physical interface.
    Ethernet,
    /// Loopback interface (localhost).
    Loopback,
    /// Tunnel interface (VPN, TUN/TAP).
    Tunnel,
    /// Unknown interface type.
    #[default]
    Unknown,
}

impl std::fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterfaceType::Ethernet => write!(f, "Ethernet"),
            InterfaceType::Loopback => write!(f, "Loopback"),
            InterfaceType::Tunnel => write!(f, "Tunnel"),
            InterfaceType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl NetworkInterface {
    /// Create an interface snapshot with the given name and nothing else set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get all network interfaces on the system.
    pub fn list() -> Vec<NetworkInterface> {
        netdev::get_interfaces()
            .into_iter()
            .map(Self::from_netdev)
            .collect()
    }

    fn from_netdev(iface: netdev::Interface) -> Self {
        let ipv4_addresses = iface
            .ipv4
            .iter()
            .map(|net| Ipv4Info {
                address: net.addr(),
                prefix_len: net.prefix_len(),
            })
            .collect();

        let ipv6_addresses = iface
            .ipv6
            .iter()
            .map(|net| Ipv6Info {
                address: net.addr(),
                prefix_len: net.prefix_len(),
            })
            .collect();

        // netdev doesn't distinguish WiFi from Ethernet reliably
        let interface_type = if iface.is_loopback() {
            InterfaceType::Loopback
        } else if iface.is_tun() {
            InterfaceType::Tunnel
        } else {
            InterfaceType::Ethernet
        };

        NetworkInterface {
            index: iface.index,
            name: iface.name.clone(),
            description: iface.description.clone().unwrap_or_default(),
            interface_type,
            is_up: iface.is_up(),
            ipv4_addresses,
            ipv6_addresses,
            has_gateway: iface.gateway.is_some(),
        }
    }

    /// Get all IP addresses (both v4 and v6) for this interface.
    pub fn all_addresses(&self) -> Vec<IpAddr> {
        let mut addrs: Vec<IpAddr> = self
            .ipv4_addresses
            .iter()
            .map(|info| IpAddr::V4(info.address))
            .collect();
        addrs.extend(
            self.ipv6_addresses
                .iter()
                .map(|info| IpAddr::V6(info.address)),
        );
        addrs
    }

    /// Addresses that can carry traffic beyond the local link.
    ///
    /// Excludes unspecified, loopback and link-local addresses.
    pub fn routable_addresses(&self) -> Vec<IpAddr> {
        self.all_addresses()
            .into_iter()
            .filter(|addr| is_routable(addr))
            .collect()
    }

    /// Check if this interface has any IP addresses assigned.
    pub fn has_addresses(&self) -> bool {
        !self.ipv4_addresses.is_empty() || !self.ipv6_addresses.is_empty()
    }

    /// Check if this is the loopback interface.
    pub fn is_loopback(&self) -> bool {
        self.interface_type == InterfaceType::Loopback
    }

    /// Check if this is a tunnel interface.
    pub fn is_tunnel(&self) -> bool {
        self.interface_type == InterfaceType::Tunnel
    }

    /// Check if the name or description identifies a virtual adapter
    /// (hypervisor host-only networks and the like).
    pub fn is_virtual(&self) -> bool {
        self.name.to_ascii_lowercase().contains("virtual")
            || self.description.to_ascii_lowercase().contains("virtual")
    }
}

fn is_routable(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => !(v4.is_unspecified() || v4.is_loopback() || v4.is_link_local()),
        IpAddr::V6(v6) => {
            !(v6.is_unspecified() || v6.is_loopback() || v6.is_unicast_link_local())
        }
    }
}
