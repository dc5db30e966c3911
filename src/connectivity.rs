//! Network reachability probe.
//!
//! The host only needs one bit: is a network route available right now?
//! It picks the surface cache policy at startup and short-circuits the
//! download interceptor when offline.
//!
//! [`SystemConnectivity`] asks the OS routing table by "connecting" an
//! unbound UDP socket to a public address. `connect()` on UDP sends no
//! packet; it only fails when no route exists (no interface up, no default
//! gateway), which is what "connected or connecting" means for a desktop.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::debug;

/// Reachability query.
pub trait Connectivity {
    fn is_connected(&self) -> bool;
}

/// Probe backed by the OS routing table.
#[derive(Debug, Clone)]
pub struct SystemConnectivity {
    targets: Vec<SocketAddr>,
}

impl Default for SystemConnectivity {
    fn default() -> Self {
        Self {
            targets: vec![
                SocketAddr::from((Ipv4Addr::new(1, 1, 1, 1), 53)),
                SocketAddr::from((Ipv6Addr::new(0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1111), 53)),
            ],
        }
    }
}

impl SystemConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe with custom targets (one route is enough).
    pub fn with_targets(targets: Vec<SocketAddr>) -> Self {
        Self { targets }
    }
}

impl Connectivity for SystemConnectivity {
    fn is_connected(&self) -> bool {
        self.targets.iter().any(|target| {
            let bind: SocketAddr = if target.is_ipv4() {
                (Ipv4Addr::UNSPECIFIED, 0).into()
            } else {
                (Ipv6Addr::UNSPECIFIED, 0).into()
            };
            let routed = UdpSocket::bind(bind)
                .and_then(|socket| socket.connect(target))
                .is_ok();
            debug!(%target, routed, "Connectivity probe");
            routed
        })
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub bool);

impl Connectivity for FixedConnectivity {
    fn is_connected(&self) -> bool {
        self.0
    }
}
