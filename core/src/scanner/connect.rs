//! An **unprivileged** TCP-connect scanner.
//!
//! Used when nmap is unavailable. It cannot see link-layer data, so hosts
//! discovered this way never carry a MAC address or vendor.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use netdetective_common::error::ProbeFailure;
use netdetective_common::probe::{HostProbe, PortProbe};
use netdetective_common::services;
use tokio::task::JoinSet;
use tracing::trace;

use super::ProbeClient;
use crate::network::tcp::{self, Handshake};

/// Ports knocked on during discovery. A refused connection still proves the host is up.
const DISCOVERY_PORTS: [u16; 4] = [80, 443, 22, 445];

/// Share of the per-probe budget spent waiting on a handshake, so the client
/// classifies silence itself before the orchestrator's timeout fires.
const HANDSHAKE_SHARE: f64 = 0.9;

pub struct ConnectClient {
    discovery_ports: Vec<u16>,
}

impl Default for ConnectClient {
    fn default() -> Self {
        Self {
            discovery_ports: DISCOVERY_PORTS.to_vec(),
        }
    }
}

impl ConnectClient {
    pub fn with_discovery_ports(ports: Vec<u16>) -> Self {
        Self {
            discovery_ports: ports,
        }
    }
}

#[async_trait]
impl ProbeClient for ConnectClient {
    fn name(&self) -> &'static str {
        "tcp-connect"
    }

    async fn discover_host(&self, addr: Ipv4Addr, timeout: Duration) -> HostProbe {
        let limit: Duration = timeout.mul_f64(HANDSHAKE_SHARE);
        let mut knocks: JoinSet<Handshake> = JoinSet::new();

        for &port in &self.discovery_ports {
            let socket_addr = SocketAddr::from((addr, port));
            knocks.spawn(tcp::handshake(socket_addr, limit));
        }

        let mut last_error: Option<String> = None;
        while let Some(joined) = knocks.join_next().await {
            let Ok(knock) = joined else { continue };
            if let Some(latency) = knock.latency() {
                return HostProbe::up(latency);
            }
            if let Handshake::Failed(e) = knock {
                trace!(%addr, "handshake failed: {e}");
                if !tcp::is_unreachable(&e) {
                    last_error = Some(e.to_string());
                }
            }
        }

        match last_error {
            Some(cause) => HostProbe::Error(ProbeFailure::Collaborator(cause)),
            None => HostProbe::Down,
        }
    }

    async fn probe_port(&self, addr: Ipv4Addr, port: u16, timeout: Duration) -> PortProbe {
        let socket_addr = SocketAddr::from((addr, port));
        classify_port(port, tcp::handshake(socket_addr, timeout.mul_f64(HANDSHAKE_SHARE)).await)
    }
}

fn classify_port(port: u16, handshake: Handshake) -> PortProbe {
    match handshake {
        Handshake::Accepted(_) => PortProbe::open(services::service_name(port)),
        Handshake::Refused(_) => PortProbe::Closed,
        Handshake::TimedOut => PortProbe::Filtered,
        Handshake::Failed(e) if tcp::is_unreachable(&e) => PortProbe::Filtered,
        Handshake::Failed(e) => PortProbe::Error(ProbeFailure::Collaborator(e.to_string())),
    }
}
