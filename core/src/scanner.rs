//! The central **abstraction** over scan backends.
//!
//! This module defines the [`ProbeClient`] contract that concrete collaborators (the
//! [`nmap`] subprocess adapter, the unprivileged [`connect`] adapter) implement.
//! Every call is scoped to exactly one target, so one unreachable host or unscannable
//! port never contaminates the results of another.
//!
//! **Architectural Note:**
//! The orchestrator depends strictly on this trait rather than on concrete submodules,
//! which keeps backends swappable and lets tests drive sweeps with fakes.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netdetective_common::error::SweepError;
use netdetective_common::probe::{HostProbe, PortProbe};
use tracing::{debug, info};

use crate::vendors::VendorRepository;

pub mod connect;
pub mod nmap;

use connect::ConnectClient;
use nmap::NmapClient;

/// Issues single-target probes against an external scan collaborator.
///
/// Implementations never fail past this boundary: collaborator problems are
/// returned as the `Error` variant of the probe result.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Verifies the backend can run at all. Called once before each sweep.
    async fn check_available(&self) -> Result<(), SweepError> {
        Ok(())
    }

    /// One lightweight reachability probe.
    async fn discover_host(&self, addr: Ipv4Addr, timeout: Duration) -> HostProbe;

    /// One service-detection probe of a single TCP port.
    async fn probe_port(&self, addr: Ipv4Addr, port: u16, timeout: Duration) -> PortProbe;
}

/// Which collaborator to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// nmap when installed, TCP connect otherwise.
    #[default]
    Auto,
    Nmap,
    Connect,
}

/// Builds the probe client for `backend`.
pub async fn select_backend(
    backend: Backend,
    vendors: Arc<dyn VendorRepository>,
) -> Arc<dyn ProbeClient> {
    match backend {
        Backend::Nmap => Arc::new(NmapClient::new(vendors)),
        Backend::Connect => Arc::new(ConnectClient::default()),
        Backend::Auto => {
            let nmap = NmapClient::new(vendors);
            match nmap.check_available().await {
                Ok(()) => {
                    debug!("nmap found, using it as scan backend");
                    Arc::new(nmap)
                }
                Err(e) => {
                    info!("{e}; falling back to TCP connect probes");
                    Arc::new(ConnectClient::default())
                }
            }
        }
    }
}
