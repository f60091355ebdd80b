//! An adapter driving the **nmap** binary as a subprocess.
//!
//! Each probe runs nmap against one target with XML output on stdout. Port probes
//! take two runs: a state scan, then service detection for open ports only.
//! Link-layer data (MAC, vendor) is only reported by nmap for on-segment targets
//! scanned with sufficient privileges.

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netdetective_common::error::{ProbeFailure, SweepError};
use netdetective_common::probe::{HostProbe, PortProbe, UNKNOWN_VERSION};
use netdetective_common::services;
use netdetective_protocols::nmap::{self as xml, NmapRun};
use pnet::util::MacAddr;
use tokio::process::Command;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use super::ProbeClient;
use crate::vendors::VendorRepository;

const ROOT_REQUIRED: &[&str] = &["requires root privileges", "Operation not permitted"];

/// Share of the per-probe budget handed to nmap as `--host-timeout`, so nmap gives
/// up and reports before the orchestrator's timeout fires.
const NMAP_SHARE: f64 = 0.9;

/// Share of a port probe's budget spent on the state scan. Service detection gets
/// the rest; nmap waits up to 6 s for a banner before it sends its first probe.
const STATE_SHARE: f64 = 0.3;

/// nmap refuses shorter host timeouts.
const MIN_HOST_TIMEOUT: Duration = Duration::from_millis(1500);

pub struct NmapClient {
    binary: PathBuf,
    vendors: Arc<dyn VendorRepository>,
}

struct NmapOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

impl NmapClient {
    pub fn new(vendors: Arc<dyn VendorRepository>) -> Self {
        Self {
            binary: PathBuf::from("nmap"),
            vendors,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn execute(&self, args: &[String]) -> Result<NmapOutput, ProbeFailure> {
        trace!("executing nmap with args: {:?}", args);

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(spawn_failure)?;

        Ok(NmapOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }

    async fn run_xml(&self, args: Vec<String>) -> Result<NmapRun, ProbeFailure> {
        let output = self.execute(&args).await?;
        if !output.success {
            return Err(exit_failure(&output.stderr));
        }
        xml::parse_run(&output.stdout).map_err(|e| ProbeFailure::Collaborator(e.to_string()))
    }

    /// `measured` is the wall time of the nmap run, `limit` the host timeout it was given.
    fn to_host_probe(
        &self,
        run: &NmapRun,
        addr: Ipv4Addr,
        measured: Duration,
        limit: Duration,
    ) -> HostProbe {
        let host = run.host(&addr.to_string());
        let Some(host) = host.filter(|h| h.is_up() && !h.timed_out()) else {
            // nmap drops hosts it gave up on, so a miss that used the whole
            // budget is a timeout, not an answer.
            if host.is_some_and(|h| h.timed_out()) || measured >= limit {
                return HostProbe::Error(ProbeFailure::Timeout);
            }
            return HostProbe::Down;
        };

        let latency = host
            .srtt_micros()
            .map(Duration::from_micros)
            .unwrap_or(measured);

        let mac_entry = host.mac();
        let mac: Option<MacAddr> = mac_entry.and_then(|m| m.addr.parse().ok());
        let vendor: Option<String> = mac_entry
            .and_then(|m| m.vendor.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| mac.and_then(|m| self.vendors.get_vendor(m)));

        HostProbe::Up {
            latency,
            mac,
            vendor,
        }
    }
}

#[async_trait]
impl ProbeClient for NmapClient {
    fn name(&self) -> &'static str {
        "nmap"
    }

    async fn check_available(&self) -> Result<(), SweepError> {
        let output = self
            .execute(&["--version".to_string()])
            .await
            .map_err(|e| SweepError::CollaboratorUnavailable(e.to_string()))?;

        if !output.success {
            return Err(SweepError::CollaboratorUnavailable(format!(
                "'{} --version' failed: {}",
                self.binary.display(),
                first_line(&output.stderr)
            )));
        }

        debug!("{}", first_line(&output.stdout));
        Ok(())
    }

    async fn discover_host(&self, addr: Ipv4Addr, timeout: Duration) -> HostProbe {
        let started = Instant::now();
        let limit = host_timeout(timeout.mul_f64(NMAP_SHARE));

        match self.run_xml(discovery_args(addr, limit)).await {
            Ok(run) => self.to_host_probe(&run, addr, started.elapsed(), limit),
            Err(failure) => HostProbe::Error(failure),
        }
    }

    async fn probe_port(&self, addr: Ipv4Addr, port: u16, timeout: Duration) -> PortProbe {
        let started = Instant::now();
        let budget = timeout.mul_f64(NMAP_SHARE);

        let state = match self
            .run_xml(state_args(addr, port, host_timeout(timeout.mul_f64(STATE_SHARE))))
            .await
        {
            Ok(run) => to_port_probe(&run, addr, port),
            Err(failure) => return PortProbe::Error(failure),
        };
        if !matches!(state, PortProbe::Open { .. }) {
            return state;
        }

        // The state is settled; whatever service detection fails to add leaves
        // the port open with an unknown version.
        let remaining = budget.saturating_sub(started.elapsed());
        let detection = self.run_xml(service_args(addr, port, host_timeout(remaining)));
        match time::timeout(remaining, detection).await {
            Ok(Ok(run)) => match to_port_probe(&run, addr, port) {
                open @ PortProbe::Open { .. } => open,
                other => {
                    debug!(%addr, port, "service detection reported {other:?}");
                    state
                }
            },
            Ok(Err(failure)) => {
                debug!(%addr, port, "service detection failed: {failure}");
                state
            }
            Err(_elapsed) => {
                debug!(%addr, port, "service detection ran out of time");
                state
            }
        }
    }
}

fn host_timeout(budget: Duration) -> Duration {
    budget.max(MIN_HOST_TIMEOUT)
}

fn with_host_timeout(mut args: Vec<String>, addr: Ipv4Addr, limit: Duration) -> Vec<String> {
    args.extend([
        "-oX".into(),
        "-".into(),
        "--host-timeout".into(),
        format!("{}ms", limit.as_millis()),
        addr.to_string(),
    ]);
    args
}

fn discovery_args(addr: Ipv4Addr, limit: Duration) -> Vec<String> {
    with_host_timeout(vec!["-sn".into(), "-n".into()], addr, limit)
}

fn state_args(addr: Ipv4Addr, port: u16, limit: Duration) -> Vec<String> {
    let args = vec!["-n".into(), "-Pn".into(), "-p".into(), port.to_string()];
    with_host_timeout(args, addr, limit)
}

fn service_args(addr: Ipv4Addr, port: u16, limit: Duration) -> Vec<String> {
    let args = vec![
        "-sV".into(),
        "-n".into(),
        "-Pn".into(),
        "-p".into(),
        port.to_string(),
    ];
    with_host_timeout(args, addr, limit)
}

fn to_port_probe(run: &NmapRun, addr: Ipv4Addr, port: u16) -> PortProbe {
    let host = run.host(&addr.to_string());
    let Some(entry) = host.and_then(|host| host.port(port)) else {
        // With -Pn nmap always reports the host unless it gave up on it.
        if host.is_none_or(|h| h.timed_out()) {
            return PortProbe::Error(ProbeFailure::Timeout);
        }
        return PortProbe::Error(ProbeFailure::Collaborator(format!(
            "nmap reported no state for port {port}"
        )));
    };

    match entry.state.state.as_str() {
        "open" => {
            let service = entry.service.as_ref();
            PortProbe::Open {
                service: service
                    .and_then(|s| s.name.clone())
                    .unwrap_or_else(|| services::service_name(port).to_string()),
                version: service
                    .and_then(|s| s.version_string())
                    .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            }
        }
        "closed" => PortProbe::Closed,
        "filtered" | "open|filtered" | "closed|filtered" | "unfiltered" => PortProbe::Filtered,
        other => PortProbe::Error(ProbeFailure::Collaborator(format!(
            "unexpected port state '{other}'"
        ))),
    }
}

fn spawn_failure(err: io::Error) -> ProbeFailure {
    match err.kind() {
        io::ErrorKind::NotFound => ProbeFailure::Unavailable("nmap binary not found".into()),
        io::ErrorKind::PermissionDenied => {
            ProbeFailure::Unavailable("permission denied while launching nmap".into())
        }
        _ => ProbeFailure::Collaborator(format!("failed to launch nmap: {err}")),
    }
}

fn exit_failure(stderr: &str) -> ProbeFailure {
    if ROOT_REQUIRED.iter().any(|needle| stderr.contains(needle)) {
        return ProbeFailure::Unavailable(first_line(stderr).to_string());
    }
    let line = first_line(stderr);
    if line.is_empty() {
        ProbeFailure::Collaborator("nmap exited with an error".into())
    } else {
        ProbeFailure::Collaborator(line.to_string())
    }
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
