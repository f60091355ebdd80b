//! # Probe Results
//!
//! Outcomes of a single probe. Host discovery and port probes have their own
//! variant sets; both classify into the same [`OutcomeClass`] buckets so the
//! aggregator can tally them without knowing which kind of sweep it serves.

use std::time::Duration;

use pnet::util::MacAddr;

use crate::error::ProbeFailure;

/// Summary bucket of a probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeClass {
    /// Up host or open port.
    Success,
    /// A determined answer that is not a success: down, closed or filtered.
    Negative,
    /// Timeout or collaborator failure.
    Error,
    /// Abandoned because the sweep was cancelled.
    Cancelled,
}

/// Common behaviour of probe outcomes, used by the orchestrator and aggregator.
pub trait Outcome: Clone + Send + 'static {
    fn from_failure(failure: ProbeFailure) -> Self;

    fn failure(&self) -> Option<&ProbeFailure>;

    fn is_determined(&self) -> bool;

    fn class(&self) -> OutcomeClass {
        match self.failure() {
            Some(ProbeFailure::Cancelled) => OutcomeClass::Cancelled,
            Some(_) => OutcomeClass::Error,
            None if self.is_determined() => OutcomeClass::Success,
            None => OutcomeClass::Negative,
        }
    }
}

/// Result of a host discovery probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostProbe {
    Up {
        latency: Duration,
        /// Only known for on-segment targets.
        mac: Option<MacAddr>,
        vendor: Option<String>,
    },
    Down,
    Error(ProbeFailure),
}

impl HostProbe {
    pub fn up(latency: Duration) -> Self {
        HostProbe::Up {
            latency,
            mac: None,
            vendor: None,
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            HostProbe::Up { latency, .. } => Some(*latency),
            _ => None,
        }
    }
}

impl Outcome for HostProbe {
    fn from_failure(failure: ProbeFailure) -> Self {
        HostProbe::Error(failure)
    }

    fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            HostProbe::Error(failure) => Some(failure),
            _ => None,
        }
    }

    fn is_determined(&self) -> bool {
        matches!(self, HostProbe::Up { .. })
    }
}

pub const UNKNOWN_VERSION: &str = "unknown";

/// Result of a single-port service probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortProbe {
    Open { service: String, version: String },
    Closed,
    Filtered,
    Error(ProbeFailure),
}

impl PortProbe {
    /// An open port whose version could not be determined. Not an error.
    pub fn open(service: impl Into<String>) -> Self {
        PortProbe::Open {
            service: service.into(),
            version: UNKNOWN_VERSION.to_string(),
        }
    }

    pub fn state_str(&self) -> &'static str {
        match self {
            PortProbe::Open { .. } => "open",
            PortProbe::Closed => "closed",
            PortProbe::Filtered => "filtered",
            PortProbe::Error(_) => "error",
        }
    }
}

impl Outcome for PortProbe {
    fn from_failure(failure: ProbeFailure) -> Self {
        PortProbe::Error(failure)
    }

    fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            PortProbe::Error(failure) => Some(failure),
            _ => None,
        }
    }

    fn is_determined(&self) -> bool {
        matches!(self, PortProbe::Open { .. })
    }
}
