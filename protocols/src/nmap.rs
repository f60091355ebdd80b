//! Decoder for nmap's XML report (`-oX -`).
//!
//! Only the elements a probe needs are modelled; everything else is skipped.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NmapXmlError {
    #[error("malformed nmap XML: {0}")]
    Malformed(#[from] quick_xml::DeError),
    #[error("nmap produced no output")]
    Empty,
}

#[derive(Debug, Default, Deserialize)]
pub struct NmapRun {
    #[serde(rename = "host", default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub runstats: Option<RunStats>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    /// `"true"` when nmap gave up on the host at `--host-timeout`.
    #[serde(rename = "@timedout", default)]
    pub timed_out: Option<String>,
    pub status: Status,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub ports: Option<Ports>,
    #[serde(default)]
    pub times: Option<Times>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(rename = "@state")]
    pub state: String,
    #[serde(rename = "@reason", default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: String,
    #[serde(rename = "@vendor", default)]
    pub vendor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub struct Port {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "@portid")]
    pub port_id: u16,
    pub state: PortState,
    #[serde(default)]
    pub service: Option<Service>,
}

#[derive(Debug, Deserialize)]
pub struct PortState {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct Service {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@product", default)]
    pub product: Option<String>,
    #[serde(rename = "@version", default)]
    pub version: Option<String>,
    #[serde(rename = "@extrainfo", default)]
    pub extra_info: Option<String>,
}

/// Round-trip timing; values are in microseconds.
#[derive(Debug, Deserialize)]
pub struct Times {
    #[serde(rename = "@srtt", default)]
    pub srtt: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RunStats {
    #[serde(default)]
    pub hosts: Option<HostCounts>,
}

#[derive(Debug, Deserialize)]
pub struct HostCounts {
    #[serde(rename = "@up")]
    pub up: u32,
    #[serde(rename = "@down")]
    pub down: u32,
    #[serde(rename = "@total")]
    pub total: u32,
}

pub fn parse_run(xml: &str) -> Result<NmapRun, NmapXmlError> {
    if xml.trim().is_empty() {
        return Err(NmapXmlError::Empty);
    }
    Ok(quick_xml::de::from_str(xml)?)
}

impl NmapRun {
    /// The host entry for `addr`, if nmap reported one.
    pub fn host(&self, addr: &str) -> Option<&Host> {
        self.hosts.iter().find(|host| host.ipv4() == Some(addr))
    }
}

impl Host {
    pub fn is_up(&self) -> bool {
        self.status.state == "up"
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out.as_deref() == Some("true")
    }

    pub fn ipv4(&self) -> Option<&str> {
        self.address_of("ipv4").map(|a| a.addr.as_str())
    }

    pub fn mac(&self) -> Option<&Address> {
        self.address_of("mac")
    }

    pub fn srtt_micros(&self) -> Option<u64> {
        self.times.as_ref().and_then(|t| t.srtt)
    }

    pub fn port(&self, port_id: u16) -> Option<&Port> {
        self.ports
            .as_ref()?
            .ports
            .iter()
            .find(|p| p.port_id == port_id && p.protocol == "tcp")
    }

    fn address_of(&self, addr_type: &str) -> Option<&Address> {
        self.addresses.iter().find(|a| a.addr_type == addr_type)
    }
}

impl Service {
    /// Product, version and extra info joined by spaces; `None` when nmap knew none of them.
    pub fn version_string(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.product, &self.version, &self.extra_info]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
