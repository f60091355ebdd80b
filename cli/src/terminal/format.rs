//! Render-time presentation of sweep reports.
//!
//! Everything here is pure: rows and summary lines are built from a report and a
//! [`Palette`], and printing is left to the command handlers.

use std::net::Ipv4Addr;
use std::time::Duration;

use colored::*;
use netdetective_common::probe::{HostProbe, PortProbe, UNKNOWN_VERSION};
use netdetective_common::services;
use netdetective_core::aggregator::Summary;

use crate::terminal::colors;

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Styling thresholds and colors, passed into the renderer by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub fast_below: Duration,
    pub moderate_below: Duration,
    pub fast: Color,
    pub moderate: Color,
    pub slow: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            fast_below: Duration::from_millis(100),
            moderate_below: Duration::from_millis(500),
            fast: colors::FAST,
            moderate: colors::MODERATE,
            slow: colors::SLOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyClass {
    Fast,
    Moderate,
    Slow,
}

pub fn classify_latency(latency: Duration, palette: &Palette) -> LatencyClass {
    if latency < palette.fast_below {
        LatencyClass::Fast
    } else if latency < palette.moderate_below {
        LatencyClass::Moderate
    } else {
        LatencyClass::Slow
    }
}

impl Palette {
    pub fn latency_color(&self, class: LatencyClass) -> Color {
        match class {
            LatencyClass::Fast => self.fast,
            LatencyClass::Moderate => self.moderate,
            LatencyClass::Slow => self.slow,
        }
    }
}

/// How a row should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Live(LatencyClass),
    Down,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRow {
    pub address: String,
    pub latency: String,
    pub mac: String,
    pub vendor: String,
    pub style: RowStyle,
    /// Failure cause of an error row.
    pub note: Option<String>,
}

pub fn host_row(addr: Ipv4Addr, result: &HostProbe, palette: &Palette) -> HostRow {
    let address = addr.to_string();
    match result {
        HostProbe::Up { latency, mac, vendor } => HostRow {
            address,
            latency: format_latency(*latency),
            mac: mac.map_or_else(|| NOT_AVAILABLE.to_string(), |m| m.to_string()),
            vendor: vendor.clone().unwrap_or_else(|| UNKNOWN_VENDOR.to_string()),
            style: RowStyle::Live(classify_latency(*latency, palette)),
            note: None,
        },
        HostProbe::Down => HostRow {
            address,
            latency: NOT_AVAILABLE.to_string(),
            mac: NOT_AVAILABLE.to_string(),
            vendor: UNKNOWN_VENDOR.to_string(),
            style: RowStyle::Down,
            note: None,
        },
        HostProbe::Error(failure) => HostRow {
            address,
            latency: NOT_AVAILABLE.to_string(),
            mac: NOT_AVAILABLE.to_string(),
            vendor: UNKNOWN_VENDOR.to_string(),
            style: RowStyle::Warning,
            note: Some(failure.to_string()),
        },
    }
}

pub fn format_latency(latency: Duration) -> String {
    format!("{:.4}s", latency.as_secs_f64())
}

pub const HOST_COLUMNS: [&str; 4] = ["IP Address", "Latency", "MAC Address", "Vendor"];

fn columns(cells: [&str; 4]) -> String {
    format!("{:<16} {:<10} {:<18} {}", cells[0], cells[1], cells[2], cells[3])
}

pub fn host_table_header() -> String {
    columns(HOST_COLUMNS)
}

impl HostRow {
    pub fn plain(&self) -> String {
        columns([&self.address, &self.latency, &self.mac, &self.vendor])
    }

    pub fn styled(&self, palette: &Palette) -> String {
        let address = format!("{:<16}", self.address).color(colors::IPV4_ADDR);
        let latency = format!("{:<10}", self.latency);
        let latency = match self.style {
            RowStyle::Live(class) => latency.color(palette.latency_color(class)),
            RowStyle::Down | RowStyle::Warning => latency.color(colors::SEPARATOR),
        };
        let mac = format!("{:<18}", self.mac).color(colors::MAC_ADDR);
        let vendor = self.vendor.color(colors::VENDOR);
        format!("{address} {latency} {mac} {vendor}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRow {
    pub port: u16,
    pub state: &'static str,
    pub service: String,
    pub version: String,
    pub style: RowStyle,
}

pub fn port_row(port: u16, result: &PortProbe) -> PortRow {
    let (service, version, style) = match result {
        PortProbe::Open { service, version } => (
            service.clone(),
            version.clone(),
            RowStyle::Live(LatencyClass::Fast),
        ),
        PortProbe::Closed | PortProbe::Filtered => (
            services::service_name(port).to_string(),
            UNKNOWN_VERSION.to_string(),
            RowStyle::Down,
        ),
        PortProbe::Error(failure) => (
            failure.to_string(),
            UNKNOWN_VERSION.to_string(),
            RowStyle::Warning,
        ),
    };
    PortRow {
        port,
        state: result.state_str(),
        service,
        version,
        style,
    }
}

impl PortRow {
    pub fn plain(&self) -> String {
        format!(
            "Port {} is {} - Service: {} (Version: {})",
            self.port, self.state, self.service, self.version
        )
    }

    pub fn styled(&self, palette: &Palette) -> String {
        let state = match self.style {
            RowStyle::Live(_) => self.state.color(palette.fast).bold(),
            RowStyle::Down => self.state.color(colors::SEPARATOR),
            RowStyle::Warning => self.state.color(palette.moderate),
        };
        format!(
            "Port {} is {} - Service: {} (Version: {})",
            self.port.to_string().color(colors::ACCENT),
            state,
            self.service.color(colors::PRIMARY),
            self.version
        )
    }
}

pub fn discovery_summary(summary: &Summary) -> String {
    format!(
        "Sweep done: {} IP addresses ({} hosts up) scanned in {:.2} seconds",
        summary.total,
        summary.success,
        summary.elapsed.as_secs_f64()
    )
}

pub fn port_summary(summary: &Summary) -> String {
    format!(
        "Scan done: {} ports ({} open) scanned in {:.2} seconds",
        summary.total,
        summary.success,
        summary.elapsed.as_secs_f64()
    )
}

/// Tally of non-determined targets, or `None` when every probe answered.
pub fn error_tally(summary: &Summary) -> Option<String> {
    match (summary.errors, summary.cancelled) {
        (0, 0) => None,
        (errors, 0) => Some(format!("{errors} probes failed")),
        (0, cancelled) => Some(format!("{cancelled} probes cancelled")),
        (errors, cancelled) => Some(format!(
            "{errors} probes failed, {cancelled} probes cancelled"
        )),
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
