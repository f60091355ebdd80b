//! # Scan Target Model
//!
//! Defines what a single probe is aimed at and how user input becomes one.
//!
//! Parsing is pure validation:
//! * An IPv4 dotted-quad (e.g. `192.168.1.5`).
//! * A CIDR block (e.g. `192.168.1.0/24`).
//! * A port range (e.g. `60-120`, whitespace tolerated).
//!
//! Re-prompting on invalid input belongs to the caller.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::network::range::{CidrRange, PortRange};

static CIDR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}/([0-9]|[1-2][0-9]|3[0-2])$")
        .expect("static CIDR pattern compiles")
});

static PORT_RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)-([0-9]+)$").expect("static port pattern compiles"));

/// One unit of probing work.
///
/// Ordering follows enumeration order: ascending address for hosts,
/// ascending `(address, port)` for ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    Host { addr: Ipv4Addr },
    Port { addr: Ipv4Addr, port: u16 },
}

impl Target {
    pub fn host(addr: Ipv4Addr) -> Self {
        Target::Host { addr }
    }

    pub fn port(addr: Ipv4Addr, port: u16) -> Self {
        Target::Port { addr, port }
    }

    pub fn addr(&self) -> Ipv4Addr {
        match self {
            Target::Host { addr } | Target::Port { addr, .. } => *addr,
        }
    }

    pub fn port_number(&self) -> Option<u16> {
        match self {
            Target::Host { .. } => None,
            Target::Port { port, .. } => Some(*port),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Host { addr } => write!(f, "{addr}"),
            Target::Port { addr, port } => write!(f, "{addr}:{port}"),
        }
    }
}

/// Strict dotted-quad check: exactly four decimal octets, each 0-255.
pub fn validate_ipv4(input: &str) -> bool {
    parse_octets(input).is_some()
}

/// Parses an IPv4 address with the same rules as [`validate_ipv4`].
pub fn parse_ipv4(input: &str) -> Result<Ipv4Addr, ParseError> {
    parse_octets(input)
        .map(Ipv4Addr::from)
        .ok_or_else(|| ParseError::invalid(input, "expected a dotted-quad such as 192.168.1.5"))
}

/// Parses CIDR notation like `192.168.1.0/24`.
///
/// The pattern accepts any 1-3 digit octet, so every octet is range checked afterwards.
pub fn parse_cidr(input: &str) -> Result<CidrRange, ParseError> {
    let input = input.trim();
    let Some(captures) = CIDR_PATTERN.captures(input) else {
        return Err(ParseError::invalid(input, "expected <a.b.c.d>/<0-32>"));
    };

    let (addr_str, _) = input
        .split_once('/')
        .ok_or_else(|| ParseError::invalid(input, "missing prefix"))?;

    let addr = parse_octets(addr_str)
        .map(Ipv4Addr::from)
        .ok_or_else(|| ParseError::invalid(input, "every octet must be within 0-255"))?;

    let prefix: u8 = captures[1]
        .parse()
        .map_err(|_| ParseError::invalid(input, "prefix must be within 0-32"))?;

    Ok(CidrRange::new(addr, prefix))
}

/// Parses `<int>-<int>` after stripping all whitespace.
pub fn parse_port_range(input: &str) -> Result<PortRange, ParseError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(captures) = PORT_RANGE_PATTERN.captures(&compact) else {
        return Err(ParseError::invalid(input, "expected <int>-<int>, e.g. 60-120"));
    };

    let min = parse_port(&captures[1], input)?;
    let max = parse_port(&captures[2], input)?;

    if min > max {
        return Err(ParseError::invalid(input, "range start is greater than range end"));
    }

    Ok(PortRange::new(min, max))
}

fn parse_port(digits: &str, original: &str) -> Result<u16, ParseError> {
    digits
        .parse::<u16>()
        .map_err(|_| ParseError::invalid(original, "ports must be within 0-65535"))
}

fn parse_octets(input: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = input.split('.');

    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse::<u8>().ok()?;
    }

    match parts.next() {
        Some(_) => None,
        None => Some(octets),
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
