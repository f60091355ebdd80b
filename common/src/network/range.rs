//! Address and port ranges that expand lazily into [`Target`]s.

use std::net::Ipv4Addr;

use super::target::Target;

/// An IPv4 block in CIDR notation.
///
/// Expansion includes the network and broadcast addresses, so a `/24` yields
/// 256 targets and a `/32` yields exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrRange {
    pub network_addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl CidrRange {
    /// Builds a range, masking host bits off `addr`. Callers validate `prefix_len <= 32`.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        let mask: u32 = prefix_mask(prefix_len);
        Self {
            network_addr: Ipv4Addr::from(u32::from(addr) & mask),
            prefix_len,
        }
    }

    /// Number of addresses in the block (up to 2^32, hence `u64`).
    pub fn address_count(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len.min(32)))
    }

    /// Lazily yields at most `max_hosts` host targets in ascending address order.
    pub fn hosts(&self, max_hosts: usize) -> impl Iterator<Item = Target> + Send + use<> {
        let start: u64 = u64::from(u32::from(self.network_addr));
        let end: u64 = start + self.address_count();
        (start..end)
            .take(max_hosts)
            .map(|raw| Target::host(Ipv4Addr::from(raw as u32)))
    }

    /// True when expansion would be cut short by `max_hosts`.
    pub fn exceeds(&self, max_hosts: usize) -> bool {
        self.address_count() > max_hosts as u64
    }
}

impl std::fmt::Display for CidrRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network_addr, self.prefix_len)
    }
}

fn prefix_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        p if p >= 32 => u32::MAX,
        p => u32::MAX << (32 - u32::from(p)),
    }
}

/// An inclusive port interval for a single host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    pub fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// Port 0 is never probed, so a range starting at 0 expands from 1.
    fn first_probeable(&self) -> u16 {
        self.min.max(1)
    }

    pub fn len(&self) -> usize {
        let first = self.first_probeable();
        if first > self.max {
            0
        } else {
            usize::from(self.max - first) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily yields one port target per port, ascending.
    pub fn ports(&self, addr: Ipv4Addr) -> impl Iterator<Item = Target> + Send + use<> {
        (self.first_probeable()..=self.max).map(move |port| Target::port(addr, port))
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
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
