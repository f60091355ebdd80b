pub mod discover;
pub mod menu;
pub mod scan;

use std::net::Ipv4Addr;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use netdetective_common::config::{Config, SweepConfig};
use netdetective_common::error::ConfigError;
use netdetective_common::network::range::{CidrRange, PortRange};
use netdetective_common::network::target;
use netdetective_core::scanner::Backend;

#[derive(Parser)]
#[command(name = "netdetective")]
#[command(version, about = "A simple network investigation and analysis tool.")]
pub struct CommandLine {
    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Maximum number of probes in flight
    #[arg(short, long, default_value_t = 32, global = true)]
    pub concurrency: usize,

    /// Per-host discovery timeout in milliseconds
    #[arg(long = "timeout", value_name = "MS", default_value_t = 2_000, global = true)]
    pub timeout_ms: u64,

    /// Per-port timeout in milliseconds, including service detection
    #[arg(long = "service-timeout", value_name = "MS", default_value_t = 10_000, global = true)]
    pub service_timeout_ms: u64,

    /// Whole-sweep deadline in seconds
    #[arg(long = "deadline", value_name = "SECS", default_value_t = 300, global = true)]
    pub deadline_secs: u64,

    /// Grace period for outstanding probes after cancellation, in milliseconds
    #[arg(long = "grace", value_name = "MS", default_value_t = 500, global = true)]
    pub grace_ms: u64,

    /// Retry timed-out probes once
    #[arg(long, global = true)]
    pub retry: bool,

    /// Limit dispatch to this many probes per second
    #[arg(long, value_name = "PROBES_PER_SEC", global = true)]
    pub rate: Option<u32>,

    /// Cap on the number of addresses a CIDR block expands to
    #[arg(long, default_value_t = 65_536, global = true)]
    pub max_hosts: usize,

    /// Scan backend
    #[arg(long, value_enum, default_value_t = BackendArg::Auto, global = true)]
    pub backend: BackendArg,

    /// Less output; repeat to print results only
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Show debug logs and down hosts
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover live hosts in a CIDR block
    #[command(alias = "d")]
    Discover {
        #[arg(value_parser = target::parse_cidr)]
        cidr: CidrRange,
    },
    /// Scan a port range on a single host
    #[command(alias = "s")]
    Scan {
        #[arg(value_parser = target::parse_ipv4)]
        ip: Ipv4Addr,
        #[arg(value_parser = target::parse_port_range)]
        ports: PortRange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Auto,
    Nmap,
    Connect,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Nmap => Backend::Nmap,
            BackendArg::Connect => Backend::Connect,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let sweep = SweepConfig {
            concurrency: self.concurrency,
            probe_timeout: Duration::from_millis(self.timeout_ms),
            service_timeout: Duration::from_millis(self.service_timeout_ms),
            sweep_deadline: Duration::from_secs(self.deadline_secs),
            grace_period: Duration::from_millis(self.grace_ms),
            retries: u8::from(self.retry),
            rate_limit: self.rate,
            max_hosts: self.max_hosts,
        }
        .validate()?;

        Ok(Config {
            quiet: self.quiet,
            verbose: self.verbose,
            no_banner: self.no_banner,
            sweep,
        })
    }
}
