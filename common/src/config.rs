use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound on retries of a timed-out probe.
pub const MAX_RETRIES: u8 = 1;

/// Upper bound on probes in flight.
pub const MAX_CONCURRENCY: usize = 65_536;

pub struct Config {
    /// Reduces terminal output; `1` hides headers, `2` hides rows too.
    pub quiet: u8,
    pub verbose: bool,
    pub no_banner: bool,
    pub sweep: SweepConfig,
}

/// Tunables of the sweep orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Maximum number of probes in flight at once.
    pub concurrency: usize,
    /// Budget of a single discovery probe, enforced independently per target.
    pub probe_timeout: Duration,
    /// Budget of a single port probe. Service detection waits for banners, so it
    /// gets more room than a reachability check.
    pub service_timeout: Duration,
    /// Wall-clock budget of the whole sweep, measured from its start.
    pub sweep_deadline: Duration,
    /// How long outstanding probes may finish after cancellation.
    pub grace_period: Duration,
    /// Retries for timed-out probes, clamped to [`MAX_RETRIES`].
    pub retries: u8,
    /// Optional dispatch rate in probes per second.
    pub rate_limit: Option<u32>,
    /// Cap on CIDR expansion.
    pub max_hosts: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: 32,
            probe_timeout: Duration::from_secs(2),
            service_timeout: Duration::from_secs(10),
            sweep_deadline: Duration::from_secs(300),
            grace_period: Duration::from_millis(500),
            retries: 0,
            rate_limit: None,
            max_hosts: 65_536,
        }
    }
}

impl SweepConfig {
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ConcurrencyTooHigh(MAX_CONCURRENCY));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("probe timeout"));
        }
        if self.service_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("service timeout"));
        }
        if self.sweep_deadline.is_zero() {
            return Err(ConfigError::ZeroDuration("sweep deadline"));
        }
        if self.rate_limit == Some(0) {
            return Err(ConfigError::ZeroRate);
        }
        if self.max_hosts == 0 {
            return Err(ConfigError::ZeroHostCap);
        }
        self.retries = self.retries.min(MAX_RETRIES);
        Ok(self)
    }
}
