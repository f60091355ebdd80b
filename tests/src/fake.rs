//! A scripted, instrumented probe client.
//!
//! Every target gets a [`Behavior`]; the client records how many probes ran at
//! the same time and how often each target was attempted.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use netdetective_common::error::{ProbeFailure, SweepError};
use netdetective_common::probe::{HostProbe, PortProbe};
use netdetective_core::scanner::ProbeClient;

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answers after `delay`. For hosts `up` means reachable with `latency`,
    /// for ports it means open.
    Answer {
        delay: Duration,
        up: bool,
        latency: Duration,
    },
    Fail(&'static str),
    Unavailable(&'static str),
    /// Reports the backend unusable after `delay`.
    UnavailableAfter(Duration, &'static str),
    /// Never answers.
    Hang,
    /// Never answers on the first attempt, answers up immediately afterwards.
    HangOnce,
}

impl Behavior {
    pub fn up_after(delay: Duration) -> Self {
        Behavior::Answer {
            delay,
            up: true,
            latency: delay,
        }
    }

    pub fn down_after(delay: Duration) -> Self {
        Behavior::Answer {
            delay,
            up: false,
            latency: Duration::ZERO,
        }
    }
}

pub struct FakeClient {
    hosts: HashMap<Ipv4Addr, Behavior>,
    ports: HashMap<u16, Behavior>,
    fallback: Behavior,
    /// Upper bound of a random extra delay added to every answer.
    jitter: Option<Duration>,
    unavailable: Option<&'static str>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    attempts: Mutex<HashMap<(Ipv4Addr, u16), usize>>,
}

impl FakeClient {
    pub fn new(fallback: Behavior) -> Self {
        Self {
            hosts: HashMap::new(),
            ports: HashMap::new(),
            fallback,
            jitter: None,
            unavailable: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn host(mut self, addr: Ipv4Addr, behavior: Behavior) -> Self {
        self.hosts.insert(addr, behavior);
        self
    }

    pub fn port(mut self, port: u16, behavior: Behavior) -> Self {
        self.ports.insert(port, behavior);
        self
    }

    pub fn with_jitter(mut self, max: Duration) -> Self {
        self.jitter = Some(max);
        self
    }

    pub fn unavailable(mut self, cause: &'static str) -> Self {
        self.unavailable = Some(cause);
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn attempts(&self, addr: Ipv4Addr, port: u16) -> usize {
        self.attempts
            .lock()
            .map(|a| a.get(&(addr, port)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn enter(&self, addr: Ipv4Addr, port: u16) -> (InFlight<'_>, usize) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts.entry((addr, port)).or_insert(0);
        *attempt += 1;
        (InFlight(&self.in_flight), *attempt)
    }

    fn jitter(&self) -> Duration {
        match self.jitter {
            Some(max) => Duration::from_millis(rand::random_range(0..=max.as_millis() as u64)),
            None => Duration::ZERO,
        }
    }

    /// Plays `behavior`; `Ok(Some(latency))` is a success, `Ok(None)` a negative.
    async fn play(&self, behavior: &Behavior, attempt: usize) -> Result<Option<Duration>, ProbeFailure> {
        match behavior {
            Behavior::Answer { delay, up, latency } => {
                tokio::time::sleep(*delay + self.jitter()).await;
                Ok(up.then_some(*latency))
            }
            Behavior::Fail(cause) => Err(ProbeFailure::Collaborator(cause.to_string())),
            Behavior::Unavailable(cause) => Err(ProbeFailure::Unavailable(cause.to_string())),
            Behavior::UnavailableAfter(delay, cause) => {
                tokio::time::sleep(*delay).await;
                Err(ProbeFailure::Unavailable(cause.to_string()))
            }
            Behavior::HangOnce if attempt > 1 => Ok(Some(Duration::from_millis(1))),
            Behavior::Hang | Behavior::HangOnce => std::future::pending().await,
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProbeClient for FakeClient {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn check_available(&self) -> Result<(), SweepError> {
        match self.unavailable {
            Some(cause) => Err(SweepError::CollaboratorUnavailable(cause.to_string())),
            None => Ok(()),
        }
    }

    async fn discover_host(&self, addr: Ipv4Addr, _timeout: Duration) -> HostProbe {
        let (_guard, attempt) = self.enter(addr, 0);
        let behavior = self.hosts.get(&addr).unwrap_or(&self.fallback);
        match self.play(behavior, attempt).await {
            Ok(Some(latency)) => HostProbe::up(latency),
            Ok(None) => HostProbe::Down,
            Err(failure) => HostProbe::Error(failure),
        }
    }

    async fn probe_port(&self, addr: Ipv4Addr, port: u16, _timeout: Duration) -> PortProbe {
        let (_guard, attempt) = self.enter(addr, port);
        let behavior = self.ports.get(&port).unwrap_or(&self.fallback);
        match self.play(behavior, attempt).await {
            Ok(Some(_)) => PortProbe::open(format!("svc-{port}")),
            Ok(None) => PortProbe::Closed,
            Err(failure) => PortProbe::Error(failure),
        }
    }
}
