//! # Sweep Orchestrator
//!
//! Fans single-target probes out over a bounded worker pool and streams every
//! completion into an [`Aggregator`].
//!
//! The orchestrating loop is the only writer to the aggregator: workers hand their
//! outcome back through a [`JoinSet`], and the loop records it immediately, so
//! progress is observable while the sweep runs.
//!
//! A sweep stops dispatching when:
//! 1. every target has an outcome,
//! 2. the cancellation token fires (outstanding probes get a grace period),
//! 3. the sweep deadline passes, or
//! 4. the backend reports it cannot run at all.
//!
//! In every case each enumerated target ends up in the report exactly once.

use std::collections::HashMap;
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use netdetective_common::config::{MAX_CONCURRENCY, SweepConfig};
use netdetective_common::error::{ProbeFailure, SweepError};
use netdetective_common::network::range::{CidrRange, PortRange};
use netdetective_common::network::target::Target;
use netdetective_common::probe::{HostProbe, Outcome, PortProbe};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::aggregator::{Aggregator, SweepReport};
use crate::scanner::ProbeClient;

/// Snapshot handed to the progress callback after every recorded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub successes: usize,
}

pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Report of one sweep, plus the cause when the sweep was aborted.
#[derive(Debug, Clone)]
pub struct SweepOutcome<R> {
    pub report: SweepReport<R>,
    pub fatal: Option<SweepError>,
}

enum Stop {
    Cancelled,
    Deadline,
    Fatal(SweepError),
}

pub struct Sweeper {
    client: Arc<dyn ProbeClient>,
    cfg: SweepConfig,
    progress: Option<ProgressFn>,
}

impl Sweeper {
    pub fn new(client: Arc<dyn ProbeClient>, cfg: SweepConfig) -> Self {
        Self {
            client,
            cfg,
            progress: None,
        }
    }

    pub fn on_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Probes every address of `range` for reachability.
    pub async fn discover_hosts(
        &self,
        range: CidrRange,
        cancel: CancellationToken,
    ) -> SweepOutcome<HostProbe> {
        let started = Instant::now();
        let span = info_span!("sweep", mode = "discovery", %range);

        async move {
            let cap = self.cfg.max_hosts;
            if range.exceeds(cap) {
                warn!(
                    "{range} holds {} addresses, only the first {cap} will be probed",
                    range.address_count()
                );
            }

            let total = range.address_count().min(cap as u64) as usize;
            let probe = |client: Arc<dyn ProbeClient>, target: Target, timeout: Duration| async move {
                client.discover_host(target.addr(), timeout).await
            };

            let budget = self.cfg.probe_timeout;
            self.run(started, total, budget, range.hosts(cap), cancel, probe)
                .await
        }
        .instrument(span)
        .await
    }

    /// Probes every port of `ports` on a single host.
    pub async fn scan_ports(
        &self,
        addr: Ipv4Addr,
        ports: PortRange,
        cancel: CancellationToken,
    ) -> SweepOutcome<PortProbe> {
        let started = Instant::now();
        let span = info_span!("sweep", mode = "ports", %addr, %ports);

        async move {
            let probe = |client: Arc<dyn ProbeClient>, target: Target, timeout: Duration| async move {
                let port = target.port_number().unwrap_or_default();
                client.probe_port(target.addr(), port, timeout).await
            };

            let budget = self.cfg.service_timeout;
            self.run(started, ports.len(), budget, ports.ports(addr), cancel, probe)
                .await
        }
        .instrument(span)
        .await
    }

    async fn run<R, F, Fut>(
        &self,
        started: Instant,
        total: usize,
        budget: Duration,
        targets: impl Iterator<Item = Target> + Send,
        cancel: CancellationToken,
        probe: F,
    ) -> SweepOutcome<R>
    where
        R: Outcome,
        F: Fn(Arc<dyn ProbeClient>, Target, Duration) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let mut aggregator: Aggregator<R> = Aggregator::new(started);

        info!(
            total,
            concurrency = self.cfg.concurrency,
            backend = self.client.name(),
            "starting sweep"
        );

        if let Err(err) = self.client.check_available().await {
            error!("{err}");
            return SweepOutcome {
                report: aggregator.finalize(),
                fatal: Some(err),
            };
        }

        let mut targets = targets.peekable();
        let permits = self.cfg.concurrency.clamp(1, MAX_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut workers: JoinSet<(Target, R)> = JoinSet::new();
        let mut pending: HashMap<Id, Target> = HashMap::new();
        let mut pacer: Option<Interval> = self.cfg.rate_limit.map(rate_pacer);
        // Set when the pacer allows the next dispatch.
        let mut paced = pacer.is_none();

        // A deadline past the end of the clock never fires.
        let deadline = expire_at(started.checked_add(self.cfg.sweep_deadline));
        tokio::pin!(deadline);

        let mut stop: Option<Stop> = None;

        loop {
            let more = targets.peek().is_some();
            if !more && pending.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    stop = Some(Stop::Cancelled);
                    break;
                }

                _ = &mut deadline => {
                    stop = Some(Stop::Deadline);
                    break;
                }

                Some(joined) = workers.join_next_with_id() => {
                    if let Some(err) = self.record(&mut aggregator, &mut pending, joined, total) {
                        stop = Some(Stop::Fatal(err));
                        break;
                    }
                }

                _ = next_tick(&mut pacer), if more && !paced => {
                    paced = true;
                }

                Ok(permit) = semaphore.clone().acquire_owned(), if more && paced => {
                    paced = pacer.is_none();
                    let Some(target) = targets.next() else { continue };
                    let handle = workers.spawn(probe_target(
                        self.client.clone(),
                        target,
                        probe.clone(),
                        budget,
                        self.cfg.retries,
                        permit,
                    ));
                    pending.insert(handle.id(), target);
                }
            }
        }

        let fatal: Option<SweepError> = match stop {
            None => None,
            Some(Stop::Cancelled) => {
                warn!(
                    outstanding = pending.len(),
                    "sweep cancelled, waiting {:?} for outstanding probes",
                    self.cfg.grace_period
                );
                let fatal = self
                    .drain_for(&mut aggregator, &mut pending, &mut workers, total)
                    .await;
                abandon(&mut aggregator, pending, targets, ProbeFailure::Cancelled);
                fatal
            }
            Some(Stop::Deadline) => {
                warn!(
                    outstanding = pending.len(),
                    "sweep deadline of {:?} reached",
                    self.cfg.sweep_deadline
                );
                let mut fatal = None;
                while let Some(joined) = workers.try_join_next_with_id() {
                    let err = self.record(&mut aggregator, &mut pending, joined, total);
                    fatal = fatal.or(err);
                }
                abandon(&mut aggregator, pending, targets, ProbeFailure::Timeout);
                fatal
            }
            Some(Stop::Fatal(err)) => {
                abandon(&mut aggregator, pending, targets, ProbeFailure::Cancelled);
                Some(err)
            }
        };

        workers.abort_all();

        if let Some(err) = &fatal {
            error!("aborting sweep: {err}");
        }

        let report = aggregator.finalize();
        let s = &report.summary;
        info!(
            total = s.total,
            success = s.success,
            negative = s.negative,
            errors = s.errors,
            cancelled = s.cancelled,
            "sweep finished in {:.2}s",
            s.elapsed.as_secs_f64()
        );

        SweepOutcome { report, fatal }
    }

    /// Records a finished worker. Returns the sweep-fatal error when the backend
    /// reported that it cannot run.
    fn record<R: Outcome>(
        &self,
        aggregator: &mut Aggregator<R>,
        pending: &mut HashMap<Id, Target>,
        joined: Result<(Id, (Target, R)), JoinError>,
        total: usize,
    ) -> Option<SweepError> {
        let (target, result) = match joined {
            Ok((id, (target, result))) => {
                pending.remove(&id);
                (target, result)
            }
            Err(join_err) => {
                let target = pending.remove(&join_err.id())?;
                warn!(%target, "probe task failed: {join_err}");
                let cause = ProbeFailure::Collaborator(format!("probe task failed: {join_err}"));
                (target, R::from_failure(cause))
            }
        };

        let fatal = match result.failure() {
            Some(ProbeFailure::Unavailable(cause)) => {
                Some(SweepError::CollaboratorUnavailable(cause.clone()))
            }
            Some(failure) => {
                debug!(%target, "{failure}");
                None
            }
            None => None,
        };

        aggregator.add_result(target, result);

        if let Some(callback) = &self.progress {
            callback(Progress {
                completed: aggregator.len(),
                total,
                successes: aggregator.success_count(),
            });
        }

        fatal
    }

    /// Keeps collecting outstanding results until they are all in or the grace period ends.
    /// Returns the first sweep-fatal error reported while draining.
    async fn drain_for<R: Outcome>(
        &self,
        aggregator: &mut Aggregator<R>,
        pending: &mut HashMap<Id, Target>,
        workers: &mut JoinSet<(Target, R)>,
        total: usize,
    ) -> Option<SweepError> {
        let grace = time::sleep(self.cfg.grace_period);
        tokio::pin!(grace);

        let mut fatal = None;
        while !pending.is_empty() {
            tokio::select! {
                biased;
                Some(joined) = workers.join_next_with_id() => {
                    let err = self.record(aggregator, pending, joined, total);
                    fatal = fatal.or(err);
                }
                _ = &mut grace => break,
            }
        }
        fatal
    }
}

/// Runs one probe under its own timeout, retrying timeouts up to `retries` times.
async fn probe_target<R, F, Fut>(
    client: Arc<dyn ProbeClient>,
    target: Target,
    probe: F,
    timeout: Duration,
    retries: u8,
    _permit: OwnedSemaphorePermit,
) -> (Target, R)
where
    R: Outcome,
    F: Fn(Arc<dyn ProbeClient>, Target, Duration) -> Fut,
    Fut: Future<Output = R>,
{
    let mut attempt: u8 = 0;
    loop {
        let result = match time::timeout(timeout, probe(client.clone(), target, timeout)).await {
            Ok(result) => result,
            Err(_elapsed) => R::from_failure(ProbeFailure::Timeout),
        };

        let timed_out = matches!(result.failure(), Some(ProbeFailure::Timeout));
        if timed_out && attempt < retries {
            attempt += 1;
            debug!(%target, attempt, "retrying timed out probe");
            continue;
        }
        return (target, result);
    }
}

/// Records every target that never got an outcome with `failure`.
fn abandon<R: Outcome>(
    aggregator: &mut Aggregator<R>,
    pending: HashMap<Id, Target>,
    undispatched: impl Iterator<Item = Target>,
    failure: ProbeFailure,
) {
    for target in pending.into_values().chain(undispatched) {
        if !aggregator.contains(&target) {
            aggregator.add_result(target, R::from_failure(failure.clone()));
        }
    }
}

async fn expire_at(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(pacer: &mut Option<Interval>) {
    match pacer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn rate_pacer(per_second: u32) -> Interval {
    let period = Duration::from_secs_f64(1.0 / f64::from(per_second.max(1)));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
