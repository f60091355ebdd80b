use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use netdetective_common::config::SweepConfig;
use netdetective_common::error::{ProbeFailure, SweepError};
use netdetective_common::network::range::CidrRange;
use netdetective_common::probe::{HostProbe, Outcome, OutcomeClass};
use netdetective_core::sweep::Sweeper;
use tokio_util::sync::CancellationToken;

use crate::fake::{Behavior, FakeClient};

fn addr(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn deadline_records_outstanding_as_timeout() {
    let client = FakeClient::new(Behavior::Hang).host(addr(0), Behavior::up_after(ms(10)));
    let cfg = SweepConfig {
        concurrency: 2,
        probe_timeout: Duration::from_secs(60),
        sweep_deadline: Duration::from_secs(1),
        ..SweepConfig::default()
    };

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 30), CancellationToken::new())
        .await;

    let report = outcome.report;
    assert!(outcome.fatal.is_none());
    assert_eq!(report.entries.len(), 4);
    assert!(matches!(report.entries[0].1, HostProbe::Up { .. }));
    for (_, result) in &report.entries[1..] {
        assert_eq!(*result, HostProbe::Error(ProbeFailure::Timeout));
    }
    assert_eq!(report.summary.errors, 3);
    assert!(report.summary.elapsed >= Duration::from_secs(1));
    assert!(report.summary.elapsed < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn cancellation_keeps_collected_results() {
    let client = FakeClient::new(Behavior::Hang)
        .host(addr(0), Behavior::up_after(ms(10)))
        .host(addr(1), Behavior::up_after(ms(10)))
        // Finishes inside the grace period.
        .host(addr(4), Behavior::up_after(ms(300)));
    let cfg = SweepConfig {
        concurrency: 4,
        probe_timeout: Duration::from_secs(60),
        grace_period: ms(500),
        ..SweepConfig::default()
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ms(200)).await;
        trigger.cancel();
    });

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 29), cancel)
        .await;

    let report = outcome.report;
    assert!(outcome.fatal.is_none());
    assert_eq!(report.entries.len(), 8);

    let classes: Vec<OutcomeClass> = report.entries.iter().map(|(_, r)| r.class()).collect();
    use OutcomeClass::{Cancelled, Success};
    assert_eq!(
        classes,
        vec![Success, Success, Cancelled, Cancelled, Success, Cancelled, Cancelled, Cancelled]
    );

    let s = report.summary;
    assert_eq!((s.success, s.cancelled, s.errors), (3, 5, 0));
    assert!(s.elapsed >= ms(700));
}

#[tokio::test(start_paused = true)]
async fn unavailable_backend_aborts_with_partial_report() {
    let client = FakeClient::new(Behavior::up_after(ms(10)))
        .host(addr(1), Behavior::down_after(ms(10)))
        .host(addr(2), Behavior::Unavailable("nmap: command not found"));
    let cfg = SweepConfig {
        concurrency: 1,
        ..SweepConfig::default()
    };

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 30), CancellationToken::new())
        .await;

    assert_eq!(
        outcome.fatal,
        Some(SweepError::CollaboratorUnavailable("nmap: command not found".into()))
    );

    let report = outcome.report;
    assert_eq!(report.entries.len(), 4);
    assert!(matches!(report.entries[0].1, HostProbe::Up { .. }));
    assert_eq!(report.entries[1].1, HostProbe::Down);
    assert!(matches!(
        report.entries[2].1,
        HostProbe::Error(ProbeFailure::Unavailable(_))
    ));
    assert_eq!(report.entries[3].1, HostProbe::Error(ProbeFailure::Cancelled));

    let s = report.summary;
    assert_eq!((s.success, s.negative, s.errors, s.cancelled), (1, 1, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn failed_availability_check_probes_nothing() {
    let client = Arc::new(FakeClient::new(Behavior::up_after(ms(1))).unavailable("requires root"));

    let outcome = Sweeper::new(client.clone(), SweepConfig::default())
        .discover_hosts(CidrRange::new(addr(0), 24), CancellationToken::new())
        .await;

    assert!(outcome.report.is_empty());
    assert_eq!(client.peak(), 0);
    assert!(matches!(outcome.fatal, Some(SweepError::CollaboratorUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn timed_out_probe_is_retried_once() {
    let client = Arc::new(FakeClient::new(Behavior::down_after(ms(1))).host(addr(1), Behavior::HangOnce));
    let cfg = SweepConfig {
        probe_timeout: ms(100),
        retries: 1,
        ..SweepConfig::default()
    }
    .validate()
    .unwrap();

    let outcome = Sweeper::new(client.clone(), cfg)
        .discover_hosts(CidrRange::new(addr(0), 30), CancellationToken::new())
        .await;

    assert!(matches!(outcome.report.entries[1].1, HostProbe::Up { .. }));
    assert_eq!(client.attempts(addr(1), 0), 2);
    assert_eq!(client.attempts(addr(2), 0), 1);
}

#[tokio::test(start_paused = true)]
async fn without_retries_a_timeout_sticks() {
    let client = Arc::new(FakeClient::new(Behavior::down_after(ms(1))).host(addr(1), Behavior::HangOnce));
    let cfg = SweepConfig {
        probe_timeout: ms(100),
        ..SweepConfig::default()
    };

    let outcome = Sweeper::new(client.clone(), cfg)
        .discover_hosts(CidrRange::new(addr(0), 30), CancellationToken::new())
        .await;

    assert_eq!(outcome.report.entries[1].1, HostProbe::Error(ProbeFailure::Timeout));
    assert_eq!(client.attempts(addr(1), 0), 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_spaces_out_dispatch() {
    let client = FakeClient::new(Behavior::down_after(Duration::ZERO));
    let cfg = SweepConfig {
        concurrency: 8,
        rate_limit: Some(10),
        ..SweepConfig::default()
    };

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 30), CancellationToken::new())
        .await;

    // First dispatch is immediate, the other three wait 100 ms each.
    assert!(outcome.report.summary.elapsed >= ms(300));
    assert_eq!(outcome.report.summary.negative, 4);
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_not_held_up_by_the_rate_limiter() {
    let client = FakeClient::new(Behavior::down_after(ms(1)));
    let cfg = SweepConfig {
        rate_limit: Some(1),
        grace_period: ms(10),
        ..SweepConfig::default()
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ms(100)).await;
        trigger.cancel();
    });

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 24), cancel)
        .await;

    let s = outcome.report.summary;
    assert_eq!(s.total, 256);
    assert_eq!((s.negative, s.cancelled), (1, 255));
    assert!(s.elapsed < ms(200), "stopped after {:?}", s.elapsed);
}

#[tokio::test(start_paused = true)]
async fn deadline_is_not_held_up_by_the_rate_limiter() {
    let client = FakeClient::new(Behavior::down_after(ms(1)));
    let cfg = SweepConfig {
        rate_limit: Some(1),
        sweep_deadline: ms(1_500),
        ..SweepConfig::default()
    };

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 28), CancellationToken::new())
        .await;

    let s = outcome.report.summary;
    // Dispatches at 0 s and 1 s, then the deadline.
    assert_eq!((s.negative, s.errors), (2, 14));
    assert!(s.elapsed >= ms(1_500));
    assert!(s.elapsed < ms(1_600), "stopped after {:?}", s.elapsed);
}

#[tokio::test(start_paused = true)]
async fn unbounded_deadline_runs_to_completion() {
    let client = FakeClient::new(Behavior::up_after(ms(5)));
    let cfg = SweepConfig {
        sweep_deadline: Duration::from_secs(u64::MAX),
        ..SweepConfig::default()
    }
    .validate()
    .unwrap();

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 30), CancellationToken::new())
        .await;

    assert!(outcome.fatal.is_none());
    assert_eq!(outcome.report.summary.success, 4);
}

#[tokio::test(start_paused = true)]
async fn unavailable_backend_during_grace_is_reported() {
    let client = FakeClient::new(Behavior::Hang)
        .host(addr(0), Behavior::up_after(ms(10)))
        .host(addr(1), Behavior::UnavailableAfter(ms(150), "nmap vanished"));
    let cfg = SweepConfig {
        concurrency: 4,
        grace_period: ms(500),
        probe_timeout: Duration::from_secs(60),
        ..SweepConfig::default()
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ms(100)).await;
        trigger.cancel();
    });

    let outcome = Sweeper::new(Arc::new(client), cfg)
        .discover_hosts(CidrRange::new(addr(0), 30), cancel)
        .await;

    assert_eq!(
        outcome.fatal,
        Some(SweepError::CollaboratorUnavailable("nmap vanished".into()))
    );
    assert_eq!(outcome.report.entries.len(), 4);
    assert!(matches!(
        outcome.report.entries[1].1,
        HostProbe::Error(ProbeFailure::Unavailable(_))
    ));
}
