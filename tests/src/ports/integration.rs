use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use netdetective_common::config::SweepConfig;
use netdetective_common::error::ProbeFailure;
use netdetective_common::network::target::{self, Target};
use netdetective_common::probe::PortProbe;
use netdetective_core::scanner::connect::ConnectClient;
use netdetective_core::sweep::Sweeper;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::fake::{Behavior, FakeClient};

const HOST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn ports_are_reported_in_ascending_order() {
    let client = FakeClient::new(Behavior::down_after(ms(5)))
        .port(22, Behavior::up_after(ms(40)))
        .port(25, Behavior::Hang)
        .with_jitter(ms(30));
    let cfg = SweepConfig {
        service_timeout: ms(500),
        ..SweepConfig::default()
    };

    let ports = target::parse_port_range(" 20 - 25 ").unwrap();
    let outcome = Sweeper::new(Arc::new(client), cfg)
        .scan_ports(HOST, ports, CancellationToken::new())
        .await;

    let report = outcome.report;
    let order: Vec<u16> = report.entries.iter().filter_map(|(t, _)| t.port_number()).collect();
    assert_eq!(order, vec![20, 21, 22, 23, 24, 25]);

    assert_eq!(
        report.entries[2],
        (Target::port(HOST, 22), PortProbe::open("svc-22"))
    );
    assert_eq!(report.entries[5].1, PortProbe::Error(ProbeFailure::Timeout));

    let s = report.summary;
    assert_eq!((s.total, s.success, s.negative, s.errors), (6, 1, 4, 1));
}

#[tokio::test(start_paused = true)]
async fn port_zero_is_never_probed() {
    let client = Arc::new(FakeClient::new(Behavior::down_after(ms(1))));
    let ports = target::parse_port_range("0-3").unwrap();

    let outcome = Sweeper::new(client.clone(), SweepConfig::default())
        .scan_ports(HOST, ports, CancellationToken::new())
        .await;

    assert_eq!(outcome.report.summary.total, 3);
    assert_eq!(client.attempts(HOST, 0), 0);
    assert_eq!(outcome.report.entries[0].0, Target::port(HOST, 1));
}

#[tokio::test(start_paused = true)]
async fn port_scan_concurrency_cap() {
    let client = Arc::new(FakeClient::new(Behavior::down_after(ms(20))).with_jitter(ms(20)));
    let cfg = SweepConfig {
        concurrency: 3,
        ..SweepConfig::default()
    };

    let ports = target::parse_port_range("1000-1099").unwrap();
    let outcome = Sweeper::new(client.clone(), cfg)
        .scan_ports(HOST, ports, CancellationToken::new())
        .await;

    assert_eq!(outcome.report.summary.negative, 100);
    assert_eq!(client.peak(), 3);
}

#[tokio::test]
async fn scans_loopback_ports() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let ports = target::parse_port_range(&format!("{open}-{open}")).unwrap();

    let outcome = Sweeper::new(Arc::new(ConnectClient::default()), SweepConfig::default())
        .scan_ports(Ipv4Addr::LOCALHOST, ports, CancellationToken::new())
        .await;

    assert_eq!(outcome.report.summary.success, 1);
    assert!(matches!(outcome.report.entries[0].1, PortProbe::Open { .. }));
}

#[tokio::test(start_paused = true)]
async fn slow_services_get_the_service_budget() {
    // Slower than the discovery timeout, well inside the service timeout.
    let client = FakeClient::new(Behavior::up_after(Duration::from_secs(4)));
    let cfg = SweepConfig::default();
    assert!(cfg.probe_timeout < Duration::from_secs(4));

    let ports = target::parse_port_range("80-80").unwrap();
    let outcome = Sweeper::new(Arc::new(client), cfg)
        .scan_ports(HOST, ports, CancellationToken::new())
        .await;

    assert_eq!(outcome.report.entries[0].1, PortProbe::open("svc-80"));
}
