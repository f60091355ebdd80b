use std::net::Ipv4Addr;
use std::sync::Arc;

use colored::*;
use netdetective_common::config::Config;
use netdetective_common::error::SweepError;
use netdetective_common::network::range::PortRange;
use netdetective_common::probe::PortProbe;
use netdetective_core::aggregator::SweepReport;
use netdetective_core::scanner::ProbeClient;
use netdetective_core::sweep::Sweeper;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::mprint;
use crate::terminal::format::{self, Palette, RowStyle};
use crate::terminal::input::InputHandle;
use crate::terminal::{colors, print, spinner};

/// Probes every port of `ports` on `addr` and renders one row per port.
pub async fn scan(
    client: Arc<dyn ProbeClient>,
    addr: Ipv4Addr,
    ports: PortRange,
    cfg: &Config,
) -> Result<(), SweepError> {
    print::header("port scan", cfg.quiet);
    info!("scanning {} ports on {addr}", ports.len());

    let cancel = CancellationToken::new();
    let sweeper = Sweeper::new(client, cfg.sweep.clone()).on_progress(spinner::report_progress);

    let outcome = {
        let _input = InputHandle::start(cancel.clone());
        spinner::start();
        let outcome = sweeper.scan_ports(addr, ports, cancel.clone()).await;
        spinner::finish();
        outcome
    };

    if cancel.is_cancelled() {
        warn!("scan finished early, unprobed ports are reported as cancelled");
    }

    render(addr, &outcome.report, cfg, &Palette::default());

    match outcome.fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn render(addr: Ipv4Addr, report: &SweepReport<PortProbe>, cfg: &Config, palette: &Palette) {
    if cfg.quiet == 0 {
        mprint!();
        print::print_status(format!("Results for {}", addr.to_string().color(colors::IPV4_ADDR)));
    }

    for (target, result) in &report.entries {
        let Some(port) = target.port_number() else {
            continue;
        };
        let row = format::port_row(port, result);
        match row.style {
            RowStyle::Live(_) => print::print(&row.styled(palette)),
            RowStyle::Down if cfg.quiet < 2 => print::print(&row.styled(palette)),
            RowStyle::Warning if cfg.quiet < 2 => warn!("{}", row.plain()),
            RowStyle::Down | RowStyle::Warning => {}
        }
    }

    let summary = &report.summary;
    let output = format::port_summary(summary);
    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output.color(colors::TEXT_DEFAULT).to_string());
        }
        _ => info!("{output}"),
    }
    if let Some(tally) = format::error_tally(summary) {
        warn!("{tally}");
    }
}
