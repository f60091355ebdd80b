use std::sync::Arc;

use chrono::Local;
use colored::*;
use netdetective_common::config::Config;
use netdetective_common::error::SweepError;
use netdetective_common::network::range::CidrRange;
use netdetective_common::probe::HostProbe;
use netdetective_core::aggregator::SweepReport;
use netdetective_core::scanner::ProbeClient;
use netdetective_core::sweep::Sweeper;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::mprint;
use crate::terminal::format::{self, Palette, RowStyle};
use crate::terminal::input::InputHandle;
use crate::terminal::{colors, print, spinner};

/// Runs a host discovery sweep over `range` and renders the report.
///
/// Per-host failures are rendered inline. Only an unusable backend ends the
/// command with an error, after the partial report has been printed.
pub async fn discover(
    client: Arc<dyn ProbeClient>,
    range: CidrRange,
    cfg: &Config,
) -> Result<(), SweepError> {
    print::header("network discovery", cfg.quiet);
    if cfg.quiet < 2 {
        let started = Local::now().format("%Y-%m-%d %H:%M");
        print::print_status(format!("Starting Ping Sweep at {started}"));
    }
    let probed = range.address_count().min(cfg.sweep.max_hosts as u64);
    info!("probing {probed} addresses in {range}");

    let cancel = CancellationToken::new();
    let sweeper = Sweeper::new(client, cfg.sweep.clone()).on_progress(spinner::report_progress);

    let outcome = {
        let _input = InputHandle::start(cancel.clone());
        spinner::start();
        let outcome = sweeper.discover_hosts(range, cancel.clone()).await;
        spinner::finish();
        outcome
    };

    if cancel.is_cancelled() {
        warn!("sweep finished early, unprobed addresses are reported as cancelled");
    }

    render(&outcome.report, cfg, &Palette::default());

    match outcome.fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn render(report: &SweepReport<HostProbe>, cfg: &Config, palette: &Palette) {
    let summary = &report.summary;

    if summary.success == 0 && !cfg.verbose {
        print::header("zero hosts detected", cfg.quiet);
        if cfg.quiet == 0 {
            print::no_results();
        }
    } else {
        if cfg.quiet == 0 {
            mprint!();
        }
        print::print(&format::host_table_header().bold().to_string());
        print::thin_separator();
    }

    for (target, result) in &report.entries {
        let row = format::host_row(target.addr(), result, palette);
        match row.style {
            RowStyle::Live(_) => print::print(&row.styled(palette)),
            RowStyle::Down if cfg.verbose => print::print(&row.styled(palette)),
            RowStyle::Down => {}
            RowStyle::Warning if cfg.quiet < 2 => warn!(
                "{} {}",
                row.address.color(colors::IPV4_ADDR),
                row.note.as_deref().unwrap_or_default()
            ),
            RowStyle::Warning => {}
        }
    }

    let output = format::discovery_summary(summary);
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
