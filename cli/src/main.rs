mod commands;
mod terminal;

use std::sync::Arc;

use anyhow::Context;
use commands::{CommandLine, Commands, discover, menu, scan};
use is_root::is_root;
use netdetective_core::scanner::{self, ProbeClient};
use netdetective_core::vendors::MacOuiRepo;
use terminal::{logging, print};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    let cfg = commands.to_config().context("invalid sweep configuration")?;

    logging::init_logging(&cfg);
    print::banner(cfg.no_banner, cfg.quiet);

    if !is_root() {
        warn!("not running as root, MAC addresses and vendors are only visible to privileged scans");
    }

    let client: Arc<dyn ProbeClient> =
        scanner::select_backend(commands.backend.into(), Arc::new(MacOuiRepo)).await;
    if cfg.quiet == 0 {
        print::print_status(format!("Using the {} backend", client.name()));
    }

    match commands.command {
        None => menu::run(client, &cfg).await,
        Some(Commands::Discover { cidr }) => Ok(discover::discover(client, cidr, &cfg).await?),
        Some(Commands::Scan { ip, ports }) => Ok(scan::scan(client, ip, ports, &cfg).await?),
    }
}
