//! The interactive menu shown when no subcommand is given.

use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Context;
use colored::*;
use netdetective_common::config::Config;
use netdetective_common::network::range::PortRange;
use netdetective_common::network::target;
use netdetective_core::scanner::ProbeClient;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, warn};

use crate::commands::{discover, scan};
use crate::mprint;
use crate::terminal::{colors, print};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Discover,
    Scan,
    Exit,
}

pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    match input.trim() {
        "1" => Some(MenuChoice::Discover),
        "2" => Some(MenuChoice::Scan),
        "3" => Some(MenuChoice::Exit),
        _ => None,
    }
}

type Input = Lines<BufReader<Stdin>>;

/// Prints `msg` and reads one line. `None` on end of input.
async fn ask(input: &mut Input, msg: &str) -> anyhow::Result<Option<String>> {
    print::prompt(msg);
    input.next_line().await.context("failed to read from stdin")
}

fn print_menu() {
    mprint!();
    print::print(&"Select an option:".bold().to_string());
    for (key, label) in [("1", "Discover hosts"), ("2", "Scan ports"), ("3", "Exit")] {
        print::print(&format!(
            "  {} {}",
            format!("[{key}]").color(colors::ACCENT),
            label.color(colors::TEXT_DEFAULT)
        ));
    }
}

pub async fn run(client: Arc<dyn ProbeClient>, cfg: &Config) -> anyhow::Result<()> {
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_menu();
        let Some(line) = ask(&mut input, "Enter your choice:").await? else {
            break;
        };

        match parse_choice(&line) {
            Some(MenuChoice::Discover) => {
                let Some(cidr) = ask(&mut input, "Enter subnet (CIDR, e.g. 192.168.0.1/24):").await?
                else {
                    break;
                };
                match target::parse_cidr(&cidr) {
                    Ok(range) => {
                        if let Err(err) = discover::discover(client.clone(), range, cfg).await {
                            error!("{err}");
                        }
                    }
                    Err(_) => warn!("Invalid CIDR format"),
                }
            }
            Some(MenuChoice::Scan) => {
                let Some(addr) = ask_ipv4(&mut input).await? else {
                    break;
                };
                let Some(ports) = ask_port_range(&mut input).await? else {
                    break;
                };
                if let Err(err) = scan::scan(client.clone(), addr, ports, cfg).await {
                    error!("{err}");
                }
            }
            Some(MenuChoice::Exit) => break,
            None => warn!("Invalid option. Please choose 1, 2, or 3."),
        }
    }

    print::print_status("Exiting...");
    Ok(())
}

async fn ask_ipv4(input: &mut Input) -> anyhow::Result<Option<Ipv4Addr>> {
    loop {
        let Some(line) = ask(input, "Enter the IP address to scan:").await? else {
            return Ok(None);
        };
        let line = line.trim();
        if target::validate_ipv4(line) {
            let addr = target::parse_ipv4(line)?;
            print::print_status(format!("{} is a valid IP address.", line.color(colors::IPV4_ADDR)));
            return Ok(Some(addr));
        }
        warn!("{line} is not a valid IP address.");
    }
}

async fn ask_port_range(input: &mut Input) -> anyhow::Result<Option<PortRange>> {
    loop {
        let Some(line) = ask(input, "Enter the port range (e.g. 60-120):").await? else {
            return Ok(None);
        };
        match target::parse_port_range(&line) {
            Ok(ports) => return Ok(Some(ports)),
            Err(err) => warn!("{err}"),
        }
    }
}
