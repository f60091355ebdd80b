use std::io::{self, Write};
use std::sync::RwLock;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use netdetective_core::sweep::Progress;

const TIP: &str = "Press 'q' to finish early";

/// The spinner of the running sweep, if any. Log output is routed through it.
static ACTIVE: RwLock<Option<ProgressBar>> = RwLock::new(None);

fn build_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(TIP.italic().white().to_string());
    pb
}

pub fn start() {
    if let Ok(mut active) = ACTIVE.write() {
        if let Some(previous) = active.replace(build_spinner()) {
            previous.finish_and_clear();
        }
    }
}

pub fn finish() {
    if let Ok(mut active) = ACTIVE.write()
        && let Some(pb) = active.take()
    {
        pb.finish_and_clear();
    }
}

pub fn progress_message(progress: Progress) -> String {
    format!(
        "{}/{} probed, {} found so far. {}",
        progress.completed,
        progress.total,
        progress.successes.to_string().green().bold(),
        TIP.italic().white()
    )
}

/// Progress callback handed to the sweeper.
pub fn report_progress(progress: Progress) {
    if let Ok(active) = ACTIVE.read()
        && let Some(pb) = active.as_ref()
    {
        pb.set_message(progress_message(progress));
    }
}

pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let msg = String::from_utf8_lossy(buf);
        let msg = msg.trim_end_matches('\n');

        match ACTIVE.read().ok().as_deref().and_then(Option::as_ref) {
            Some(pb) if !pb.is_hidden() => pb.println(msg),
            _ => println!("{msg}"),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}
