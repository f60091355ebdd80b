use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cancels a running sweep when the user presses `q` or Ctrl-C.
///
/// Keys are polled in raw mode when stdin is a terminal. Otherwise Ctrl-C arrives as
/// a signal and is picked up by a tokio task instead.
pub struct InputHandle {
    running: Arc<AtomicBool>,
    keys: Option<JoinHandle<()>>,
    signal: Option<tokio::task::JoinHandle<()>>,
    raw_mode: bool,
}

impl InputHandle {
    pub fn start(cancel: CancellationToken) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let raw_mode = std::io::stdin().is_terminal() && enable_raw_mode().is_ok();

        let (keys, signal) = if raw_mode {
            let running = running.clone();
            (Some(thread::spawn(move || poll_keys(running, cancel))), None)
        } else {
            let signal = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("interrupt received");
                    cancel.cancel();
                }
            });
            (None, Some(signal))
        };

        Self {
            running,
            keys,
            signal,
            raw_mode,
        }
    }
}

fn poll_keys(running: Arc<AtomicBool>, cancel: CancellationToken) {
    while running.load(Ordering::Relaxed) {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => {
                if let Ok(Event::Key(key)) = event::read()
                    && is_interrupt(&key)
                {
                    debug!("finishing early on user request");
                    cancel.cancel();
                    return;
                }
            }
            Ok(false) => {}
            Err(_) => return,
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    let is_q = key.code == KeyCode::Char('q');
    let is_ctrl_c =
        key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
    (is_q || is_ctrl_c) && key.kind == KeyEventKind::Press
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(signal) = self.signal.take() {
            signal.abort();
        }
        if let Some(keys) = self.keys.take() {
            let _ = keys.join();
        }
        if self.raw_mode {
            let _ = disable_raw_mode();
        }
    }
}
