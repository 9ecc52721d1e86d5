use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

pub enum AppEvent {
    Line(String),
    Tick,
    Eof,
}

/// Feeds stdin lines and fixed-rate ticks through one channel, so the play
/// loop only ever waits in a single place.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(AppEvent::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(AppEvent::Eof);
        });

        Self { rx, tick_rate }
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        match self.rx.recv_timeout(self.tick_rate) {
            Ok(event) => Ok(event),
            Err(RecvTimeoutError::Timeout) => Ok(AppEvent::Tick),
            Err(RecvTimeoutError::Disconnected) => Ok(AppEvent::Eof),
        }
    }
}
