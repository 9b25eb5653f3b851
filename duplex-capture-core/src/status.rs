//! Status channel from recorder threads to the UI.
//!
//! Any thread (capture callbacks, the coordinator, export workers) may hold
//! a [`StatusSender`]. Sends never block and never fail visibly: if the
//! receiver is gone the event is dropped. The single [`StatusReceiver`]
//! drains whatever is queued without blocking.

use std::time::Duration;

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// A timestamped status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub timestamp: DateTime<Local>,
    pub text: String,
}

impl StatusEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            text: text.into(),
        }
    }

    /// `[HH:MM:SS] text`, as shown in a log pane.
    pub fn log_line(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}

/// Create a connected sender/receiver pair.
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (StatusSender { tx }, StatusReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: Sender<StatusEvent>,
}

impl StatusSender {
    pub fn push(&self, text: impl Into<String>) {
        let event = StatusEvent::new(text);
        log::info!("{}", event.text);
        // Unbounded: only fails when the receiver has been dropped.
        let _ = self.tx.send(event);
    }

    /// Like [`push`](Self::push) but without logging, for audio callback threads.
    pub fn push_unlogged(&self, text: impl Into<String>) {
        let _ = self.tx.send(StatusEvent::new(text));
    }
}

#[derive(Debug)]
pub struct StatusReceiver {
    rx: Receiver<StatusEvent>,
}

impl StatusReceiver {
    /// Take every event queued so far, oldest first. Never blocks.
    pub fn drain(&self) -> Vec<StatusEvent> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatusEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Wait until an event whose text satisfies `pred` arrives, or `timeout` expires.
    ///
    /// Events received before the match are returned along with it.
    pub fn wait_for(&self, timeout: Duration, pred: impl Fn(&str) -> bool) -> Vec<StatusEvent> {
        let deadline = std::time::Instant::now() + timeout;
        let mut seen = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return seen;
            }
            match self.recv_timeout(remaining) {
                Some(event) => {
                    let done = pred(&event.text);
                    seen.push(event);
                    if done {
                        return seen;
                    }
                }
                None => return seen,
            }
        }
    }
}
