//! Per-turn countdown
//!
//! Each second is a single-shot sleep rescheduled after the tick is delivered.
//! Ticks are tagged with the epoch the countdown was started for; the reducer
//! ignores any tick whose epoch is no longer current.

use crate::session::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_secs(1);

/// Cancel handle for a running countdown
///
/// Dropping the handle cancels the countdown.
#[derive(Debug)]
pub struct Countdown {
    cancel: CancellationToken,
}

impl Countdown {
    /// Spawn a countdown delivering `seconds` ticks to `tx`
    pub fn start(epoch: u64, seconds: u32, tx: mpsc::Sender<SessionEvent>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            for _ in 0..seconds {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!(epoch, "Countdown cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(TICK) => {}
                }

                // Cancellation may have raced the sleep
                if token.is_cancelled() {
                    return;
                }
                if tx.send(SessionEvent::Tick { epoch }).await.is_err() {
                    tracing::debug!(epoch, "Countdown receiver gone");
                    return;
                }
            }
        });

        Self { cancel }
    }

    /// Stop delivering ticks
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
