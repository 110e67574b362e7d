// Capture countdown
// Waits out a recording window in fixed ticks, reporting each tick and
// stopping early when cancelled

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::models::{CaptureEvent, CaptureWindowState};

#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    total_seconds: u64,
    tick_seconds: u64,
}

impl Countdown {
    pub fn new(total_seconds: u64, tick_seconds: u64) -> Self {
        Self {
            total_seconds,
            tick_seconds: tick_seconds.max(1),
        }
    }

    /// `(elapsed, length)` of every tick; the last one may be shorter.
    /// Ticks are produced lazily, so any window length is fine.
    pub fn ticks(&self) -> impl Iterator<Item = (u64, u64)> {
        let Countdown {
            total_seconds,
            tick_seconds,
        } = *self;
        let first = (total_seconds > 0).then(|| (0, tick_seconds.min(total_seconds)));
        std::iter::successors(first, move |&(elapsed, length)| {
            let next = elapsed + length;
            (next < total_seconds).then(|| (next, tick_seconds.min(total_seconds - next)))
        })
    }

    /// Run the window. A tick event is sent before each wait; only completed
    /// ticks count towards `elapsed_seconds`.
    pub async fn run(
        &self,
        events: &UnboundedSender<CaptureEvent>,
        cancel: &CancellationToken,
    ) -> CaptureWindowState {
        let mut state = CaptureWindowState::new(self.total_seconds);

        for (elapsed, length) in self.ticks() {
            if cancel.is_cancelled() {
                state.cancelled = true;
                break;
            }

            let _ = events.send(CaptureEvent::Tick {
                elapsed_seconds: state.elapsed_seconds,
                remaining_seconds: state.remaining_seconds(),
                total_seconds: state.total_seconds,
            });

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(length)) => {
                    state.elapsed_seconds = elapsed + length;
                }
                _ = cancel.cancelled() => {
                    state.cancelled = true;
                    break;
                }
            }
        }

        state
    }
}
