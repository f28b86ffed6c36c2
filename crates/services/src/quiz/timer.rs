use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::events::QuizEvent;

/// Where a running timer delivers its ticks.
///
/// A weak sender, so a ticking timer alone never keeps an event loop alive.
pub type TickSink = mpsc::WeakSender<QuizEvent>;

/// Periodic tick source driving the countdown.
pub trait Timer: Send + Sync {
    /// Start delivering `QuizEvent::Tick` into `sink` every `period`, the
    /// first one a full `period` from now.
    fn start(&self, period: Duration, sink: TickSink) -> TimerHandle;
}

/// Stops a started timer. Cancelling consumes the handle, so it can only
/// happen once.
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send>,
}

impl TimerHandle {
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}

//
// ─── TOKIO TIMER ───────────────────────────────────────────────────────────────
//

/// Timer backed by a `tokio::time::interval` task.
///
/// Must be started from within a Tokio runtime. A tick waits for room in the
/// event queue before the next one is scheduled, so ticks never pile up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn start(&self, period: Duration, sink: TickSink) -> TimerHandle {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(events) = sink.upgrade() else {
                    break;
                };
                if events.send(QuizEvent::Tick).await.is_err() {
                    break;
                }
            }
        });
        TimerHandle::new(move || task.abort())
    }
}

//
// ─── MANUAL TIMER ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
struct ManualCounts {
    starts: AtomicUsize,
    cancels: AtomicUsize,
}

/// Timer that never fires on its own; tests drive ticks by hand and inspect
/// how often it was started and cancelled.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    counts: Arc<ManualCounts>,
}

impl ManualTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn starts(&self) -> usize {
        self.counts.starts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cancels(&self) -> usize {
        self.counts.cancels.load(Ordering::SeqCst)
    }

    /// Started and not yet cancelled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.starts() > self.cancels()
    }
}

impl Timer for ManualTimer {
    fn start(&self, _period: Duration, _sink: TickSink) -> TimerHandle {
        self.counts.starts.fetch_add(1, Ordering::SeqCst);
        let counts = Arc::clone(&self.counts);
        TimerHandle::new(move || {
            counts.cancels.fetch_add(1, Ordering::SeqCst);
        })
    }
}
