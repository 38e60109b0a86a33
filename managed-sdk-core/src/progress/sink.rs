//! Progress sinks and message listeners.
//!
//! A sink is where a [`Progress`](super::Progress) tree ends up: a terminal
//! progress bar, log lines, or nothing at all. All units a sink receives are
//! already scaled to the budget declared by the top-level listener.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Receives scaled progress events from a [`Progress`](super::Progress) tree.
///
/// Every method has an empty default so renderers only implement what they
/// display. Implementations must be internally synchronized; children of the
/// same tree share one sink.
pub trait ProgressSink: Send + Sync {
    /// The top-level operation started with a budget of `total_units`.
    fn on_start(&self, _label: &str, _total_units: u64) {}

    /// `units` more of the top-level budget were completed.
    fn on_advance(&self, _units: u64) {}

    /// A textual status update (sub-stage labels included).
    fn on_message(&self, _message: &str) {}

    /// The top-level operation finished.
    fn on_done(&self) {}
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {}

/// Sink that turns progress into tracing events.
#[derive(Debug, Default)]
pub struct LogSink {
    total: AtomicU64,
    completed: AtomicU64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units completed so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressSink for LogSink {
    fn on_start(&self, label: &str, total_units: u64) {
        self.total.store(total_units, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        info!("{} ({} units)", label, total_units);
    }

    fn on_advance(&self, units: u64) {
        let completed = self.completed.fetch_add(units, Ordering::Relaxed) + units;
        debug!(
            "Progress {}/{}",
            completed,
            self.total.load(Ordering::Relaxed)
        );
    }

    fn on_message(&self, message: &str) {
        info!("{}", message);
    }

    fn on_done(&self) {
        info!("Done");
    }
}

/// Receives line-oriented output from long running stages (install scripts).
pub trait MessageListener: Send + Sync {
    fn message(&self, line: &str);
}

impl<F> MessageListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn message(&self, line: &str) {
        self(line)
    }
}
