//! Hierarchical progress reporting.
//!
//! A [`Progress`] is an owned value describing one operation's slice of the
//! overall budget plus the sink it reports to. The top-level listener declares
//! the whole budget with [`Progress::start`]; each sub-stage gets a fresh child
//! from [`Progress::new_child`] that may declare its own unit scale and is
//! mapped back onto the parent's slice when it reports.
//!
//! # Example
//!
//! ```
//! use managed_sdk_core::progress::{LogSink, Progress};
//! use std::sync::Arc;
//!
//! let mut root = Progress::new(Arc::new(LogSink::new()));
//! root.start("Installing", 200);
//!
//! let mut download = root.new_child(100);
//! download.start("Downloading", 4096);
//! download.update(4096);
//! download.done();
//!
//! root.done();
//! ```

mod sink;

pub use sink::{LogSink, MessageListener, NoopSink, ProgressSink};

use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Started,
    Done,
}

/// One node of a progress tree.
///
/// Nodes never share mutable state: a child owns its slice of the parent's
/// budget, expressed in top-level units, and forwards scaled increments
/// straight to the sink. Misuse (update after `done`, allocating more than
/// what is left) is logged and clamped instead of panicking.
pub struct Progress {
    sink: Arc<dyn ProgressSink>,
    is_root: bool,
    /// Top-level units this node covers. Fixed at creation for children,
    /// set by `start` for the root.
    share: u64,
    /// Budget declared by `start`, in this node's own units.
    total: u64,
    /// Own units reported or handed to children.
    completed: u64,
    /// Top-level units already accounted for (sent to the sink or owned by children).
    forwarded: u64,
    phase: Phase,
}

impl Progress {
    /// Creates a top-level listener reporting to `sink`.
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            is_root: true,
            share: 0,
            total: 0,
            completed: 0,
            forwarded: 0,
            phase: Phase::Created,
        }
    }

    /// Creates a listener whose every method is inert.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    /// Declares the budget for this operation. Must be called once, first.
    pub fn start(&mut self, label: &str, total_units: u64) {
        if self.phase != Phase::Created {
            warn!("Progress '{}' started twice, ignoring", label);
            return;
        }
        self.phase = Phase::Started;
        self.total = total_units;

        if self.is_root {
            self.share = total_units;
            self.sink.on_start(label, total_units);
        } else {
            self.sink.on_message(label);
        }
    }

    /// Reports `units` more completed units, in the scale given to `start`.
    pub fn update(&mut self, units: u64) {
        if self.phase != Phase::Started {
            warn!("Progress update outside of start/done, ignoring");
            return;
        }
        let units = units.min(self.remaining());
        self.completed += units;
        self.forward_to(self.scale(self.completed));
    }

    /// Reports a textual status update without touching the budget.
    pub fn update_message(&self, message: &str) {
        if self.phase == Phase::Done {
            warn!("Progress message after done, ignoring: {}", message);
            return;
        }
        self.sink.on_message(message);
    }

    /// Carves `units` of this node's budget out into a new child listener.
    ///
    /// The child is free to `start` with any unit count; its progress
    /// consumes exactly the allocated slice. Requests larger than what is
    /// left are clamped to the remainder.
    pub fn new_child(&mut self, units: u64) -> Progress {
        let mut allocated = units;
        if self.phase != Phase::Started {
            warn!("Progress child requested before start or after done");
            allocated = 0;
        } else if units > self.remaining() {
            warn!(
                "Progress child requested {} units but only {} remain",
                units,
                self.remaining()
            );
            allocated = self.remaining();
        }

        let before = self.scale(self.completed);
        self.completed += allocated;
        let after = self.scale(self.completed);
        self.forwarded = self.forwarded.max(after);

        Progress {
            sink: self.sink.clone(),
            is_root: false,
            share: after - before,
            total: 0,
            completed: 0,
            forwarded: 0,
            phase: Phase::Created,
        }
    }

    /// Finalizes this listener, completing whatever of its slice is left.
    pub fn done(&mut self) {
        if self.phase == Phase::Done {
            warn!("Progress done called twice, ignoring");
            return;
        }
        self.phase = Phase::Done;
        self.forward_to(self.share);
        if self.is_root {
            self.sink.on_done();
        }
    }

    /// A listener that reports each line it receives as a status message.
    pub fn message_forwarder(&self) -> Arc<dyn MessageListener> {
        let sink = self.sink.clone();
        Arc::new(move |line: &str| sink.on_message(line))
    }

    /// Budget declared by `start`, in this node's own units.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Own units not yet reported or handed to children.
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.completed)
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Maps own units onto top-level units.
    fn scale(&self, units: u64) -> u64 {
        if self.total == 0 {
            return 0;
        }
        ((units as u128 * self.share as u128) / self.total as u128) as u64
    }

    fn forward_to(&mut self, target: u64) {
        if target > self.forwarded {
            self.sink.on_advance(target - self.forwarded);
            self.forwarded = target;
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("is_root", &self.is_root)
            .field("share", &self.share)
            .field("total", &self.total)
            .field("completed", &self.completed)
            .field("phase", &self.phase)
            .finish()
    }
}
