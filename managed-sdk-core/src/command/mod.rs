//! Synchronous-style command execution with concurrent output capture.
//!
//! - `process`: spawning a child with piped stdout/stderr
//! - `capture`: draining one stream on its own task
//! - `caller`: running a command to completion and typing the outcome

mod caller;
mod capture;
mod error;
mod process;

pub use caller::{CommandCaller, STDERR_INTERRUPTED, STDOUT_INTERRUPTED};
pub use capture::StreamCapture;
pub use error::{CaptureError, CommandError};
pub use process::{ProcessRunner, SpawnedProcess};
