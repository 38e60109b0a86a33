//! Error types for command execution.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Why a stream drain did not produce its text.
///
/// Cloneable so one drain result can be awaited any number of times.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// Reading the stream failed part way through.
    #[error("Stream read failed: {0}")]
    Io(#[source] Arc<io::Error>),
    /// The drain task was cancelled or panicked before reaching end of input.
    #[error("Stream collection interrupted: {0}")]
    Interrupted(String),
}

/// Failure of a single command invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process ran and exited with a non-zero code.
    #[error("Process failed with exit code: {exit_code}\n{output}")]
    Exit {
        exit_code: i32,
        /// Captured stdout and stderr, separated by a newline.
        output: String,
    },
    /// The process could not be started or waited for.
    #[error("Process execution failed: {source}\n{output}")]
    Execution {
        /// Whatever stdout and stderr were collected before the failure.
        output: String,
        #[source]
        source: io::Error,
    },
}

impl CommandError {
    /// Exit code of the process, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { exit_code, .. } => Some(*exit_code),
            Self::Execution { .. } => None,
        }
    }

    /// Captured output carried by the error.
    pub fn output(&self) -> &str {
        match self {
            Self::Exit { output, .. } => output,
            Self::Execution { output, .. } => output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_error_display() {
        let error = CommandError::Exit {
            exit_code: 3,
            output: "out\nerr".to_string(),
        };
        assert_eq!(error.to_string(), "Process failed with exit code: 3\nout\nerr");
        assert_eq!(error.exit_code(), Some(3));
        assert_eq!(error.output(), "out\nerr");
    }

    #[test]
    fn test_execution_error_keeps_cause() {
        let error = CommandError::Execution {
            output: "\n".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(error.exit_code(), None);
        assert!(error.to_string().contains("no such file"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_capture_error_is_clone() {
        let error = CaptureError::Io(Arc::new(io::Error::other("broken pipe")));
        let cloned = error.clone();
        assert_eq!(error.to_string(), cloned.to_string());
    }
}
