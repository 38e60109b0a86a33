//! Run a command to completion and capture its output.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::capture::StreamCapture;
use super::error::{CaptureError, CommandError};
use super::process::ProcessRunner;
use crate::progress::MessageListener;

/// Placeholder used when stdout could not be collected.
pub const STDOUT_INTERRUPTED: &str = "stdout collection interrupted";
/// Placeholder used when stderr could not be collected.
pub const STDERR_INTERRUPTED: &str = "stderr collection interrupted";

/// Executes a command and returns its stdout as text.
///
/// Both output streams are drained on their own tasks, started before the
/// caller blocks on process exit, so a child writing more than a pipe buffer
/// to either stream never stalls. No retries happen at this level.
#[derive(Clone, Default)]
pub struct CommandCaller {
    runner: ProcessRunner,
    listener: Option<Arc<dyn MessageListener>>,
}

impl CommandCaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards every output line (stdout and stderr) to `listener` as it arrives.
    pub fn with_output_listener(mut self, listener: Arc<dyn MessageListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Runs `command` and returns what it wrote to stdout.
    ///
    /// # Errors
    ///
    /// - [`CommandError::Exit`] when the process exits non-zero; the output
    ///   holds stdout and stderr joined by a newline.
    /// - [`CommandError::Execution`] when the process cannot be started or
    ///   waited for, or stdout could not be read after a successful exit.
    pub async fn call(
        &self,
        command: &[String],
        working_directory: Option<&Path>,
        environment: Option<&HashMap<String, String>>,
    ) -> Result<String, CommandError> {
        debug!(?command, "Calling command");

        let mut process = self
            .runner
            .spawn(command, working_directory, environment)
            .map_err(|source| CommandError::Execution {
                output: String::new(),
                source,
            })?;

        // Drains must be running before we block on exit.
        let stdout = self.capture(process.take_stdout());
        let stderr = self.capture(process.take_stderr());

        match process.wait().await {
            Ok(0) => {
                // Listeners see every line before the call returns.
                if let Err(e) = stderr.result().await {
                    warn!("{}: {}", STDERR_INTERRUPTED, e);
                }
                Self::stdout_outcome(&stdout, &stderr).await
            }
            Ok(exit_code) => Err(CommandError::Exit {
                exit_code,
                output: collect_output(&stdout, &stderr).await,
            }),
            Err(source) => {
                // The pipes only close once the child is gone.
                if let Err(e) = process.kill() {
                    warn!("Failed to kill process after wait error: {}", e);
                }
                Err(CommandError::Execution {
                    output: collect_output(&stdout, &stderr).await,
                    source,
                })
            }
        }
    }

    async fn stdout_outcome(
        stdout: &StreamCapture,
        stderr: &StreamCapture,
    ) -> Result<String, CommandError> {
        match stdout.result().await {
            Ok(text) => Ok(text),
            Err(CaptureError::Interrupted(reason)) => {
                warn!("{}: {}", STDOUT_INTERRUPTED, reason);
                Ok(STDOUT_INTERRUPTED.to_string())
            }
            Err(e) => Err(CommandError::Execution {
                output: collect_output(stdout, stderr).await,
                source: io::Error::other(e),
            }),
        }
    }

    fn capture<R>(&self, stream: Option<R>) -> StreamCapture
    where
        R: tokio::io::AsyncRead + Send + Unpin + 'static,
    {
        match stream {
            Some(stream) => StreamCapture::spawn_with_listener(stream, self.listener.clone()),
            None => StreamCapture::spawn(tokio::io::empty()),
        }
    }
}

impl fmt::Debug for CommandCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCaller")
            .field("runner", &self.runner)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

async fn collect_output(stdout: &StreamCapture, stderr: &StreamCapture) -> String {
    format!(
        "{}\n{}",
        stdout.text_or(STDOUT_INTERRUPTED).await,
        stderr.text_or(STDERR_INTERRUPTED).await
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_missing_executable_is_execution_error() {
        let command = vec!["/nonexistent/managed-sdk/tool".to_string()];
        let result = CommandCaller::new().call(&command, None, None).await;
        match result {
            Err(CommandError::Execution { output, .. }) => assert!(output.is_empty()),
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_command_is_execution_error() {
        let result = CommandCaller::new().call(&[], None, None).await;
        assert!(matches!(result, Err(CommandError::Execution { .. })));
    }

    #[tokio::test]
    async fn test_interrupted_stdout_after_success_yields_placeholder() {
        // The writer half stays open, so the drain only ends by abort.
        let (_writer, reader) = tokio::io::duplex(64);
        let stdout = StreamCapture::spawn(reader);
        let stderr = StreamCapture::spawn(tokio::io::empty());
        stdout.abort();

        let result = CommandCaller::stdout_outcome(&stdout, &stderr).await;
        assert_eq!(result.unwrap(), STDOUT_INTERRUPTED);
        assert_eq!(
            collect_output(&stdout, &stderr).await,
            format!("{}\n", STDOUT_INTERRUPTED)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_returns_exact_stdout() {
        let result = CommandCaller::new()
            .call(&sh("printf 'a\\nb\\n\\nc'; echo ignored >&2"), None, None)
            .await
            .unwrap();
        assert_eq!(result, "a\nb\n\nc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_carries_code_and_both_streams() {
        let result = CommandCaller::new()
            .call(&sh("echo to-stdout; echo to-stderr >&2; exit 42"), None, None)
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.exit_code(), Some(42));
        assert_eq!(error.output(), "to-stdout\n\nto-stderr\n");
        assert!(error.to_string().contains("exit code: 42"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_environment_overlay_and_working_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "present").unwrap();
        let mut env = HashMap::new();
        env.insert("MANAGED_SDK_GREETING".to_string(), "hello".to_string());

        let result = CommandCaller::new()
            .call(
                &sh("cat marker.txt; echo \" $MANAGED_SDK_GREETING\""),
                Some(dir.path()),
                Some(&env),
            )
            .await
            .unwrap();
        assert_eq!(result, "present hello\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_listener_receives_both_streams() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let caller = CommandCaller::new().with_output_listener(Arc::new(move |line: &str| {
            captured.lock().unwrap().push(line.to_string())
        }));

        let stdout = caller
            .call(&sh("echo one; echo two >&2"), None, None)
            .await
            .unwrap();
        assert_eq!(stdout, "one\n");

        let mut lines = lines.lock().unwrap().clone();
        lines.sort();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_output_on_both_streams_does_not_deadlock() {
        // 256 KiB to each stream, far beyond a pipe buffer, written before exit.
        let script = "head -c 262144 /dev/zero | tr '\\0' o; head -c 262144 /dev/zero | tr '\\0' e >&2; exit 1";
        let result = tokio::time::timeout(
            Duration::from_secs(60),
            CommandCaller::new().call(&sh(script), None, None),
        )
        .await
        .expect("command deadlocked");

        let error = result.unwrap_err();
        assert_eq!(error.exit_code(), Some(1));
        let output = error.output();
        assert_eq!(output.matches('o').count(), 262144);
        assert_eq!(output.matches('e').count(), 262144);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_stderr_with_success_exit() {
        let script = "head -c 200000 /dev/zero | tr '\\0' e >&2; printf done";
        let result = tokio::time::timeout(
            Duration::from_secs(60),
            CommandCaller::new().call(&sh(script), None, None),
        )
        .await
        .expect("command deadlocked");
        assert_eq!(result.unwrap(), "done");
    }
}
