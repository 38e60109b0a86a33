//! Spawning external processes with piped output.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

/// Starts external processes with both output streams piped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Spawns `command` (first element is the executable).
    ///
    /// `environment` is merged over the inherited environment. Stdin is closed
    /// so scripts that prompt fail fast instead of hanging.
    pub fn spawn(
        &self,
        command: &[String],
        working_directory: Option<&Path>,
        environment: Option<&HashMap<String, String>>,
    ) -> io::Result<SpawnedProcess> {
        let (program, args) = command.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "Command must not be empty")
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = working_directory {
            cmd.current_dir(dir);
        }
        if let Some(environment) = environment {
            cmd.envs(environment);
        }

        debug!(?command, ?working_directory, "Spawning process");
        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("Process stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("Process stderr was not piped"))?;

        Ok(SpawnedProcess {
            child,
            stdout: Some(stdout),
            stderr: Some(stderr),
        })
    }
}

/// A running process whose output streams can be taken exactly once.
#[derive(Debug)]
pub struct SpawnedProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl SpawnedProcess {
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// OS process id, while the process is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Waits for exit and returns the exit code (`-1` when killed by a signal).
    pub async fn wait(&mut self) -> io::Result<i32> {
        let status = self.child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }

    /// Sends a kill signal without waiting.
    pub fn kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_empty_command_is_rejected() {
        let result = ProcessRunner::new().spawn(&[], None, None);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_missing_executable_fails_to_spawn() {
        let command = vec!["/nonexistent/path/to/tool".to_string()];
        let result = ProcessRunner::new().spawn(&command, None, None);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_pipes_output_and_reports_exit_code() {
        let command = vec!["sh".to_string(), "-c".to_string(), "printf hi; exit 7".to_string()];
        let mut process = ProcessRunner::new().spawn(&command, None, None).unwrap();

        let mut stdout = process.take_stdout().unwrap();
        assert!(process.take_stdout().is_none());

        let mut text = String::new();
        stdout.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "hi");
        assert_eq!(process.wait().await.unwrap(), 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_uses_working_directory_and_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut env = HashMap::new();
        env.insert("MANAGED_SDK_TEST_VALUE".to_string(), "from-overlay".to_string());

        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "pwd; echo $MANAGED_SDK_TEST_VALUE; test -n \"$PATH\" && echo inherited".to_string(),
        ];
        let mut process = ProcessRunner::new()
            .spawn(&command, Some(dir.path()), Some(&env))
            .unwrap();

        let mut text = String::new();
        process
            .take_stdout()
            .unwrap()
            .read_to_string(&mut text)
            .await
            .unwrap();
        assert_eq!(process.wait().await.unwrap(), 0);

        let lines: Vec<&str> = text.lines().collect();
        let expected_dir = dir.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(lines[0]).canonicalize().unwrap(),
            expected_dir
        );
        assert_eq!(lines[1], "from-overlay");
        assert_eq!(lines[2], "inherited");
    }
}
