//! Post-extraction install script.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::types::OsFamily;
use crate::command::{CommandCaller, CommandError};
use crate::progress::{MessageListener, Progress};

/// Environment variable that keeps the install script from prompting.
pub const DISABLE_PROMPTS_ENV: &str = "CLOUDSDK_CORE_DISABLE_PROMPTS";

// ============================================================================
// Install Script
// ============================================================================

/// Install script flavour, one per OS family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallScript {
    /// `install.sh`, run directly.
    Unix,
    /// `install.bat`, run through `cmd.exe /c`.
    Windows,
}

impl InstallScript {
    pub fn for_os(family: OsFamily) -> Self {
        match family {
            OsFamily::Windows => Self::Windows,
            OsFamily::Mac | OsFamily::Linux => Self::Unix,
        }
    }

    /// Command prefix that runs the script inside `sdk_home`.
    pub fn command(&self, sdk_home: &Path) -> Vec<String> {
        match self {
            Self::Unix => vec![sdk_home.join("install.sh").to_string_lossy().into_owned()],
            Self::Windows => vec![
                "cmd.exe".to_string(),
                "/c".to_string(),
                sdk_home.join("install.bat").to_string_lossy().into_owned(),
            ],
        }
    }
}

// ============================================================================
// Installer
// ============================================================================

/// Runs the SDK's own install script after extraction.
#[derive(Debug, Clone)]
pub struct Installer {
    script: InstallScript,
    usage_reporting: bool,
    override_components: Option<Vec<String>>,
    environment: HashMap<String, String>,
}

impl Installer {
    pub fn new(family: OsFamily) -> Self {
        Self {
            script: InstallScript::for_os(family),
            usage_reporting: false,
            override_components: None,
            environment: HashMap::new(),
        }
    }

    pub fn with_usage_reporting(mut self, enabled: bool) -> Self {
        self.usage_reporting = enabled;
        self
    }

    /// Installs exactly these components instead of the default set.
    pub fn with_override_components(mut self, components: Option<Vec<String>>) -> Self {
        self.override_components = components;
        self
    }

    /// Variables merged over the inherited environment of the script.
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn script(&self) -> InstallScript {
        self.script
    }

    /// Full command line for the script inside `sdk_home`.
    pub fn command(&self, sdk_home: &Path) -> Vec<String> {
        let mut command = self.script.command(sdk_home);
        command.extend([
            "--path-update=false".to_string(),
            "--command-completion=false".to_string(),
            "--quiet".to_string(),
            format!("--usage-reporting={}", self.usage_reporting),
        ]);
        if let Some(components) = &self.override_components {
            command.push("--override-components".to_string());
            command.extend(components.iter().cloned());
        }
        command
    }

    /// Environment overlay the script runs with.
    pub fn environment(&self) -> HashMap<String, String> {
        let mut environment = self.environment.clone();
        environment.insert(DISABLE_PROMPTS_ENV.to_string(), "1".to_string());
        environment
    }

    /// Runs the script, forwarding each output line to `messages` and to `progress`.
    pub async fn install(
        &self,
        sdk_home: &Path,
        mut progress: Progress,
        messages: Arc<dyn MessageListener>,
    ) -> Result<(), CommandError> {
        let command = self.command(sdk_home);
        info!("Running install script in {}", sdk_home.display());

        progress.start("Installing Cloud SDK components", 1);
        let status = progress.message_forwarder();
        let caller = CommandCaller::new().with_output_listener(Arc::new(move |line: &str| {
            messages.message(line);
            status.message(line);
        }));

        caller
            .call(&command, Some(sdk_home), Some(&self.environment()))
            .await?;

        progress.done();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::testing::RecordingSink;
    use std::sync::Mutex;

    #[test]
    fn test_script_dispatch() {
        assert_eq!(InstallScript::for_os(OsFamily::Linux), InstallScript::Unix);
        assert_eq!(InstallScript::for_os(OsFamily::Mac), InstallScript::Unix);
        assert_eq!(
            InstallScript::for_os(OsFamily::Windows),
            InstallScript::Windows
        );
    }

    #[test]
    fn test_unix_command_line() {
        let home = Path::new("/sdk/google-cloud-sdk");
        let command = Installer::new(OsFamily::Linux).command(home);
        assert_eq!(
            command,
            vec![
                home.join("install.sh").to_string_lossy().into_owned(),
                "--path-update=false".to_string(),
                "--command-completion=false".to_string(),
                "--quiet".to_string(),
                "--usage-reporting=false".to_string(),
            ]
        );
    }

    #[test]
    fn test_windows_command_line_with_components() {
        let home = Path::new("C:\\sdk\\google-cloud-sdk");
        let command = Installer::new(OsFamily::Windows)
            .with_usage_reporting(true)
            .with_override_components(Some(vec!["core".to_string(), "beta".to_string()]))
            .command(home);

        assert_eq!(&command[..2], &["cmd.exe".to_string(), "/c".to_string()]);
        assert!(command[2].ends_with("install.bat"));
        assert!(command.contains(&"--usage-reporting=true".to_string()));
        assert_eq!(
            &command[command.len() - 3..],
            &[
                "--override-components".to_string(),
                "core".to_string(),
                "beta".to_string()
            ]
        );
    }

    #[test]
    fn test_environment_disables_prompts() {
        let mut overlay = HashMap::new();
        overlay.insert("HTTPS_PROXY".to_string(), "http://proxy:3128".to_string());
        let environment = Installer::new(OsFamily::Linux)
            .with_environment(overlay)
            .environment();

        assert_eq!(environment.get(DISABLE_PROMPTS_ENV).map(String::as_str), Some("1"));
        assert_eq!(
            environment.get("HTTPS_PROXY").map(String::as_str),
            Some("http://proxy:3128")
        );
    }

    #[cfg(unix)]
    fn write_script(home: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::create_dir_all(home).unwrap();
        let script = home.join("install.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_runs_script_and_forwards_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = dir.path().join("google-cloud-sdk");
        write_script(
            &home,
            "echo \"args: $*\"\necho \"prompts: $CLOUDSDK_CORE_DISABLE_PROMPTS\" >&2\n",
        );

        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink = Arc::new(RecordingSink::default());
        let mut root = Progress::new(sink.clone());
        root.start("Installing", 100);

        Installer::new(OsFamily::Linux)
            .install(
                &home,
                root.new_child(100),
                Arc::new(move |line: &str| captured.lock().unwrap().push(line.to_string())),
            )
            .await
            .unwrap();

        let mut lines = lines.lock().unwrap().clone();
        lines.sort();
        assert_eq!(
            lines,
            vec![
                "args: --path-update=false --command-completion=false --quiet --usage-reporting=false",
                "prompts: 1",
            ]
        );
        assert!(sink.messages().contains(&"prompts: 1".to_string()));
        assert_eq!(sink.advanced(), 100);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_script_reports_exit_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = dir.path().join("google-cloud-sdk");
        write_script(&home, "echo broken >&2\nexit 3\n");

        let result = Installer::new(OsFamily::Linux)
            .install(&home, Progress::noop(), Arc::new(|_: &str| {}))
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.exit_code(), Some(3));
        assert!(error.output().contains("broken"));
    }
}
