//! Managed SDK Core Library
//!
//! Acquires and verifies a managed Cloud SDK installation. It includes:
//!
//! - Command execution with concurrent draining of stdout and stderr
//! - Hierarchical progress reporting
//! - Path layout for versioned installs under a managed root
//! - Archive download, extraction and the post-install script
//! - The install pipeline tying those stages together
//! - Settings persistence and installation status checks

pub mod command;
pub mod config;
pub mod install;
pub mod progress;

// Re-exports for convenience
pub use config::{Settings, SettingsError};

// Re-export command execution
pub use command::{CaptureError, CommandCaller, CommandError, ProcessRunner, StreamCapture};

// Re-export the install pipeline
pub use install::{
    check_installation, ArchiveDownloader, ArchiveExtractor, ArchiveFormat, FileResourceProvider,
    HttpDownloader, InstallStage, Installer, InstallerError, OsFamily, OsInfo, SdkInstaller,
    SdkStatus, Version,
};

// Re-export progress reporting
pub use progress::{LogSink, MessageListener, NoopSink, Progress, ProgressSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
