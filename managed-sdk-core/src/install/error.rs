//! Error types for the install pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::command::CommandError;

/// Pipeline stage an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Cleanup,
    Download,
    Extract,
    Install,
    Verify,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cleanup => "cleanup",
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Install => "install",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Failure fetching an archive.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid download URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Download URL must use http or https: {0}")]
    UnsupportedScheme(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download of {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unknown archive type: {}", path.display())]
    UnknownArchiveType { path: PathBuf },

    #[error("Failed to extract to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read zip {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Failure of an [`SdkInstaller`](super::SdkInstaller) run.
///
/// Every variant names the stage or path needed to diagnose the failure.
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{message} {}", path.display())]
    Verification {
        stage: InstallStage,
        message: String,
        path: PathBuf,
    },

    #[error("Unknown archive type: {}", path.display())]
    UnknownArchiveType { path: PathBuf },

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Extraction failed: {0}")]
    Extract(#[source] ExtractError),

    #[error("Command failed during {stage}: {source}")]
    Command {
        stage: InstallStage,
        #[source]
        source: CommandError,
    },

    #[error("{stage} task did not complete: {message}")]
    TaskFailed { stage: InstallStage, message: String },

    #[error("The managed SDK is not available for this platform")]
    UnsupportedPlatform,
}

impl InstallerError {
    /// Stage the failure belongs to, when it is tied to one.
    pub fn stage(&self) -> Option<InstallStage> {
        match self {
            Self::Verification { stage, .. }
            | Self::Command { stage, .. }
            | Self::TaskFailed { stage, .. } => Some(*stage),
            Self::Download(_) => Some(InstallStage::Download),
            Self::Extract(_) | Self::UnknownArchiveType { .. } => Some(InstallStage::Extract),
            Self::Filesystem { .. } | Self::UnsupportedPlatform => None,
        }
    }

    pub(crate) fn verification(
        stage: InstallStage,
        message: &str,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::Verification {
            stage,
            message: message.to_string(),
            path: path.into(),
        }
    }
}

impl From<ExtractError> for InstallerError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::UnknownArchiveType { path } => Self::UnknownArchiveType { path },
            other => Self::Extract(other),
        }
    }
}
