//! Inspecting an existing managed SDK installation.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::paths::FileResourceProvider;
use super::types::Version;

/// What is on disk for a `(root, version, os)` installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkStatus {
    /// The primary executable is missing.
    NotInstalled,
    /// Installed; `version` comes from the SDK's `VERSION` file when present.
    Installed { version: Option<String> },
    /// A pinned install whose `VERSION` file names another release.
    VersionMismatch { expected: String, found: String },
}

/// Why an installation cannot be used as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("Cloud SDK not found at {}", path.display())]
    NotInstalled { path: PathBuf },

    #[error("Specified Cloud SDK version ({expected}) does not match installed version ({found}).")]
    VersionMismatch { expected: String, found: String },
}

impl SdkStatus {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }

    /// Fails unless the installation can be used for the requested version.
    pub fn ensure_usable(&self, provider: &FileResourceProvider) -> Result<(), StatusError> {
        match self {
            Self::Installed { .. } => Ok(()),
            Self::NotInstalled => Err(StatusError::NotInstalled {
                path: provider.executable(),
            }),
            Self::VersionMismatch { expected, found } => Err(StatusError::VersionMismatch {
                expected: expected.clone(),
                found: found.clone(),
            }),
        }
    }
}

impl fmt::Display for SdkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "not installed"),
            Self::Installed { version: Some(version) } => write!(f, "installed ({})", version),
            Self::Installed { version: None } => write!(f, "installed (unknown version)"),
            Self::VersionMismatch { expected, found } => {
                write!(f, "version mismatch (expected {}, found {})", expected, found)
            }
        }
    }
}

/// Reads the release recorded in `<sdk_home>/VERSION`.
pub fn installed_version(sdk_home: &Path) -> Option<String> {
    let version = fs::read_to_string(sdk_home.join("VERSION")).ok()?;
    let version = version.trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

/// Checks the installation `provider` points at against `version`.
pub fn check_installation(provider: &FileResourceProvider, version: &Version) -> SdkStatus {
    let executable = provider.executable();
    if !executable.is_file() {
        debug!("No executable at {}", executable.display());
        return SdkStatus::NotInstalled;
    }

    let found = installed_version(&provider.sdk_home());
    match (version, found) {
        (Version::Pinned(expected), Some(found)) if *expected != found => {
            SdkStatus::VersionMismatch {
                expected: expected.clone(),
                found,
            }
        }
        (_, found) => SdkStatus::Installed { version: found },
    }
}
