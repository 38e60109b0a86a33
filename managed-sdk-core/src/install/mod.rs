//! Managed SDK acquisition.
//!
//! [`SdkInstaller`] downloads a versioned SDK archive, extracts it, runs the
//! install script when tracking the latest release and verifies the result.
//! Every location it touches comes from a [`FileResourceProvider`].

mod downloader;
mod error;
mod extractor;
mod installer;
mod paths;
mod pipeline;
pub mod status;
mod types;

pub use downloader::{ArchiveDownloader, HttpDownloader};
pub use error::{DownloadError, ExtractError, InstallStage, InstallerError};
pub use extractor::ArchiveExtractor;
pub use installer::{InstallScript, Installer, DISABLE_PROMPTS_ENV};
pub use paths::{FileResourceProvider, DEFAULT_BASE_URL};
pub use pipeline::SdkInstaller;
pub use status::{check_installation, SdkStatus, StatusError};
pub use types::{ArchiveFormat, Architecture, OsFamily, OsInfo, Version, VersionParseError};
