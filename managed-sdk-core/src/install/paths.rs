//! Filesystem and download locations for one managed SDK installation.
//!
//! Everything lives under a managed root, one directory per version:
//!
//! - `{root}/{version}/archive.{ext}` - downloaded archive
//! - `{root}/{version}/google-cloud-sdk/` - SDK home
//! - `{root}/{version}/google-cloud-sdk/bin/gcloud` - primary executable

use std::path::{Path, PathBuf};

use super::types::{OsInfo, Version};

/// Release channel the archives are published on.
pub const DEFAULT_BASE_URL: &str = "https://dl.google.com/dl/cloudsdk/channels/rapid";

/// Directory name of the SDK inside every release archive.
const SDK_HOME_DIR: &str = "google-cloud-sdk";

/// File stem of the downloaded archive.
const ARCHIVE_STEM: &str = "archive";

// ============================================================================
// Path Resolution
// ============================================================================

/// Resolves every location used by an install from `(root, version, os)`.
///
/// Paths are computed on each call and never cached, so two providers with
/// different roots can never resolve to overlapping locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResourceProvider {
    root: PathBuf,
    version: Version,
    os: OsInfo,
    base_url: String,
}

impl FileResourceProvider {
    pub fn new(root: impl Into<PathBuf>, version: Version, os: OsInfo) -> Self {
        Self {
            root: root.into(),
            version,
            os,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the release channel archives are fetched from.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn os(&self) -> OsInfo {
        self.os
    }

    /// Remote location of the archive.
    ///
    /// - Latest: `{base}/google-cloud-sdk.{ext}`
    /// - Pinned: `{base}/downloads/google-cloud-sdk-{version}-{os}-{arch}.{ext}`
    pub fn archive_source(&self) -> String {
        let ext = self.os.archive_format().extension();
        match &self.version {
            Version::Latest => format!("{}/{}.{}", self.base_url, SDK_HOME_DIR, ext),
            Version::Pinned(version) => format!(
                "{}/downloads/{}-{}-{}-{}.{}",
                self.base_url,
                SDK_HOME_DIR,
                version,
                self.os.url_os_name(),
                self.os.url_arch_name(),
                ext
            ),
        }
    }

    /// Local path the archive is downloaded to.
    pub fn archive_destination(&self) -> PathBuf {
        self.extraction_destination().join(format!(
            "{}.{}",
            ARCHIVE_STEM,
            self.os.archive_format().extension()
        ))
    }

    /// Directory the archive is unpacked into.
    pub fn extraction_destination(&self) -> PathBuf {
        self.root.join(self.version.directory_name())
    }

    /// SDK home inside the extraction destination.
    pub fn sdk_home(&self) -> PathBuf {
        self.extraction_destination().join(SDK_HOME_DIR)
    }

    /// Primary executable inside the SDK home.
    pub fn executable(&self) -> PathBuf {
        self.sdk_home().join(self.os.gcloud_relative_path())
    }
}
