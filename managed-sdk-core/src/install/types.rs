//! Core types for the managed SDK: versions, target platform and archive formats.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

// ============================================================================
// Version
// ============================================================================

/// Directory and wire name of the latest-release marker.
const LATEST: &str = "LATEST";

/// Which SDK release to install.
///
/// `Latest` downloads the rolling archive and always runs the install script;
/// a pinned version downloads a platform archive that is usable as extracted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Version {
    #[default]
    Latest,
    Pinned(String),
}

/// A version string that is neither `latest` nor `major.minor.patch`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid SDK version '{0}': expected 'LATEST' or MAJOR.MINOR.PATCH")]
pub struct VersionParseError(pub String);

/// Whether `s` is a `MAJOR.MINOR.PATCH` release number.
fn is_release_number(s: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(s))
}

impl Version {
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    /// Name of the directory this version is installed under.
    pub fn directory_name(&self) -> &str {
        match self {
            Self::Latest => LATEST,
            Self::Pinned(version) => version,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.directory_name())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(LATEST) {
            Ok(Self::Latest)
        } else if is_release_number(trimmed) {
            Ok(Self::Pinned(trimmed.to_string()))
        } else {
            Err(VersionParseError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.directory_name().to_string()
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Operating system family the SDK is installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    Mac,
    Linux,
}

/// CPU architecture the SDK is installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    X86,
    X86_64,
    Arm64,
}

/// Target platform (OS family + architecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OsInfo {
    pub family: OsFamily,
    pub arch: Architecture,
}

impl OsInfo {
    pub const fn new(family: OsFamily, arch: Architecture) -> Self {
        Self { family, arch }
    }

    /// Detects the platform this binary was built for.
    ///
    /// Returns `None` on platforms the SDK is not distributed for.
    pub fn detect() -> Option<Self> {
        let family = if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::Mac
        } else if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else {
            return None;
        };

        let arch = if cfg!(target_arch = "x86_64") {
            Architecture::X86_64
        } else if cfg!(target_arch = "x86") {
            Architecture::X86
        } else if cfg!(target_arch = "aarch64") {
            Architecture::Arm64
        } else {
            return None;
        };

        Some(Self { family, arch })
    }

    /// Archive format the SDK is distributed in for this platform.
    pub fn archive_format(&self) -> ArchiveFormat {
        match self.family {
            OsFamily::Windows => ArchiveFormat::Zip,
            OsFamily::Mac | OsFamily::Linux => ArchiveFormat::TarGz,
        }
    }

    /// OS component of release archive names.
    pub fn url_os_name(&self) -> &'static str {
        match self.family {
            OsFamily::Windows => "windows",
            OsFamily::Mac => "darwin",
            OsFamily::Linux => "linux",
        }
    }

    /// Architecture component of release archive names.
    pub fn url_arch_name(&self) -> &'static str {
        match self.arch {
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm",
        }
    }

    /// Name of the primary executable inside the SDK's `bin` directory.
    pub fn gcloud_file_name(&self) -> &'static str {
        match self.family {
            OsFamily::Windows => "gcloud.cmd",
            OsFamily::Mac | OsFamily::Linux => "gcloud",
        }
    }

    /// Executable location relative to the SDK home.
    pub fn gcloud_relative_path(&self) -> PathBuf {
        Path::new("bin").join(self.gcloud_file_name())
    }
}

impl fmt::Display for OsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.url_os_name(), self.url_arch_name())
    }
}

// ============================================================================
// Archive Format
// ============================================================================

/// Archive format of a downloaded SDK package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// ZIP archive (.zip)
    Zip,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// Infers the format from a file name or URL.
    pub fn from_path(path: &Path) -> Option<Self> {
        let lower = path.to_string_lossy().to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Infers the format from the extension, falling back to the file's magic bytes.
    pub fn detect(path: &Path) -> Option<Self> {
        Self::from_path(path).or_else(|| Self::sniff(path))
    }

    fn sniff(path: &Path) -> Option<Self> {
        let mut magic = [0u8; 4];
        let mut file = File::open(path).ok()?;
        let read = file.read(&mut magic).ok()?;
        match &magic[..read] {
            [0x50, 0x4b, 0x03, 0x04] => Some(Self::Zip),
            [0x1f, 0x8b, ..] => Some(Self::TarGz),
            _ => None,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_version_from_str() {
        assert_eq!("LATEST".parse::<Version>().unwrap(), Version::Latest);
        assert_eq!("latest".parse::<Version>().unwrap(), Version::Latest);
        assert_eq!(
            "191.0.0".parse::<Version>().unwrap(),
            Version::Pinned("191.0.0".to_string())
        );
        assert!("191.0".parse::<Version>().is_err());
        assert!("v191.0.0".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_directory_name() {
        assert_eq!(Version::Latest.directory_name(), "LATEST");
        assert_eq!(Version::Pinned("1.2.3".to_string()).directory_name(), "1.2.3");
        assert!(Version::Latest.is_latest());
        assert!(!Version::Pinned("1.2.3".to_string()).is_latest());
    }

    #[test]
    fn test_version_serde_as_string() {
        let json = serde_json::to_string(&Version::Pinned("2.0.1".to_string())).unwrap();
        assert_eq!(json, "\"2.0.1\"");
        let parsed: Version = serde_json::from_str("\"LATEST\"").unwrap();
        assert_eq!(parsed, Version::Latest);
        assert!(serde_json::from_str::<Version>("\"nope\"").is_err());
    }

    #[test]
    fn test_os_info_naming() {
        let windows = OsInfo::new(OsFamily::Windows, Architecture::X86_64);
        assert_eq!(windows.archive_format(), ArchiveFormat::Zip);
        assert_eq!(windows.gcloud_file_name(), "gcloud.cmd");
        assert_eq!(windows.to_string(), "windows-x86_64");

        let mac = OsInfo::new(OsFamily::Mac, Architecture::Arm64);
        assert_eq!(mac.archive_format(), ArchiveFormat::TarGz);
        assert_eq!(mac.to_string(), "darwin-arm");

        let linux = OsInfo::new(OsFamily::Linux, Architecture::X86);
        assert_eq!(linux.gcloud_file_name(), "gcloud");
        assert_eq!(linux.to_string(), "linux-x86");
        assert_eq!(linux.gcloud_relative_path(), Path::new("bin").join("gcloud"));
    }

    #[test]
    fn test_os_info_detect() {
        let expected_family = if cfg!(target_os = "windows") {
            Some(OsFamily::Windows)
        } else if cfg!(target_os = "macos") {
            Some(OsFamily::Mac)
        } else if cfg!(target_os = "linux") {
            Some(OsFamily::Linux)
        } else {
            None
        };
        let expected_arch = if cfg!(target_arch = "x86_64") {
            Some(Architecture::X86_64)
        } else if cfg!(target_arch = "x86") {
            Some(Architecture::X86)
        } else if cfg!(target_arch = "aarch64") {
            Some(Architecture::Arm64)
        } else {
            None
        };

        let detected = OsInfo::detect();
        match (expected_family, expected_arch) {
            (Some(family), Some(arch)) => assert_eq!(detected, Some(OsInfo::new(family, arch))),
            _ => assert_eq!(detected, None),
        }
    }

    #[test]
    fn test_archive_format_from_path() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("/tmp/archive.tar.gz")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("sdk.TGZ")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("C:\\sdk\\archive.zip")),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_path(Path::new("archive.dmg")), None);
    }

    #[test]
    fn test_archive_format_sniffs_magic_bytes() {
        let dir = TempDir::new().unwrap();

        let zip_like = dir.path().join("download.bin");
        std::fs::write(&zip_like, [0x50, 0x4b, 0x03, 0x04, 0x00]).unwrap();
        assert_eq!(ArchiveFormat::detect(&zip_like), Some(ArchiveFormat::Zip));

        let gz_like = dir.path().join("download.dat");
        std::fs::write(&gz_like, [0x1f, 0x8b, 0x08]).unwrap();
        assert_eq!(ArchiveFormat::detect(&gz_like), Some(ArchiveFormat::TarGz));

        let text = dir.path().join("notes");
        std::fs::write(&text, "plain text").unwrap();
        assert_eq!(ArchiveFormat::detect(&text), None);

        assert_eq!(ArchiveFormat::detect(&dir.path().join("missing")), None);
    }
}
