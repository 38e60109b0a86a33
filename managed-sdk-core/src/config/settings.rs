//! Settings for managed SDK installs.
//!
//! Persisted as pretty JSON, by default at `{config}/managed-sdk/settings.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::install::{Version, DEFAULT_BASE_URL};

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Parse(#[from] serde_json::Error),
}

// =============================================================================
// Default Locations
// =============================================================================

/// Default managed root for this platform.
///
/// - Linux: `~/.cache/google-cloud-tools-java/managed-cloud-sdk`
/// - macOS: `~/Library/Application Support/google-cloud-tools-java/managed-cloud-sdk`
/// - Windows: `%LOCALAPPDATA%\Google\ct4j-cloud-sdk`
///
/// Falls back to the OS temp dir when the user directories are unknown.
pub fn default_managed_root() -> PathBuf {
    let base = if cfg!(target_os = "windows") {
        dirs::data_local_dir().map(|dir| dir.join("Google").join("ct4j-cloud-sdk"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir().map(|dir| dir.join("google-cloud-tools-java").join("managed-cloud-sdk"))
    } else {
        dirs::cache_dir().map(|dir| dir.join("google-cloud-tools-java").join("managed-cloud-sdk"))
    };

    base.unwrap_or_else(|| std::env::temp_dir().join("managed-cloud-sdk"))
}

fn default_user_agent() -> String {
    format!("managed-sdk/{}", crate::VERSION)
}

// =============================================================================
// Settings
// =============================================================================

/// How and where the managed SDK is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one subdirectory per installed version.
    pub managed_root: PathBuf,

    /// `LATEST` or a pinned `MAJOR.MINOR.PATCH` release.
    pub version: Version,

    /// User-Agent sent with downloads.
    pub user_agent: String,

    /// Passed to the install script as `--usage-reporting`.
    pub usage_reporting: bool,

    /// Components the install script installs instead of its defaults.
    pub override_components: Option<Vec<String>>,

    /// Extra variables for the install script.
    pub environment: HashMap<String, String>,

    /// Release channel archives are downloaded from.
    pub download_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            managed_root: default_managed_root(),
            version: Version::Latest,
            user_agent: default_user_agent(),
            usage_reporting: false,
            override_components: None,
            environment: HashMap::new(),
            download_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("managed-sdk")
            .join("settings.json")
    }

    /// Loads settings from `path`.
    ///
    /// A missing file yields defaults. A file that cannot be parsed is
    /// logged and also yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!("Settings not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(
                    "Failed to parse settings at {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Writes settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Settings saved to {}", path.display());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
