//! The download, extract, install and verify pipeline.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::downloader::{ArchiveDownloader, HttpDownloader};
use super::error::{InstallStage, InstallerError};
use super::extractor::ArchiveExtractor;
use super::installer::Installer;
use super::paths::FileResourceProvider;
use super::types::OsInfo;
use crate::config::Settings;
use crate::progress::{MessageListener, Progress};

/// Budget of each pipeline stage.
const STAGE_UNITS: u64 = 100;

/// Install stage chosen once, from the version kind.
#[derive(Debug, Clone)]
enum PostInstall {
    /// Pinned archives are usable as extracted.
    Skip,
    /// The rolling archive needs its install script run.
    Script(Installer),
}

/// Acquires a managed SDK and returns its verified home directory.
///
/// Stages run strictly in order and the first failure aborts the rest:
///
/// 1. remove a stale archive and extraction directory
/// 2. download the archive, check it is a file
/// 3. extract it, check the SDK home is a directory
/// 4. run the install script (latest only)
/// 5. check the primary executable is a file
///
/// Installs targeting the same root must not run concurrently.
pub struct SdkInstaller {
    provider: FileResourceProvider,
    downloader: Box<dyn ArchiveDownloader>,
    extractor: ArchiveExtractor,
    post_install: PostInstall,
}

impl SdkInstaller {
    /// Creates a pipeline; `installer` only runs when the version is latest.
    pub fn new(
        provider: FileResourceProvider,
        downloader: Box<dyn ArchiveDownloader>,
        installer: Installer,
    ) -> Self {
        let post_install = if provider.version().is_latest() {
            PostInstall::Script(installer)
        } else {
            PostInstall::Skip
        };

        Self {
            provider,
            downloader,
            extractor: ArchiveExtractor::new(),
            post_install,
        }
    }

    /// Builds the HTTP-backed pipeline described by `settings`.
    pub fn from_settings(settings: &Settings, os: OsInfo) -> Result<Self, InstallerError> {
        let provider =
            FileResourceProvider::new(&settings.managed_root, settings.version.clone(), os)
                .with_base_url(&settings.download_base_url);
        let downloader = HttpDownloader::new(&settings.user_agent)?;
        let installer = Installer::new(os.family)
            .with_usage_reporting(settings.usage_reporting)
            .with_override_components(settings.override_components.clone())
            .with_environment(settings.environment.clone());

        Ok(Self::new(provider, Box::new(downloader), installer))
    }

    pub fn provider(&self) -> &FileResourceProvider {
        &self.provider
    }

    pub fn runs_install_script(&self) -> bool {
        matches!(self.post_install, PostInstall::Script(_))
    }

    /// Budget declared on the top-level progress listener.
    pub fn total_units(&self) -> u64 {
        match self.post_install {
            PostInstall::Skip => 2 * STAGE_UNITS,
            PostInstall::Script(_) => 3 * STAGE_UNITS,
        }
    }

    /// Runs the pipeline and returns the SDK home.
    ///
    /// `progress` must not have been started. Install script output is
    /// forwarded line by line to `messages`.
    pub async fn install(
        &self,
        mut progress: Progress,
        messages: Arc<dyn MessageListener>,
    ) -> Result<PathBuf, InstallerError> {
        let archive = self.provider.archive_destination();
        let extraction = self.provider.extraction_destination();
        let sdk_home = self.provider.sdk_home();
        let executable = self.provider.executable();

        clean_stale(&archive, &extraction).await?;

        progress.start("Installing Cloud SDK", self.total_units());

        info!("Downloading {}", self.provider.archive_source());
        self.downloader
            .download(
                &self.provider.archive_source(),
                &archive,
                progress.new_child(STAGE_UNITS),
            )
            .await?;
        if !is_file(&archive).await {
            return Err(InstallerError::verification(
                InstallStage::Download,
                "Download succeeded but valid archive not found at",
                archive,
            ));
        }

        info!("Extracting {} to {}", archive.display(), extraction.display());
        let extractor = self.extractor;
        let child = progress.new_child(STAGE_UNITS);
        let (source, destination) = (archive.clone(), extraction.clone());
        tokio::task::spawn_blocking(move || extractor.extract(&source, &destination, child))
            .await
            .map_err(|e| InstallerError::TaskFailed {
                stage: InstallStage::Extract,
                message: e.to_string(),
            })??;
        if !is_dir(&sdk_home).await {
            return Err(InstallerError::verification(
                InstallStage::Extract,
                "Extraction succeeded but valid sdk home not found at",
                sdk_home,
            ));
        }

        match &self.post_install {
            PostInstall::Skip => {
                info!("Pinned version {}, skipping install script", self.provider.version());
            }
            PostInstall::Script(installer) => {
                installer
                    .install(&sdk_home, progress.new_child(STAGE_UNITS), messages)
                    .await
                    .map_err(|source| InstallerError::Command {
                        stage: InstallStage::Install,
                        source,
                    })?;
            }
        }

        if !is_file(&executable).await {
            return Err(InstallerError::verification(
                InstallStage::Verify,
                "Installation succeeded but gcloud executable not found at",
                executable,
            ));
        }

        progress.done();
        info!("Managed SDK ready at {}", sdk_home.display());
        Ok(sdk_home)
    }
}

impl fmt::Debug for SdkInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkInstaller")
            .field("provider", &self.provider)
            .field("post_install", &self.post_install)
            .finish_non_exhaustive()
    }
}

/// Removes what a previous, possibly failed, attempt left behind.
async fn clean_stale(archive: &Path, extraction: &Path) -> Result<(), InstallerError> {
    let filesystem = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| InstallerError::Filesystem { path, source }
    };

    if let Ok(metadata) = tokio::fs::symlink_metadata(archive).await {
        info!("Removing stale archive {}", archive.display());
        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(archive).await
        } else {
            tokio::fs::remove_file(archive).await
        };
        removed.map_err(filesystem(archive))?;
    }

    if tokio::fs::symlink_metadata(extraction).await.is_ok() {
        info!("Removing stale extraction directory {}", extraction.display());
        tokio::fs::remove_dir_all(extraction)
            .await
            .map_err(filesystem(extraction))?;
    }

    Ok(())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}
