//! Archive extraction for downloaded SDK packages.
//!
//! Handles zip and tar.gz, skips entries that would escape the destination
//! (absolute paths, `..`, links pointing outside it), recreates in-tree links
//! and restores execute bits on Unix.

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::error::ExtractError;
use super::types::ArchiveFormat;
use crate::progress::Progress;

fn io_error(path: &Path) -> impl Fn(io::Error) -> ExtractError + '_ {
    move |source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ============================================================================
// Archive Extraction
// ============================================================================

/// Unpacks SDK archives.
///
/// Extraction is blocking filesystem work; async callers run it on
/// `tokio::task::spawn_blocking`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts `archive` into `destination`, reporting through `progress`.
    ///
    /// The format comes from the file extension, falling back to the
    /// archive's magic bytes.
    ///
    /// # Errors
    ///
    /// [`ExtractError::UnknownArchiveType`] when the format cannot be
    /// determined; otherwise an I/O or zip error naming the offending path.
    pub fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        mut progress: Progress,
    ) -> Result<(), ExtractError> {
        let format =
            ArchiveFormat::detect(archive).ok_or_else(|| ExtractError::UnknownArchiveType {
                path: archive.to_path_buf(),
            })?;

        info!(
            "Extracting {:?} archive {} to {}",
            format,
            archive.display(),
            destination.display()
        );

        fs::create_dir_all(destination).map_err(io_error(destination))?;

        match format {
            ArchiveFormat::Zip => extract_zip(archive, destination, &mut progress)?,
            ArchiveFormat::TarGz => extract_tar_gz(archive, destination, &mut progress)?,
        }

        progress.done();
        Ok(())
    }
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
    progress: &mut Progress,
) -> Result<(), ExtractError> {
    let zip_error = |source| ExtractError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;
    let dest_dir_canonical = dest_dir.canonicalize().map_err(io_error(dest_dir))?;

    progress.start(
        &format!("Extracting {}", archive_path.display()),
        archive.len() as u64,
    );

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        progress.update(1);

        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                warn!("Skipping unsafe path in zip: {}", entry.name());
                continue;
            }
        };

        let dest_path = dest_dir.join(&entry_path);

        if is_zip_symlink(entry.unix_mode()) {
            // Zip stores the link target as the entry's contents.
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .map_err(io_error(&dest_path))?;
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            unpack_symlink(Path::new(&target), &dest_path, &dest_dir_canonical)?;
            continue;
        }

        if entry.is_dir() {
            fs::create_dir_all(&dest_path).map_err(io_error(&dest_path))?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }

            let mut outfile = File::create(&dest_path).map_err(io_error(&dest_path))?;
            io::copy(&mut entry, &mut outfile).map_err(io_error(&dest_path))?;

            #[cfg(unix)]
            set_unix_permissions(&dest_path, entry.unix_mode())?;
        }
    }

    debug!("ZIP extraction complete");
    Ok(())
}

fn is_zip_symlink(mode: Option<u32>) -> bool {
    mode.is_some_and(|mode| mode & 0o170000 == 0o120000)
}

// ============================================================================
// TAR.GZ Extraction
// ============================================================================

/// Counts bytes pulled from the compressed file, for progress.
struct CountingReader<R> {
    inner: R,
    count: Rc<Cell<u64>>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.count.set(self.count.get() + read as u64);
        Ok(read)
    }
}

fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
    progress: &mut Progress,
) -> Result<(), ExtractError> {
    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    let compressed_len = file.metadata().map_err(io_error(archive_path))?.len();

    progress.start(
        &format!("Extracting {}", archive_path.display()),
        compressed_len.max(1),
    );

    let count = Rc::new(Cell::new(0u64));
    let reader = CountingReader {
        inner: BufReader::new(file),
        count: count.clone(),
    };
    let decoder = flate2::read::GzDecoder::new(reader);

    let mut reported = 0u64;
    extract_tar(decoder, archive_path, dest_dir, || {
        let consumed = count.get();
        progress.update(consumed - reported);
        reported = consumed;
    })
}

fn extract_tar<R: Read>(
    reader: R,
    archive_path: &Path,
    dest_dir: &Path,
    mut on_entry: impl FnMut(),
) -> Result<(), ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let dest_dir_canonical = dest_dir
        .canonicalize()
        .unwrap_or_else(|_| dest_dir.to_path_buf());

    for entry_result in archive.entries().map_err(io_error(archive_path))? {
        let mut entry = entry_result.map_err(io_error(archive_path))?;
        on_entry();
        let entry_type = entry.header().entry_type();

        let path = entry.path().map_err(io_error(archive_path))?.into_owned();

        if path.is_absolute() || path.components().any(|c| c == Component::ParentDir) {
            warn!("Skipping unsafe path in tar: {:?}", path);
            continue;
        }

        let dest_path = dest_dir.join(&path);

        // Resolve through any existing directories before trusting the path.
        let dest_canonical = if dest_path.exists() {
            dest_path.canonicalize().map_err(io_error(&dest_path))?
        } else if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
            let parent_canonical = parent.canonicalize().map_err(io_error(parent))?;
            parent_canonical.join(dest_path.file_name().unwrap_or_default())
        } else {
            dest_path.clone()
        };

        if !dest_canonical.starts_with(&dest_dir_canonical) {
            warn!(
                "Skipping path that escapes {}: {:?}",
                dest_dir.display(),
                path
            );
            continue;
        }

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let target = match entry.link_name().map_err(io_error(archive_path))? {
                Some(target) => target.into_owned(),
                None => {
                    warn!("Skipping link without a target: {:?}", path);
                    continue;
                }
            };
            if entry_type.is_symlink() {
                unpack_symlink(&target, &dest_path, &dest_dir_canonical)?;
            } else {
                unpack_hard_link(&target, &dest_path, &dest_dir_canonical)?;
            }
        } else if entry_type.is_dir() {
            fs::create_dir_all(&dest_path).map_err(io_error(&dest_path))?;
        } else if entry_type.is_file() {
            let mut outfile = File::create(&dest_path).map_err(io_error(&dest_path))?;
            io::copy(&mut entry, &mut outfile).map_err(io_error(&dest_path))?;
            outfile.flush().map_err(io_error(&dest_path))?;

            #[cfg(unix)]
            {
                if let Ok(mode) = entry.header().mode() {
                    set_unix_permissions(&dest_path, Some(mode))?;
                }
            }
        }
    }

    debug!("TAR extraction complete");
    Ok(())
}

// ============================================================================
// Links
// ============================================================================

/// Resolves `target` relative to `base`, both under the canonical `root`.
///
/// Returns `None` when the target is absolute, climbs above `root`, or
/// already exists and canonicalizes to somewhere outside `root`.
fn resolve_within(root: &Path, base: &Path, target: &Path) -> Option<PathBuf> {
    let relative_base = base.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative_base.components().chain(target.components()) {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    // Existing links along the way are followed by the OS, not lexically.
    match base.join(target).canonicalize() {
        Ok(canonical) if !canonical.starts_with(root) => None,
        _ => Some(parts.iter().fold(root.to_path_buf(), |path, part| path.join(part))),
    }
}

/// Recreates a symlink if its target stays inside `root`.
fn unpack_symlink(target: &Path, link: &Path, root: &Path) -> Result<(), ExtractError> {
    let link_dir = match link.parent() {
        Some(parent) => parent.canonicalize().map_err(io_error(parent))?,
        None => root.to_path_buf(),
    };

    if resolve_within(root, &link_dir, target).is_none() {
        warn!(
            "Skipping symlink that escapes the destination: {} -> {}",
            link.display(),
            target.display()
        );
        return Ok(());
    }

    create_symlink(target, link)
}

/// Recreates a hard link; tar names its target relative to the archive root.
fn unpack_hard_link(target: &Path, link: &Path, root: &Path) -> Result<(), ExtractError> {
    match resolve_within(root, root, target) {
        Some(source) if source.is_file() => {
            remove_existing(link)?;
            fs::hard_link(&source, link).map_err(io_error(link))
        }
        _ => {
            warn!(
                "Skipping hard link to a missing or outside file: {} -> {}",
                link.display(),
                target.display()
            );
            Ok(())
        }
    }
}

fn remove_existing(path: &Path) -> Result<(), ExtractError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => fs::remove_file(path).map_err(io_error(path)),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<(), ExtractError> {
    remove_existing(link)?;
    std::os::unix::fs::symlink(target, link).map_err(io_error(link))
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> Result<(), ExtractError> {
    warn!(
        "Symlinks are not recreated on this platform: {} -> {}",
        link.display(),
        target.display()
    );
    Ok(())
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode((mode & 0o7777) | 0o755);
            fs::set_permissions(path, permissions).map_err(io_error(path))?;
        }
    }

    Ok(())
}
