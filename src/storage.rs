//! Public downloads directory: location, access check and file writes.
//!
//! Both the download queue and the script bridge write here. Every write
//! gets its own hidden `.part` temp file in the target directory and is
//! renamed into place, so a failed write never leaves a truncated file under
//! the final name and concurrent writers never share a temp file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};
use thiserror::Error;
use tracing::debug;

const PROBE_FILE: &str = ".trialreader-access-probe";
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Resolves the downloads directory: explicit override, then the platform
/// downloads folder (localized names included), then `~/Downloads`, then
/// `./Downloads`.
pub fn downloads_dir(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir
        .or_else(dirs::download_dir)
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

/// Verifies that `dir` exists (creating it if needed) and accepts writes.
///
/// This is the desktop counterpart of the storage permission grant: it is
/// run once at startup and again before every write.
pub fn check_access(dir: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let probe = dir.join(PROBE_FILE);
    File::create(&probe).map_err(|e| StorageError::io(dir, e))?;
    if let Err(e) = fs::remove_file(&probe) {
        debug!(path = %probe.display(), error = %e, "Cannot remove access probe");
    }
    Ok(())
}

/// Reduces a caller-supplied name to a single path component.
///
/// Separators of either platform are treated as directory boundaries and
/// only the last component is kept. Empty names and dot-only names are
/// rejected.
pub fn sanitize_file_name(name: &str) -> Result<String, StorageError> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base.chars().all(|c| c == '.') {
        return Err(StorageError::InvalidFileName(name.to_string()));
    }
    Ok(base.to_string())
}

/// Writes `bytes` to `dir/file_name`, replacing any existing file.
pub fn write_file(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
    let name = sanitize_file_name(file_name)?;
    check_access(dir)?;

    let destination = dir.join(&name);
    let mut partial = partial_file(dir, &name).map_err(|e| StorageError::io(&destination, e))?;

    // On error the temp file is removed when `partial` drops.
    partial
        .write_all(bytes)
        .and_then(|()| partial.as_file().sync_all())
        .map_err(|e| StorageError::io(&destination, e))?;
    partial
        .persist(&destination)
        .map_err(|e| StorageError::io(&destination, e.error))?;

    Ok(destination)
}

/// Creates a fresh hidden temp file next to the final `name`. It is
/// deleted on drop unless persisted.
pub fn partial_file(dir: &Path, name: &str) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)
}

/// `true` for temp files created by [`partial_file`].
pub fn is_partial_name(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(PARTIAL_SUFFIX)
}

/// Moves a finished temp file to the first free name for `name` in `dir`.
///
/// The rename refuses to replace an existing file; if another writer takes
/// the candidate first, the next numbered name is tried.
pub fn persist_unique(mut partial: TempPath, dir: &Path, name: &str) -> io::Result<PathBuf> {
    loop {
        let destination = unique_destination(dir, name);
        match partial.persist_noclobber(&destination) {
            Ok(()) => return Ok(destination),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %destination.display(), "Destination taken, trying next name");
                partial = e.path;
            }
            Err(e) => return Err(e.error),
        }
    }
}

/// First free destination for `name` in `dir`: `a.pdf`, `a-1.pdf`, `a-2.pdf`…
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };

    (1..)
        .map(|n| dir.join(format!("{stem}-{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
