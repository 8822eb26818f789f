use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::error;

use crate::Result;
use crate::SystemError;

fn path_error(
    path: &Path,
    source: std::io::Error,
) -> SystemError {
    SystemError::PathError {
        path: path.to_path_buf(),
        source,
    }
}

pub fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create directory {:?}: {:?}", parent_dir, e);
                return Err(path_error(parent_dir, e).into());
            }
        }
    }
    Ok(())
}

pub fn open_file_for_append(path: PathBuf) -> Result<File> {
    create_parent_dir_if_not_exist(&path)?;
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .map_err(|e| path_error(&path, e).into())
}

/// Returns `Ok(None)` when the file does not exist.
pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(path_error(path, e).into()),
    }
}

/// Returns whether a file was actually removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("removed {:?}", path);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(path_error(path, e).into()),
    }
}

pub fn rename_file(
    from: &Path,
    to: &Path,
) -> Result<()> {
    std::fs::rename(from, to).map_err(|e| path_error(from, e).into())
}

/// Writes `bytes` to a sibling temp file, syncs it and renames it over `path`,
/// so `path` is either the old content or the new one.
pub fn write_file_atomically(
    path: &Path,
    bytes: &[u8],
) -> Result<()> {
    create_parent_dir_if_not_exist(path)?;
    let tmp = temp_path_for(path);

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(path_error(&tmp, e).into());
    }
    rename_file(&tmp, path)
}

/// `<path>.<suffix>` next to `path`.
pub fn sibling_with_suffix(
    path: &Path,
    suffix: &str,
) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn temp_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}
