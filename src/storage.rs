//! Output files: synthesized audio and optional summary text.
//!
//! Writes go through a temp file in the target directory and are renamed
//! into place, so an aborted job never leaves a half-written file behind.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("output path has no parent directory: {0}")]
    NoParent(PathBuf),
}

/// Create the output directory (and parents) if needed.
pub fn ensure_output_dir(dir: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// The `.txt` file that sits next to an audio file.
pub fn summary_path(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("txt")
}

/// Write `contents` to `path` atomically, creating the parent directory.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(StorageError::NoParent(path.to_path_buf())),
    };
    ensure_output_dir(dir)?;

    let write_error = |source: std::io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(contents).map_err(write_error)?;
    tmp.flush().map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Save the summary text next to its audio file and return where it went.
pub fn save_summary(audio_path: &Path, summary: &str) -> Result<PathBuf, StorageError> {
    let path = summary_path(audio_path);
    write_atomic(&path, summary.as_bytes())?;
    Ok(path)
}
