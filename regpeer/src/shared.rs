//! Shared directory: one read_dir pass producing the Publish listing.

use std::ffi::OsStr;
use std::path::PathBuf;

use regpeer_core::FileListing;

use crate::error::{PeerError, Result};

/// The directory whose regular files this peer advertises.
#[derive(Debug, Clone)]
pub struct SharedDir {
    path: PathBuf,
}

impl SharedDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// List regular files in directory order. Subdirectories and other special
    /// entries are skipped; symlinks count only if they resolve to a regular file.
    ///
    /// An unreadable directory is an error, never an empty listing.
    pub async fn snapshot(&self) -> Result<FileListing> {
        let unavailable = |source| PeerError::DirectoryUnavailable {
            path: self.path.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.path).await.map_err(unavailable)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let file_type = entry.file_type().await.map_err(unavailable)?;
            let is_file = if file_type.is_symlink() {
                tokio::fs::metadata(entry.path())
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false)
            } else {
                file_type.is_file()
            };
            if !is_file {
                tracing::trace!(entry = ?entry.file_name(), "skipping non-regular entry");
                continue;
            }
            names.push(name_bytes(&entry.file_name()));
        }
        tracing::debug!(dir = %self.path.display(), files = names.len(), "shared directory listed");
        Ok(FileListing::from_names(names))
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}
