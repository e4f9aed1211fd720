//! On-disk storage for uploaded media
//!
//! Files live flat in the uploads directory as `<uuid>.<ext>`. The database
//! records them as `uploads/<uuid>.<ext>`, which is also the URL path the
//! static file service exposes them under.

use std::io;
use std::path::{Path, PathBuf};

/// Prefix of every stored `ruta_archivo`
pub const PUBLIC_PREFIX: &str = "uploads";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create upload directory {path}: {source}")]
    Directory { path: PathBuf, source: io::Error },

    #[error("Failed to write upload {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Uploads directory handle
#[derive(Debug, Clone)]
pub struct MediaStorage {
    dir: PathBuf,
}

impl MediaStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the files are written to and served from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh name and return the stored `ruta_archivo`
    pub async fn save(&self, bytes: &[u8], extension: &str) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Directory {
                path: self.dir.clone(),
                source,
            })?;

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Write { path, source })?;

        Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
    }

    /// Resolve a stored `ruta_archivo` to its file on disk.
    /// Anything other than `uploads/<plain file name>` resolves to nothing.
    pub fn resolve(&self, stored_path: &str) -> Option<PathBuf> {
        let name = stored_path
            .strip_prefix(PUBLIC_PREFIX)?
            .strip_prefix('/')?;

        let is_plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        is_plain.then(|| self.dir.join(name))
    }

    /// Delete the file behind a stored `ruta_archivo`
    pub async fn remove(&self, stored_path: &str) -> io::Result<()> {
        let path = self.resolve(stored_path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not an uploads path: {}", stored_path),
            )
        })?;
        tokio::fs::remove_file(path).await
    }
}

/// Lower-cased extension of an uploaded file name
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
}
