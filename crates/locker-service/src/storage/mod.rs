//! Content-addressed blob storage on the local filesystem.
//!
//! A blob lives at `<base_dir>/<blob_key>`, where the key is the lowercase hex
//! SHA-256 of the request URI (path plus query string, exactly as received).
//! The store keeps no metadata and no in-process locks:
//!
//! - `create` uses exclusive creation, so a second writer for the same key
//!   fails with [`StorageError::AlreadyExists`] and never touches the blob
//! - `remove` unlinks; readers holding an open handle finish their read

use axum::http::Uri;
use ring::digest::{digest, SHA256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::instrument;

/// Errors raised by [`BlobStore`] operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found")]
    NotFound,

    #[error("Blob already exists")]
    AlreadyExists,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Derive the blob key for a request URI.
///
/// Hex-encoded SHA-256 of the path and query. `/a` and `/a?v=1` are
/// different keys.
#[must_use]
pub fn blob_key(uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    hex::encode(digest(&SHA256, path_and_query.as_bytes()))
}

/// Blob files under one base directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_dir: PathBuf,
}

impl BlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// On-disk path of the blob with `key`.
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }

    /// Open a blob for reading, returning the handle and its length.
    ///
    /// Anything other than a regular file at the blob path is reported as
    /// `NotFound`.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn open(&self, key: &str) -> Result<(File, u64), StorageError> {
        let path = self.blob_path(key);

        let metadata = fs::metadata(&path).await.map_err(not_found_or_io)?;
        if !metadata.is_file() {
            tracing::debug!(target: "locker.storage", "Blob path is not a regular file");
            return Err(StorageError::NotFound);
        }

        let file = File::open(&path).await.map_err(not_found_or_io)?;
        Ok((file, metadata.len()))
    }

    /// Create a blob from `reader`, failing if the key already exists.
    ///
    /// Returns the number of bytes written. The file is removed unless the
    /// copy completes, including when the returned future is dropped
    /// mid-copy (request timeout, client disconnect).
    #[instrument(skip_all, fields(key = %key))]
    pub async fn create<R>(&self, key: &str, reader: &mut R) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.blob_path(key);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists,
                _ => StorageError::Io(e),
            })?;
        let guard = PartialBlob::new(path);

        let written = copy_into(reader, &mut file).await?;
        guard.commit();

        tracing::debug!(target: "locker.storage", bytes = written, "Blob created");
        Ok(written)
    }

    /// Remove a blob.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.blob_path(key);

        let metadata = fs::metadata(&path).await.map_err(not_found_or_io)?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound);
        }

        fs::remove_file(&path).await.map_err(not_found_or_io)?;

        tracing::debug!(target: "locker.storage", "Blob removed");
        Ok(())
    }
}

async fn copy_into<R>(reader: &mut R, file: &mut File) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let written = tokio::io::copy(reader, file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// A blob file still being written. Dropping it before [`commit`] unlinks
/// the file.
///
/// [`commit`]: PartialBlob::commit
struct PartialBlob {
    path: Option<PathBuf>,
}

impl PartialBlob {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn commit(mut self) {
        self.path = None;
    }
}

impl Drop for PartialBlob {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };

        match std::fs::remove_file(&path) {
            Ok(()) => tracing::warn!(
                target: "locker.storage",
                path = %path.display(),
                "Removed incomplete blob"
            ),
            Err(e) => tracing::warn!(
                target: "locker.storage",
                path = %path.display(),
                error = %e,
                "Failed to remove incomplete blob"
            ),
        }
    }
}

fn not_found_or_io(e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound,
        _ => StorageError::Io(e),
    }
}
