mod local;

pub use local::LocalBlobStore;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid blob path '{0}'")]
    InvalidPath(String),
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("blob I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-path object storage for uploaded recall images.
pub trait BlobStore: Send + Sync {
    fn save(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn delete(&self, path: &str) -> Result<(), StorageError>;
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    /// Make the blob publicly readable and return its URL.
    fn make_public(&self, path: &str) -> Result<String, StorageError>;
    fn is_public(&self, path: &str) -> bool;
}

/// Delete every path concurrently. Failures are logged, never returned;
/// successes stand regardless of the others. Returns how many were deleted.
pub fn delete_blobs_best_effort(blobs: &dyn BlobStore, paths: &[&str]) -> usize {
    if paths.is_empty() {
        return 0;
    }

    std::thread::scope(|s| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| s.spawn(move || (*path, blobs.delete(path))))
            .collect();

        let mut deleted = 0;
        for handle in handles {
            match handle.join() {
                Ok((_, Ok(()))) => deleted += 1,
                Ok((path, Err(e))) => {
                    tracing::warn!(path, error = %e, "blob cleanup failed");
                }
                Err(_) => tracing::warn!("blob cleanup thread panicked"),
            }
        }
        deleted
    })
}
