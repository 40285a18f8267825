// src/storage/local.rs
use super::{BlobStore, StorageError};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Filesystem blob store. Public blobs are served by the router under
/// `/uploads/`; a blob is public once a `.public` marker sits next to it.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a relative blob path under the root, refusing anything that
    /// could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(path);
        let clean = !path.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean || path.ends_with(".public") {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(rel))
    }

    fn marker(full: &Path) -> PathBuf {
        let mut name = full.as_os_str().to_owned();
        name.push(".public");
        PathBuf::from(name)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl BlobStore for LocalBlobStore {
    fn save(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        fs::write(&full, bytes).map_err(io_err(&full))
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        fs::remove_file(&full).map_err(io_err(&full))?;
        let marker = Self::marker(&full);
        if marker.exists() {
            fs::remove_file(&marker).map_err(io_err(&marker))?;
        }
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        fs::read(&full).map_err(io_err(&full))
    }

    fn make_public(&self, path: &str) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let marker = Self::marker(&full);
        fs::write(&marker, b"").map_err(io_err(&marker))?;
        Ok(format!("{}/uploads/{}", self.public_base_url, path))
    }

    fn is_public(&self, path: &str) -> bool {
        self.resolve(path)
            .map(|full| Self::marker(&full).exists())
            .unwrap_or(false)
    }
}
