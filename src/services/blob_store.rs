use crate::services::error::ExchangeError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Byte payloads on the local filesystem, all under one fixed root
/// directory. Names are chosen by the token store (token + extension),
/// never raw caller input, so nothing written here can escape the root.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persists `data` under `root/<name>`, creating the root on first use.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<PathBuf, ExchangeError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, ExchangeError> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ExchangeError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent: deleting an already-absent blob is success, not an error.
    pub async fn delete(&self, path: &Path) -> Result<(), ExchangeError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
