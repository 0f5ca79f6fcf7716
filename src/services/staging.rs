use crate::services::error::ExchangeError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Disposable staging area for one processing request.
///
/// The directory name is randomized under the scratch root, so concurrent
/// requests never share a workspace even for identical file names. Dropping
/// the workspace removes every staged artifact (the directory tree and any
/// tracked copy placed outside it) on success, error, and cancellation
/// paths alike.
pub struct StagingWorkspace {
    dir: TempDir,
    extras: Vec<PathBuf>,
}

impl StagingWorkspace {
    pub fn create(staging_root: &Path) -> Result<Self, ExchangeError> {
        std::fs::create_dir_all(staging_root)?;
        let dir = tempfile::Builder::new()
            .prefix("cipher_")
            .tempdir_in(staging_root)?;
        Ok(Self {
            dir,
            extras: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes the input into the workspace under its original name. The
    /// extension is preserved verbatim; the external tool derives its
    /// output naming from it.
    pub async fn stage(&self, data: &[u8], file_name: &str) -> Result<PathBuf, ExchangeError> {
        let path = self.dir.path().join(file_name);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Stages a copy outside the workspace (a tool build may insist on a
    /// fixed working directory). The copy is tracked and removed together
    /// with the workspace.
    pub async fn stage_copy(
        &mut self,
        data: &[u8],
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, ExchangeError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        self.extras.push(path.clone());
        Ok(path)
    }

    /// Registers a file outside the workspace for removal on release.
    /// Paths inside the workspace are already covered.
    pub fn track(&mut self, path: PathBuf) {
        if !path.starts_with(self.dir.path()) {
            self.extras.push(path);
        }
    }
}

impl Drop for StagingWorkspace {
    fn drop(&mut self) {
        for path in self.extras.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        "failed to remove staged copy {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
        // self.dir removes the workspace tree when it drops
    }
}
