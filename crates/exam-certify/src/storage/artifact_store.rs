//! Certificate artifact persistence.

use std::path::PathBuf;

use crate::error::Result;

use super::write_atomic;

/// Durable store for rendered certificates.
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` under `name`, replacing any previous content.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Content previously stored under `name`, if any.
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// Filesystem-backed [`ArtifactStore`]; one file per artifact.
pub struct FileArtifactStore {
    base_dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Path of an artifact, for callers that want to read it back.
    pub fn path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.path(name), bytes)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
