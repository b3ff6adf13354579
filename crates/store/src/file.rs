use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use huddle_core::errors::PersistenceError;
use huddle_core::{StateKey, StateStore, VarMap};

/// One JSON file per key under a directory. The directory is created on
/// first write.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Keys become file names, so anything outside `[A-Za-z0-9_-]` is
    /// mapped to `_`.
    fn path_for(&self, key: &StateKey) -> PathBuf {
        let name: String = key
            .as_str()
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn read_failed(path: &Path, detail: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Read(format!("{}: {detail}", path.display()))
}

fn write_failed(path: &Path, detail: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Write(format!("{}: {detail}", path.display()))
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
    async fn put(&self, key: &StateKey, vars: &VarMap) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).await.map_err(|err| write_failed(&self.dir, err))?;

        let path = self.path_for(key);
        let body =
            serde_json::to_vec_pretty(vars).map_err(|err| write_failed(&path, err))?;
        fs::write(&path, body).await.map_err(|err| write_failed(&path, err))?;
        debug!(key = %key, path = %path.display(), "state written");
        Ok(())
    }

    async fn get(&self, key: &StateKey) -> Result<Option<VarMap>, PersistenceError> {
        let path = self.path_for(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(read_failed(&path, err)),
        };
        serde_json::from_slice(&raw).map(Some).map_err(|err| read_failed(&path, err))
    }

    async fn delete(&self, key: &StateKey) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(write_failed(&path, err)),
        }
    }
}
