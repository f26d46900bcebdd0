//! Snapshot stores keeping the result of the previous successful poll.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::model::Snapshot;
use crate::ports::{PortError, SnapshotStore};

/// Store that keeps the previous snapshot for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, PortError> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PortError> {
        *self.snapshot.lock().await = Some(snapshot.clone());
        Ok(())
    }
}

/// Store that persists the previous snapshot as a JSON file, surviving restarts.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store backed by the file at `path`. The file is created on first save.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, action: &str, err: &impl fmt::Display) -> PortError {
        PortError::Storage(format!("{action} {}: {err}", self.path.display()))
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, PortError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored snapshot yet");
                return Ok(None);
            }
            Err(err) => return Err(self.failure("read", &err)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| self.failure("decode", &err))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PortError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.failure("create directory for", &err))?;
        }

        // Write beside the target and rename so a crash never leaves a torn file.
        let staging = self.staging_path();
        let bytes = serde_json::to_vec(snapshot).map_err(|err| self.failure("encode", &err))?;
        fs::write(&staging, bytes)
            .await
            .map_err(|err| self.failure("write", &err))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|err| self.failure("replace", &err))?;

        debug!(path = %self.path.display(), slots = snapshot.len(), "Stored snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::{ResourceSet, TimeKey};

    fn sample() -> Snapshot {
        let local = NaiveDate::from_ymd_opt(2025, 5, 10)
            .and_then(|day| day.and_hms_opt(15, 0, 0))
            .expect("valid local time");
        [(TimeKey::from_local(&local), ResourceSet::from(vec![1, 2]))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn memory_store_starts_empty_and_keeps_the_last_save() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.load().await.expect("load"), None);

        store.save(&sample()).await.expect("save");
        assert_eq!(store.load().await.expect("load"), Some(sample()));
    }

    #[tokio::test]
    async fn file_store_survives_a_new_instance() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("state").join("snapshot.json");

        let store = FileSnapshotStore::new(&path);
        assert_eq!(store.load().await.expect("load"), None);
        store.save(&sample()).await.expect("save");

        let reopened = FileSnapshotStore::new(&path);
        assert_eq!(reopened.load().await.expect("load"), Some(sample()));
        assert!(!reopened.staging_path().exists());
    }

    #[tokio::test]
    async fn file_store_rejects_corrupt_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, b"not json").expect("write corrupt file");

        let err = FileSnapshotStore::new(&path).load().await.expect_err("corrupt file");
        assert!(matches!(err, PortError::Storage(ref message) if message.starts_with("decode")));
    }

    #[tokio::test]
    async fn file_store_reports_unwritable_locations() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, b"a file, not a directory").expect("write blocker");

        let store = FileSnapshotStore::new(blocker.join("snapshot.json"));
        let err = store.save(&sample()).await.expect_err("parent is a file");
        assert!(matches!(err, PortError::Storage(_)));
    }
}
