use crate::{Error, Result};

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use keel_modules::BoxError;
use keel_supervisor::StorageHandle;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const STATE_FILE: &str = "state.json";

/// What the node remembers about its previous runs.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// Node version that last opened the store.
    pub version: String,

    /// How many times the store has been opened.
    pub opened: u64,

    /// Unix time of the last open, in seconds.
    pub opened_at: u64,

    /// Unix time of the last close, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<u64>,

    /// Whether the last run closed the store.
    pub clean_shutdown: bool,
}

/// File-backed state store under the node's data directory.
///
/// Opening marks the store dirty; closing marks it clean again, so a record
/// found dirty on open means the previous run never got to close it.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    record: Mutex<StateRecord>,
}

impl StateStore {
    /// Open the store in `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or state file cannot be read or
    /// written.
    pub async fn open(data_dir: &Path, version: &str) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(Error::io("failed to create data directory", data_dir))?;

        let path = data_dir.join(STATE_FILE);
        let previous = match tokio::fs::read(&path).await {
            Ok(bytes) => Some(serde_json::from_slice::<StateRecord>(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(Error::io("failed to read state file", &path)(e)),
        };

        if previous.as_ref().is_some_and(|record| !record.clean_shutdown) {
            warn!("previous run did not shut down cleanly");
        }

        let record = StateRecord {
            version: version.to_string(),
            opened: previous.map_or(0, |record| record.opened) + 1,
            opened_at: unix_now(),
            closed_at: None,
            clean_shutdown: false,
        };

        let store = Self {
            path,
            record: Mutex::new(record),
        };
        store.flush().await?;

        debug!("opened state store at {}", store.path.display());

        Ok(store)
    }

    /// A copy of the current record.
    #[must_use]
    pub fn record(&self) -> StateRecord {
        self.record.lock().clone()
    }

    async fn flush(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.record())?;

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(Error::io("failed to write state file", &self.path))
    }
}

#[async_trait]
impl StorageHandle for StateStore {
    async fn close(&self) -> Result<(), BoxError> {
        {
            let mut record = self.record.lock();
            record.closed_at = Some(unix_now());
            record.clean_shutdown = true;
        }

        self.flush().await?;

        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_record(dir: &Path) -> StateRecord {
        let bytes = tokio::fs::read(dir.join(STATE_FILE)).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_open_marks_dirty_and_close_marks_clean() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");

        let store = StateStore::open(&data, "0.1.0").await.unwrap();
        let opened = read_record(&data).await;
        assert_eq!(opened.opened, 1);
        assert!(!opened.clean_shutdown);

        store.close().await.unwrap();
        let closed = read_record(&data).await;
        assert!(closed.clean_shutdown);
        assert!(closed.closed_at.is_some());
    }

    #[tokio::test]
    async fn test_reopen_counts_runs() {
        let dir = tempfile::tempdir().unwrap();

        let first = StateStore::open(dir.path(), "0.1.0").await.unwrap();
        first.close().await.unwrap();

        // Never closed: the next open finds it dirty.
        let _second = StateStore::open(dir.path(), "0.1.0").await.unwrap();
        let third = StateStore::open(dir.path(), "0.2.0").await.unwrap();

        let record = third.record();
        assert_eq!(record.opened, 3);
        assert_eq!(record.version, "0.2.0");
    }

    #[tokio::test]
    async fn test_corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(STATE_FILE), b"{ nope").await.unwrap();

        let result = StateStore::open(dir.path(), "0.1.0").await;

        assert!(matches!(result, Err(Error::Json(_))));
    }
}
