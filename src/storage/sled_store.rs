//! Sled-backed sensor store
//!
//! Readings live in a named tree keyed by a sled-generated id (big-endian
//! u64). Ids are monotonic across restarts, so key order is arrival order.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{NewReading, SensorStore, StorageError, StoredReading};

/// Directory created under the data dir.
pub const DB_DIR_NAME: &str = "sensor_readings.db";

const READINGS_TREE: &str = "sensor_readings";

#[derive(Clone)]
pub struct SledSensorStore {
    db: Arc<sled::Db>,
    tree: sled::Tree,
}

impl SledSensorStore {
    /// Open or create the reading store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        let tree = db.open_tree(READINGS_TREE)?;
        tracing::info!(path = %path_ref.display(), readings = tree.len(), "Sensor store opened");
        Ok(Self {
            db: Arc::new(db),
            tree,
        })
    }

    /// Number of stored readings.
    pub fn count(&self) -> usize {
        self.tree.len()
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl SensorStore for SledSensorStore {
    /// Does not flush on each write; sled flushes in the background. A crash
    /// may lose the last few readings, which probes resend anyway.
    async fn append(&self, reading: NewReading) -> Result<StoredReading, StorageError> {
        let id = self.db.generate_id()?;
        let stored = StoredReading {
            id,
            nitrogen: reading.nitrogen,
            phosphorus: reading.phosphorus,
            potassium: reading.potassium,
            created_at: Utc::now(),
        };
        let value = serde_json::to_vec(&stored)?;
        self.tree.insert(id.to_be_bytes(), value)?;
        tracing::debug!(id, "Stored sensor reading");
        Ok(stored)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, StorageError> {
        let mut readings = Vec::with_capacity(limit.min(self.tree.len()));

        // Newest first: big-endian id keys sort chronologically.
        for item in self.tree.iter().rev() {
            if readings.len() >= limit {
                break;
            }
            let (key, value) = item?;
            match serde_json::from_slice::<StoredReading>(&value) {
                Ok(r) => readings.push(r),
                Err(e) => {
                    tracing::warn!(key = ?key, error = %e, "Skipping corrupted sensor reading");
                }
            }
        }

        Ok(readings)
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledSensorStore::open(dir.path()).unwrap();
        assert!(store.latest().await.unwrap().is_none());

        store.append(NewReading::new(10.0, 20.0, 30.0)).await.unwrap();
        let second = store.append(NewReading::new(40.5, 50.0, 60.0)).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest, second);
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledSensorStore::open(dir.path()).unwrap();
        for i in 0..5 {
            store.append(NewReading::new(f64::from(i), 0.0, 0.0)).await.unwrap();
        }
        let recent = store.recent(3).await.unwrap();
        let n: Vec<f64> = recent.iter().map(|r| r.nitrogen).collect();
        assert_eq!(n, vec![4.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn test_readings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledSensorStore::open(dir.path()).unwrap();
            store.append(NewReading::new(1.0, 2.0, 3.0)).await.unwrap();
            store.flush().unwrap();
        }
        let store = SledSensorStore::open(dir.path()).unwrap();
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.features(), [1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_corrupted_entry_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledSensorStore::open(dir.path()).unwrap();
        store.append(NewReading::new(1.0, 2.0, 3.0)).await.unwrap();
        store.tree.insert(u64::MAX.to_be_bytes(), b"garbage".to_vec()).unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
    }
}
