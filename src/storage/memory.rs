//! In-memory sensor store
//!
//! Thread-safe via `RwLock`. Not durable: data is lost on restart.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{NewReading, SensorStore, StorageError, StoredReading};

pub struct InMemorySensorStore {
    readings: RwLock<VecDeque<StoredReading>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl InMemorySensorStore {
    /// Keep at most `capacity` readings, evicting the oldest.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            readings: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.readings.read().map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySensorStore {
    fn default() -> Self {
        Self::with_capacity(crate::config::defaults::IN_MEMORY_READINGS_CAPACITY)
    }
}

#[async_trait]
impl SensorStore for InMemorySensorStore {
    async fn append(&self, reading: NewReading) -> Result<StoredReading, StorageError> {
        let stored = StoredReading {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            nitrogen: reading.nitrogen,
            phosphorus: reading.phosphorus,
            potassium: reading.potassium,
            created_at: Utc::now(),
        };

        let mut store = self
            .readings
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        store.push_back(stored.clone());
        if store.len() > self.capacity {
            store.pop_front();
        }

        Ok(stored)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, StorageError> {
        let store = self
            .readings
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(store.iter().rev().take(limit).cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
