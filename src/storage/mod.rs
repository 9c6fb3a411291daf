//! Sensor Reading Storage
//!
//! Raw NPK readings pushed by field probes, behind a pluggable
//! [`SensorStore`] trait so backends can be swapped without touching the
//! API layer:
//! - `SledSensorStore`: embedded sled tree (default)
//! - `InMemorySensorStore`: bounded in-process buffer for tests and demos
//! - `RestSensorStore`: remote PostgREST table (e.g. Supabase)

mod memory;
mod rest;
mod sled_store;

pub use memory::InMemorySensorStore;
pub use rest::RestSensorStore;
pub use sled_store::SledSensorStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{defaults, StorageConfig, StoreBackend};
use crate::types::NutrientReading;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("remote store error: {0}")]
    Remote(String),
    #[error("remote store returned HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },
    #[error("store not configured: {0}")]
    NotConfigured(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.to_string())
    }
}

/// A reading as submitted by a probe, before the store assigns an id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl NewReading {
    pub const fn new(nitrogen: f64, phosphorus: f64, potassium: f64) -> Self {
        Self {
            nitrogen,
            phosphorus,
            potassium,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.nitrogen.is_finite() && self.phosphorus.is_finite() && self.potassium.is_finite()
    }
}

/// A persisted reading. Field names match the `sensor_data` table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub id: u64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub created_at: DateTime<Utc>,
}

impl StoredReading {
    pub const fn features(&self) -> [f64; 3] {
        [self.nitrogen, self.phosphorus, self.potassium]
    }

    /// Truncated reading suitable for the dosage engine.
    pub fn to_reading(&self) -> NutrientReading {
        NutrientReading::from_raw(self.features())
    }
}

/// Pluggable sensor reading store.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across request handlers.
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Append a reading and return it as stored.
    async fn append(&self, reading: NewReading) -> Result<StoredReading, StorageError>;

    /// Most recent readings, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, StorageError>;

    /// The single most recent reading, if any.
    async fn latest(&self) -> Result<Option<StoredReading>, StorageError> {
        Ok(self.recent(1).await?.into_iter().next())
    }

    /// Backend name for logging and health output.
    fn backend_name(&self) -> &'static str;
}

/// Open the store selected by `config`.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn SensorStore>, StorageError> {
    let store: Arc<dyn SensorStore> = match config.backend {
        StoreBackend::Sled => {
            let path = config.data_dir.join(sled_store::DB_DIR_NAME);
            Arc::new(SledSensorStore::open(&path)?)
        }
        StoreBackend::Memory => Arc::new(InMemorySensorStore::with_capacity(
            defaults::IN_MEMORY_READINGS_CAPACITY,
        )),
        StoreBackend::Rest => Arc::new(RestSensorStore::new(&config.rest)?),
    };
    info!(backend = store.backend_name(), "Sensor store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_reading_truncates_for_engine() {
        let r = StoredReading {
            id: 1,
            nitrogen: 99.9,
            phosphorus: 20.5,
            potassium: 0.2,
            created_at: Utc::now(),
        };
        assert_eq!(r.to_reading(), NutrientReading::new(99, 20, 0));
    }

    #[test]
    fn test_open_memory_store() {
        let config = StorageConfig {
            backend: StoreBackend::Memory,
            ..StorageConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_open_sled_store_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StoreBackend::Sled,
            data_dir: dir.path().to_path_buf(),
            ..StorageConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "sled");
        assert!(dir.path().join(sled_store::DB_DIR_NAME).exists());
    }

    #[test]
    fn test_open_rest_store_requires_url() {
        let config = StorageConfig {
            backend: StoreBackend::Rest,
            ..StorageConfig::default()
        };
        assert!(matches!(
            open_store(&config),
            Err(StorageError::NotConfigured(_))
        ));
    }
}
