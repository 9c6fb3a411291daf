//! Crop Advisor: soil-nutrient crop and fertilizer recommendations
//!
//! ## Architecture
//!
//! - **Classifier**: maps an NPK reading to the most suitable crop
//! - **Dosage Engine**: turns the gap between a crop's ideal NPK levels and
//!   the reading into Urea / TSP / MOP amounts
//! - **Sensor Store**: persists probe readings (sled, memory or PostgREST)
//! - **API**: legacy flat routes plus the enveloped `/api/v2` surface

pub mod api;
pub mod classifier;
pub mod config;
pub mod dosage;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::{AdvisorConfig, ConfigError, CropTargets};

// Re-export engine and classifier
pub use classifier::{load_classifier, CropClassifier, KnnClassifier};
pub use dosage::{DosageCurve, DosageCurves, DosageEngine};

// Re-export storage
pub use storage::{open_store, NewReading, SensorStore, StorageError, StoredReading};

// Re-export commonly used types
pub use types::{
    CropTarget, Deficit, DosageRecommendation, FertilizerProduct, Nutrient, NutrientReading,
    Recommendation,
};
