//! System-wide default constants.
//!
//! Agronomic constants live here rather than inline so that a different
//! fertilizer formulation can be tuned without touching the control flow.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Dosage: shared
// ============================================================================

/// Deficits below this level need no fertilizer at all (any product).
pub const NO_ACTION_DEFICIT: f64 = 10.0;

// ============================================================================
// Dosage: Urea (nitrogen)
// ============================================================================

/// Nitrogen deficit units per kg of urea.
pub const UREA_DEFICIT_DIVISOR: f64 = 2.5;

/// Scale applied after division. Urea is dosed 1:1 against the quotient.
pub const UREA_MULTIPLIER: f64 = 1.0;

/// Maximum single urea application (kg).
pub const UREA_CAP_KG: f64 = 78.0;

// ============================================================================
// Dosage: TSP (phosphorus)
// ============================================================================

/// Phosphorus deficit covered by one TSP bucket.
pub const TSP_BUCKET_SIZE: f64 = 10.0;

/// TSP per started bucket (kg).
pub const TSP_KG_PER_BUCKET: f64 = 18.0;

/// Maximum single TSP application (kg).
pub const TSP_CAP_KG: f64 = 180.0;

// ============================================================================
// Dosage: MOP (potassium)
// ============================================================================

/// Potassium deficit covered by one MOP bucket.
pub const MOP_BUCKET_SIZE: f64 = 10.0;

/// MOP per started bucket (kg).
pub const MOP_KG_PER_BUCKET: f64 = 6.0;

/// Maximum single MOP application (kg).
pub const MOP_CAP_KG: f64 = 60.0;

// ============================================================================
// Crop targets (N, P, K)
// ============================================================================

pub const MAIZE_TARGET: (f64, f64, f64) = (197.0, 70.0, 180.0);

pub const RICE_TARGET: (f64, f64, f64) = (175.0, 87.0, 178.0);

// ============================================================================
// Classifier
// ============================================================================

/// Neighbours consulted by the k-NN model when the artifact omits `k`.
pub const DEFAULT_KNN_K: usize = 5;

/// Label returned when a model has nothing to vote with.
pub const DEFAULT_CROP_LABEL: &str = "unknown";

// ============================================================================
// Server
// ============================================================================

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:5000";

/// Largest accepted request body. NPK payloads are tiny.
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

/// Default page size for `/api/v2/readings`.
pub const DEFAULT_READINGS_LIMIT: usize = 20;

/// Upper bound on `/api/v2/readings?limit=`.
pub const MAX_READINGS_LIMIT: usize = 500;

// ============================================================================
// Storage
// ============================================================================

pub const DEFAULT_DATA_DIR: &str = "./data";

/// Ring-buffer capacity of the in-memory sensor store.
pub const IN_MEMORY_READINGS_CAPACITY: usize = 10_000;

/// Table holding raw readings in the remote relational store.
pub const DEFAULT_SENSOR_TABLE: &str = "sensor_data";

/// HTTP client timeout for the remote store (seconds).
pub const REST_STORE_TIMEOUT_SECS: u64 = 10;
