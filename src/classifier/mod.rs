//! Crop classifier
//!
//! The classifier is an opaque, externally trained artifact. The service only
//! relies on the [`CropClassifier`] trait: NPK features in, crop label out.

mod knn;

pub use knn::{KnnClassifier, KnnModel, LabelledSample};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{CropTargets, ModelConfig};

/// Maps a raw NPK feature vector to a crop label.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across request handlers.
pub trait CropClassifier: Send + Sync {
    /// Always returns a label; models fall back to an implementation-defined
    /// default rather than failing.
    fn classify(&self, features: [f64; 3]) -> String;

    /// Model name for logging and health output.
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("failed to read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model artifact {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Build the classifier described by `config`.
///
/// With no artifact configured, classifies by nearest crop target.
pub fn load_classifier(
    config: &ModelConfig,
    targets: &CropTargets,
) -> Result<Arc<dyn CropClassifier>, ClassifierError> {
    if let Some(path) = &config.path {
        let clf = KnnClassifier::load(path)?;
        info!(
            path = %path.display(),
            samples = clf.model().samples.len(),
            k = clf.model().k,
            "Loaded crop classifier"
        );
        return Ok(Arc::new(clf));
    }

    warn!(
        crops = targets.len(),
        "No model artifact configured, classifying by nearest crop target"
    );
    Ok(Arc::new(KnnClassifier::from_targets(
        targets,
        &config.default_label,
    )))
}
