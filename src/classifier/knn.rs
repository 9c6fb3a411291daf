//! k-nearest-neighbour crop model.
//!
//! The artifact is the fitted model itself: a list of labelled NPK samples
//! plus `k`. It is produced offline and loaded read-only at start-up.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ClassifierError, CropClassifier};
use crate::config::defaults::{DEFAULT_CROP_LABEL, DEFAULT_KNN_K};
use crate::config::CropTargets;

/// One training point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledSample {
    pub features: [f64; 3],
    pub label: String,
}

/// Serialized k-NN model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnModel {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_label")]
    pub default_label: String,
    #[serde(default)]
    pub samples: Vec<LabelledSample>,
}

const fn default_k() -> usize {
    DEFAULT_KNN_K
}

fn default_label() -> String {
    DEFAULT_CROP_LABEL.to_string()
}

/// Majority-vote k-NN over Euclidean distance in NPK space.
///
/// Vote ties go to the label with the smaller summed distance, then to the
/// lexicographically smaller label, so classification is deterministic.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    model: KnnModel,
    name: String,
}

impl KnnClassifier {
    pub fn from_model(model: KnnModel, name: impl Into<String>) -> Result<Self, ClassifierError> {
        if model.k == 0 {
            return Err(ClassifierError::InvalidModel("k must be >= 1".to_string()));
        }
        if let Some(bad) = model
            .samples
            .iter()
            .position(|s| s.features.iter().any(|v| !v.is_finite()))
        {
            return Err(ClassifierError::InvalidModel(format!(
                "sample {bad} has non-finite features"
            )));
        }
        if let Some(bad) = model.samples.iter().position(|s| s.label.is_empty()) {
            return Err(ClassifierError::InvalidModel(format!(
                "sample {bad} has an empty label"
            )));
        }
        Ok(Self {
            model,
            name: name.into(),
        })
    }

    /// Load a JSON model artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let bytes = std::fs::read(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: KnnModel =
            serde_json::from_slice(&bytes).map_err(|source| ClassifierError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_model(model, format!("knn:{}", path.display()))
    }

    /// 1-NN over the crop target table: each crop's ideal NPK is its only
    /// sample. Used when no trained artifact is configured.
    pub fn from_targets(targets: &CropTargets, default_label: &str) -> Self {
        let samples = targets
            .iter()
            .map(|(crop, target)| LabelledSample {
                features: target.as_features(),
                label: crop.to_string(),
            })
            .collect();
        Self {
            model: KnnModel {
                k: 1,
                default_label: default_label.to_string(),
                samples,
            },
            name: "nearest-target".to_string(),
        }
    }

    pub const fn model(&self) -> &KnnModel {
        &self.model
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

impl CropClassifier for KnnClassifier {
    fn classify(&self, features: [f64; 3]) -> String {
        if self.model.samples.is_empty() {
            return self.model.default_label.clone();
        }

        let mut scored: Vec<(f64, &str)> = self
            .model
            .samples
            .iter()
            .map(|s| (distance(s.features, features), s.label.as_str()))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        let k = self.model.k.min(scored.len());
        let mut votes: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
        for &(dist, label) in &scored[..k] {
            let entry = votes.entry(label).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += dist;
        }

        votes
            .into_iter()
            .min_by(|(la, (ca, da)), (lb, (cb, db))| {
                cb.cmp(ca).then_with(|| da.total_cmp(db)).then_with(|| la.cmp(lb))
            })
            .map_or_else(|| self.model.default_label.clone(), |(label, _)| label.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
