//! Predict flow shared by the legacy and v2 routes: classify the features,
//! then ask the dosage engine for guidance on the predicted crop.

use serde::{Deserialize, Serialize, Serializer};
use tracing::info;

use super::handlers::AppState;
use crate::types::{Deficit, DosageRecommendation, NutrientReading, Recommendation};

pub const INVALID_FEATURES_MESSAGE: &str = "Invalid input. Must be a list of 3 NPK values.";

/// Body of `POST /predict`.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub features: Option<Vec<f64>>,
}

impl PredictRequest {
    /// The `[N, P, K]` triple, or `None` when missing or of the wrong length.
    pub fn features(&self) -> Option<[f64; 3]> {
        self.features.as_deref()?.try_into().ok()
    }
}

/// Body of `POST /api/v2/recommend`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    pub crop: String,
    #[serde(default)]
    pub features: Option<Vec<f64>>,
}

impl RecommendRequest {
    pub fn features(&self) -> Option<[f64; 3]> {
        self.features.as_deref()?.try_into().ok()
    }
}

pub fn no_guidance_message(crop: &str) -> String {
    format!("No fertilizer guidance available for {crop}")
}

/// Result of one predict call.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub prediction: String,
    pub reading: NutrientReading,
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl Prediction {
    fn new(crop: String, reading: NutrientReading, recommendation: Option<Recommendation>) -> Self {
        let guidance = recommendation
            .is_none()
            .then(|| no_guidance_message(&crop));
        Self {
            prediction: crop,
            reading,
            recommendation,
            guidance,
        }
    }
}

pub fn predict(state: &AppState, features: [f64; 3]) -> Prediction {
    let crop = state.classifier.classify(features);
    let prediction = recommend(state, crop, features);
    info!(
        prediction = %prediction.prediction,
        advisable = prediction.recommendation.is_some(),
        "Crop predicted"
    );
    prediction
}

/// Engine-only path: the crop is supplied by the caller.
pub fn recommend(state: &AppState, crop: String, features: [f64; 3]) -> Prediction {
    let reading = NutrientReading::from_raw(features);
    let recommendation = state.engine.recommend(&crop, reading);
    Prediction::new(crop, reading, recommendation)
}

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Legacy clients parse `needed_nutrients` as integers, so whole amounts
/// are written without a fractional part.
#[allow(clippy::cast_possible_truncation, clippy::trivially_copy_pass_by_ref)]
fn whole_as_integer<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        return serializer.serialize_i64(*value as i64);
    }
    serializer.serialize_f64(*value)
}

/// `needed_nutrients` on the legacy flat shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegacyNutrients {
    #[serde(rename = "N", serialize_with = "whole_as_integer")]
    pub n: f64,
    #[serde(rename = "P", serialize_with = "whole_as_integer")]
    pub p: f64,
    #[serde(rename = "K", serialize_with = "whole_as_integer")]
    pub k: f64,
}

impl From<Deficit> for LegacyNutrients {
    fn from(d: Deficit) -> Self {
        Self {
            n: d.n,
            p: d.p,
            k: d.k,
        }
    }
}

/// Flat shape served by the legacy `POST /predict`.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyPrediction {
    pub prediction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needed_nutrients: Option<LegacyNutrients>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fertilizer: Option<DosageRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl From<Prediction> for LegacyPrediction {
    fn from(p: Prediction) -> Self {
        Self {
            prediction: p.prediction,
            needed_nutrients: p.recommendation.as_ref().map(|r| r.deficit.into()),
            fertilizer: p.recommendation.as_ref().map(|r| r.dosage),
            guidance: p.guidance,
        }
    }
}
