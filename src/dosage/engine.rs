//! Deficit-to-Dosage Engine
//!
//! Pure and total: every `(crop, reading)` pair maps to either a full
//! recommendation or `None` for crops outside the target table. No I/O,
//! no shared mutable state, safe to call from any number of tasks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::curve::DosageCurve;
use crate::config::{AdvisorConfig, CropTargets};
use crate::types::{Deficit, DosageRecommendation, NutrientReading, Recommendation};

/// One curve per fertilizer product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DosageCurves {
    #[serde(default = "default_urea")]
    pub urea: DosageCurve,
    #[serde(default = "default_tsp")]
    pub tsp: DosageCurve,
    #[serde(default = "default_mop")]
    pub mop: DosageCurve,
}

const fn default_urea() -> DosageCurve {
    DosageCurve::UREA
}

const fn default_tsp() -> DosageCurve {
    DosageCurve::TSP
}

const fn default_mop() -> DosageCurve {
    DosageCurve::MOP
}

impl Default for DosageCurves {
    fn default() -> Self {
        Self {
            urea: DosageCurve::UREA,
            tsp: DosageCurve::TSP,
            mop: DosageCurve::MOP,
        }
    }
}

impl DosageCurves {
    /// Apply each product's curve to its own nutrient channel.
    pub fn apply(&self, deficit: &Deficit) -> DosageRecommendation {
        DosageRecommendation {
            urea: self.urea.dose(deficit.n),
            tsp: self.tsp.dose(deficit.p),
            mop: self.mop.dose(deficit.k),
        }
    }
}

/// Fertilizer recommendation engine over an immutable target table.
#[derive(Debug, Clone)]
pub struct DosageEngine {
    targets: Arc<CropTargets>,
    curves: DosageCurves,
}

impl DosageEngine {
    pub fn new(targets: Arc<CropTargets>, curves: DosageCurves) -> Self {
        Self { targets, curves }
    }

    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self::new(Arc::new(config.crop_targets.clone()), config.dosage)
    }

    /// Recommend fertilizer for `crop_id` given the current soil reading.
    ///
    /// Returns `None` when the crop has no target entry. That is a normal
    /// outcome (classifiable but not fertilizer-advisable), not a failure.
    pub fn recommend(&self, crop_id: &str, reading: NutrientReading) -> Option<Recommendation> {
        let target = *self.targets.get(crop_id)?;
        let deficit = Deficit::between(&target, &reading);
        let dosage = self.curves.apply(&deficit);
        trace!(crop = crop_id, ?deficit, ?dosage, "dosage computed");
        Some(Recommendation {
            crop: crop_id.to_string(),
            target,
            deficit,
            dosage,
        })
    }

    /// Deficit only, without dosing.
    pub fn deficit(&self, crop_id: &str, reading: NutrientReading) -> Option<Deficit> {
        self.targets
            .get(crop_id)
            .map(|target| Deficit::between(target, &reading))
    }

    pub fn targets(&self) -> &CropTargets {
        &self.targets
    }

    pub fn shared_targets(&self) -> Arc<CropTargets> {
        Arc::clone(&self.targets)
    }

    pub const fn curves(&self) -> &DosageCurves {
        &self.curves
    }
}
