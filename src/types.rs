//! Core domain types shared by the dosage engine, classifier, storage and API.
//!
//! Readings arrive from the soil probe as floating point and are truncated
//! toward zero before any agronomic arithmetic. Targets, deficits and doses
//! stay in `f64` so that configured targets may carry fractional values.

use serde::{Deserialize, Serialize};

// ============================================================================
// Nutrients & Products
// ============================================================================

/// The three macronutrients measured by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Nutrient {
    /// Single-letter symbol used in API payloads.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Nitrogen => "N",
            Self::Phosphorus => "P",
            Self::Potassium => "K",
        }
    }
}

/// Fertilizer products the advisor can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FertilizerProduct {
    /// Urea, supplies nitrogen.
    Urea,
    /// Triple superphosphate, supplies phosphorus.
    Tsp,
    /// Muriate of potash, supplies potassium.
    Mop,
}

impl FertilizerProduct {
    pub const ALL: [Self; 3] = [Self::Urea, Self::Tsp, Self::Mop];

    /// The nutrient this product corrects.
    pub const fn nutrient(self) -> Nutrient {
        match self {
            Self::Urea => Nutrient::Nitrogen,
            Self::Tsp => Nutrient::Phosphorus,
            Self::Mop => Nutrient::Potassium,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Urea => "Urea",
            Self::Tsp => "TSP",
            Self::Mop => "MOP",
        }
    }
}

// ============================================================================
// Readings
// ============================================================================

/// One NPK soil reading, truncated to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientReading {
    pub nitrogen: i64,
    pub phosphorus: i64,
    pub potassium: i64,
}

impl NutrientReading {
    pub const fn new(nitrogen: i64, phosphorus: i64, potassium: i64) -> Self {
        Self {
            nitrogen,
            phosphorus,
            potassium,
        }
    }

    /// Build a reading from raw sensor values, truncating each toward zero.
    ///
    /// Negative values survive as negative integers. NaN becomes 0 and
    /// infinities saturate, following `as` cast semantics.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_raw(raw: [f64; 3]) -> Self {
        Self::new(raw[0] as i64, raw[1] as i64, raw[2] as i64)
    }

    pub const fn get(&self, nutrient: Nutrient) -> i64 {
        match nutrient {
            Nutrient::Nitrogen => self.nitrogen,
            Nutrient::Phosphorus => self.phosphorus,
            Nutrient::Potassium => self.potassium,
        }
    }
}

impl From<(i64, i64, i64)> for NutrientReading {
    fn from((n, p, k): (i64, i64, i64)) -> Self {
        Self::new(n, p, k)
    }
}

// ============================================================================
// Targets & Deficits
// ============================================================================

/// Ideal NPK levels for one crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropTarget {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

impl CropTarget {
    pub const fn new(n: f64, p: f64, k: f64) -> Self {
        Self { n, p, k }
    }

    pub const fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Nitrogen => self.n,
            Nutrient::Phosphorus => self.p,
            Nutrient::Potassium => self.k,
        }
    }

    /// The target as a classifier feature vector.
    pub const fn as_features(&self) -> [f64; 3] {
        [self.n, self.p, self.k]
    }
}

/// Per-nutrient shortfall, clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deficit {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
}

impl Deficit {
    /// Shortfall of `reading` against `target`. A surplus yields zero.
    pub fn between(target: &CropTarget, reading: &NutrientReading) -> Self {
        let shortfall = |nutrient| {
            #[allow(clippy::cast_precision_loss)]
            let current = reading.get(nutrient) as f64;
            (target.get(nutrient) - current).max(0.0)
        };
        Self {
            n: shortfall(Nutrient::Nitrogen),
            p: shortfall(Nutrient::Phosphorus),
            k: shortfall(Nutrient::Potassium),
        }
    }

    pub const fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Nitrogen => self.n,
            Nutrient::Phosphorus => self.p,
            Nutrient::Potassium => self.k,
        }
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// Recommended application amount per fertilizer product (kg).
///
/// All three entries are always present; `0.0` means "no action".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DosageRecommendation {
    #[serde(rename = "Urea")]
    pub urea: f64,
    #[serde(rename = "TSP")]
    pub tsp: f64,
    #[serde(rename = "MOP")]
    pub mop: f64,
}

impl DosageRecommendation {
    pub const fn get(&self, product: FertilizerProduct) -> f64 {
        match product {
            FertilizerProduct::Urea => self.urea,
            FertilizerProduct::Tsp => self.tsp,
            FertilizerProduct::Mop => self.mop,
        }
    }

    /// True when no product needs to be applied.
    pub fn is_no_action(&self) -> bool {
        FertilizerProduct::ALL.iter().all(|&p| self.get(p) == 0.0)
    }
}

/// Full engine output for a known crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub crop: String,
    pub target: CropTarget,
    pub deficit: Deficit,
    pub dosage: DosageRecommendation,
}
