//! Deficit → dose step function.
//!
//! Every product goes through the same `DosageCurve::dose`, parameterised by
//! its own divisor, multiplier and cap. Channels never share state.

use serde::{Deserialize, Serialize};

use crate::config::defaults::{
    MOP_BUCKET_SIZE, MOP_CAP_KG, MOP_KG_PER_BUCKET, NO_ACTION_DEFICIT, TSP_BUCKET_SIZE,
    TSP_CAP_KG, TSP_KG_PER_BUCKET, UREA_CAP_KG, UREA_DEFICIT_DIVISOR, UREA_MULTIPLIER,
};

/// How the quotient `deficit / divisor` becomes a dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantization {
    /// Continuous, rounded to one decimal place.
    Tenths,
    /// Every started bucket of `divisor` units earns one `multiplier`.
    WholeBuckets,
}

/// Parameters of one product's dose curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DosageCurve {
    /// Deficits strictly below this need no product.
    pub min_deficit: f64,
    /// Divisor (continuous) or bucket size (bucketed).
    pub divisor: f64,
    pub multiplier: f64,
    /// Hard ceiling on the dose.
    pub cap: f64,
    pub quantization: Quantization,
}

impl DosageCurve {
    pub const UREA: Self = Self {
        min_deficit: NO_ACTION_DEFICIT,
        divisor: UREA_DEFICIT_DIVISOR,
        multiplier: UREA_MULTIPLIER,
        cap: UREA_CAP_KG,
        quantization: Quantization::Tenths,
    };

    pub const TSP: Self = Self {
        min_deficit: NO_ACTION_DEFICIT,
        divisor: TSP_BUCKET_SIZE,
        multiplier: TSP_KG_PER_BUCKET,
        cap: TSP_CAP_KG,
        quantization: Quantization::WholeBuckets,
    };

    pub const MOP: Self = Self {
        min_deficit: NO_ACTION_DEFICIT,
        divisor: MOP_BUCKET_SIZE,
        multiplier: MOP_KG_PER_BUCKET,
        cap: MOP_CAP_KG,
        quantization: Quantization::WholeBuckets,
    };

    /// Dose for a non-negative deficit.
    ///
    /// Non-decreasing in `deficit` for any curve with non-negative
    /// multiplier and a positive divisor. NaN deficits dose zero.
    pub fn dose(&self, deficit: f64) -> f64 {
        // Written so that NaN falls into the no-action branch.
        if !(deficit >= self.min_deficit) {
            return 0.0;
        }
        let quotient = deficit / self.divisor;
        let raw = match self.quantization {
            Quantization::Tenths => round_tenths(quotient * self.multiplier),
            Quantization::WholeBuckets => quotient.ceil() * self.multiplier,
        };
        raw.min(self.cap)
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
