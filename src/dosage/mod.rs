//! Fertilizer dosage
//!
//! - `curve`: the per-product deficit → dose step function
//! - `engine`: crop target lookup, deficit computation and dosing

mod curve;
mod engine;

pub use curve::{DosageCurve, Quantization};
pub use engine::{DosageCurves, DosageEngine};
