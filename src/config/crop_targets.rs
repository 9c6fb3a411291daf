//! Crop target table
//!
//! Immutable mapping from crop identifier to ideal NPK levels. Built once
//! from configuration at start-up and shared behind an `Arc`; nothing
//! mutates it afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::defaults::{MAIZE_TARGET, RICE_TARGET};
use crate::types::CropTarget;

/// Crop identifier → target NPK.
///
/// Keys are matched exactly as the classifier emits them (case-sensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CropTargets(BTreeMap<String, CropTarget>);

impl CropTargets {
    pub fn new(targets: BTreeMap<String, CropTarget>) -> Self {
        Self(targets)
    }

    /// Targets shipped with the service: maize and rice.
    pub fn builtin() -> Self {
        let (mn, mp, mk) = MAIZE_TARGET;
        let (rn, rp, rk) = RICE_TARGET;
        Self(BTreeMap::from([
            ("maize".to_string(), CropTarget::new(mn, mp, mk)),
            ("rice".to_string(), CropTarget::new(rn, rp, rk)),
        ]))
    }

    pub fn get(&self, crop_id: &str) -> Option<&CropTarget> {
        self.0.get(crop_id)
    }

    pub fn contains(&self, crop_id: &str) -> bool {
        self.0.contains_key(crop_id)
    }

    /// Crops in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CropTarget)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn crop_ids(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<(String, CropTarget)> for CropTargets {
    /// Entries with an existing identifier replace that crop's target.
    fn extend<I: IntoIterator<Item = (String, CropTarget)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Deserialize a `[crop_targets]` table as an overlay on [`CropTargets::builtin`].
pub(super) fn overlay_on_builtin<'de, D>(deserializer: D) -> Result<CropTargets, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, CropTarget>::deserialize(deserializer)?;
    let mut targets = CropTargets::builtin();
    targets.extend(overrides);
    Ok(targets)
}

impl Default for CropTargets {
    fn default() -> Self {
        Self::builtin()
    }
}
