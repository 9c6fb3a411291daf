//! Config validation: unknown-key detection with Levenshtein suggestions
//! and agronomic range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Unknown keys never break a config.

use std::collections::HashSet;

use super::AdvisorConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Section whose sub-tables are user-named crops.
const CROP_TARGETS_SECTION: &str = "crop_targets";

/// Leaf keys allowed inside each `[crop_targets.<crop>]` table.
const CROP_TARGET_FIELDS: [&str; 3] = ["n", "p", "k"];

/// Returns the set of valid dotted key paths for `AdvisorConfig`, excluding
/// the free-form crop names under `crop_targets`.
///
/// Maintained by hand to match the struct hierarchy in `advisor_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [server]
        "server",
        "server.addr",
        "server.cors_origins",
        "server.max_body_bytes",
        // [model]
        "model",
        "model.path",
        "model.default_label",
        // [storage]
        "storage",
        "storage.backend",
        "storage.data_dir",
        "storage.rest",
        "storage.rest.url",
        "storage.rest.api_key",
        "storage.rest.table",
        "storage.rest.timeout_secs",
        // [crop_targets]
        "crop_targets",
        // [dosage]
        "dosage",
        "dosage.urea",
        "dosage.urea.min_deficit",
        "dosage.urea.divisor",
        "dosage.urea.multiplier",
        "dosage.urea.cap",
        "dosage.urea.quantization",
        "dosage.tsp",
        "dosage.tsp.min_deficit",
        "dosage.tsp.divisor",
        "dosage.tsp.multiplier",
        "dosage.tsp.cap",
        "dosage.tsp.quantization",
        "dosage.mop",
        "dosage.mop.min_deficit",
        "dosage.mop.divisor",
        "dosage.mop.multiplier",
        "dosage.mop.cap",
        "dosage.mop.quantization",
    ];
    keys.iter().copied().collect()
}

/// Whether a dotted key falls inside the crop table and has a valid shape:
/// `crop_targets.<crop>` or `crop_targets.<crop>.{n,p,k}`.
fn is_crop_target_key(key: &str) -> Option<bool> {
    let rest = key.strip_prefix(CROP_TARGETS_SECTION)?.strip_prefix('.')?;
    let mut parts = rest.splitn(2, '.');
    let _crop = parts.next()?;
    Some(match parts.next() {
        None => true,
        Some(field) => CROP_TARGET_FIELDS.contains(&field),
    })
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so output is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        best = match best {
            Some((bk, bd)) if bd < dist || (bd == dist && bk < k) => Some((bk, bd)),
            _ => Some((k, dist)),
        };
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Crop names under `[crop_targets]` are free-form; only their leaf fields
/// are checked.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if known.contains(key.as_str()) {
            continue;
        }
        let suggestion = match is_crop_target_key(&key) {
            Some(true) => continue,
            Some(false) => {
                let (crop_path, field) = key.rsplit_once('.').unwrap_or((key.as_str(), ""));
                CROP_TARGET_FIELDS
                    .iter()
                    .find(|f| f.eq_ignore_ascii_case(field))
                    .map(|f| format!("{crop_path}.{f}"))
            }
            None => suggest_correction(&key, &known),
        };
        warnings.push(ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            field: key,
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Agronomic Range Validation
// ============================================================================

/// Largest plausible target level for any nutrient.
const MAX_PLAUSIBLE_TARGET: f64 = 1_000.0;

/// Largest plausible single application of any product (kg).
const MAX_PLAUSIBLE_CAP_KG: f64 = 1_000.0;

/// Validate agronomic ranges on a parsed config.
///
/// Returns (errors, warnings): errors are configurations the service
/// cannot advise with; warnings are suspicious but not fatal.
pub fn validate_agronomic_ranges(config: &AdvisorConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.crop_targets.is_empty() {
        errors.push("crop_targets is empty: no crop could ever receive fertilizer guidance".to_string());
    }

    for (crop, target) in config.crop_targets.iter() {
        for (name, value) in [("n", target.n), ("p", target.p), ("k", target.k)] {
            if value > MAX_PLAUSIBLE_TARGET {
                warnings.push(ValidationWarning {
                    field: format!("crop_targets.{crop}.{name}"),
                    message: format!(
                        "crop_targets.{crop}.{name} = {value:.1} is above the typical range (0-{MAX_PLAUSIBLE_TARGET:.0})"
                    ),
                    suggestion: None,
                });
            }
        }
    }

    for (name, curve) in [
        ("urea", &config.dosage.urea),
        ("tsp", &config.dosage.tsp),
        ("mop", &config.dosage.mop),
    ] {
        if curve.cap > MAX_PLAUSIBLE_CAP_KG {
            warnings.push(ValidationWarning {
                field: format!("dosage.{name}.cap"),
                message: format!(
                    "dosage.{name}.cap = {:.1} kg is above the typical range (0-{MAX_PLAUSIBLE_CAP_KG:.0} kg)",
                    curve.cap
                ),
                suggestion: None,
            });
        }
        if curve.cap == 0.0 || curve.multiplier == 0.0 {
            warnings.push(ValidationWarning {
                field: format!("dosage.{name}"),
                message: format!("dosage.{name} can never recommend a non-zero amount"),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
