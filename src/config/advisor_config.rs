//! Advisor Configuration - targets, dose curves, server, model and storage
//!
//! Every tunable that the engine and service use is a field here. Each
//! struct implements `Default` with the built-in values, so the service runs
//! unchanged when no config file is present.

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::crop_targets::{self, CropTargets};
use super::defaults;
use super::validation::{self, ValidationWarning};
use crate::dosage::{DosageCurve, DosageCurves};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "CROP_ADVISOR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "crop_advisor.toml";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration, built once at start-up and passed down by `Arc`.
///
/// Load with `AdvisorConfig::load()` which searches:
/// 1. an explicit path (CLI `--config`)
/// 2. `$CROP_ADVISOR_CONFIG`
/// 3. `./crop_advisor.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Ideal NPK per crop. Sections in the file are laid over the built-ins:
    /// new identifiers are added, existing ones are replaced.
    #[serde(default, deserialize_with = "crop_targets::overlay_on_builtin")]
    pub crop_targets: CropTargets,

    #[serde(default)]
    pub dosage: DosageCurves,
}

impl AdvisorConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that exists but fails to parse is an error; only a missing
    /// file falls through to the next source. Values are not range-checked
    /// here: call [`validate`](Self::validate) once overrides are applied.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), crops = config.crop_targets.len(), "Loaded advisor config");
            return Ok(config);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                let config = Self::load_from_file(&p)?;
                info!(path = %p.display(), crops = config.crop_targets.len(), "Loaded advisor config from {CONFIG_ENV_VAR}");
                return Ok(config);
            }
            warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!(crops = config.crop_targets.len(), "Loaded advisor config from ./{LOCAL_CONFIG_FILE}");
            return Ok(config);
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path without validating it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::parse_toml(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Two passes: unknown keys are reported as warnings first, then the
    /// document is deserialized and checked.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_toml(contents)?;
        for w in config.validate()? {
            warn!("{}", w);
        }
        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<Self, ConfigError> {
        for w in validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))
    }

    /// Apply environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (env in production,
    /// a map in tests).
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(*k)).filter(|v| !v.is_empty());

        if let Some(addr) = first(&["CROP_ADVISOR_SERVER_ADDR"]) {
            self.server.addr = addr;
        }
        if let Some(origins) = first(&["CROP_ADVISOR_CORS_ORIGINS"]) {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(path) = first(&["CROP_ADVISOR_MODEL_PATH"]) {
            self.model.path = Some(PathBuf::from(path));
        }
        if let Some(url) = first(&["SUPABASE_URL", "REACT_APP_SUPABASE_URL"]) {
            self.storage.rest.url = Some(url);
        }
        if let Some(key) = first(&["SUPABASE_ANON_KEY", "REACT_APP_SUPABASE_ANON_KEY"]) {
            self.storage.rest.api_key = Some(key);
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the config for internal consistency.
    ///
    /// Rules:
    /// - Crop identifiers must be non-empty
    /// - Targets must be finite and non-negative
    /// - Curve divisors must be finite and > 0
    /// - Curve multipliers, caps and thresholds must be finite and >= 0
    /// - Server body limit must be > 0
    /// - CORS origins other than `"*"` must be valid header values
    ///
    /// Agronomic range warnings are returned rather than logged, so the
    /// caller decides how to surface them.
    pub fn validate(&self) -> Result<Vec<ValidationWarning>, ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        for (crop, target) in self.crop_targets.iter() {
            if crop.trim().is_empty() {
                errors.push("crop_targets: crop identifier must not be empty".to_string());
            }
            for (name, value) in [("n", target.n), ("p", target.p), ("k", target.k)] {
                if !value.is_finite() || value < 0.0 {
                    errors.push(format!(
                        "crop_targets.{crop}.{name} = {value} must be a finite, non-negative number"
                    ));
                }
            }
        }

        Self::check_curve(&self.dosage.urea, "dosage.urea", &mut errors);
        Self::check_curve(&self.dosage.tsp, "dosage.tsp", &mut errors);
        Self::check_curve(&self.dosage.mop, "dosage.mop", &mut errors);

        if self.server.max_body_bytes == 0 {
            errors.push("server.max_body_bytes must be > 0".to_string());
        }
        for origin in self.server.rejected_origins() {
            errors.push(format!(
                "server.cors_origins: {origin:?} is not a valid Origin header value"
            ));
        }

        let (range_errors, range_warnings) = validation::validate_agronomic_ranges(self);
        errors.extend(range_errors);

        if errors.is_empty() {
            Ok(range_warnings)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_curve(curve: &DosageCurve, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass, so check finiteness explicitly
        if !curve.divisor.is_finite() || curve.divisor <= 0.0 {
            errors.push(format!(
                "{name}.divisor = {} must be finite and > 0 (used as divisor)",
                curve.divisor
            ));
        }
        for (field, value) in [
            ("multiplier", curve.multiplier),
            ("cap", curve.cap),
            ("min_deficit", curve.min_deficit),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name}.{field} = {value} must be finite and >= 0"));
            }
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `CROP_ADVISOR_SERVER_ADDR` or `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Allowed CORS origins. `"*"` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_server_addr() -> String {
    defaults::DEFAULT_SERVER_ADDR.to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

const fn default_max_body_bytes() -> usize {
    defaults::MAX_REQUEST_BODY_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    /// Listed origins that cannot be sent back as an `Access-Control-Allow-Origin` value.
    pub fn rejected_origins(&self) -> impl Iterator<Item = &str> {
        self.cors_origins
            .iter()
            .map(String::as_str)
            .filter(|o| *o != "*" && o.trim().parse::<HeaderValue>().is_err())
    }
}

// ============================================================================
// Classifier model
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to a JSON k-NN model artifact. When unset, the service
    /// classifies by nearest crop target.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Label used when the model has nothing to vote with.
    #[serde(default = "default_label")]
    pub default_label: String,
}

fn default_label() -> String {
    defaults::DEFAULT_CROP_LABEL.to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            default_label: default_label(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Which sensor store backs the readings endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Embedded sled database under `data_dir`.
    #[default]
    Sled,
    /// Process memory only; lost on restart.
    Memory,
    /// Remote PostgREST endpoint (e.g. Supabase).
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub rest: RestStoreConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_DATA_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
            rest: RestStoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestStoreConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: Option<String>,

    /// Key sent as `apikey` and bearer token. Usually supplied via env.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    defaults::DEFAULT_SENSOR_TABLE.to_string()
}

const fn default_timeout_secs() -> u64 {
    defaults::REST_STORE_TIMEOUT_SECS
}

impl Default for RestStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_validates() {
        let config = AdvisorConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config = AdvisorConfig::from_toml_str("").expect("empty TOML should parse");
        assert_eq!(config.server.addr, "0.0.0.0:5000");
        assert_eq!(config.crop_targets, CropTargets::builtin());
        assert_eq!(config.dosage, DosageCurves::default());
        assert_eq!(config.storage.backend, StoreBackend::Sled);
    }

    #[test]
    fn test_crop_table_extends_builtins() {
        let config = AdvisorConfig::from_toml_str(
            r#"
[crop_targets.wheat]
n = 120
p = 40
k = 60
"#,
        )
        .unwrap();
        assert_eq!(config.crop_targets.crop_ids(), vec!["maize", "rice", "wheat"]);
        assert_eq!(config.crop_targets.get("maize"), CropTargets::builtin().get("maize"));
    }

    #[test]
    fn test_crop_section_overrides_builtin() {
        let config = AdvisorConfig::from_toml_str(
            r#"
[crop_targets.rice]
n = 160
p = 80.5
k = 170
"#,
        )
        .unwrap();
        assert_eq!(config.crop_targets.len(), 2);
        let rice = config.crop_targets.get("rice").unwrap();
        assert_eq!((rice.n, rice.p, rice.k), (160.0, 80.5, 170.0));
        assert_eq!(config.crop_targets.get("maize"), CropTargets::builtin().get("maize"));
    }

    #[test]
    fn test_validate_returns_range_warnings_once() {
        let mut config = AdvisorConfig::default();
        config.dosage.mop.cap = 5000.0;
        let warnings = config.validate().expect("an implausible cap is only a warning");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "dosage.mop.cap");
    }

    #[test]
    fn test_load_from_file_defers_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("advisor.toml");
        std::fs::write(&path, "[server]\nmax_body_bytes = 0\n").unwrap();

        let config = AdvisorConfig::load_from_file(&path).expect("parses without validating");
        assert_eq!(config.server.max_body_bytes, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_unusable_cors_origin() {
        let mut config = AdvisorConfig::default();
        config.server.cors_origins = vec![
            "http://farm.local".to_string(),
            "http://bad\norigin".to_string(),
        ];
        assert_eq!(config.server.rejected_origins().count(), 1);
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 1, "{errors:?}");
                assert!(errors[0].contains("server.cors_origins"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_wildcard_origin_is_accepted() {
        let config = AdvisorConfig::default();
        assert_eq!(config.server.rejected_origins().count(), 0);
    }

    #[test]
    fn test_partial_dosage_override() {
        let config = AdvisorConfig::from_toml_str(
            r#"
[dosage.mop]
min_deficit = 5
divisor = 5
multiplier = 3
cap = 45
quantization = "whole_buckets"
"#,
        )
        .unwrap();
        assert_eq!(config.dosage.mop.cap, 45.0);
        assert_eq!(config.dosage.urea, DosageCurve::UREA);
    }

    #[test]
    fn test_validation_catches_zero_divisor() {
        let mut config = AdvisorConfig::default();
        config.dosage.tsp.divisor = 0.0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("dosage.tsp.divisor")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_catches_negative_target() {
        let result = AdvisorConfig::from_toml_str(
            r#"
[crop_targets.maize]
n = -1
p = 70
k = 180
"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = AdvisorConfig::from_toml_str("[server\naddr = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_, _))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CROP_ADVISOR_SERVER_ADDR", "127.0.0.1:9000"),
            ("CROP_ADVISOR_CORS_ORIGINS", "http://a.test, http://b.test"),
            ("REACT_APP_SUPABASE_URL", "https://legacy.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]);
        let mut config = AdvisorConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(!config.server.allows_any_origin());
        assert_eq!(config.storage.rest.url.as_deref(), Some("https://legacy.supabase.co"));
        assert_eq!(config.storage.rest.api_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_new_env_name_wins_over_legacy() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SUPABASE_URL", "https://new.supabase.co"),
            ("REACT_APP_SUPABASE_URL", "https://legacy.supabase.co"),
        ]);
        let mut config = AdvisorConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.storage.rest.url.as_deref(), Some("https://new.supabase.co"));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = AdvisorConfig::default();
        config.storage.rest.api_key = Some("secret".to_string());
        let s = config.to_toml().unwrap();
        assert!(!s.contains("secret"));
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = AdvisorConfig::default();
        let s = original.to_toml().expect("serialization should work");
        let back = AdvisorConfig::from_toml_str(&s).expect("deserialization should work");
        assert_eq!(back.crop_targets, original.crop_targets);
        assert_eq!(back.dosage, original.dosage);
        assert_eq!(back.server.addr, original.server.addr);
    }
}
