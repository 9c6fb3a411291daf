//! Advisor Configuration Module
//!
//! Crop targets, dose curves, server, model and storage settings loaded from
//! TOML, with environment overrides.
//!
//! ## Loading Order
//!
//! 1. `--config <PATH>` on the command line
//! 2. `CROP_ADVISOR_CONFIG` environment variable (path to TOML file)
//! 3. `crop_advisor.toml` in the current working directory
//! 4. Built-in defaults
//!
//! ## Usage
//!
//! The config is built once in `main()` and handed to the components that
//! need it. There is no global accessor:
//!
//! ```ignore
//! let mut config = AdvisorConfig::load(args.config.as_deref())?;
//! config.apply_env_overrides();
//! let engine = Arc::new(DosageEngine::from_config(&config));
//! ```

mod advisor_config;
mod crop_targets;
pub mod defaults;
pub mod validation;

pub use advisor_config::*;
pub use crop_targets::CropTargets;
