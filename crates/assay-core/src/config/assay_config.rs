//! Top-level Assay configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AssessmentConfig, VocabularyConfig};
use crate::errors::ConfigError;

/// Project config file name, looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "assay.toml";

/// Upper bound for both traversal depths.
const MAX_DEPTH_LIMIT: u32 = 16;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Programmatic overrides (applied via `apply_overrides`)
/// 2. Environment variables (`ASSAY_*`)
/// 3. Project config (`assay.toml` in project root)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssayConfig {
    pub assessment: AssessmentConfig,
    pub vocabulary: VocabularyConfig,
}

/// Overrides supplied by an embedding tool, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_target_depth: Option<u32>,
    pub max_helper_depth: Option<u32>,
    pub worst_coverage_limit: Option<usize>,
    pub parallel: Option<bool>,
    pub target_package: Option<String>,
}

impl AssayConfig {
    /// Load configuration with layered resolution.
    pub fn load(root: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(CONFIG_FILE_NAME);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(overrides) = overrides {
            Self::apply_overrides(&mut config, overrides);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &AssayConfig) -> Result<(), ConfigError> {
        let depths = [
            ("assessment.max_target_depth", config.assessment.max_target_depth),
            ("assessment.max_helper_depth", config.assessment.max_helper_depth),
        ];
        for (field, depth) in depths {
            if let Some(depth) = depth {
                if depth == 0 || depth > MAX_DEPTH_LIMIT {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: format!("must be between 1 and {MAX_DEPTH_LIMIT}"),
                    });
                }
            }
        }
        if config.assessment.worst_coverage_limit == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "assessment.worst_coverage_limit".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(ref target) = config.assessment.target_package {
            if target.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "assessment.target_package".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        if let Some(bad) = config
            .vocabulary
            .diff_functions
            .iter()
            .find(|f| !f.contains('.'))
        {
            return Err(ConfigError::ValidationFailed {
                field: "vocabulary.diff_functions".to_string(),
                message: format!("{bad} must be written as pkg.Func"),
            });
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut AssayConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: AssayConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    fn merge(base: &mut AssayConfig, other: &AssayConfig) {
        // Assessment
        if other.assessment.max_target_depth.is_some() {
            base.assessment.max_target_depth = other.assessment.max_target_depth;
        }
        if other.assessment.max_helper_depth.is_some() {
            base.assessment.max_helper_depth = other.assessment.max_helper_depth;
        }
        if other.assessment.worst_coverage_limit.is_some() {
            base.assessment.worst_coverage_limit = other.assessment.worst_coverage_limit;
        }
        if other.assessment.parallel.is_some() {
            base.assessment.parallel = other.assessment.parallel;
        }
        if other.assessment.target_package.is_some() {
            base.assessment.target_package = other.assessment.target_package.clone();
        }

        // Vocabulary
        let vocab = &other.vocabulary;
        if !vocab.assertion_aliases.is_empty() {
            base.vocabulary.assertion_aliases = vocab.assertion_aliases.clone();
        }
        if !vocab.equality_methods.is_empty() {
            base.vocabulary.equality_methods = vocab.equality_methods.clone();
        }
        if !vocab.error_methods.is_empty() {
            base.vocabulary.error_methods = vocab.error_methods.clone();
        }
        if !vocab.diff_functions.is_empty() {
            base.vocabulary.diff_functions = vocab.diff_functions.clone();
        }
        if !vocab.failure_methods.is_empty() {
            base.vocabulary.failure_methods = vocab.failure_methods.clone();
        }
        if !vocab.context_types.is_empty() {
            base.vocabulary.context_types = vocab.context_types.clone();
        }
        if !vocab.subtest_methods.is_empty() {
            base.vocabulary.subtest_methods = vocab.subtest_methods.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `ASSAY_MAX_TARGET_DEPTH`, `ASSAY_PARALLEL`, etc.
    fn apply_env_overrides(config: &mut AssayConfig) {
        if let Ok(val) = std::env::var("ASSAY_MAX_TARGET_DEPTH") {
            if let Ok(v) = val.parse::<u32>() {
                config.assessment.max_target_depth = Some(v);
            }
        }
        if let Ok(val) = std::env::var("ASSAY_MAX_HELPER_DEPTH") {
            if let Ok(v) = val.parse::<u32>() {
                config.assessment.max_helper_depth = Some(v);
            }
        }
        if let Ok(val) = std::env::var("ASSAY_WORST_COVERAGE_LIMIT") {
            if let Ok(v) = val.parse::<usize>() {
                config.assessment.worst_coverage_limit = Some(v);
            }
        }
        if let Ok(val) = std::env::var("ASSAY_PARALLEL") {
            if let Ok(v) = val.parse::<bool>() {
                config.assessment.parallel = Some(v);
            }
        }
    }

    /// Apply programmatic overrides (highest priority).
    fn apply_overrides(config: &mut AssayConfig, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.max_target_depth {
            config.assessment.max_target_depth = Some(v);
        }
        if let Some(v) = overrides.max_helper_depth {
            config.assessment.max_helper_depth = Some(v);
        }
        if let Some(v) = overrides.worst_coverage_limit {
            config.assessment.worst_coverage_limit = Some(v);
        }
        if let Some(v) = overrides.parallel {
            config.assessment.parallel = Some(v);
        }
        if let Some(ref v) = overrides.target_package {
            config.assessment.target_package = Some(v.clone());
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}
