//! Configuration system for Assay.
//! TOML-based, layered resolution: overrides > env > project > defaults.

pub mod assay_config;
pub mod assessment_config;
pub mod vocabulary_config;

pub use assay_config::{AssayConfig, ConfigOverrides};
pub use assessment_config::AssessmentConfig;
pub use vocabulary_config::VocabularyConfig;
