//! assay-core: errors, configuration, tracing setup, and shared collections
//! for the Assay contract-aware test-quality engine.

pub mod config;
pub mod errors;
pub mod tracing_setup;
pub mod types;

pub use config::AssayConfig;
pub use errors::{AssayErrorCode, AssessError, CatalogueError, ConfigError, SourceError};
