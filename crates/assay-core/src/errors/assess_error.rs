//! Assessment errors. Only fatal conditions live here; degraded
//! conditions are reported as warnings on the assessment outcome.

use super::error_code::{self, AssayErrorCode};
use super::{CatalogueError, ConfigError, SourceError};

/// Fatal errors that abort an assessment before any report is produced.
#[derive(Debug, thiserror::Error)]
pub enum AssessError {
    #[error("Test package path is empty")]
    EmptyPackagePath,

    #[error("Test package not found: {path}")]
    PackageNotFound { path: String },

    #[error("Package {path} has no test files")]
    NoTestFiles { path: String },

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AssayErrorCode for AssessError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyPackagePath => error_code::INVALID_INPUT,
            Self::PackageNotFound { .. } | Self::NoTestFiles { .. } => {
                error_code::PACKAGE_NOT_FOUND
            }
            Self::Source(e) => e.error_code(),
            Self::Catalogue(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
        }
    }
}
