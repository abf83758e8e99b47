//! Effect catalogue errors.

use super::error_code::{self, AssayErrorCode};

/// Errors that can occur while loading the classified effect catalogue.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid effect catalogue JSON: {0}")]
    InvalidJson(String),

    #[error("Duplicate effect id {id} in {function}")]
    DuplicateEffectId { id: String, function: String },
}

impl AssayErrorCode for CatalogueError {
    fn error_code(&self) -> &'static str {
        error_code::CATALOGUE_ERROR
    }
}
