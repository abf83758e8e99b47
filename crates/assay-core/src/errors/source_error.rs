//! Source loading errors raised by the front-end.

use super::error_code::{self, AssayErrorCode};

/// Errors that can occur while loading and parsing package sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {file}: {message}")]
    ParseFailed { file: String, message: String },

    #[error("No Go source files found in {path}")]
    NoGoFiles { path: String },

    #[error("Conflicting package clauses in {path}: {first} vs {second}")]
    ConflictingPackages {
        path: String,
        first: String,
        second: String,
    },
}

impl AssayErrorCode for SourceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ParseFailed { .. } => error_code::SOURCE_PARSE_ERROR,
            _ => error_code::SOURCE_ERROR,
        }
    }
}
