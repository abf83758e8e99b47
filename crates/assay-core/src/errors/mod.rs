//! Error handling for Assay.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod assess_error;
pub mod catalogue_error;
pub mod config_error;
pub mod error_code;
pub mod source_error;

pub use assess_error::AssessError;
pub use catalogue_error::CatalogueError;
pub use config_error::ConfigError;
pub use error_code::AssayErrorCode;
pub use source_error::SourceError;
