//! Stable error codes shared by every subsystem error.

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const SOURCE_ERROR: &str = "SOURCE_ERROR";
pub const SOURCE_PARSE_ERROR: &str = "SOURCE_PARSE_ERROR";
pub const CATALOGUE_ERROR: &str = "CATALOGUE_ERROR";
pub const PACKAGE_NOT_FOUND: &str = "PACKAGE_NOT_FOUND";
pub const INVALID_INPUT: &str = "INVALID_INPUT";

/// Maps an error to a stable, machine-readable code.
pub trait AssayErrorCode {
    fn error_code(&self) -> &'static str;
}
