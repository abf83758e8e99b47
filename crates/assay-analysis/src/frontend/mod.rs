//! Go front-end: builds a `Program` from package sources with tree-sitter-go.

mod loader;
mod lower_dataflow;
mod lower_syntax;
mod resolve;

pub use loader::{load_package_dir, load_sources, ProgramBuilder};
