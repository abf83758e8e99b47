//! assay-analysis: the contract-aware test-quality engine.
//!
//! - `model`: positions, syntax trees, identity tables, and dataflow
//! - `frontend`: builds a `Program` from Go package sources
//! - `effects`: the classified effect catalogue
//! - `quality`: inference, detection, mapping, and scoring

pub mod effects;
pub mod frontend;
pub mod model;
pub mod quality;

pub use effects::{EffectCatalogue, EffectKind, SideEffect};
pub use frontend::{load_package_dir, load_sources, ProgramBuilder};
pub use model::Program;
pub use quality::{assess, Assessment, QualityReport};
