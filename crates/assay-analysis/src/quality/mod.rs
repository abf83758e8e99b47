//! Test-quality assessment: target inference, assertion detection,
//! assertion-to-effect mapping, and scoring.

pub mod assess;
pub mod detection;
pub mod inference;
pub mod mapping;
pub mod scoring;
pub mod types;
pub mod vocabulary;

pub use assess::assess;
pub use detection::Detector;
pub use inference::{Inference, InferredTarget, Inferrer};
pub use mapping::{Mapper, MappingOutcome};
pub use types::{
    AssertionKind, AssertionMapping, AssertionSite, Assessment, AssessmentDocument,
    ContractCoverage, OverSpecificationScore, PackageSummary, QualityReport, UnmappedReason,
};
pub use vocabulary::Vocabulary;
