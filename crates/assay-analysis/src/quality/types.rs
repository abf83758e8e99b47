//! Types for the quality engine: assertion sites, mappings, and the
//! per-pair and per-package reports.

use serde::{Deserialize, Serialize};

use crate::effects::{EffectKind, SideEffect};
use crate::model::dataflow::FunctionId;
use crate::model::position::{Location, Pos};
use crate::model::syntax::Expr;

/// Confidence of a mapping made through a traced identifier.
pub const DIRECT_CONFIDENCE: u8 = 75;
/// Confidence of a mapping made through a field, index, or size query.
pub const COMPOSITE_CONFIDENCE: u8 = 65;

/// Idiom an assertion is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    RawComparison,
    RawNilCheck,
    FluentEquality,
    FluentError,
    StructuralDiff,
    Unrecognized,
}

impl AssertionKind {
    pub fn is_recognized(self) -> bool {
        self != Self::Unrecognized
    }
}

/// One detected assertion.
#[derive(Debug, Clone)]
pub struct AssertionSite<'p> {
    pub pos: Pos,
    pub location: Location,
    pub kind: AssertionKind,
    /// Function whose body holds the assertion: the test itself, or a helper.
    pub enclosing: FunctionId,
    /// 0 in the test body and its sub-tests; helper nesting otherwise.
    pub depth: u32,
    pub expr: &'p Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedReason {
    /// Asserted inside a helper on a value passed in as a parameter.
    HelperParameter,
    /// The target's result is used without being assigned.
    InlineCall,
    NoEffectMatch,
}

/// The link (or missing link) between one assertion and one effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionMapping {
    pub assertion_location: String,
    pub kind: AssertionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effect_id: Option<String>,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmapped_reason: Option<UnmappedReason>,
}

impl AssertionMapping {
    pub fn mapped(site: &AssertionSite<'_>, effect_id: &str, confidence: u8) -> Self {
        Self {
            assertion_location: site.location.to_string(),
            kind: site.kind,
            side_effect_id: Some(effect_id.to_string()),
            confidence,
            unmapped_reason: None,
        }
    }

    pub fn unmapped(site: &AssertionSite<'_>, reason: UnmappedReason) -> Self {
        Self {
            assertion_location: site.location.to_string(),
            kind: site.kind,
            side_effect_id: None,
            confidence: 0,
            unmapped_reason: Some(reason),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.side_effect_id.is_some()
    }
}

/// Remediation hint for one uncovered contractual effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapHint {
    pub side_effect_id: String,
    pub effect_type: EffectKind,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContractCoverage {
    pub percentage: f64,
    pub covered_count: usize,
    pub total_contractual: usize,
    pub gaps: Vec<SideEffect>,
    pub gap_hints: Vec<GapHint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentalAssertion {
    pub assertion_location: String,
    pub side_effect_id: String,
    pub effect_type: EffectKind,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverSpecificationScore {
    pub count: usize,
    pub ratio: f64,
    pub incidental_assertions: Vec<IncidentalAssertion>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

/// Assessment of one test against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub test_function: String,
    pub test_location: String,
    pub target_function: String,
    pub contract_coverage: ContractCoverage,
    pub over_specification: OverSpecificationScore,
    pub ambiguous_effects: Vec<SideEffect>,
    pub mapped_assertions: Vec<AssertionMapping>,
    pub unmapped_assertions: Vec<AssertionMapping>,
    pub discarded_returns: Vec<SideEffect>,
    pub assertion_detection_confidence: f64,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstCoverage {
    pub test_function: String,
    pub target_function: String,
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PackageSummary {
    pub total_tests: usize,
    pub average_contract_coverage: f64,
    pub total_over_specifications: usize,
    pub average_over_specification_ratio: f64,
    pub worst_coverage_tests: Vec<WorstCoverage>,
    pub assertion_detection_confidence: f64,
}

/// The serialized report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentDocument {
    pub quality_reports: Vec<QualityReport>,
    pub quality_summary: PackageSummary,
}

/// Outcome of assessing one test package.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assessment {
    /// Sorted by test name, then target name.
    pub reports: Vec<QualityReport>,
    pub summary: PackageSummary,
    /// Degraded-continue conditions, in test order.
    pub warnings: Vec<String>,
}

impl Assessment {
    pub fn document(&self) -> AssessmentDocument {
        AssessmentDocument {
            quality_reports: self.reports.clone(),
            quality_summary: self.summary.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document())
    }

    /// Reports with timing zeroed, for run-to-run comparison.
    pub fn without_timing(&self) -> Self {
        let mut copy = self.clone();
        for report in &mut copy.reports {
            report.metadata.duration_ms = 0;
        }
        copy
    }
}
