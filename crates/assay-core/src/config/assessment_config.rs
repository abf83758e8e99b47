//! Assessment configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the assessment orchestrator and its traversals.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Call depth the target inferrer follows through helpers. Default: 3.
    pub max_target_depth: Option<u32>,
    /// Helper depth the assertion detector recurses into. Default: 3.
    pub max_helper_depth: Option<u32>,
    /// Length of the worst-coverage list in the package summary. Default: 5.
    pub worst_coverage_limit: Option<usize>,
    /// Assess test functions on the rayon pool. Default: false.
    pub parallel: Option<bool>,
    /// Package under test, when it differs from the test package.
    pub target_package: Option<String>,
}

impl AssessmentConfig {
    /// Returns the effective inferrer depth, defaulting to 3.
    pub fn effective_max_target_depth(&self) -> u32 {
        self.max_target_depth.unwrap_or(3)
    }

    /// Returns the effective helper depth, defaulting to 3.
    pub fn effective_max_helper_depth(&self) -> u32 {
        self.max_helper_depth.unwrap_or(3)
    }

    /// Returns the effective worst-coverage list length, defaulting to 5.
    pub fn effective_worst_coverage_limit(&self) -> usize {
        self.worst_coverage_limit.unwrap_or(5)
    }

    pub fn effective_parallel(&self) -> bool {
        self.parallel.unwrap_or(false)
    }
}
