//! Contract coverage, over-specification, and package aggregation.

use assay_core::types::collections::FxHashSet;

use super::types::{
    AssertionKind, AssertionMapping, ContractCoverage, GapHint, IncidentalAssertion,
    OverSpecificationScore, PackageSummary, QualityReport, WorstCoverage,
};
use crate::effects::{EffectKind, SideEffect, Tier};

/// Share of contractual effects asserted on.
///
/// Only contractual effects count. Discarded effects stay in the
/// denominator but are not reported as gaps.
pub fn contract_coverage(
    effects: &[SideEffect],
    mappings: &[AssertionMapping],
    discarded: &[&str],
) -> ContractCoverage {
    let asserted: FxHashSet<&str> = mappings
        .iter()
        .filter_map(|m| m.side_effect_id.as_deref())
        .collect();

    let contractual: Vec<&SideEffect> = effects.iter().filter(|e| e.is_contractual()).collect();
    let covered_count = contractual
        .iter()
        .filter(|e| asserted.contains(e.id.as_str()))
        .count();
    let gaps: Vec<SideEffect> = contractual
        .iter()
        .filter(|e| !asserted.contains(e.id.as_str()) && !discarded.contains(&e.id.as_str()))
        .map(|e| (*e).clone())
        .collect();
    let gap_hints = gaps
        .iter()
        .map(|gap| GapHint {
            side_effect_id: gap.id.clone(),
            effect_type: gap.kind,
            hint: gap_hint(gap.kind).to_string(),
        })
        .collect();

    let total_contractual = contractual.len();
    let percentage = if total_contractual == 0 {
        0.0
    } else {
        covered_count as f64 / total_contractual as f64 * 100.0
    };

    ContractCoverage {
        percentage,
        covered_count,
        total_contractual,
        gaps,
        gap_hints,
    }
}

/// Assertions pinned to incidental effects, over all mappings of the pair.
pub fn over_specification(effects: &[SideEffect], mappings: &[AssertionMapping]) -> OverSpecificationScore {
    let mut incidental_assertions = Vec::new();
    let mut suggestions: Vec<(Tier, String)> = Vec::new();

    for mapping in mappings {
        let Some(id) = mapping.side_effect_id.as_deref() else {
            continue;
        };
        let Some(effect) = effects.iter().find(|e| e.id == id) else {
            continue;
        };
        if !effect.is_incidental() {
            continue;
        }
        let suggestion = over_specification_suggestion(effect.kind).to_string();
        if !suggestions.iter().any(|(_, s)| *s == suggestion) {
            suggestions.push((effect.kind.tier(), suggestion.clone()));
        }
        incidental_assertions.push(IncidentalAssertion {
            assertion_location: mapping.assertion_location.clone(),
            side_effect_id: effect.id.clone(),
            effect_type: effect.kind,
            suggestion,
        });
    }

    // Most important categories first; first-seen order within a tier.
    suggestions.sort_by_key(|(tier, _)| *tier);

    let count = incidental_assertions.len();
    let ratio = if mappings.is_empty() {
        0.0
    } else {
        count as f64 / mappings.len() as f64
    };
    OverSpecificationScore {
        count,
        ratio,
        incidental_assertions,
        suggestions: suggestions.into_iter().map(|(_, s)| s).collect(),
    }
}

/// Recognized sites over all sites, as a percentage.
pub fn detection_confidence(kinds: &[AssertionKind]) -> f64 {
    if kinds.is_empty() {
        return 0.0;
    }
    let recognized = kinds.iter().filter(|k| k.is_recognized()).count();
    recognized as f64 / kinds.len() as f64 * 100.0
}

/// Package-level means and the lowest-coverage pairs.
pub fn summarize(reports: &[QualityReport], worst_limit: usize) -> PackageSummary {
    if reports.is_empty() {
        return PackageSummary::default();
    }
    let n = reports.len() as f64;
    let tests: FxHashSet<&str> = reports.iter().map(|r| r.test_function.as_str()).collect();

    let mut worst: Vec<WorstCoverage> = reports
        .iter()
        .map(|r| WorstCoverage {
            test_function: r.test_function.clone(),
            target_function: r.target_function.clone(),
            coverage: r.contract_coverage.percentage,
        })
        .collect();
    worst.sort_by(|a, b| {
        a.coverage
            .total_cmp(&b.coverage)
            .then_with(|| a.test_function.cmp(&b.test_function))
            .then_with(|| a.target_function.cmp(&b.target_function))
    });
    worst.truncate(worst_limit);

    PackageSummary {
        total_tests: tests.len(),
        average_contract_coverage: reports.iter().map(|r| r.contract_coverage.percentage).sum::<f64>() / n,
        total_over_specifications: reports.iter().map(|r| r.over_specification.count).sum(),
        average_over_specification_ratio: reports.iter().map(|r| r.over_specification.ratio).sum::<f64>() / n,
        worst_coverage_tests: worst,
        assertion_detection_confidence: reports
            .iter()
            .map(|r| r.assertion_detection_confidence)
            .sum::<f64>()
            / n,
    }
}

fn gap_hint(kind: EffectKind) -> &'static str {
    match kind {
        EffectKind::ReturnValue => "assign the return value and compare it against the expected result",
        EffectKind::ErrorReturn => "check the returned error, e.g. `if err != nil` or assert.NoError",
        EffectKind::SentinelError => "match the sentinel with errors.Is",
        EffectKind::ReceiverMutation => "inspect the receiver's state after the call",
        EffectKind::PointerArgMutation => "inspect the value behind the pointer argument after the call",
        EffectKind::SliceMutation => "compare the slice contents after the call",
        EffectKind::MapMutation => "check the map entries after the call",
        EffectKind::GlobalMutation => "check the package-level variable after the call",
        EffectKind::ChannelSend => "receive from the channel and check the value",
        EffectKind::ChannelClose => "check that receiving reports the channel closed",
        EffectKind::WriterOutput => "pass a bytes.Buffer and check what was written",
        EffectKind::HttpResponseWrite => "use httptest.ResponseRecorder and check status and body",
        EffectKind::FileSystemWrite => "write into t.TempDir() and read the file back",
        EffectKind::DatabaseWrite => "query the test database after the call",
        EffectKind::GoroutineSpawn => "wait for the goroutine's result before asserting",
        EffectKind::Panic => "recover the panic and check its value",
        EffectKind::CallbackInvocation => "pass a recording callback and check its calls",
        EffectKind::ContextCancellation => "check ctx.Err() after the call",
        EffectKind::LogWrite => "capture the logger output and check the entry",
        EffectKind::MetricEmission => "read the metric from a test registry",
        EffectKind::TimeDependency => "inject a fake clock and check time-dependent results",
        EffectKind::Other => "add an assertion on this effect",
    }
}

fn over_specification_suggestion(kind: EffectKind) -> &'static str {
    match kind {
        EffectKind::LogWrite => "avoid asserting exact log output; it is not part of the contract",
        EffectKind::MetricEmission => "drop assertions on metric values unless they are documented",
        EffectKind::TimeDependency => "assert on relative time or use a fake clock instead of exact timestamps",
        EffectKind::GoroutineSpawn => "assert on results, not on how many goroutines were started",
        EffectKind::ReturnValue | EffectKind::ErrorReturn | EffectKind::SentinelError => {
            "assert on the documented part of the result, not on incidental details"
        }
        EffectKind::ReceiverMutation
        | EffectKind::PointerArgMutation
        | EffectKind::SliceMutation
        | EffectKind::MapMutation
        | EffectKind::GlobalMutation => "assert on observable state, not on internal bookkeeping",
        _ => "remove or relax assertions on incidental effects",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_hint() {
        for kind in [EffectKind::ReturnValue, EffectKind::Panic, EffectKind::Other] {
            assert!(!gap_hint(kind).is_empty());
            assert!(!over_specification_suggestion(kind).is_empty());
        }
    }

    #[test]
    fn test_detection_confidence_counts_recognized() {
        let kinds = [
            AssertionKind::RawComparison,
            AssertionKind::Unrecognized,
            AssertionKind::FluentEquality,
            AssertionKind::StructuralDiff,
        ];
        assert_eq!(detection_confidence(&kinds), 75.0);
        assert_eq!(detection_confidence(&[]), 0.0);
    }
}
