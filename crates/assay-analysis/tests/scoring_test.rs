//! Scoring tests: contract coverage, over-specification, and the package
//! summary, with property tests over generated effect sets.

use proptest::prelude::*;

use assay_analysis::effects::{Classification, ClassificationLabel, EffectKind, SideEffect};
use assay_analysis::quality::scoring::{contract_coverage, over_specification, summarize};
use assay_analysis::quality::types::{
    AssertionKind, AssertionMapping, ContractCoverage, OverSpecificationScore, QualityReport,
    ReportMetadata,
};

fn effect(id: &str, kind: EffectKind, label: Option<ClassificationLabel>) -> SideEffect {
    SideEffect {
        id: id.to_string(),
        kind,
        location: String::new(),
        description: String::new(),
        target: None,
        classification: label.map(|label| Classification {
            label,
            confidence: 80,
            reasoning: String::new(),
        }),
    }
}

fn mapping(location: &str, id: Option<&str>) -> AssertionMapping {
    AssertionMapping {
        assertion_location: location.to_string(),
        kind: AssertionKind::RawComparison,
        side_effect_id: id.map(str::to_string),
        confidence: if id.is_some() { 75 } else { 0 },
        unmapped_reason: None,
    }
}

fn report(test: &str, target: &str, coverage: f64, over_count: usize, ratio: f64) -> QualityReport {
    QualityReport {
        test_function: test.to_string(),
        test_location: format!("{test}.go:1:1"),
        target_function: target.to_string(),
        contract_coverage: ContractCoverage {
            percentage: coverage,
            ..ContractCoverage::default()
        },
        over_specification: OverSpecificationScore {
            count: over_count,
            ratio,
            ..OverSpecificationScore::default()
        },
        ambiguous_effects: Vec::new(),
        mapped_assertions: Vec::new(),
        unmapped_assertions: Vec::new(),
        discarded_returns: Vec::new(),
        assertion_detection_confidence: 100.0,
        metadata: ReportMetadata::default(),
    }
}

use ClassificationLabel::{Ambiguous, Contractual, Incidental};

#[test]
fn test_coverage_counts_only_contractual() {
    let effects = vec![
        effect("ret", EffectKind::ReturnValue, Some(Contractual)),
        effect("err", EffectKind::ErrorReturn, Some(Contractual)),
        effect("log", EffectKind::LogWrite, Some(Incidental)),
        effect("panic", EffectKind::Panic, Some(Ambiguous)),
    ];
    let mappings = vec![mapping("a:1:1", Some("ret")), mapping("a:2:1", Some("log"))];

    let coverage = contract_coverage(&effects, &mappings, &[]);
    assert_eq!(coverage.percentage, 50.0);
    assert_eq!(coverage.covered_count, 1);
    assert_eq!(coverage.total_contractual, 2);
    assert_eq!(coverage.gaps.len(), 1);
    assert_eq!(coverage.gaps[0].id, "err");
    assert_eq!(coverage.gap_hints[0].side_effect_id, "err");
    assert_eq!(coverage.gap_hints[0].effect_type, EffectKind::ErrorReturn);
    assert!(coverage.gap_hints[0].hint.contains("err"));
}

#[test]
fn test_discarded_effects_are_not_gaps() {
    let effects = vec![
        effect("ret", EffectKind::ReturnValue, Some(Contractual)),
        effect("err", EffectKind::ErrorReturn, Some(Contractual)),
    ];
    let mappings = vec![mapping("a:1:1", Some("ret"))];
    let coverage = contract_coverage(&effects, &mappings, &["err"]);
    assert_eq!(coverage.percentage, 50.0);
    assert!(coverage.gaps.is_empty());
    assert!(coverage.gap_hints.is_empty());
}

#[test]
fn test_no_contractual_effects_scores_zero() {
    let effects = vec![effect("log", EffectKind::LogWrite, Some(Incidental))];
    let coverage = contract_coverage(&effects, &[mapping("a:1:1", Some("log"))], &[]);
    assert_eq!(coverage.percentage, 0.0);
    assert_eq!(coverage.total_contractual, 0);

    let coverage = contract_coverage(&[], &[], &[]);
    assert_eq!(coverage.percentage, 0.0);
}

#[test]
fn test_repeated_assertions_count_once() {
    let effects = vec![effect("ret", EffectKind::ReturnValue, Some(Contractual))];
    let mappings = vec![mapping("a:1:1", Some("ret")), mapping("a:2:1", Some("ret"))];
    let coverage = contract_coverage(&effects, &mappings, &[]);
    assert_eq!(coverage.covered_count, 1);
    assert_eq!(coverage.percentage, 100.0);
}

#[test]
fn test_over_specification() {
    let effects = vec![
        effect("ret", EffectKind::ReturnValue, Some(Contractual)),
        effect("log", EffectKind::LogWrite, Some(Incidental)),
        effect("spawn", EffectKind::GoroutineSpawn, Some(Incidental)),
    ];
    let mappings = vec![
        mapping("a:1:1", Some("log")),
        mapping("a:2:1", Some("ret")),
        mapping("a:3:1", Some("log")),
        mapping("a:4:1", None),
        mapping("a:5:1", Some("spawn")),
    ];
    let score = over_specification(&effects, &mappings);
    assert_eq!(score.count, 3);
    assert_eq!(score.ratio, 3.0 / 5.0);
    assert_eq!(score.incidental_assertions[0].assertion_location, "a:1:1");
    assert_eq!(score.incidental_assertions[2].effect_type, EffectKind::GoroutineSpawn);
    // One suggestion per category; goroutines rank above logging.
    assert_eq!(score.suggestions.len(), 2);
    assert!(score.suggestions[0].contains("goroutines"));
    assert!(score.suggestions[1].contains("log"));
}

#[test]
fn test_over_specification_without_mappings() {
    let effects = vec![effect("log", EffectKind::LogWrite, Some(Incidental))];
    let score = over_specification(&effects, &[]);
    assert_eq!(score.count, 0);
    assert_eq!(score.ratio, 0.0);
    assert!(score.suggestions.is_empty());
}

#[test]
fn test_summary_means_and_worst_list() {
    let reports = vec![
        report("TestA", "p.A", 100.0, 0, 0.0),
        report("TestB", "p.B", 0.0, 2, 1.0),
        report("TestC", "p.C1", 50.0, 0, 0.0),
        report("TestC", "p.C2", 0.0, 1, 0.5),
    ];
    let summary = summarize(&reports, 2);
    assert_eq!(summary.total_tests, 3);
    assert_eq!(summary.average_contract_coverage, 37.5);
    assert_eq!(summary.total_over_specifications, 3);
    assert_eq!(summary.average_over_specification_ratio, 0.375);
    assert_eq!(summary.assertion_detection_confidence, 100.0);

    let worst: Vec<(&str, &str)> = summary
        .worst_coverage_tests
        .iter()
        .map(|w| (w.test_function.as_str(), w.target_function.as_str()))
        .collect();
    assert_eq!(worst, vec![("TestB", "p.B"), ("TestC", "p.C2")]);
}

#[test]
fn test_empty_summary() {
    let summary = summarize(&[], 5);
    assert_eq!(summary.total_tests, 0);
    assert_eq!(summary.average_contract_coverage, 0.0);
    assert!(summary.worst_coverage_tests.is_empty());
}

fn label_strategy() -> impl Strategy<Value = Option<ClassificationLabel>> {
    prop_oneof![
        Just(Some(Contractual)),
        Just(Some(Incidental)),
        Just(Some(Ambiguous)),
        Just(None),
    ]
}

proptest! {
    #[test]
    fn prop_coverage_bounds(
        labels in prop::collection::vec(label_strategy(), 0..12),
        asserted in prop::collection::vec(any::<bool>(), 12),
        discarded in prop::collection::vec(any::<bool>(), 12),
    ) {
        let effects: Vec<SideEffect> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| effect(&format!("e{i}"), EffectKind::ReturnValue, *label))
            .collect();
        let mappings: Vec<AssertionMapping> = effects
            .iter()
            .zip(&asserted)
            .filter(|(_, a)| **a)
            .map(|(e, _)| mapping("x:1:1", Some(e.id.as_str())))
            .collect();
        let discarded_ids: Vec<&str> = effects
            .iter()
            .zip(&discarded)
            .filter(|(_, d)| **d)
            .map(|(e, _)| e.id.as_str())
            .collect();

        let coverage = contract_coverage(&effects, &mappings, &discarded_ids);
        prop_assert!((0.0..=100.0).contains(&coverage.percentage));
        prop_assert!(coverage.covered_count <= coverage.total_contractual);
        prop_assert!(coverage.gaps.len() + coverage.covered_count <= coverage.total_contractual);
        prop_assert_eq!(coverage.gaps.len(), coverage.gap_hints.len());
        prop_assert!(coverage.gaps.iter().all(|g| g.is_contractual()));

        let score = over_specification(&effects, &mappings);
        prop_assert!(score.count <= mappings.len());
        prop_assert!((0.0..=1.0).contains(&score.ratio));
    }

    #[test]
    fn prop_worst_list_sorted_and_bounded(
        coverages in prop::collection::vec(0.0f64..=100.0, 0..20),
        limit in 1usize..8,
    ) {
        let reports: Vec<QualityReport> = coverages
            .iter()
            .enumerate()
            .map(|(i, c)| report(&format!("Test{i:02}"), "p.F", *c, 0, 0.0))
            .collect();
        let summary = summarize(&reports, limit);

        prop_assert_eq!(summary.worst_coverage_tests.len(), reports.len().min(limit));
        prop_assert!(summary
            .worst_coverage_tests
            .windows(2)
            .all(|w| w[0].coverage <= w[1].coverage));
        if let Some(first) = summary.worst_coverage_tests.first() {
            let min = coverages.iter().copied().fold(f64::INFINITY, f64::min);
            prop_assert_eq!(first.coverage, min);
        }
        prop_assert!((0.0..=100.0).contains(&summary.average_contract_coverage));
    }
}
