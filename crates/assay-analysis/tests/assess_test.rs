//! End-to-end assessment of the fixture package.

mod common;

use assay_analysis::frontend::load_sources;
use assay_analysis::quality::{assess, Assessment, QualityReport, UnmappedReason};
use assay_core::config::AssayConfig;
use assay_core::errors::AssessError;
use common::{catalogue, program, PKG};

fn run(config: &AssayConfig) -> Assessment {
    assess(&program(), PKG, &catalogue(), config).unwrap()
}

fn report<'a>(assessment: &'a Assessment, test: &str, target: &str) -> &'a QualityReport {
    assessment
        .reports
        .iter()
        .find(|r| r.test_function == test && r.target_function == target)
        .unwrap_or_else(|| panic!("no report for {test} -> {target}"))
}

const DIVIDE: &str = "example.com/calc.Divide";
const SUMMARIZE: &str = "example.com/calc.Summarize";

#[test]
fn test_reports_are_sorted_pairs() {
    let assessment = run(&AssayConfig::default());
    let pairs: Vec<(&str, &str)> = assessment
        .reports
        .iter()
        .map(|r| (r.test_function.as_str(), r.target_function.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("TestAppend", "example.com/calc.Append"),
            ("TestCounter", "(*example.com/calc.Counter).Inc"),
            ("TestCounter", "(*example.com/calc.Counter).Value"),
            ("TestDescribe", "example.com/calc.Describe"),
            ("TestDivide", DIVIDE),
            ("TestDivideIgnoresError", DIVIDE),
            ("TestDivideOK", DIVIDE),
            ("TestDivideTable", DIVIDE),
            ("TestSummarizeDiff", SUMMARIZE),
            ("TestSummarizeField", SUMMARIZE),
            ("TestSummarizeFluent", SUMMARIZE),
            ("TestSummarizeHelper", SUMMARIZE),
            ("TestSummarizeInline", SUMMARIZE),
            ("TestViaHelper", DIVIDE),
        ]
    );
}

#[test]
fn test_fully_covered_divide() {
    let assessment = run(&AssayConfig::default());
    let r = report(&assessment, "TestDivide", DIVIDE);
    assert_eq!(r.contract_coverage.percentage, 100.0);
    assert_eq!(r.contract_coverage.covered_count, 2);
    assert!(r.contract_coverage.gaps.is_empty());
    assert_eq!(r.mapped_assertions.len(), 2);
    assert!(r.unmapped_assertions.is_empty());
    assert_eq!(r.assertion_detection_confidence, 100.0);
    assert_eq!(r.test_location, "calc_test.go:10:6");
    assert!(r.metadata.warnings.is_empty());
}

#[test]
fn test_discarded_error_is_not_a_gap() {
    let assessment = run(&AssayConfig::default());
    let r = report(&assessment, "TestDivideIgnoresError", DIVIDE);
    assert_eq!(r.contract_coverage.percentage, 50.0);
    assert!(r.contract_coverage.gaps.is_empty());
    let discarded: Vec<&str> = r.discarded_returns.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(discarded, vec!["divide-err"]);
}

#[test]
fn test_unrecognized_assertion_leaves_gap() {
    let assessment = run(&AssayConfig::default());
    let r = report(&assessment, "TestDivideOK", DIVIDE);
    assert_eq!(r.contract_coverage.percentage, 0.0);
    let gaps: Vec<&str> = r.contract_coverage.gaps.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(gaps, vec!["divide-err"]);
    assert_eq!(r.contract_coverage.gap_hints.len(), 1);
    assert_eq!(r.discarded_returns[0].id, "divide-ret");
    assert_eq!(r.assertion_detection_confidence, 0.0);
}

#[test]
fn test_helper_assertions_warn() {
    let assessment = run(&AssayConfig::default());
    let r = report(&assessment, "TestViaHelper", DIVIDE);
    assert_eq!(r.contract_coverage.percentage, 50.0);
    assert_eq!(r.contract_coverage.gaps[0].id, "divide-err");
    assert_eq!(
        r.unmapped_assertions[0].unmapped_reason,
        Some(UnmappedReason::HelperParameter)
    );
    assert_eq!(
        r.metadata.warnings,
        vec!["1 assertion(s) in helper mustDivide cannot be traced to example.com/calc.Divide".to_string()]
    );

    let r = report(&assessment, "TestSummarizeHelper", SUMMARIZE);
    assert_eq!(r.contract_coverage.percentage, 0.0);
    assert!(r.metadata.warnings[0].contains("helper checkSum"));
}

#[test]
fn test_idioms_cover_summarize() {
    let assessment = run(&AssayConfig::default());
    for test in ["TestSummarizeField", "TestSummarizeFluent", "TestSummarizeDiff"] {
        let r = report(&assessment, test, SUMMARIZE);
        assert_eq!(r.contract_coverage.percentage, 100.0, "{test}");
    }
    let field = report(&assessment, "TestSummarizeField", SUMMARIZE);
    assert_eq!(field.mapped_assertions[0].confidence, 65);

    let inline = report(&assessment, "TestSummarizeInline", SUMMARIZE);
    assert_eq!(inline.contract_coverage.percentage, 0.0);
    assert_eq!(
        inline.unmapped_assertions[0].unmapped_reason,
        Some(UnmappedReason::InlineCall)
    );
    assert!(inline.discarded_returns.is_empty());
}

#[test]
fn test_mutations_are_covered() {
    let assessment = run(&AssayConfig::default());
    let append = report(&assessment, "TestAppend", "example.com/calc.Append");
    assert_eq!(append.contract_coverage.percentage, 100.0);

    let inc = report(&assessment, "TestCounter", "(*example.com/calc.Counter).Inc");
    assert_eq!(inc.contract_coverage.percentage, 100.0);
    assert!(inc.metadata.warnings[0].starts_with("multiple targets identified for TestCounter"));

    let value = report(&assessment, "TestCounter", "(*example.com/calc.Counter).Value");
    assert_eq!(value.contract_coverage.percentage, 0.0);
}

#[test]
fn test_incidental_assertions_are_over_specification() {
    let assessment = run(&AssayConfig::default());
    let r = report(&assessment, "TestDescribe", "example.com/calc.Describe");
    assert_eq!(r.over_specification.count, 1);
    assert_eq!(r.over_specification.ratio, 1.0);
    assert_eq!(r.over_specification.incidental_assertions[0].side_effect_id, "describe-ret");
    assert_eq!(r.over_specification.suggestions.len(), 1);
    assert_eq!(r.contract_coverage.total_contractual, 0);
    assert_eq!(r.contract_coverage.percentage, 0.0);
    assert_eq!(r.ambiguous_effects.len(), 1);
    assert_eq!(r.ambiguous_effects[0].id, "describe-panic");
}

#[test]
fn test_package_summary() {
    let assessment = run(&AssayConfig::default());
    let summary = &assessment.summary;
    assert_eq!(summary.total_tests, 13);
    assert!((summary.average_contract_coverage - 800.0 / 14.0).abs() < 1e-9);
    assert_eq!(summary.total_over_specifications, 1);
    assert!((summary.average_over_specification_ratio - 1.0 / 14.0).abs() < 1e-9);
    assert!((summary.assertion_detection_confidence - 1300.0 / 14.0).abs() < 1e-9);

    let worst: Vec<(&str, &str)> = summary
        .worst_coverage_tests
        .iter()
        .map(|w| (w.test_function.as_str(), w.target_function.as_str()))
        .collect();
    assert_eq!(
        worst,
        vec![
            ("TestCounter", "(*example.com/calc.Counter).Value"),
            ("TestDescribe", "example.com/calc.Describe"),
            ("TestDivideOK", DIVIDE),
            ("TestSummarizeHelper", SUMMARIZE),
            ("TestSummarizeInline", SUMMARIZE),
        ]
    );
}

#[test]
fn test_warnings_in_test_order() {
    let assessment = run(&AssayConfig::default());
    assert_eq!(
        assessment.warnings,
        vec![
            "multiple targets identified for TestCounter: (*example.com/calc.Counter).Inc, \
             (*example.com/calc.Counter).Value"
                .to_string(),
            "target example.com/calc.Double of TestDouble not found in effect catalogue; skipping"
                .to_string(),
            "no target identified for TestNothing".to_string(),
            "1 assertion(s) in helper checkSum cannot be traced to example.com/calc.Summarize"
                .to_string(),
            "1 assertion(s) in helper mustDivide cannot be traced to example.com/calc.Divide"
                .to_string(),
        ]
    );
}

#[test]
fn test_parallel_matches_sequential() {
    let sequential = run(&AssayConfig::default());
    let parallel = run(&AssayConfig::from_toml("[assessment]\nparallel = true\n").unwrap());
    assert_eq!(sequential.without_timing(), parallel.without_timing());
}

#[test]
fn test_repeated_runs_are_identical() {
    let first = run(&AssayConfig::default()).without_timing();
    let second = run(&AssayConfig::default()).without_timing();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_worst_list_limit_from_config() {
    let config = AssayConfig::from_toml("[assessment]\nworst_coverage_limit = 2\n").unwrap();
    let assessment = run(&config);
    assert_eq!(assessment.summary.worst_coverage_tests.len(), 2);
}

#[test]
fn test_helper_depth_from_config() {
    let config = AssayConfig::from_toml("[assessment]\nmax_helper_depth = 1\n").unwrap();
    let assessment = run(&config);
    // Both helpers sit one level down, so nothing changes at depth 1.
    let r = report(&assessment, "TestViaHelper", DIVIDE);
    assert_eq!(r.unmapped_assertions.len(), 1);
}

#[test]
fn test_json_document_shape() {
    let assessment = run(&AssayConfig::default());
    let json: serde_json::Value = serde_json::from_str(&assessment.to_json().unwrap()).unwrap();

    let reports = json["quality_reports"].as_array().unwrap();
    assert_eq!(reports.len(), 14);
    assert!(json["quality_summary"]["worst_coverage_tests"].is_array());

    let divide = reports
        .iter()
        .find(|r| r["test_function"] == "TestDivide")
        .unwrap();
    assert_eq!(divide["target_function"], DIVIDE);
    assert_eq!(divide["contract_coverage"]["percentage"], 100.0);
    assert_eq!(divide["mapped_assertions"][0]["kind"], "raw_nil_check");
    assert_eq!(divide["mapped_assertions"][0]["side_effect_id"], "divide-err");

    let ok = reports
        .iter()
        .find(|r| r["test_function"] == "TestDivideOK")
        .unwrap();
    assert_eq!(ok["contract_coverage"]["gaps"][0]["type"], "ErrorReturn");
    assert_eq!(ok["unmapped_assertions"][0]["unmapped_reason"], "no_effect_match");
}

#[test]
fn test_external_test_package_targets_base_package() {
    let test = r#"package calc_test

import (
	"testing"

	"example.com/calc"
)

func TestDivideExternal(t *testing.T) {
	got, err := calc.Divide(8, 4)
	if err != nil {
		t.Fatal(err)
	}
	if got != 2 {
		t.Errorf("got %d", got)
	}
}
"#;
    let program = load_sources(PKG, &[("calc.go", common::CALC_GO), ("calc_ext_test.go", test)]).unwrap();
    let assessment = assess(&program, "example.com/calc_test", &catalogue(), &AssayConfig::default()).unwrap();
    assert_eq!(assessment.reports.len(), 1);
    assert_eq!(assessment.reports[0].target_function, DIVIDE);
    assert_eq!(assessment.reports[0].contract_coverage.percentage, 100.0);
}

#[test]
fn test_target_package_override() {
    let config = AssayConfig::from_toml("[assessment]\ntarget_package = \"example.com/other\"\n").unwrap();
    let assessment = run(&config);
    assert!(assessment.reports.is_empty());
    assert_eq!(assessment.warnings.len(), 13);
    assert_eq!(assessment.summary.total_tests, 0);
}

#[test]
fn test_fatal_errors() {
    let program = program();
    let catalogue = catalogue();
    let config = AssayConfig::default();

    let err = assess(&program, "  ", &catalogue, &config).unwrap_err();
    assert!(matches!(err, AssessError::EmptyPackagePath));

    let err = assess(&program, "example.com/missing", &catalogue, &config).unwrap_err();
    assert!(matches!(err, AssessError::PackageNotFound { ref path } if path == "example.com/missing"));

    let no_tests = load_sources(PKG, &[("calc.go", common::CALC_GO)]).unwrap();
    let err = assess(&no_tests, PKG, &catalogue, &config).unwrap_err();
    assert!(matches!(err, AssessError::NoTestFiles { .. }));
}
