//! Assertion-to-effect mapping tests.

mod common;

use assay_analysis::frontend::load_sources;
use assay_analysis::quality::{Detector, Mapper, MappingOutcome, UnmappedReason, Vocabulary};
use assay_analysis::Program;
use common::{catalogue, func, program, qualified, PKG};

fn map(program: &Program, test: &str, target: &str) -> MappingOutcome {
    let catalogue = catalogue();
    let effects = catalogue.effects_for(target).unwrap();
    let vocab = Vocabulary::default();
    let test = func(program, test);
    let sites = Detector::new(program, &vocab, 3).detect(test);
    Mapper::new(program).map(test, qualified(program, target), effects, &sites)
}

fn mapped_ids(outcome: &MappingOutcome) -> Vec<(Option<&str>, u8)> {
    outcome
        .mappings
        .iter()
        .map(|m| (m.side_effect_id.as_deref(), m.confidence))
        .collect()
}

const DIVIDE: &str = "example.com/calc.Divide";
const SUMMARIZE: &str = "example.com/calc.Summarize";

#[test]
fn test_tuple_results_map_by_position() {
    let program = program();
    let outcome = map(&program, "TestDivide", DIVIDE);
    assert!(outcome.direct_call);
    assert_eq!(
        mapped_ids(&outcome),
        vec![(Some("divide-err"), 75), (Some("divide-ret"), 75)]
    );
    assert!(outcome.discarded.is_empty());
}

#[test]
fn test_blank_result_is_discarded() {
    let program = program();
    let outcome = map(&program, "TestDivideIgnoresError", DIVIDE);
    assert_eq!(mapped_ids(&outcome), vec![(Some("divide-ret"), 75)]);
    // Index into the catalogue entry: divide-err.
    assert_eq!(outcome.discarded, vec![1]);
}

#[test]
fn test_unrecognized_condition_maps_nothing() {
    let program = program();
    let outcome = map(&program, "TestDivideOK", DIVIDE);
    assert_eq!(outcome.mappings.len(), 1);
    assert!(!outcome.mappings[0].is_mapped());
    assert_eq!(outcome.mappings[0].unmapped_reason, Some(UnmappedReason::NoEffectMatch));
    assert_eq!(outcome.discarded, vec![0]);
}

#[test]
fn test_subtest_call_is_traced() {
    let program = program();
    let outcome = map(&program, "TestDivideTable", DIVIDE);
    assert_eq!(
        mapped_ids(&outcome),
        vec![(Some("divide-err"), 75), (Some("divide-ret"), 75)]
    );
}

#[test]
fn test_helper_result_is_traced_through_helper() {
    let program = program();
    let outcome = map(&program, "TestViaHelper", DIVIDE);
    assert!(!outcome.direct_call);

    let helper_site = &outcome.mappings[0];
    assert_eq!(helper_site.unmapped_reason, Some(UnmappedReason::HelperParameter));
    assert_eq!(outcome.mappings[1].side_effect_id.as_deref(), Some("divide-ret"));
    assert_eq!(outcome.mappings[1].confidence, 75);
    assert!(outcome.discarded.is_empty());
}

#[test]
fn test_field_access_is_composite() {
    let program = program();
    let outcome = map(&program, "TestSummarizeField", SUMMARIZE);
    assert_eq!(mapped_ids(&outcome), vec![(Some("sum-ret"), 65)]);
}

#[test]
fn test_helper_parameter_is_unmapped() {
    let program = program();
    let outcome = map(&program, "TestSummarizeHelper", SUMMARIZE);
    assert_eq!(outcome.mappings.len(), 1);
    assert_eq!(outcome.mappings[0].unmapped_reason, Some(UnmappedReason::HelperParameter));
    assert_eq!(outcome.mappings[0].confidence, 0);
}

#[test]
fn test_inline_call_is_unmapped() {
    let program = program();
    let outcome = map(&program, "TestSummarizeInline", SUMMARIZE);
    assert_eq!(outcome.mappings[0].unmapped_reason, Some(UnmappedReason::InlineCall));
    assert!(outcome.discarded.is_empty());
}

#[test]
fn test_fluent_and_diff_arguments_are_direct() {
    let program = program();
    let fluent = map(&program, "TestSummarizeFluent", SUMMARIZE);
    assert_eq!(mapped_ids(&fluent), vec![(Some("sum-ret"), 75)]);

    let diff = map(&program, "TestSummarizeDiff", SUMMARIZE);
    assert_eq!(mapped_ids(&diff), vec![(Some("sum-ret"), 75)]);
}

#[test]
fn test_pointer_argument_mutation() {
    let program = program();
    let outcome = map(&program, "TestAppend", "example.com/calc.Append");
    assert_eq!(mapped_ids(&outcome), vec![(Some("append-dst"), 65)]);
}

#[test]
fn test_receiver_mutation() {
    let program = program();
    let inc = map(&program, "TestCounter", "(*example.com/calc.Counter).Inc");
    assert_eq!(mapped_ids(&inc), vec![(Some("inc-recv"), 75)]);

    let value = map(&program, "TestCounter", "(*example.com/calc.Counter).Value");
    assert_eq!(value.mappings[0].unmapped_reason, Some(UnmappedReason::InlineCall));
    assert!(value.discarded.is_empty());
}

#[test]
fn test_assertion_locations_are_rendered() {
    let program = program();
    let outcome = map(&program, "TestDivide", DIVIDE);
    assert_eq!(outcome.mappings[0].assertion_location, "calc_test.go:12:2");
}

#[test]
fn test_direct_match_wins_over_composite() {
    let test = r#"package calc

import "testing"

func TestSummarizeBoth(t *testing.T) {
	want := Result{Sum: 3, Count: 2}
	r := Summarize([]int{1, 2})
	if r.Sum != 3 || r != want {
		t.Errorf("got %v", r)
	}
}
"#;
    let program = load_sources(PKG, &[("calc.go", common::CALC_GO), ("both_test.go", test)]).unwrap();
    let outcome = map(&program, "TestSummarizeBoth", SUMMARIZE);
    assert_eq!(mapped_ids(&outcome), vec![(Some("sum-ret"), 75)]);
}
