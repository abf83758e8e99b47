//! Assertion detection tests.

mod common;

use assay_analysis::frontend::load_sources;
use assay_analysis::quality::{AssertionKind, Detector, Vocabulary};
use assay_analysis::Program;
use assay_core::config::VocabularyConfig;
use common::{func, program, qualified, PKG};

fn kinds(program: &Program, test: &str) -> Vec<AssertionKind> {
    let vocab = Vocabulary::default();
    Detector::new(program, &vocab, 3)
        .detect(func(program, test))
        .iter()
        .map(|s| s.kind)
        .collect()
}

#[test]
fn test_raw_comparisons_and_nil_checks() {
    let program = program();
    let vocab = Vocabulary::default();
    let test = func(&program, "TestDivide");
    let sites = Detector::new(&program, &vocab, 3).detect(test);

    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].kind, AssertionKind::RawNilCheck);
    assert_eq!(sites[1].kind, AssertionKind::RawComparison);
    assert_eq!(sites[0].location.to_string(), "calc_test.go:12:2");
    assert_eq!(sites[1].location.line, 15);
    assert!(sites.iter().all(|s| s.depth == 0 && s.enclosing == test));
}

#[test]
fn test_non_comparison_condition_is_unrecognized() {
    let program = program();
    assert_eq!(kinds(&program, "TestDivideOK"), vec![AssertionKind::Unrecognized]);
}

#[test]
fn test_subtest_sites_belong_to_the_closure() {
    let program = program();
    let vocab = Vocabulary::default();
    let sites = Detector::new(&program, &vocab, 3).detect(func(&program, "TestDivideTable"));
    let closure = qualified(&program, "example.com/calc.TestDivideTable$1");

    assert_eq!(sites.len(), 2);
    assert!(sites.iter().all(|s| s.depth == 0 && s.enclosing == closure));
}

#[test]
fn test_helper_sites_are_one_level_deeper() {
    let program = program();
    let vocab = Vocabulary::default();
    let sites = Detector::new(&program, &vocab, 3).detect(func(&program, "TestViaHelper"));
    let helper = func(&program, "mustDivide");

    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].depth, 1);
    assert_eq!(sites[0].enclosing, helper);
    assert_eq!(sites[0].kind, AssertionKind::RawNilCheck);
    assert_eq!(sites[1].depth, 0);
    assert_eq!(sites[1].kind, AssertionKind::RawComparison);
}

#[test]
fn test_fluent_assertions() {
    let program = program();
    assert_eq!(kinds(&program, "TestSummarizeFluent"), vec![AssertionKind::FluentEquality]);
}

#[test]
fn test_diff_reported_once() {
    let program = program();
    let vocab = Vocabulary::default();
    let sites = Detector::new(&program, &vocab, 3).detect(func(&program, "TestSummarizeDiff"));
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].kind, AssertionKind::StructuralDiff);
    assert!(sites[0].expr.as_call().is_some());
}

#[test]
fn test_tests_without_assertions() {
    let program = program();
    assert!(kinds(&program, "TestNothing").is_empty());
    assert_eq!(kinds(&program, "TestCounter").len(), 1);
}

const DEEP_TEST: &str = r#"package calc

import (
	"testing"

	"github.com/google/go-cmp/cmp"
	"github.com/stretchr/testify/require"
)

func TestDeep(t *testing.T) {
	v := Double(2)
	level1(t, v)
}

func level1(t *testing.T, v int) {
	if v != 4 {
		t.Error("level 1")
	}
	level2(t, v)
}

func level2(t *testing.T, v int) {
	if v < 0 {
		t.Error("level 2")
	}
	level1(t, v)
}

func TestMixed(t *testing.T) {
	v, err := Divide(4, 2)
	require.NoError(t, err)
	if cmp.Diff(2, v) != "" {
		t.Fatal("diff")
	}
	if v > 0 && v < 10 {
		t.Log("in range")
	}
	if v == 2 {
		t.Errorf("unexpected %d", v)
	} else if v == 3 {
		t.Fatal("three")
	}
	check := func(want int) {
		if v != want {
			t.Error("closure")
		}
	}
	check(2)
}
"#;

fn deep_program() -> Program {
    load_sources(PKG, &[("calc.go", common::CALC_GO), ("deep_test.go", DEEP_TEST)]).unwrap()
}

#[test]
fn test_recursive_helpers_visited_once() {
    let program = deep_program();
    let vocab = Vocabulary::default();
    let sites = Detector::new(&program, &vocab, 3).detect(func(&program, "TestDeep"));
    let depths: Vec<u32> = sites.iter().map(|s| s.depth).collect();
    assert_eq!(depths, vec![1, 2]);
}

#[test]
fn test_helper_depth_limit() {
    let program = deep_program();
    let vocab = Vocabulary::default();
    let sites = Detector::new(&program, &vocab, 1).detect(func(&program, "TestDeep"));
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].enclosing, func(&program, "level1"));
}

#[test]
fn test_mixed_idioms() {
    let program = deep_program();
    assert_eq!(
        kinds(&program, "TestMixed"),
        vec![
            AssertionKind::FluentError,
            AssertionKind::StructuralDiff,
            AssertionKind::RawComparison,
            AssertionKind::RawComparison,
            AssertionKind::RawComparison,
        ]
    );
}

#[test]
fn test_custom_vocabulary() {
    let program = deep_program();
    let config = VocabularyConfig {
        assertion_aliases: vec!["must".to_string()],
        ..VocabularyConfig::default()
    };
    let vocab = Vocabulary::from_config(&config);
    let sites = Detector::new(&program, &vocab, 3).detect(func(&program, "TestMixed"));
    assert!(sites.iter().all(|s| s.kind != AssertionKind::FluentError));
}

const ORDER_TEST: &str = r#"package calc

import (
	"testing"

	"github.com/google/go-cmp/cmp"
	"github.com/stretchr/testify/assert"
)

func TestOuterFirst(t *testing.T) {
	v := Double(1)
	outer(t, v)
	inner(t, v)
}

func TestInnerFirst(t *testing.T) {
	v := Double(1)
	inner(t, v)
	outer(t, v)
}

func outer(t *testing.T, v int) {
	if v != 2 {
		t.Error("outer")
	}
	inner(t, v)
}

func inner(t *testing.T, v int) {
	if v < 0 {
		t.Error("inner")
	}
	leaf(t, v)
}

func leaf(t *testing.T, v int) {
	if v > 10 {
		t.Error("leaf")
	}
}

func TestDiffOnlyLogged(t *testing.T) {
	diff := cmp.Diff(2, Double(1))
	t.Log(diff)
}

func TestDiffCheckedFluently(t *testing.T) {
	diff := cmp.Diff(2, Double(1))
	assert.Empty(t, diff)
}

func TestDiffCheckedLater(t *testing.T) {
	diff := cmp.Diff(2, Double(1))
	t.Log(diff)
	if diff != "" {
		t.Error(diff)
	}
	if "" != diff {
		t.Fatal(diff)
	}
}
"#;

fn order_program() -> Program {
    load_sources(PKG, &[("calc.go", common::CALC_GO), ("order_test.go", ORDER_TEST)]).unwrap()
}

fn sites_by_helper(program: &Program, test: &str) -> Vec<(String, u32)> {
    let vocab = Vocabulary::default();
    let mut sites: Vec<(String, u32)> = Detector::new(program, &vocab, 2)
        .detect(func(program, test))
        .iter()
        .map(|s| (program.dataflow.function(s.enclosing).name.clone(), s.depth))
        .collect();
    sites.sort();
    sites
}

#[test]
fn test_helpers_walked_at_shallowest_depth() {
    let program = order_program();
    let expected = vec![
        ("inner".to_string(), 1),
        ("leaf".to_string(), 2),
        ("outer".to_string(), 1),
    ];
    assert_eq!(sites_by_helper(&program, "TestOuterFirst"), expected);
    assert_eq!(sites_by_helper(&program, "TestInnerFirst"), expected);
}

#[test]
fn test_diff_needs_empty_check() {
    let program = order_program();
    assert!(kinds(&program, "TestDiffOnlyLogged").is_empty());
    assert_eq!(
        kinds(&program, "TestDiffCheckedFluently"),
        vec![AssertionKind::StructuralDiff]
    );

    let vocab = Vocabulary::default();
    let sites = Detector::new(&program, &vocab, 3).detect(func(&program, "TestDiffCheckedLater"));
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].kind, AssertionKind::StructuralDiff);
    assert_eq!(sites[0].location.line, 53);
}
