//! Shared Go fixture: a small `calc` package, its tests, and a classified
//! effect catalogue for it.

#![allow(dead_code)]

use assay_analysis::effects::EffectCatalogue;
use assay_analysis::frontend::load_sources;
use assay_analysis::model::{FunctionId, Program};

pub const PKG: &str = "example.com/calc";

pub const CALC_GO: &str = r#"package calc

import (
	"errors"
	"fmt"
)

var ErrDivideByZero = errors.New("divide by zero")

// Divide returns a / b.
func Divide(a, b int) (int, error) {
	if b == 0 {
		return 0, ErrDivideByZero
	}
	return a / b, nil
}

type Counter struct {
	n int
}

func (c *Counter) Inc() {
	c.n++
}

func (c *Counter) Value() int {
	return c.n
}

type Result struct {
	Sum   int
	Count int
}

func Summarize(xs []int) Result {
	r := Result{}
	for _, x := range xs {
		r.Sum += x
		r.Count++
	}
	return r
}

func Append(dst *[]int, v int) {
	*dst = append(*dst, v)
}

func Describe(r Result) string {
	return fmt.Sprintf("sum=%d count=%d", r.Sum, r.Count)
}

func Double(x int) int {
	return x * 2
}
"#;

pub const CALC_TEST_GO: &str = r#"package calc

import (
	"testing"

	"github.com/google/go-cmp/cmp"
	"github.com/stretchr/testify/assert"
)

func TestDivide(t *testing.T) {
	got, err := Divide(6, 3)
	if err != nil {
		t.Fatal(err)
	}
	if got != 2 {
		t.Errorf("Divide(6, 3) = %d, want 2", got)
	}
}

func TestDivideIgnoresError(t *testing.T) {
	got, _ := Divide(6, 3)
	if got != 2 {
		t.Errorf("got %d", got)
	}
}

func TestDivideOK(t *testing.T) {
	_, err := Divide(1, 1)
	ok := err == nil
	if !ok {
		t.Fatal("unexpected error")
	}
}

func TestDivideTable(t *testing.T) {
	for _, n := range []int{6, 9} {
		t.Run("case", func(t *testing.T) {
			got, err := Divide(n, 3)
			if err != nil {
				t.Fatal(err)
			}
			if got*3 != n {
				t.Errorf("got %d", got)
			}
		})
	}
}

func TestViaHelper(t *testing.T) {
	got := mustDivide(t, 6, 3)
	if got != 2 {
		t.Errorf("got %d", got)
	}
}

func mustDivide(t *testing.T, a, b int) int {
	t.Helper()
	got, err := Divide(a, b)
	if err != nil {
		t.Fatal(err)
	}
	return got
}

func TestSummarizeField(t *testing.T) {
	r := Summarize([]int{1, 2, 3})
	if r.Sum != 6 {
		t.Errorf("sum = %d", r.Sum)
	}
}

func TestSummarizeHelper(t *testing.T) {
	r := Summarize([]int{1, 2, 3})
	checkSum(t, r, 6)
}

func checkSum(t *testing.T, r Result, want int) {
	t.Helper()
	if r.Sum != want {
		t.Errorf("sum = %d, want %d", r.Sum, want)
	}
}

func TestSummarizeInline(t *testing.T) {
	if Summarize([]int{1, 2}).Sum != 3 {
		t.Error("bad sum")
	}
}

func TestSummarizeFluent(t *testing.T) {
	r := Summarize([]int{1, 2})
	assert.Equal(t, 3, r.Sum, "summary %v", r)
}

func TestSummarizeDiff(t *testing.T) {
	r := Summarize([]int{1, 2})
	if diff := cmp.Diff(Result{Sum: 3, Count: 2}, r); diff != "" {
		t.Errorf("mismatch (-want +got):\n%s", diff)
	}
}

func TestAppend(t *testing.T) {
	var xs []int
	Append(&xs, 4)
	if len(xs) != 1 {
		t.Fatalf("len = %d", len(xs))
	}
}

func TestCounter(t *testing.T) {
	c := &Counter{}
	c.Inc()
	if c.Value() != 1 {
		t.Errorf("value = %d", c.Value())
	}
}

func TestDescribe(t *testing.T) {
	s := Describe(Result{Sum: 3, Count: 2})
	if s != "sum=3 count=2" {
		t.Errorf("got %q", s)
	}
}

func TestDouble(t *testing.T) {
	if Double(2) != 4 {
		t.Error("bad double")
	}
}

func TestNothing(t *testing.T) {
	t.Log("nothing under test")
}
"#;

pub const CATALOGUE_JSON: &str = r#"{
  "functions": {
    "example.com/calc.Divide": [
      {"id": "divide-ret", "type": "ReturnValue", "location": "calc.go:16:2", "description": "quotient",
       "classification": {"label": "contractual", "confidence": 90, "reasoning": "documented result"}},
      {"id": "divide-err", "type": "ErrorReturn", "location": "calc.go:14:3", "description": "division by zero",
       "classification": {"label": "contractual", "confidence": 85}}
    ],
    "example.com/calc.Summarize": [
      {"id": "sum-ret", "type": "ReturnValue", "classification": {"label": "contractual"}}
    ],
    "example.com/calc.Append": [
      {"id": "append-dst", "type": "PointerArgMutation", "target": "dst",
       "classification": {"label": "contractual"}}
    ],
    "(*example.com/calc.Counter).Inc": [
      {"id": "inc-recv", "type": "ReceiverMutation", "target": "n",
       "classification": {"label": "contractual"}}
    ],
    "(*example.com/calc.Counter).Value": [
      {"id": "value-ret", "type": "ReturnValue", "classification": {"label": "contractual"}}
    ],
    "example.com/calc.Describe": [
      {"id": "describe-ret", "type": "ReturnValue", "classification": {"label": "incidental"}},
      {"id": "describe-panic", "type": "Panic", "classification": {"label": "ambiguous"}}
    ]
  }
}"#;

pub fn program() -> Program {
    load_sources(PKG, &[("calc.go", CALC_GO), ("calc_test.go", CALC_TEST_GO)])
        .expect("fixture package loads")
}

pub fn catalogue() -> EffectCatalogue {
    EffectCatalogue::from_json(CATALOGUE_JSON).expect("fixture catalogue parses")
}

/// A declared function of the fixture package by simple name.
pub fn func(program: &Program, name: &str) -> FunctionId {
    program
        .dataflow
        .functions()
        .iter()
        .find(|f| f.name == name && f.parent.is_none())
        .map(|f| f.id)
        .unwrap_or_else(|| panic!("function {name} not found"))
}

pub fn qualified(program: &Program, qualified_name: &str) -> FunctionId {
    program
        .dataflow
        .find_by_qualified_name(qualified_name)
        .unwrap_or_else(|| panic!("function {qualified_name} not found"))
}
