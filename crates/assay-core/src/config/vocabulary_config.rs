//! Assertion vocabulary configuration.
//!
//! Every list falls back to the Go testing conventions when left empty.

use serde::{Deserialize, Serialize};

const DEFAULT_ASSERTION_ALIASES: &[&str] = &["assert", "require"];

const DEFAULT_EQUALITY_METHODS: &[&str] = &[
    "Equal",
    "Equalf",
    "EqualValues",
    "Exactly",
    "NotEqual",
    "NotEqualf",
    "Same",
    "NotSame",
    "Nil",
    "Nilf",
    "NotNil",
    "NotNilf",
    "True",
    "Truef",
    "False",
    "Falsef",
    "Len",
    "Empty",
    "NotEmpty",
    "Zero",
    "NotZero",
    "Contains",
    "NotContains",
    "ElementsMatch",
    "Subset",
    "Greater",
    "GreaterOrEqual",
    "Less",
    "LessOrEqual",
    "InDelta",
    "JSONEq",
];

const DEFAULT_ERROR_METHODS: &[&str] = &[
    "Error",
    "Errorf",
    "NoError",
    "NoErrorf",
    "ErrorIs",
    "NotErrorIs",
    "ErrorAs",
    "ErrorContains",
    "EqualError",
    "Panics",
    "PanicsWithError",
];

const DEFAULT_DIFF_FUNCTIONS: &[&str] = &["cmp.Diff", "pretty.Compare", "deep.Equal"];

const DEFAULT_FAILURE_METHODS: &[&str] = &["Error", "Errorf", "Fatal", "Fatalf", "Fail", "FailNow"];

const DEFAULT_CONTEXT_TYPES: &[&str] = &["*testing.T", "*testing.B", "*testing.F", "testing.TB"];

const DEFAULT_SUBTEST_METHODS: &[&str] = &["Run"];

/// Names the detector uses to recognize assertion idioms.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Receiver identifiers of fluent assertion packages.
    pub assertion_aliases: Vec<String>,
    /// Fluent methods checking equality, nil-ness, or truthiness.
    pub equality_methods: Vec<String>,
    /// Fluent methods checking errors.
    pub error_methods: Vec<String>,
    /// Two-argument diff functions, written as `pkg.Func`.
    pub diff_functions: Vec<String>,
    /// Test-context methods that report a failure.
    pub failure_methods: Vec<String>,
    /// Parameter types that mark a test context.
    pub context_types: Vec<String>,
    /// Test-context methods that open a nested sub-test.
    pub subtest_methods: Vec<String>,
}

impl VocabularyConfig {
    pub fn effective_assertion_aliases(&self) -> Vec<String> {
        or_defaults(&self.assertion_aliases, DEFAULT_ASSERTION_ALIASES)
    }

    pub fn effective_equality_methods(&self) -> Vec<String> {
        or_defaults(&self.equality_methods, DEFAULT_EQUALITY_METHODS)
    }

    pub fn effective_error_methods(&self) -> Vec<String> {
        or_defaults(&self.error_methods, DEFAULT_ERROR_METHODS)
    }

    pub fn effective_diff_functions(&self) -> Vec<String> {
        or_defaults(&self.diff_functions, DEFAULT_DIFF_FUNCTIONS)
    }

    pub fn effective_failure_methods(&self) -> Vec<String> {
        or_defaults(&self.failure_methods, DEFAULT_FAILURE_METHODS)
    }

    pub fn effective_context_types(&self) -> Vec<String> {
        or_defaults(&self.context_types, DEFAULT_CONTEXT_TYPES)
    }

    pub fn effective_subtest_methods(&self) -> Vec<String> {
        or_defaults(&self.subtest_methods, DEFAULT_SUBTEST_METHODS)
    }
}

fn or_defaults(configured: &[String], defaults: &[&str]) -> Vec<String> {
    if configured.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        configured.to_vec()
    }
}
