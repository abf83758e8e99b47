//! Lookup sets for the assertion idioms the detector recognizes.

use assay_core::config::VocabularyConfig;
use assay_core::types::collections::FxHashSet;

/// Identifiers conventionally bound to a test context.
const CONTEXT_NAMES: &[&str] = &["t", "b", "f", "tb"];

#[derive(Debug, Clone)]
pub struct Vocabulary {
    assertion_aliases: FxHashSet<String>,
    equality_methods: FxHashSet<String>,
    error_methods: FxHashSet<String>,
    /// `(package local name, function name)`.
    diff_functions: FxHashSet<(String, String)>,
    failure_methods: FxHashSet<String>,
    context_types: FxHashSet<String>,
    subtest_methods: FxHashSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from_config(&VocabularyConfig::default())
    }
}

impl Vocabulary {
    pub fn from_config(config: &VocabularyConfig) -> Self {
        let set = |items: Vec<String>| items.into_iter().collect::<FxHashSet<_>>();
        let diff_functions = config
            .effective_diff_functions()
            .into_iter()
            .filter_map(|name| {
                let (pkg, func) = name.rsplit_once('.')?;
                Some((pkg.to_string(), func.to_string()))
            })
            .collect();
        Self {
            assertion_aliases: set(config.effective_assertion_aliases()),
            equality_methods: set(config.effective_equality_methods()),
            error_methods: set(config.effective_error_methods()),
            diff_functions,
            failure_methods: set(config.effective_failure_methods()),
            context_types: set(
                config
                    .effective_context_types()
                    .into_iter()
                    .map(|t| normalize_type(&t))
                    .collect(),
            ),
            subtest_methods: set(config.effective_subtest_methods()),
        }
    }

    pub fn is_assertion_alias(&self, name: &str) -> bool {
        self.assertion_aliases.contains(name)
    }

    pub fn is_equality_method(&self, name: &str) -> bool {
        self.equality_methods.contains(name)
    }

    pub fn is_error_method(&self, name: &str) -> bool {
        self.error_methods.contains(name)
    }

    pub fn is_diff_function(&self, package: &str, name: &str) -> bool {
        self.diff_functions
            .contains(&(package.to_string(), name.to_string()))
    }

    pub fn is_failure_method(&self, name: &str) -> bool {
        self.failure_methods.contains(name)
    }

    pub fn is_subtest_method(&self, name: &str) -> bool {
        self.subtest_methods.contains(name)
    }

    pub fn is_context_type(&self, type_text: &str) -> bool {
        self.context_types.contains(&normalize_type(type_text))
    }

    /// Fallback when an identifier's declared type is unknown.
    pub fn is_context_name(&self, name: &str) -> bool {
        CONTEXT_NAMES.contains(&name)
    }
}

fn normalize_type(type_text: &str) -> String {
    type_text.chars().filter(|c| !c.is_whitespace()).collect()
}
