//! Target inference: which functions of the package under test a test
//! function exercises.

use assay_core::types::collections::{FxHashMap, FxHashSet};

use crate::model::dataflow::{Callee, FunctionId};
use crate::model::program::Program;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InferredTarget {
    pub qualified_name: String,
    pub function: FunctionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inference {
    /// Sorted by qualified name, no duplicates.
    pub targets: Vec<InferredTarget>,
    pub warnings: Vec<String>,
}

pub struct Inferrer<'p> {
    program: &'p Program,
    target_package: &'p str,
    max_depth: u32,
}

impl<'p> Inferrer<'p> {
    pub fn new(program: &'p Program, target_package: &'p str, max_depth: u32) -> Self {
        Self {
            program,
            target_package,
            max_depth,
        }
    }

    pub fn infer(&self, test: FunctionId) -> Inference {
        let mut visited = FxHashMap::default();
        let mut found = FxHashSet::default();
        self.walk(test, 0, &mut visited, &mut found);

        let mut targets: Vec<InferredTarget> = found
            .into_iter()
            .map(|function| InferredTarget {
                qualified_name: self.program.dataflow.function(function).qualified_name.clone(),
                function,
            })
            .collect();
        targets.sort();
        targets.dedup_by(|a, b| a.qualified_name == b.qualified_name);

        let test_name = &self.program.dataflow.function(test).name;
        let mut warnings = Vec::new();
        match targets.len() {
            0 => warnings.push(format!("no target identified for {test_name}")),
            1 => {}
            _ => {
                let names: Vec<&str> = targets.iter().map(|t| t.qualified_name.as_str()).collect();
                warnings.push(format!(
                    "multiple targets identified for {test_name}: {}",
                    names.join(", ")
                ));
            }
        }
        Inference { targets, warnings }
    }

    fn is_candidate(&self, func: FunctionId) -> bool {
        let f = self.program.dataflow.function(func);
        f.package == self.target_package
            && f.parent.is_none()
            && !f.role.is_harness()
            && !f.in_test_file
    }

    fn walk(
        &self,
        func: FunctionId,
        depth: u32,
        visited: &mut FxHashMap<FunctionId, u32>,
        found: &mut FxHashSet<FunctionId>,
    ) {
        // Shallowest depth each function was walked at; a shallower revisit
        // walks it again.
        match visited.get(&func) {
            Some(&seen) if seen <= depth => return,
            _ => {
                visited.insert(func, depth);
            }
        }
        let dataflow = &self.program.dataflow;
        for (_, call) in dataflow.calls(func) {
            let Callee::Static(callee) = call.callee else {
                continue;
            };
            if self.is_candidate(callee) {
                found.insert(callee);
            } else if !dataflow.function(callee).role.is_harness() && depth < self.max_depth {
                self.walk(callee, depth + 1, visited, found);
            }
        }
        // Closures are part of their parent and do not consume depth.
        for &closure in &dataflow.function(func).anon_funcs {
            self.walk(closure, depth, visited, found);
        }
    }
}
