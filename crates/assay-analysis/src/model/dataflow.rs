//! Dataflow graph: per-function value instructions, referrers, closures,
//! and a static call graph.
//!
//! Values are stored in one arena per program. Every instruction that takes
//! operands registers itself as a referrer of each operand, so "was this
//! call's result consumed" is a referrer-set query.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use smallvec::SmallVec;

use assay_core::types::collections::FxHashMap;

use super::objects::ObjectId;
use super::position::{Pos, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

/// What the test harness treats a function as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionRole {
    Test,
    Benchmark,
    Fuzz,
    Example,
    TestMain,
    Init,
    Regular,
}

impl FunctionRole {
    /// Roles the test harness invokes itself; never assessment targets.
    pub fn is_harness(self) -> bool {
        !matches!(self, Self::Regular)
    }

    /// Classify a top-level function by name.
    pub fn classify(name: &str, in_test_file: bool) -> Self {
        if name == "init" {
            return Self::Init;
        }
        if !in_test_file {
            return Self::Regular;
        }
        if name == "TestMain" {
            return Self::TestMain;
        }
        let prefixed = |prefix: &str| {
            name.strip_prefix(prefix)
                .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_lowercase()))
        };
        if prefixed("Test") {
            Self::Test
        } else if prefixed("Benchmark") {
            Self::Benchmark
        } else if prefixed("Fuzz") {
            Self::Fuzz
        } else if prefixed("Example") {
            Self::Example
        } else {
            Self::Regular
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigParam {
    pub name: Option<String>,
    pub type_text: String,
}

impl SigParam {
    /// Pointer, slice, map, or channel: mutations through it are visible
    /// to the caller.
    pub fn is_reference(&self) -> bool {
        let t = self.type_text.trim_start_matches("...").trim();
        t.starts_with('*') || t.starts_with("[]") || t.starts_with("map[") || t.starts_with("chan")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub receiver: Option<SigParam>,
    pub params: Vec<SigParam>,
    /// Result types as written.
    pub results: Vec<String>,
}

impl Signature {
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .position(|p| p.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    /// Import path of the owning package.
    pub package: String,
    /// Dataflow-style name: `pkg.Func`, `(*pkg.T).M`, `pkg.Func$1`.
    pub qualified_name: String,
    pub pos: Pos,
    pub span: Span,
    pub signature: Signature,
    pub role: FunctionRole,
    /// Enclosing function of a closure.
    pub parent: Option<FunctionId>,
    /// Closures defined directly in this function, in source order.
    pub anon_funcs: Vec<FunctionId>,
    pub in_test_file: bool,
    /// Instructions in lowering order.
    pub instrs: Vec<ValueId>,
    /// Backing object of a declared function or method.
    pub object: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Static(FunctionId),
    Closure(FunctionId),
    External { package: String, name: String },
    Builtin(String),
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInstr {
    pub callee: Callee,
    /// Receiver first when `has_receiver`, then positional arguments.
    pub args: Vec<ValueId>,
    pub result_count: usize,
    pub has_receiver: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Call(CallInstr),
    /// Component `index` of a multi-result call.
    Extract { tuple: ValueId, index: usize },
    Local { object: ObjectId },
    Global { object: ObjectId },
    Const,
    MakeClosure { func: FunctionId },
    AddressOf { operand: ValueId },
    Deref { operand: ValueId },
    /// Store of `source` into a named variable.
    Bind { object: ObjectId, source: ValueId },
    Op { operands: Vec<ValueId> },
    Branch { cond: ValueId },
    Return { results: Vec<ValueId> },
}

impl ValueKind {
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        match self {
            Self::Call(call) => call.args.iter().copied().collect(),
            Self::Extract { tuple, .. } => SmallVec::from_slice(&[*tuple]),
            Self::AddressOf { operand } | Self::Deref { operand } => {
                SmallVec::from_slice(&[*operand])
            }
            Self::Bind { source, .. } => SmallVec::from_slice(&[*source]),
            Self::Branch { cond } => SmallVec::from_slice(&[*cond]),
            Self::Op { operands } => operands.iter().copied().collect(),
            Self::Return { results } => results.iter().copied().collect(),
            Self::Local { .. } | Self::Global { .. } | Self::Const | Self::MakeClosure { .. } => {
                SmallVec::new()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Value {
    pub id: ValueId,
    pub func: FunctionId,
    /// Source position; for calls, the opening parenthesis. Address and
    /// dereference values carry `Pos::NONE`.
    pub pos: Pos,
    pub kind: ValueKind,
    pub referrers: SmallVec<[ValueId; 2]>,
}

impl Value {
    pub fn as_call(&self) -> Option<&CallInstr> {
        match &self.kind {
            ValueKind::Call(call) => Some(call),
            _ => None,
        }
    }
}

/// Function and value arenas for a program.
#[derive(Debug, Default)]
pub struct Dataflow {
    functions: Vec<Function>,
    values: Vec<Value>,
}

impl Dataflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, mut function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        function.id = id;
        if let Some(parent) = function.parent {
            self.functions[parent.0 as usize].anon_funcs.push(id);
        }
        self.functions.push(function);
        id
    }

    /// Append an instruction to `func` and register it with its operands.
    pub fn push_value(&mut self, func: FunctionId, pos: Pos, kind: ValueKind) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        for operand in kind.operands() {
            self.values[operand.0 as usize].referrers.push(id);
        }
        self.values.push(Value {
            id,
            func,
            pos,
            kind,
            referrers: SmallVec::new(),
        });
        self.functions[func.0 as usize].instrs.push(id);
        id
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    /// Call instructions of one function, in lowering order.
    pub fn calls(&self, func: FunctionId) -> impl Iterator<Item = (&Value, &CallInstr)> + '_ {
        self.function(func)
            .instrs
            .iter()
            .map(|id| self.value(*id))
            .filter_map(|v| v.as_call().map(|call| (v, call)))
    }

    pub fn find_by_qualified_name(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .find(|f| f.qualified_name == name)
            .map(|f| f.id)
    }
}

/// Static call graph over program functions.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraph<FunctionId, ()>,
    nodes: FxHashMap<FunctionId, NodeIndex>,
}

impl CallGraph {
    pub fn build(dataflow: &Dataflow) -> Self {
        let mut cg = Self::default();
        for function in dataflow.functions() {
            cg.node(function.id);
        }
        for function in dataflow.functions() {
            for (_, call) in dataflow.calls(function.id) {
                if let Callee::Static(callee) | Callee::Closure(callee) = call.callee {
                    let (from, to) = (cg.node(function.id), cg.node(callee));
                    if !cg.graph.contains_edge(from, to) {
                        cg.graph.add_edge(from, to, ());
                    }
                }
            }
        }
        cg
    }

    fn node(&mut self, id: FunctionId) -> NodeIndex {
        if let Some(idx) = self.nodes.get(&id) {
            return *idx;
        }
        let idx = self.graph.add_node(id);
        self.nodes.insert(id, idx);
        idx
    }

    /// True when `caller` contains a call instruction to `callee`.
    pub fn calls_directly(&self, caller: FunctionId, callee: FunctionId) -> bool {
        match (self.nodes.get(&caller), self.nodes.get(&callee)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    /// Direct callees, sorted by id.
    pub fn callees(&self, caller: FunctionId) -> Vec<FunctionId> {
        let Some(idx) = self.nodes.get(&caller) else {
            return Vec::new();
        };
        let mut out: Vec<FunctionId> = self
            .graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
