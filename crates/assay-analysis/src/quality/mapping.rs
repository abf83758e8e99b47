//! Assertion-to-effect mapping.
//!
//! The dataflow graph says which values carry a target's results and
//! mutated arguments; the syntax tree says which identifiers an assertion
//! reads. The two meet in an `ObjectId -> effects` bridge built once per
//! traced call: results through the assignment that receives them, and
//! mutated arguments through exact-position lookup of the argument values.

use assay_core::types::collections::FxHashMap;

use super::types::{
    AssertionMapping, AssertionSite, UnmappedReason, COMPOSITE_CONFIDENCE, DIRECT_CONFIDENCE,
};
use crate::effects::SideEffect;
use crate::model::dataflow::{CallInstr, Callee, FunctionId, Value, ValueId, ValueKind};
use crate::model::objects::{ObjectId, ObjectKind};
use crate::model::program::Program;
use crate::model::syntax::{inspect_block, AssignStmt, CallExpr, Expr, Ident, Node, Stmt, UnaryOp};

/// Result of mapping one test's assertions against one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingOutcome {
    /// One per assertion site, in site order.
    pub mappings: Vec<AssertionMapping>,
    /// Indices of return effects whose call results are never consumed.
    pub discarded: Vec<usize>,
    /// Whether the target is called directly from the test or its closures.
    pub direct_call: bool,
}

/// Effect indices reachable from each traced variable.
type Bridge = FxHashMap<ObjectId, Vec<usize>>;

pub struct Mapper<'p> {
    program: &'p Program,
}

impl<'p> Mapper<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    pub fn map(
        &self,
        test: FunctionId,
        target: FunctionId,
        effects: &[SideEffect],
        sites: &[AssertionSite<'_>],
    ) -> MappingOutcome {
        let mut bridge = Bridge::default();
        let mut discarded = Vec::new();
        let direct = self.find_call(test, |callee| callee == target);

        match direct {
            Some((value, call)) => {
                let results = &self.program.dataflow.function(target).signature.results;
                let slots = return_slots(effects, results);
                self.trace_returns(test, value, &slots, &mut bridge);
                self.trace_mutations(target, call, effects, &mut bridge);
                discarded = discarded_effects(self, value, call, &slots);
            }
            None => {
                let graph = &self.program.call_graph;
                let helper_call = self.find_call(test, |callee| {
                    callee != target && graph.calls_directly(callee, target)
                });
                if let Some((value, call)) = helper_call {
                    if let Callee::Static(helper) = call.callee {
                        let results = &self.program.dataflow.function(helper).signature.results;
                        let slots = return_slots(effects, results);
                        self.trace_returns(test, value, &slots, &mut bridge);
                    }
                }
            }
        }

        let has_return_effects = effects.iter().any(|e| e.kind.is_return_kind());
        let mappings = sites
            .iter()
            .map(|site| {
                if let Some(idx) = pass_direct(self, site.expr, &bridge) {
                    return AssertionMapping::mapped(site, &effects[idx].id, DIRECT_CONFIDENCE);
                }
                if let Some(idx) = pass_composite(self, site.expr, &bridge, effects) {
                    return AssertionMapping::mapped(site, &effects[idx].id, COMPOSITE_CONFIDENCE);
                }
                let reason = if site.depth > 0 {
                    UnmappedReason::HelperParameter
                } else if bridge.is_empty() && has_return_effects {
                    UnmappedReason::InlineCall
                } else {
                    UnmappedReason::NoEffectMatch
                };
                AssertionMapping::unmapped(site, reason)
            })
            .collect();

        MappingOutcome {
            mappings,
            discarded,
            direct_call: direct.is_some(),
        }
    }

    /// First static call matching `wanted` by source position: the test
    /// body first, then its closures in creation order.
    fn find_call(
        &self,
        test: FunctionId,
        wanted: impl Fn(FunctionId) -> bool,
    ) -> Option<(&'p Value, &'p CallInstr)> {
        let dataflow = &self.program.dataflow;
        let mut queue = std::collections::VecDeque::from([test]);
        while let Some(func) = queue.pop_front() {
            let found = dataflow
                .calls(func)
                .filter(|(_, call)| matches!(call.callee, Callee::Static(f) if wanted(f)))
                .min_by_key(|(value, _)| value.pos);
            if found.is_some() {
                return found;
            }
            queue.extend(dataflow.function(func).anon_funcs.iter().copied());
        }
        None
    }

    /// Bind the variables receiving `call`'s results to the effects in
    /// the matching result slots.
    fn trace_returns(&self, test: FunctionId, call: &Value, slots: &[Vec<usize>], bridge: &mut Bridge) {
        let Some((assign, rhs_index)) = self.assignment_of(test, call) else {
            return;
        };
        let bindings: Vec<(&Expr, usize)> = if assign.rhs.len() == 1 && assign.lhs.len() > 1 {
            assign.lhs.iter().enumerate().map(|(i, lhs)| (lhs, i)).collect()
        } else {
            assign.lhs.get(rhs_index).map(|lhs| (lhs, 0)).into_iter().collect()
        };
        for (lhs, slot) in bindings {
            let Some(ident) = lhs.as_ident().filter(|i| !i.is_blank()) else {
                continue;
            };
            let (Some(object), Some(effects)) = (self.program.types.object_of(ident), slots.get(slot)) else {
                continue;
            };
            if !effects.is_empty() {
                bridge.entry(object).or_default().extend(effects.iter().copied());
            }
        }
    }

    /// The innermost assignment whose right-hand side contains the call,
    /// and the index of that right-hand expression.
    fn assignment_of(&self, test: FunctionId, call: &Value) -> Option<(&'p AssignStmt, usize)> {
        let body = self.program.func_decl(test)?.body.as_ref()?;
        let mut best: Option<(&'p AssignStmt, usize)> = None;
        inspect_block(body, &mut |node| {
            if let Node::Stmt(Stmt::Assign(assign)) = node {
                for (i, rhs) in assign.rhs.iter().enumerate() {
                    let span = rhs.span();
                    if !span.contains(call.pos) || matches!(rhs.unparen(), Expr::FuncLit(_)) {
                        continue;
                    }
                    let narrower = best.map_or(true, |(b, j)| span.len() < b.rhs[j].span().len());
                    if narrower {
                        best = Some((assign, i));
                    }
                }
            }
            true
        });
        best
    }

    fn trace_mutations(&self, target: FunctionId, call: &CallInstr, effects: &[SideEffect], bridge: &mut Bridge) {
        let signature = &self.program.dataflow.function(target).signature;
        let offset = usize::from(call.has_receiver);
        let mut reference_params = signature
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_reference())
            .map(|(i, _)| i);

        for (idx, effect) in effects.iter().enumerate() {
            if !effect.kind.is_mutation_kind() {
                continue;
            }
            let arg = if effect.kind.is_receiver_mutation() {
                if !call.has_receiver {
                    continue;
                }
                0
            } else {
                let named = effect.target.as_deref().and_then(|t| signature.param_index(t));
                match named.or_else(|| reference_params.next()) {
                    Some(param) => param + offset,
                    None => continue,
                }
            };
            let Some(object) = call.args.get(arg).and_then(|v| self.source_object(*v)) else {
                continue;
            };
            bridge.entry(object).or_default().push(idx);
        }
    }

    /// Exact-position lookup of the variable a value reads, looking through
    /// one address-of or dereference.
    fn source_object(&self, id: ValueId) -> Option<ObjectId> {
        let types = &self.program.types;
        let value = self.program.dataflow.value(id);
        let object = match types.object_at(value.pos) {
            Some(object) => object,
            None => match value.kind {
                ValueKind::AddressOf { operand } | ValueKind::Deref { operand } if !value.pos.is_valid() => {
                    types.object_at(self.program.dataflow.value(operand).pos)?
                }
                _ => return None,
            },
        };
        matches!(types.object(object).kind, ObjectKind::Var | ObjectKind::Param).then_some(object)
    }
}

/// Result position of each return effect. Error effects go to `error`
/// results, the rest to the remaining results in order; an effect with no
/// result of its kind has no slot. When the result types are unknown,
/// effects take positions in catalogue order.
fn return_slots(effects: &[SideEffect], results: &[String]) -> Vec<Vec<usize>> {
    let returns: Vec<usize> = effects
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind.is_return_kind())
        .map(|(i, _)| i)
        .collect();

    if results.is_empty() {
        let mut slots = vec![Vec::new(); returns.len()];
        for (slot, idx) in returns.into_iter().enumerate() {
            slots[slot].push(idx);
        }
        return slots;
    }

    let mut slots = vec![Vec::new(); results.len()];
    let (error_positions, value_positions): (Vec<usize>, Vec<usize>) =
        (0..results.len()).partition(|&i| results[i].trim() == "error");
    let (mut next_error, mut next_value) = (0, 0);
    for idx in returns {
        let (positions, next) = if effects[idx].kind.is_error_kind() {
            (&error_positions, &mut next_error)
        } else {
            (&value_positions, &mut next_value)
        };
        if positions.is_empty() {
            continue;
        }
        let slot = positions[(*next).min(positions.len() - 1)];
        *next += 1;
        slots[slot].push(idx);
    }
    slots
}

/// Return effects sitting in result positions nobody reads.
fn discarded_effects(mapper: &Mapper<'_>, value: &Value, call: &CallInstr, slots: &[Vec<usize>]) -> Vec<usize> {
    let dataflow = &mapper.program.dataflow;
    let unused: Vec<usize> = match call.result_count {
        0 => Vec::new(),
        1 if value.referrers.is_empty() => vec![0],
        1 => Vec::new(),
        n => {
            let mut consumed = vec![false; n];
            for referrer in &value.referrers {
                match dataflow.value(*referrer).kind {
                    ValueKind::Extract { index, .. } if index < n => consumed[index] = true,
                    _ => return Vec::new(),
                }
            }
            (0..n).filter(|i| !consumed[*i]).collect()
        }
    };
    let mut out: Vec<usize> = unused
        .into_iter()
        .filter_map(|slot| slots.get(slot))
        .flatten()
        .copied()
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn is_size_query(call: &CallExpr) -> bool {
    matches!(call.func.as_ident(), Some(f) if f.name == "len" || f.name == "cap") && call.args.len() == 1
}

fn traced(mapper: &Mapper<'_>, ident: &Ident, bridge: &Bridge) -> Option<ObjectId> {
    let object = mapper.program.types.object_of(ident)?;
    bridge.contains_key(&object).then_some(object)
}

/// Pass 1: a traced identifier read directly. Field, index, and size
/// sub-expressions are left to the composite pass.
fn pass_direct(mapper: &Mapper<'_>, expr: &Expr, bridge: &Bridge) -> Option<usize> {
    match expr {
        Expr::Ident(ident) => {
            let object = traced(mapper, ident, bridge)?;
            bridge.get(&object).and_then(|effects| effects.first().copied())
        }
        Expr::Selector(_) | Expr::Index(_) | Expr::FuncLit(_) => None,
        Expr::Call(call) if is_size_query(call) => None,
        Expr::Call(call) => {
            let callee = match call.func.unparen() {
                Expr::Selector(sel) => pass_direct(mapper, &sel.operand, bridge),
                other => pass_direct(mapper, other, bridge),
            };
            callee.or_else(|| call.args.iter().find_map(|a| pass_direct(mapper, a, bridge)))
        }
        other => other
            .children()
            .into_iter()
            .find_map(|child| pass_direct(mapper, child, bridge)),
    }
}

/// Pass 2: field access, indexing, and size queries, unwound to the
/// variable they read from.
fn pass_composite(mapper: &Mapper<'_>, expr: &Expr, bridge: &Bridge, effects: &[SideEffect]) -> Option<usize> {
    let is_composite = match expr {
        Expr::Selector(_) | Expr::Index(_) => true,
        Expr::Call(call) => is_size_query(call),
        _ => false,
    };
    if is_composite {
        let mut fields = Vec::new();
        let mut cursor = expr;
        let root = loop {
            match cursor {
                Expr::Selector(sel) => {
                    fields.push(sel.field.name.as_str());
                    cursor = &sel.operand;
                }
                Expr::Index(index) => cursor = &index.operand,
                Expr::Call(call) if is_size_query(call) => cursor = &call.args[0],
                Expr::Paren(inner, _) => cursor = inner,
                Expr::Unary(unary) if matches!(unary.op, UnaryOp::Deref | UnaryOp::AddressOf) => {
                    cursor = &unary.operand
                }
                Expr::Ident(ident) => break Some(ident),
                _ => break None,
            }
        };
        if let Some(object) = root.and_then(|ident| traced(mapper, ident, bridge)) {
            let candidates = bridge.get(&object)?;
            let preferred = candidates.iter().copied().find(|&i| {
                effects[i]
                    .target
                    .as_deref()
                    .is_some_and(|t| fields.contains(&t))
            });
            return preferred.or_else(|| candidates.first().copied());
        }
    }
    if let Expr::FuncLit(_) = expr {
        return None;
    }
    expr.children()
        .into_iter()
        .find_map(|child| pass_composite(mapper, child, bridge, effects))
}
