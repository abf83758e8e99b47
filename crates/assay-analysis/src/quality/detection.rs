//! Assertion-site detection over a test function's syntax tree.
//!
//! Three idiom families are recognized: `if <comparison> { t.Error(...) }`,
//! fluent calls such as `assert.Equal(t, ...)`, and diff calls such as
//! `cmp.Diff(want, got)`. Sub-test literals passed to `t.Run` are walked as
//! part of their parent. Same-package helpers taking a test context are
//! walked one level deeper, up to the configured depth.

use assay_core::types::collections::{FxHashMap, FxHashSet};

use super::types::{AssertionKind, AssertionSite};
use super::vocabulary::Vocabulary;
use crate::model::dataflow::FunctionId;
use crate::model::objects::{ObjectId, ObjectKind};
use crate::model::position::Pos;
use crate::model::program::Program;
use crate::model::syntax::{
    inspect_block, BinaryExpr, Block, CallExpr, Expr, FuncDecl, Ident, LitKind, Node, Stmt,
};

pub struct Detector<'p> {
    program: &'p Program,
    vocab: &'p Vocabulary,
    max_helper_depth: u32,
}

#[derive(Clone, Copy)]
struct Scope {
    enclosing: FunctionId,
    depth: u32,
}

type HelperKey = (String, u32);

/// A diff call assigned to a variable. It becomes a site once the variable
/// is checked against empty, and only the first check counts.
#[derive(Clone, Copy)]
struct PendingDiff<'p> {
    pos: Pos,
    expr: &'p Expr,
    scope: Scope,
    reported: bool,
}

#[derive(Default)]
struct Walk<'p> {
    sites: Vec<AssertionSite<'p>>,
    /// Shallowest depth each helper has been reached at, kept across passes.
    shallowest: FxHashMap<HelperKey, u32>,
    /// Helpers entered during the current pass.
    entered: FxHashSet<HelperKey>,
    /// Set when a helper already entered is reached again at a smaller depth.
    revisit: bool,
    subtests: FxHashSet<Pos>,
    diff_vars: FxHashMap<ObjectId, PendingDiff<'p>>,
}

enum Condition<'p> {
    Site(AssertionKind, &'p Expr),
    /// A diff variable compared against `""`; the diff call is the site.
    DiffVar(ObjectId),
}

impl<'p> Detector<'p> {
    pub fn new(program: &'p Program, vocab: &'p Vocabulary, max_helper_depth: u32) -> Self {
        Self {
            program,
            vocab,
            max_helper_depth,
        }
    }

    /// Assertion sites of a declared test function, in traversal order.
    pub fn detect(&self, test: FunctionId) -> Vec<AssertionSite<'p>> {
        let Some(body) = self.program.func_decl(test).and_then(|d| d.body.as_ref()) else {
            return Vec::new();
        };
        let scope = Scope {
            enclosing: test,
            depth: 0,
        };
        // Repeat until every helper is walked at the shallowest depth it is
        // reachable at, so sites do not depend on call order.
        let mut shallowest = FxHashMap::default();
        loop {
            let mut walk = Walk {
                shallowest,
                ..Walk::default()
            };
            self.block(body, scope, &mut walk);
            if !walk.revisit {
                return walk.sites;
            }
            shallowest = walk.shallowest;
        }
    }

    fn block(&self, block: &'p Block, scope: Scope, walk: &mut Walk<'p>) {
        for stmt in &block.stmts {
            self.stmt(stmt, scope, walk);
        }
    }

    fn stmt(&self, stmt: &'p Stmt, scope: Scope, walk: &mut Walk<'p>) {
        match stmt {
            Stmt::Expr(e) => self.expr(e, scope, walk),
            Stmt::Assign(assign) => {
                for (i, rhs) in assign.rhs.iter().enumerate() {
                    let Some(call) = rhs.as_call().filter(|c| self.is_diff_call(c)) else {
                        self.expr(rhs, scope, walk);
                        continue;
                    };
                    let lhs = if assign.lhs.len() == assign.rhs.len() {
                        assign.lhs.get(i)
                    } else {
                        assign.lhs.first()
                    };
                    if let Some(id) = lhs
                        .and_then(Expr::as_ident)
                        .and_then(|ident| self.program.types.object_of(ident))
                    {
                        let pending = PendingDiff {
                            pos: call.span.start,
                            expr: rhs,
                            scope,
                            reported: false,
                        };
                        walk.diff_vars.insert(id, pending);
                    }
                }
            }
            Stmt::If(if_stmt) => {
                if let Some(init) = &if_stmt.init {
                    self.stmt(init, scope, walk);
                }
                if self.reports_failure(&if_stmt.then_block) {
                    match self.classify_condition(&if_stmt.cond, walk) {
                        Condition::Site(kind, expr) => {
                            self.push(walk, if_stmt.span.start, kind, expr, scope);
                        }
                        Condition::DiffVar(id) => self.push_diff(walk, id),
                    }
                } else {
                    self.expr(&if_stmt.cond, scope, walk);
                }
                self.block(&if_stmt.then_block, scope, walk);
                if let Some(else_stmt) = &if_stmt.else_stmt {
                    self.stmt(else_stmt, scope, walk);
                }
            }
            Stmt::For(for_stmt) => {
                if let Some(init) = &for_stmt.init {
                    self.stmt(init, scope, walk);
                }
                if let Some(cond) = &for_stmt.cond {
                    self.expr(cond, scope, walk);
                }
                if let Some(post) = &for_stmt.post {
                    self.stmt(post, scope, walk);
                }
                self.block(&for_stmt.body, scope, walk);
            }
            Stmt::Range(range) => {
                self.expr(&range.expr, scope, walk);
                self.block(&range.body, scope, walk);
            }
            Stmt::Switch(switch) => {
                if let Some(init) = &switch.init {
                    self.stmt(init, scope, walk);
                }
                if let Some(tag) = &switch.tag {
                    self.expr(tag, scope, walk);
                }
                for clause in &switch.clauses {
                    for e in &clause.exprs {
                        self.expr(e, scope, walk);
                    }
                    for st in &clause.body {
                        self.stmt(st, scope, walk);
                    }
                }
            }
            Stmt::Block(block) => self.block(block, scope, walk),
            Stmt::Return { results, .. } => {
                for e in results {
                    self.expr(e, scope, walk);
                }
            }
            Stmt::Defer { call, .. } | Stmt::Go { call, .. } => self.expr(call, scope, walk),
            Stmt::IncDec { target, .. } => self.expr(target, scope, walk),
            Stmt::Other { exprs, stmts, .. } => {
                for e in exprs {
                    self.expr(e, scope, walk);
                }
                for st in stmts {
                    self.stmt(st, scope, walk);
                }
            }
        }
    }

    fn expr(&self, expr: &'p Expr, scope: Scope, walk: &mut Walk<'p>) {
        match expr {
            Expr::Call(call) => {
                if let Some(kind) = self.fluent_kind(call) {
                    let checked = call.args.iter().find_map(|arg| self.pending_diff(arg, walk));
                    match checked {
                        Some(id) => self.push_diff(walk, id),
                        None => self.push(walk, call.span.start, kind, expr, scope),
                    }
                    return;
                }
                if self.subtest(call, scope, walk) || self.helper(call, scope, walk) {
                    return;
                }
                self.expr(&call.func, scope, walk);
                for arg in &call.args {
                    self.expr(arg, scope, walk);
                }
            }
            Expr::FuncLit(lit) => {
                let inner = Scope {
                    enclosing: self.closure_at(scope.enclosing, lit.span.start),
                    depth: scope.depth,
                };
                self.block(&lit.body, inner, walk);
            }
            other => {
                for child in other.children() {
                    self.expr(child, scope, walk);
                }
            }
        }
    }

    fn push(&self, walk: &mut Walk<'p>, pos: Pos, kind: AssertionKind, expr: &'p Expr, scope: Scope) {
        walk.sites.push(AssertionSite {
            pos,
            location: self.program.location(pos),
            kind,
            enclosing: scope.enclosing,
            depth: scope.depth,
            expr,
        });
    }

    /// Reports a pending diff once, at the diff call.
    fn push_diff(&self, walk: &mut Walk<'p>, id: ObjectId) {
        let Some(diff) = walk.diff_vars.get_mut(&id) else {
            return;
        };
        if diff.reported {
            return;
        }
        diff.reported = true;
        let diff = *diff;
        self.push(walk, diff.pos, AssertionKind::StructuralDiff, diff.expr, diff.scope);
    }

    fn pending_diff(&self, expr: &Expr, walk: &Walk<'p>) -> Option<ObjectId> {
        let id = self.program.types.object_of(expr.unparen().as_ident()?)?;
        walk.diff_vars.contains_key(&id).then_some(id)
    }

    /// `t.Run(name, func(t *testing.T) {...})`: walked at the parent's depth.
    fn subtest(&self, call: &'p CallExpr, scope: Scope, walk: &mut Walk<'p>) -> bool {
        let Expr::Selector(sel) = call.func.unparen() else {
            return false;
        };
        if call.args.len() != 2 || !self.vocab.is_subtest_method(&sel.field.name) {
            return false;
        }
        let Some(ctx) = sel.operand.as_ident() else {
            return false;
        };
        let Expr::FuncLit(lit) = call.args[1].unparen() else {
            return false;
        };
        if !self.is_context_ident(ctx) {
            return false;
        }
        if walk.subtests.insert(lit.span.start) {
            self.expr(&call.args[0], scope, walk);
            let inner = Scope {
                enclosing: self.closure_at(scope.enclosing, lit.span.start),
                depth: scope.depth,
            };
            self.block(&lit.body, inner, walk);
        }
        true
    }

    /// A same-package function with a test-context parameter.
    fn helper(&self, call: &'p CallExpr, scope: Scope, walk: &mut Walk<'p>) -> bool {
        let Some((func, decl)) = self.helper_decl(call, scope.enclosing) else {
            return false;
        };
        let Some(body) = &decl.body else {
            return false;
        };
        for arg in &call.args {
            self.expr(arg, scope, walk);
        }
        let depth = scope.depth + 1;
        if depth > self.max_helper_depth {
            return true;
        }
        let key = (
            decl.name.name.clone(),
            self.program.fileset.line(decl.name.pos),
        );
        let best = walk.shallowest.entry(key.clone()).or_insert(depth);
        if depth < *best {
            *best = depth;
            if walk.entered.contains(&key) {
                walk.revisit = true;
                return true;
            }
        }
        if depth == *best && walk.entered.insert(key) {
            self.block(
                body,
                Scope {
                    enclosing: func,
                    depth,
                },
                walk,
            );
        }
        true
    }

    fn helper_decl(&self, call: &CallExpr, enclosing: FunctionId) -> Option<(FunctionId, &'p FuncDecl)> {
        let name_pos = match call.func.unparen() {
            Expr::Ident(ident) => ident.pos,
            Expr::Selector(sel) => sel.field.pos,
            _ => return None,
        };
        let types = &self.program.types;
        let object = types.object_at(name_pos)?;
        if types.object(object).kind != ObjectKind::Func {
            return None;
        }
        let func = self.program.function_of_object(object)?;
        let caller = &self.program.dataflow.function(enclosing).package;
        let callee = &self.program.dataflow.function(func).package;
        let same_package = callee == caller || caller.strip_suffix("_test") == Some(callee.as_str());
        if !same_package {
            return None;
        }
        let decl = self.program.func_decl(func)?;
        decl.params
            .iter()
            .any(|p| self.vocab.is_context_type(&p.type_text))
            .then_some((func, decl))
    }

    /// The closure function created for a literal at `pos`, searched among
    /// the descendants of `parent`. Falls back to `parent`.
    fn closure_at(&self, parent: FunctionId, pos: Pos) -> FunctionId {
        let dataflow = &self.program.dataflow;
        let mut stack = vec![parent];
        while let Some(func) = stack.pop() {
            for &closure in &dataflow.function(func).anon_funcs {
                if dataflow.function(closure).pos == pos {
                    return closure;
                }
                stack.push(closure);
            }
        }
        parent
    }

    fn fluent_kind(&self, call: &CallExpr) -> Option<AssertionKind> {
        let Expr::Selector(sel) = call.func.unparen() else {
            return None;
        };
        let alias = sel.operand.as_ident()?;
        if !self.vocab.is_assertion_alias(&alias.name) {
            return None;
        }
        let method = sel.field.name.as_str();
        if self.vocab.is_error_method(method) {
            Some(AssertionKind::FluentError)
        } else if self.vocab.is_equality_method(method) {
            Some(AssertionKind::FluentEquality)
        } else {
            None
        }
    }

    fn is_diff_call(&self, call: &CallExpr) -> bool {
        let Expr::Selector(sel) = call.func.unparen() else {
            return false;
        };
        let Some(pkg) = sel.operand.as_ident() else {
            return false;
        };
        call.args.len() >= 2 && self.vocab.is_diff_function(&pkg.name, &sel.field.name)
    }

    fn is_context_ident(&self, ident: &Ident) -> bool {
        let types = &self.program.types;
        match types.object_of(ident).and_then(|id| types.object(id).type_text.as_deref()) {
            Some(type_text) => self.vocab.is_context_type(type_text),
            None => self.vocab.is_context_name(&ident.name),
        }
    }

    fn is_failure_call(&self, expr: &Expr) -> bool {
        let Some(call) = expr.as_call() else {
            return false;
        };
        let Expr::Selector(sel) = call.func.unparen() else {
            return false;
        };
        self.vocab.is_failure_method(&sel.field.name)
            && sel.operand.as_ident().is_some_and(|ctx| self.is_context_ident(ctx))
    }

    /// True when the block calls a failure-reporting method outside any
    /// nested function literal.
    fn reports_failure(&self, block: &Block) -> bool {
        let mut found = false;
        inspect_block(block, &mut |node| {
            if found {
                return false;
            }
            match node {
                Node::Expr(Expr::FuncLit(_)) => false,
                Node::Expr(e) if self.is_failure_call(e) => {
                    found = true;
                    false
                }
                _ => true,
            }
        });
        found
    }

    fn classify_condition(&self, cond: &'p Expr, walk: &Walk<'p>) -> Condition<'p> {
        let cond = cond.unparen();
        let Some(cmp) = first_comparison(cond) else {
            return Condition::Site(AssertionKind::Unrecognized, cond);
        };
        let (left, right) = (cmp.left.unparen(), cmp.right.unparen());
        for operand in [left, right] {
            if operand.as_call().is_some_and(|c| self.is_diff_call(c)) {
                return Condition::Site(AssertionKind::StructuralDiff, operand);
            }
        }
        let diff_var = if is_empty_string(right) {
            self.pending_diff(left, walk)
        } else if is_empty_string(left) {
            self.pending_diff(right, walk)
        } else {
            None
        };
        if let Some(id) = diff_var {
            return Condition::DiffVar(id);
        }
        if mentions_err(left) || mentions_err(right) {
            Condition::Site(AssertionKind::RawNilCheck, cond)
        } else {
            Condition::Site(AssertionKind::RawComparison, cond)
        }
    }
}

/// The comparison itself, or the first comparison of a `&&`/`||` chain.
fn first_comparison(expr: &Expr) -> Option<&BinaryExpr> {
    match expr.unparen() {
        Expr::Binary(bin) if bin.op.is_comparison() => Some(bin),
        Expr::Binary(bin) if bin.op.is_logical() => {
            first_comparison(&bin.left).or_else(|| first_comparison(&bin.right))
        }
        _ => None,
    }
}

fn is_empty_string(expr: &Expr) -> bool {
    matches!(expr.unparen(), Expr::Lit(lit) if lit.kind == LitKind::String && lit.is_empty_string())
}

fn mentions_err(expr: &Expr) -> bool {
    let name = match expr.unparen() {
        Expr::Ident(ident) => &ident.name,
        Expr::Selector(sel) => &sel.field.name,
        _ => return false,
    };
    name.to_ascii_lowercase().contains("err")
}
