//! Lowering of resolved function bodies into the dataflow graph.
//!
//! One `Function` per declaration, plus one per function literal
//! (`Parent$1`, `Parent$2`, ...). Calls to declared functions and resolved
//! methods become static calls; method receivers are the first argument.

use assay_core::types::collections::{FxHashMap, FxHashSet};

use crate::model::dataflow::{
    CallInstr, Callee, Dataflow, Function, FunctionId, FunctionRole, SigParam, Signature, ValueId,
    ValueKind,
};
use crate::model::objects::{ObjectId, ObjectKind, TypeInfo};
use crate::model::position::Pos;
use crate::model::program::{DeclRef, Package};
use crate::model::syntax::{
    Block, CallExpr, Expr, FuncDecl, FuncLit, Ident, Param, Stmt, SyntaxFile,
    UnaryOp,
};

pub(crate) struct LoweredProgram {
    pub dataflow: Dataflow,
    pub decls: FxHashMap<FunctionId, DeclRef>,
    pub func_objects: FxHashMap<ObjectId, FunctionId>,
}

const VALUE_BUILTINS: &[&str] = &[
    "append", "cap", "complex", "copy", "imag", "len", "make", "max", "min", "new", "real",
    "recover",
];

fn sig_param(param: &Param) -> SigParam {
    SigParam {
        name: param.name.as_ref().map(|n| n.name.clone()),
        type_text: param.type_text.clone(),
    }
}

fn qualified_name(package: &str, decl: &FuncDecl) -> String {
    match decl.receiver_base_type() {
        Some(base) if decl.has_pointer_receiver() => {
            format!("(*{package}.{base}).{}", decl.name.name)
        }
        Some(base) => format!("({package}.{base}).{}", decl.name.name),
        None => format!("{package}.{}", decl.name.name),
    }
}

pub(crate) fn lower_program(
    files: &[SyntaxFile],
    packages: &[Package],
    types: &TypeInfo,
) -> LoweredProgram {
    let mut dataflow = Dataflow::new();
    let mut decls = FxHashMap::default();
    let mut func_objects = FxHashMap::default();
    let mut globals = FxHashSet::default();

    for package in packages {
        for &file_idx in &package.files {
            let file = &files[file_idx];
            for global in &file.globals {
                if let Some(id) = types.def_at(global.name.pos) {
                    globals.insert(id);
                }
            }
            for (index, decl) in file.funcs.iter().enumerate() {
                let in_test_file = file.is_test_file();
                let mut role = match decl.recv {
                    Some(_) => FunctionRole::Regular,
                    None => FunctionRole::classify(&decl.name.name, in_test_file),
                };
                if matches!(
                    role,
                    FunctionRole::Test | FunctionRole::Benchmark | FunctionRole::Fuzz
                ) && decl.params.len() != 1
                {
                    role = FunctionRole::Regular;
                }
                let object = types.def_at(decl.name.pos);
                let id = dataflow.add_function(Function {
                    id: FunctionId(0),
                    name: decl.name.name.clone(),
                    package: package.path.clone(),
                    qualified_name: qualified_name(&package.path, decl),
                    pos: decl.name.pos,
                    span: decl.span,
                    signature: Signature {
                        receiver: decl.recv.as_ref().map(sig_param),
                        params: decl.params.iter().map(sig_param).collect(),
                        results: decl.results.clone(),
                    },
                    role,
                    parent: None,
                    anon_funcs: Vec::new(),
                    in_test_file,
                    instrs: Vec::new(),
                    object,
                });
                decls.insert(id, DeclRef { file: file_idx, index });
                if let Some(object) = object {
                    func_objects.insert(object, id);
                }
            }
        }
    }

    let mut ordered: Vec<(FunctionId, DeclRef)> = decls.iter().map(|(f, d)| (*f, *d)).collect();
    ordered.sort_by_key(|(f, _)| *f);
    for (func, decl_ref) in ordered {
        let decl = &files[decl_ref.file].funcs[decl_ref.index];
        let Some(body) = &decl.body else {
            continue;
        };
        let mut lowerer = BodyLowerer {
            dataflow: &mut dataflow,
            types,
            func_objects: &func_objects,
            globals: &globals,
            func,
        };
        lowerer.block(body);
    }

    LoweredProgram {
        dataflow,
        decls,
        func_objects,
    }
}

struct BodyLowerer<'l> {
    dataflow: &'l mut Dataflow,
    types: &'l TypeInfo,
    func_objects: &'l FxHashMap<ObjectId, FunctionId>,
    globals: &'l FxHashSet<ObjectId>,
    func: FunctionId,
}

impl BodyLowerer<'_> {
    fn emit(&mut self, pos: Pos, kind: ValueKind) -> ValueId {
        self.dataflow.push_value(self.func, pos, kind)
    }

    fn block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => {
                self.expr(e);
            }
            Stmt::Assign(assign) => {
                if assign.lhs.len() > 1 && assign.rhs.len() == 1 {
                    let rhs = &assign.rhs[0];
                    let tuple = match rhs.as_call() {
                        Some(call) => self.call(call, Some(assign.lhs.len())),
                        None => self.expr(rhs),
                    };
                    for (index, lhs) in assign.lhs.iter().enumerate() {
                        if lhs.is_blank() {
                            continue;
                        }
                        let part = self.emit(lhs.pos(), ValueKind::Extract { tuple, index });
                        self.store(lhs, part);
                    }
                } else {
                    for (i, rhs) in assign.rhs.iter().enumerate() {
                        let value = self.expr(rhs);
                        if let Some(lhs) = assign.lhs.get(i) {
                            if !lhs.is_blank() {
                                self.store(lhs, value);
                            }
                        }
                    }
                }
            }
            Stmt::If(if_stmt) => {
                if let Some(init) = &if_stmt.init {
                    self.stmt(init);
                }
                let cond = self.expr(&if_stmt.cond);
                self.emit(if_stmt.cond.pos(), ValueKind::Branch { cond });
                self.block(&if_stmt.then_block);
                if let Some(else_stmt) = &if_stmt.else_stmt {
                    self.stmt(else_stmt);
                }
            }
            Stmt::For(for_stmt) => {
                if let Some(init) = &for_stmt.init {
                    self.stmt(init);
                }
                if let Some(cond) = &for_stmt.cond {
                    let cond_value = self.expr(cond);
                    self.emit(cond.pos(), ValueKind::Branch { cond: cond_value });
                }
                self.block(&for_stmt.body);
                if let Some(post) = &for_stmt.post {
                    self.stmt(post);
                }
            }
            Stmt::Range(range) => {
                let source = self.expr(&range.expr);
                let next = self.emit(
                    range.span.start,
                    ValueKind::Op {
                        operands: vec![source],
                    },
                );
                for target in range.key.iter().chain(range.value.iter()) {
                    if !target.is_blank() {
                        self.store(target, next);
                    }
                }
                self.block(&range.body);
            }
            Stmt::Switch(switch) => {
                if let Some(init) = &switch.init {
                    self.stmt(init);
                }
                if let Some(tag) = &switch.tag {
                    let cond = self.expr(tag);
                    self.emit(tag.pos(), ValueKind::Branch { cond });
                }
                for clause in &switch.clauses {
                    for e in &clause.exprs {
                        let cond = self.expr(e);
                        self.emit(e.pos(), ValueKind::Branch { cond });
                    }
                    for st in &clause.body {
                        self.stmt(st);
                    }
                }
            }
            Stmt::Block(block) => self.block(block),
            Stmt::Return { span, results } => {
                let results = results.iter().map(|r| self.expr(r)).collect();
                self.emit(span.start, ValueKind::Return { results });
            }
            Stmt::Defer { call, .. } | Stmt::Go { call, .. } => {
                self.expr(call);
            }
            Stmt::IncDec { span, target } => {
                let operand = self.expr(target);
                self.emit(
                    span.start,
                    ValueKind::Op {
                        operands: vec![operand],
                    },
                );
            }
            Stmt::Other { exprs, stmts, .. } => {
                for e in exprs {
                    self.expr(e);
                }
                for st in stmts {
                    self.stmt(st);
                }
            }
        }
    }

    /// Assignment of `value` to `target`.
    fn store(&mut self, target: &Expr, value: ValueId) {
        if let Some(ident) = target.as_ident() {
            if let Some(object) = self.types.object_of(ident) {
                self.emit(ident.pos, ValueKind::Bind { object, source: value });
                return;
            }
        }
        let place = self.expr(target);
        self.emit(
            target.pos(),
            ValueKind::Op {
                operands: vec![place, value],
            },
        );
    }

    fn ident(&mut self, ident: &Ident) -> ValueId {
        let Some(id) = self.types.object_of(ident) else {
            return self.emit(Pos::NONE, ValueKind::Const);
        };
        let object = self.types.object(id);
        let (pos, kind) = match object.kind {
            ObjectKind::Var | ObjectKind::Param if self.globals.contains(&id) => {
                (object.pos, ValueKind::Global { object: id })
            }
            ObjectKind::Var | ObjectKind::Param => (object.pos, ValueKind::Local { object: id }),
            ObjectKind::Func => (object.pos, ValueKind::Global { object: id }),
            _ => (Pos::NONE, ValueKind::Const),
        };
        self.emit(pos, kind)
    }

    fn op(&mut self, pos: Pos, operands: Vec<ValueId>) -> ValueId {
        self.emit(pos, ValueKind::Op { operands })
    }

    fn expr(&mut self, expr: &Expr) -> ValueId {
        match expr {
            Expr::Ident(ident) => self.ident(ident),
            Expr::Lit(lit) => self.emit(lit.span.start, ValueKind::Const),
            Expr::Type(_) => self.emit(Pos::NONE, ValueKind::Const),
            Expr::Call(call) => self.call(call, None),
            Expr::Selector(sel) => {
                if let Some(member) = self.types.use_at(sel.field.pos) {
                    let object = self.types.object(member);
                    let pos = object.pos;
                    return self.emit(pos, ValueKind::Global { object: member });
                }
                let operand = self.expr(&sel.operand);
                self.op(sel.field.pos, vec![operand])
            }
            Expr::Index(index) => {
                let operand = self.expr(&index.operand);
                let key = self.expr(&index.index);
                self.op(index.span.start, vec![operand, key])
            }
            Expr::Binary(bin) => {
                let left = self.expr(&bin.left);
                let right = self.expr(&bin.right);
                self.op(bin.span.start, vec![left, right])
            }
            Expr::Unary(unary) => {
                let operand = self.expr(&unary.operand);
                match unary.op {
                    UnaryOp::AddressOf => self.emit(Pos::NONE, ValueKind::AddressOf { operand }),
                    UnaryOp::Deref => self.emit(Pos::NONE, ValueKind::Deref { operand }),
                    _ => self.op(unary.span.start, vec![operand]),
                }
            }
            Expr::Paren(inner, _) => self.expr(inner),
            Expr::FuncLit(lit) => {
                let func = self.closure(lit);
                self.emit(lit.span.start, ValueKind::MakeClosure { func })
            }
            Expr::Composite(lit) => {
                let elements = lit.elements.iter().map(|e| self.expr(e)).collect();
                self.op(lit.span.start, elements)
            }
            Expr::KeyValue(kv) => self.expr(&kv.value),
            Expr::Other(other) => {
                let children = other.children.iter().map(|c| self.expr(c)).collect();
                self.op(other.span.start, children)
            }
        }
    }

    fn closure(&mut self, lit: &FuncLit) -> FunctionId {
        let parent = self.dataflow.function(self.func);
        let index = parent.anon_funcs.len() + 1;
        let function = Function {
            id: FunctionId(0),
            name: format!("{}${index}", parent.name),
            package: parent.package.clone(),
            qualified_name: format!("{}${index}", parent.qualified_name),
            pos: lit.span.start,
            span: lit.span,
            signature: Signature {
                receiver: None,
                params: lit.params.iter().map(sig_param).collect(),
                results: lit.results.clone(),
            },
            role: FunctionRole::Regular,
            parent: Some(self.func),
            anon_funcs: Vec::new(),
            in_test_file: parent.in_test_file,
            instrs: Vec::new(),
            object: None,
        };
        let id = self.dataflow.add_function(function);
        let mut inner = BodyLowerer {
            dataflow: &mut *self.dataflow,
            types: self.types,
            func_objects: self.func_objects,
            globals: self.globals,
            func: id,
        };
        inner.block(&lit.body);
        id
    }

    fn static_or_external(&self, object: ObjectId) -> Callee {
        match self.func_objects.get(&object) {
            Some(func) => Callee::Static(*func),
            None => {
                let obj = self.types.object(object);
                Callee::External {
                    package: obj.package.clone(),
                    name: obj.name.clone(),
                }
            }
        }
    }

    fn result_count(&self, callee: &Callee, hint: Option<usize>) -> usize {
        match callee {
            Callee::Static(func) | Callee::Closure(func) => {
                self.dataflow.function(*func).signature.results.len()
            }
            Callee::Builtin(name) => usize::from(VALUE_BUILTINS.contains(&name.as_str())),
            Callee::External { .. } | Callee::Dynamic => hint.unwrap_or(1),
        }
    }

    fn call(&mut self, call: &CallExpr, hint: Option<usize>) -> ValueId {
        let mut args = Vec::with_capacity(call.args.len() + 1);
        let mut has_receiver = false;

        let callee = match call.func.unparen() {
            Expr::Ident(ident) => match self.types.object_of(ident) {
                Some(id) => {
                    let kind = self.types.object(id).kind;
                    match kind {
                        ObjectKind::Func => self.static_or_external(id),
                        ObjectKind::Builtin => Callee::Builtin(ident.name.clone()),
                        ObjectKind::TypeName => return self.conversion(call),
                        _ => {
                            self.ident(ident);
                            Callee::Dynamic
                        }
                    }
                }
                None => Callee::External {
                    package: String::new(),
                    name: ident.name.clone(),
                },
            },
            Expr::Selector(sel) => {
                if let Some(member) = self.types.use_at(sel.field.pos) {
                    let kind = self.types.object(member).kind;
                    match kind {
                        ObjectKind::Func => self.static_or_external(member),
                        ObjectKind::TypeName => return self.conversion(call),
                        _ => {
                            self.expr(&call.func);
                            Callee::Dynamic
                        }
                    }
                } else if let Some(pkg) = self.package_operand(&sel.operand) {
                    Callee::External {
                        package: pkg,
                        name: sel.field.name.clone(),
                    }
                } else {
                    let recv_type = self.types.type_of(sel.operand.span()).cloned();
                    let receiver = self.expr(&sel.operand);
                    args.push(receiver);
                    has_receiver = true;
                    match recv_type {
                        Some(t) => match self
                            .types
                            .lookup_method(&t, &sel.field.name)
                            .and_then(|m| self.func_objects.get(&m).copied())
                        {
                            Some(func) => Callee::Static(func),
                            None => Callee::External {
                                package: t.package.clone(),
                                name: format!("{}.{}", t.name, sel.field.name),
                            },
                        },
                        None => Callee::Dynamic,
                    }
                }
            }
            Expr::FuncLit(lit) => Callee::Closure(self.closure(lit)),
            other => {
                self.expr(other);
                Callee::Dynamic
            }
        };

        for arg in &call.args {
            let value = self.expr(arg);
            args.push(value);
        }
        let result_count = self.result_count(&callee, hint);
        self.emit(
            call.lparen,
            ValueKind::Call(CallInstr {
                callee,
                args,
                result_count,
                has_receiver,
            }),
        )
    }

    /// `T(x)` is a conversion, not a call.
    fn conversion(&mut self, call: &CallExpr) -> ValueId {
        let operands = call.args.iter().map(|a| self.expr(a)).collect();
        self.op(call.span.start, operands)
    }

    fn package_operand(&self, operand: &Expr) -> Option<String> {
        let ident = operand.as_ident()?;
        let object = self.types.object(self.types.use_at(ident.pos)?);
        (object.kind == ObjectKind::Package).then(|| object.package.clone())
    }
}
