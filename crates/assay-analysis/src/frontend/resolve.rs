//! Scope resolution: fills the type-resolution table.
//!
//! Scopes nest universe < package < file (imports) < function blocks. A
//! `:=` resolves its right-hand side before defining, and only introduces
//! names not already declared in the innermost scope. Expression types are
//! inferred just far enough to find the methods a call resolves to.

use assay_core::types::collections::FxHashMap;

use crate::model::objects::{ObjectId, ObjectKind, TypeInfo, TypeRef};
use crate::model::position::{Pos, Span};
use crate::model::program::Package;
use crate::model::syntax::{
    AssignStmt, Block, CallExpr, Expr, FuncDecl, Ident, ImportSpec, Param, Stmt,
    SyntaxFile, UnaryOp,
};

const BUILTIN_FUNCS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max",
    "min", "new", "panic", "print", "println", "real", "recover",
];

const PREDECLARED_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32", "float64",
    "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr",
];

type Scope = FxHashMap<String, ObjectId>;

/// Canonical type of a type expression written in `package` with `imports`.
pub(crate) fn canonical_type(text: &str, package: &str, imports: &[ImportSpec]) -> TypeRef {
    let trimmed = text.trim().trim_start_matches("...");
    let pointer = trimmed.starts_with('*');
    let inner = trimmed.trim_start_matches('*').trim();

    let composite = ["[", "map[", "chan", "func", "struct", "interface"];
    if composite.iter().any(|p| inner.starts_with(p)) {
        return TypeRef {
            package: String::new(),
            name: inner.to_string(),
            pointer,
        };
    }

    let without_args = inner.split('[').next().unwrap_or(inner);
    let (package, name) = match without_args.split_once('.') {
        Some((qualifier, name)) => {
            let path = imports
                .iter()
                .find(|i| i.local_name() == qualifier)
                .map(|i| i.path.clone())
                .unwrap_or_else(|| qualifier.to_string());
            (path, name.to_string())
        }
        None if PREDECLARED_TYPES.contains(&without_args) => {
            (String::new(), without_args.to_string())
        }
        None => (package.to_string(), without_args.to_string()),
    };
    TypeRef {
        package,
        name,
        pointer,
    }
}

/// Resolve every package of a program into a fresh `TypeInfo`.
pub(crate) fn resolve_program(files: &[SyntaxFile], packages: &[Package]) -> TypeInfo {
    let mut types = TypeInfo::new();
    let universe = universe_scope(&mut types);

    // Package members first, so bodies can refer across files and packages.
    let mut package_scopes: FxHashMap<String, Scope> = FxHashMap::default();
    for package in packages {
        let scope = package_scopes.entry(package.path.clone()).or_default();
        for &file_idx in &package.files {
            declare_members(&mut types, scope, &package.path, &files[file_idx]);
        }
    }

    for package in packages {
        for &file_idx in &package.files {
            let file = &files[file_idx];
            let mut resolver = BodyResolver {
                types: &mut types,
                universe: &universe,
                package_scopes: &package_scopes,
                package: &package.path,
                imports: &file.imports,
                file_scope: Scope::default(),
                scopes: Vec::new(),
                call_results: FxHashMap::default(),
            };
            resolver.declare_imports();
            for decl in &file.funcs {
                resolver.resolve_func(decl);
            }
        }
    }
    types
}

fn universe_scope(types: &mut TypeInfo) -> Scope {
    let mut scope = Scope::default();
    for name in BUILTIN_FUNCS {
        let id = types.new_object(name, ObjectKind::Builtin, Pos::NONE, "", None);
        scope.insert(name.to_string(), id);
    }
    for name in PREDECLARED_TYPES {
        let id = types.new_object(name, ObjectKind::TypeName, Pos::NONE, "", None);
        types.set_type_ref(id, Some(TypeRef::predeclared(name)));
        scope.insert(name.to_string(), id);
    }
    for name in ["true", "false", "iota"] {
        let id = types.new_object(name, ObjectKind::Const, Pos::NONE, "", None);
        scope.insert(name.to_string(), id);
    }
    let nil = types.new_object("nil", ObjectKind::Nil, Pos::NONE, "", None);
    scope.insert("nil".to_string(), nil);
    scope
}

fn declare_members(types: &mut TypeInfo, scope: &mut Scope, package: &str, file: &SyntaxFile) {
    for decl in &file.funcs {
        let id = types.new_object(
            &decl.name.name,
            ObjectKind::Func,
            decl.name.pos,
            package,
            None,
        );
        types.record_def(decl.name.pos, id);
        let results = decl
            .results
            .iter()
            .map(|r| canonical_type(r, package, &file.imports))
            .collect();
        types.set_results(id, results);

        match decl.receiver_base_type() {
            Some(base) => types.add_method(package, &base, &decl.name.name, id),
            None if decl.name.name != "init" && !decl.name.is_blank() => {
                scope.insert(decl.name.name.clone(), id);
            }
            None => {}
        }
    }

    for global in &file.globals {
        if global.name.is_blank() {
            continue;
        }
        let kind = if global.is_const {
            ObjectKind::Const
        } else {
            ObjectKind::Var
        };
        let id = types.new_object(
            &global.name.name,
            kind,
            global.name.pos,
            package,
            global.type_text.clone(),
        );
        types.record_def(global.name.pos, id);
        let type_ref = global
            .type_text
            .as_deref()
            .map(|t| canonical_type(t, package, &file.imports));
        types.set_type_ref(id, type_ref);
        scope.insert(global.name.name.clone(), id);
    }

    for type_name in &file.type_names {
        let id = types.new_object(
            &type_name.name,
            ObjectKind::TypeName,
            type_name.pos,
            package,
            None,
        );
        types.record_def(type_name.pos, id);
        types.set_type_ref(
            id,
            Some(TypeRef {
                package: package.to_string(),
                name: type_name.name.clone(),
                pointer: false,
            }),
        );
        scope.insert(type_name.name.clone(), id);
    }
}

struct BodyResolver<'r> {
    types: &'r mut TypeInfo,
    universe: &'r Scope,
    package_scopes: &'r FxHashMap<String, Scope>,
    package: &'r str,
    imports: &'r [ImportSpec],
    file_scope: Scope,
    scopes: Vec<Scope>,
    /// Result types of every resolved call, by call span.
    call_results: FxHashMap<Span, Vec<TypeRef>>,
}

impl BodyResolver<'_> {
    fn declare_imports(&mut self) {
        for import in self.imports {
            let name = import.local_name();
            if name == "_" || name == "." {
                continue;
            }
            let id = self.types.new_object(
                name,
                ObjectKind::Package,
                import.pos,
                &import.path,
                Some(import.path.clone()),
            );
            self.file_scope.insert(name.to_string(), id);
        }
    }

    fn canonical(&self, text: &str) -> TypeRef {
        canonical_type(text, self.package, self.imports)
    }

    fn lookup(&self, name: &str) -> Option<ObjectId> {
        for scope in self.scopes.iter().rev() {
            if let Some(id) = scope.get(name) {
                return Some(*id);
            }
        }
        self.file_scope
            .get(name)
            .or_else(|| self.package_scopes.get(self.package).and_then(|s| s.get(name)))
            .or_else(|| self.universe.get(name))
            .copied()
    }

    fn define(
        &mut self,
        ident: &Ident,
        kind: ObjectKind,
        type_text: Option<String>,
        type_ref: Option<TypeRef>,
    ) -> Option<ObjectId> {
        if ident.is_blank() {
            return None;
        }
        let id = self
            .types
            .new_object(&ident.name, kind, ident.pos, self.package, type_text);
        self.types.set_type_ref(id, type_ref);
        self.types.record_def(ident.pos, id);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(ident.name.clone(), id);
        }
        Some(id)
    }

    fn define_params(&mut self, params: &[Param]) {
        for param in params {
            if let Some(name) = &param.name {
                let type_ref = Some(self.canonical(&param.type_text));
                self.define(name, ObjectKind::Param, Some(param.type_text.clone()), type_ref);
            }
        }
    }

    fn resolve_func(&mut self, decl: &FuncDecl) {
        let Some(body) = &decl.body else {
            return;
        };
        self.scopes.push(Scope::default());
        if let Some(recv) = &decl.recv {
            self.define_params(std::slice::from_ref(recv));
        }
        self.define_params(&decl.params);
        for stmt in &body.stmts {
            self.resolve_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn resolve_block(&mut self, block: &Block) {
        self.scopes.push(Scope::default());
        for stmt in &block.stmts {
            self.resolve_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => {
                self.resolve_expr(e);
            }
            Stmt::Assign(assign) => self.resolve_assign(assign),
            Stmt::If(if_stmt) => {
                self.scopes.push(Scope::default());
                if let Some(init) = &if_stmt.init {
                    self.resolve_stmt(init);
                }
                self.resolve_expr(&if_stmt.cond);
                self.resolve_block(&if_stmt.then_block);
                if let Some(else_stmt) = &if_stmt.else_stmt {
                    self.resolve_stmt(else_stmt);
                }
                self.scopes.pop();
            }
            Stmt::For(for_stmt) => {
                self.scopes.push(Scope::default());
                if let Some(init) = &for_stmt.init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = &for_stmt.cond {
                    self.resolve_expr(cond);
                }
                if let Some(post) = &for_stmt.post {
                    self.resolve_stmt(post);
                }
                self.resolve_block(&for_stmt.body);
                self.scopes.pop();
            }
            Stmt::Range(range) => {
                self.resolve_expr(&range.expr);
                self.scopes.push(Scope::default());
                for target in range.key.iter().chain(range.value.iter()) {
                    match (range.define, target.as_ident()) {
                        (true, Some(ident)) => {
                            self.define(ident, ObjectKind::Var, None, None);
                        }
                        _ => {
                            self.resolve_expr(target);
                        }
                    }
                }
                self.resolve_block(&range.body);
                self.scopes.pop();
            }
            Stmt::Switch(switch) => {
                self.scopes.push(Scope::default());
                if let Some(init) = &switch.init {
                    self.resolve_stmt(init);
                }
                if let Some(tag) = &switch.tag {
                    self.resolve_expr(tag);
                }
                for clause in &switch.clauses {
                    for e in &clause.exprs {
                        self.resolve_expr(e);
                    }
                    self.scopes.push(Scope::default());
                    for st in &clause.body {
                        self.resolve_stmt(st);
                    }
                    self.scopes.pop();
                }
                self.scopes.pop();
            }
            Stmt::Block(block) => self.resolve_block(block),
            Stmt::Return { results, .. } => {
                for e in results {
                    self.resolve_expr(e);
                }
            }
            Stmt::Defer { call, .. } | Stmt::Go { call, .. } => {
                self.resolve_expr(call);
            }
            Stmt::IncDec { target, .. } => {
                self.resolve_expr(target);
            }
            Stmt::Other { exprs, stmts, .. } => {
                for e in exprs {
                    self.resolve_expr(e);
                }
                for st in stmts {
                    self.resolve_stmt(st);
                }
            }
        }
    }

    fn resolve_assign(&mut self, assign: &AssignStmt) {
        let rhs_types: Vec<Option<TypeRef>> = assign.rhs.iter().map(|r| self.resolve_expr(r)).collect();

        if !assign.define {
            for l in &assign.lhs {
                self.resolve_expr(l);
            }
            return;
        }

        let declared = assign.type_text.as_deref().map(|t| self.canonical(t));
        let tuple = if assign.lhs.len() > 1 && assign.rhs.len() == 1 {
            self.call_results.get(&assign.rhs[0].span()).cloned()
        } else {
            None
        };

        for (i, lhs) in assign.lhs.iter().enumerate() {
            let Some(ident) = lhs.as_ident() else {
                self.resolve_expr(lhs);
                continue;
            };
            if ident.is_blank() {
                continue;
            }
            let existing = self
                .scopes
                .last()
                .and_then(|scope| scope.get(&ident.name))
                .copied();
            if let (Some(id), false) = (existing, assign.type_text.is_some()) {
                self.types.record_use(ident.pos, id);
                continue;
            }
            let type_ref = declared.clone().or_else(|| match &tuple {
                Some(results) => results.get(i).cloned(),
                None => rhs_types.get(i).cloned().flatten(),
            });
            self.define(ident, ObjectKind::Var, assign.type_text.clone(), type_ref);
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Option<TypeRef> {
        let ty = match expr {
            Expr::Ident(ident) => {
                if ident.is_blank() {
                    return None;
                }
                let id = self.lookup(&ident.name)?;
                self.types.record_use(ident.pos, id);
                let object = self.types.object(id);
                match object.kind {
                    ObjectKind::Var | ObjectKind::Param => object.type_ref.clone(),
                    _ => None,
                }
            }
            Expr::Lit(_) | Expr::Type(_) => None,
            Expr::Call(call) => {
                let results = self.resolve_call(call);
                let first = (results.len() == 1).then(|| results[0].clone());
                self.call_results.insert(call.span, results);
                first
            }
            Expr::Selector(sel) => {
                if let Some(member) = self.package_member(&sel.operand, &sel.field) {
                    let object = self.types.object(member);
                    match object.kind {
                        ObjectKind::Var => object.type_ref.clone(),
                        _ => None,
                    }
                } else {
                    self.resolve_expr(&sel.operand);
                    None
                }
            }
            Expr::Index(index) => {
                self.resolve_expr(&index.operand);
                self.resolve_expr(&index.index);
                None
            }
            Expr::Binary(bin) => {
                self.resolve_expr(&bin.left);
                self.resolve_expr(&bin.right);
                None
            }
            Expr::Unary(unary) => {
                let operand = self.resolve_expr(&unary.operand);
                match unary.op {
                    UnaryOp::AddressOf => operand.map(|t| t.pointer_to()),
                    UnaryOp::Deref => operand.map(|t| t.pointee()),
                    _ => None,
                }
            }
            Expr::Paren(inner, _) => self.resolve_expr(inner),
            Expr::FuncLit(lit) => {
                self.scopes.push(Scope::default());
                self.define_params(&lit.params);
                for stmt in &lit.body.stmts {
                    self.resolve_stmt(stmt);
                }
                self.scopes.pop();
                None
            }
            Expr::Composite(lit) => {
                for element in &lit.elements {
                    match element {
                        Expr::KeyValue(kv) if kv.key.as_ident().is_some() => {
                            self.resolve_expr(&kv.value);
                        }
                        other => {
                            self.resolve_expr(other);
                        }
                    }
                }
                lit.type_text.as_deref().map(|t| self.canonical(t))
            }
            Expr::KeyValue(kv) => {
                self.resolve_expr(&kv.key);
                self.resolve_expr(&kv.value);
                None
            }
            Expr::Other(other) => {
                for child in &other.children {
                    self.resolve_expr(child);
                }
                None
            }
        };
        if let Some(t) = &ty {
            self.types.record_type(expr.span(), t.clone());
        }
        ty
    }

    /// `pkg.Name` where `pkg` is an import of a loaded package: records
    /// both uses and returns the member.
    fn package_member(&mut self, operand: &Expr, field: &Ident) -> Option<ObjectId> {
        let Expr::Ident(pkg_ident) = operand.unparen() else {
            return None;
        };
        let pkg_id = self.lookup(&pkg_ident.name)?;
        let pkg = self.types.object(pkg_id);
        if pkg.kind != ObjectKind::Package {
            return None;
        }
        let path = pkg.package.clone();
        self.types.record_use(pkg_ident.pos, pkg_id);
        let member = self.package_scopes.get(&path)?.get(&field.name).copied()?;
        self.types.record_use(field.pos, member);
        Some(member)
    }

    fn resolve_call(&mut self, call: &CallExpr) -> Vec<TypeRef> {
        let callee_type = self.resolve_expr(&call.func);
        let arg_types: Vec<Option<TypeRef>> =
            call.args.iter().map(|a| self.resolve_expr(a)).collect();

        match call.func.unparen() {
            Expr::Ident(ident) => {
                let Some(id) = self.types.use_at(ident.pos) else {
                    return Vec::new();
                };
                let object = self.types.object(id);
                match object.kind {
                    ObjectKind::Func => self.types.results_of(id).to_vec(),
                    ObjectKind::TypeName => object.type_ref.clone().into_iter().collect(),
                    ObjectKind::Builtin => self.builtin_results(&ident.name, call, &arg_types),
                    _ => Vec::new(),
                }
            }
            Expr::Selector(sel) => {
                if let Some(member) = self.types.use_at(sel.field.pos) {
                    let object = self.types.object(member);
                    return match object.kind {
                        ObjectKind::Func => self.types.results_of(member).to_vec(),
                        ObjectKind::TypeName => object.type_ref.clone().into_iter().collect(),
                        _ => Vec::new(),
                    };
                }
                let Some(recv) = self.types.type_of(sel.operand.span()).cloned() else {
                    return Vec::new();
                };
                self.types
                    .lookup_method(&recv, &sel.field.name)
                    .map(|m| self.types.results_of(m).to_vec())
                    .unwrap_or_default()
            }
            Expr::FuncLit(lit) => lit.results.iter().map(|r| self.canonical(r)).collect(),
            _ => callee_type.into_iter().collect(),
        }
    }

    fn builtin_results(
        &self,
        name: &str,
        call: &CallExpr,
        arg_types: &[Option<TypeRef>],
    ) -> Vec<TypeRef> {
        let type_arg = || match call.args.first() {
            Some(Expr::Type(t)) => Some(self.canonical(&t.text)),
            Some(Expr::Ident(id)) => Some(self.canonical(&id.name)),
            Some(Expr::Selector(sel)) => match sel.operand.as_ident() {
                Some(pkg) => Some(self.canonical(&format!("{}.{}", pkg.name, sel.field.name))),
                None => None,
            },
            _ => None,
        };
        match name {
            "new" => type_arg().map(|t| t.pointer_to()).into_iter().collect(),
            "make" => type_arg().into_iter().collect(),
            "append" => arg_types.first().cloned().flatten().into_iter().collect(),
            "len" | "cap" | "copy" => vec![TypeRef::predeclared("int")],
            "recover" => vec![TypeRef::predeclared("any")],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_type_qualifies_through_imports() {
        let imports = vec![ImportSpec {
            alias: None,
            path: "example.com/calc".to_string(),
            pos: Pos(1),
        }];
        let t = canonical_type("*calc.Counter", "example.com/calc_test", &imports);
        assert_eq!(t.package, "example.com/calc");
        assert_eq!(t.name, "Counter");
        assert!(t.pointer);

        let local = canonical_type("Stack[int]", "example.com/calc", &[]);
        assert_eq!(local.name, "Stack");
        assert_eq!(local.package, "example.com/calc");

        assert!(canonical_type("error", "p", &[]).is_error());
        assert_eq!(canonical_type("[]int", "p", &[]).package, "");
    }
}
