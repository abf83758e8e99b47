//! Syntax tree with position information.
//!
//! Covers the statement and expression forms a test body is made of. Forms
//! the engine never looks inside are kept as `Other` with their children, so
//! walks still reach nested calls and function literals.

use super::position::{Pos, Span};

/// An identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.pos, self.pos.offset(self.name.len() as u32))
    }

    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imaginary,
    Char,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicLit {
    pub span: Span,
    pub kind: LitKind,
    /// Raw source text, quotes included for strings.
    pub value: String,
}

impl BasicLit {
    /// `""` or a raw empty string.
    pub fn is_empty_string(&self) -> bool {
        self.kind == LitKind::String && (self.value == "\"\"" || self.value == "``")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    AndNot,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "&&" => Self::LogicalAnd,
            "||" => Self::LogicalOr,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "&" => Self::BitAnd,
            "|" => Self::BitOr,
            "^" => Self::BitXor,
            "&^" => Self::AndNot,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            _ => return None,
        })
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Deref,
    AddressOf,
    Receive,
    BitNot,
}

impl UnaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "!" => Self::Not,
            "-" => Self::Neg,
            "+" => Self::Plus,
            "*" => Self::Deref,
            "&" => Self::AddressOf,
            "<-" => Self::Receive,
            "^" => Self::BitNot,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub span: Span,
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
    pub lparen: Pos,
    pub has_ellipsis: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorExpr {
    pub span: Span,
    pub operand: Box<Expr>,
    pub field: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub span: Span,
    pub operand: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub span: Span,
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub span: Span,
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncLit {
    pub span: Span,
    pub params: Vec<Param>,
    pub results: Vec<String>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeLit {
    pub span: Span,
    pub type_text: Option<String>,
    pub elements: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueExpr {
    pub span: Span,
    pub key: Box<Expr>,
    pub value: Box<Expr>,
}

/// A type in expression position, e.g. the operand of `new(T)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherExpr {
    pub span: Span,
    pub kind: String,
    pub children: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Lit(BasicLit),
    Call(CallExpr),
    Selector(SelectorExpr),
    Index(IndexExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Paren(Box<Expr>, Span),
    FuncLit(FuncLit),
    Composite(CompositeLit),
    KeyValue(KeyValueExpr),
    Type(TypeExpr),
    Other(OtherExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Ident(id) => id.span(),
            Self::Lit(lit) => lit.span,
            Self::Call(c) => c.span,
            Self::Selector(s) => s.span,
            Self::Index(i) => i.span,
            Self::Binary(b) => b.span,
            Self::Unary(u) => u.span,
            Self::Paren(_, span) => *span,
            Self::FuncLit(f) => f.span,
            Self::Composite(c) => c.span,
            Self::KeyValue(kv) => kv.span,
            Self::Type(t) => t.span,
            Self::Other(o) => o.span,
        }
    }

    pub fn pos(&self) -> Pos {
        self.span().start
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let Self::Paren(inner, _) = expr {
            expr = inner;
        }
        expr
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match self.unparen() {
            Self::Ident(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallExpr> {
        match self.unparen() {
            Self::Call(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_ident().is_some_and(Ident::is_blank)
    }

    /// Direct sub-expressions, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Self::Ident(_) | Self::Lit(_) | Self::FuncLit(_) | Self::Type(_) => Vec::new(),
            Self::Call(c) => {
                let mut out = vec![c.func.as_ref()];
                out.extend(c.args.iter());
                out
            }
            Self::Selector(s) => vec![s.operand.as_ref()],
            Self::Index(i) => vec![i.operand.as_ref(), i.index.as_ref()],
            Self::Binary(b) => vec![b.left.as_ref(), b.right.as_ref()],
            Self::Unary(u) => vec![u.operand.as_ref()],
            Self::Paren(inner, _) => vec![inner.as_ref()],
            Self::Composite(c) => c.elements.iter().collect(),
            Self::KeyValue(kv) => vec![kv.key.as_ref(), kv.value.as_ref()],
            Self::Other(o) => o.children.iter().collect(),
        }
    }
}

/// A parameter or receiver declaration. Unnamed parameters have no ident.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<Ident>,
    pub type_text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub span: Span,
    pub lhs: Vec<Expr>,
    pub rhs: Vec<Expr>,
    /// `:=` or a `var` spec.
    pub define: bool,
    /// Declared type of a `var` spec.
    pub type_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub span: Span,
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub then_block: Block,
    pub else_stmt: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub span: Span,
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeStmt {
    pub span: Span,
    pub key: Option<Expr>,
    pub value: Option<Expr>,
    pub define: bool,
    pub expr: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub span: Span,
    pub exprs: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub span: Span,
    pub init: Option<Box<Stmt>>,
    pub tag: Option<Expr>,
    pub clauses: Vec<CaseClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign(AssignStmt),
    If(IfStmt),
    For(ForStmt),
    Range(RangeStmt),
    Switch(SwitchStmt),
    Block(Block),
    Return { span: Span, results: Vec<Expr> },
    Defer { span: Span, call: Expr },
    Go { span: Span, call: Expr },
    IncDec { span: Span, target: Expr },
    Other { span: Span, exprs: Vec<Expr>, stmts: Vec<Stmt> },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(e) => e.span(),
            Self::Assign(a) => a.span,
            Self::If(i) => i.span,
            Self::For(f) => f.span,
            Self::Range(r) => r.span,
            Self::Switch(s) => s.span,
            Self::Block(b) => b.span,
            Self::Return { span, .. }
            | Self::Defer { span, .. }
            | Self::Go { span, .. }
            | Self::IncDec { span, .. }
            | Self::Other { span, .. } => *span,
        }
    }
}

/// A top-level function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub span: Span,
    pub name: Ident,
    pub recv: Option<Param>,
    pub params: Vec<Param>,
    pub results: Vec<String>,
    pub body: Option<Block>,
}

impl FuncDecl {
    /// Receiver base type name: `*Counter` and `Counter[T]` both give `Counter`.
    pub fn receiver_base_type(&self) -> Option<String> {
        self.recv.as_ref().map(|r| base_type_name(&r.type_text))
    }

    pub fn has_pointer_receiver(&self) -> bool {
        self.recv
            .as_ref()
            .is_some_and(|r| r.type_text.trim_start().starts_with('*'))
    }
}

/// A package-level `var` or `const` name.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl {
    pub name: Ident,
    pub type_text: Option<String>,
    pub is_const: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
    pub pos: Pos,
}

impl ImportSpec {
    /// The name the import binds in file scope.
    pub fn local_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// One parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxFile {
    pub name: String,
    pub span: Span,
    pub package_name: String,
    pub imports: Vec<ImportSpec>,
    pub funcs: Vec<FuncDecl>,
    pub globals: Vec<GlobalDecl>,
    pub type_names: Vec<Ident>,
}

impl SyntaxFile {
    pub fn is_test_file(&self) -> bool {
        self.name.ends_with("_test.go")
    }
}

/// Strip pointer stars, package qualifiers, and type arguments.
pub fn base_type_name(type_text: &str) -> String {
    let trimmed = type_text.trim().trim_start_matches('*').trim();
    let without_args = trimmed.split('[').next().unwrap_or(trimmed);
    without_args
        .rsplit('.')
        .next()
        .unwrap_or(without_args)
        .to_string()
}

/// A borrowed view of any node, for pre-order walks.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Block(&'a Block),
}

/// Pre-order walk in the style of `go/ast.Inspect`: children are visited
/// only when the callback returns `true`. Function literal bodies are
/// entered like any other child.
pub fn inspect_block<'a>(block: &'a Block, f: &mut dyn FnMut(Node<'a>) -> bool) {
    if !f(Node::Block(block)) {
        return;
    }
    for stmt in &block.stmts {
        inspect_stmt(stmt, f);
    }
}

pub fn inspect_stmt<'a>(stmt: &'a Stmt, f: &mut dyn FnMut(Node<'a>) -> bool) {
    if !f(Node::Stmt(stmt)) {
        return;
    }
    match stmt {
        Stmt::Expr(e) => inspect_expr(e, f),
        Stmt::Assign(a) => {
            for e in a.lhs.iter().chain(a.rhs.iter()) {
                inspect_expr(e, f);
            }
        }
        Stmt::If(i) => {
            if let Some(init) = &i.init {
                inspect_stmt(init, f);
            }
            inspect_expr(&i.cond, f);
            inspect_block(&i.then_block, f);
            if let Some(else_stmt) = &i.else_stmt {
                inspect_stmt(else_stmt, f);
            }
        }
        Stmt::For(fs) => {
            if let Some(init) = &fs.init {
                inspect_stmt(init, f);
            }
            if let Some(cond) = &fs.cond {
                inspect_expr(cond, f);
            }
            if let Some(post) = &fs.post {
                inspect_stmt(post, f);
            }
            inspect_block(&fs.body, f);
        }
        Stmt::Range(r) => {
            for e in r.key.iter().chain(r.value.iter()) {
                inspect_expr(e, f);
            }
            inspect_expr(&r.expr, f);
            inspect_block(&r.body, f);
        }
        Stmt::Switch(s) => {
            if let Some(init) = &s.init {
                inspect_stmt(init, f);
            }
            if let Some(tag) = &s.tag {
                inspect_expr(tag, f);
            }
            for clause in &s.clauses {
                for e in &clause.exprs {
                    inspect_expr(e, f);
                }
                for st in &clause.body {
                    inspect_stmt(st, f);
                }
            }
        }
        Stmt::Block(b) => inspect_block(b, f),
        Stmt::Return { results, .. } => {
            for e in results {
                inspect_expr(e, f);
            }
        }
        Stmt::Defer { call, .. } | Stmt::Go { call, .. } => inspect_expr(call, f),
        Stmt::IncDec { target, .. } => inspect_expr(target, f),
        Stmt::Other { exprs, stmts, .. } => {
            for e in exprs {
                inspect_expr(e, f);
            }
            for st in stmts {
                inspect_stmt(st, f);
            }
        }
    }
}

pub fn inspect_expr<'a>(expr: &'a Expr, f: &mut dyn FnMut(Node<'a>) -> bool) {
    if !f(Node::Expr(expr)) {
        return;
    }
    if let Expr::FuncLit(lit) = expr {
        inspect_block(&lit.body, f);
        return;
    }
    for child in expr.children() {
        inspect_expr(child, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, pos: u32) -> Expr {
        Expr::Ident(Ident::new(name, Pos(pos)))
    }

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("*Counter"), "Counter");
        assert_eq!(base_type_name("*pkg.Counter"), "Counter");
        assert_eq!(base_type_name("Stack[T]"), "Stack");
        assert_eq!(base_type_name("int"), "int");
    }

    #[test]
    fn test_inspect_skips_pruned_subtrees() {
        let sel = Expr::Selector(SelectorExpr {
            span: Span::new(Pos(1), Pos(9)),
            operand: Box::new(ident("result", 1)),
            field: Ident::new("Field", Pos(8)),
        });
        let cond = Expr::Binary(BinaryExpr {
            span: Span::new(Pos(1), Pos(20)),
            left: Box::new(sel),
            op: BinaryOp::Ne,
            right: Box::new(ident("want", 16)),
        });

        let mut seen = Vec::new();
        inspect_expr(&cond, &mut |node| match node {
            Node::Expr(Expr::Selector(_)) => false,
            Node::Expr(Expr::Ident(id)) => {
                seen.push(id.name.clone());
                true
            }
            _ => true,
        });
        assert_eq!(seen, vec!["want".to_string()]);
    }
}
