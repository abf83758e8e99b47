//! Lowering of tree-sitter-go concrete syntax trees into `model::syntax`.
//!
//! The lowering is error tolerant: ERROR nodes are kept as opaque
//! expressions and the rest of the file is lowered normally.

use tree_sitter::{Node, Parser, Tree};

use crate::model::position::{Pos, Span};
use crate::model::syntax::{
    AssignStmt, BasicLit, BinaryExpr, BinaryOp, Block, CallExpr, CaseClause, CompositeLit, Expr,
    ForStmt, FuncDecl, FuncLit, GlobalDecl, Ident, IfStmt, ImportSpec, IndexExpr, KeyValueExpr,
    LitKind, OtherExpr, Param, RangeStmt, SelectorExpr, Stmt, SwitchStmt, SyntaxFile, TypeExpr,
    UnaryExpr, UnaryOp,
};

/// Parse Go source text.
pub(crate) fn parse_go(source: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| format!("Failed to set language: {e}"))?;
    parser
        .parse(source, None)
        .ok_or_else(|| "parser produced no tree".to_string())
}

/// Count ERROR and MISSING nodes.
pub(crate) fn count_errors(node: Node) -> u32 {
    let mut count = u32::from(node.is_error() || node.is_missing());
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        count += count_errors(child);
    }
    count
}

/// Lower one parsed file. `base` is the file's base position in the file set.
pub(crate) fn lower_file(name: &str, source: &str, tree: &Tree, base: u32) -> SyntaxFile {
    let lowerer = Lowerer {
        src: source.as_bytes(),
        base,
    };
    lowerer.file(name, tree.root_node())
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}

/// Every descendant of one of `kinds`, not descending into matches.
fn collect_kinds<'t>(node: Node<'t>, kinds: &[&str], out: &mut Vec<Node<'t>>) {
    for child in named_children(node) {
        if kinds.contains(&child.kind()) {
            out.push(child);
        } else {
            collect_kinds(child, kinds, out);
        }
    }
}

const TYPE_KINDS: &[&str] = &[
    "type_identifier",
    "qualified_type",
    "pointer_type",
    "slice_type",
    "array_type",
    "implicit_length_array_type",
    "map_type",
    "channel_type",
    "function_type",
    "struct_type",
    "interface_type",
    "generic_type",
    "negated_type",
];

struct Lowerer<'a> {
    src: &'a [u8],
    base: u32,
}

impl<'a> Lowerer<'a> {
    fn pos(&self, node: Node) -> Pos {
        Pos(self.base + node.start_byte() as u32)
    }

    fn span(&self, node: Node) -> Span {
        Span::new(self.pos(node), Pos(self.base + node.end_byte() as u32))
    }

    fn text(&self, node: Node) -> String {
        node.utf8_text(self.src).unwrap_or_default().to_string()
    }

    fn ident(&self, node: Node) -> Ident {
        Ident::new(self.text(node), self.pos(node))
    }

    fn file(&self, name: &str, root: Node) -> SyntaxFile {
        let mut file = SyntaxFile {
            name: name.to_string(),
            span: self.span(root),
            package_name: String::new(),
            imports: Vec::new(),
            funcs: Vec::new(),
            globals: Vec::new(),
            type_names: Vec::new(),
        };

        for child in named_children(root) {
            match child.kind() {
                "package_clause" => {
                    if let Some(id) = named_children(child).first() {
                        file.package_name = self.text(*id);
                    }
                }
                "import_declaration" => {
                    let mut specs = Vec::new();
                    collect_kinds(child, &["import_spec"], &mut specs);
                    for spec in specs {
                        if let Some(import) = self.import_spec(spec) {
                            file.imports.push(import);
                        }
                    }
                }
                "function_declaration" | "method_declaration" => {
                    if let Some(decl) = self.func_decl(child) {
                        file.funcs.push(decl);
                    }
                }
                "var_declaration" | "const_declaration" => {
                    let is_const = child.kind() == "const_declaration";
                    let mut specs = Vec::new();
                    collect_kinds(child, &["var_spec", "const_spec"], &mut specs);
                    for spec in specs {
                        let type_text = spec.child_by_field_name("type").map(|t| self.text(t));
                        for name in field_children(spec, "name") {
                            file.globals.push(GlobalDecl {
                                name: self.ident(name),
                                type_text: type_text.clone(),
                                is_const,
                            });
                        }
                    }
                }
                "type_declaration" => {
                    let mut specs = Vec::new();
                    collect_kinds(child, &["type_spec", "type_alias"], &mut specs);
                    for spec in specs {
                        if let Some(name) = spec.child_by_field_name("name") {
                            file.type_names.push(self.ident(name));
                        }
                    }
                }
                _ => {}
            }
        }
        file
    }

    fn import_spec(&self, spec: Node) -> Option<ImportSpec> {
        let path_node = spec.child_by_field_name("path")?;
        let path = self
            .text(path_node)
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();
        let alias = spec.child_by_field_name("name").map(|n| self.text(n));
        Some(ImportSpec {
            alias,
            path,
            pos: self.pos(spec),
        })
    }

    fn func_decl(&self, node: Node) -> Option<FuncDecl> {
        let name = self.ident(node.child_by_field_name("name")?);
        let recv = node
            .child_by_field_name("receiver")
            .and_then(|r| self.params(r).into_iter().next());
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();
        let results = node
            .child_by_field_name("result")
            .map(|r| self.results(r))
            .unwrap_or_default();
        let body = node.child_by_field_name("body").map(|b| self.block(b));
        Some(FuncDecl {
            span: self.span(node),
            name,
            recv,
            params,
            results,
            body,
        })
    }

    fn params(&self, list: Node) -> Vec<Param> {
        let mut out = Vec::new();
        for decl in named_children(list) {
            let variadic = decl.kind() == "variadic_parameter_declaration";
            if decl.kind() != "parameter_declaration" && !variadic {
                continue;
            }
            let mut type_text = decl
                .child_by_field_name("type")
                .map(|t| self.text(t))
                .unwrap_or_default();
            if variadic {
                type_text = format!("...{type_text}");
            }
            let names = field_children(decl, "name");
            if names.is_empty() {
                out.push(Param {
                    name: None,
                    type_text,
                });
            } else {
                for name in names {
                    out.push(Param {
                        name: Some(self.ident(name)),
                        type_text: type_text.clone(),
                    });
                }
            }
        }
        out
    }

    fn results(&self, node: Node) -> Vec<String> {
        if node.kind() == "parameter_list" {
            self.params(node).into_iter().map(|p| p.type_text).collect()
        } else {
            vec![self.text(node)]
        }
    }

    fn block(&self, node: Node) -> Block {
        Block {
            span: self.span(node),
            stmts: self.statements(node, &[]),
        }
    }

    /// Statements among the named children of `node`, flattening
    /// `statement_list` and skipping the excluded nodes.
    fn statements(&self, node: Node, exclude: &[usize]) -> Vec<Stmt> {
        let mut out = Vec::new();
        for child in named_children(node) {
            if exclude.contains(&child.id()) {
                continue;
            }
            if child.kind() == "statement_list" {
                out.extend(self.statements(child, &[]));
            } else if let Some(stmt) = self.stmt(child) {
                out.push(stmt);
            }
        }
        out
    }

    fn stmt(&self, node: Node) -> Option<Stmt> {
        let span = self.span(node);
        let stmt = match node.kind() {
            "expression_statement" => Stmt::Expr(self.expr(*named_children(node).first()?)),
            "short_var_declaration" | "assignment_statement" => {
                let define = node.kind() == "short_var_declaration";
                Stmt::Assign(AssignStmt {
                    span,
                    lhs: self.expr_list(node.child_by_field_name("left")),
                    rhs: self.expr_list(node.child_by_field_name("right")),
                    define,
                    type_text: None,
                })
            }
            "var_declaration" | "const_declaration" => {
                let mut specs = Vec::new();
                collect_kinds(node, &["var_spec", "const_spec"], &mut specs);
                let mut assigns: Vec<Stmt> = specs
                    .into_iter()
                    .map(|spec| self.value_spec(spec))
                    .collect();
                if assigns.len() == 1 {
                    assigns.pop()?
                } else {
                    Stmt::Other {
                        span,
                        exprs: Vec::new(),
                        stmts: assigns,
                    }
                }
            }
            "if_statement" => Stmt::If(self.if_stmt(node)?),
            "for_statement" => self.for_stmt(node)?,
            "expression_switch_statement" | "type_switch_statement" | "select_statement" => {
                self.switch_stmt(node)
            }
            "return_statement" => Stmt::Return {
                span,
                results: named_children(node)
                    .first()
                    .map(|list| self.expr_list(Some(*list)))
                    .unwrap_or_default(),
            },
            "defer_statement" => Stmt::Defer {
                span,
                call: self.expr(*named_children(node).first()?),
            },
            "go_statement" => Stmt::Go {
                span,
                call: self.expr(*named_children(node).first()?),
            },
            "inc_statement" | "dec_statement" => Stmt::IncDec {
                span,
                target: self.expr(*named_children(node).first()?),
            },
            "block" => Stmt::Block(self.block(node)),
            "labeled_statement" => return self.stmt(*named_children(node).last()?),
            "empty_statement" | "break_statement" | "continue_statement" | "goto_statement"
            | "fallthrough_statement" | "type_declaration" => return None,
            _ => Stmt::Other {
                span,
                exprs: named_children(node)
                    .into_iter()
                    .map(|c| self.expr(c))
                    .collect(),
                stmts: Vec::new(),
            },
        };
        Some(stmt)
    }

    fn value_spec(&self, spec: Node) -> Stmt {
        Stmt::Assign(AssignStmt {
            span: self.span(spec),
            lhs: field_children(spec, "name")
                .into_iter()
                .map(|n| Expr::Ident(self.ident(n)))
                .collect(),
            rhs: self.expr_list(spec.child_by_field_name("value")),
            define: true,
            type_text: spec.child_by_field_name("type").map(|t| self.text(t)),
        })
    }

    fn if_stmt(&self, node: Node) -> Option<IfStmt> {
        let cond = self.expr(node.child_by_field_name("condition")?);
        let then_block = self.block(node.child_by_field_name("consequence")?);
        let init = node
            .child_by_field_name("initializer")
            .and_then(|i| self.stmt(i))
            .map(Box::new);
        let else_stmt = node
            .child_by_field_name("alternative")
            .and_then(|a| self.stmt(a))
            .map(Box::new);
        Some(IfStmt {
            span: self.span(node),
            init,
            cond,
            then_block,
            else_stmt,
        })
    }

    fn for_stmt(&self, node: Node) -> Option<Stmt> {
        let body_node = node.child_by_field_name("body")?;
        let body = self.block(body_node);
        let span = self.span(node);
        let header = named_children(node)
            .into_iter()
            .find(|c| c.id() != body_node.id());

        let stmt = match header {
            Some(clause) if clause.kind() == "range_clause" => {
                let mut targets = self
                    .expr_list(clause.child_by_field_name("left"))
                    .into_iter();
                Stmt::Range(RangeStmt {
                    span,
                    key: targets.next(),
                    value: targets.next(),
                    define: has_token(clause, ":="),
                    expr: self.expr(clause.child_by_field_name("right")?),
                    body,
                })
            }
            Some(clause) if clause.kind() == "for_clause" => Stmt::For(ForStmt {
                span,
                init: clause
                    .child_by_field_name("initializer")
                    .and_then(|n| self.stmt(n))
                    .map(Box::new),
                cond: clause.child_by_field_name("condition").map(|n| self.expr(n)),
                post: clause
                    .child_by_field_name("update")
                    .and_then(|n| self.stmt(n))
                    .map(Box::new),
                body,
            }),
            Some(cond) => Stmt::For(ForStmt {
                span,
                init: None,
                cond: Some(self.expr(cond)),
                post: None,
                body,
            }),
            None => Stmt::For(ForStmt {
                span,
                init: None,
                cond: None,
                post: None,
                body,
            }),
        };
        Some(stmt)
    }

    fn switch_stmt(&self, node: Node) -> Stmt {
        let init = node
            .child_by_field_name("initializer")
            .and_then(|i| self.stmt(i))
            .map(Box::new);
        let tag = node.child_by_field_name("value").map(|v| self.expr(v));

        let mut clauses = Vec::new();
        for case in named_children(node) {
            if !matches!(
                case.kind(),
                "expression_case" | "default_case" | "type_case" | "communication_case"
            ) {
                continue;
            }
            let mut exclude = Vec::new();
            let mut exprs = Vec::new();
            if let Some(value) = case.child_by_field_name("value") {
                exclude.push(value.id());
                exprs = self.expr_list(Some(value));
            }
            for ty in field_children(case, "type") {
                exclude.push(ty.id());
            }
            clauses.push(CaseClause {
                span: self.span(case),
                exprs,
                body: self.statements(case, &exclude),
            });
        }

        Stmt::Switch(SwitchStmt {
            span: self.span(node),
            init,
            tag,
            clauses,
        })
    }

    fn expr_list(&self, node: Option<Node>) -> Vec<Expr> {
        match node {
            None => Vec::new(),
            Some(n) if n.kind() == "expression_list" => {
                named_children(n).into_iter().map(|c| self.expr(c)).collect()
            }
            Some(n) => vec![self.expr(n)],
        }
    }

    fn lit(&self, node: Node, kind: LitKind) -> Expr {
        Expr::Lit(BasicLit {
            span: self.span(node),
            kind,
            value: self.text(node),
        })
    }

    fn other(&self, node: Node, children: Vec<Expr>) -> Expr {
        Expr::Other(OtherExpr {
            span: self.span(node),
            kind: node.kind().to_string(),
            children,
        })
    }

    fn expr(&self, node: Node) -> Expr {
        let span = self.span(node);
        match node.kind() {
            "identifier" | "field_identifier" | "package_identifier" | "blank_identifier"
            | "nil" | "true" | "false" | "iota" => Expr::Ident(self.ident(node)),
            "int_literal" => self.lit(node, LitKind::Int),
            "float_literal" => self.lit(node, LitKind::Float),
            "imaginary_literal" => self.lit(node, LitKind::Imaginary),
            "rune_literal" => self.lit(node, LitKind::Char),
            "interpreted_string_literal" | "raw_string_literal" => {
                self.lit(node, LitKind::String)
            }
            "call_expression" => {
                let (Some(func), Some(args)) = (
                    node.child_by_field_name("function"),
                    node.child_by_field_name("arguments"),
                ) else {
                    return self.other(node, self.all_exprs(node));
                };
                Expr::Call(CallExpr {
                    span,
                    func: Box::new(self.expr(func)),
                    args: named_children(args)
                        .into_iter()
                        .map(|a| self.expr(a))
                        .collect(),
                    lparen: self.pos(args),
                    has_ellipsis: has_token(args, "..."),
                })
            }
            "selector_expression" => {
                match (
                    node.child_by_field_name("operand"),
                    node.child_by_field_name("field"),
                ) {
                    (Some(operand), Some(field)) => Expr::Selector(SelectorExpr {
                        span,
                        operand: Box::new(self.expr(operand)),
                        field: self.ident(field),
                    }),
                    _ => self.other(node, self.all_exprs(node)),
                }
            }
            "index_expression" => {
                match (
                    node.child_by_field_name("operand"),
                    node.child_by_field_name("index"),
                ) {
                    (Some(operand), Some(index)) => Expr::Index(IndexExpr {
                        span,
                        operand: Box::new(self.expr(operand)),
                        index: Box::new(self.expr(index)),
                    }),
                    _ => self.other(node, self.all_exprs(node)),
                }
            }
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .and_then(|o| BinaryOp::from_token(o.kind()));
                match (
                    node.child_by_field_name("left"),
                    op,
                    node.child_by_field_name("right"),
                ) {
                    (Some(left), Some(op), Some(right)) => Expr::Binary(BinaryExpr {
                        span,
                        left: Box::new(self.expr(left)),
                        op,
                        right: Box::new(self.expr(right)),
                    }),
                    _ => self.other(node, self.all_exprs(node)),
                }
            }
            "unary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .and_then(|o| UnaryOp::from_token(o.kind()));
                match (op, node.child_by_field_name("operand")) {
                    (Some(op), Some(operand)) => Expr::Unary(UnaryExpr {
                        span,
                        op,
                        operand: Box::new(self.expr(operand)),
                    }),
                    _ => self.other(node, self.all_exprs(node)),
                }
            }
            "parenthesized_expression" => match named_children(node).first() {
                Some(inner) => Expr::Paren(Box::new(self.expr(*inner)), span),
                None => self.other(node, Vec::new()),
            },
            "func_literal" => {
                let Some(body) = node.child_by_field_name("body") else {
                    return self.other(node, Vec::new());
                };
                Expr::FuncLit(FuncLit {
                    span,
                    params: node
                        .child_by_field_name("parameters")
                        .map(|p| self.params(p))
                        .unwrap_or_default(),
                    results: node
                        .child_by_field_name("result")
                        .map(|r| self.results(r))
                        .unwrap_or_default(),
                    body: self.block(body),
                })
            }
            "composite_literal" => Expr::Composite(CompositeLit {
                span,
                type_text: node.child_by_field_name("type").map(|t| self.text(t)),
                elements: node
                    .child_by_field_name("body")
                    .map(|b| self.elements(b))
                    .unwrap_or_default(),
            }),
            "literal_value" => Expr::Composite(CompositeLit {
                span,
                type_text: None,
                elements: self.elements(node),
            }),
            "literal_element" => match named_children(node).first() {
                Some(inner) => self.expr(*inner),
                None => self.other(node, Vec::new()),
            },
            "keyed_element" => {
                let parts = named_children(node);
                match (parts.first(), parts.last()) {
                    (Some(key), Some(value)) if parts.len() == 2 => {
                        Expr::KeyValue(KeyValueExpr {
                            span,
                            key: Box::new(self.expr(*key)),
                            value: Box::new(self.expr(*value)),
                        })
                    }
                    _ => self.other(node, self.all_exprs(node)),
                }
            }
            kind if TYPE_KINDS.contains(&kind) => Expr::Type(TypeExpr {
                span,
                text: self.text(node),
            }),
            _ => self.other(node, self.all_exprs(node)),
        }
    }

    fn elements(&self, literal_value: Node) -> Vec<Expr> {
        named_children(literal_value)
            .into_iter()
            .map(|e| self.expr(e))
            .collect()
    }

    fn all_exprs(&self, node: Node) -> Vec<Expr> {
        named_children(node)
            .into_iter()
            .map(|c| self.expr(c))
            .collect()
    }
}
