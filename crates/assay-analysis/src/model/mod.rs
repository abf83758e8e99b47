//! Source model consumed by the assessment engine: positions, syntax trees,
//! the type-resolution table, and the per-function dataflow graph.

pub mod dataflow;
pub mod objects;
pub mod position;
pub mod program;
pub mod syntax;

pub use dataflow::{
    CallGraph, CallInstr, Callee, Dataflow, Function, FunctionId, FunctionRole, SigParam,
    Signature, Value, ValueId, ValueKind,
};
pub use objects::{Object, ObjectId, ObjectKind, TypeInfo, TypeRef};
pub use position::{FileSet, Location, Pos, Span};
pub use program::{DeclRef, Package, Program, TestFunction};
pub use syntax::{Expr, FuncDecl, Ident, Stmt, SyntaxFile};
