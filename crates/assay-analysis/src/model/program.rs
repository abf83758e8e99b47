//! A loaded program: files, packages, identity tables, and dataflow.

use assay_core::types::collections::FxHashMap;

use super::dataflow::{CallGraph, Dataflow, FunctionId, FunctionRole};
use super::objects::{ObjectId, TypeInfo};
use super::position::{FileSet, Location, Pos};
use super::syntax::{FuncDecl, SyntaxFile};

#[derive(Debug, Clone)]
pub struct Package {
    /// Import path; external test packages carry the `_test` suffix.
    pub path: String,
    pub name: String,
    /// Indices into `Program::files`.
    pub files: Vec<usize>,
}

impl Package {
    pub fn is_external_test(&self) -> bool {
        self.name.ends_with("_test")
    }
}

/// Position of a top-level declaration in the syntax trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclRef {
    pub file: usize,
    pub index: usize,
}

/// A discovered test function.
#[derive(Debug, Clone)]
pub struct TestFunction {
    pub name: String,
    pub function: FunctionId,
    pub decl: DeclRef,
    pub location: Location,
}

#[derive(Debug)]
pub struct Program {
    pub fileset: FileSet,
    pub files: Vec<SyntaxFile>,
    /// Sorted by import path.
    pub packages: Vec<Package>,
    pub types: TypeInfo,
    pub dataflow: Dataflow,
    pub call_graph: CallGraph,
    pub(crate) decls: FxHashMap<FunctionId, DeclRef>,
    pub(crate) func_objects: FxHashMap<ObjectId, FunctionId>,
}

impl Program {
    pub fn package(&self, path: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.path == path)
    }

    pub fn location(&self, pos: Pos) -> Location {
        self.fileset.location(pos).unwrap_or_else(|| Location {
            file: String::from("<unknown>"),
            line: 0,
            column: 0,
        })
    }

    pub fn decl(&self, decl: DeclRef) -> &FuncDecl {
        &self.files[decl.file].funcs[decl.index]
    }

    /// Syntax of a declared (non-closure) function.
    pub fn func_decl(&self, func: FunctionId) -> Option<&FuncDecl> {
        self.decls.get(&func).map(|d| self.decl(*d))
    }

    pub fn decl_ref(&self, func: FunctionId) -> Option<DeclRef> {
        self.decls.get(&func).copied()
    }

    /// The function backing a declared function or method object.
    pub fn function_of_object(&self, object: ObjectId) -> Option<FunctionId> {
        self.func_objects.get(&object).copied()
    }

    /// Test functions of a package declared in `_test.go` files, by name.
    pub fn test_functions(&self, package: &str) -> Vec<TestFunction> {
        let mut tests: Vec<TestFunction> = self
            .dataflow
            .functions()
            .iter()
            .filter(|f| {
                f.package == package
                    && f.parent.is_none()
                    && f.in_test_file
                    && f.role == FunctionRole::Test
            })
            .filter_map(|f| {
                let decl = self.decl_ref(f.id)?;
                Some(TestFunction {
                    name: f.name.clone(),
                    function: f.id,
                    decl,
                    location: self.location(f.pos),
                })
            })
            .collect();
        tests.sort_by(|a, b| a.name.cmp(&b.name));
        tests
    }

    /// True when any file of the package is a `_test.go` file.
    pub fn has_test_files(&self, package: &str) -> bool {
        self.package(package)
            .is_some_and(|p| p.files.iter().any(|i| self.files[*i].is_test_file()))
    }
}
