//! Type-resolution table: identifier occurrences to stable object identities.
//!
//! Definitions and uses are kept in separate maps keyed by the identifier's
//! position, so a lookup by exact position is unambiguous.

use assay_core::types::collections::FxHashMap;

use super::position::{Pos, Span};
use super::syntax::Ident;

/// Stable identity of a declared entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Var,
    Param,
    Func,
    Package,
    Const,
    TypeName,
    Builtin,
    Nil,
}

/// A resolved type, enough to find methods on it.
///
/// `package` is empty for predeclared and composite types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub package: String,
    pub name: String,
    pub pointer: bool,
}

impl TypeRef {
    pub fn predeclared(name: &str) -> Self {
        Self {
            package: String::new(),
            name: name.to_string(),
            pointer: false,
        }
    }

    pub fn pointer_to(&self) -> Self {
        Self {
            pointer: true,
            ..self.clone()
        }
    }

    pub fn pointee(&self) -> Self {
        Self {
            pointer: false,
            ..self.clone()
        }
    }

    pub fn is_error(&self) -> bool {
        self.package.is_empty() && self.name == "error" && !self.pointer
    }
}

#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    /// Position of the defining identifier; `Pos::NONE` for universe objects.
    pub pos: Pos,
    /// Type as written (or derived) at the declaration, e.g. `*testing.T`.
    pub type_text: Option<String>,
    pub type_ref: Option<TypeRef>,
    /// Import path of the declaring package. For package objects, the
    /// imported path.
    pub package: String,
}

/// Identity tables for a whole program.
#[derive(Debug, Default)]
pub struct TypeInfo {
    objects: Vec<Object>,
    defs: FxHashMap<Pos, ObjectId>,
    uses: FxHashMap<Pos, ObjectId>,
    /// Inferred expression types keyed by the expression's span.
    expr_types: FxHashMap<Span, TypeRef>,
    /// Result types of functions and methods.
    results: FxHashMap<ObjectId, Vec<TypeRef>>,
    /// `(package, receiver base type, method name)` to method object.
    methods: FxHashMap<(String, String, String), ObjectId>,
}

impl TypeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_object(
        &mut self,
        name: &str,
        kind: ObjectKind,
        pos: Pos,
        package: &str,
        type_text: Option<String>,
    ) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Object {
            id,
            name: name.to_string(),
            kind,
            pos,
            type_text,
            type_ref: None,
            package: package.to_string(),
        });
        id
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0 as usize]
    }

    pub fn set_type_ref(&mut self, id: ObjectId, type_ref: Option<TypeRef>) {
        self.objects[id.0 as usize].type_ref = type_ref;
    }

    pub fn record_def(&mut self, pos: Pos, id: ObjectId) {
        self.defs.insert(pos, id);
    }

    pub fn record_use(&mut self, pos: Pos, id: ObjectId) {
        self.uses.insert(pos, id);
    }

    pub fn def_at(&self, pos: Pos) -> Option<ObjectId> {
        self.defs.get(&pos).copied()
    }

    pub fn use_at(&self, pos: Pos) -> Option<ObjectId> {
        self.uses.get(&pos).copied()
    }

    /// Exact position lookup: definitions first, then uses.
    pub fn object_at(&self, pos: Pos) -> Option<ObjectId> {
        if !pos.is_valid() {
            return None;
        }
        self.def_at(pos).or_else(|| self.use_at(pos))
    }

    pub fn object_of(&self, ident: &Ident) -> Option<ObjectId> {
        self.object_at(ident.pos)
    }

    pub fn record_type(&mut self, span: Span, type_ref: TypeRef) {
        self.expr_types.insert(span, type_ref);
    }

    pub fn type_of(&self, span: Span) -> Option<&TypeRef> {
        self.expr_types.get(&span)
    }

    pub fn set_results(&mut self, func: ObjectId, results: Vec<TypeRef>) {
        self.results.insert(func, results);
    }

    pub fn results_of(&self, func: ObjectId) -> &[TypeRef] {
        self.results.get(&func).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_method(&mut self, package: &str, base_type: &str, name: &str, id: ObjectId) {
        self.methods.insert(
            (package.to_string(), base_type.to_string(), name.to_string()),
            id,
        );
    }

    pub fn lookup_method(&self, recv: &TypeRef, name: &str) -> Option<ObjectId> {
        self.methods
            .get(&(recv.package.clone(), recv.name.clone(), name.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
