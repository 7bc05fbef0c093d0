//! Type universe: interned structural handles for the program's types
//!
//! The binding resolver reports every declared type through [`TypeStore`],
//! which hands out stable [`TypeId`] indices. Identical requests intern to
//! the same handle, so handle equality is type identity throughout the
//! engine. The store also answers the hierarchy questions the constraint
//! model needs: supertype enumeration, subtype tests and type-parameter
//! introspection.

use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashMap;

/// Interned handle to a type in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

/// Structural payload of a stored type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A class declaration with its type parameters and direct supertype
    /// references (superclass first, then interfaces, as declared).
    Class {
        params: Vec<TypeId>,
        supertypes: Vec<TypeId>,
    },
    /// An interface declaration.
    Interface {
        params: Vec<TypeId>,
        supertypes: Vec<TypeId>,
    },
    /// A type parameter. `owner` is the declaring type, or `None` for a
    /// method-level type parameter.
    TypeParameter { owner: Option<TypeId>, index: usize },
    /// A reference to a generic declaration with arguments supplied.
    Parameterized { base: TypeId, args: Vec<TypeId> },
    /// A primitive type. Never participates in constraints.
    Primitive,
    /// The null type, the type of the null literal.
    Null,
}

#[derive(Debug, Clone)]
struct TypeData {
    name: String,
    kind: TypeKind,
}

/// Interning arena for all types seen during one analysis invocation.
#[derive(Debug)]
pub struct TypeStore {
    types: Vec<TypeData>,
    by_name: HashMap<String, TypeId>,
    parameterized: HashMap<(TypeId, Vec<TypeId>), TypeId>,
    object: TypeId,
    null: TypeId,
}

impl TypeStore {
    /// Creates a store pre-seeded with the top object type and the null type.
    pub fn new() -> Self {
        let mut store = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
            parameterized: HashMap::new(),
            object: TypeId(0),
            null: TypeId(0),
        };
        store.object = store.push(
            "java.lang.Object",
            TypeKind::Class {
                params: Vec::new(),
                supertypes: Vec::new(),
            },
        );
        store.by_name.insert("java.lang.Object".into(), store.object);
        store.null = store.push("null", TypeKind::Null);
        store
    }

    fn push(&mut self, name: impl Into<String>, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeData {
            name: name.into(),
            kind,
        });
        id
    }

    /// The well-known top object type.
    pub fn object(&self) -> TypeId {
        self.object
    }

    /// The type of the null literal.
    pub fn null_type(&self) -> TypeId {
        self.null
    }

    /// Interns a primitive type by name.
    pub fn primitive(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.push(name, TypeKind::Primitive);
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Declares a class with the given type parameter names. Supertype
    /// references are attached afterwards with [`TypeStore::add_supertype`],
    /// since they may mention the parameters declared here.
    pub fn declare_class(&mut self, name: &str, params: &[&str]) -> TypeId {
        self.declare(name, params, false)
    }

    /// Declares an interface with the given type parameter names.
    pub fn declare_interface(&mut self, name: &str, params: &[&str]) -> TypeId {
        self.declare(name, params, true)
    }

    fn declare(&mut self, name: &str, params: &[&str], interface: bool) -> TypeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let kind = if interface {
            TypeKind::Interface {
                params: Vec::new(),
                supertypes: Vec::new(),
            }
        } else {
            TypeKind::Class {
                params: Vec::new(),
                supertypes: Vec::new(),
            }
        };
        let id = self.push(name, kind);
        self.by_name.insert(name.to_string(), id);

        let param_ids: Vec<TypeId> = params
            .iter()
            .enumerate()
            .map(|(index, pname)| {
                self.push(
                    *pname,
                    TypeKind::TypeParameter {
                        owner: Some(id),
                        index,
                    },
                )
            })
            .collect();
        match &mut self.types[id.0 as usize].kind {
            TypeKind::Class { params, .. } | TypeKind::Interface { params, .. } => {
                *params = param_ids;
            }
            _ => unreachable!(),
        }
        id
    }

    /// Creates a method-level type parameter. Not interned by name, since
    /// unrelated methods reuse the same parameter names.
    pub fn method_type_param(&mut self, name: &str) -> TypeId {
        self.push(
            name,
            TypeKind::TypeParameter {
                owner: None,
                index: 0,
            },
        )
    }

    /// Attaches a direct supertype reference (possibly parameterized) to a
    /// previously declared class or interface.
    pub fn add_supertype(&mut self, ty: TypeId, super_ref: TypeId) {
        match &mut self.types[ty.0 as usize].kind {
            TypeKind::Class { supertypes, .. } | TypeKind::Interface { supertypes, .. } => {
                if !supertypes.contains(&super_ref) {
                    supertypes.push(super_ref);
                }
            }
            _ => panic!("supertype attached to a non-declaration type"),
        }
    }

    /// Interns a parameterized reference to a generic declaration.
    pub fn parameterized(&mut self, base: TypeId, args: &[TypeId]) -> TypeId {
        let key = (base, args.to_vec());
        if let Some(&id) = self.parameterized.get(&key) {
            return id;
        }
        let name = self.types[base.0 as usize].name.clone();
        let id = self.push(
            name,
            TypeKind::Parameterized {
                base,
                args: args.to_vec(),
            },
        );
        self.parameterized.insert(key, id);
        id
    }

    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.types[ty.0 as usize].kind
    }

    /// The generic declaration behind a reference: parameterized references
    /// erase to their base, everything else to itself.
    pub fn erasure(&self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Parameterized { base, .. } => *base,
            _ => ty,
        }
    }

    /// Type parameters declared by the type (or by the erasure of a
    /// parameterized reference), in declaration order.
    pub fn type_params_of(&self, ty: TypeId) -> Vec<TypeId> {
        match self.kind(self.erasure(ty)) {
            TypeKind::Class { params, .. } | TypeKind::Interface { params, .. } => params.clone(),
            _ => Vec::new(),
        }
    }

    /// Arguments of a parameterized reference, empty for raw references.
    pub fn type_args_of(&self, ty: TypeId) -> Vec<TypeId> {
        match self.kind(ty) {
            TypeKind::Parameterized { args, .. } => args.clone(),
            _ => Vec::new(),
        }
    }

    /// Declaration index of a type parameter.
    pub fn param_index(&self, tp: TypeId) -> usize {
        match self.kind(tp) {
            TypeKind::TypeParameter { index, .. } => *index,
            _ => 0,
        }
    }

    /// Declaring type of a type parameter, `None` for method-level ones.
    pub fn param_owner(&self, tp: TypeId) -> Option<TypeId> {
        match self.kind(tp) {
            TypeKind::TypeParameter { owner, .. } => *owner,
            _ => None,
        }
    }

    /// Direct supertype references of a declaration, as declared (arguments
    /// preserved).
    pub fn declared_supertype_refs(&self, ty: TypeId) -> Vec<TypeId> {
        match self.kind(self.erasure(ty)) {
            TypeKind::Class { supertypes, .. } | TypeKind::Interface { supertypes, .. } => {
                supertypes.clone()
            }
            _ => Vec::new(),
        }
    }

    /// Transitive supertype enumeration over erasures, breadth-first and
    /// deduplicated, with the top object type last. Does not include `ty`.
    pub fn supertype_closure(&self, ty: TypeId) -> Vec<TypeId> {
        let start = self.erasure(ty);
        let mut seen: IndexSet<TypeId> = IndexSet::new();
        let mut frontier = std::collections::VecDeque::from([start]);
        while let Some(next) = frontier.pop_front() {
            for super_ref in self.declared_supertype_refs(next) {
                let erased = self.erasure(super_ref);
                if erased != start && seen.insert(erased) {
                    frontier.push_back(erased);
                }
            }
        }
        if start != self.object && self.is_reference(start) {
            seen.insert(self.object);
        }
        seen.into_iter().collect()
    }

    /// Subtype test over erasures. Null is a subtype of every reference
    /// type; primitives are only subtypes of themselves.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        let sub = self.erasure(sub);
        let sup = self.erasure(sup);
        if sub == sup {
            return true;
        }
        match (self.kind(sub), self.kind(sup)) {
            (TypeKind::Primitive, _) | (_, TypeKind::Primitive) => false,
            (TypeKind::Null, _) => true,
            _ => sup == self.object || self.supertype_closure(sub).contains(&sup),
        }
    }

    /// All declared classes and interfaces that are subtypes of `ty`,
    /// including `ty` itself, in declaration order.
    pub fn declared_subtypes_of(&self, ty: TypeId) -> Vec<TypeId> {
        let target = self.erasure(ty);
        (0..self.types.len() as u32)
            .map(TypeId)
            .filter(|id| {
                matches!(
                    self.kind(*id),
                    TypeKind::Class { .. } | TypeKind::Interface { .. }
                )
            })
            .filter(|id| self.is_subtype(*id, target))
            .collect()
    }

    /// Whether the type can participate in generic inference: type
    /// parameters, parameterized references and raw references to generic
    /// declarations are relevant, everything else is not.
    pub fn is_generic_relevant(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::TypeParameter { .. } => true,
            TypeKind::Parameterized { .. } => true,
            TypeKind::Class { params, .. } | TypeKind::Interface { params, .. } => {
                !params.is_empty()
            }
            TypeKind::Primitive | TypeKind::Null => false,
        }
    }

    /// Whether the type is a reference type (not primitive, not null).
    pub fn is_reference(&self, ty: TypeId) -> bool {
        !matches!(self.kind(ty), TypeKind::Primitive | TypeKind::Null)
    }

    /// Fully qualified rendering, with parameterized references spelled out.
    pub fn qualified_name(&self, ty: TypeId) -> String {
        match self.kind(ty) {
            TypeKind::Parameterized { base, args } => {
                let rendered: Vec<String> =
                    args.iter().map(|arg| self.qualified_name(*arg)).collect();
                format!(
                    "{}<{}>",
                    self.types[base.0 as usize].name,
                    rendered.join(", ")
                )
            }
            _ => self.types[ty.0 as usize].name.clone(),
        }
    }

    /// Last segment of the qualified name.
    pub fn simple_name(&self, ty: TypeId) -> &str {
        let name = &self.types[self.erasure(ty).0 as usize].name;
        name.rsplit('.').next().unwrap_or(name)
    }

    /// Number of types currently interned.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection_store() -> (TypeStore, TypeId, TypeId) {
        let mut store = TypeStore::new();
        let collection = store.declare_interface("java.util.Collection", &["E"]);
        let list = store.declare_interface("java.util.List", &["E"]);
        let e_list = store.type_params_of(list)[0];
        let collection_of_e = store.parameterized(collection, &[e_list]);
        store.add_supertype(list, collection_of_e);

        let arraylist = store.declare_class("java.util.ArrayList", &["E"]);
        let e_al = store.type_params_of(arraylist)[0];
        let list_of_e = store.parameterized(list, &[e_al]);
        store.add_supertype(arraylist, list_of_e);
        (store, list, arraylist)
    }

    #[test]
    fn declarations_intern_by_name() {
        let mut store = TypeStore::new();
        let a = store.declare_class("com.example.Widget", &[]);
        let b = store.declare_class("com.example.Widget", &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn parameterized_references_intern_structurally() {
        let mut store = TypeStore::new();
        let list = store.declare_interface("java.util.List", &["E"]);
        let string = store.declare_class("java.lang.String", &[]);
        let a = store.parameterized(list, &[string]);
        let b = store.parameterized(list, &[string]);
        assert_eq!(a, b);
        assert_eq!(store.erasure(a), list);
    }

    #[test]
    fn subtype_walks_the_hierarchy() {
        let (store, list, arraylist) = collection_store();
        let collection = store.by_name["java.util.Collection"];
        assert!(store.is_subtype(arraylist, list));
        assert!(store.is_subtype(arraylist, collection));
        assert!(store.is_subtype(arraylist, store.object()));
        assert!(!store.is_subtype(list, arraylist));
    }

    #[test]
    fn closure_is_deterministic_and_ends_at_object() {
        let (store, list, arraylist) = collection_store();
        let closure = store.supertype_closure(arraylist);
        let collection = store.by_name["java.util.Collection"];
        assert_eq!(closure, vec![list, collection, store.object()]);
    }

    #[test]
    fn generic_relevance() {
        let (mut store, list, _) = collection_store();
        let string = store.declare_class("java.lang.String", &[]);
        let int = store.primitive("int");
        let list_of_string = store.parameterized(list, &[string]);
        assert!(store.is_generic_relevant(list));
        assert!(store.is_generic_relevant(list_of_string));
        let e = store.type_params_of(list)[0];
        assert!(store.is_generic_relevant(e));
        assert!(!store.is_generic_relevant(string));
        assert!(!store.is_generic_relevant(int));
    }

    #[test]
    fn declared_subtypes_include_self_in_declaration_order() {
        let (store, list, arraylist) = collection_store();
        let subs = store.declared_subtypes_of(list);
        assert_eq!(subs, vec![list, arraylist]);
    }

    #[test]
    fn qualified_name_renders_arguments() {
        let (mut store, list, _) = collection_store();
        let string = store.declare_class("java.lang.String", &[]);
        let list_of_string = store.parameterized(list, &[string]);
        assert_eq!(
            store.qualified_name(list_of_string),
            "java.util.List<java.lang.String>"
        );
        assert_eq!(store.simple_name(list_of_string), "List");
    }

    #[test]
    fn null_is_subtype_of_references_only() {
        let (mut store, list, _) = collection_store();
        let int = store.primitive("int");
        assert!(store.is_subtype(store.null_type(), list));
        assert!(!store.is_subtype(store.null_type(), int));
    }
}
