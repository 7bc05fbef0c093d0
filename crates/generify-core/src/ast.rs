//! Bound syntax tree consumed by the constraint creator
//!
//! The front end (parser plus binding resolver) is an external collaborator.
//! This module defines the immutable tree it hands over: source units whose
//! expressions live in a per-unit arena addressed by [`ExprId`], with every
//! name reference already resolved to a [`VarBinding`] or [`MethodBinding`].
//! Unresolvable nodes are represented explicitly as [`ExprKind::Unresolved`]
//! so the creator can skip them without aborting a unit scan.

use crate::types::TypeId;
use serde::Serialize;
use smallvec::SmallVec;

/// Identifier of a source unit within one analysis invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(pub u32);

/// Index of an expression in its unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(pub u32);

/// Program-wide identifier of a variable binding (local, parameter, field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VarBindingId(pub u32);

/// Program-wide identifier of a method binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MethodBindingId(pub u32);

/// Byte range of a node in its unit's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// Syntactic position of a rewritable type node. Unbounded wildcards are
/// only legal as type arguments in array creations, instanceof checks and
/// catch clauses; everywhere else an unresolved slot must fall back to the
/// top object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeNodeContext {
    Declaration,
    ArrayCreation,
    Instanceof,
    CatchClause,
}

impl TypeNodeContext {
    /// Whether an unbounded wildcard type argument is legal here.
    pub fn allows_wildcard(self) -> bool {
        !matches!(self, TypeNodeContext::Declaration)
    }
}

/// What kind of program entity a variable binding names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Local,
    Field { owner: TypeId },
    Param { method: MethodBindingId, index: usize },
}

/// A resolved variable binding.
///
/// `ty` is `None` when the front end could not resolve the declared type;
/// the creator then produces no constraint variable for references to it.
#[derive(Debug, Clone)]
pub struct VarBinding {
    pub name: String,
    pub ty: Option<TypeId>,
    pub unit: UnitId,
    /// Span of the declared type node, present when the declaration is a
    /// candidate for rewriting.
    pub type_span: Option<Span>,
    pub context: TypeNodeContext,
    pub kind: BindingKind,
}

/// A resolved method binding with its declared (not instantiated) signature.
#[derive(Debug, Clone)]
pub struct MethodBinding {
    pub name: String,
    /// Declaring type, as the generic declaration (never a parameterized
    /// reference).
    pub owner: TypeId,
    /// Method-level type parameters, in declaration order.
    pub type_params: SmallVec<[TypeId; 2]>,
    /// Declared parameter types. `None` marks an unresolvable entry.
    pub param_types: SmallVec<[Option<TypeId>; 4]>,
    /// Declared return type. `None` for void methods and constructors.
    pub return_type: Option<TypeId>,
    pub is_constructor: bool,
    /// Nearest overridden declaration, if this method overrides one.
    pub overrides: Option<MethodBindingId>,
}

/// Expression node payload.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Reference to a resolved variable binding.
    VarRef(VarBindingId),
    /// Qualified access to a field through a receiver expression.
    FieldAccess { receiver: ExprId, binding: VarBindingId },
    /// Method invocation. `receiver` is `None` for static calls.
    Call {
        receiver: Option<ExprId>,
        method: MethodBindingId,
        args: SmallVec<[ExprId; 4]>,
    },
    /// Class instance creation. `type_span` covers the created type node,
    /// which is rewritable when the type is raw.
    New {
        ty: TypeId,
        type_span: Option<Span>,
        ctor: Option<MethodBindingId>,
        args: SmallVec<[ExprId; 4]>,
    },
    /// Array creation over a component type node.
    NewArray { component: TypeId, component_span: Span },
    /// Cast of an operand to a target type.
    Cast {
        target: TypeId,
        target_span: Span,
        operand: ExprId,
    },
    /// `operand instanceof target` check.
    InstanceOf {
        operand: ExprId,
        target: TypeId,
        target_span: Span,
    },
    /// Typed literal (string, boxed number, null).
    Literal { ty: TypeId },
    /// Node whose binding the front end could not resolve.
    Unresolved,
}

/// An expression with its source range.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Assignment flavor. Compound string concatenation (`s += expr`) is carried
/// separately because it never produces a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    ConcatAssign,
}

/// Statement inside a method body or initializer.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Local variable declaration, optionally with an initializer.
    Local {
        binding: VarBindingId,
        init: Option<ExprId>,
    },
    /// Assignment to an already-declared target.
    Assign {
        target: ExprId,
        value: ExprId,
        op: AssignOp,
    },
    /// Expression evaluated for effect.
    Expr(ExprId),
    /// Return from the enclosing method.
    Return(Option<ExprId>),
}

/// A field declaration site inside a class body.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub binding: VarBindingId,
    pub init: Option<ExprId>,
}

/// A method declaration site: the binding plus the body and the spans of
/// the signature's type nodes in this unit. Parameter references inside the
/// body resolve through their bindings' [`BindingKind::Param`].
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub binding: MethodBindingId,
    /// Spans of the declared parameter type nodes, when rewritable.
    pub param_type_spans: SmallVec<[Option<Span>; 4]>,
    /// Span of the declared return type node, when rewritable.
    pub return_type_span: Option<Span>,
    pub body: Vec<Stmt>,
}

/// A type declaration site inside a unit.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub ty: TypeId,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

/// One source unit: a file's worth of declarations plus its expression arena.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub name: String,
    pub exprs: Vec<Expr>,
    pub classes: Vec<ClassDef>,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exprs: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Appends an expression to the arena and returns its id.
    pub fn add_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr { kind, span });
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }
}

/// The whole program handed over by the front end: all units plus the
/// program-global binding tables.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub units: Vec<SourceUnit>,
    pub bindings: Vec<VarBinding>,
    pub methods: Vec<MethodBinding>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: SourceUnit) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(unit);
        id
    }

    pub fn add_binding(&mut self, binding: VarBinding) -> VarBindingId {
        let id = VarBindingId(self.bindings.len() as u32);
        self.bindings.push(binding);
        id
    }

    pub fn add_method(&mut self, method: MethodBinding) -> MethodBindingId {
        let id = MethodBindingId(self.methods.len() as u32);
        self.methods.push(method);
        id
    }

    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.0 as usize]
    }

    pub fn binding(&self, id: VarBindingId) -> &VarBinding {
        &self.bindings[id.0 as usize]
    }

    pub fn method(&self, id: MethodBindingId) -> &MethodBinding {
        &self.methods[id.0 as usize]
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.units.len() as u32).map(UnitId)
    }
}
