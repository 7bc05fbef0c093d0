//! Constraint graph nodes
//!
//! One [`ConstraintVariable`] exists per distinct program entity or generic
//! slot. Variables live in an arena owned by the model and are addressed by
//! stable [`VarId`] indices; parent/child links and equivalence-set
//! references are ids into that arena, never owning pointers, so sharing
//! cycles in the graph cost nothing.

use crate::ast::{ExprId, MethodBindingId, Span, TypeNodeContext, UnitId, VarBindingId};
use crate::constraints::typeset::TypeSet;
use crate::types::TypeId;
use indexmap::IndexMap;

/// Index of a constraint variable in the model's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Index of a subtype constraint in the model's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub u32);

/// Index of a type equivalence set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EquivSetId(pub u32);

/// What program entity a constraint variable stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// A local variable or field binding.
    Variable { binding: VarBindingId },
    /// The declared type of one method parameter.
    ParameterType { method: MethodBindingId, index: usize },
    /// The declared return type of a method.
    ReturnType { method: MethodBindingId },
    /// A type-reference occurrence (array component, instanceof target).
    TypeRef { unit: UnitId, span: Span },
    /// The fixed type of a literal. Shared program-wide per type.
    ImmutableType,
    /// A method-level type parameter at one specific call site.
    IndependentType {
        unit: UnitId,
        call: ExprId,
        param: TypeId,
    },
    /// A class-instance-creation or other parameterized-type occurrence.
    ParameterizedType { unit: UnitId, expr: ExprId },
    /// One generic type-parameter slot of a parent variable.
    CollectionElement {
        parent: VarId,
        type_param: TypeId,
        /// Declaration-order index of the type parameter.
        index: usize,
    },
    /// A cast expression's target type.
    Cast { unit: UnitId, expr: ExprId },
}

/// Source location of a rewritable type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    pub unit: UnitId,
    pub span: Span,
    pub context: TypeNodeContext,
}

/// A node of the constraint graph.
#[derive(Debug, Clone)]
pub struct ConstraintVariable {
    pub kind: VariableKind,
    /// Declared type handle.
    pub ty: TypeId,
    /// Present only for variables subject to rewriting.
    pub range: Option<SourceRange>,
    /// Owning unit for unit-scoped variables, `None` for program-global
    /// ones (fields, method signatures, literal types).
    pub unit: Option<UnitId>,
    /// Current lattice estimate. For members of an equivalence set the
    /// shared estimate lives on the set instead.
    pub estimate: Option<TypeSet>,
    pub equiv: Option<EquivSetId>,
    /// Subtype constraints this variable participates in.
    pub used_in: Vec<ConstraintId>,
    /// Element-variable children, keyed by the owning type parameter.
    pub elements: IndexMap<TypeId, VarId>,
    /// Set when the variable was discarded by per-unit pruning.
    pub pruned: bool,
}

impl ConstraintVariable {
    pub fn new(kind: VariableKind, ty: TypeId) -> Self {
        Self {
            kind,
            ty,
            range: None,
            unit: None,
            estimate: None,
            equiv: None,
            used_in: Vec::new(),
            elements: IndexMap::new(),
            pruned: false,
        }
    }

    /// Whether this is a generic type-parameter slot of some parent.
    pub fn is_element(&self) -> bool {
        matches!(self.kind, VariableKind::CollectionElement { .. })
    }

    /// The element child for a type parameter, if one was created.
    pub fn element_for(&self, type_param: TypeId) -> Option<VarId> {
        self.elements.get(&type_param).copied()
    }
}

/// Directed edge asserting `left` must be assignable to `right`. The only
/// constraint kind in the graph; equality is handled by equivalence sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtypeConstraint {
    pub left: VarId,
    pub right: VarId,
}

impl SubtypeConstraint {
    pub fn new(left: VarId, right: VarId) -> Self {
        debug_assert_ne!(left, right, "self-constraints carry no information");
        Self { left, right }
    }
}

/// Union-find group of variables forced to share one inferred type.
///
/// Members re-point to the surviving set on merge (union by size), so a
/// variable's `equiv` field always names its root directly.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceSet {
    pub members: Vec<VarId>,
    /// Shared estimate for all members.
    pub estimate: Option<TypeSet>,
}

impl EquivalenceSet {
    pub fn of(members: Vec<VarId>) -> Self {
        Self {
            members,
            estimate: None,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
