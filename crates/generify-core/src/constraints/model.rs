//! Constraint model: hash-consed variable store, constraints and
//! equivalence sets
//!
//! All `make_*` operations follow construct-or-fetch: a candidate key is
//! looked up in the intern table and an existing variable is returned when
//! the same program entity was seen before, so identical entities always
//! resolve to reference-identical nodes. The model also owns per-unit
//! pruning, which keeps whole-workspace analyses memory-bounded.

use crate::ast::{ExprId, MethodBinding, MethodBindingId, Span, TypeNodeContext, UnitId, VarBinding, VarBindingId};
use crate::ast::BindingKind;
use crate::constraints::typeset::TypeSet;
use crate::constraints::variable::{
    ConstraintId, ConstraintVariable, EquivSetId, EquivalenceSet, SourceRange, SubtypeConstraint,
    VarId, VariableKind,
};
use crate::types::{TypeId, TypeKind, TypeStore};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Structural identity of a variable, used for hash-consing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VariableKey {
    Binding(VarBindingId),
    ParameterType(MethodBindingId, usize),
    ReturnType(MethodBindingId),
    TypeRef(UnitId, Span),
    ImmutableType(TypeId),
    IndependentType(UnitId, ExprId, TypeId),
    ParameterizedType(UnitId, ExprId),
    CollectionElement(VarId, TypeId),
    Cast(UnitId, ExprId),
}

/// A cast recorded as potentially removable, together with the constraint
/// variable of its operand.
#[derive(Debug, Clone, Copy)]
pub struct CastCandidate {
    pub cast: VarId,
    pub operand: VarId,
}

/// Owns every constraint variable and constraint created for one analysis
/// invocation.
#[derive(Debug, Default)]
pub struct ConstraintModel {
    vars: Vec<ConstraintVariable>,
    var_index: HashMap<VariableKey, VarId>,
    constraints: Vec<SubtypeConstraint>,
    constraint_index: HashSet<(VarId, VarId)>,
    sets: Vec<EquivalenceSet>,
    /// Variables created while scanning the current unit, in creation order.
    unit_scope: Vec<VarId>,
    current_unit: Option<UnitId>,
    cast_candidates: Vec<CastCandidate>,
}

impl ConstraintModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(&self, id: VarId) -> &ConstraintVariable {
        &self.vars[id.0 as usize]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut ConstraintVariable {
        &mut self.vars[id.0 as usize]
    }

    pub fn constraint(&self, id: ConstraintId) -> SubtypeConstraint {
        self.constraints[id.0 as usize]
    }

    /// All live (not pruned) variables, in creation order.
    pub fn all_variables(&self) -> Vec<VarId> {
        (0..self.vars.len() as u32)
            .map(VarId)
            .filter(|id| !self.var(*id).pruned)
            .collect()
    }

    /// All subtype constraints, in creation order.
    pub fn all_constraints(&self) -> &[SubtypeConstraint] {
        &self.constraints
    }

    pub fn cast_candidates(&self) -> &[CastCandidate] {
        &self.cast_candidates
    }

    pub fn record_cast_candidate(&mut self, cast: VarId, operand: VarId) {
        self.cast_candidates.push(CastCandidate { cast, operand });
    }

    /// Marks the start of a unit scan. Variables created until the matching
    /// [`ConstraintModel::end_unit`] call are unit-scoped.
    pub fn begin_unit(&mut self, unit: UnitId) {
        self.current_unit = Some(unit);
    }

    /// Advances past the current unit: prunes every unit-scoped variable
    /// that gathered no constraint references, no element children and no
    /// equivalence membership, then clears the scope set.
    pub fn end_unit(&mut self) {
        let mut pruned = 0usize;
        // Reverse creation order, so element children are considered before
        // their parents and an emptied parent can be pruned in the same pass.
        for idx in (0..self.unit_scope.len()).rev() {
            let id = self.unit_scope[idx];
            let var = self.var(id);
            if var.pruned
                || !var.used_in.is_empty()
                || !var.elements.is_empty()
                || var.equiv.is_some()
            {
                continue;
            }
            let key = self.key_of(id);
            self.var_index.remove(&key);
            if let VariableKind::CollectionElement { parent, type_param, .. } = self.var(id).kind {
                self.var_mut(parent).elements.shift_remove(&type_param);
            }
            self.var_mut(id).pruned = true;
            pruned += 1;
        }
        debug!(unit = ?self.current_unit, pruned, "unit scan finished");
        self.unit_scope.clear();
        self.current_unit = None;
    }

    fn key_of(&self, id: VarId) -> VariableKey {
        let var = self.var(id);
        match var.kind {
            VariableKind::Variable { binding } => VariableKey::Binding(binding),
            VariableKind::ParameterType { method, index } => {
                VariableKey::ParameterType(method, index)
            }
            VariableKind::ReturnType { method } => VariableKey::ReturnType(method),
            VariableKind::TypeRef { unit, span } => VariableKey::TypeRef(unit, span),
            VariableKind::ImmutableType => VariableKey::ImmutableType(var.ty),
            VariableKind::IndependentType { unit, call, param } => {
                VariableKey::IndependentType(unit, call, param)
            }
            VariableKind::ParameterizedType { unit, expr } => {
                VariableKey::ParameterizedType(unit, expr)
            }
            VariableKind::CollectionElement { parent, type_param, .. } => {
                VariableKey::CollectionElement(parent, type_param)
            }
            VariableKind::Cast { unit, expr } => VariableKey::Cast(unit, expr),
        }
    }

    fn intern(
        &mut self,
        key: VariableKey,
        unit_scoped: bool,
        build: impl FnOnce() -> ConstraintVariable,
    ) -> (VarId, bool) {
        if let Some(&id) = self.var_index.get(&key) {
            return (id, false);
        }
        let id = VarId(self.vars.len() as u32);
        let mut var = build();
        if unit_scoped {
            var.unit = self.current_unit;
            if self.current_unit.is_some() {
                self.unit_scope.push(id);
            }
        }
        self.vars.push(var);
        self.var_index.insert(key, id);
        (id, true)
    }

    /// Variable for a local or field binding. Yields `None` for bindings
    /// with an unresolved or non-reference declared type.
    pub fn make_variable_variable(
        &mut self,
        id: VarBindingId,
        binding: &VarBinding,
        store: &mut TypeStore,
    ) -> Option<VarId> {
        let ty = binding.ty?;
        if !store.is_reference(ty) {
            return None;
        }
        let unit_scoped = matches!(binding.kind, BindingKind::Local);
        let range = binding.type_span.map(|span| SourceRange {
            unit: binding.unit,
            span,
            context: binding.context,
        });
        let (var, fresh) = self.intern(VariableKey::Binding(id), unit_scoped, || {
            let mut v = ConstraintVariable::new(VariableKind::Variable { binding: id }, ty);
            v.range = range;
            v
        });
        if fresh {
            self.ensure_elements(var, store);
        }
        Some(var)
    }

    /// Variable for one declared parameter type of a method.
    pub fn make_parameter_type_variable(
        &mut self,
        id: MethodBindingId,
        method: &MethodBinding,
        index: usize,
        store: &mut TypeStore,
    ) -> Option<VarId> {
        let ty = (*method.param_types.get(index)?)?;
        if !store.is_reference(ty) {
            return None;
        }
        let (var, fresh) = self.intern(VariableKey::ParameterType(id, index), false, || {
            ConstraintVariable::new(VariableKind::ParameterType { method: id, index }, ty)
        });
        if fresh {
            self.ensure_elements(var, store);
        }
        Some(var)
    }

    /// Variable for the declared return type of a method. `None` for void
    /// methods and constructors.
    pub fn make_return_type_variable(
        &mut self,
        id: MethodBindingId,
        method: &MethodBinding,
        store: &mut TypeStore,
    ) -> Option<VarId> {
        let ty = method.return_type?;
        if method.is_constructor || !store.is_reference(ty) {
            return None;
        }
        let (var, fresh) = self.intern(VariableKey::ReturnType(id), false, || {
            ConstraintVariable::new(VariableKind::ReturnType { method: id }, ty)
        });
        if fresh {
            self.ensure_elements(var, store);
        }
        Some(var)
    }

    /// Variable for a type-reference occurrence (array component type,
    /// instanceof target). These carry a range and are rewritable.
    pub fn make_type_ref_variable(
        &mut self,
        unit: UnitId,
        span: Span,
        ty: TypeId,
        context: TypeNodeContext,
        store: &mut TypeStore,
    ) -> Option<VarId> {
        if !store.is_reference(ty) {
            return None;
        }
        let (var, fresh) = self.intern(VariableKey::TypeRef(unit, span), true, || {
            let mut v = ConstraintVariable::new(VariableKind::TypeRef { unit, span }, ty);
            v.range = Some(SourceRange { unit, span, context });
            v
        });
        if fresh {
            self.ensure_elements(var, store);
        }
        Some(var)
    }

    /// Variable for the fixed type of a literal, shared per type.
    pub fn make_immutable_type_variable(
        &mut self,
        ty: TypeId,
        store: &mut TypeStore,
    ) -> Option<VarId> {
        if !store.is_reference(ty) {
            return None;
        }
        let (var, fresh) = self.intern(VariableKey::ImmutableType(ty), false, || {
            ConstraintVariable::new(VariableKind::ImmutableType, ty)
        });
        if fresh {
            self.ensure_elements(var, store);
        }
        Some(var)
    }

    /// Per-call variable for a method-level type parameter.
    pub fn make_independent_type_variable(
        &mut self,
        unit: UnitId,
        call: ExprId,
        param: TypeId,
    ) -> VarId {
        let (var, _) = self.intern(
            VariableKey::IndependentType(unit, call, param),
            true,
            || {
                ConstraintVariable::new(
                    VariableKind::IndependentType { unit, call, param },
                    param,
                )
            },
        );
        var
    }

    /// Variable for a class-instance-creation expression's type node.
    pub fn make_parameterized_type_variable(
        &mut self,
        unit: UnitId,
        expr: ExprId,
        ty: TypeId,
        type_span: Option<Span>,
        store: &mut TypeStore,
    ) -> Option<VarId> {
        if !store.is_reference(ty) {
            return None;
        }
        let (var, fresh) = self.intern(VariableKey::ParameterizedType(unit, expr), true, || {
            let mut v =
                ConstraintVariable::new(VariableKind::ParameterizedType { unit, expr }, ty);
            v.range = type_span.map(|span| SourceRange {
                unit,
                span,
                context: TypeNodeContext::Declaration,
            });
            v
        });
        if fresh {
            self.ensure_elements(var, store);
        }
        Some(var)
    }

    /// Variable for a cast expression's target type.
    pub fn make_cast_variable(
        &mut self,
        unit: UnitId,
        expr: ExprId,
        target: TypeId,
        store: &mut TypeStore,
    ) -> Option<VarId> {
        if !store.is_reference(target) {
            return None;
        }
        let (var, fresh) = self.intern(VariableKey::Cast(unit, expr), true, || {
            ConstraintVariable::new(VariableKind::Cast { unit, expr }, target)
        });
        if fresh {
            self.ensure_elements(var, store);
        }
        Some(var)
    }

    /// Child variable for one generic type-parameter slot of `parent`.
    /// Construct-or-fetch keyed by the (parent, type parameter) pair, so no
    /// duplicate child can exist for the same slot.
    pub fn element_variable(&mut self, parent: VarId, type_param: TypeId, store: &TypeStore) -> VarId {
        debug_assert!(
            matches!(store.kind(type_param), TypeKind::TypeParameter { .. }),
            "element slot requested for a non-type-parameter key"
        );
        let key = VariableKey::CollectionElement(parent, type_param);
        if let Some(&id) = self.var_index.get(&key) {
            return id;
        }
        let index = store.param_index(type_param);
        let unit_scoped = self.var(parent).unit.is_some();
        let (id, _) = self.intern(key, unit_scoped, || {
            ConstraintVariable::new(
                VariableKind::CollectionElement {
                    parent,
                    type_param,
                    index,
                },
                type_param,
            )
        });
        let previous = self.var_mut(parent).elements.insert(type_param, id);
        debug_assert!(previous.is_none(), "duplicate element child for one slot");
        id
    }

    /// Creates element children for every type parameter declared by the
    /// variable's type, pins slots that a parameterized reference fixes to
    /// concrete arguments, and links slots to the corresponding slots of
    /// every supertype reference in the hierarchy (structural widening).
    fn ensure_elements(&mut self, var: VarId, store: &mut TypeStore) {
        let ty = self.var(var).ty;
        let erased = store.erasure(ty);
        let params = store.type_params_of(erased);
        for tp in &params {
            self.element_variable(var, *tp, store);
        }

        let args = store.type_args_of(ty);
        for (tp, arg) in params.iter().zip(args.iter()) {
            if matches!(store.kind(*arg), TypeKind::TypeParameter { .. }) {
                continue;
            }
            let slot = self.var(var).element_for(*tp);
            let pinned = self.make_immutable_type_variable(*arg, store);
            self.add_equals_constraint(slot, pinned);
        }

        self.link_supertype_slots(var, erased, store);
    }

    /// For each supertype reference of `decl`, creates the slots the
    /// supertype declares and equates them with whatever instantiates them:
    /// a subtype's own slot, or an immutable variable for a concrete
    /// argument. Recurses through the whole hierarchy, so a container's
    /// narrower declared type shares element identity with its interfaces.
    fn link_supertype_slots(&mut self, var: VarId, decl: TypeId, store: &mut TypeStore) {
        for super_ref in store.declared_supertype_refs(decl) {
            let super_decl = store.erasure(super_ref);
            let super_params = store.type_params_of(super_decl);
            let args = store.type_args_of(super_ref);
            for (i, sp) in super_params.iter().enumerate() {
                let slot = self.element_variable(var, *sp, store);
                match args.get(i).copied() {
                    Some(arg) if matches!(store.kind(arg), TypeKind::TypeParameter { .. }) => {
                        let lower = self.var(var).element_for(arg);
                        self.add_equals_constraint(Some(slot), lower);
                    }
                    Some(arg) => {
                        let pinned = self.make_immutable_type_variable(arg, store);
                        self.add_equals_constraint(Some(slot), pinned);
                    }
                    None => {}
                }
            }
            self.link_supertype_slots(var, super_decl, store);
        }
    }

    /// Whether the pair passes the constraint filter: both endpoints
    /// present, distinct, and at least one generic-relevant.
    fn keep(&self, left: VarId, right: VarId, store: &TypeStore) -> bool {
        if left == right {
            return false;
        }
        store.is_generic_relevant(self.var(left).ty) || store.is_generic_relevant(self.var(right).ty)
    }

    /// Creates the subtype constraint `left <= right` unless the filter
    /// rejects the pair. Interned, so duplicates collapse to one edge.
    pub fn add_subtype_constraint(
        &mut self,
        left: Option<VarId>,
        right: Option<VarId>,
        store: &TypeStore,
    ) -> Option<ConstraintId> {
        let (left, right) = (left?, right?);
        if !self.keep(left, right, store) {
            return None;
        }
        if !self.constraint_index.insert((left, right)) {
            return None;
        }
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(SubtypeConstraint::new(left, right));
        self.var_mut(left).used_in.push(id);
        self.var_mut(right).used_in.push(id);
        Some(id)
    }

    /// Forces two variables to share one inferred type by merging their
    /// equivalence sets. Merge is union by size: every member of the
    /// smaller set is re-pointed at the larger.
    pub fn add_equals_constraint(&mut self, left: Option<VarId>, right: Option<VarId>) {
        let (Some(left), Some(right)) = (left, right) else {
            return;
        };
        if left == right {
            return;
        }
        match (self.var(left).equiv, self.var(right).equiv) {
            (None, None) => {
                let id = EquivSetId(self.sets.len() as u32);
                self.sets.push(EquivalenceSet::of(vec![left, right]));
                self.var_mut(left).equiv = Some(id);
                self.var_mut(right).equiv = Some(id);
            }
            (Some(set), None) => {
                self.sets[set.0 as usize].members.push(right);
                self.var_mut(right).equiv = Some(set);
            }
            (None, Some(set)) => {
                self.sets[set.0 as usize].members.push(left);
                self.var_mut(left).equiv = Some(set);
            }
            (Some(a), Some(b)) => {
                if a != b {
                    self.merge_sets(a, b);
                }
            }
        }
    }

    fn merge_sets(&mut self, a: EquivSetId, b: EquivSetId) {
        let (into, from) = if self.sets[a.0 as usize].len() >= self.sets[b.0 as usize].len() {
            (a, b)
        } else {
            (b, a)
        };
        let moved = std::mem::take(&mut self.sets[from.0 as usize].members);
        for member in &moved {
            self.var_mut(*member).equiv = Some(into);
        }
        self.sets[into.0 as usize].members.extend(moved);
    }

    /// The equivalence set a variable belongs to, if any.
    pub fn equiv_set(&self, var: VarId) -> Option<EquivSetId> {
        self.var(var).equiv
    }

    /// Members sharing the variable's equivalence set, including itself.
    pub fn equiv_members(&self, var: VarId) -> Vec<VarId> {
        match self.var(var).equiv {
            Some(set) => self.sets[set.0 as usize].members.clone(),
            None => vec![var],
        }
    }

    /// Current estimate for a variable. Members of an equivalence set share
    /// the set's estimate.
    pub fn estimate_of(&self, var: VarId) -> Option<&TypeSet> {
        match self.var(var).equiv {
            Some(set) => self.sets[set.0 as usize].estimate.as_ref(),
            None => self.var(var).estimate.as_ref(),
        }
    }

    /// Stores an estimate on the variable's estimate-carrying identity (the
    /// equivalence set when it has one).
    pub fn set_estimate(&mut self, var: VarId, estimate: Option<TypeSet>) {
        match self.var(var).equiv {
            Some(set) => self.sets[set.0 as usize].estimate = estimate,
            None => self.var_mut(var).estimate = estimate,
        }
    }
}
