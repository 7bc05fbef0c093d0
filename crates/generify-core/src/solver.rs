//! Worklist-based fixpoint solver
//!
//! Seeds a lattice estimate for every live variable, then propagates subtype
//! bounds into the generic slots until nothing changes. Estimates only ever
//! shrink, so the loop converges without any special handling for cycles.
//! Equality never enters the worklist: equivalence sets already make
//! equivalent variables share one estimate-carrying identity, leaving the
//! solver with the single asymmetric relation.

use crate::ast::UnitId;
use crate::constraints::model::ConstraintModel;
use crate::constraints::typeset::TypeSet;
use crate::constraints::variable::{SubtypeConstraint, VarId, VariableKind};
use crate::error::InferenceError;
use crate::types::{TypeId, TypeKind, TypeStore};
use crate::ProgressHost;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// How many worklist pops happen between cancellation polls.
const CANCEL_BATCH: usize = 128;

/// Output of one solver run: everything the rewrite phase depends on.
#[derive(Debug, Default)]
pub struct SolveResult {
    /// Per-unit element variables whose parent declaration is rewritable.
    pub updates: IndexMap<UnitId, Vec<VarId>>,
    /// Per-unit cast variables flagged as removable.
    pub cast_removals: IndexMap<UnitId, Vec<VarId>>,
    /// Concrete type selected for each element variable that converged.
    pub chosen: HashMap<VarId, TypeId>,
    /// Worklist pops until the fixpoint was reached.
    pub iterations: usize,
}

/// Runs the fixpoint computation over a completely populated model.
pub struct FixpointSolver<'a> {
    model: &'a mut ConstraintModel,
    store: &'a TypeStore,
    max_iterations: usize,
}

impl<'a> FixpointSolver<'a> {
    pub fn new(model: &'a mut ConstraintModel, store: &'a TypeStore, max_iterations: usize) -> Self {
        Self {
            model,
            store,
            max_iterations,
        }
    }

    /// Solves to a fixpoint, then selects one concrete type per generic
    /// slot. Polls the host for cancellation between worklist batches.
    pub fn solve(&mut self, host: &dyn ProgressHost) -> Result<SolveResult, InferenceError> {
        let live = self.model.all_variables();
        self.seed_estimates(&live);

        let mut worklist: VecDeque<VarId> = live.iter().copied().collect();
        let mut in_worklist: HashSet<VarId> = worklist.iter().copied().collect();
        let mut iterations = 0usize;

        while let Some(var) = worklist.pop_front() {
            in_worklist.remove(&var);
            iterations += 1;
            if iterations > self.max_iterations {
                debug!(iterations, "iteration guard hit before fixpoint");
                break;
            }
            if iterations % CANCEL_BATCH == 0 && host.is_cancelled() {
                return Err(InferenceError::Cancelled);
            }

            let used_in = self.model.var(var).used_in.clone();
            for id in used_in {
                let constraint = self.model.constraint(id);
                self.propagate(constraint, &mut worklist, &mut in_worklist);
            }
        }
        debug!(iterations, variables = live.len(), "fixpoint reached");

        Ok(self.complete(&live, iterations))
    }

    /// Concrete type-constraint variables start at a singleton estimate,
    /// unconstrained slots at the universal set. Members of an equivalence
    /// set meet all their seeds into the one shared slot.
    fn seed_estimates(&mut self, live: &[VarId]) {
        for &id in live {
            let seed = if self.is_inference_target(id) {
                TypeSet::Universe
            } else {
                TypeSet::singleton(self.model.var(id).ty)
            };
            let merged = match self.model.estimate_of(id) {
                Some(previous) => previous.restricted_to(&seed),
                None => seed,
            };
            self.model.set_estimate(id, Some(merged));
        }
    }

    /// Whether the variable's type is inferred rather than fixed: generic
    /// slots, per-call independents, and anything declared as a bare type
    /// parameter.
    fn is_inference_target(&self, id: VarId) -> bool {
        let var = self.model.var(id);
        var.is_element()
            || matches!(var.kind, VariableKind::IndependentType { .. })
            || matches!(self.store.kind(var.ty), TypeKind::TypeParameter { .. })
    }

    /// Transfers information across one edge: a concrete endpoint bounds an
    /// inference target from below (left side) or above (right side).
    /// Constraints between two targets, or two concrete endpoints, move
    /// nothing; element identity is already handled by equivalence sets.
    fn propagate(
        &mut self,
        constraint: SubtypeConstraint,
        worklist: &mut VecDeque<VarId>,
        in_worklist: &mut HashSet<VarId>,
    ) {
        let left_target = self.is_inference_target(constraint.left);
        let right_target = self.is_inference_target(constraint.right);
        match (left_target, right_target) {
            (false, true) => {
                if let Some(bound) = self.fixed_type_of(constraint.left) {
                    let allowed = TypeSet::supertypes_of(bound, self.store);
                    self.restrict(constraint.right, &allowed, worklist, in_worklist);
                }
            }
            (true, false) => {
                if let Some(bound) = self.fixed_type_of(constraint.right) {
                    let allowed = TypeSet::subtypes_of(bound, self.store);
                    self.restrict(constraint.left, &allowed, worklist, in_worklist);
                }
            }
            _ => {}
        }
    }

    /// The single concrete type a non-target endpoint stands for, if its
    /// estimate is still a singleton.
    fn fixed_type_of(&self, id: VarId) -> Option<TypeId> {
        match self.model.estimate_of(id) {
            Some(TypeSet::Restricted(set)) if set.len() == 1 => set.first().copied(),
            _ => None,
        }
    }

    fn restrict(
        &mut self,
        id: VarId,
        allowed: &TypeSet,
        worklist: &mut VecDeque<VarId>,
        in_worklist: &mut HashSet<VarId>,
    ) {
        let previous = self
            .model
            .estimate_of(id)
            .cloned()
            .unwrap_or(TypeSet::Universe);
        let next = previous.restricted_to(allowed);
        if next != previous {
            self.model.set_estimate(id, Some(next));
            // The estimate is shared across the equivalence set, so every
            // member's constraints deserve another look.
            for member in self.model.equiv_members(id) {
                if in_worklist.insert(member) {
                    worklist.push_back(member);
                }
            }
        }
    }

    /// Completion pass: select one concrete type per element variable,
    /// group rewritable declarations and removable casts by unit, and
    /// discard every non-element estimate to free memory.
    fn complete(&mut self, live: &[VarId], iterations: usize) -> SolveResult {
        let mut result = SolveResult {
            iterations,
            ..SolveResult::default()
        };

        for &id in live {
            let var = self.model.var(id);
            let VariableKind::CollectionElement { parent, .. } = var.kind else {
                continue;
            };
            if let Some(chosen) = self
                .model
                .estimate_of(id)
                .and_then(|est| est.choose_single_type(self.store))
            {
                result.chosen.insert(id, chosen);
            }
            let parent_var = self.model.var(parent);
            let raw_parent = matches!(
                self.store.kind(parent_var.ty),
                TypeKind::Class { params, .. } | TypeKind::Interface { params, .. }
                    if !params.is_empty()
            );
            if let (Some(range), true) = (parent_var.range, raw_parent) {
                result.updates.entry(range.unit).or_default().push(id);
            }
        }

        for candidate in self.model.cast_candidates().to_vec() {
            let cast_var = self.model.var(candidate.cast);
            let VariableKind::Cast { unit, .. } = cast_var.kind else {
                continue;
            };
            let target = cast_var.ty;
            let operand_ty = result.chosen.get(&candidate.operand).copied().or_else(|| {
                if self.is_inference_target(candidate.operand) {
                    None
                } else {
                    Some(self.model.var(candidate.operand).ty)
                }
            });
            if let Some(ty) = operand_ty {
                if self.store.is_subtype(ty, target) {
                    result
                        .cast_removals
                        .entry(unit)
                        .or_default()
                        .push(candidate.cast);
                }
            }
        }

        for &id in live {
            if !self.model.var(id).is_element() && self.model.var(id).equiv.is_none() {
                self.model.var_mut(id).estimate = None;
            }
        }

        debug!(
            chosen = result.chosen.len(),
            units = result.updates.len(),
            casts = result.cast_removals.values().map(Vec::len).sum::<usize>(),
            "type selection finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        BindingKind, Program, SourceUnit, Span, TypeNodeContext, VarBinding, VarBindingId,
    };
    use crate::NullProgressHost;

    struct Fixture {
        store: TypeStore,
        program: Program,
        model: ConstraintModel,
        unit: UnitId,
        list: TypeId,
    }

    fn fixture() -> Fixture {
        let mut store = TypeStore::new();
        let list = store.declare_interface("java.util.List", &["E"]);
        let mut program = Program::new();
        let unit = program.add_unit(SourceUnit::new("A.java"));
        let mut model = ConstraintModel::new();
        model.begin_unit(unit);
        Fixture {
            store,
            program,
            model,
            unit,
            list,
        }
    }

    fn list_local(fx: &mut Fixture, name: &str) -> (VarBindingId, VarId) {
        let binding = fx.program.add_binding(VarBinding {
            name: name.into(),
            ty: Some(fx.list),
            unit: fx.unit,
            type_span: Some(Span::new(0, 4)),
            context: TypeNodeContext::Declaration,
            kind: BindingKind::Local,
        });
        let var = fx
            .model
            .make_variable_variable(binding, &fx.program.binding(binding).clone(), &mut fx.store)
            .unwrap();
        (binding, var)
    }

    #[test]
    fn single_lower_bound_selects_that_type() {
        let mut fx = fixture();
        let string = fx.store.declare_class("java.lang.String", &[]);
        let (_, items) = list_local(&mut fx, "items");
        let e = fx.store.type_params_of(fx.list)[0];
        let slot = fx.model.var(items).element_for(e).unwrap();
        let lit = fx.model.make_immutable_type_variable(string, &mut fx.store);
        fx.model.add_subtype_constraint(lit, Some(slot), &fx.store);

        let mut solver = FixpointSolver::new(&mut fx.model, &fx.store, 100_000);
        let result = solver.solve(&NullProgressHost).unwrap();
        assert_eq!(result.chosen.get(&slot), Some(&string));
        assert_eq!(result.updates.get(&fx.unit).map(Vec::len), Some(1));
    }

    #[test]
    fn two_lower_bounds_meet_at_the_common_supertype() {
        let mut fx = fixture();
        let number = fx.store.declare_class("java.lang.Number", &[]);
        let integer = fx.store.declare_class("java.lang.Integer", &[]);
        fx.store.add_supertype(integer, number);
        let float = fx.store.declare_class("java.lang.Float", &[]);
        fx.store.add_supertype(float, number);

        let (_, items) = list_local(&mut fx, "items");
        let e = fx.store.type_params_of(fx.list)[0];
        let slot = fx.model.var(items).element_for(e).unwrap();
        let a = fx.model.make_immutable_type_variable(integer, &mut fx.store);
        let b = fx.model.make_immutable_type_variable(float, &mut fx.store);
        fx.model.add_subtype_constraint(a, Some(slot), &fx.store);
        fx.model.add_subtype_constraint(b, Some(slot), &fx.store);

        let mut solver = FixpointSolver::new(&mut fx.model, &fx.store, 100_000);
        let result = solver.solve(&NullProgressHost).unwrap();
        assert_eq!(result.chosen.get(&slot), Some(&number));
    }

    #[test]
    fn conflicting_bounds_leave_the_slot_unresolved() {
        let mut fx = fixture();
        let string = fx.store.declare_class("java.lang.String", &[]);
        let number = fx.store.declare_class("java.lang.Number", &[]);

        let (_, items) = list_local(&mut fx, "items");
        let e = fx.store.type_params_of(fx.list)[0];
        let slot = fx.model.var(items).element_for(e).unwrap();
        let a = fx.model.make_immutable_type_variable(string, &mut fx.store);
        let b = fx.model.make_immutable_type_variable(number, &mut fx.store);
        fx.model.add_subtype_constraint(a, Some(slot), &fx.store);
        fx.model.add_subtype_constraint(b, Some(slot), &fx.store);

        let mut solver = FixpointSolver::new(&mut fx.model, &fx.store, 100_000);
        let result = solver.solve(&NullProgressHost).unwrap();
        // Only the top type survives the meet, so no type is selected and
        // the fallback policy decides during rewriting.
        assert_eq!(result.chosen.get(&slot), None);
        assert_eq!(result.updates.get(&fx.unit).map(Vec::len), Some(1));
    }

    #[test]
    fn estimates_shrink_monotonically() {
        let mut fx = fixture();
        let number = fx.store.declare_class("java.lang.Number", &[]);
        let integer = fx.store.declare_class("java.lang.Integer", &[]);
        fx.store.add_supertype(integer, number);

        let (_, items) = list_local(&mut fx, "items");
        let e = fx.store.type_params_of(fx.list)[0];
        let slot = fx.model.var(items).element_for(e).unwrap();
        let a = fx.model.make_immutable_type_variable(number, &mut fx.store);
        let b = fx.model.make_immutable_type_variable(integer, &mut fx.store);
        fx.model.add_subtype_constraint(a, Some(slot), &fx.store);
        fx.model.add_subtype_constraint(b, Some(slot), &fx.store);

        let mut solver = FixpointSolver::new(&mut fx.model, &fx.store, 100_000);
        solver.solve(&NullProgressHost).unwrap();
        // supertypes(Number) meets supertypes(Integer) down to exactly the
        // Number-and-above chain.
        let estimate = fx.model.estimate_of(slot).unwrap();
        assert!(estimate.contains(number));
        assert!(estimate.contains(fx.store.object()));
        assert!(!estimate.contains(integer));
    }

    #[test]
    fn resolving_twice_changes_nothing() {
        let mut fx = fixture();
        let string = fx.store.declare_class("java.lang.String", &[]);
        let (_, items) = list_local(&mut fx, "items");
        let e = fx.store.type_params_of(fx.list)[0];
        let slot = fx.model.var(items).element_for(e).unwrap();
        let lit = fx.model.make_immutable_type_variable(string, &mut fx.store);
        fx.model.add_subtype_constraint(lit, Some(slot), &fx.store);

        let first = FixpointSolver::new(&mut fx.model, &fx.store, 100_000)
            .solve(&NullProgressHost)
            .unwrap();
        let live = fx.model.all_variables().len();
        let second = FixpointSolver::new(&mut fx.model, &fx.store, 100_000)
            .solve(&NullProgressHost)
            .unwrap();

        assert_eq!(first.chosen, second.chosen);
        // The second run drains the initial worklist without a single
        // re-enqueue: every estimate was already at the fixpoint.
        assert_eq!(second.iterations, live);
    }

    #[test]
    fn cancellation_aborts_between_batches() {
        struct CancelledHost;
        impl crate::ProgressHost for CancelledHost {
            fn is_cancelled(&self) -> bool {
                true
            }
        }

        let mut fx = fixture();
        let string = fx.store.declare_class("java.lang.String", &[]);
        // Enough variables to cross one cancellation batch.
        for i in 0..CANCEL_BATCH {
            let name = format!("v{i}");
            let (_, var) = list_local(&mut fx, &name);
            let e = fx.store.type_params_of(fx.list)[0];
            let slot = fx.model.var(var).element_for(e).unwrap();
            let lit = fx.model.make_immutable_type_variable(string, &mut fx.store);
            fx.model.add_subtype_constraint(lit, Some(slot), &fx.store);
        }

        let mut solver = FixpointSolver::new(&mut fx.model, &fx.store, 100_000);
        let outcome = solver.solve(&CancelledHost);
        assert!(matches!(outcome, Err(InferenceError::Cancelled)));
    }
}
