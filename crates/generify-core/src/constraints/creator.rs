//! Constraint creator: a single-pass visitor over each unit's bound tree
//!
//! The creator walks every class, field and method body of a source unit in
//! post order and populates the constraint model. Each visited expression is
//! associated with at most one constraint variable through a node-keyed side
//! table, which ancestor nodes consult while elaborating their own
//! constraints. Nodes with unresolved bindings yield no variable and no
//! constraint; a single unresolvable expression never aborts a unit's scan.

use crate::ast::{
    AssignOp, ExprId, ExprKind, MethodBinding, MethodBindingId, MethodDef, Program, SourceUnit,
    Stmt, TypeNodeContext, UnitId,
};
use crate::constraints::model::ConstraintModel;
use crate::constraints::variable::{SourceRange, VarId};
use crate::types::{TypeId, TypeKind, TypeStore};
use std::collections::HashMap;
use tracing::debug;

/// Which slot of a declared signature an invocation resolves.
enum SignatureRole {
    Param(usize),
    Return,
}

/// Populates a [`ConstraintModel`] from the bound trees of a program, one
/// unit at a time.
pub struct ConstraintCreator<'a> {
    program: &'a Program,
    store: &'a mut TypeStore,
    model: &'a mut ConstraintModel,
    /// Side table associating each visited expression with its variable.
    /// Reset at every unit boundary.
    expr_vars: HashMap<ExprId, Option<VarId>>,
}

impl<'a> ConstraintCreator<'a> {
    pub fn new(
        program: &'a Program,
        store: &'a mut TypeStore,
        model: &'a mut ConstraintModel,
    ) -> Self {
        Self {
            program,
            store,
            model,
            expr_vars: HashMap::new(),
        }
    }

    /// Scans one source unit, then advances the model past it (which prunes
    /// variables the unit no longer needs).
    pub fn scan_unit(&mut self, unit: UnitId) {
        let program = self.program;
        let source = program.unit(unit);
        self.expr_vars.clear();
        self.model.begin_unit(unit);

        let before_vars = self.model.all_variables().len();
        let before_constraints = self.model.all_constraints().len();

        for class in &source.classes {
            for field in &class.fields {
                let binding = program.binding(field.binding);
                let fv = self
                    .model
                    .make_variable_variable(field.binding, binding, self.store);
                if let Some(init) = field.init {
                    let iv = self.visit_expr(unit, source, init);
                    self.bind_value(fv, iv);
                }
            }
            for method in &class.methods {
                self.scan_method(unit, source, method);
            }
        }

        debug!(
            unit = source.name.as_str(),
            variables = self.model.all_variables().len() - before_vars,
            constraints = self.model.all_constraints().len() - before_constraints,
            "unit scanned"
        );
        self.model.end_unit();
    }

    fn scan_method(&mut self, unit: UnitId, source: &'a SourceUnit, mdef: &'a MethodDef) {
        let program = self.program;
        let mb = program.method(mdef.binding);

        // One variable per declared parameter type, plus the return type.
        // The declaring site attaches the rewritable signature spans.
        for index in 0..mb.param_types.len() {
            let pv = self
                .model
                .make_parameter_type_variable(mdef.binding, mb, index, self.store);
            if let (Some(pv), Some(Some(span))) = (pv, mdef.param_type_spans.get(index)) {
                let var = self.model.var_mut(pv);
                if var.range.is_none() {
                    var.range = Some(SourceRange {
                        unit,
                        span: *span,
                        context: TypeNodeContext::Declaration,
                    });
                }
            }
        }
        let rv = self
            .model
            .make_return_type_variable(mdef.binding, mb, self.store);
        if let (Some(rv), Some(span)) = (rv, mdef.return_type_span) {
            let var = self.model.var_mut(rv);
            if var.range.is_none() {
                var.range = Some(SourceRange {
                    unit,
                    span,
                    context: TypeNodeContext::Declaration,
                });
            }
        }

        // Overriding families co-infer one consistent set of arguments:
        // every parameter and return slot is equated with the overridden
        // declaration's slot. Equivalence is transitive, so linking one
        // level reaches the whole family.
        if let Some(ancestor) = mb.overrides {
            let amb = program.method(ancestor);
            for index in 0..mb.param_types.len().min(amb.param_types.len()) {
                let mine = self
                    .model
                    .make_parameter_type_variable(mdef.binding, mb, index, self.store);
                let theirs = self
                    .model
                    .make_parameter_type_variable(ancestor, amb, index, self.store);
                self.model.add_equals_constraint(mine, theirs);
                self.equate_slots(mine, theirs);
            }
            let theirs = self.model.make_return_type_variable(ancestor, amb, self.store);
            self.model.add_equals_constraint(rv, theirs);
            self.equate_slots(rv, theirs);
        }

        for stmt in &mdef.body {
            self.scan_stmt(unit, source, mdef, stmt);
        }
    }

    fn scan_stmt(&mut self, unit: UnitId, source: &'a SourceUnit, mdef: &'a MethodDef, stmt: &Stmt) {
        match stmt {
            Stmt::Local { binding, init } => {
                let b = self.program.binding(*binding);
                let bv = self.model.make_variable_variable(*binding, b, self.store);
                if let Some(init) = init {
                    let iv = self.visit_expr(unit, source, *init);
                    self.bind_value(bv, iv);
                }
            }
            Stmt::Assign { target, value, op } => {
                let tv = self.visit_expr(unit, source, *target);
                let vv = self.visit_expr(unit, source, *value);
                // Implicit string concatenation carries no type information
                // for inference, so it produces no constraint at all.
                if *op != AssignOp::ConcatAssign {
                    self.bind_value(tv, vv);
                }
            }
            Stmt::Expr(expr) => {
                self.visit_expr(unit, source, *expr);
            }
            Stmt::Return(Some(expr)) => {
                let ev = self.visit_expr(unit, source, *expr);
                let mb = self.program.method(mdef.binding);
                let rv = self
                    .model
                    .make_return_type_variable(mdef.binding, mb, self.store);
                self.bind_value(rv, ev);
            }
            Stmt::Return(None) => {}
        }
    }

    /// The assignment rule: corresponding element slots of target and value
    /// are equated, and the value must be assignable to the target.
    fn bind_value(&mut self, target: Option<VarId>, value: Option<VarId>) {
        if let (Some(target), Some(value)) = (target, value) {
            self.equate_slots(Some(target), Some(value));
        }
        self.model.add_subtype_constraint(value, target, self.store);
    }

    /// Equates the element slots two variables share, recursively through
    /// nested slots.
    fn equate_slots(&mut self, a: Option<VarId>, b: Option<VarId>) {
        let (Some(a), Some(b)) = (a, b) else {
            return;
        };
        if a == b {
            return;
        }
        let shared: Vec<TypeId> = self
            .model
            .var(a)
            .elements
            .keys()
            .filter(|tp| self.model.var(b).element_for(**tp).is_some())
            .copied()
            .collect();
        for tp in shared {
            let slot_a = self.model.var(a).element_for(tp);
            let slot_b = self.model.var(b).element_for(tp);
            self.model.add_equals_constraint(slot_a, slot_b);
            self.equate_slots(slot_a, slot_b);
        }
    }

    fn visit_expr(&mut self, unit: UnitId, source: &'a SourceUnit, id: ExprId) -> Option<VarId> {
        if let Some(&cached) = self.expr_vars.get(&id) {
            return cached;
        }
        let result = self.elaborate_expr(unit, source, id);
        self.expr_vars.insert(id, result);
        result
    }

    fn elaborate_expr(&mut self, unit: UnitId, source: &'a SourceUnit, id: ExprId) -> Option<VarId> {
        let program = self.program;
        match &source.expr(id).kind {
            ExprKind::VarRef(binding) => {
                let b = program.binding(*binding);
                match b.kind {
                    crate::ast::BindingKind::Param { method, index } => {
                        let mb = program.method(method);
                        self.model
                            .make_parameter_type_variable(method, mb, index, self.store)
                    }
                    _ => self.model.make_variable_variable(*binding, b, self.store),
                }
            }
            ExprKind::FieldAccess { receiver, binding } => {
                let rv = self.visit_expr(unit, source, *receiver);
                let b = program.binding(*binding);
                let ty = b.ty?;
                match self.store.kind(ty) {
                    // A member whose declared type is a type parameter of
                    // its owner projects through the receiver's element
                    // slot instead of allocating a fresh node.
                    TypeKind::TypeParameter { owner: Some(_), .. } => {
                        rv.and_then(|r| self.model.var(r).element_for(ty))
                    }
                    TypeKind::Parameterized { .. } => {
                        let fv = self.model.make_variable_variable(*binding, b, self.store)?;
                        self.project_reference_slots(fv, ty, rv, None, id, unit);
                        Some(fv)
                    }
                    _ => self.model.make_variable_variable(*binding, b, self.store),
                }
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let rv = receiver.and_then(|r| self.visit_expr(unit, source, r));
                let arg_vars: Vec<Option<VarId>> = args
                    .iter()
                    .map(|arg| self.visit_expr(unit, source, *arg))
                    .collect();
                self.elaborate_invocation(unit, id, *method, rv, &arg_vars)
            }
            ExprKind::New {
                ty,
                type_span,
                ctor,
                args,
            } => {
                let pv = self.model.make_parameterized_type_variable(
                    unit, id, *ty, *type_span, self.store,
                );
                let arg_vars: Vec<Option<VarId>> = args
                    .iter()
                    .map(|arg| self.visit_expr(unit, source, *arg))
                    .collect();
                if let Some(ctor) = ctor {
                    // Constructor arguments constrain the created object's
                    // own slots, the receiver of the invocation being the
                    // creation itself.
                    let mb = program.method(*ctor);
                    for (index, arg_var) in arg_vars.iter().enumerate() {
                        let Some(declared) = mb.param_types.get(index).copied().flatten() else {
                            continue;
                        };
                        let site = self.signature_site_variable(
                            unit,
                            id,
                            *ctor,
                            mb,
                            declared,
                            SignatureRole::Param(index),
                            pv,
                        );
                        self.equate_slots(*arg_var, site);
                        self.model.add_subtype_constraint(*arg_var, site, self.store);
                    }
                }
                pv
            }
            ExprKind::NewArray {
                component,
                component_span,
            } => {
                // The component type node is rewritable; wildcards are the
                // only legal type argument in an array creation.
                self.model.make_type_ref_variable(
                    unit,
                    *component_span,
                    *component,
                    TypeNodeContext::ArrayCreation,
                    self.store,
                );
                None
            }
            ExprKind::Cast {
                target,
                target_span: _,
                operand,
            } => {
                let ov = self.visit_expr(unit, source, *operand);
                let cv = self.model.make_cast_variable(unit, id, *target, self.store);
                self.equate_slots(cv, ov);
                if let (Some(cast), Some(op)) = (cv, ov) {
                    self.model.record_cast_candidate(cast, op);
                }
                cv
            }
            ExprKind::InstanceOf {
                operand,
                target,
                target_span,
            } => {
                let ov = self.visit_expr(unit, source, *operand);
                let tv = self.model.make_type_ref_variable(
                    unit,
                    *target_span,
                    *target,
                    TypeNodeContext::Instanceof,
                    self.store,
                );
                self.equate_slots(tv, ov);
                // The check itself is boolean and carries no variable.
                None
            }
            ExprKind::Literal { ty } => self.model.make_immutable_type_variable(*ty, self.store),
            ExprKind::Unresolved => None,
        }
    }

    /// Resolves an invocation against the method's declared (never
    /// instantiated) signature: one subtype edge per argument and the
    /// declared return type's site variable as the call's own variable.
    fn elaborate_invocation(
        &mut self,
        unit: UnitId,
        call: ExprId,
        method: MethodBindingId,
        receiver: Option<VarId>,
        arg_vars: &[Option<VarId>],
    ) -> Option<VarId> {
        let program = self.program;
        let mb = program.method(method);
        for (index, arg_var) in arg_vars.iter().enumerate() {
            let Some(declared) = mb.param_types.get(index).copied().flatten() else {
                continue;
            };
            let site = self.signature_site_variable(
                unit,
                call,
                method,
                mb,
                declared,
                SignatureRole::Param(index),
                receiver,
            );
            // The argument's element slots share identity with the declared
            // parameter's slots, which is what carries a call site's
            // instantiated types into the method body.
            self.equate_slots(*arg_var, site);
            self.model.add_subtype_constraint(*arg_var, site, self.store);
        }

        let ret = mb.return_type?;
        self.signature_site_variable(unit, call, method, mb, ret, SignatureRole::Return, receiver)
    }

    /// The variable standing for one declared type of a signature at a
    /// specific call site.
    ///
    /// A method-level type parameter binds to a fresh per-call independent
    /// variable. A class-level type parameter projects through the
    /// receiver's element slot. A parameterized declared type keeps its own
    /// parameter/return variable, with its argument slots equated to the
    /// receiver's (or to the per-call variables of method-level parameters
    /// it mentions).
    fn signature_site_variable(
        &mut self,
        unit: UnitId,
        call: ExprId,
        method: MethodBindingId,
        mb: &'a MethodBinding,
        declared: TypeId,
        role: SignatureRole,
        receiver: Option<VarId>,
    ) -> Option<VarId> {
        match self.store.kind(declared) {
            TypeKind::TypeParameter { .. } if mb.type_params.contains(&declared) => {
                Some(self.model.make_independent_type_variable(unit, call, declared))
            }
            TypeKind::TypeParameter { owner: Some(_), .. } => {
                receiver.and_then(|r| self.model.var(r).element_for(declared))
            }
            _ => {
                let site = match role {
                    SignatureRole::Param(index) => {
                        self.model
                            .make_parameter_type_variable(method, mb, index, self.store)
                    }
                    SignatureRole::Return => {
                        self.model.make_return_type_variable(method, mb, self.store)
                    }
                }?;
                if matches!(self.store.kind(declared), TypeKind::Parameterized { .. }) {
                    self.project_reference_slots(site, declared, receiver, Some(mb), call, unit);
                }
                Some(site)
            }
        }
    }

    /// Equates the slots of `var` (whose declared type is the parameterized
    /// reference `ty`) with whatever each type argument names: the
    /// receiver's slot for a class-level parameter, or the per-call
    /// independent variable for a method-level one.
    fn project_reference_slots(
        &mut self,
        var: VarId,
        ty: TypeId,
        receiver: Option<VarId>,
        mb: Option<&'a MethodBinding>,
        call: ExprId,
        unit: UnitId,
    ) {
        let params = self.store.type_params_of(ty);
        let args = self.store.type_args_of(ty);
        for (tp, arg) in params.iter().zip(args.iter()) {
            let slot = self.model.var(var).element_for(*tp);
            if mb.is_some_and(|m| m.type_params.contains(arg)) {
                let independent = self.model.make_independent_type_variable(unit, call, *arg);
                self.model.add_equals_constraint(slot, Some(independent));
            } else if matches!(self.store.kind(*arg), TypeKind::TypeParameter { owner: Some(_), .. })
            {
                let receiver_slot =
                    receiver.and_then(|r| self.model.var(r).element_for(*arg));
                self.model.add_equals_constraint(slot, receiver_slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BindingKind, ClassDef, Span, VarBinding};
    use crate::constraints::variable::VariableKind;
    use smallvec::smallvec;

    struct Fixture {
        store: TypeStore,
        program: Program,
        list: TypeId,
        arraylist: TypeId,
        string: TypeId,
        add: MethodBindingId,
        get: MethodBindingId,
    }

    /// A store with the usual collection hierarchy and a unit containing a
    /// single host class to hang methods on.
    fn fixture() -> Fixture {
        let mut store = TypeStore::new();
        let list = store.declare_interface("java.util.List", &["E"]);
        let arraylist = store.declare_class("java.util.ArrayList", &["E"]);
        let e_al = store.type_params_of(arraylist)[0];
        let list_of_e = store.parameterized(list, &[e_al]);
        store.add_supertype(arraylist, list_of_e);
        let string = store.declare_class("java.lang.String", &[]);

        let mut program = Program::new();
        let e_list = store.type_params_of(list)[0];
        let boolean = store.primitive("boolean");
        let add = program.add_method(MethodBinding {
            name: "add".into(),
            owner: list,
            type_params: smallvec![],
            param_types: smallvec![Some(e_list)],
            return_type: Some(boolean),
            is_constructor: false,
            overrides: None,
        });
        let get = program.add_method(MethodBinding {
            name: "get".into(),
            owner: list,
            type_params: smallvec![],
            param_types: smallvec![Some(store.primitive("int"))],
            return_type: Some(e_list),
            is_constructor: false,
            overrides: None,
        });

        Fixture {
            store,
            program,
            list,
            arraylist,
            string,
            add,
            get,
        }
    }

    fn host_method(program: &mut Program, owner: TypeId) -> MethodBindingId {
        program.add_method(MethodBinding {
            name: "run".into(),
            owner,
            type_params: smallvec![],
            param_types: smallvec![],
            return_type: None,
            is_constructor: false,
            overrides: None,
        })
    }

    #[test]
    fn adding_a_literal_constrains_the_element_slot() {
        let mut fx = fixture();
        let host = fx.store.declare_class("com.example.Host", &[]);
        let run = host_method(&mut fx.program, host);

        let mut unit = SourceUnit::new("Host.java");
        let items = fx.program.add_binding(VarBinding {
            name: "items".into(),
            ty: Some(fx.list),
            unit: UnitId(0),
            type_span: Some(Span::new(0, 4)),
            context: TypeNodeContext::Declaration,
            kind: BindingKind::Local,
        });
        let items_ref = unit.add_expr(ExprKind::VarRef(items), Span::new(10, 15));
        let literal = unit.add_expr(ExprKind::Literal { ty: fx.string }, Span::new(20, 27));
        let call = unit.add_expr(
            ExprKind::Call {
                receiver: Some(items_ref),
                method: fx.add,
                args: smallvec![literal],
            },
            Span::new(10, 28),
        );
        unit.classes.push(ClassDef {
            ty: host,
            fields: vec![],
            methods: vec![MethodDef {
                binding: run,
                param_type_spans: smallvec![],
                return_type_span: None,
                body: vec![
                    Stmt::Local {
                        binding: items,
                        init: None,
                    },
                    Stmt::Expr(call),
                ],
            }],
        });
        let unit_id = fx.program.add_unit(unit);

        let mut model = ConstraintModel::new();
        let mut creator = ConstraintCreator::new(&fx.program, &mut fx.store, &mut model);
        creator.scan_unit(unit_id);

        // The argument edge runs from the string literal's variable into
        // the element slot of the receiver.
        let e_list = fx.store.type_params_of(fx.list)[0];
        let constraints = model.all_constraints();
        assert_eq!(constraints.len(), 1);
        let edge = constraints[0];
        let left = model.var(edge.left);
        assert!(matches!(left.kind, VariableKind::ImmutableType));
        assert_eq!(left.ty, fx.string);
        let right = model.var(edge.right);
        assert!(right.is_element());
        assert_eq!(right.ty, e_list);
    }

    #[test]
    fn class_level_return_projects_through_the_receiver() {
        let mut fx = fixture();
        let host = fx.store.declare_class("com.example.Host", &[]);
        let run = host_method(&mut fx.program, host);

        let mut unit = SourceUnit::new("Host.java");
        let items = fx.program.add_binding(VarBinding {
            name: "items".into(),
            ty: Some(fx.arraylist),
            unit: UnitId(0),
            type_span: Some(Span::new(0, 9)),
            context: TypeNodeContext::Declaration,
            kind: BindingKind::Local,
        });
        let items_ref = unit.add_expr(ExprKind::VarRef(items), Span::new(10, 15));
        let index = unit.add_expr(
            ExprKind::Literal {
                ty: fx.store.primitive("int"),
            },
            Span::new(20, 21),
        );
        let call = unit.add_expr(
            ExprKind::Call {
                receiver: Some(items_ref),
                method: fx.get,
                args: smallvec![index],
            },
            Span::new(10, 22),
        );
        unit.classes.push(ClassDef {
            ty: host,
            fields: vec![],
            methods: vec![MethodDef {
                binding: run,
                param_type_spans: smallvec![],
                return_type_span: None,
                body: vec![
                    Stmt::Local {
                        binding: items,
                        init: None,
                    },
                    Stmt::Expr(call),
                ],
            }],
        });
        let unit_id = fx.program.add_unit(unit);

        let mut model = ConstraintModel::new();
        let mut creator = ConstraintCreator::new(&fx.program, &mut fx.store, &mut model);
        creator.scan_unit(unit_id);

        // list.get(i) resolves to the receiver's element slot rather than a
        // fresh node. The slot keyed by List's parameter shares identity
        // with ArrayList's own slot through structural widening.
        let live = model.all_variables();
        let e_list = fx.store.type_params_of(fx.list)[0];
        let slot = live.iter().copied().find(|v| {
            model.var(*v).is_element() && model.var(*v).ty == e_list
        });
        assert!(slot.is_some());
    }

    #[test]
    fn unresolved_expressions_do_not_abort_the_scan() {
        let mut fx = fixture();
        let host = fx.store.declare_class("com.example.Host", &[]);
        let run = host_method(&mut fx.program, host);

        let mut unit = SourceUnit::new("Host.java");
        let bad = unit.add_expr(ExprKind::Unresolved, Span::new(0, 3));
        let items = fx.program.add_binding(VarBinding {
            name: "items".into(),
            ty: Some(fx.list),
            unit: UnitId(0),
            type_span: Some(Span::new(5, 9)),
            context: TypeNodeContext::Declaration,
            kind: BindingKind::Local,
        });
        let items_ref = unit.add_expr(ExprKind::VarRef(items), Span::new(10, 15));
        let literal = unit.add_expr(ExprKind::Literal { ty: fx.string }, Span::new(20, 27));
        let call = unit.add_expr(
            ExprKind::Call {
                receiver: Some(items_ref),
                method: fx.add,
                args: smallvec![literal],
            },
            Span::new(10, 28),
        );
        unit.classes.push(ClassDef {
            ty: host,
            fields: vec![],
            methods: vec![MethodDef {
                binding: run,
                param_type_spans: smallvec![],
                return_type_span: None,
                body: vec![
                    Stmt::Expr(bad),
                    Stmt::Local {
                        binding: items,
                        init: None,
                    },
                    Stmt::Expr(call),
                ],
            }],
        });
        let unit_id = fx.program.add_unit(unit);

        let mut model = ConstraintModel::new();
        let mut creator = ConstraintCreator::new(&fx.program, &mut fx.store, &mut model);
        creator.scan_unit(unit_id);

        // The unresolved statement contributed nothing, the rest of the
        // unit was still processed.
        assert_eq!(model.all_constraints().len(), 1);
    }

    #[test]
    fn string_concatenation_assignment_creates_no_constraint() {
        let mut fx = fixture();
        let host = fx.store.declare_class("com.example.Host", &[]);
        let run = host_method(&mut fx.program, host);

        let mut unit = SourceUnit::new("Host.java");
        let s = fx.program.add_binding(VarBinding {
            name: "s".into(),
            ty: Some(fx.string),
            unit: UnitId(0),
            type_span: None,
            context: TypeNodeContext::Declaration,
            kind: BindingKind::Local,
        });
        let s_ref = unit.add_expr(ExprKind::VarRef(s), Span::new(0, 1));
        let literal = unit.add_expr(ExprKind::Literal { ty: fx.string }, Span::new(5, 10));
        unit.classes.push(ClassDef {
            ty: host,
            fields: vec![],
            methods: vec![MethodDef {
                binding: run,
                param_type_spans: smallvec![],
                return_type_span: None,
                body: vec![
                    Stmt::Local {
                        binding: s,
                        init: None,
                    },
                    Stmt::Assign {
                        target: s_ref,
                        value: literal,
                        op: AssignOp::ConcatAssign,
                    },
                ],
            }],
        });
        let unit_id = fx.program.add_unit(unit);

        let mut model = ConstraintModel::new();
        let mut creator = ConstraintCreator::new(&fx.program, &mut fx.store, &mut model);
        creator.scan_unit(unit_id);

        assert!(model.all_constraints().is_empty());
    }

    #[test]
    fn overriding_methods_share_signature_slots() {
        let mut fx = fixture();
        let base = fx.store.declare_class("com.example.Base", &[]);
        let derived = fx.store.declare_class("com.example.Derived", &[]);
        fx.store.add_supertype(derived, base);

        let base_accept = fx.program.add_method(MethodBinding {
            name: "accept".into(),
            owner: base,
            type_params: smallvec![],
            param_types: smallvec![Some(fx.list)],
            return_type: Some(fx.list),
            is_constructor: false,
            overrides: None,
        });
        let derived_accept = fx.program.add_method(MethodBinding {
            name: "accept".into(),
            owner: derived,
            type_params: smallvec![],
            param_types: smallvec![Some(fx.list)],
            return_type: Some(fx.list),
            is_constructor: false,
            overrides: Some(base_accept),
        });

        let mut unit = SourceUnit::new("Derived.java");
        unit.classes.push(ClassDef {
            ty: derived,
            fields: vec![],
            methods: vec![MethodDef {
                binding: derived_accept,
                param_type_spans: smallvec![Some(Span::new(0, 4))],
                return_type_span: Some(Span::new(6, 10)),
                body: vec![],
            }],
        });
        let unit_id = fx.program.add_unit(unit);

        let mut model = ConstraintModel::new();
        let mut creator = ConstraintCreator::new(&fx.program, &mut fx.store, &mut model);
        creator.scan_unit(unit_id);

        let mine = model
            .make_parameter_type_variable(
                derived_accept,
                fx.program.method(derived_accept),
                0,
                &mut fx.store,
            )
            .unwrap();
        let theirs = model
            .make_parameter_type_variable(base_accept, fx.program.method(base_accept), 0, &mut fx.store)
            .unwrap();
        assert!(model.equiv_set(mine).is_some());
        assert_eq!(model.equiv_set(mine), model.equiv_set(theirs));
    }
}
