//! Rewrite planning: from chosen types back to source locations
//!
//! The planner consumes the solver's two output maps and produces, per
//! unit, the text edits that parameterize raw declarations plus the casts
//! that became redundant. Actual text manipulation and import management
//! belong to an external edit service; the planner only emits instructions
//! and registers the imports each edit needs through [`ImportRegistrar`].

use crate::ast::{Program, Span, TypeNodeContext, UnitId};
use crate::constraints::model::ConstraintModel;
use crate::constraints::variable::{VarId, VariableKind};
use crate::solver::SolveResult;
use crate::types::{TypeId, TypeKind, TypeStore};
use crate::InferenceConfig;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// External import management service.
///
/// Returning `false` means the qualified name cannot be resolved into an
/// importable reference; the declaration whose edit needed it is then left
/// raw, without affecting unrelated declarations.
pub trait ImportRegistrar {
    fn register(&mut self, unit: UnitId, qualified_name: &str) -> bool;
}

/// Registrar for hosts that manage imports elsewhere. Accepts every name.
#[derive(Debug, Default)]
pub struct AcceptAllImports;

impl ImportRegistrar for AcceptAllImports {
    fn register(&mut self, _unit: UnitId, _qualified_name: &str) -> bool {
        true
    }
}

/// Replacement of one type node's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeEdit {
    pub span: Span,
    pub new_text: String,
}

/// Removal of one redundant cast expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastRemoval {
    pub span: Span,
}

/// A declaration whose rewrite was abandoned, left raw in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDeclaration {
    pub span: Span,
    pub reason: String,
}

/// Planned rewrites for one source unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitRewrites {
    pub unit: UnitId,
    pub unit_name: String,
    pub edits: Vec<TypeEdit>,
    pub cast_removals: Vec<CastRemoval>,
    /// Declarations skipped because a chosen type was not importable.
    pub skipped: Vec<SkippedDeclaration>,
}

/// The full rewrite plan for one analysis invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewritePlan {
    pub units: Vec<UnitRewrites>,
}

impl RewritePlan {
    /// True when the plan carries no actionable edit or removal.
    pub fn is_empty(&self) -> bool {
        self.units
            .iter()
            .all(|u| u.edits.is_empty() && u.cast_removals.is_empty())
    }

    pub fn edit_count(&self) -> usize {
        self.units.iter().map(|u| u.edits.len()).sum()
    }

    pub fn cast_removal_count(&self) -> usize {
        self.units.iter().map(|u| u.cast_removals.len()).sum()
    }
}

/// Maps chosen types back onto the declarations that produced them.
pub struct RewritePlanner<'a> {
    model: &'a ConstraintModel,
    store: &'a TypeStore,
    program: &'a Program,
    config: &'a InferenceConfig,
}

impl<'a> RewritePlanner<'a> {
    pub fn new(
        model: &'a ConstraintModel,
        store: &'a TypeStore,
        program: &'a Program,
        config: &'a InferenceConfig,
    ) -> Self {
        Self {
            model,
            store,
            program,
            config,
        }
    }

    /// Builds the plan from the solver's output maps.
    pub fn plan(&self, solve: &SolveResult, registrar: &mut dyn ImportRegistrar) -> RewritePlan {
        let mut plan = RewritePlan::default();
        // Guards against rewriting one type node twice when several element
        // variables reach the same parent through an equivalence chain.
        let mut rewritten: HashSet<(UnitId, Span)> = HashSet::new();

        for (&unit, slots) in &solve.updates {
            let mut edits = Vec::new();
            let mut skipped = Vec::new();
            let mut parents: Vec<VarId> = Vec::new();
            for &slot in slots {
                if let VariableKind::CollectionElement { parent, .. } = self.model.var(slot).kind {
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
            }
            for parent in parents {
                let Some(range) = self.model.var(parent).range else {
                    continue;
                };
                if !rewritten.insert((range.unit, range.span)) {
                    continue;
                }
                match self.declaration_edit(parent, range.span, range.context, unit, solve, registrar)
                {
                    Ok(Some(edit)) => edits.push(edit),
                    Ok(None) => {}
                    Err(reason) => {
                        warn!(
                            unit = self.program.unit(unit).name.as_str(),
                            offset = range.span.start,
                            reason,
                            "declaration left raw"
                        );
                        skipped.push(SkippedDeclaration {
                            span: range.span,
                            reason: reason.to_string(),
                        });
                    }
                }
            }

            let cast_removals = solve
                .cast_removals
                .get(&unit)
                .map(|casts| self.cast_removals(casts))
                .unwrap_or_default();

            if !edits.is_empty() || !cast_removals.is_empty() || !skipped.is_empty() {
                plan.units.push(UnitRewrites {
                    unit,
                    unit_name: self.program.unit(unit).name.clone(),
                    edits,
                    cast_removals,
                    skipped,
                });
            }
        }

        // Units with removable casts but no declaration updates still get
        // their removals planned.
        for (&unit, casts) in &solve.cast_removals {
            if plan.units.iter().any(|u| u.unit == unit) {
                continue;
            }
            let cast_removals = self.cast_removals(casts);
            if !cast_removals.is_empty() {
                plan.units.push(UnitRewrites {
                    unit,
                    unit_name: self.program.unit(unit).name.clone(),
                    edits: Vec::new(),
                    cast_removals,
                    skipped: Vec::new(),
                });
            }
        }

        plan
    }

    fn cast_removals(&self, casts: &[VarId]) -> Vec<CastRemoval> {
        casts
            .iter()
            .filter_map(|&cast| match self.model.var(cast).kind {
                VariableKind::Cast { unit, expr } => Some(CastRemoval {
                    span: self.program.unit(unit).expr(expr).span,
                }),
                _ => None,
            })
            .collect()
    }

    /// Builds the parameterized replacement for one declaration: one type
    /// argument per declared type parameter, in declaration order. A slot
    /// with no chosen type falls back to an unbounded wildcard where that
    /// is legal, else to the fully qualified top object type, unless the
    /// configuration demands the declaration stay raw instead.
    fn declaration_edit(
        &self,
        parent: VarId,
        span: Span,
        context: TypeNodeContext,
        unit: UnitId,
        solve: &SolveResult,
        registrar: &mut dyn ImportRegistrar,
    ) -> Result<Option<TypeEdit>, &'static str> {
        let var = self.model.var(parent);
        let decl = self.store.erasure(var.ty);
        let params = self.store.type_params_of(decl);
        let mut args = Vec::with_capacity(params.len());

        for tp in &params {
            let chosen = var
                .element_for(*tp)
                .and_then(|slot| solve.chosen.get(&slot))
                .copied();
            match chosen {
                Some(ty) => {
                    self.register_imports(ty, unit, registrar)?;
                    args.push(self.render(ty));
                }
                None if self.config.leave_raw_on_unresolved => return Ok(None),
                None if context.allows_wildcard() => args.push("?".to_string()),
                None => args.push(self.store.qualified_name(self.store.object())),
            }
        }

        if args.is_empty() {
            return Ok(None);
        }
        Ok(Some(TypeEdit {
            span,
            new_text: format!("{}<{}>", self.store.simple_name(decl), args.join(", ")),
        }))
    }

    /// Registers imports for a chosen argument type, including the
    /// arguments of a nested parameterized choice.
    fn register_imports(
        &self,
        ty: TypeId,
        unit: UnitId,
        registrar: &mut dyn ImportRegistrar,
    ) -> Result<(), &'static str> {
        let erased = self.store.erasure(ty);
        if !registrar.register(unit, &self.store.qualified_name(erased)) {
            return Err("chosen type is not importable");
        }
        if let TypeKind::Parameterized { args, .. } = self.store.kind(ty) {
            for arg in args.clone() {
                self.register_imports(arg, unit, registrar)?;
            }
        }
        Ok(())
    }

    /// Simple-name rendering for inserted type arguments. Imports carry the
    /// qualification.
    fn render(&self, ty: TypeId) -> String {
        match self.store.kind(ty) {
            TypeKind::Parameterized { base, args } => {
                let rendered: Vec<String> = args.iter().map(|arg| self.render(*arg)).collect();
                format!("{}<{}>", self.store.simple_name(*base), rendered.join(", "))
            }
            _ => self.store.simple_name(ty).to_string(),
        }
    }
}
