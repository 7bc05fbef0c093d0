//! # Generify Core
//!
//! Whole-program inference of generic type arguments for raw container
//! declarations. The engine builds a type-constraint graph over every
//! source unit, solves it to a fixpoint, and plans the source rewrites that
//! turn untyped container declarations into parameterized ones.
//!
//! ## Modules
//!
//! - **[`types`]** - interned type universe (hierarchy, parameters, subtyping)
//! - **[`ast`]** - the bound syntax tree contract supplied by the front end
//! - **[`constraints`]** - constraint variables, the owning model, and the
//!   per-unit creator
//! - **[`solver`]** - worklist fixpoint solver and type selection
//! - **[`rewrite`]** - rewrite planning and import registration
//!
//! ## Quick Start
//!
//! ```rust
//! use generify_core::{InferencePipeline, NullProgressHost};
//! use generify_core::ast::Program;
//! use generify_core::rewrite::AcceptAllImports;
//! use generify_core::types::TypeStore;
//!
//! let program = Program::new();
//! let mut store = TypeStore::new();
//! let pipeline = InferencePipeline::new();
//! let outcome = pipeline
//!     .run(&program, &mut store, &NullProgressHost, &mut AcceptAllImports)
//!     .unwrap();
//! assert!(outcome.plan.is_empty());
//! ```

pub mod ast;
pub mod constraints;
pub mod error;
pub mod rewrite;
pub mod solver;
pub mod types;

use crate::ast::Program;
use crate::constraints::creator::ConstraintCreator;
use crate::constraints::model::ConstraintModel;
use crate::rewrite::{ImportRegistrar, RewritePlan, RewritePlanner};
use crate::solver::FixpointSolver;
use crate::types::TypeStore;
use anyhow::Result;
use serde::Serialize;
use tracing::debug;

pub use crate::constraints::{ConstraintVariable, SubtypeConstraint, TypeSet, VarId};
pub use crate::error::InferenceError;

/// Host-side progress reporting and cancellation.
///
/// The creator polls after finishing each unit and the solver polls between
/// worklist batches. Cancellation aborts the run with no partial external
/// effect, since edits are only planned after solving completes.
pub trait ProgressHost {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn report(&self, phase: &str, current: usize, total: usize) {
        let _ = (phase, current, total);
    }
}

/// Host that never cancels and swallows progress.
#[derive(Debug, Default)]
pub struct NullProgressHost;

impl ProgressHost for NullProgressHost {}

/// Analysis configuration.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// When a declaration keeps an unresolved slot: `true` leaves the whole
    /// declaration raw, `false` (the default) degrades per slot to a
    /// wildcard where legal or to the top object type.
    pub leave_raw_on_unresolved: bool,
    /// Upper bound on solver worklist pops. Generously above anything a
    /// real workspace produces; purely a runaway guard.
    pub max_iterations: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            leave_raw_on_unresolved: false,
            max_iterations: 1_000_000,
        }
    }
}

impl InferenceConfig {
    pub fn leave_raw_on_unresolved(mut self, leave_raw: bool) -> Self {
        self.leave_raw_on_unresolved = leave_raw;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Serializable run statistics for host-side reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InferenceSummary {
    pub units_scanned: usize,
    pub variables: usize,
    pub constraints: usize,
    pub solver_iterations: usize,
    pub inferred_slots: usize,
    pub planned_edits: usize,
    pub removable_casts: usize,
}

/// Everything one analysis invocation produces.
#[derive(Debug)]
pub struct InferenceOutcome {
    pub plan: RewritePlan,
    pub summary: InferenceSummary,
}

/// Top-level facade running the full phase order: scan all units (pruning
/// after each), solve once to a fixpoint, select types, plan rewrites.
#[derive(Debug, Default)]
pub struct InferencePipeline {
    config: InferenceConfig,
}

impl InferencePipeline {
    pub fn new() -> Self {
        Self {
            config: InferenceConfig::default(),
        }
    }

    pub fn with_config(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// Runs the analysis under the given host. All state is transient; the
    /// returned plan and summary are the only outputs that survive.
    pub fn run(
        &self,
        program: &Program,
        store: &mut TypeStore,
        host: &dyn ProgressHost,
        registrar: &mut dyn ImportRegistrar,
    ) -> Result<InferenceOutcome> {
        let total_units = program.units.len();
        let mut model = ConstraintModel::new();

        {
            let mut creator = ConstraintCreator::new(program, store, &mut model);
            for (done, unit) in program.unit_ids().enumerate() {
                creator.scan_unit(unit);
                host.report("scan", done + 1, total_units);
                if host.is_cancelled() {
                    return Err(InferenceError::Cancelled.into());
                }
            }
        }

        let variables = model.all_variables().len();
        let constraints = model.all_constraints().len();
        debug!(variables, constraints, "model populated");

        let solve = FixpointSolver::new(&mut model, store, self.config.max_iterations).solve(host)?;
        host.report("solve", 1, 1);

        let planner = RewritePlanner::new(&model, store, program, &self.config);
        let plan = planner.plan(&solve, registrar);
        host.report("rewrite", 1, 1);

        let summary = InferenceSummary {
            units_scanned: total_units,
            variables,
            constraints,
            solver_iterations: solve.iterations,
            inferred_slots: solve.chosen.len(),
            planned_edits: plan.edit_count(),
            removable_casts: plan.cast_removal_count(),
        };
        Ok(InferenceOutcome { plan, summary })
    }
}
