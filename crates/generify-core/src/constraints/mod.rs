//! Type-constraint graph: variables, constraints, and the owning model
//!
//! This module hosts the graph side of the engine:
//! - [`variable`] defines the arena node types
//! - [`typeset`] defines the lattice estimates attached to nodes
//! - [`model`] owns the arenas, interning tables and equivalence sets
//! - [`creator`] populates the model from each source unit's bound tree

pub mod creator;
pub mod model;
pub mod typeset;
pub mod variable;

pub use creator::ConstraintCreator;
pub use model::ConstraintModel;
pub use typeset::TypeSet;
pub use variable::{
    ConstraintId, ConstraintVariable, EquivSetId, EquivalenceSet, SourceRange, SubtypeConstraint,
    VarId, VariableKind,
};
