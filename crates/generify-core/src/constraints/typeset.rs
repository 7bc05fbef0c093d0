//! Type lattice for constraint solving
//!
//! Every constraint variable carries a [`TypeSet`] estimate: the current
//! over-approximation of the types it may still take. Estimates start at the
//! universal set (or a singleton for variables with a fixed concrete type)
//! and only ever shrink under [`TypeSet::restricted_to`], which is what makes
//! the worklist solver converge.

use crate::types::{TypeId, TypeStore};
use indexmap::IndexSet;

/// Lattice value tracking the acceptable types for a variable.
///
/// `Restricted` keeps first-seen insertion order; the deterministic type
/// selection in [`TypeSet::choose_single_type`] depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSet {
    /// No information yet. Any type is still acceptable.
    Universe,
    /// Only the listed types remain acceptable. An empty set means the
    /// constraints conflict and no type fits.
    Restricted(IndexSet<TypeId>),
}

impl TypeSet {
    /// The estimate for a variable with one fixed concrete type.
    pub fn singleton(ty: TypeId) -> Self {
        let mut set = IndexSet::new();
        set.insert(ty);
        TypeSet::Restricted(set)
    }

    /// A restricted estimate over the given candidates, in order.
    pub fn restricted(types: impl IntoIterator<Item = TypeId>) -> Self {
        TypeSet::Restricted(types.into_iter().collect())
    }

    /// The set of types a lower bound `ty` still allows: `ty` itself plus
    /// everything above it in the hierarchy.
    pub fn supertypes_of(ty: TypeId, store: &TypeStore) -> Self {
        let mut set = IndexSet::new();
        set.insert(store.erasure(ty));
        set.extend(store.supertype_closure(ty));
        TypeSet::Restricted(set)
    }

    /// The set of types an upper bound `ty` still allows: every declared
    /// type at or below it in the hierarchy.
    pub fn subtypes_of(ty: TypeId, store: &TypeStore) -> Self {
        TypeSet::Restricted(store.declared_subtypes_of(ty).into_iter().collect())
    }

    pub fn is_universe(&self) -> bool {
        matches!(self, TypeSet::Universe)
    }

    /// True when the remaining candidate set is empty (conflict).
    pub fn is_empty(&self) -> bool {
        matches!(self, TypeSet::Restricted(set) if set.is_empty())
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        match self {
            TypeSet::Universe => true,
            TypeSet::Restricted(set) => set.contains(&ty),
        }
    }

    /// Meet of two estimates. The universal set is the identity; two
    /// restricted sets intersect, keeping `self`'s first-seen order. The
    /// result is never larger than `self`.
    pub fn restricted_to(&self, other: &TypeSet) -> TypeSet {
        match (self, other) {
            (TypeSet::Universe, _) => other.clone(),
            (_, TypeSet::Universe) => self.clone(),
            (TypeSet::Restricted(mine), TypeSet::Restricted(theirs)) => TypeSet::Restricted(
                mine.iter().copied().filter(|ty| theirs.contains(ty)).collect(),
            ),
        }
    }

    /// Materializes one concrete type from the final estimate.
    ///
    /// Keeps the candidates that have no strict subtype among the other
    /// candidates (the most specific ones) and picks the first-seen of
    /// those. Returns `None` when nothing was learned: the estimate is
    /// universal, empty, or has collapsed onto the top object type alone,
    /// in which case the caller's fallback policy decides the slot.
    pub fn choose_single_type(&self, store: &TypeStore) -> Option<TypeId> {
        let candidates = match self {
            TypeSet::Universe => return None,
            TypeSet::Restricted(set) => set,
        };
        let most_specific = candidates.iter().copied().find(|&ty| {
            candidates
                .iter()
                .all(|&other| other == ty || !store.is_subtype(other, ty))
        })?;
        if most_specific == store.object() && candidates.len() == 1 {
            return None;
        }
        Some(most_specific)
    }

    /// Number of remaining candidates, `None` for the universal set.
    pub fn len(&self) -> Option<usize> {
        match self {
            TypeSet::Universe => None,
            TypeSet::Restricted(set) => Some(set.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn set_of(ids: &[u32]) -> TypeSet {
        TypeSet::restricted(ids.iter().map(|&id| TypeId(id)))
    }

    fn hierarchy() -> (TypeStore, TypeId, TypeId, TypeId) {
        let mut store = TypeStore::new();
        let number = store.declare_class("java.lang.Number", &[]);
        let integer = store.declare_class("java.lang.Integer", &[]);
        store.add_supertype(integer, number);
        let float = store.declare_class("java.lang.Float", &[]);
        store.add_supertype(float, number);
        (store, number, integer, float)
    }

    #[test]
    fn universe_is_meet_identity() {
        let set = set_of(&[3, 5]);
        assert_eq!(TypeSet::Universe.restricted_to(&set), set);
        assert_eq!(set.restricted_to(&TypeSet::Universe), set);
    }

    #[test]
    fn meet_intersects_and_keeps_left_order() {
        let left = set_of(&[4, 2, 9]);
        let right = set_of(&[9, 4]);
        assert_eq!(left.restricted_to(&right), set_of(&[4, 9]));
    }

    #[test]
    fn conflicting_bounds_leave_empty_set() {
        let left = set_of(&[1]);
        let right = set_of(&[2]);
        assert!(left.restricted_to(&right).is_empty());
    }

    #[test]
    fn supertype_bound_of_one_class() {
        let (store, number, integer, _) = hierarchy();
        let bound = TypeSet::supertypes_of(integer, &store);
        assert!(bound.contains(integer));
        assert!(bound.contains(number));
        assert!(bound.contains(store.object()));
        assert!(!bound.contains(store.null_type()));
    }

    #[test]
    fn choose_picks_most_specific() {
        let (store, _number, integer, _) = hierarchy();
        let lower = TypeSet::supertypes_of(integer, &store);
        assert_eq!(lower.choose_single_type(&store), Some(integer));

        // Two incomparable lower bounds meet at their common supertype.
        let (store, number, integer, float) = hierarchy();
        let both = TypeSet::supertypes_of(integer, &store)
            .restricted_to(&TypeSet::supertypes_of(float, &store));
        assert_eq!(both.choose_single_type(&store), Some(number));
    }

    #[test]
    fn choose_refuses_the_lone_top_type() {
        let (store, ..) = hierarchy();
        let only_object = TypeSet::singleton(store.object());
        assert_eq!(only_object.choose_single_type(&store), None);
        assert_eq!(TypeSet::Universe.choose_single_type(&store), None);
        assert_eq!(set_of(&[]).choose_single_type(&store), None);
    }

    #[test]
    fn choose_is_deterministic_for_incomparable_candidates() {
        let mut store = TypeStore::new();
        let a = store.declare_interface("com.example.Readable", &[]);
        let b = store.declare_interface("com.example.Writable", &[]);
        let first = TypeSet::restricted([a, b]).choose_single_type(&store);
        assert_eq!(first, Some(a));
        let swapped = TypeSet::restricted([b, a]).choose_single_type(&store);
        assert_eq!(swapped, Some(b));
    }

    #[quickcheck]
    fn meet_never_grows(left: Vec<u8>, right: Vec<u8>) -> bool {
        let l = TypeSet::restricted(left.iter().map(|&id| TypeId(id as u32)));
        let r = TypeSet::restricted(right.iter().map(|&id| TypeId(id as u32)));
        let met = l.restricted_to(&r);
        met.len().unwrap() <= l.len().unwrap()
    }

    #[quickcheck]
    fn meet_is_idempotent(ids: Vec<u8>) -> bool {
        let set = TypeSet::restricted(ids.iter().map(|&id| TypeId(id as u32)));
        set.restricted_to(&set) == set
    }

    #[quickcheck]
    fn repeated_restriction_is_monotone(seed: Vec<u8>, bounds: Vec<Vec<u8>>) -> bool {
        let mut estimate = TypeSet::restricted(seed.iter().map(|&id| TypeId(id as u32)));
        let mut previous = estimate.len().unwrap();
        for bound in bounds {
            let b = TypeSet::restricted(bound.iter().map(|&id| TypeId(id as u32)));
            estimate = estimate.restricted_to(&b);
            let current = estimate.len().unwrap();
            if current > previous {
                return false;
            }
            previous = current;
        }
        true
    }
}
