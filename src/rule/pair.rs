//! Filter pairs: compile-time filters and their reified runtime form.
//!
//! A `FilterPair` is attached to an instruction at compile time. Each
//! position holds either a literal entity or a variable register, plus the
//! predicate attributes the compiler resolved. At evaluation time the pair
//! is reified into a `Filter`: registers are substituted with their
//! current values (wildcards where still unbound), producing a concrete id
//! mask plus bookkeeping about which positions remain wildcards and where
//! discovered values should be written back.

use crate::id::{Entity, Id};
use crate::rule::var::VarId;

/// One position of a filter: a literal or a variable register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PairSlot {
    Entity(Entity),
    Var(VarId),
}

impl Default for PairSlot {
    fn default() -> Self {
        PairSlot::Entity(Entity::NULL)
    }
}

impl PairSlot {
    pub fn var(self) -> Option<VarId> {
        match self {
            PairSlot::Var(v) => Some(v),
            PairSlot::Entity(_) => None,
        }
    }
}

/// Compile-time filter of an instruction.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FilterPair {
    pub pred: PairSlot,
    /// Object position; `None` for single-component filters.
    pub obj: Option<PairSlot>,
    /// Pair with an explicitly null object; matched but never published
    /// as a term id.
    pub obj_zero: bool,
    /// Predicate is transitive (only set when the term has an object).
    pub transitive: bool,
    /// Predicate is final, or a variable: never substituted through the
    /// inheritance relation.
    pub is_final: bool,
    /// Predicate is reflexive-transitive.
    pub inclusive: bool,
}

impl FilterPair {
    pub fn pred_var(&self) -> Option<VarId> {
        self.pred.var()
    }

    pub fn obj_var(&self) -> Option<VarId> {
        self.obj.and_then(PairSlot::var)
    }
}

/// A reified filter: the concrete id mask to match, with wildcard
/// bookkeeping for variable resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Filter {
    /// Mask with wildcards in place of unresolved variables.
    pub mask: Id,
    /// Any position is a wildcard.
    pub wildcard: bool,
    pub pred_wildcard: bool,
    pub obj_wildcard: bool,
    /// Predicate and object are the same (unresolved) variable; a match
    /// must have equal halves.
    pub same_var: bool,
    /// Variable to receive the high (predicate) half of a matched id.
    pub hi_var: Option<VarId>,
    /// Variable to receive the low (object) half of a matched id.
    pub lo_var: Option<VarId>,
}

impl Filter {
    /// A fully-concrete filter for the given mask.
    pub fn exact(mask: Id) -> Filter {
        Filter {
            mask,
            wildcard: false,
            pred_wildcard: false,
            obj_wildcard: false,
            same_var: false,
            hi_var: None,
            lo_var: None,
        }
    }
}
