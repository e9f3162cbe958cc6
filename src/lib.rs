//! Rulog: a declarative rule engine over an entity-component store.
//!
//! A rule (terminology borrowed from Prolog) is a list of terms that must
//! all hold for an entity to match. Terms take the forms
//! `Component(Subject)` and `Relation(Subject, Object)`, and any position
//! may hold a variable that is resolved at evaluation time:
//!
//! - `Position` — all entities with Position (the subject defaults to the
//!   implicit "." variable)
//! - `ChildOf(., _Parent), Position(_Parent)` — entities whose parent has
//!   Position
//! - `_X(., Tatooine)` — which relation links the subject to Tatooine?
//!
//! Rules are compiled into a small instruction program. Evaluation is a
//! backtracking virtual machine that binds whole tables where it can and
//! individual entities where it must, yielding one assignment per
//! successful path. Transitive relations are expanded through recursive
//! subset/superset walks, and predicates that are not marked final are
//! implicitly substituted through the builtin inheritance relation.
//!
//! The engine queries the store through a narrow surface (entity records,
//! table types, the id index and predicate attributes); [`Store`] is a
//! compact in-memory implementation of it.

pub mod error;
pub mod id;
mod pretty;
pub mod rule;
pub mod store;
pub mod term;

pub use error::{RuleError, RuleResult};
pub use id::{id_match, Entity, Id};
pub use rule::{Iter, Rule};
pub use store::table::{Table, TableId};
pub use store::{Attribute, Store};
pub use term::{Term, TermOper, TermRef};
