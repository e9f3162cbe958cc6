//! The rule engine: compiled rules and their iterators.
//!
//! A rule is a conjunction of terms over an entity store, answered with a
//! backtracking virtual machine. Compilation analyzes variable
//! dependencies, elects a root, and emits a small instruction program;
//! iteration executes that program, yielding one variable assignment per
//! successful path.
//!
//! ```
//! use rulog::{Rule, Store, Term};
//!
//! let mut store = Store::new();
//! let likes = store.named("Likes");
//! let alice = store.named("Alice");
//! let bob = store.named("Bob");
//! store.add_pair(alice, likes, bob);
//!
//! // Likes(., _Who)
//! let rule = Rule::new(&store, vec![Term::new(likes).object("_Who")]).unwrap();
//! let who = rule.find_var("_Who").unwrap();
//!
//! let mut it = rule.iter(&store);
//! assert!(it.next());
//! assert_eq!(it.entities(), &[alice]);
//! assert_eq!(it.get_var(who), bob);
//! assert!(!it.next());
//! ```

pub(crate) mod compile;
pub(crate) mod eval;
pub(crate) mod iter;
pub(crate) mod op;
pub(crate) mod pair;
pub(crate) mod var;

pub use iter::Iter;

use crate::error::{RuleError, RuleResult};
use crate::id::Id;
use crate::rule::compile::Compiler;
use crate::rule::op::Op;
use crate::rule::var::{RuleVar, VarId, VarKind};
use crate::store::Store;
use crate::term::{Term, TermOper};

/// A compiled rule: the instruction program plus its variable table.
///
/// Immutable once compiled; any number of iterators can be created from
/// it against the store it was compiled for.
pub struct Rule {
    pub(crate) terms: Vec<Term>,
    pub(crate) vars: Vec<RuleVar>,
    pub(crate) ops: Vec<Op>,
    pub(crate) frame_count: usize,
    /// Filter id per term, variables encoded as wildcards.
    pub(crate) term_ids: Vec<Id>,
    /// Entity-kind variable bound to each term's subject, if any.
    pub(crate) subject_vars: Vec<Option<VarId>>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("terms", &self.terms.len())
            .field("variables", &self.vars.len())
            .field("operations", &self.ops.len())
            .finish()
    }
}

impl Rule {
    /// Compile a list of terms into a rule program.
    pub fn new(store: &Store, terms: Vec<Term>) -> RuleResult<Rule> {
        if terms.is_empty() {
            return Err(RuleError::NoTerms);
        }
        if terms.iter().all(|t| t.oper == TermOper::Not) {
            return Err(RuleError::OnlyNotTerms);
        }

        let program = Compiler::new(store, &terms).compile()?;

        let term_ids: Vec<Id> = terms.iter().map(Term::filter_id).collect();
        let subject_vars = terms
            .iter()
            .map(|t| {
                let name = t.subject.var_name()?;
                program
                    .vars
                    .iter()
                    .position(|v| v.kind == VarKind::Entity && v.name == name)
            })
            .collect();

        Ok(Rule {
            terms,
            vars: program.vars,
            ops: program.ops,
            frame_count: program.frame_count,
            term_ids,
            subject_vars,
        })
    }

    /// Number of variables, including internal anonymous ones.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Find an entity variable by name. "This" is an alias of ".".
    pub fn find_var(&self, name: &str) -> Option<usize> {
        let name = if name == "This" { "." } else { name };
        self.vars
            .iter()
            .position(|v| v.kind == VarKind::Entity && v.name == name)
    }

    pub fn var_name(&self, var: usize) -> &str {
        &self.vars[var].name
    }

    /// Table variables are internal; applications read entity variables.
    pub fn var_is_entity(&self, var: usize) -> bool {
        self.vars[var].kind == VarKind::Entity
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Create an iterator over the rule's matches.
    ///
    /// The store must be the one the rule was compiled for and must not
    /// be structurally mutated while the iterator is live.
    pub fn iter<'a>(&'a self, store: &'a Store) -> Iter<'a> {
        Iter::new(self, store)
    }
}
