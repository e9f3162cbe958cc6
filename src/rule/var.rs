//! Rule variables: discovery, dependency depths and ordering.
//!
//! Subject variables are Table-kind: they bind whole tables so entities
//! can be matched and discarded in bulk. Variables used in predicate or
//! object position additionally exist as Entity-kind records under the
//! same name, resolved one entity at a time.
//!
//! Variable resolution order is what makes the emitted program efficient:
//! a root is elected (the implicit "." if present, otherwise the
//! most-occurring subject), every other variable gets a depth measuring
//! its distance from the root through shared terms, and the table is then
//! sorted by kind, depth, occurrence count and id. Ids are reassigned
//! after the sort so that a variable's id is always its position.

use crate::error::{RuleError, RuleResult};
use crate::rule::compile::Compiler;
use crate::term::{Term, TermOper};

pub(crate) type VarId = usize;

/// Cap on variables per rule, including internal anonymous ones.
pub(crate) const MAX_VARIABLE_COUNT: usize = 256;

/// Sentinel depth for variables not yet reached from the root.
pub(crate) const DEPTH_UNSET: i32 = u8::MAX as i32;

/// Table-kind sorts before Entity-kind so subjects resolve first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum VarKind {
    Table,
    Entity,
    Unknown,
}

#[derive(Debug, Clone)]
pub(crate) struct RuleVar {
    pub kind: VarKind,
    pub name: String,
    pub id: VarId,
    pub occurs: u32,
    pub depth: i32,
    pub marked: bool,
}

pub(crate) fn skip_term(term: &Term) -> bool {
    term.oper == TermOper::Not
}

impl<'a> Compiler<'a> {
    pub(crate) fn create_variable(&mut self, kind: VarKind, name: Option<&str>) -> VarId {
        let id = self.vars.len();
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("_{}", id),
        };
        self.vars.push(RuleVar {
            kind,
            name,
            id,
            occurs: 0,
            depth: DEPTH_UNSET,
            marked: false,
        });
        self.written.push(false);
        id
    }

    pub(crate) fn create_anonymous_variable(&mut self, kind: VarKind) -> VarId {
        self.create_variable(kind, None)
    }

    /// Find a variable by name and kind. `Unknown` matches either kind;
    /// the root can exist both as a table and an entity variable sharing
    /// one name, in which case the table record (sorted first) wins.
    pub(crate) fn find_variable(&self, kind: VarKind, name: &str) -> Option<VarId> {
        self.vars
            .iter()
            .position(|v| v.name == name && (kind == VarKind::Unknown || kind == v.kind))
    }

    pub(crate) fn ensure_variable(&mut self, kind: VarKind, name: &str) -> VarId {
        match self.find_variable(kind, name) {
            Some(v) => {
                if self.vars[v].kind == VarKind::Unknown {
                    self.vars[v].kind = kind;
                }
                v
            }
            None => self.create_variable(kind, Some(name)),
        }
    }

    pub(crate) fn term_pred(&self, term: &Term) -> Option<VarId> {
        let name = term.pred.var_name()?;
        self.find_variable(VarKind::Unknown, name)
    }

    pub(crate) fn term_subj(&self, term: &Term) -> Option<VarId> {
        let name = term.subject.var_name()?;
        self.find_variable(VarKind::Unknown, name)
    }

    pub(crate) fn term_obj(&self, term: &Term) -> Option<VarId> {
        let name = term.object.as_ref()?.var_name()?;
        self.find_variable(VarKind::Unknown, name)
    }

    /// The entity-kind companion of a variable (identity for entity vars).
    pub(crate) fn to_entity(&self, var: VarId) -> Option<VarId> {
        if self.vars[var].kind == VarKind::Table {
            self.find_variable(VarKind::Entity, &self.vars[var].name)
        } else {
            Some(var)
        }
    }

    /// Is this a subject (table) variable? Only valid before the sort,
    /// while ids are still in creation order.
    fn is_subject(&self, var: VarId) -> bool {
        var < self.subject_var_count
    }

    /// Register entity-kind records for every variable used anywhere in a
    /// positive term. Subject-only variables keep just their table record;
    /// non-"." subjects always get an entity companion so the program can
    /// return all permutations.
    fn ensure_all_variables(&mut self) {
        let terms = self.terms;
        for term in terms {
            if skip_term(term) {
                continue;
            }
            if let Some(name) = term.pred.var_name() {
                self.ensure_variable(VarKind::Entity, name);
            }
            if let Some(name) = term.subject.var_name() {
                if name != "." {
                    self.ensure_variable(VarKind::Entity, name);
                }
            }
            if let Some(name) = term.object.as_ref().and_then(|o| o.var_name()) {
                self.ensure_variable(VarKind::Entity, name);
            }
        }
    }

    /// Scan for variables and put them in dependency order.
    pub(crate) fn scan_variables(&mut self) -> RuleResult<()> {
        let terms = self.terms;

        // Track the subject variable with the most occurrences; absent a
        // "." variable it is elected root.
        let mut max_occur = 0;
        let mut max_occur_var = None;

        for term in terms {
            if let Some(name) = term.subject.var_name() {
                let subj = match self.find_variable(VarKind::Table, name) {
                    Some(v) => v,
                    None => self.create_variable(VarKind::Table, Some(name)),
                };
                self.vars[subj].occurs += 1;
                if self.vars[subj].occurs > max_occur {
                    max_occur = self.vars[subj].occurs;
                    max_occur_var = Some(subj);
                }
            }
        }

        self.subject_var_count = self.vars.len();

        self.ensure_all_variables();

        if self.vars.len() > MAX_VARIABLE_COUNT {
            return Err(RuleError::TooManyVariables);
        }

        // Predicate/object variables in terms with a literal subject have
        // no dependencies.
        for term in terms {
            if !term.subject.is_var() {
                if let Some(pred) = self.term_pred(term) {
                    self.vars[pred].depth = 0;
                }
                if let Some(obj) = self.term_obj(term) {
                    self.vars[obj].depth = 0;
                }
            }
        }

        // Elect a root: "." always takes precedence, otherwise the subject
        // variable with the most occurrences. Without subject variables the
        // rule evaluates a fixed fact set and needs no root.
        let root = self.find_variable(VarKind::Table, ".").or(max_occur_var);

        if let Some(root) = root {
            let depth = self.get_variable_depth(root, root);
            self.vars[root].depth = depth;

            // Every subject variable must be reachable from the root.
            for v in 0..self.subject_var_count {
                if self.vars[v].depth == DEPTH_UNSET {
                    return Err(RuleError::UnconstrainedVariable(self.vars[v].name.clone()));
                }
            }
        }

        // Variables in a Not term must have been declared by a positive
        // term; negation cannot introduce bindings.
        for term in terms {
            if term.oper != TermOper::Not {
                continue;
            }
            if term.pred.is_var() && self.term_pred(term).is_none() {
                return Err(RuleError::MissingPredicateVariable(
                    term.pred.var_name().unwrap().to_string(),
                ));
            }
            if let Some(obj) = &term.object {
                if obj.is_var() && self.term_obj(term).is_none() {
                    return Err(RuleError::MissingObjectVariable(
                        obj.var_name().unwrap().to_string(),
                    ));
                }
            }
        }

        if root.is_some() {
            // Order by kind (tables first), then ascending depth, then
            // descending occurrence count, then descending id; reassign
            // ids to restore "id == position".
            self.vars.sort_by(|a, b| {
                a.kind
                    .cmp(&b.kind)
                    .then(a.depth.cmp(&b.depth))
                    .then(b.occurs.cmp(&a.occurs))
                    .then(b.id.cmp(&a.id))
            });
            for (i, var) in self.vars.iter_mut().enumerate() {
                var.id = i;
            }
        }

        Ok(())
    }

    /// Depth of the dependency tree from `var` to the root: one more than
    /// the smallest depth among subject variables co-occurring with `var`
    /// in some term where `var` is the subject.
    fn get_variable_depth(&mut self, var: VarId, root: VarId) -> i32 {
        self.vars[var].marked = true;

        let terms = self.terms;
        let mut result = DEPTH_UNSET;
        for term in terms {
            if skip_term(term) {
                continue;
            }
            if self.term_subj(term) != Some(var) {
                continue;
            }
            let pred = self.term_pred(term).filter(|&p| self.is_subject(p));
            let obj = self.term_obj(term).filter(|&o| self.is_subject(o));

            let depth = self.get_depth_from_term(var, pred, obj, root);
            if depth < result {
                result = depth;
            }
        }

        if result == DEPTH_UNSET {
            result = 0;
        }
        self.vars[var].depth = result;

        // Depths flow from subject to (pred, obj); variables related only
        // through a shared predicate or object (like (X, Y), (Z, Y)) are
        // reached by crawling those links as well. Anything the crawl
        // cannot reach stays at the sentinel and is rejected as
        // unconstrained.
        for term in terms {
            if skip_term(term) {
                continue;
            }
            if self.term_subj(term) != Some(var) {
                continue;
            }
            let pred = self.term_pred(term);
            let obj = self.term_obj(term);

            self.crawl_variable(var, root);
            if let Some(pred) = pred {
                if pred != var {
                    self.crawl_variable(pred, root);
                }
            }
            if let Some(obj) = obj {
                if obj != var {
                    self.crawl_variable(obj, root);
                }
            }
        }

        self.vars[var].depth
    }

    /// Visit every unmarked variable sharing a term with `var`.
    fn crawl_variable(&mut self, var: VarId, root: VarId) {
        let terms = self.terms;
        for term in terms {
            if skip_term(term) {
                continue;
            }
            let pred = self.term_pred(term);
            let subj = self.term_subj(term);
            let obj = self.term_obj(term);

            if pred != Some(var) && subj != Some(var) && obj != Some(var) {
                continue;
            }

            for other in [pred, subj, obj].into_iter().flatten() {
                if other != var && !self.vars[other].marked {
                    self.get_variable_depth(other, root);
                }
            }
        }
    }

    fn get_depth_from_term(
        &mut self,
        cur: VarId,
        pred: Option<VarId>,
        obj: Option<VarId>,
        root: VarId,
    ) -> i32 {
        // A term without other variables has no dependencies.
        if pred.is_none() && obj.is_none() {
            return 0;
        }

        let mut result = DEPTH_UNSET;
        for other in [pred, obj].into_iter().flatten() {
            if other == cur {
                continue;
            }
            let depth = self.get_depth_from_var(other, root);
            if depth == DEPTH_UNSET {
                return DEPTH_UNSET;
            }
            if depth < result {
                result = depth;
            }
        }

        result
    }

    fn get_depth_from_var(&mut self, var: VarId, root: VarId) -> i32 {
        // Known depth (or the root itself) terminates the walk.
        if var == root || self.vars[var].depth != DEPTH_UNSET {
            return self.vars[var].depth + 1;
        }

        // Already being evaluated: a cycle, stop.
        if self.vars[var].marked {
            return 0;
        }

        let depth = self.get_variable_depth(var, root);
        if depth == DEPTH_UNSET {
            depth
        } else {
            depth + 1
        }
    }
}
