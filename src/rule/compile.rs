//! Program emission: terms to instructions.
//!
//! Emission is driven by the ordered variable table. Terms with literal
//! subjects go first (they narrow the search fastest), then the terms of
//! each subject variable in dependency order, then wildcard-subject terms,
//! then negated terms, and optional terms last since they can never
//! eliminate results. A per-variable written bit tracks which registers
//! hold values, which is what decides between Select (produce a binding)
//! and With (test a binding), and where Each instructions are needed to
//! lower a table binding to per-entity bindings.

use tracing::debug;

use crate::error::RuleResult;
use crate::id::Entity;
use crate::rule::op::{Op, OpKind, RegRef};
use crate::rule::pair::{FilterPair, PairSlot};
use crate::rule::var::{skip_term, RuleVar, VarId, VarKind};
use crate::store::{Attribute, Store};
use crate::term::{Term, TermOper, TermRef};

/// Result of compilation, consumed by `Rule`.
pub(crate) struct Program {
    pub vars: Vec<RuleVar>,
    pub ops: Vec<Op>,
    pub frame_count: usize,
}

pub(crate) struct Compiler<'a> {
    pub(crate) store: &'a Store,
    pub(crate) terms: &'a [Term],
    pub(crate) vars: Vec<RuleVar>,
    pub(crate) subject_var_count: usize,
    pub(crate) ops: Vec<Op>,
    pub(crate) frame_count: usize,
    pub(crate) written: Vec<bool>,
}

impl<'a> Compiler<'a> {
    pub fn new(store: &'a Store, terms: &'a [Term]) -> Compiler<'a> {
        Compiler {
            store,
            terms,
            vars: Vec::new(),
            subject_var_count: 0,
            ops: Vec::new(),
            frame_count: 0,
            written: Vec::new(),
        }
    }

    pub fn compile(mut self) -> RuleResult<Program> {
        self.scan_variables()?;
        self.compile_program();

        debug!(
            variables = self.vars.len(),
            operations = self.ops.len(),
            frames = self.frame_count,
            "compiled rule program"
        );

        Ok(Program {
            vars: self.vars,
            ops: self.ops,
            frame_count: self.frame_count,
        })
    }

    // ------------------------------------------------------------------
    // Building blocks
    // ------------------------------------------------------------------

    fn push_frame(&mut self) -> usize {
        let frame = self.frame_count;
        self.frame_count += 1;
        frame
    }

    /// Append an instruction with default wiring: pass to the next
    /// instruction, fail to the previous one, current frame. The caller
    /// assigns the kind and any registers.
    fn insert_operation(&mut self, term: i32) -> usize {
        let idx = self.ops.len();
        self.ops.push(Op {
            kind: OpKind::Input,
            filter: FilterPair::default(),
            subject: Entity::NULL,
            on_pass: idx as i32 + 1,
            on_fail: idx as i32 - 1,
            frame: self.frame_count,
            term,
            r_in: RegRef::None,
            r_out: RegRef::None,
        });
        idx
    }

    fn is_known(&self, var: Option<VarId>) -> bool {
        match var {
            Some(v) => self.written[v],
            None => true,
        }
    }

    fn is_pair_known(&self, pair: &FilterPair) -> bool {
        pair.pred_var().map_or(true, |v| self.written[v])
            && pair.obj_var().map_or(true, |v| self.written[v])
    }

    /// The most specific written form of a variable: the entity companion
    /// if it has a value, otherwise the table form. With `create`, a table
    /// binding without an entity binding gets an Each instruction inserted
    /// to lower it.
    fn most_specific_var(&mut self, var: VarId, create: bool) -> VarId {
        let Some(evar) = self.to_entity(var) else {
            return var;
        };
        let tvar = if self.vars[var].kind == VarKind::Table {
            Some(var)
        } else {
            let name = self.vars[var].name.clone();
            self.find_variable(VarKind::Table, &name)
        };

        // Table variables are usually resolved before use as a predicate
        // or object, but cyclic dependencies can leave only the entity
        // form; only lower a table that has actually been written.
        if let Some(tvar) = tvar.filter(|&t| self.written[t]) {
            if self.written[evar] {
                evar
            } else if create {
                let idx = self.insert_operation(-1);
                let op = &mut self.ops[idx];
                op.kind = OpKind::Each;
                op.r_in = RegRef::Var(tvar);
                op.r_out = RegRef::Var(evar);
                self.written[evar] = true;
                self.push_frame();
                evar
            } else {
                tvar
            }
        } else if self.written[evar] {
            evar
        } else {
            var
        }
    }

    fn get_most_specific_var(&mut self, var: VarId) -> VarId {
        self.most_specific_var(var, false)
    }

    fn ensure_most_specific_var(&mut self, var: VarId) -> VarId {
        self.most_specific_var(var, true)
    }

    /// Guarantee a written entity-kind variable for `var`.
    fn ensure_entity_written(&mut self, var: VarId) -> VarId {
        let evar = self.ensure_most_specific_var(var);
        debug_assert_eq!(self.vars[evar].kind, VarKind::Entity);
        debug_assert!(self.written[evar]);
        evar
    }

    /// Encode a term into a filter pair, resolving variables to registers
    /// and the predicate's attributes from the store.
    fn term_to_pair(&self, term: &Term) -> FilterPair {
        let mut result = FilterPair::default();

        match &term.pred {
            TermRef::Var(name) => {
                let var = self
                    .find_variable(VarKind::Entity, name)
                    .expect("predicate variable not declared");
                result.pred = PairSlot::Var(var);
                // A variable predicate is never substituted.
                result.is_final = true;
            }
            TermRef::Entity(pred) => {
                result.pred = PairSlot::Entity(*pred);
                // Transitivity only applies when there is an object to
                // traverse towards.
                if self.store.has_attribute(*pred, Attribute::Transitive) && term.object.is_some()
                {
                    result.transitive = true;
                }
                if self.store.has_attribute(*pred, Attribute::Final) {
                    result.is_final = true;
                }
                if self.store.has_attribute(*pred, Attribute::TransitiveSelf) {
                    result.inclusive = true;
                }
            }
        }

        if let Some(obj) = &term.object {
            match obj {
                TermRef::Var(name) => {
                    let var = self
                        .find_variable(VarKind::Entity, name)
                        .expect("object variable not declared");
                    result.obj = Some(PairSlot::Var(var));
                }
                TermRef::Entity(e) => {
                    result.obj = Some(PairSlot::Entity(*e));
                    if e.is_null() {
                        result.obj_zero = true;
                    }
                }
            }
        }

        result
    }

    fn set_input_to_subj(&mut self, op: usize, c: usize, var: Option<VarId>) {
        match var {
            Some(v) => self.ops[op].r_in = RegRef::Var(v),
            None => {
                self.ops[op].r_in = RegRef::Subject;
                self.ops[op].subject = self.terms[c]
                    .subject
                    .entity()
                    .expect("literal subject expected");
            }
        }
    }

    fn set_output_to_subj(&mut self, op: usize, c: usize, var: Option<VarId>) {
        match var {
            Some(v) => self.ops[op].r_out = RegRef::Var(v),
            None => {
                self.ops[op].r_out = RegRef::Subject;
                self.ops[op].subject = self.terms[c]
                    .subject
                    .entity()
                    .expect("literal subject expected");
            }
        }
    }

    // ------------------------------------------------------------------
    // Inclusive set expansion
    // ------------------------------------------------------------------

    /// Emit a sub/superset expansion into `out`. With `inclusive`, the
    /// sequence SetJmp/Store/Set/Jump first yields the root itself (the
    /// reflexive match) and switches to the set walk on redo; otherwise
    /// only the set instruction is emitted.
    fn insert_inclusive_set(
        &mut self,
        op_kind: OpKind,
        out: VarId,
        pair: &FilterPair,
        term: i32,
        inclusive: bool,
    ) {
        // Supersets resolve one entity at a time.
        debug_assert!(op_kind != OpKind::SuperSet || self.vars[out].kind == VarKind::Entity);

        let setjmp_lbl = self.ops.len() as i32;

        if inclusive {
            let sj = self.insert_operation(-1);
            let st = self.insert_operation(-1);
            let se = self.insert_operation(-1);
            let jp = self.insert_operation(-1);

            let store_lbl = setjmp_lbl + 1;
            let set_lbl = setjmp_lbl + 2;
            let next_op = setjmp_lbl + 4;
            let prev_op = setjmp_lbl - 1;

            // On first evaluation the label points at Store, on redo at
            // the set walk.
            {
                let op = &mut self.ops[sj];
                op.kind = OpKind::SetJmp;
                op.on_pass = store_lbl;
                op.on_fail = set_lbl;
            }

            // Store yields the root of the subtree once, then fails back
            // into SetJmp which flips the label.
            {
                let subject = match pair.obj {
                    Some(PairSlot::Entity(e)) => self.store.get_alive(e).unwrap_or(Entity::NULL),
                    _ => Entity::NULL,
                };
                let op = &mut self.ops[st];
                op.kind = OpKind::Store;
                op.on_pass = next_op;
                op.on_fail = setjmp_lbl;
                op.r_out = RegRef::Var(out);
                op.term = term;
                op.filter.pred = pair.pred;
                match pair.obj {
                    Some(PairSlot::Var(o)) => {
                        op.r_in = RegRef::Var(o);
                        op.filter.obj = Some(PairSlot::Var(o));
                    }
                    Some(PairSlot::Entity(e)) => {
                        op.r_in = RegRef::Subject;
                        op.filter.obj = Some(PairSlot::Entity(e));
                        op.subject = subject;
                    }
                    None => debug_assert!(false, "set expansion without object"),
                }
            }

            {
                let op = &mut self.ops[se];
                op.kind = op_kind;
                op.on_pass = next_op;
                op.on_fail = prev_op;
                op.r_out = RegRef::Var(out);
                op.term = term;
                op.filter.pred = pair.pred;
                op.filter.obj = pair.obj;
            }

            // Jump stashes the SetJmp label in its pass slot; the actual
            // target is read from the SetJmp context at runtime.
            {
                let op = &mut self.ops[jp];
                op.kind = OpKind::Jump;
                op.on_pass = setjmp_lbl;
                op.on_fail = -1;
            }
        } else {
            let se = self.insert_operation(-1);
            let op = &mut self.ops[se];
            op.kind = op_kind;
            op.r_out = RegRef::Var(out);
            op.term = term;
            op.filter.pred = pair.pred;
            op.filter.obj = pair.obj;
        }

        self.written[out] = true;
    }

    /// Allocate an anonymous variable and emit an inclusive set expansion
    /// into it; returns a written entity-kind variable holding the result.
    fn store_inclusive_set(
        &mut self,
        op_kind: OpKind,
        pair: &FilterPair,
        inclusive: bool,
    ) -> VarId {
        // Subsets bind tables; supersets bind entities.
        let var_kind = if op_kind == OpKind::SuperSet {
            VarKind::Entity
        } else {
            VarKind::Table
        };

        let av = self.create_anonymous_variable(var_kind);
        if var_kind == VarKind::Table {
            let name = self.vars[av].name.clone();
            self.create_variable(VarKind::Entity, Some(&name));
        }

        self.insert_inclusive_set(op_kind, av, pair, -1, inclusive);

        self.ensure_entity_written(av)
    }

    /// Substitute a non-final predicate with the subsets of the
    /// inheritance relation rooted at it, implementing implicit
    /// inheritance of the predicate.
    fn prepare_predicate(&mut self, pair: &mut FilterPair) {
        if pair.is_final {
            return;
        }
        let PairSlot::Entity(pred) = pair.pred else {
            unreachable!("variable predicates are final");
        };
        let isa_pair = FilterPair {
            pred: PairSlot::Entity(Entity::ISA),
            obj: Some(PairSlot::Entity(pred)),
            ..FilterPair::default()
        };
        let pred_var = self.store_inclusive_set(OpKind::SubSet, &isa_pair, true);
        pair.pred = PairSlot::Var(pred_var);
    }

    // ------------------------------------------------------------------
    // Term emission
    // ------------------------------------------------------------------

    /// Emit a Select or With for a term, depending on whether the subject
    /// is already bound. A literal subject that may not carry the filter
    /// directly is first expanded through its inheritance chain.
    fn insert_select_or_with(&mut self, c: usize, subj: Option<VarId>, pair: &FilterPair) {
        let terms = self.terms;
        let term = &terms[c];
        let wildcard_subj = term.subject == TermRef::Entity(Entity::WILDCARD);

        let mut subj = subj;
        let mut evar = subj.and_then(|s| self.to_entity(s));
        let mut tvar = subj.filter(|&s| self.vars[s].kind == VarKind::Table);

        let lbl_start = self.ops.len() as i32;
        let mut eval_subject_supersets = false;

        if subj.is_none() && !wildcard_subj {
            // A literal subject may carry the filter anywhere along its
            // inheritance chain; search the supersets unless the filter
            // itself already traverses inheritance.
            if !(pair.transitive && pair.pred == PairSlot::Entity(Entity::ISA)) {
                let subj_lit = term.subject.entity().expect("literal subject");
                let isa_pair = FilterPair {
                    pred: PairSlot::Entity(Entity::ISA),
                    obj: Some(PairSlot::Entity(subj_lit)),
                    ..FilterPair::default()
                };
                let v = self.store_inclusive_set(OpKind::SuperSet, &isa_pair, true);
                evar = Some(v);
                subj = Some(v);
                tvar = None;
                eval_subject_supersets = true;
            }
        }

        let op_i = self.insert_operation(-1);
        self.ops[op_i].filter = *pair;
        self.ops[op_i].term = c as i32;

        if let Some(e) = evar.filter(|&e| self.written[e]) {
            self.ops[op_i].kind = OpKind::With;
            self.ops[op_i].r_in = RegRef::Var(e);
            self.set_input_to_subj(op_i, c, subj);
        } else if let Some(t) = tvar.filter(|&t| self.written[t]) {
            self.ops[op_i].kind = OpKind::With;
            self.ops[op_i].r_in = RegRef::Var(t);
            self.set_input_to_subj(op_i, c, subj);
        } else if tvar.is_none() && evar.is_none() && !wildcard_subj {
            // Literal subject: With applies the filter to its table.
            self.ops[op_i].kind = OpKind::With;
            self.set_input_to_subj(op_i, c, subj);
        } else {
            debug_assert!(wildcard_subj || subj.is_some());
            self.ops[op_i].kind = OpKind::Select;
            if !wildcard_subj {
                let subj = subj.expect("select without subject variable");
                self.set_output_to_subj(op_i, c, Some(subj));
                self.written[subj] = true;
            }
        }

        // When the subject's supersets are being searched for a fully
        // known filter, one match suffices: a SetJmp behind the With sends
        // the backtrack past the whole expansion.
        if eval_subject_supersets && self.is_pair_known(&self.ops[op_i].filter) {
            let j = self.insert_operation(-1);
            self.ops[j].kind = OpKind::SetJmp;
            self.ops[j].on_pass = j as i32 + 1;
            self.ops[j].on_fail = lbl_start - 1;
        }

        if let Some(r) = self.ops[op_i].filter.pred_var() {
            self.written[r] = true;
        }
        if let Some(r) = self.ops[op_i].filter.obj_var() {
            self.written[r] = true;
        }
    }

    fn insert_term_1(&mut self, c: usize, filter: &FilterPair) {
        let subj = match self.term_subj(&self.terms[c]) {
            Some(s) => Some(self.get_most_specific_var(s)),
            None => None,
        };
        self.insert_select_or_with(c, subj, filter);
    }

    /// Emission matrix for pair terms. Non-transitive pairs reduce to
    /// Select/With; transitive pairs expand through the closure engine
    /// depending on which sides are known.
    fn insert_term_2(&mut self, c: usize, filter: &FilterPair) {
        let terms = self.terms;
        let term = &terms[c];

        let subj = match self.term_subj(term) {
            Some(s) => Some(self.get_most_specific_var(s)),
            None => None,
        };
        let obj = match self.term_obj(term) {
            Some(o) => Some(self.get_most_specific_var(o)),
            None => None,
        };

        if !filter.transitive {
            self.insert_select_or_with(c, subj, filter);
            return;
        }

        if self.is_known(subj) {
            if self.is_known(obj) {
                // Both sides known: enumerate every subset of the object,
                // then test the relation against each. This accepts any
                // subject whose relation chain reaches the object.
                let obj_subsets = self.store_inclusive_set(OpKind::SubSet, filter, true);
                let mut pair = *filter;
                pair.obj = Some(PairSlot::Var(obj_subsets));
                self.insert_select_or_with(c, subj, &pair);
            } else {
                let obj = obj.expect("transitive term without object variable");

                if subj.map_or(true, |s| self.vars[s].kind == VarKind::Entity) {
                    // Known entity (or literal) subject: walk its
                    // supersets into the object variable.
                    let obj_e = self.to_entity(obj).expect("object entity variable");
                    let mut set_pair = *filter;
                    set_pair.obj = match subj {
                        Some(s) => Some(PairSlot::Var(s)),
                        None => Some(PairSlot::Entity(
                            term.subject.entity().expect("literal subject"),
                        )),
                    };
                    let inclusive = filter.inclusive;
                    self.insert_inclusive_set(OpKind::SuperSet, obj_e, &set_pair, c as i32, inclusive);
                } else {
                    // Table subject: first match the pair on the evaluated
                    // entities, then expand the found object upward. The
                    // expansion is always inclusive since the entity's own
                    // object must be returned too.
                    let av = self.create_anonymous_variable(VarKind::Entity);
                    let obj_e = self.to_entity(obj).expect("object entity variable");
                    let mut set_pair = *filter;
                    set_pair.obj = Some(PairSlot::Var(av));
                    self.insert_select_or_with(c, subj, &set_pair);
                    self.push_frame();
                    self.insert_inclusive_set(OpKind::SuperSet, obj_e, &set_pair, c as i32, true);
                }
            }
        } else {
            let subj_var = subj.expect("transitive term without subject variable");

            if self.is_known(obj) {
                // Object known: enumerate its subsets straight into the
                // subject variable.
                let mut set_pair = *filter;
                set_pair.obj = match obj {
                    Some(o) => Some(PairSlot::Var(o)),
                    None => Some(PairSlot::Entity(
                        term.object
                            .as_ref()
                            .and_then(|o| o.entity())
                            .expect("literal object"),
                    )),
                };
                let inclusive = filter.inclusive;
                self.insert_inclusive_set(OpKind::SubSet, subj_var, &set_pair, c as i32, inclusive);
            } else if subj == obj {
                self.insert_select_or_with(c, subj, filter);
            } else {
                // Neither side known: select all concrete occurrences of
                // the relation, then expand each found object upward.
                let obj = obj.expect("transitive term without object variable");
                let av = self.create_anonymous_variable(VarKind::Entity);
                let obj_e = self.to_entity(obj).expect("object entity variable");

                let op_i = self.insert_operation(-1);
                self.ops[op_i].kind = OpKind::Select;
                self.set_output_to_subj(op_i, c, Some(subj_var));
                self.ops[op_i].filter.pred = filter.pred;
                self.ops[op_i].filter.obj = Some(PairSlot::Var(av));
                self.written[subj_var] = true;
                self.written[av] = true;

                self.push_frame();

                let set_pair = self.ops[op_i].filter;
                self.insert_inclusive_set(OpKind::SuperSet, obj_e, &set_pair, c as i32, true);
            }
        }
    }

    /// Emit one term, wrapping it for Not/Optional modifiers.
    fn insert_term(&mut self, c: usize) {
        let terms = self.terms;
        let term = &terms[c];
        let obj_set = term.object.is_some();

        // Lower any table-bound pair variables to entities before the
        // term's own instructions (and before a Not wrapper).
        if let Some(pred) = self.term_pred(term) {
            self.ensure_most_specific_var(pred);
        }
        if obj_set {
            if let Some(obj) = self.term_obj(term) {
                self.ensure_most_specific_var(obj);
            }
        }

        let prev = self.ops.len();

        // The leading Not turns the inner group's failure into a pass.
        if term.oper == TermOper::Not {
            let i = self.insert_operation(-1);
            self.ops[i].kind = OpKind::Not;
        }

        let mut filter = self.term_to_pair(term);
        self.prepare_predicate(&mut filter);

        if !obj_set {
            self.insert_term_1(c, &filter);
        } else {
            self.insert_term_2(c, &filter);
        }

        if term.oper == TermOper::Not {
            // The trailing Not turns the inner group's success back into a
            // failure for the enclosing program.
            let i = self.insert_operation(-1);
            self.ops[i].kind = OpKind::Not;
            self.ops[i].on_pass = prev as i32 - 1;
            self.ops[i].on_fail = prev as i32 - 1;
            self.ops[prev].on_fail = self.ops.len() as i32;
        }

        if term.oper == TermOper::Optional {
            // A Not-based jump evaluates the optional group at most once
            // per outer context.
            let i = self.insert_operation(-1);
            self.ops[i].kind = OpKind::Not;
            self.ops[i].on_pass = self.ops.len() as i32;
            self.ops[i].on_fail = prev as i32 - 1;

            // Redirect the group's exit fail edge to the jump, so that a
            // failing optional does not roll back results.
            let mut min_fail = -1;
            let mut exit_op = -1;
            for j in prev..self.ops.len() {
                let fail = self.ops[j].on_fail;
                if min_fail == -1 || (fail >= 0 && fail < min_fail) {
                    min_fail = fail;
                    exit_op = j as i32;
                }
            }
            debug_assert!(exit_op != -1);
            self.ops[exit_op as usize].on_fail = self.ops.len() as i32 - 1;
        }

        self.push_frame();
    }

    /// Emit the whole program in evaluation order.
    fn compile_program(&mut self) {
        let terms = self.terms;

        self.insert_input();

        // Terms with entity literal subjects iterate a single type and
        // narrow the result set quickly.
        for (c, term) in terms.iter().enumerate() {
            if skip_term(term) || term.oper == TermOper::Optional {
                continue;
            }
            if self.term_subj(term).is_some() {
                continue;
            }
            if term.subject == TermRef::Entity(Entity::WILDCARD) {
                continue;
            }
            self.insert_term(c);
        }

        // Subject variables in dependency order.
        for v in 0..self.subject_var_count {
            debug_assert_eq!(self.vars[v].kind, VarKind::Table);
            for (c, term) in terms.iter().enumerate() {
                if skip_term(term) || term.oper == TermOper::Optional {
                    continue;
                }
                if self.term_subj(term) != Some(v) {
                    continue;
                }
                self.insert_term(c);
            }
        }

        // Wildcard subjects.
        for (c, term) in terms.iter().enumerate() {
            if term.subject != TermRef::Entity(Entity::WILDCARD) {
                continue;
            }
            self.insert_term(c);
        }

        // Negated terms: all their variables are bound by now.
        for (c, term) in terms.iter().enumerate() {
            if term.oper != TermOper::Not {
                continue;
            }
            self.insert_term(c);
        }

        // Optional terms last; they cannot eliminate results and would
        // only add work to the evaluation of non-matching entities.
        for (c, term) in terms.iter().enumerate() {
            if term.oper != TermOper::Optional {
                continue;
            }
            self.insert_term(c);
        }

        // Every subject variable must have been written by a select or
        // subset, or lowered through its entity companion.
        #[cfg(debug_assertions)]
        for v in 0..self.subject_var_count {
            if !self.written[v] {
                let name = self.vars[v].name.clone();
                let evar = self.find_variable(VarKind::Entity, &name);
                debug_assert!(evar.is_some_and(|e| self.written[e]));
            }
        }

        // Entity variables constrained only through a shared predicate or
        // object still need per-entity enumeration from their table form.
        for v in self.subject_var_count..self.vars.len() {
            if self.written[v] {
                continue;
            }
            debug_assert_eq!(self.vars[v].kind, VarKind::Entity);
            let name = self.vars[v].name.clone();
            let table_var = self
                .find_variable(VarKind::Table, &name)
                .expect("unwritten entity variable without table form");

            let idx = self.insert_operation(-1);
            let op = &mut self.ops[idx];
            op.kind = OpKind::Each;
            op.r_in = RegRef::Var(table_var);
            op.r_out = RegRef::Var(v);
            self.written[v] = true;
            self.push_frame();
        }

        self.insert_yield();
    }

    fn insert_input(&mut self) {
        let i = self.insert_operation(-1);
        debug_assert_eq!(i, 0);
        self.ops[i].kind = OpKind::Input;
        // Defaults already fit: pass to 1, fail to -1 which terminates
        // the program.
        self.push_frame();
    }

    fn insert_yield(&mut self) {
        let i = self.insert_operation(-1);
        self.ops[i].kind = OpKind::Yield;

        // Yield returns the most specific form of the implicit subject:
        // the entity form if the program enumerates entities, otherwise
        // the table form. Without a "." variable the rule yields bare
        // matches.
        let var = self
            .find_variable(VarKind::Entity, ".")
            .or_else(|| self.find_variable(VarKind::Table, "."));
        self.ops[i].r_in = match var {
            Some(v) => RegRef::Var(v),
            None => RegRef::None,
        };

        self.push_frame();
    }
}
