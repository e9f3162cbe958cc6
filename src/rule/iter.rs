//! Iterator state: register frames, operation contexts and the yield
//! snapshot.
//!
//! An iterator owns a rectangular register array (one frame per register
//! frame, one slot per variable) plus a parallel column array per term.
//! When the dispatcher moves forward into a new frame it copies the
//! previous frame, so that backtracking restores bindings by simply
//! re-entering earlier instructions whose frames were never overwritten.

use smallvec::SmallVec;

use crate::id::{Entity, Id};
use crate::rule::op::{Op, RegRef};
use crate::rule::pair::{Filter, FilterPair, PairSlot};
use crate::rule::var::{VarId, VarKind};
use crate::rule::Rule;
use crate::store::index::IdRecord;
use crate::store::table::TableId;
use crate::store::Store;
use crate::term::{TermOper, TermRef};

/// A register slot: a table binding or an entity binding, decided by the
/// owning variable's kind. `count == 0` on a table binding means the whole
/// table; a null entity means the slot is a wildcard.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Reg {
    pub table: Option<TableId>,
    pub offset: usize,
    pub count: usize,
    pub entity: Entity,
}

/// Cursor state shared by Select and With: the table set being iterated
/// and the current table/column.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WithCtx<'w> {
    pub idr: Option<&'w IdRecord>,
    pub table_index: usize,
    pub table: Option<TableId>,
    pub column: i32,
}

impl<'w> WithCtx<'w> {
    pub fn new(idr: Option<&'w IdRecord>) -> WithCtx<'w> {
        WithCtx {
            idr,
            table_index: 0,
            table: None,
            column: -1,
        }
    }

    pub fn empty() -> WithCtx<'w> {
        WithCtx::new(None)
    }
}

/// One level of a subset walk: the table set for the current object, the
/// table being scanned and the row whose entity is expanded next.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SubSetFrame<'w> {
    pub with: WithCtx<'w>,
    pub table: TableId,
    pub row: usize,
    pub column: i32,
}

/// One level of a superset walk: the table holding the current subject and
/// the column of the pair being followed upward.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SuperSetFrame {
    pub table: TableId,
    pub column: i32,
}

/// Inline capacity of the set-walk stacks; shallow hierarchies never
/// touch the heap.
pub(crate) const SET_STACK_INLINE: usize = 16;

pub(crate) type SubSetStack<'w> = SmallVec<[SubSetFrame<'w>; SET_STACK_INLINE]>;
pub(crate) type SuperSetStack = SmallVec<[SuperSetFrame; SET_STACK_INLINE]>;

/// Per-instruction evaluation state.
#[derive(Debug, Default)]
pub(crate) enum OpCtx<'w> {
    #[default]
    None,
    With(WithCtx<'w>),
    SubSet(SubSetStack<'w>),
    SuperSet(SuperSetStack),
    Each {
        row: usize,
    },
    SetJmp {
        label: i32,
    },
}

/// A live evaluation of a rule against a store.
///
/// Pulling results with [`Iter::next`] runs the program until it yields or
/// terminates; the snapshot accessors expose the current match until the
/// next pull.
pub struct Iter<'a> {
    pub(crate) rule: &'a Rule,
    pub(crate) store: &'a Store,
    pub(crate) registers: Vec<Reg>,
    pub(crate) columns: Vec<i32>,
    pub(crate) op_ctx: Vec<OpCtx<'a>>,
    /// Resolved id per term, wildcards substituted with matched values.
    pub(crate) ids: Vec<Id>,
    /// Resolved subject entity per term (null when the subject is the
    /// yielded table itself).
    pub(crate) subjects: Vec<Entity>,
    /// Entity-variable values snapshotted at the last yield.
    pub(crate) variables: Vec<Entity>,
    /// Column per term at the last yield.
    pub(crate) out_columns: Vec<i32>,
    pub(crate) op: i32,
    pub(crate) redo: bool,
    pub(crate) started: bool,
    pub(crate) table: Option<TableId>,
    pub(crate) offset: usize,
    pub(crate) count: usize,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(rule: &'a Rule, store: &'a Store) -> Iter<'a> {
        let var_count = rule.vars.len();
        let term_count = rule.terms.len();

        let mut registers = vec![Reg::default(); rule.frame_count * var_count];
        // Unbound entity registers read as wildcards.
        for (i, var) in rule.vars.iter().enumerate() {
            if var.kind == VarKind::Entity {
                registers[i].entity = Entity::WILDCARD;
            }
        }

        let mut ids = vec![Id::NULL; term_count];
        let mut subjects = vec![Entity::NULL; term_count];
        for (i, term) in rule.terms.iter().enumerate() {
            // Literal subjects are fixed for the whole iteration; negated
            // and optional terms may never run an instruction that would
            // set their id.
            if let TermRef::Entity(e) = term.subject {
                if e != Entity::WILDCARD {
                    subjects[i] = e;
                }
            }
            if matches!(term.oper, TermOper::Not | TermOper::Optional) {
                ids[i] = rule.term_ids[i];
            }
        }

        let mut op_ctx = Vec::with_capacity(rule.ops.len());
        op_ctx.resize_with(rule.ops.len(), OpCtx::default);

        Iter {
            rule,
            store,
            registers,
            columns: vec![-1; rule.frame_count * term_count],
            op_ctx,
            ids,
            subjects,
            variables: vec![Entity::NULL; var_count],
            out_columns: vec![-1; term_count],
            op: 0,
            redo: false,
            started: false,
            table: None,
            offset: 0,
            count: 0,
        }
    }

    // ------------------------------------------------------------------
    // Registers
    // ------------------------------------------------------------------

    pub(crate) fn reg(&self, frame: usize, r: VarId) -> Reg {
        self.registers[frame * self.rule.vars.len() + r]
    }

    fn reg_mut(&mut self, frame: usize, r: VarId) -> &mut Reg {
        let var_count = self.rule.vars.len();
        &mut self.registers[frame * var_count + r]
    }

    /// Value of an entity register; null reads as the wildcard, a handle
    /// that is no longer alive reads as a failed match.
    pub(crate) fn entity_reg_get(&self, frame: usize, r: VarId) -> Option<Entity> {
        let e = self.reg(frame, r).entity;
        if e.is_null() {
            return Some(Entity::WILDCARD);
        }
        if !self.store.is_valid(e) {
            return None;
        }
        Some(e)
    }

    pub(crate) fn entity_reg_set(&mut self, frame: usize, r: VarId, e: Entity) {
        debug_assert_eq!(self.rule.vars[r].kind, VarKind::Entity);
        if !self.store.is_valid(e) {
            return;
        }
        self.reg_mut(frame, r).entity = e;
    }

    pub(crate) fn table_reg_set(&mut self, frame: usize, r: VarId, table: Option<TableId>) {
        debug_assert_eq!(self.rule.vars[r].kind, VarKind::Table);
        *self.reg_mut(frame, r) = Reg {
            table,
            offset: 0,
            count: 0,
            entity: Entity::NULL,
        };
    }

    /// Resolve an instruction input to a single entity.
    pub(crate) fn reg_get_entity(&self, op: &Op, frame: usize, r: RegRef) -> Option<Entity> {
        match r {
            RegRef::Subject => {
                // A despawned constant subject fails the match rather than
                // aborting the iteration.
                debug_assert!(!op.subject.is_null());
                if !self.store.is_valid(op.subject) {
                    return None;
                }
                Some(op.subject)
            }
            RegRef::Var(r) => match self.rule.vars[r].kind {
                VarKind::Table => {
                    let reg = self.reg(frame, r);
                    let table = reg.table?;
                    debug_assert_eq!(reg.count, 1);
                    let e = *self.store.table(table).entities().get(reg.offset)?;
                    if !self.store.is_valid(e) {
                        return None;
                    }
                    Some(e)
                }
                _ => self.entity_reg_get(frame, r),
            },
            RegRef::None => None,
        }
    }

    /// Resolve an instruction input to a table.
    pub(crate) fn reg_get_table(&self, op: &Op, frame: usize, r: RegRef) -> Option<TableId> {
        match r {
            RegRef::Subject => {
                if !self.store.is_valid(op.subject) {
                    return None;
                }
                Some(self.store.record(op.subject)?.0)
            }
            RegRef::Var(r) => match self.rule.vars[r].kind {
                VarKind::Table => self.reg(frame, r).table,
                _ => {
                    let e = self.entity_reg_get(frame, r)?;
                    Some(self.store.record(e)?.0)
                }
            },
            RegRef::None => None,
        }
    }

    /// Write an entity into a register of either kind. Table registers
    /// resolve the entity's home table and bind the single row; entities
    /// without a table are kept as a bare entity in the slot.
    pub(crate) fn reg_set_entity(&mut self, frame: usize, r: VarId, e: Entity) {
        if self.rule.vars[r].kind == VarKind::Table {
            if !self.store.is_valid(e) {
                return;
            }
            *self.reg_mut(frame, r) = match self.store.record(e) {
                Some((table, row)) => Reg {
                    table: Some(table),
                    offset: row,
                    count: 1,
                    entity: Entity::NULL,
                },
                None => Reg {
                    table: None,
                    offset: 0,
                    count: 0,
                    entity: e,
                },
            };
        } else {
            self.entity_reg_set(frame, r, e);
        }
    }

    // ------------------------------------------------------------------
    // Frames and columns
    // ------------------------------------------------------------------

    pub(crate) fn push_registers(&mut self, from: usize, to: usize) {
        let vc = self.rule.vars.len();
        if vc == 0 {
            return;
        }
        self.registers.copy_within(from * vc..(from + 1) * vc, to * vc);
    }

    pub(crate) fn push_columns(&mut self, from: usize, to: usize) {
        let tc = self.rule.terms.len();
        if tc == 0 {
            return;
        }
        self.columns.copy_within(from * tc..(from + 1) * tc, to * tc);
    }

    pub(crate) fn set_col(&mut self, frame: usize, term: i32, column: i32) {
        let tc = self.rule.terms.len();
        self.columns[frame * tc + term as usize] = column;
    }

    // ------------------------------------------------------------------
    // Filter reification
    // ------------------------------------------------------------------

    /// Substitute a filter pair's registers with their values from the
    /// given frame, producing the concrete mask and wildcard bookkeeping.
    /// Fails when a register holds a handle that is no longer alive.
    pub(crate) fn reify_pair(&self, pair: &FilterPair, frame: usize) -> Option<Filter> {
        let wc = Entity::WILDCARD.lo();

        let mut wildcard = false;
        let mut pred_wildcard = false;
        let mut obj_wildcard = false;
        let mut same_var = false;
        let mut hi_var = None;
        let mut lo_var = None;

        let obj = match pair.obj {
            None => 0,
            Some(PairSlot::Entity(e)) => e.lo(),
            Some(PairSlot::Var(r)) => {
                let lo = self.entity_reg_get(frame, r)?.lo();
                if lo == wc {
                    wildcard = true;
                    obj_wildcard = true;
                    lo_var = Some(r);
                }
                lo
            }
        };

        let pred = match pair.pred {
            PairSlot::Entity(e) => e.lo(),
            PairSlot::Var(r) => {
                let lo = self.entity_reg_get(frame, r)?.lo();
                if lo == wc {
                    if wildcard {
                        same_var = Some(r) == pair.obj_var();
                    }
                    wildcard = true;
                    pred_wildcard = true;
                    if obj != 0 {
                        hi_var = Some(r);
                    } else {
                        lo_var = Some(r);
                    }
                }
                lo
            }
        };

        let mask = if obj == 0 && !pair.obj_zero {
            Id::single(Entity::from_raw(pred))
        } else {
            Id::pair(Entity::from_raw(pred), Entity::from_raw(obj))
        };

        Some(Filter {
            mask,
            wildcard,
            pred_wildcard,
            obj_wildcard,
            same_var,
            hi_var,
            lo_var,
        })
    }

    pub(crate) fn pair_to_filter(&self, op: &Op) -> Option<Filter> {
        debug_assert!(op.frame > 0, "filter instruction in the input frame");
        self.reify_pair(&op.filter, op.frame - 1)
    }

    /// Fill out the variables a wildcard filter discovered in a matched
    /// column: the low half goes to the object variable, the high half to
    /// the predicate variable.
    pub(crate) fn reify_variables(
        &mut self,
        op: &Op,
        filter: &Filter,
        table: TableId,
        column: i32,
    ) {
        let elem = self.store.table(table).ty()[column as usize];
        let frame = op.frame;

        if let Some(lo) = filter.lo_var {
            debug_assert_eq!(self.rule.vars[lo].kind, VarKind::Entity);
            if let Some(e) = self.store.get_alive_lo(elem.pair_obj()) {
                self.entity_reg_set(frame, lo, e);
            }
        }
        if let Some(hi) = filter.hi_var {
            debug_assert_eq!(self.rule.vars[hi].kind, VarKind::Entity);
            if let Some(e) = self.store.get_alive_lo(elem.pair_pred()) {
                self.entity_reg_set(frame, hi, e);
            }
        }
    }

    /// Publish the matched column's id for the instruction's term.
    pub(crate) fn set_column(&mut self, op: &Op, table: Option<TableId>, column: i32) {
        if op.term < 0 {
            return;
        }
        self.ids[op.term as usize] = match table {
            Some(t) if column >= 0 => self.store.table(t).ty()[column as usize],
            _ => Id::NULL,
        };
    }

    /// Publish the subject entity for the instruction's term.
    pub(crate) fn set_source(&mut self, op: &Op, frame: usize) {
        if op.term < 0 {
            return;
        }
        let subject = match op.r_in {
            RegRef::Var(r) if self.rule.vars[r].kind == VarKind::Entity => self
                .reg_get_entity(op, frame, op.r_in)
                .unwrap_or(Entity::NULL),
            _ => Entity::NULL,
        };
        self.subjects[op.term as usize] = subject;
    }

    // ------------------------------------------------------------------
    // Yield snapshot
    // ------------------------------------------------------------------

    pub(crate) fn populate(&mut self, op: &Op) {
        let frame = op.frame;

        self.table = None;
        self.offset = 0;
        self.count = 0;

        // Without a "." variable the rule yields bare matches with no
        // bound table.
        if let Some(r) = op.r_in.var() {
            if self.rule.vars[r].kind == VarKind::Table {
                let reg = self.reg(frame, r);
                self.table = reg.table;
                self.offset = reg.offset;
                self.count = reg.count;
                if self.count == 0 {
                    if let Some(t) = reg.table {
                        self.count = self.store.table(t).count();
                    }
                }
            } else {
                let e = self.reg(frame, r).entity;
                if let Some((table, row)) = self.store.record(e) {
                    self.table = Some(table);
                    self.offset = row;
                    self.count = 1;
                }
            }
        }

        for i in 0..self.rule.vars.len() {
            self.variables[i] = if self.rule.vars[i].kind == VarKind::Entity {
                self.reg(frame, i).entity
            } else {
                Entity::NULL
            };
        }

        for t in 0..self.rule.terms.len() {
            if let Some(v) = self.rule.subject_vars[t] {
                if self.rule.vars[v].kind == VarKind::Entity {
                    self.subjects[t] = self.reg(frame, v).entity;
                }
            }
        }

        let tc = self.rule.terms.len();
        self.out_columns
            .copy_from_slice(&self.columns[frame * tc..(frame + 1) * tc]);
    }

    // ------------------------------------------------------------------
    // Public surface
    // ------------------------------------------------------------------

    /// Seed an entity variable before the first [`Iter::next`] call,
    /// constraining the evaluation to bindings with that value.
    pub fn set_var(&mut self, var: usize, value: Entity) {
        assert!(!self.started, "set_var after iteration started");
        assert!(var < self.rule.vars.len(), "variable id out of range");
        assert!(!value.is_null(), "cannot seed a null entity");
        self.entity_reg_set(0, var, value);
    }

    /// Value of an entity variable as of the last yield (table variables
    /// read as null).
    pub fn get_var(&self, var: usize) -> Entity {
        if self.rule.vars[var].kind != VarKind::Entity {
            return Entity::NULL;
        }
        let frame = self.rule.frame_count - 1;
        self.entity_reg_get(frame, var).unwrap_or(Entity::NULL)
    }

    /// The matched table, if the rule binds the implicit subject.
    pub fn table(&self) -> Option<TableId> {
        self.table
    }

    /// Entities matched by the last yield.
    pub fn entities(&self) -> &[Entity] {
        match self.table {
            Some(t) => {
                let entities = self.store.table(t).entities();
                &entities[self.offset..self.offset + self.count]
            }
            None => &[],
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Resolved id per term, with wildcards replaced by matched values.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Resolved subject per term; null when the subject is the yielded
    /// table itself.
    pub fn subjects(&self) -> &[Entity] {
        &self.subjects
    }

    /// Matched column per term in its table; -1 when not applicable.
    pub fn columns(&self) -> &[i32] {
        &self.out_columns
    }

    /// Entity-variable values at the last yield (null for table
    /// variables).
    pub fn variables(&self) -> &[Entity] {
        &self.variables
    }
}
