//! The virtual machine: instruction evaluators and the dispatch loop.
//!
//! Instructions are evaluated with a redo flag. Without redo an
//! instruction resets its state and produces its first result; with redo
//! it produces the next one. A result of true continues at the pass label,
//! false at the fail label, and a backward jump re-enters the target with
//! redo set, which is the whole backtracking mechanism: fail edges encode
//! the continuation, the frame array is the stack.

use std::mem;

use tracing::trace;

use crate::id::{Entity, Id};
use crate::rule::iter::{
    Iter, OpCtx, SubSetFrame, SubSetStack, SuperSetFrame, SuperSetStack, WithCtx,
};
use crate::rule::op::{Op, OpKind, RegRef};
use crate::rule::pair::{Filter, PairSlot};
use crate::rule::var::VarKind;
use crate::store::index::{find_next_column, find_next_same_var};
use crate::store::table::TableId;
use crate::store::Store;

/// Advance the cursor in a table set to the next non-empty table with a
/// matching column.
fn find_next_table(
    store: &Store,
    filter: &Filter,
    ctx: &mut WithCtx<'_>,
) -> Option<(TableId, i32)> {
    let idr = ctx.idr?;

    let mut found = None;
    let mut i = ctx.table_index;
    while i < idr.tables.len() && found.is_none() {
        let tr = idr.tables[i];
        i += 1;

        let table = store.table(tr.table);
        if table.count() == 0 {
            continue;
        }

        let mut column = tr.column as i32;
        if filter.same_var {
            column = find_next_same_var(table.ty(), column - 1);
        }
        if column != -1 {
            found = Some((tr.table, column));
        }
    }

    ctx.table_index = i;
    found
}

impl<'a> Iter<'a> {
    fn next_column(&self, table: TableId, column: i32, filter: &Filter) -> i32 {
        find_next_column(
            self.store.id_index(),
            self.store.table(table).ty(),
            table,
            column,
            filter.mask,
            filter.same_var,
        )
    }

    /// Input succeeds once; a redo means every other instruction has
    /// exhausted its results, so the program terminates.
    fn eval_input(&mut self, redo: bool) -> bool {
        !redo
    }

    fn eval_select(&mut self, op: &Op, op_index: usize, redo: bool) -> bool {
        let frame = op.frame;
        let Some(filter) = self.pair_to_filter(op) else {
            return false;
        };

        if !redo && op.term >= 0 {
            self.ids[op.term as usize] = filter.mask;
            self.set_col(frame, op.term, -1);
        }

        // The table set is looked up fresh on every first evaluation;
        // variables may have changed since last time, changing the set.
        let mut ctx = if redo {
            match &self.op_ctx[op_index] {
                OpCtx::With(c) => *c,
                _ => WithCtx::empty(),
            }
        } else {
            WithCtx::new(self.store.find_tables(filter.mask))
        };

        let ok = 'eval: {
            if ctx.idr.is_none() {
                break 'eval false;
            }

            let (table, column);
            if !redo {
                match find_next_table(self.store, &filter, &mut ctx) {
                    Some((t, c)) => {
                        table = t;
                        column = c;
                    }
                    None => break 'eval false,
                }
            } else {
                // Wildcard filters first advance within the current
                // table; concrete filters (and exhausted tables) move to
                // the next table.
                let mut col = -1;
                if filter.wildcard {
                    let t = ctx.table.expect("select redo without current table");
                    col = self.next_column(t, ctx.column, &filter);
                }
                if col == -1 {
                    match find_next_table(self.store, &filter, &mut ctx) {
                        Some((t, c)) => {
                            table = t;
                            column = c;
                        }
                        None => break 'eval false,
                    }
                } else {
                    table = ctx.table.expect("select redo without current table");
                    column = col;
                }
            }

            ctx.table = Some(table);
            ctx.column = column;
            if op.term >= 0 {
                self.set_col(frame, op.term, column);
            }
            if let Some(r) = op.r_out.var() {
                self.table_reg_set(frame, r, Some(table));
            }

            if filter.wildcard {
                self.reify_variables(op, &filter, table, column);
            }
            if !op.filter.obj_zero {
                self.set_column(op, Some(table), column);
            }
            true
        };

        self.op_ctx[op_index] = OpCtx::With(ctx);
        ok
    }

    fn eval_with(&mut self, op: &Op, op_index: usize, redo: bool) -> bool {
        let frame = op.frame;
        let Some(filter) = self.pair_to_filter(op) else {
            return false;
        };

        // A concrete filter can only match once per input.
        if redo && !filter.wildcard {
            return false;
        }

        if !redo && op.term >= 0 {
            self.set_col(frame, op.term, -1);
        }

        let mut ctx = if redo {
            match &self.op_ctx[op_index] {
                OpCtx::With(c) => *c,
                _ => WithCtx::empty(),
            }
        } else {
            // A transitive-inclusive relation holds reflexively: equal
            // subject and object match without consulting the store.
            if op.filter.transitive && op.filter.inclusive {
                let subj = match op.r_in {
                    RegRef::Subject => Some(op.subject),
                    RegRef::Var(r) if self.rule.vars[r].kind == VarKind::Entity => {
                        self.entity_reg_get(frame, r)
                    }
                    _ => None,
                };
                if let Some(subj) = subj {
                    if !subj.is_null() && !filter.obj_wildcard {
                        let obj = filter.mask.pair_obj();
                        if subj.lo() == obj {
                            if op.term >= 0 {
                                self.ids[op.term as usize] = filter.mask;
                            }
                            return true;
                        }
                    }
                }
            }

            WithCtx::new(self.store.find_tables(filter.mask))
        };

        let ok = 'eval: {
            if ctx.idr.is_none() {
                break 'eval false;
            }

            let Some(table) = self.reg_get_table(op, frame, op.r_in) else {
                break 'eval false;
            };

            let column = if !redo {
                self.next_column(table, -1, &filter)
            } else {
                self.next_column(table, ctx.column, &filter)
            };
            if column == -1 {
                break 'eval false;
            }
            ctx.column = column;
            if op.term >= 0 {
                self.set_col(frame, op.term, column);
            }

            if filter.wildcard {
                self.reify_variables(op, &filter, table, column);
            }
            if !op.filter.obj_zero {
                self.set_column(op, Some(table), column);
            }
            self.set_source(op, frame);
            true
        };

        self.op_ctx[op_index] = OpCtx::With(ctx);
        ok
    }

    /// Depth-first walk over everything "below" an object under a
    /// transitive predicate. Each frame scans the tables of subjects
    /// related to the current object; the entities of those tables become
    /// objects of deeper frames.
    fn eval_subset(&mut self, op: &Op, op_index: usize, redo: bool) -> bool {
        let frame = op.frame;
        let r = op.r_out.var().expect("subset without output register");
        let Some(mut filter) = self.pair_to_filter(op) else {
            return false;
        };

        if !redo {
            let mut stack = SubSetStack::new();
            let mut with = WithCtx::new(self.store.find_tables(filter.mask));
            let found = find_next_table(self.store, &filter, &mut with);
            let ok = match found {
                Some((table, column)) => {
                    stack.push(SubSetFrame {
                        with,
                        table,
                        row: 0,
                        column,
                    });
                    self.table_reg_set(frame, r, Some(table));
                    self.set_column(op, Some(table), column);
                    true
                }
                None => false,
            };
            self.op_ctx[op_index] = OpCtx::SubSet(stack);
            return ok;
        }

        let OpCtx::SubSet(mut stack) = mem::take(&mut self.op_ctx[op_index]) else {
            unreachable!("subset redo without context");
        };

        let (result_table, result_column);
        'walk: loop {
            let top = stack.last().expect("subset redo with empty stack");
            let mut table = top.table;
            let mut row = top.row;

            // Rows exhausted: advance to the next table of this frame, or
            // pop back to the parent and resume at its next row.
            while row >= self.store.table(table).count() {
                let top = stack.last_mut().expect("subset walk lost its frame");
                if let Some((t, column)) = find_next_table(self.store, &filter, &mut top.with) {
                    top.table = t;
                    top.row = 0;
                    top.column = column;
                    self.set_column(op, Some(t), column);
                    self.table_reg_set(frame, r, Some(t));
                    self.op_ctx[op_index] = OpCtx::SubSet(stack);
                    return true;
                }
                stack.pop();
                trace!(depth = stack.len(), "subset walk pops a frame");
                let Some(top) = stack.last_mut() else {
                    self.op_ctx[op_index] = OpCtx::SubSet(stack);
                    return false;
                };
                top.row += 1;
                table = top.table;
                row = top.row;
            }

            // Expand the entity at the current row: its own subjects (if
            // any) form the next frame of the walk.
            let row_count = self.store.table(table).count();
            loop {
                let e = self.store.table(table).entities()[row];

                let mut pair = op.filter;
                pair.obj = Some(PairSlot::Entity(e));
                filter = match self.reify_pair(&pair, frame.saturating_sub(1)) {
                    Some(f) => f,
                    None => {
                        self.op_ctx[op_index] = OpCtx::SubSet(stack);
                        return false;
                    }
                };

                let mut with = WithCtx::new(self.store.find_tables(filter.mask));
                if with.idr.is_some() {
                    if let Some((t, column)) = find_next_table(self.store, &filter, &mut with) {
                        stack.push(SubSetFrame {
                            with,
                            table: t,
                            row: 0,
                            column,
                        });
                        trace!(depth = stack.len(), table = t, "subset walk pushes a frame");
                        result_table = t;
                        result_column = column;
                        break 'walk;
                    }
                }

                let top = stack.last_mut().expect("subset walk lost its frame");
                top.row += 1;
                row = top.row;
                if row >= row_count {
                    continue 'walk;
                }
            }
        }

        self.table_reg_set(frame, r, Some(result_table));
        self.set_column(op, Some(result_table), result_column);
        self.op_ctx[op_index] = OpCtx::SubSet(stack);
        true
    }

    /// Dual walk: follow the pair on the subject's own table upward, one
    /// super-entity at a time.
    fn eval_superset(&mut self, op: &Op, op_index: usize, redo: bool) -> bool {
        let frame = op.frame;
        let r = op.r_out.var().expect("superset without output register");
        debug_assert_eq!(self.rule.vars[r].kind, VarKind::Entity);

        let Some(filter) = self.pair_to_filter(op) else {
            return false;
        };
        let super_filter = Filter::exact(Id::pair(
            Entity::from_raw(filter.mask.pair_pred()),
            Entity::WILDCARD,
        ));

        if !redo {
            let mut stack = SuperSetStack::new();
            let obj = filter.mask.pair_obj();
            debug_assert_ne!(obj, Entity::WILDCARD.lo());

            let ok = 'eval: {
                let Some(obj_e) = self.store.get_alive_lo(obj) else {
                    break 'eval false;
                };
                let Some((table, _)) = self.store.record(obj_e) else {
                    break 'eval false;
                };
                let column = self.next_column(table, -1, &super_filter);
                if column == -1 {
                    break 'eval false;
                }

                let col_obj = self.store.table(table).ty()[column as usize].pair_obj();
                if let Some(e) = self.store.get_alive_lo(col_obj) {
                    self.entity_reg_set(frame, r, e);
                }
                self.set_column(op, Some(table), column);
                stack.push(SuperSetFrame { table, column });
                true
            };
            self.op_ctx[op_index] = OpCtx::SuperSet(stack);
            return ok;
        }

        let OpCtx::SuperSet(mut stack) = mem::take(&mut self.op_ctx[op_index]) else {
            unreachable!("superset redo without context");
        };

        // Descend through the object the last yield pointed at.
        {
            let top = *stack.last().expect("superset redo with empty stack");
            let col_obj = self.store.table(top.table).ty()[top.column as usize].pair_obj();
            if let Some(e) = self.store.get_alive_lo(col_obj) {
                if let Some((table, _)) = self.store.record(e) {
                    stack.push(SuperSetFrame { table, column: -1 });
                    trace!(depth = stack.len(), table, "superset walk pushes a frame");
                }
            }
        }

        loop {
            let top = *stack.last().expect("superset walk lost its frame");
            let column = self.next_column(top.table, top.column, &super_filter);
            if column != -1 {
                stack.last_mut().expect("superset walk lost its frame").column = column;
                let col_obj = self.store.table(top.table).ty()[column as usize].pair_obj();
                if let Some(e) = self.store.get_alive_lo(col_obj) {
                    self.entity_reg_set(frame, r, e);
                }
                self.set_column(op, Some(top.table), column);
                self.op_ctx[op_index] = OpCtx::SuperSet(stack);
                return true;
            }
            stack.pop();
            trace!(depth = stack.len(), "superset walk pops a frame");
            if stack.is_empty() {
                self.op_ctx[op_index] = OpCtx::SuperSet(stack);
                return false;
            }
        }
    }

    /// Forward each entity of a bound table, skipping builtin sentinels
    /// that would confuse downstream filters.
    fn eval_each(&mut self, op: &Op, op_index: usize, redo: bool) -> bool {
        let frame = op.frame;
        let r_in = op.r_in.var().expect("each without input register");
        let r_out = op.r_out.var().expect("each without output register");
        debug_assert_eq!(self.rule.vars[r_in].kind, VarKind::Table);
        debug_assert_eq!(self.rule.vars[r_out].kind, VarKind::Entity);

        let reg = self.reg(frame, r_in);
        let e = if let Some(table) = reg.table {
            let count = if reg.count == 0 {
                self.store.table(table).count()
            } else {
                reg.offset + reg.count
            };

            let mut row = if redo {
                match &self.op_ctx[op_index] {
                    OpCtx::Each { row } => *row + 1,
                    _ => unreachable!("each redo without context"),
                }
            } else {
                reg.offset
            };
            if row >= count {
                return false;
            }

            let entities = self.store.table(table).entities();
            let mut e = entities[row];
            while e == Entity::WILDCARD || e == Entity::THIS {
                row += 1;
                if row == count {
                    return false;
                }
                e = entities[row];
            }
            self.op_ctx[op_index] = OpCtx::Each { row };
            e
        } else {
            // A table register without a table carries a bare entity
            // (bound from an entity that has no components).
            if redo {
                return false;
            }
            let e = reg.entity;
            if e.is_null() {
                Entity::WILDCARD
            } else if !self.store.is_valid(e) {
                return false;
            } else {
                e
            }
        };

        self.entity_reg_set(frame, r_out, e);
        true
    }

    /// Write the input (a register or the constant subject) into the
    /// output register, once.
    fn eval_store(&mut self, op: &Op, redo: bool) -> bool {
        if redo {
            return false;
        }

        let frame = op.frame;
        let Some(e) = self.reg_get_entity(op, frame, op.r_in) else {
            return false;
        };
        let r_out = op.r_out.var().expect("store without output register");
        self.reg_set_entity(frame, r_out, e);

        if op.term >= 0 {
            if let Some(filter) = self.pair_to_filter(op) {
                self.ids[op.term as usize] = filter.mask;
            }
        }

        true
    }

    fn eval_setjmp(&mut self, op: &Op, op_index: usize, redo: bool) -> bool {
        let label = if redo { op.on_fail } else { op.on_pass };
        self.op_ctx[op_index] = OpCtx::SetJmp { label };
        !redo
    }

    fn eval_op(&mut self, op: &Op, op_index: usize, redo: bool) -> bool {
        match op.kind {
            OpKind::Input => self.eval_input(redo),
            OpKind::Select => self.eval_select(op, op_index, redo),
            OpKind::With => self.eval_with(op, op_index, redo),
            OpKind::SubSet => self.eval_subset(op, op_index, redo),
            OpKind::SuperSet => self.eval_superset(op, op_index, redo),
            OpKind::Each => self.eval_each(op, op_index, redo),
            OpKind::Store => self.eval_store(op, redo),
            OpKind::SetJmp => self.eval_setjmp(op, op_index, redo),
            // Jump passes through; the dispatcher overrides control flow.
            OpKind::Jump => !redo,
            // Not inverts by flipping the redo polarity.
            OpKind::Not => !redo,
            // Yield always fails, forcing redo of everything before it.
            OpKind::Yield => false,
        }
    }

    /// Run the program until the next yield. Returns false when the
    /// program reaches terminal failure.
    pub fn next(&mut self) -> bool {
        if self.op == -1 {
            return false;
        }
        self.started = true;

        let mut redo = self.redo;
        let mut last_frame: i32 = -1;

        loop {
            let op_index = self.op as usize;
            let op = self.rule.ops[op_index];
            let cur = op.frame;

            // Entering a new frame forward: carry the previous frame's
            // bindings so a later redo can restore them by backtracking.
            if !redo && !op.kind.is_control_flow() && cur > 0 && cur as i32 != last_frame {
                self.push_registers(cur - 1, cur);
                self.push_columns(cur - 1, cur);
            }

            let result = self.eval_op(&op, op_index, redo);
            self.op = if result { op.on_pass } else { op.on_fail };

            if op.kind == OpKind::Yield {
                self.populate(&op);
                self.redo = true;
                trace!(op = op_index, "rule yielded a match");
                return true;
            }

            if op.kind == OpKind::Jump {
                // The target label lives in the SetJmp context the jump's
                // pass slot points at.
                let label = match &self.op_ctx[op.on_pass as usize] {
                    OpCtx::SetJmp { label } => *label,
                    _ => unreachable!("jump without a setjmp label"),
                };
                self.op = label;
            }

            // A backward jump redoes the target.
            redo = self.op <= op_index as i32;

            if !op.kind.is_control_flow() {
                last_frame = cur as i32;
            }

            if self.op == -1 {
                trace!("rule iteration exhausted");
                return false;
            }
        }
    }
}
