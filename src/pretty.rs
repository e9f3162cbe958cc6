//! Textual rendering of compiled rule programs.
//!
//! Useful to analyze how a rule will be evaluated. The format is stable
//! for a given program and store.

use std::fmt::Write;

use crate::id::Entity;
use crate::rule::op::OpKind;
use crate::rule::pair::PairSlot;
use crate::rule::var::VarKind;
use crate::rule::Rule;
use crate::store::Store;

fn entity_name(store: &Store, e: Entity) -> String {
    let resolved = store.get_alive(e).unwrap_or(e);
    match store.name(resolved) {
        Some(name) => name.to_string(),
        None => format!("#{}", resolved.index()),
    }
}

impl Rule {
    /// Render the program, one instruction per line: index, frame,
    /// pass/fail labels, mnemonic, output/input registers (`t`-prefixed
    /// for table kind) and the filter expression.
    pub fn program_str(&self, store: &Store) -> String {
        let mut out = String::new();

        for (i, op) in self.ops.iter().enumerate().skip(1) {
            let pred_name = match op.filter.pred {
                PairSlot::Var(r) => Some(self.vars[r].name.clone()),
                PairSlot::Entity(e) if !e.is_null() => Some(entity_name(store, e)),
                PairSlot::Entity(_) => None,
            };
            let obj_name = match op.filter.obj {
                Some(PairSlot::Var(r)) => Some(self.vars[r].name.clone()),
                Some(PairSlot::Entity(e)) if !e.is_null() => Some(entity_name(store, e)),
                Some(PairSlot::Entity(_)) if op.filter.obj_zero => Some("0".to_string()),
                _ => None,
            };

            let _ = write!(
                out,
                "{:2}: [S:{:2}, P:{:2}, F:{:2}] {:<9}",
                i,
                op.frame,
                op.on_pass,
                op.on_fail,
                op.kind.mnemonic()
            );

            let has_filter = matches!(
                op.kind,
                OpKind::Select | OpKind::With | OpKind::SubSet | OpKind::SuperSet
            );

            if let Some(r) = op.r_out.var() {
                let var = &self.vars[r];
                let prefix = if var.kind == VarKind::Table { "t" } else { "" };
                let _ = write!(out, "O:{}{} ", prefix, var.name);
            } else if op.r_out.is_some() && !op.subject.is_null() {
                let _ = write!(out, "O:{} ", entity_name(store, op.subject));
            }

            if let Some(r) = op.r_in.var() {
                let var = &self.vars[r];
                let prefix = if var.kind == VarKind::Table { "t" } else { "" };
                let _ = write!(out, "I:{}{} ", prefix, var.name);
            } else if op.r_in.is_some() && !op.subject.is_null() {
                let _ = write!(out, "I:{} ", entity_name(store, op.subject));
            }

            if has_filter {
                if let Some(pred) = &pred_name {
                    match &obj_name {
                        Some(obj) => {
                            let _ = write!(out, "F:({}, {})", pred, obj);
                        }
                        None => {
                            let _ = write!(out, "F:({})", pred);
                        }
                    }
                }
            }

            out.push('\n');
        }

        out
    }
}
