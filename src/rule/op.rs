//! The instruction model.
//!
//! A compiled rule is an array of instructions. Control flow is encoded in
//! the pass/fail labels: pass usually points at the next instruction, fail
//! at the previous one, so that a failing instruction re-enters its
//! predecessor with the redo flag set. The instruction kinds are a closed
//! set dispatched with a single match in the evaluator.

use crate::id::Entity;
use crate::rule::pair::FilterPair;
use crate::rule::var::VarId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpKind {
    /// Program prologue; succeeds once, fails on redo.
    Input,
    /// Find and iterate tables matching the filter.
    Select,
    /// Apply the filter to an already-bound table.
    With,
    /// Enumerate transitive predecessors of an object.
    SubSet,
    /// Enumerate transitive successors of a subject.
    SuperSet,
    /// Write a literal or input register into an output register, once.
    Store,
    /// Forward each entity of a bound table, one per redo.
    Each,
    /// Stash the pass label on first evaluation, the fail label on redo.
    SetJmp,
    /// Transfer control to the label stashed by a prior SetJmp.
    Jump,
    /// Invert the result of the enclosed operation.
    Not,
    /// Program epilogue; always fails to force backtracking.
    Yield,
}

impl OpKind {
    /// Control-flow instructions are exempt from frame pushing and do not
    /// participate in the frame chain.
    pub fn is_control_flow(self) -> bool {
        matches!(self, OpKind::SetJmp | OpKind::Jump)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpKind::Input => "input",
            OpKind::Select => "select",
            OpKind::With => "with",
            OpKind::SubSet => "subset",
            OpKind::SuperSet => "superset",
            OpKind::Store => "store",
            OpKind::Each => "each",
            OpKind::SetJmp => "setjmp",
            OpKind::Jump => "jump",
            OpKind::Not => "not",
            OpKind::Yield => "yield",
        }
    }
}

/// An instruction's input or output register reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RegRef {
    #[default]
    None,
    /// A variable register.
    Var(VarId),
    /// The instruction's constant subject entity.
    Subject,
}

impl RegRef {
    pub fn var(self) -> Option<VarId> {
        match self {
            RegRef::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_some(self) -> bool {
        !matches!(self, RegRef::None)
    }
}

/// A single instruction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Op {
    pub kind: OpKind,
    pub filter: FilterPair,
    /// Constant subject entity, when the term's subject is a literal.
    pub subject: Entity,
    /// Target when the instruction succeeds.
    pub on_pass: i32,
    /// Target when the instruction fails; -1 terminates the program.
    pub on_fail: i32,
    /// Register frame the instruction reads and writes.
    pub frame: usize,
    /// Source term index; -1 for bookkeeping instructions.
    pub term: i32,
    pub r_in: RegRef,
    pub r_out: RegRef,
}
