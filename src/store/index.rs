//! The id index: component id to table set.
//!
//! Every table column registers under its id and under the wildcard
//! expansions of that id, so that filters holding unresolved variables
//! (reified as wildcards) find their table sets with a single lookup.
//! Each record stores the first column at which the id occurs in the
//! table; matches beyond it are found by scanning forward while columns
//! keep matching.

use std::collections::HashMap;

use crate::id::{id_match, Entity, Id};
use crate::store::table::TableId;

/// One table registered under an id, with the first matching column.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableRecord {
    pub table: TableId,
    pub column: usize,
}

/// All tables registered under one id, in creation order.
#[derive(Debug, Default)]
pub(crate) struct IdRecord {
    pub tables: Vec<TableRecord>,
}

#[derive(Debug, Default)]
pub(crate) struct IdIndex {
    map: HashMap<Id, IdRecord>,
}

impl IdIndex {
    /// Register a column of a table under every id pattern it instantiates.
    pub fn register_column(&mut self, table: TableId, column: usize, id: Id) {
        self.register(id, table, column);
        if id.is_pair() {
            let pred = Entity::from_raw(id.pair_pred());
            let obj = Entity::from_raw(id.pair_obj());
            self.register(Id::pair(pred, Entity::WILDCARD), table, column);
            self.register(Id::pair(Entity::WILDCARD, obj), table, column);
            self.register(Id::pair(Entity::WILDCARD, Entity::WILDCARD), table, column);
        }
        self.register(Id::single(Entity::WILDCARD), table, column);
    }

    fn register(&mut self, key: Id, table: TableId, column: usize) {
        let record = self.map.entry(key).or_default();
        // Only the first occurrence per table is recorded.
        if record.tables.last().map(|r| r.table) != Some(table) {
            record.tables.push(TableRecord { table, column });
        }
    }

    pub fn get(&self, id: Id) -> Option<&IdRecord> {
        self.map.get(&id)
    }

    /// The record for `pattern` within a specific table, if registered.
    pub fn table_record(&self, table: TableId, pattern: Id) -> Option<TableRecord> {
        let record = self.map.get(&pattern)?;
        record.tables.iter().find(|r| r.table == table).copied()
    }
}

/// Scan a type vector forward for pairs whose predicate and object halves
/// are equal. Used when a filter carries the same variable in both pair
/// positions, in which case a plain wildcard hit is not sufficient.
pub(crate) fn find_next_same_var(ty: &[Id], column: i32) -> i32 {
    let start = (column + 1).max(0) as usize;
    for (i, &id) in ty.iter().enumerate().skip(start) {
        if !id.is_pair() {
            // Ids are sorted with pairs last; no pair can follow.
            return -1;
        }
        if id.pair_pred() == id.pair_obj() {
            return i as i32;
        }
    }
    -1
}

/// Find the next column of `table`'s type matching `pattern`, starting
/// from the first registered occurrence when `column` is -1, otherwise
/// advancing by one and stopping as soon as a column no longer matches.
pub(crate) fn find_next_column(
    index: &IdIndex,
    ty: &[Id],
    table: TableId,
    column: i32,
    pattern: Id,
    same_var: bool,
) -> i32 {
    let mut column = if column == -1 {
        match index.table_record(table, pattern) {
            Some(tr) => tr.column as i32,
            None => return -1,
        }
    } else {
        let next = column + 1;
        if next as usize >= ty.len() || !id_match(ty[next as usize], pattern) {
            return -1;
        }
        next
    };

    if same_var {
        column = find_next_same_var(ty, column);
    }

    column
}
