//! In-memory entity/table store.
//!
//! The store groups entities into tables by composition: all entities with
//! the same set of component ids share a table, and adding or removing an
//! id moves the entity between tables. The id index maps every component
//! id (and its wildcard expansions) to the set of tables containing it,
//! which is what the rule engine queries at evaluation time.
//!
//! Structural mutation (adding/removing ids, despawning) must not happen
//! while a rule iterator is live on the store; this is a usage convention,
//! not enforced by locks.

pub mod index;
pub mod table;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::id::{Entity, Id};
use crate::store::index::{IdIndex, IdRecord};
use crate::store::table::{Table, TableId};

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// Predicate metadata consulted by the rule compiler and evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// Relation chains may be traversed through sub/superset expansion.
    Transitive,
    /// Transitive and reflexive: set expansion yields the root itself.
    TransitiveSelf,
    /// Never substituted through the implicit inheritance relation.
    Final,
}

impl Attribute {
    const fn bit(self) -> u8 {
        match self {
            Attribute::Transitive => 1,
            Attribute::TransitiveSelf => 1 << 1,
            Attribute::Final => 1 << 2,
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Clone, Default)]
struct EntityMeta {
    generation: u16,
    alive: bool,
    attrs: u8,
    /// Home table and row, if the entity has any components.
    loc: Option<(TableId, usize)>,
}

/// The entity/table store.
pub struct Store {
    metas: Vec<EntityMeta>,
    free: Vec<u32>,
    tables: Vec<Table>,
    table_map: HashMap<Vec<Id>, TableId>,
    index: IdIndex,
    /// Name to entity, insertion-ordered for deterministic diagnostics.
    names: IndexMap<String, Entity>,
    entity_names: HashMap<u32, String>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Store {
        let mut store = Store {
            metas: vec![EntityMeta::default(); Entity::FIRST_USER_INDEX as usize],
            free: Vec::new(),
            tables: Vec::new(),
            table_map: HashMap::new(),
            index: IdIndex::default(),
            names: IndexMap::new(),
            entity_names: HashMap::new(),
        };

        for (builtin, name) in [
            (Entity::WILDCARD, "*"),
            (Entity::THIS, "."),
            (Entity::ISA, "IsA"),
        ] {
            store.metas[builtin.index() as usize].alive = true;
            store.set_name(builtin, name);
        }

        // The builtin inheritance relation is reflexive-transitive, and
        // final so that predicate substitution cannot recurse through it.
        store.set_attribute(Entity::ISA, Attribute::Transitive);
        store.set_attribute(Entity::ISA, Attribute::TransitiveSelf);
        store.set_attribute(Entity::ISA, Attribute::Final);

        store
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    pub fn spawn(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let meta = &mut self.metas[index as usize];
            meta.alive = true;
            Entity::from_parts(index, meta.generation)
        } else {
            let index = self.metas.len() as u32;
            self.metas.push(EntityMeta {
                alive: true,
                ..EntityMeta::default()
            });
            Entity::from_parts(index, 0)
        }
    }

    /// Spawn and name an entity in one step.
    pub fn named(&mut self, name: &str) -> Entity {
        let e = self.spawn();
        self.set_name(e, name);
        e
    }

    /// Despawn an entity, bumping its generation so stale handles fail
    /// liveness checks.
    pub fn despawn(&mut self, e: Entity) {
        if !self.is_alive(e) {
            return;
        }
        self.detach(e);
        let meta = &mut self.metas[e.index() as usize];
        meta.alive = false;
        meta.generation = meta.generation.wrapping_add(1);
        meta.attrs = 0;
        if let Some(name) = self.entity_names.remove(&e.index()) {
            self.names.shift_remove(&name);
        }
        self.free.push(e.index());
    }

    pub fn is_alive(&self, e: Entity) -> bool {
        match self.metas.get(e.index() as usize) {
            Some(meta) => meta.alive && meta.generation == e.generation(),
            None => false,
        }
    }

    pub fn is_valid(&self, e: Entity) -> bool {
        !e.is_null() && self.is_alive(e)
    }

    /// Resolve a handle (possibly generation-stripped or stale-generation)
    /// to the live entity at its index, if any.
    pub fn get_alive(&self, e: Entity) -> Option<Entity> {
        if self.is_alive(e) {
            return Some(e);
        }
        let meta = self.metas.get(e.index() as usize)?;
        if meta.alive {
            Some(Entity::from_parts(e.index(), meta.generation))
        } else {
            None
        }
    }

    pub(crate) fn get_alive_lo(&self, lo: u64) -> Option<Entity> {
        self.get_alive(Entity::from_raw(lo))
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// Add a component id to an entity, moving it to the matching table.
    pub fn add_id(&mut self, e: Entity, id: Id) {
        assert!(self.is_alive(e), "add_id on dead entity");
        let mut ty = self.type_of(e);
        match ty.binary_search(&id) {
            Ok(_) => return,
            Err(pos) => ty.insert(pos, id),
        }
        self.detach(e);
        let table = self.table_for(ty);
        let row = self.tables[table].push(e);
        self.metas[e.index() as usize].loc = Some((table, row));
    }

    /// Add a plain component.
    pub fn add(&mut self, e: Entity, component: Entity) {
        self.add_id(e, Id::single(component));
    }

    /// Add a relation instance `pred(e, obj)`.
    pub fn add_pair(&mut self, e: Entity, pred: Entity, obj: Entity) {
        self.add_id(e, Id::pair(pred, obj));
    }

    /// Remove a component id from an entity.
    pub fn remove_id(&mut self, e: Entity, id: Id) {
        assert!(self.is_alive(e), "remove_id on dead entity");
        let mut ty = self.type_of(e);
        match ty.binary_search(&id) {
            Ok(pos) => {
                ty.remove(pos);
            }
            Err(_) => return,
        }
        self.detach(e);
        if ty.is_empty() {
            return;
        }
        let table = self.table_for(ty);
        let row = self.tables[table].push(e);
        self.metas[e.index() as usize].loc = Some((table, row));
    }

    pub fn has_id(&self, e: Entity, id: Id) -> bool {
        self.type_of(e).binary_search(&id).is_ok()
    }

    fn type_of(&self, e: Entity) -> Vec<Id> {
        match self.metas[e.index() as usize].loc {
            Some((table, _)) => self.tables[table].ty().to_vec(),
            None => Vec::new(),
        }
    }

    /// Remove the entity from its current table, fixing up the row of the
    /// entity swapped into its place.
    fn detach(&mut self, e: Entity) {
        let Some((table, row)) = self.metas[e.index() as usize].loc.take() else {
            return;
        };
        if let Some(moved) = self.tables[table].swap_remove(row) {
            self.metas[moved.index() as usize].loc = Some((table, row));
        }
    }

    fn table_for(&mut self, ty: Vec<Id>) -> TableId {
        if let Some(&table) = self.table_map.get(&ty) {
            return table;
        }
        let table = self.tables.len();
        for (column, &id) in ty.iter().enumerate() {
            self.index.register_column(table, column, id);
        }
        self.tables.push(Table::new(ty.clone()));
        self.table_map.insert(ty, table);
        table
    }

    // ------------------------------------------------------------------
    // Attributes and names
    // ------------------------------------------------------------------

    pub fn set_attribute(&mut self, e: Entity, attr: Attribute) {
        assert!(self.is_alive(e), "set_attribute on dead entity");
        self.metas[e.index() as usize].attrs |= attr.bit();
    }

    pub fn has_attribute(&self, e: Entity, attr: Attribute) -> bool {
        if !self.is_alive(e) {
            return false;
        }
        self.metas[e.index() as usize].attrs & attr.bit() != 0
    }

    pub fn set_name(&mut self, e: Entity, name: &str) {
        self.names.insert(name.to_string(), e);
        self.entity_names.insert(e.index(), name.to_string());
    }

    pub fn name(&self, e: Entity) -> Option<&str> {
        self.entity_names.get(&e.index()).map(String::as_str)
    }

    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.names.get(name).copied()
    }

    // ------------------------------------------------------------------
    // Engine-facing lookups
    // ------------------------------------------------------------------

    /// Home table and row of an entity.
    pub fn record(&self, e: Entity) -> Option<(TableId, usize)> {
        if !self.is_alive(e) {
            return None;
        }
        self.metas[e.index() as usize].loc
    }

    pub fn table(&self, table: TableId) -> &Table {
        &self.tables[table]
    }

    pub(crate) fn find_tables(&self, id: Id) -> Option<&IdRecord> {
        self.index.get(id)
    }

    pub(crate) fn id_index(&self) -> &IdIndex {
        &self.index
    }
}
