//! Tables: groups of entities sharing the same component-id vector.

use crate::id::{Entity, Id};

/// Index of a table within its store.
pub type TableId = usize;

/// A group of entities with identical composition.
///
/// The type vector is sorted and deduplicated; the entity vector is dense,
/// and an entity's row is its index into it.
#[derive(Debug, Clone)]
pub struct Table {
    ty: Vec<Id>,
    entities: Vec<Entity>,
}

impl Table {
    pub(crate) fn new(ty: Vec<Id>) -> Table {
        debug_assert!(ty.windows(2).all(|w| w[0] < w[1]), "table type must be sorted");
        Table {
            ty,
            entities: Vec::new(),
        }
    }

    /// Ordered component ids of this table.
    pub fn ty(&self) -> &[Id] {
        &self.ty
    }

    /// Dense entity vector, parallel to rows.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of live entities.
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Append an entity, returning its row.
    pub(crate) fn push(&mut self, e: Entity) -> usize {
        self.entities.push(e);
        self.entities.len() - 1
    }

    /// Remove the entity at `row`; returns the entity that was moved into
    /// the vacated row, if any.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<Entity> {
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }
}
