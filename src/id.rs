//! Identifier types for entities and component ids.
//!
//! The id design mirrors the two granularities the engine works with:
//! - `Entity`: a 64-bit opaque handle. The low 32 bits are the index, bits
//!   32..48 carry the generation so handles can be invalidated on despawn.
//! - `Id`: a component identifier. Plain component ids are
//!   generation-stripped entity handles; relation instances ("pairs") pack
//!   predicate and object into a single id with a role bit set, so that
//!   components and pairs share one id space and one index.
//!
//! A handful of entity indices below `FIRST_USER_INDEX` are reserved for
//! builtin sentinels: the wildcard, the implicit subject ("this"), and the
//! builtin inheritance relation.

/// A 64-bit entity handle: low 32 bits index, bits 32..48 generation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// The null handle. Never alive; doubles as "no entity" in registers.
    pub const NULL: Entity = Entity(0);
    /// Matches any entity when used in a filter position.
    pub const WILDCARD: Entity = Entity(1);
    /// The implicit subject variable ("." / "This") as an entity.
    pub const THIS: Entity = Entity(2);
    /// The builtin inheritance relation. Transitive, reflexive and final.
    pub const ISA: Entity = Entity(3);

    /// First index handed out to user entities.
    pub(crate) const FIRST_USER_INDEX: u32 = 8;

    pub(crate) fn from_parts(index: u32, generation: u16) -> Entity {
        Entity(u64::from(index) | (u64::from(generation) << 32))
    }

    pub fn from_raw(raw: u64) -> Entity {
        Entity(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// The index half of the handle.
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    pub fn generation(self) -> u16 {
        (self.0 >> 32) as u16
    }

    /// The handle with the generation stripped. Filters compare on this.
    pub fn lo(self) -> u64 {
        self.0 & 0xffff_ffff
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.generation() == 0 {
            write!(f, "Entity({})", self.index())
        } else {
            write!(f, "Entity({}v{})", self.index(), self.generation())
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Role bit marking an id as a pair. Plain component ids never have it set.
const PAIR: u64 = 1 << 63;

/// Mask for the predicate half of a pair (31 bits above the object half).
const PRED_MASK: u64 = 0x7fff_ffff;

/// A component identifier: a plain component or an encoded pair.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Id(u64);

impl Id {
    pub const NULL: Id = Id(0);

    /// Plain component id for an entity (generation-stripped).
    pub fn single(e: Entity) -> Id {
        Id(e.lo())
    }

    /// Pair id combining a predicate and an object.
    ///
    /// Predicate indices must fit in 31 bits; the object keeps its full
    /// 32-bit index. Both halves are generation-stripped.
    pub fn pair(pred: Entity, obj: Entity) -> Id {
        debug_assert!(pred.lo() <= PRED_MASK, "predicate index out of range");
        Id(PAIR | (pred.lo() << 32) | obj.lo())
    }

    pub fn from_raw(raw: u64) -> Id {
        Id(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_pair(self) -> bool {
        self.0 & PAIR != 0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Predicate half of a pair, as a generation-less handle.
    pub fn pair_pred(self) -> u64 {
        (self.0 >> 32) & PRED_MASK
    }

    /// Object half of a pair; for a plain id this is the whole stripped
    /// handle, which is what filter reification relies on.
    pub fn pair_obj(self) -> u64 {
        self.0 & 0xffff_ffff
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_pair() {
            write!(f, "Pair({}, {})", self.pair_pred(), self.pair_obj())
        } else {
            write!(f, "Id({})", self.0)
        }
    }
}

/// Does `candidate` instantiate `pattern`?
///
/// Pattern halves may be the wildcard; a bare wildcard pattern matches any
/// id, pair or not.
pub fn id_match(candidate: Id, pattern: Id) -> bool {
    if candidate == pattern {
        return true;
    }
    let wc = Entity::WILDCARD.lo();
    if pattern.is_pair() {
        if !candidate.is_pair() {
            return false;
        }
        let pred_ok = pattern.pair_pred() == wc || pattern.pair_pred() == candidate.pair_pred();
        let obj_ok = pattern.pair_obj() == wc || pattern.pair_obj() == candidate.pair_obj();
        pred_ok && obj_ok
    } else {
        pattern.pair_obj() == wc
    }
}
