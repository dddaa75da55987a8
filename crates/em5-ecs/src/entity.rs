//! Entity handles and their allocation.
//!
//! An [`EntityId`] doubles as the weak entity reference of the simulation
//! crates and as the tracked entity reference of the synchronization layer.
//! The low 32 bits hold a slot index, the high 32 bits the slot's generation,
//! which is bumped whenever the slot is recycled. A handle to a despawned
//! entity therefore never aliases a newer one, and every dereference goes
//! through [`EntityAllocator::is_alive`].
//!
//! On the wire a handle travels as its [`tracked_ref`](EntityId::tracked_ref).
//! A receiver keys its proxies by that value and never dereferences it
//! against its own world: a host handle means nothing to a client allocator.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self(u64::from(generation) << 32 | u64::from(index))
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The value a sender writes to identify this entity in an update.
    #[inline]
    pub fn tracked_ref(self) -> u64 {
        self.0
    }

    /// The sender-side handle behind a received tracked reference.
    ///
    /// Only meaningful in the sender's world; receivers use it for logging.
    #[inline]
    pub fn from_tracked_ref(tracked_ref: u64) -> Self {
        Self(tracked_ref)
    }
}

// Slot-major ordering keeps iteration stable when slots are recycled.
impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index(), self.generation()).cmp(&(other.index(), other.generation()))
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// Hands out [`EntityId`]s and recycles their slots.
///
/// Freed slots are reused oldest first, so a unit that is spawned and
/// despawned every tick (a replica proxy, say) does not burn through the
/// generations of a single slot.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    slots: Vec<Slot>,
    free: VecDeque<u32>,
    live: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free.pop_front() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return EntityId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            alive: true,
        });
        EntityId::new(index, 0)
    }

    /// Free the slot behind `id` and bump its generation.
    ///
    /// Returns `false` when `id` was already dead or stale.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        let Some(slot) = self.live_slot_mut(id) else {
            return false;
        };
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push_back(id.index());
        self.live -= 1;
        true
    }

    /// `true` if `id` names a live entity of the current generation.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slots
            .get(id.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == id.generation())
    }

    pub fn alive_count(&self) -> usize {
        self.live
    }

    fn live_slot_mut(&mut self, id: EntityId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.alive && slot.generation == id.generation())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
