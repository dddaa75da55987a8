//! Components and type-erased storage.
//!
//! Components are plain Rust values keyed by their `TypeId`. Each type lives
//! in its own [`ComponentStorage`], an `EntityId`-ordered map, so iteration
//! order is deterministic.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker for values that can be attached to entities.
///
/// Blanket-implemented for every `'static` type.
pub trait Component: Any {}

impl<T: Any> Component for T {}

// ---------------------------------------------------------------------------
// ComponentStorage
// ---------------------------------------------------------------------------

/// Storage for all values of one component type.
#[derive(Debug)]
pub struct ComponentStorage<T> {
    values: BTreeMap<EntityId, T>,
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<T> ComponentStorage<T> {
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.values.get(&entity)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.values.get_mut(&entity)
    }

    /// Insert or overwrite; returns the previous value.
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        self.values.insert(entity, value)
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        self.values.remove(&entity)
    }

    /// Entities owning a value, ascending.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.values.iter().map(|(e, v)| (*e, v))
    }
}

/// Object-safe view of a [`ComponentStorage`] so the world can hold all
/// storages in one map and purge an entity from every one of them.
pub(crate) trait ErasedStorage: Any {
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    fn contains(&self, entity: EntityId) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for ComponentStorage<T> {
    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.values.remove(&entity).is_some()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.values.contains_key(&entity)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
