//! The [`World`]: entity lifecycle plus typed component access.
//!
//! This is the host object model the synchronization, AI and activity layers
//! run against. It offers exactly the accessors they need
//! (`get_component` / `insert_component` / `remove_component` and a liveness
//! check) and nothing else.

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::{Component, ComponentStorage, ErasedStorage};
use crate::entity::{EntityAllocator, EntityId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Container for entities and their components.
#[derive(Default)]
pub struct World {
    allocator: EntityAllocator,
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entity_count())
            .field("storage_count", &self.storages.len())
            .finish()
    }
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Spawn an entity without components.
    pub fn spawn(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Spawn an entity carrying one component.
    pub fn spawn_with<T: Component>(&mut self, component: T) -> EntityId {
        let entity = self.spawn();
        self.storage_mut::<T>().insert(entity, component);
        entity
    }

    /// Despawn an entity and drop all of its components.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.allocator.deallocate(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        let dropped = self
            .storages
            .values_mut()
            .filter_map(|storage| storage.remove_entity(entity).then_some(()))
            .count();
        tracing::trace!(entity = %entity, dropped, "despawned entity");
        Ok(())
    }

    /// `true` if `entity` is alive (current generation).
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    // -- component access ---------------------------------------------------

    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storage::<T>()?.get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storages
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()?
            .get_mut(entity)
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.is_alive(entity)
            && self
                .storages
                .get(&TypeId::of::<T>())
                .is_some_and(|s| s.contains(entity))
    }

    /// Insert or overwrite a component on a live entity.
    pub fn insert_component<T: Component>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> Result<(), EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        self.storage_mut::<T>().insert(entity, value);
        Ok(())
    }

    /// Fetch the component, creating it with `Default` when it is missing.
    pub fn get_or_insert_default<T: Component + Default>(
        &mut self,
        entity: EntityId,
    ) -> Result<&mut T, EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        let storage = self.storage_mut::<T>();
        if storage.get(entity).is_none() {
            storage.insert(entity, T::default());
        }
        storage
            .get_mut(entity)
            .ok_or(EcsError::StaleEntity { entity })
    }

    /// Remove a component. Returns the removed value, `None` if the entity
    /// did not carry one.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<Option<T>, EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        Ok(self
            .storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<ComponentStorage<T>>())
            .and_then(|s| s.remove(entity)))
    }

    /// All entities currently carrying `T`, ascending.
    pub fn entities_with<T: Component>(&self) -> Vec<EntityId> {
        self.storage::<T>()
            .map(|s| s.entities().collect())
            .unwrap_or_default()
    }

    // -- storage helpers ----------------------------------------------------

    fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.storages
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
    }

    fn storage_mut<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let erased = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStorage::<T>::default()));
        match erased.as_any_mut().downcast_mut::<ComponentStorage<T>>() {
            Some(storage) => storage,
            // Keyed by TypeId::of::<T>(), so the downcast cannot miss.
            None => unreachable!("component storage registered under a foreign TypeId"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
