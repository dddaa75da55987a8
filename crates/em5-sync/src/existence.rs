//! Existence tracking of the component behind a cache item.
//!
//! Most replicated fields only mean something while their component exists.
//! [`ComponentExistenceTracking`] wraps a [`ComponentFields`] set with the
//! component's presence: the existence bit leads every update, and field bits
//! follow only when the component is present, on both sides of the wire.
//!
//! While the component is absent the field snapshot is reset to the values
//! of `Component::default()`. That is exactly what the receiver creates on
//! demand, so a component that comes back diffs against the right baseline.

use std::collections::VecDeque;
use std::fmt;

use em5_ecs::prelude::*;

use crate::bit_stream::{BitReader, BitWriter};
use crate::item::{DataCacheItem, HistoryEntry};
use crate::SyncError;

// ---------------------------------------------------------------------------
// ComponentFields
// ---------------------------------------------------------------------------

/// The replicated fields of one component type, in declared wire order.
pub trait ComponentFields: Default {
    type Component: Component + Default;
    /// Decoded changes: one `Option` per field.
    type Delta: fmt::Debug + Clone + PartialEq;

    const COMPONENT_NAME: &'static str;

    /// Re-read every field from `component`; `true` if any changed.
    fn observe(&mut self, component: &Self::Component) -> bool;

    /// Write every field's changed bit and payload.
    fn write(&self, writer: &mut BitWriter, force: bool);

    /// Converge the snapshot to the observed values.
    fn commit(&mut self);

    /// Names of the fields flagged by the last `observe`.
    fn changed_fields(&self) -> Vec<&'static str>;

    fn read(reader: &mut BitReader<'_>) -> Result<Self::Delta, SyncError>;

    /// Copy the changed fields of `delta` into `component`.
    fn apply(delta: &Self::Delta, component: &mut Self::Component);
}

// ---------------------------------------------------------------------------
// ComponentExistenceTracking
// ---------------------------------------------------------------------------

/// A [`DataCacheItem`] for the fields `F` of one component type.
pub struct ComponentExistenceTracking<F: ComponentFields> {
    has_component: bool,
    had_component_previously: bool,
    prepared: bool,
    fields: F,
    history: VecDeque<HistoryEntry<F::Delta>>,
}

impl<F: ComponentFields> ComponentExistenceTracking<F> {
    pub fn new() -> Self {
        Self {
            has_component: false,
            had_component_previously: false,
            prepared: false,
            fields: Self::baseline(),
            history: VecDeque::new(),
        }
    }

    /// Field snapshot matching a freshly created component.
    fn baseline() -> F {
        let mut fields = F::default();
        fields.observe(&F::Component::default());
        fields.commit();
        fields
    }

    pub fn has_component(&self) -> bool {
        self.has_component
    }

    pub fn had_component_previously(&self) -> bool {
        self.had_component_previously
    }

    /// Whether the component appeared or vanished since the last update.
    pub fn existence_changed(&self) -> bool {
        self.has_component != self.had_component_previously
    }

    pub fn fields(&self) -> &F {
        &self.fields
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry<F::Delta>> {
        self.history.iter()
    }

    /// Move every queued entry of `other` behind the entries queued here.
    pub fn append_history(&mut self, other: &mut Self) {
        self.history.append(&mut other.history);
    }

    fn apply_entry(
        world: &mut World,
        entity: EntityId,
        entry: &HistoryEntry<F::Delta>,
    ) -> Result<(), EcsError> {
        match &entry.delta {
            Some(delta) if entry.has_component => {
                let component = world.get_or_insert_default::<F::Component>(entity)?;
                F::apply(delta, component);
            }
            _ => {
                world.remove_component::<F::Component>(entity)?;
            }
        }
        Ok(())
    }
}

impl<F: ComponentFields> Default for ComponentExistenceTracking<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ComponentFields + fmt::Debug> fmt::Debug for ComponentExistenceTracking<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentExistenceTracking")
            .field("component", &F::COMPONENT_NAME)
            .field("has_component", &self.has_component)
            .field("had_component_previously", &self.had_component_previously)
            .field("fields", &self.fields)
            .field("pending_entries", &self.history.len())
            .finish()
    }
}

impl<F: ComponentFields> DataCacheItem for ComponentExistenceTracking<F> {
    fn component_name(&self) -> &'static str {
        F::COMPONENT_NAME
    }

    fn prepare_for_update(&mut self, world: &World, entity: EntityId, clock: &Clock) -> bool {
        let component = world.get_component::<F::Component>(entity);
        self.has_component = component.is_some();

        let fields_changed = match component {
            Some(component) => self.fields.observe(component),
            None => {
                self.fields = Self::baseline();
                false
            }
        };
        self.prepared = true;

        let changed = fields_changed || self.existence_changed();
        if changed {
            tracing::trace!(
                entity = %entity,
                tick = clock.signal_counter(),
                component = F::COMPONENT_NAME,
                has_component = self.has_component,
                fields = ?self.fields.changed_fields(),
                "cache item changed"
            );
        }
        changed
    }

    fn update_data(&mut self, writer: &mut BitWriter, force: bool) -> Result<(), SyncError> {
        if !self.prepared {
            return Err(SyncError::NotPrepared {
                component: F::COMPONENT_NAME,
            });
        }

        writer.write_bit(self.has_component);
        if self.has_component {
            self.fields.write(writer, force);
        }

        self.fields.commit();
        self.had_component_previously = self.has_component;
        self.prepared = false;
        Ok(())
    }

    fn set_data(
        &mut self,
        reader: &mut BitReader<'_>,
        received_host_tick: i32,
    ) -> Result<(), SyncError> {
        let has_component = reader.read_bit()?;
        let delta = if has_component {
            Some(F::read(reader)?)
        } else {
            None
        };
        self.history.push_back(HistoryEntry {
            tick: received_host_tick,
            has_component,
            delta,
        });
        Ok(())
    }

    fn interpolate(
        &mut self,
        world: &mut World,
        entity: EntityId,
        clock: &Clock,
        received_host_tick: i32,
    ) -> usize {
        let tick = clock.signal_counter();
        let mut applied = 0;

        while self.history.front().is_some_and(|entry| entry.tick == tick) {
            let Some(entry) = self.history.pop_front() else {
                break;
            };
            match Self::apply_entry(world, entity, &entry) {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!(
                    entity = %entity,
                    tick,
                    component = F::COMPONENT_NAME,
                    error = %e,
                    "dropping cache entry for unavailable entity"
                ),
            }
        }

        if let Some(front) = self.history.front() {
            if front.tick.wrapping_sub(tick) < 0 {
                tracing::debug!(
                    entity = %entity,
                    tick,
                    entry_tick = front.tick,
                    received_host_tick,
                    component = F::COMPONENT_NAME,
                    "cache entry behind the local clock is blocking its queue"
                );
            }
        }

        applied
    }

    fn pending_entries(&self) -> usize {
        self.history.len()
    }
}
