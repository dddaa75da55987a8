//! Ghost visual state replication.
//!
//! A ghost is the translucent stand-in the renderer draws for units hidden
//! behind buildings or placed but not yet committed. Only the toggle and the
//! opacity cross the wire.

use crate::bit_stream::{BitReader, BitWriter};
use crate::change::ChangeDetector;
use crate::existence::{ComponentExistenceTracking, ComponentFields};
use crate::SyncError;

#[derive(Debug, Clone, PartialEq)]
pub struct GhostComponent {
    pub visible: bool,
    pub opacity: f32,
}

impl Default for GhostComponent {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 0.5,
        }
    }
}

/// Wire order: `visible`, `opacity`.
#[derive(Debug, Default)]
pub struct GhostFields {
    visible: ChangeDetector<bool>,
    opacity: ChangeDetector<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GhostDelta {
    pub visible: Option<bool>,
    pub opacity: Option<f32>,
}

pub type GhostData = ComponentExistenceTracking<GhostFields>;

impl ComponentFields for GhostFields {
    type Component = GhostComponent;
    type Delta = GhostDelta;

    const COMPONENT_NAME: &'static str = "ghost";

    fn observe(&mut self, component: &GhostComponent) -> bool {
        let visible = self.visible.observe(component.visible);
        let opacity = self.opacity.observe(component.opacity);
        visible || opacity
    }

    fn write(&self, writer: &mut BitWriter, force: bool) {
        self.visible.write(writer, force);
        self.opacity.write(writer, force);
    }

    fn commit(&mut self) {
        self.visible.commit();
        self.opacity.commit();
    }

    fn changed_fields(&self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.visible.is_changed() {
            changed.push("visible");
        }
        if self.opacity.is_changed() {
            changed.push("opacity");
        }
        changed
    }

    fn read(reader: &mut BitReader<'_>) -> Result<GhostDelta, SyncError> {
        Ok(GhostDelta {
            visible: ChangeDetector::read(reader)?,
            opacity: ChangeDetector::read(reader)?,
        })
    }

    fn apply(delta: &GhostDelta, component: &mut GhostComponent) {
        if let Some(visible) = delta.visible {
            component.visible = visible;
        }
        if let Some(opacity) = delta.opacity {
            component.opacity = opacity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::DataCacheItem;
    use em5_ecs::prelude::*;

    #[test]
    fn reappearing_component_diffs_against_default() {
        let mut world = World::new();
        let entity = world.spawn_with(GhostComponent {
            visible: false,
            opacity: 0.9,
        });
        let clock = Clock::new();
        let mut item = GhostData::new();

        item.prepare_for_update(&world, entity, &clock);
        item.update_data(&mut BitWriter::new(), false).unwrap();

        world.remove_component::<GhostComponent>(entity).unwrap();
        item.prepare_for_update(&world, entity, &clock);
        item.update_data(&mut BitWriter::new(), false).unwrap();

        // Comes back with only the opacity differing from a fresh component.
        world
            .insert_component(
                entity,
                GhostComponent {
                    visible: true,
                    opacity: 0.9,
                },
            )
            .unwrap();
        assert!(item.prepare_for_update(&world, entity, &clock));
        assert_eq!(item.fields().changed_fields(), vec!["opacity"]);
    }

    #[test]
    fn receiver_creates_missing_component_before_applying() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_bit(false);
        writer.write_bit(true);
        writer.write(&0.25f32);
        let bytes = writer.to_bytes();

        let mut item = GhostData::new();
        item.set_data(&mut BitReader::new(&bytes), 3).unwrap();
        assert_eq!(item.pending_entries(), 1);

        let mut world = World::new();
        let proxy = world.spawn();
        let clock = Clock::starting_at(3);
        assert_eq!(item.interpolate(&mut world, proxy, &clock, 3), 1);
        assert_eq!(
            world.get_component::<GhostComponent>(proxy),
            Some(&GhostComponent {
                visible: true,
                opacity: 0.25,
            })
        );
    }

    #[test]
    fn stale_receiver_entity_drops_the_entry() {
        let mut writer = BitWriter::new();
        writer.write_bit(false);
        let bytes = writer.to_bytes();
        let mut item = GhostData::new();
        item.set_data(&mut BitReader::new(&bytes), 0).unwrap();

        let mut world = World::new();
        let proxy = world.spawn();
        world.despawn(proxy).unwrap();
        assert_eq!(item.interpolate(&mut world, proxy, &Clock::new(), 0), 0);
        assert_eq!(item.pending_entries(), 0);
    }

    #[test]
    fn update_without_prepare_is_rejected() {
        let mut item = GhostData::new();
        assert!(matches!(
            item.update_data(&mut BitWriter::new(), false),
            Err(SyncError::NotPrepared { component: "ghost" })
        ));
    }
}
