//! Updates every [`ActivityPlayer`] in a world once per tick.

use em5_ecs::prelude::*;

use crate::library::ActivityLibrary;
use crate::player::ActivityPlayer;

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityReport {
    /// Players that executed a step.
    pub updated: usize,
    /// Players that stopped this pass, normally or not.
    pub finished: Vec<EntityId>,
    /// Players stopped by an error.
    pub faults: usize,
}

#[derive(Debug, Default)]
pub struct ActivitySystem;

impl ActivitySystem {
    pub fn new() -> Self {
        Self
    }

    /// Run one step of every playing [`ActivityPlayer`], in ascending
    /// entity order.
    ///
    /// The player is taken out of the world while its step runs so the step
    /// may mutate the world, including despawning its own entity.
    pub fn update(
        &mut self,
        world: &mut World,
        library: &ActivityLibrary,
        clock: &Clock,
    ) -> ActivityReport {
        let mut report = ActivityReport::default();

        for entity in world.entities_with::<ActivityPlayer>() {
            let playing = world
                .get_component::<ActivityPlayer>(entity)
                .is_some_and(ActivityPlayer::is_playing);
            if !playing {
                continue;
            }
            let Ok(Some(mut player)) = world.remove_component::<ActivityPlayer>(entity) else {
                continue;
            };

            match player.update(world, library, clock) {
                Ok(Some(_)) => report.updated += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(entity = %entity, error = %e, "activity player stopped");
                    report.faults += 1;
                }
            }
            if !player.is_playing() {
                report.finished.push(entity);
            }

            if world.is_alive(entity) {
                if let Err(e) = world.insert_component(entity, player) {
                    tracing::warn!(entity = %entity, error = %e, "could not restore activity player");
                }
            }
        }

        report
    }
}
