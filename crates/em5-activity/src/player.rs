//! Per-entity activity playback.

use em5_ecs::prelude::*;

use crate::activity::{Activity, ActivityId, StateId};
use crate::library::{ActivityHandle, ActivityLibrary};
use crate::step::{StepParams, StepResult};
use crate::ActivityError;

/// Plays one activity for one entity.
///
/// The player stores a handle and indices only. The current step is looked
/// up in the library every update, and a handle whose load version no longer
/// matches stops the player.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPlayer {
    handle: Option<ActivityHandle>,
    entity: Option<EntityId>,
    current_state: StateId,
    current_step_index: usize,
    current_step_elapsed: f32,
    first_update: bool,
    playing: bool,
}

impl Default for ActivityPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityPlayer {
    pub fn new() -> Self {
        Self {
            handle: None,
            entity: None,
            current_state: StateId(0),
            current_step_index: 0,
            current_step_elapsed: 0.0,
            first_update: true,
            playing: false,
        }
    }

    /// Start `activity_id` for `entity` at the first step of its initial
    /// state. A running activity is replaced.
    pub fn start(
        &mut self,
        entity: EntityId,
        library: &ActivityLibrary,
        activity_id: ActivityId,
    ) -> Result<(), ActivityError> {
        self.stop();
        let handle = library
            .handle(activity_id)
            .ok_or(ActivityError::UnknownActivity { id: activity_id })?;
        let activity = library.resolve(handle)?;

        if !self.switch_to_state(activity, activity.initial_state()) {
            return Err(ActivityError::UnknownState {
                activity: activity.name().to_owned(),
                state: activity.initial_state().to_string(),
            });
        }
        self.handle = Some(handle);
        self.entity = Some(entity);
        self.playing = true;
        tracing::debug!(entity = %entity, activity = activity.name(), "activity started");
        Ok(())
    }

    /// Stop playing and forget the activity.
    pub fn stop(&mut self) {
        *self = Self::new();
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn handle(&self) -> Option<ActivityHandle> {
        self.handle
    }

    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    pub fn current_state(&self) -> StateId {
        self.current_state
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    /// Seconds spent in the current step.
    pub fn current_step_elapsed(&self) -> f32 {
        self.current_step_elapsed
    }

    /// Whether the next execution is the first one of the current step.
    pub fn first_update(&self) -> bool {
        self.first_update
    }

    /// Enter the first step of `state`. Returns `false` and changes nothing
    /// if `activity` has no such state or the state has no steps.
    pub fn switch_to_state(&mut self, activity: &Activity, state: StateId) -> bool {
        match activity.state(state) {
            Some(found) if !found.steps.is_empty() => {
                self.current_state = state;
                self.enter_step(0);
                true
            }
            _ => false,
        }
    }

    /// Enter step `index` of the current state. Returns `false` and changes
    /// nothing when out of range.
    pub fn switch_to_step(&mut self, activity: &Activity, index: usize) -> bool {
        if activity.step(self.current_state, index).is_none() {
            return false;
        }
        self.enter_step(index);
        true
    }

    fn enter_step(&mut self, index: usize) {
        self.current_step_index = index;
        self.current_step_elapsed = 0.0;
        self.first_update = true;
    }

    /// Execute the current step once and react to its result.
    ///
    /// A dead entity, a replaced activity or a switch to a state the
    /// activity does not have stops the player and is reported as an error.
    /// Running past the last step of a state stops it normally.
    pub fn update(
        &mut self,
        world: &mut World,
        library: &ActivityLibrary,
        clock: &Clock,
    ) -> Result<Option<StepResult>, ActivityError> {
        if !self.playing {
            return Ok(None);
        }
        let (Some(entity), Some(handle)) = (self.entity, self.handle) else {
            self.stop();
            return Ok(None);
        };
        if !world.is_alive(entity) {
            self.stop();
            return Err(ActivityError::StaleEntity { entity });
        }
        let activity = match library.resolve(handle) {
            Ok(activity) => activity,
            Err(e) => {
                self.stop();
                return Err(e);
            }
        };
        let Some(step) = activity.step(self.current_state, self.current_step_index) else {
            let state = self.current_state.to_string();
            self.stop();
            return Err(ActivityError::UnknownState {
                activity: activity.name().to_owned(),
                state,
            });
        };

        let params = StepParams {
            entity,
            first_update: self.first_update,
            total_time: self.current_step_elapsed,
            time_passed: clock.seconds_passed(),
        };
        let result = step.execute(&params, world);

        match &result {
            StepResult::Continue => {
                self.current_step_elapsed += params.time_passed;
                self.first_update = false;
            }
            StepResult::NextStep => {
                if !self.switch_to_step(activity, self.current_step_index + 1) {
                    tracing::debug!(entity = %entity, activity = activity.name(), "activity finished");
                    self.stop();
                }
            }
            StepResult::SwitchState(name) => {
                if !self.switch_to_state(activity, StateId::from_name(name)) {
                    let activity = activity.name().to_owned();
                    self.stop();
                    return Err(ActivityError::UnknownState {
                        activity,
                        state: name.clone(),
                    });
                }
            }
            StepResult::Stop => self.stop(),
        }
        Ok(Some(result))
    }
}
