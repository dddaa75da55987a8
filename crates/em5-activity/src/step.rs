//! Activity steps and what executing one yields.

use em5_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Input of one step execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub entity: EntityId,
    /// `true` on the first execution after entering the step.
    pub first_update: bool,
    /// Seconds spent in this step before this tick.
    pub total_time: f32,
    /// Length of this tick in seconds.
    pub time_passed: f32,
}

/// What the player does after a step ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Run the same step again next tick.
    Continue,
    NextStep,
    /// Jump to the first step of the named state.
    SwitchState(String),
    Stop,
}

/// One step of an activity state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityStep {
    /// Wait until the step has run for `seconds`.
    Wait { seconds: f32 },
    /// Emit a log line and move on.
    Log { message: String },
    SwitchState { state: String },
    Stop,
    /// Despawn the entity running the activity.
    Despawn,
}

impl ActivityStep {
    pub fn execute(&self, params: &StepParams, world: &mut World) -> StepResult {
        match self {
            ActivityStep::Wait { seconds } => {
                if params.total_time + params.time_passed >= *seconds {
                    StepResult::NextStep
                } else {
                    StepResult::Continue
                }
            }
            ActivityStep::Log { message } => {
                tracing::info!(entity = %params.entity, "{message}");
                StepResult::NextStep
            }
            ActivityStep::SwitchState { state } => StepResult::SwitchState(state.clone()),
            ActivityStep::Stop => StepResult::Stop,
            ActivityStep::Despawn => {
                if let Err(e) = world.despawn(params.entity) {
                    tracing::debug!(entity = %params.entity, error = %e, "despawn step on dead entity");
                }
                StepResult::Stop
            }
        }
    }

    /// Target state name of a [`ActivityStep::SwitchState`].
    pub fn switch_target(&self) -> Option<&str> {
        match self {
            ActivityStep::SwitchState { state } => Some(state),
            _ => None,
        }
    }
}
