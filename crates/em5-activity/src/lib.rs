//! EM5 Activity -- scripted state machines for single entities.
//!
//! An [`Activity`](activity::Activity) is a set of named states, each an
//! ordered list of [`ActivityStep`](step::ActivityStep)s. An
//! [`ActivityPlayer`](player::ActivityPlayer) component walks one entity
//! through it: each tick the current step runs and answers whether to stay,
//! advance, jump to another state or stop.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use em5_activity::prelude::*;
//! use em5_ecs::prelude::*;
//!
//! let mut library = ActivityLibrary::new();
//! let handle = library.load_json(r#"{
//!     "name": "greet",
//!     "initial_state": "hello",
//!     "states": [
//!         { "name": "hello", "steps": [ { "type": "log", "message": "hi" },
//!                                       { "type": "stop" } ] }
//!     ]
//! }"#).unwrap();
//!
//! let mut world = World::new();
//! let entity = world.spawn();
//! let mut player = ActivityPlayer::new();
//! player.start(entity, &library, handle.id).unwrap();
//! world.insert_component(entity, player).unwrap();
//!
//! let mut clock = Clock::new();
//! clock.advance(Duration::from_millis(100));
//! let mut system = ActivitySystem::new();
//! system.update(&mut world, &library, &clock);
//! let report = system.update(&mut world, &library, &clock);
//! assert_eq!(report.finished, vec![entity]);
//! ```

#![deny(unsafe_code)]

pub mod activity;
pub mod library;
pub mod player;
pub mod step;
pub mod system;

use em5_ecs::entity::EntityId;

use crate::activity::ActivityId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while loading or playing activities.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("activity {id} is not loaded")]
    UnknownActivity { id: ActivityId },

    /// The activity was replaced after the player started it.
    #[error("activity '{activity}' was reloaded (player has version {expected}, library has {found})")]
    Reloaded {
        activity: String,
        expected: u32,
        found: u32,
    },

    /// A state switch named a state the activity does not have.
    #[error("activity '{activity}' has no playable state '{state}'")]
    UnknownState { activity: String, state: String },

    #[error("invalid activity '{activity}': {reason}")]
    InvalidAsset { activity: String, reason: String },

    /// The entity running the activity no longer exists.
    #[error("entity {entity} running the activity no longer exists")]
    StaleEntity { entity: EntityId },

    #[error("malformed activity asset: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::activity::{Activity, ActivityAsset, ActivityId, State, StateAsset, StateId};
    pub use crate::library::{ActivityHandle, ActivityLibrary};
    pub use crate::player::ActivityPlayer;
    pub use crate::step::{ActivityStep, StepParams, StepResult};
    pub use crate::system::{ActivityReport, ActivitySystem};
    pub use crate::ActivityError;
}
