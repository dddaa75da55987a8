//! EM5 AI -- detection and resolution of stuck units.
//!
//! Every entity carrying a [`StuckResolverComponent`](component::StuckResolverComponent)
//! is classified each tick from what the navigation layer reports. A stuck
//! entity escalates through [`Stage`](analysis::Stage)s, one per stage switch
//! delay: first it asks its blocker to evade, then it blocks its lane and
//! replans, and finally it fails (and ambient traffic out of sight is
//! deleted). Rings of vehicles waiting on each other are resolved as one
//! event so only one of them acts.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use em5_ai::prelude::*;
//! use em5_ecs::prelude::*;
//!
//! let mut world = World::new();
//! let a = world.spawn_with(StuckResolverComponent::default());
//! let b = world.spawn_with(StuckResolverComponent::default());
//!
//! // a and b wait behind each other.
//! let mut navigation = StaticNavigation::new();
//! navigation.block(a, b, BlockerKind::Vehicle, Duration::from_secs(30));
//! navigation.block(b, a, BlockerKind::Vehicle, Duration::from_secs(30));
//!
//! let mut system = StuckResolvingSystem::default();
//! let report = system.update(&mut world, &mut navigation, &Clock::new());
//! assert_eq!(report.cycles, vec![vec![a, b]]);
//! assert_eq!(report.escalations, vec![(a, Stage::WaitForEvade)]);
//! ```

#![deny(unsafe_code)]

pub mod analysis;
pub mod component;
pub mod navigation;
pub mod system;
pub mod unit_tag;

use em5_ecs::entity::EntityId;
use em5_ecs::EcsError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors reported by a [`Navigation`](navigation::Navigation) implementation.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// The entity has no navigation (not a moving unit, or not registered).
    #[error("entity {entity} has no navigation")]
    NoNavigation { entity: EntityId },

    /// A corrective action could not be carried out.
    #[error("navigation action for entity {entity} rejected: {reason}")]
    ActionRejected { entity: EntityId, reason: String },
}

/// Failure while resolving one entity. Never escapes a pass.
#[derive(Debug, thiserror::Error)]
pub enum StuckResolvingError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    World(#[from] EcsError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::analysis::{classify, is_stuck, Analysis, Stage};
    pub use crate::component::StuckResolverComponent;
    pub use crate::navigation::{
        Blocker, BlockerKind, Navigation, NavigationState, PathStatus, StaticNavigation,
        WaitReason,
    };
    pub use crate::system::{StuckResolvingConfig, StuckResolvingReport, StuckResolvingSystem};
    pub use crate::unit_tag::UnitTag;
    pub use crate::{NavigationError, StuckResolvingError};
}
