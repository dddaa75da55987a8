//! EM5 ECS -- the host object model for the simulation crates.
//!
//! Provides generational entity handles, typed component storage and the
//! simulation [`Clock`](clock::Clock). The synchronization, AI and activity
//! crates only ever reach entities through this API, which gives every
//! dereference an explicit liveness check.
//!
//! # Quick Start
//!
//! ```
//! use em5_ecs::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Health(f32);
//!
//! let mut world = World::new();
//! let entity = world.spawn_with(Health(100.0));
//! assert_eq!(world.get_component::<Health>(entity), Some(&Health(100.0)));
//!
//! world.despawn(entity).unwrap();
//! assert!(world.get_component::<Health>(entity).is_none());
//! ```

#![deny(unsafe_code)]

pub mod clock;
pub mod component;
pub mod entity;
pub mod hash;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::clock::Clock;
    pub use crate::component::Component;
    pub use crate::entity::EntityId;
    pub use crate::hash::StringHash;
    pub use crate::world::World;
    pub use crate::EcsError;
}
