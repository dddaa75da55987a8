//! EM5 Engine -- the simulation driver tying the EM5 crates together.
//!
//! This crate owns the per-tick job order (user systems, stuck resolving,
//! activities), the engine configuration, tracing setup and the host/client
//! replication sessions built on [`em5_sync`].
//!
//! # Quick Start
//!
//! ```
//! use em5_engine::prelude::*;
//!
//! let config = EngineConfig::from_json_str(r#"{ "tick": { "fixed_dt": 0.1 } }"#).unwrap();
//! let mut sim = Simulation::new(World::new(), StaticNavigation::new(), &config);
//!
//! let handle = sim.library_mut().load_json(r#"{
//!     "name": "pause",
//!     "initial_state": "idle",
//!     "states": [ { "name": "idle", "steps": [ { "type": "wait", "seconds": 0.25 } ] } ]
//! }"#).unwrap();
//!
//! let unit = sim.world_mut().spawn();
//! let mut player = ActivityPlayer::new();
//! player.start(unit, sim.library(), handle.id).unwrap();
//! sim.world_mut().insert_component(unit, player).unwrap();
//!
//! let report = sim.run_ticks(3).unwrap();
//! assert_eq!(report.activity.finished, vec![unit]);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod logging;
pub mod multiplayer;
pub mod tick;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use em5_activity;
pub use em5_ai;
pub use em5_ecs;
pub use em5_sync;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use em5_activity::prelude::*;
    pub use em5_ai::prelude::*;
    pub use em5_ecs::prelude::*;
    pub use em5_sync::prelude::*;

    pub use crate::config::{EngineConfig, DEFAULT_LOG_FILTER};
    pub use crate::logging::init_tracing;
    pub use crate::multiplayer::{ClientSession, HostSession, ReceivedPacket};
    pub use crate::tick::{
        Simulation, SystemFn, TickConfig, TickDiagnostics, TickReport, ACTIVITY_JOB,
        STUCK_RESOLVING_JOB,
    };
}
