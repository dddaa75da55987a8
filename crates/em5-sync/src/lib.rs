//! EM5 Sync -- delta-state replication of entity components.
//!
//! The sender keeps a snapshot of every replicated field and writes only what
//! changed since the last update, prefixed by one "changed" bit per field and
//! one existence bit per component. The receiver queues decoded deltas under
//! the host tick that produced them and applies them when its own clock gets
//! there.
//!
//! # Quick Start
//!
//! ```
//! use em5_ecs::prelude::*;
//! use em5_sync::prelude::*;
//!
//! let mut host = World::new();
//! let unit = host.spawn_with(HealthComponent { life_energy: 80.0, invincible: false });
//!
//! let mut sender = DataCache::new();
//! sender.track(unit);
//!
//! let clock = Clock::new();
//! let mut writer = BitWriter::new();
//! sender.write_update(&host, &clock, &mut writer, false).unwrap();
//! let packet = writer.to_bytes();
//!
//! let mut client = World::new();
//! let mut receiver = DataCache::new();
//! receiver.read_update(&mut BitReader::new(&packet), clock.signal_counter()).unwrap();
//! receiver.interpolate(&mut client, &clock);
//!
//! let proxy = receiver.local_entity(unit.tracked_ref()).unwrap();
//! assert_eq!(client.get_component::<HealthComponent>(proxy).unwrap().life_energy, 80.0);
//! ```

#![deny(unsafe_code)]

pub mod bit_stream;
pub mod cache;
pub mod change;
pub mod existence;
pub mod flags;
pub mod item;
pub mod items;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while encoding or decoding cache updates.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The reader ran past the end of the stream.
    #[error("bit stream exhausted at bit {position} of {length}")]
    StreamExhausted { position: usize, length: usize },

    /// `update_data` was called without a preceding `prepare_for_update`.
    #[error("cache item '{component}' written without prepare_for_update")]
    NotPrepared { component: &'static str },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bit_stream::{BitReader, BitSerde, BitWriter};
    pub use crate::cache::{CacheItem, CacheItemKind, DataCache, InterpolationReport, StagedUpdate};
    pub use crate::change::ChangeDetector;
    pub use crate::existence::{ComponentExistenceTracking, ComponentFields};
    pub use crate::flags::{Flag, FlagSet};
    pub use crate::item::{DataCacheItem, HistoryEntry};
    pub use crate::items::{
        GameLogicComponent, GameLogicData, GameLogicFlag, GangsterInBuildingFlag, GhostComponent,
        GhostData, HealthComponent, HealthData,
    };
    pub use crate::SyncError;
}
