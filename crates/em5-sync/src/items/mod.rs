//! Concrete cache items and the components they replicate.

pub mod game_logic;
pub mod ghost;
pub mod health;

pub use game_logic::{
    GameLogicComponent, GameLogicData, GameLogicDelta, GameLogicFields, GameLogicFlag,
    GangsterInBuildingFlag,
};
pub use ghost::{GhostComponent, GhostData, GhostDelta, GhostFields};
pub use health::{HealthComponent, HealthData, HealthDelta, HealthFields};
