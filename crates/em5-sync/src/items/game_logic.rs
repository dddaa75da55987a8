//! Game logic status replication.
//!
//! Status effects and the gangster-in-building state are replicated as two
//! typed bit sets. Bit positions are fixed per variant and must not be
//! renumbered without a protocol version bump.

use crate::bit_stream::{BitReader, BitWriter};
use crate::change::ChangeDetector;
use crate::existence::{ComponentExistenceTracking, ComponentFields};
use crate::flags::{Flag, FlagSet};
use crate::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameLogicFlag {
    Burning,
    Contaminated,
    Injured,
    Buried,
    Arrested,
    Hostage,
}

impl Flag for GameLogicFlag {
    const ALL: &'static [Self] = &[
        GameLogicFlag::Burning,
        GameLogicFlag::Contaminated,
        GameLogicFlag::Injured,
        GameLogicFlag::Buried,
        GameLogicFlag::Arrested,
        GameLogicFlag::Hostage,
    ];

    fn bit(self) -> u32 {
        match self {
            GameLogicFlag::Burning => 0,
            GameLogicFlag::Contaminated => 1,
            GameLogicFlag::Injured => 2,
            GameLogicFlag::Buried => 3,
            GameLogicFlag::Arrested => 4,
            GameLogicFlag::Hostage => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GangsterInBuildingFlag {
    InBuilding,
    Armed,
    HasHostages,
    Surrendering,
}

impl Flag for GangsterInBuildingFlag {
    const ALL: &'static [Self] = &[
        GangsterInBuildingFlag::InBuilding,
        GangsterInBuildingFlag::Armed,
        GangsterInBuildingFlag::HasHostages,
        GangsterInBuildingFlag::Surrendering,
    ];

    fn bit(self) -> u32 {
        match self {
            GangsterInBuildingFlag::InBuilding => 0,
            GangsterInBuildingFlag::Armed => 1,
            GangsterInBuildingFlag::HasHostages => 2,
            GangsterInBuildingFlag::Surrendering => 3,
        }
    }
}

/// Game logic attached to an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameLogicComponent {
    pub flags: FlagSet<GameLogicFlag>,
    pub gangster_flags: FlagSet<GangsterInBuildingFlag>,
}

/// Wire order: `flags`, `gangster_flags`.
#[derive(Debug, Default)]
pub struct GameLogicFields {
    flags: ChangeDetector<FlagSet<GameLogicFlag>>,
    gangster_flags: ChangeDetector<FlagSet<GangsterInBuildingFlag>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameLogicDelta {
    pub flags: Option<FlagSet<GameLogicFlag>>,
    pub gangster_flags: Option<FlagSet<GangsterInBuildingFlag>>,
}

pub type GameLogicData = ComponentExistenceTracking<GameLogicFields>;

impl ComponentFields for GameLogicFields {
    type Component = GameLogicComponent;
    type Delta = GameLogicDelta;

    const COMPONENT_NAME: &'static str = "game_logic";

    fn observe(&mut self, component: &GameLogicComponent) -> bool {
        let flags = self.flags.observe(component.flags);
        let gangster_flags = self.gangster_flags.observe(component.gangster_flags);
        flags || gangster_flags
    }

    fn write(&self, writer: &mut BitWriter, force: bool) {
        self.flags.write(writer, force);
        self.gangster_flags.write(writer, force);
    }

    fn commit(&mut self) {
        self.flags.commit();
        self.gangster_flags.commit();
    }

    fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("flags", self.flags.is_changed()),
            ("gangster_flags", self.gangster_flags.is_changed()),
        ]
        .into_iter()
        .filter_map(|(name, changed)| changed.then_some(name))
        .collect()
    }

    fn read(reader: &mut BitReader<'_>) -> Result<GameLogicDelta, SyncError> {
        Ok(GameLogicDelta {
            flags: ChangeDetector::read(reader)?,
            gangster_flags: ChangeDetector::read(reader)?,
        })
    }

    fn apply(delta: &GameLogicDelta, component: &mut GameLogicComponent) {
        if let Some(flags) = delta.flags {
            component.flags = flags;
        }
        if let Some(gangster_flags) = delta.gangster_flags {
            component.gangster_flags = gangster_flags;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::DataCacheItem;
    use em5_ecs::prelude::*;

    #[test]
    fn flag_positions_are_fixed() {
        let flags = FlagSet::empty()
            .with(GameLogicFlag::Burning)
            .with(GameLogicFlag::Hostage);
        assert_eq!(flags.bits(), 0b10_0001);

        let gangster = FlagSet::empty().with(GangsterInBuildingFlag::Surrendering);
        assert_eq!(gangster.bits(), 0b1000);
    }

    #[test]
    fn flag_change_is_sent_and_applied() {
        let mut sender = World::new();
        let entity = sender.spawn_with(GameLogicComponent::default());
        let mut receiver = World::new();
        let proxy = receiver.spawn();
        let clock = Clock::new();

        let mut outgoing = GameLogicData::new();
        let mut incoming = GameLogicData::new();

        sender
            .get_component_mut::<GameLogicComponent>(entity)
            .unwrap()
            .gangster_flags
            .set(GangsterInBuildingFlag::Armed, true);
        assert!(outgoing.prepare_for_update(&sender, entity, &clock));
        assert_eq!(outgoing.fields().changed_fields(), vec!["gangster_flags"]);

        let mut writer = BitWriter::new();
        outgoing.update_data(&mut writer, false).unwrap();
        let bytes = writer.to_bytes();
        incoming
            .set_data(&mut BitReader::new(&bytes), clock.signal_counter())
            .unwrap();
        assert_eq!(incoming.interpolate(&mut receiver, proxy, &clock, 0), 1);

        let replica = receiver.get_component::<GameLogicComponent>(proxy).unwrap();
        assert!(replica.gangster_flags.is_set(GangsterInBuildingFlag::Armed));
        assert!(replica.flags.is_empty());
    }
}
