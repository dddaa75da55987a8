//! End-to-end replication through [`DataCache`] on both sides.

use em5_ecs::prelude::*;
use em5_sync::prelude::*;
use std::time::Duration;

const DT: Duration = Duration::from_millis(100);

struct Link {
    host: World,
    client: World,
    sender: DataCache,
    receiver: DataCache,
    clock: Clock,
}

impl Link {
    fn new() -> Self {
        Self {
            host: World::new(),
            client: World::new(),
            sender: DataCache::new(),
            receiver: DataCache::new(),
            clock: Clock::new(),
        }
    }

    /// One tick: encode, decode under the same tick, interpolate.
    fn tick(&mut self) -> InterpolationReport {
        let mut writer = BitWriter::new();
        self.sender
            .write_update(&self.host, &self.clock, &mut writer, false)
            .unwrap();
        let bytes = writer.to_bytes();
        self.receiver
            .read_update(&mut BitReader::new(&bytes), self.clock.signal_counter())
            .unwrap();
        let report = self.receiver.interpolate(&mut self.client, &self.clock);
        self.clock.advance(DT);
        report
    }

    fn proxy(&self, entity: EntityId) -> EntityId {
        self.receiver.local_entity(entity.tracked_ref()).unwrap()
    }
}

#[test]
fn health_change_reaches_the_client_and_leaves_other_fields() {
    let mut link = Link::new();
    let unit = link.host.spawn_with(HealthComponent {
        life_energy: 10.0,
        invincible: false,
    });
    link.sender.track(unit);
    link.tick();
    let proxy = link.proxy(unit);

    // Flip the client-side flag locally; an update touching only life
    // energy must not overwrite it.
    link.client
        .get_component_mut::<HealthComponent>(proxy)
        .unwrap()
        .invincible = true;

    link.host
        .get_component_mut::<HealthComponent>(unit)
        .unwrap()
        .life_energy = 12.0;
    let report = link.tick();
    assert_eq!(report.applied, 1);

    let mirrored = link.client.get_component::<HealthComponent>(proxy).unwrap();
    assert_eq!(mirrored.life_energy, 12.0);
    assert!(mirrored.invincible);
}

#[test]
fn flag_sets_keep_their_bit_positions() {
    let mut link = Link::new();
    let unit = link.host.spawn_with(GameLogicComponent::default());
    link.sender.track(unit);
    link.tick();

    {
        let logic = link
            .host
            .get_component_mut::<GameLogicComponent>(unit)
            .unwrap();
        logic.flags.set(GameLogicFlag::Injured, true);
        logic.gangster_flags.set(GangsterInBuildingFlag::Armed, true);
        logic.gangster_flags.invert(GangsterInBuildingFlag::HasHostages);
    }
    link.tick();

    let proxy = link.proxy(unit);
    let logic = link.client.get_component::<GameLogicComponent>(proxy).unwrap();
    assert_eq!(logic.flags.bits(), 1 << 2);
    assert_eq!(logic.gangster_flags.bits(), (1 << 1) | (1 << 2));
    assert!(logic.gangster_flags.is_set(GangsterInBuildingFlag::HasHostages));
}

#[test]
fn quiet_ticks_apply_nothing() {
    let mut link = Link::new();
    let unit = link.host.spawn_with(HealthComponent::default());
    link.sender.track(unit);
    assert_eq!(link.tick().applied, 1);

    for _ in 0..5 {
        let report = link.tick();
        assert_eq!(report, InterpolationReport::default());
    }
    assert_eq!(link.receiver.pending_entries(), 0);
}

#[test]
fn many_entities_replicate_independently() {
    let mut link = Link::new();
    let units: Vec<EntityId> = (0..16)
        .map(|i| {
            link.host.spawn_with(HealthComponent {
                life_energy: i as f32,
                invincible: i % 2 == 0,
            })
        })
        .collect();
    for unit in &units {
        link.sender.track(*unit);
    }
    let report = link.tick();
    assert_eq!(report.spawned.len(), units.len());

    link.host.despawn(units[3]).unwrap();
    link.host
        .insert_component(units[7], GhostComponent::default())
        .unwrap();
    let report = link.tick();
    assert_eq!(report.removed.len(), 1);
    assert_eq!(link.receiver.len(), units.len() - 1);

    for (i, unit) in units.iter().enumerate() {
        if i == 3 {
            assert!(!link.receiver.is_tracked(unit.tracked_ref()));
            continue;
        }
        let proxy = link.proxy(*unit);
        let health = link.client.get_component::<HealthComponent>(proxy).unwrap();
        assert_eq!(health.life_energy, i as f32);
        assert_eq!(link.client.has_component::<GhostComponent>(proxy), i == 7);
    }
}

#[test]
fn late_joiner_catches_up_with_a_forced_update() {
    let mut host = World::new();
    let unit = host.spawn_with(HealthComponent {
        life_energy: 33.0,
        invincible: true,
    });
    let mut sender = DataCache::new();
    sender.track(unit);
    let clock = Clock::new();

    // The first client already received the initial state.
    let mut writer = BitWriter::new();
    sender.write_update(&host, &clock, &mut writer, false).unwrap();

    let mut writer = BitWriter::new();
    assert_eq!(sender.write_update(&host, &clock, &mut writer, false).unwrap(), 0);

    let mut writer = BitWriter::new();
    assert_eq!(sender.write_update(&host, &clock, &mut writer, true).unwrap(), 1);
    let bytes = writer.to_bytes();

    let mut client = World::new();
    let mut receiver = DataCache::new();
    receiver
        .read_update(&mut BitReader::new(&bytes), clock.signal_counter())
        .unwrap();
    receiver.interpolate(&mut client, &clock);
    let proxy = receiver.local_entity(unit.tracked_ref()).unwrap();
    assert_eq!(
        client.get_component::<HealthComponent>(proxy),
        Some(&HealthComponent {
            life_energy: 33.0,
            invincible: true,
        })
    );
}
