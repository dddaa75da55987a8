//! Integration tests for the stuck resolving pass.

use std::collections::BTreeSet;
use std::time::Duration;

use em5_ai::prelude::*;
use em5_ecs::prelude::*;
use proptest::prelude::*;

const STANDING: Duration = Duration::from_secs(30);
const DELAY: Duration = Duration::from_secs(5);

fn step(clock: &mut Clock, secs: u64) {
    clock.advance(Duration::from_secs(secs));
}

fn stage_of(world: &World, entity: EntityId) -> Option<Stage> {
    world
        .get_component::<StuckResolverComponent>(entity)
        .and_then(|r| r.current_stage)
}

#[test]
fn stuck_entity_escalates_one_stage_per_delay() {
    let mut world = World::new();
    let car = world.spawn_with(StuckResolverComponent::new(DELAY));
    let obstacle = world.spawn();
    let mut navigation = StaticNavigation::new();
    navigation.block(car, obstacle, BlockerKind::Vehicle, STANDING);
    let mut system = StuckResolvingSystem::default();
    let mut clock = Clock::new();

    let report = system.update(&mut world, &mut navigation, &clock);
    assert_eq!(report.escalations, vec![(car, Stage::WaitForEvade)]);
    assert_eq!(navigation.evade_requests(), &[(obstacle, car)]);

    // Inside the delay nothing happens.
    step(&mut clock, 2);
    let report = system.update(&mut world, &mut navigation, &clock);
    assert!(report.escalations.is_empty());
    assert_eq!(stage_of(&world, car), Some(Stage::WaitForEvade));

    step(&mut clock, 3);
    let report = system.update(&mut world, &mut navigation, &clock);
    assert_eq!(report.escalations, vec![(car, Stage::BlockLaneAndReplan)]);
    assert_eq!(navigation.replans(), &[car]);

    step(&mut clock, 5);
    let report = system.update(&mut world, &mut navigation, &clock);
    assert_eq!(report.escalations, vec![(car, Stage::Fail)]);
    // Not deletable: it stays, failed.
    assert!(world.is_alive(car));

    step(&mut clock, 60);
    let report = system.update(&mut world, &mut navigation, &clock);
    assert!(report.escalations.is_empty());
    let resolver = world.get_component::<StuckResolverComponent>(car).unwrap();
    assert_eq!(resolver.current_stage, Some(Stage::Fail));
    assert_eq!(resolver.stage_started_at, Some(Duration::from_secs(10)));
}

#[test]
fn failed_civilian_out_of_sight_is_deleted() {
    let config = StuckResolvingConfig::default();
    let mut world = World::new();
    let car = world.spawn_with(StuckResolverComponent::for_unit(UnitTag::CivilCar, &config));
    let seen = world.spawn_with(StuckResolverComponent {
        visible_by_camera: true,
        ..StuckResolverComponent::for_unit(UnitTag::CivilCar, &config)
    });
    let mut navigation = StaticNavigation::new();
    let wall = world.spawn();
    navigation.block(car, wall, BlockerKind::Obstacle, STANDING);
    navigation.block(seen, wall, BlockerKind::Obstacle, STANDING);

    let mut system = StuckResolvingSystem::new(config);
    let mut clock = Clock::new();
    let mut despawned = Vec::new();
    for _ in 0..4 {
        despawned.extend(system.update(&mut world, &mut navigation, &clock).despawned);
        step(&mut clock, 5);
    }

    assert_eq!(despawned, vec![car]);
    assert!(!world.is_alive(car));
    assert!(world.is_alive(seen));
    assert_eq!(stage_of(&world, seen), Some(Stage::Fail));

    // Once off camera the failed unit goes too, without restarting Fail.
    world
        .get_component_mut::<StuckResolverComponent>(seen)
        .unwrap()
        .visible_by_camera = false;
    let report = system.update(&mut world, &mut navigation, &clock);
    assert_eq!(report.despawned, vec![seen]);
    assert!(report.escalations.is_empty());
}

#[test]
fn moving_again_clears_the_stage() {
    let mut world = World::new();
    let car = world.spawn_with(StuckResolverComponent::new(DELAY));
    let truck = world.spawn();
    let mut navigation = StaticNavigation::new();
    navigation.block(car, truck, BlockerKind::Vehicle, STANDING);
    let mut system = StuckResolvingSystem::default();
    let mut clock = Clock::new();

    system.update(&mut world, &mut navigation, &clock);
    assert_eq!(stage_of(&world, car), Some(Stage::WaitForEvade));

    navigation.set_state(
        car,
        NavigationState {
            path: PathStatus::Following,
            moving: true,
            ..NavigationState::default()
        },
    );
    step(&mut clock, 1);
    let report = system.update(&mut world, &mut navigation, &clock);
    assert_eq!(report.cleared, 1);
    assert_eq!(stage_of(&world, car), None);
}

#[test]
fn traffic_light_only_stops_emergency_units() {
    let config = StuckResolvingConfig::default();
    let mut world = World::new();
    let civilian = world.spawn_with(StuckResolverComponent::for_unit(UnitTag::CivilCar, &config));
    let ambulance =
        world.spawn_with(StuckResolverComponent::for_unit(UnitTag::Ambulance, &config));
    let waiting = NavigationState {
        path: PathStatus::Following,
        waiting_for: Some(WaitReason::TrafficLight),
        standing_for: STANDING,
        ..NavigationState::default()
    };
    let mut navigation = StaticNavigation::new();
    navigation.set_state(civilian, waiting.clone());
    navigation.set_state(ambulance, waiting);

    let mut system = StuckResolvingSystem::new(config);
    let report = system.update(&mut world, &mut navigation, &Clock::new());
    assert_eq!(report.stuck, 1);
    assert_eq!(report.escalations, vec![(ambulance, Stage::WaitForEvade)]);
    assert_eq!(stage_of(&world, civilian), None);
}

#[test]
fn one_failing_entity_does_not_stop_the_pass() {
    let mut world = World::new();
    let refused = world.spawn_with(StuckResolverComponent::new(DELAY));
    let fine = world.spawn_with(StuckResolverComponent::new(DELAY));
    let blocker = world.spawn();
    let mut navigation = StaticNavigation::new();
    navigation.block(refused, blocker, BlockerKind::Person, STANDING);
    navigation.block(fine, blocker, BlockerKind::Person, STANDING);
    navigation.refuse_actions_for(blocker);

    let mut system = StuckResolvingSystem::default();
    let report = system.update(&mut world, &mut navigation, &Clock::new());
    // Both tried to ask the blocker and both were refused, independently.
    assert_eq!(report.faults, 2);
    assert_eq!(report.processed, 2);
    assert_eq!(stage_of(&world, refused), Some(Stage::WaitForEvade));
    assert_eq!(stage_of(&world, fine), Some(Stage::WaitForEvade));
}

#[test]
fn cycle_members_skip_independent_escalation() {
    let mut world = World::new();
    let a = world.spawn_with(StuckResolverComponent::new(DELAY));
    let b = world.spawn_with(StuckResolverComponent::new(DELAY));
    let c = world.spawn_with(StuckResolverComponent::new(DELAY));
    let mut navigation = StaticNavigation::new();
    navigation.block(a, b, BlockerKind::Vehicle, STANDING);
    navigation.block(b, c, BlockerKind::Vehicle, STANDING);
    navigation.block(c, a, BlockerKind::Vehicle, STANDING);

    let mut system = StuckResolvingSystem::default();
    let report = system.update(&mut world, &mut navigation, &Clock::new());
    assert_eq!(report.cycles, vec![vec![a, b, c]]);
    assert_eq!(report.escalations, vec![(a, Stage::WaitForEvade)]);
    assert_eq!(navigation.evade_requests(), &[(b, a)]);
    for entity in [a, b, c] {
        let resolver = world.get_component::<StuckResolverComponent>(entity).unwrap();
        assert_eq!(resolver.current_analysis, Analysis::CyclicStuck);
    }
    assert_eq!(stage_of(&world, b), None);
    assert_eq!(stage_of(&world, c), None);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn two_entity_cycle_is_found_from_either_side() {
    let mut world = World::new();
    let a = world.spawn_with(StuckResolverComponent::default());
    let b = world.spawn_with(StuckResolverComponent::default());
    let mut navigation = StaticNavigation::new();
    navigation.block(a, b, BlockerKind::Vehicle, STANDING);
    navigation.block(b, a, BlockerKind::Vehicle, STANDING);
    let system = StuckResolvingSystem::default();

    let mut from_a = BTreeSet::new();
    assert!(system.check_for_cyclic_stuck_situation(a, b, &navigation, &mut from_a));
    let mut from_b = BTreeSet::new();
    assert!(system.check_for_cyclic_stuck_situation(b, a, &navigation, &mut from_b));

    assert_eq!(from_a, BTreeSet::from([a, b]));
    assert_eq!(from_a, from_b);
}

proptest! {
    #[test]
    fn stage_never_decreases(
        steps in prop::collection::vec((any::<bool>(), 0u64..20), 1..40),
    ) {
        let mut resolver = StuckResolverComponent::new(DELAY);
        let mut now = Duration::ZERO;
        let mut last: Option<Stage> = None;
        let mut reached_fail = false;

        // `true` escalates; `false` tries to start the first stage again.
        for (escalate, dt) in steps {
            now += Duration::from_secs(dt);
            let stage = if escalate {
                StuckResolverComponent::increment_stage(resolver.current_stage)
            } else {
                Stage::WaitForEvade
            };
            resolver.start_stage(stage, now);

            prop_assert!(resolver.current_stage >= last);
            last = resolver.current_stage;
            if reached_fail {
                prop_assert_eq!(resolver.current_stage, Some(Stage::Fail));
            }
            reached_fail = resolver.has_failed();
        }
    }

    #[test]
    fn cycles_are_symmetric(len in 2usize..6, rotation in 0usize..6) {
        let mut world = World::new();
        let ring: Vec<EntityId> = (0..len)
            .map(|_| world.spawn_with(StuckResolverComponent::default()))
            .collect();
        let mut navigation = StaticNavigation::new();
        for i in 0..len {
            navigation.block(ring[i], ring[(i + 1) % len], BlockerKind::Vehicle, STANDING);
        }
        let system = StuckResolvingSystem::default();

        let start = rotation % len;
        let mut out = BTreeSet::new();
        prop_assert!(system.check_for_cyclic_stuck_situation(
            ring[start],
            ring[(start + 1) % len],
            &navigation,
            &mut out,
        ));
        prop_assert_eq!(out, ring.iter().copied().collect::<BTreeSet<_>>());
    }
}
