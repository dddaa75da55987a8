//! Integration tests for activity playback.

use std::time::Duration;

use em5_activity::prelude::*;
use em5_ecs::prelude::*;
use proptest::prelude::*;

fn tick() -> Clock {
    let mut clock = Clock::new();
    clock.advance(Duration::from_millis(100));
    clock
}

fn library_from(json: &str) -> (ActivityLibrary, ActivityHandle) {
    let mut library = ActivityLibrary::new();
    let handle = library.load_json(json).unwrap();
    (library, handle)
}

const TWO_STEPS: &str = r#"{
    "name": "two_steps",
    "initial_state": "s0",
    "states": [
        { "name": "s0", "steps": [ { "type": "log", "message": "first" }, { "type": "stop" } ] }
    ]
}"#;

#[test]
fn next_step_then_stop() {
    let (library, handle) = library_from(TWO_STEPS);
    let mut world = World::new();
    let entity = world.spawn();
    let clock = tick();
    let mut player = ActivityPlayer::new();
    player.start(entity, &library, handle.id).unwrap();

    let result = player.update(&mut world, &library, &clock).unwrap();
    assert_eq!(result, Some(StepResult::NextStep));
    assert!(player.is_playing());
    assert_eq!(player.current_step_index(), 1);
    // The second step sees its own first update.
    assert!(player.first_update());

    let result = player.update(&mut world, &library, &clock).unwrap();
    assert_eq!(result, Some(StepResult::Stop));
    assert!(!player.is_playing());
}

#[test]
fn switch_to_unplayable_state_stops_without_panicking() {
    // "empty" exists but has no steps, so the switch cannot land anywhere.
    let (library, handle) = library_from(
        r#"{
            "name": "dead_end",
            "initial_state": "start",
            "states": [
                { "name": "start", "steps": [ { "type": "switch_state", "state": "empty" } ] },
                { "name": "empty" }
            ]
        }"#,
    );
    let mut world = World::new();
    let entity = world.spawn();
    let mut player = ActivityPlayer::new();
    player.start(entity, &library, handle.id).unwrap();

    let err = player.update(&mut world, &library, &tick()).unwrap_err();
    assert!(matches!(err, ActivityError::UnknownState { ref state, .. } if state == "empty"));
    assert!(!player.is_playing());
}

#[test]
fn state_switch_restarts_at_step_zero() {
    let (library, handle) = library_from(
        r#"{
            "name": "patrol",
            "initial_state": "walk",
            "states": [
                { "name": "walk", "steps": [ { "type": "log", "message": "walking" },
                                             { "type": "switch_state", "state": "rest" } ] },
                { "name": "rest", "steps": [ { "type": "wait", "seconds": 10.0 } ] }
            ]
        }"#,
    );
    let mut world = World::new();
    let entity = world.spawn();
    let clock = tick();
    let mut player = ActivityPlayer::new();
    player.start(entity, &library, handle.id).unwrap();

    player.update(&mut world, &library, &clock).unwrap();
    assert_eq!(
        player.update(&mut world, &library, &clock).unwrap(),
        Some(StepResult::SwitchState("rest".to_owned()))
    );
    assert_eq!(player.current_state(), StateId::from_name("rest"));
    assert_eq!(player.current_step_index(), 0);
    assert!(player.first_update());
}

#[test]
fn reload_between_ticks_stops_running_players() {
    let (mut library, handle) = library_from(TWO_STEPS);
    let mut world = World::new();
    let entity = world.spawn();
    let mut player = ActivityPlayer::new();
    player.start(entity, &library, handle.id).unwrap();

    library.load_json(TWO_STEPS).unwrap();
    assert!(matches!(
        player.update(&mut world, &library, &tick()),
        Err(ActivityError::Reloaded { .. })
    ));
    assert!(!player.is_playing());

    // Restarting picks up the new version.
    player.start(entity, &library, handle.id).unwrap();
    assert_eq!(player.handle().map(|h| h.load_version), Some(2));
}

#[test]
fn system_isolates_failing_players() {
    let (mut library, handle) = library_from(TWO_STEPS);
    let vanish = library
        .load_json(
            r#"{
                "name": "vanish",
                "initial_state": "go",
                "states": [ { "name": "go", "steps": [ { "type": "despawn" } ] } ]
            }"#,
        )
        .unwrap();

    let mut world = World::new();
    let spawn_playing = |world: &mut World, id: ActivityId| {
        let entity = world.spawn();
        let mut player = ActivityPlayer::new();
        player.start(entity, &library, id).unwrap();
        world.insert_component(entity, player).unwrap();
        entity
    };
    let steady = spawn_playing(&mut world, handle.id);
    let ghost = spawn_playing(&mut world, vanish.id);
    let idle = world.spawn_with(ActivityPlayer::new());

    let clock = tick();
    let mut system = ActivitySystem::new();
    let report = system.update(&mut world, &library, &clock);
    assert_eq!(report.updated, 2);
    assert_eq!(report.finished, vec![ghost]);
    assert!(!world.is_alive(ghost));
    assert!(world.get_component::<ActivityPlayer>(steady).unwrap().is_playing());
    assert!(!world.get_component::<ActivityPlayer>(idle).unwrap().is_playing());

    // A reload now trips the steady player; the pass still completes.
    library.load_json(TWO_STEPS).unwrap();
    let report = system.update(&mut world, &library, &clock);
    assert_eq!(report.faults, 1);
    assert_eq!(report.finished, vec![steady]);
}

fn logging_activity(len: usize, stop_at: Option<usize>) -> String {
    let steps: Vec<String> = (0..len)
        .map(|i| {
            if Some(i) == stop_at {
                r#"{ "type": "stop" }"#.to_owned()
            } else {
                format!(r#"{{ "type": "log", "message": "step {i}" }}"#)
            }
        })
        .collect();
    format!(
        r#"{{ "name": "steps", "initial_state": "only", "states": [ {{ "name": "only", "steps": [ {} ] }} ] }}"#,
        steps.join(", ")
    )
}

proptest! {
    /// A state of `len` immediate steps ends after `len` updates, or right
    /// after its stop step.
    #[test]
    fn players_finish_after_the_expected_updates(
        len in 1usize..12,
        stop_at in proptest::option::of(0usize..12),
    ) {
        let stop_at = stop_at.filter(|i| *i < len);
        let (library, handle) = library_from(&logging_activity(len, stop_at));
        let mut world = World::new();
        let entity = world.spawn();
        let clock = tick();
        let mut player = ActivityPlayer::new();
        player.start(entity, &library, handle.id).unwrap();

        let expected = stop_at.map_or(len, |i| i + 1);
        let mut updates = 0;
        while player.is_playing() {
            prop_assert_eq!(player.current_step_index(), updates);
            prop_assert!(player.first_update());
            player.update(&mut world, &library, &clock).unwrap();
            updates += 1;
            prop_assert!(updates <= expected);
        }
        prop_assert_eq!(updates, expected);
    }
}
