//! Integration tests for the engine loop.
//!
//! Exercises: spawn → fixed steps → hulls, dragging, bites and removal,
//! plus snapshot reconciliation between two engines.

use baro_core::components::RemovalReason;
use baro_core::engine::{EngineConfig, SimulationEngine};
use baro_core::snapshot::RagdollSnapshot;
use baro_logic::anim::AnimConfig;
use baro_logic::hull::{Gap, Hull};
use baro_logic::{CharacterInput, ContentRegistry, Vec2};

// ── Helpers ────────────────────────────────────────────────────────────

fn engine(config: EngineConfig) -> SimulationEngine {
    SimulationEngine::new(config, ContentRegistry::with_builtins())
}

fn hungry_config() -> EngineConfig {
    EngineConfig {
        anim: AnimConfig {
            eat_reach: 100.0,
            eat_speed: 3.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn collider_position(engine: &SimulationEngine, id: u32) -> Vec2 {
    engine.character(id).unwrap().position(&engine.physics)
}

// ── Locomotion ─────────────────────────────────────────────────────────

#[test]
fn human_walks_across_a_dry_room() {
    let mut engine = engine(EngineConfig::default());
    engine.add_hull(Hull::new(Vec2::new(-50.0, 0.0), Vec2::new(100.0, 5.0)));
    let human = engine.spawn("human", Vec2::new(0.0, 1.0)).unwrap();
    engine.set_input(
        human,
        CharacterInput {
            movement: Vec2::new(1.0, 0.0),
            ..Default::default()
        },
    );

    for _ in 0..180 {
        engine.step();
    }
    assert!(collider_position(&engine, human).x > 1.0);
    assert_eq!(engine.character(human).unwrap().oxygen, 100.0);
}

#[test]
fn frame_updates_match_fixed_steps() {
    let mut engine = engine(EngineConfig::default());
    let fish = engine.spawn("fish", Vec2::new(0.0, -10.0)).unwrap();
    let mut ran = 0;
    for _ in 0..30 {
        ran += engine.update(1.0 / 30.0);
    }
    assert!((59..=60).contains(&ran));
    assert_eq!(engine.steps(), ran as u64);
    let limbs = engine.render_transforms(fish).unwrap();
    assert_eq!(limbs.len(), 3);
    assert!(limbs.iter().all(|l| l.position.is_valid()));
}

// ── Hulls ──────────────────────────────────────────────────────────────

#[test]
fn breach_floods_the_room() {
    let mut engine = engine(EngineConfig::default());
    let room = engine.add_hull(Hull::new(Vec2::new(-5.0, 0.0), Vec2::new(10.0, 3.0)));
    engine.add_gap(Gap::ocean(room, Vec2::new(-5.0, 0.5), 1.0));
    engine.spawn("human", Vec2::new(0.0, 1.0)).unwrap();

    for _ in 0..600 {
        engine.step();
    }
    assert!(engine.hulls.hull(room).water_volume > 0.0);
    assert!(engine.hulls.surface(room) > 0.0);
}

// ── Predation ──────────────────────────────────────────────────────────

#[test]
fn fish_eats_prey_and_prey_is_removed() {
    let mut engine = engine(hungry_config());
    let hunter = engine.spawn("fish", Vec2::new(0.0, -10.0)).unwrap();
    let mouth = engine
        .character(hunter)
        .unwrap()
        .anim()
        .ragdoll()
        .mouth_position(&engine.physics)
        .unwrap();
    let prey = engine.spawn("fish", mouth).unwrap();
    assert!(engine.grab(hunter, prey));

    for _ in 0..1200 {
        engine.step();
        if !engine.contains(prey) {
            break;
        }
    }
    assert!(!engine.contains(prey));
    assert_eq!(engine.character_count(), 1);
    assert_eq!(engine.character(hunter).unwrap().selected, None);
    assert_eq!(engine.drain_removed(), vec![(prey, RemovalReason::Consumed)]);
}

#[test]
fn bites_damage_the_prey() {
    let mut engine = engine(hungry_config());
    let hunter = engine.spawn("fish", Vec2::new(0.0, -10.0)).unwrap();
    let prey = engine.spawn("fish", Vec2::new(0.5, -10.0)).unwrap();
    engine.grab(hunter, prey);

    let full = engine.character(prey).unwrap().health;
    for _ in 0..15 {
        engine.step();
    }
    assert!(engine.contains(prey));
    assert!(engine.character(prey).unwrap().health < full);
}

#[test]
fn prey_out_of_reach_is_released() {
    let mut engine = engine(EngineConfig::default());
    let hunter = engine.spawn("fish", Vec2::new(0.0, -10.0)).unwrap();
    let prey = engine.spawn("fish", Vec2::new(20.0, -10.0)).unwrap();
    assert!(engine.grab(hunter, prey));

    engine.step();
    assert_eq!(engine.character(hunter).unwrap().selected, None);
    assert!(engine.contains(prey));
}

// ── Snapshots ──────────────────────────────────────────────────────────

#[test]
fn remote_copy_converges_on_snapshot() {
    let mut server = engine(EngineConfig::default());
    let mut client = engine(EngineConfig::default());
    let id = server.spawn("fish", Vec2::new(0.0, -10.0)).unwrap();
    let remote = client.spawn_remote("fish", Vec2::new(0.0, -10.0)).unwrap();
    assert_eq!(id, remote);

    server.set_input(
        id,
        CharacterInput {
            movement: Vec2::new(1.0, 0.0),
            ..Default::default()
        },
    );
    for _ in 0..120 {
        server.step();
    }

    let bytes = server.snapshot(id).unwrap().encode().unwrap();
    let snapshot = RagdollSnapshot::decode(&bytes).unwrap();
    let before = collider_position(&client, id).distance(snapshot.position);
    assert!(before > 0.1);

    assert!(client.apply_snapshot(&snapshot).unwrap());
    for _ in 0..30 {
        client.step();
    }
    let after = collider_position(&client, id).distance(snapshot.position);
    assert!(after < before * 0.5, "before {} after {}", before, after);

    let mut stale = snapshot.clone();
    stale.step = 0;
    assert!(!client.apply_snapshot(&stale).unwrap());
}

#[test]
fn snapshot_for_unknown_character_is_ignored() {
    let mut server = engine(EngineConfig::default());
    let mut client = engine(EngineConfig::default());
    let id = server.spawn("human", Vec2::new(0.0, -10.0)).unwrap();
    let snapshot = server.snapshot(id).unwrap();
    assert!(!client.apply_snapshot(&snapshot).unwrap());
}
