//! Integration tests for the animation controller driving whole ragdolls.
//!
//! Exercises: content → ragdoll → controller → gait → physics step,
//! plus predation and the death / limp branches.
//!
//! Physics runs in a rapier-backed [`PhysicsWorld`] per test.

use std::f32::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use baro_logic::anim::{AnimConfig, AnimController, AnimInput, DragOutcome, PreyView};
use baro_logic::character::Character;
use baro_logic::content::SpeciesParams;
use baro_logic::error::AnimError;
use baro_logic::hull::{Hull, HullSystem};
use baro_logic::limb::Direction;
use baro_logic::math::Vec2;
use baro_logic::params::{Editable, ParamValue};
use baro_logic::physics::{FloorSegment, PhysicsWorld};
use baro_logic::predation::{resolve_bite, BiteOutcome};
use rand::rngs::StdRng;
use rand::SeedableRng;

const DT: f32 = 1.0 / 60.0;

// ── Helpers ────────────────────────────────────────────────────────────

fn controller(
    species: SpeciesParams,
    position: Vec2,
    config: AnimConfig,
    physics: &mut PhysicsWorld,
) -> AnimController {
    AnimController::new(1, Arc::new(species), position, config, physics).unwrap()
}

fn walking(target: Vec2) -> AnimInput {
    AnimInput {
        target_movement: target,
        in_hull: true,
        ..Default::default()
    }
}

fn floored_world() -> PhysicsWorld {
    let mut physics = PhysicsWorld::default();
    physics.add_floor(FloorSegment {
        y: 0.0,
        min_x: -50.0,
        max_x: 50.0,
    });
    physics
}

fn dry_hull() -> HullSystem {
    let mut hulls = HullSystem::new();
    hulls.add_hull(Hull::new(Vec2::new(-50.0, 0.0), Vec2::new(100.0, 5.0)));
    hulls
}

// ── Locomotion ─────────────────────────────────────────────────────────

#[test]
fn humanoid_walks_forward_with_wrapped_phase() {
    let mut physics = floored_world();
    let hulls = dry_hull();
    let mut human = Character::spawn(
        1,
        Arc::new(SpeciesParams::humanoid()),
        Vec2::new(0.0, 1.0),
        AnimConfig::default(),
        &mut physics,
    )
    .unwrap();
    human.input.movement = Vec2::new(1.0, 0.0);

    let mut phase_moved = false;
    for _ in 0..180 {
        human.update(DT, &hulls, &mut physics);
        physics.step(DT);
        human.anim_mut().post_step(&mut physics);
        let walk_pos = human.anim().state().walk_pos;
        assert!((0.0..TAU).contains(&walk_pos), "walk_pos {}", walk_pos);
        phase_moved |= walk_pos > 0.0;
    }
    assert!(phase_moved);
    assert!(human.position(&physics).x > 1.0);
    assert_eq!(human.anim().dir(), Direction::Right);
}

#[test]
fn idle_fish_settles_in_water() {
    let mut physics = PhysicsWorld::default();
    let sea = HullSystem::new();
    let mut fish = Character::spawn(
        2,
        Arc::new(SpeciesParams::fish()),
        Vec2::new(0.0, -20.0),
        AnimConfig::default(),
        &mut physics,
    )
    .unwrap();
    let collider = fish.anim().ragdoll().collider();
    let main = fish.anim().ragdoll().main_limb().body;
    physics.body_mut(collider).linear_velocity = Vec2::new(1.0, 0.5);

    // two seconds
    let mut phase_error = (fish.anim().state().walk_pos - FRAC_PI_2).abs();
    for _ in 0..120 {
        fish.update(DT, &sea, &mut physics);
        physics.step(DT);
        fish.anim_mut().post_step(&mut physics);
        let error = (fish.anim().state().walk_pos - FRAC_PI_2).abs();
        assert!(error <= phase_error + 1e-6, "phase moved away: {} > {}", error, phase_error);
        phase_error = error;
    }
    assert!(phase_error < 0.2, "phase error {}", phase_error);
    assert!(physics.body(collider).linear_velocity.length() < 0.05);
    let anchor = physics.body(main).pull_joint.target;
    let collider_pos = physics.body(collider).position;
    assert!(
        anchor.distance(collider_pos) < 0.05,
        "pull anchor {:?} vs collider {:?}",
        anchor,
        collider_pos
    );

    for _ in 0..180 {
        fish.update(DT, &sea, &mut physics);
        physics.step(DT);
        fish.anim_mut().post_step(&mut physics);
    }
    assert!((fish.anim().state().walk_pos - FRAC_PI_2).abs() < 0.05);
}

#[test]
fn swimming_fish_phase_stays_wrapped() {
    let mut physics = PhysicsWorld::default();
    let mut fish = controller(
        SpeciesParams::fish(),
        Vec2::new(0.0, -20.0),
        AnimConfig::default(),
        &mut physics,
    );
    let input = AnimInput {
        target_movement: Vec2::new(4.0, 0.0),
        in_water: true,
        ..Default::default()
    };
    let mut stun = 0.0;
    for _ in 0..600 {
        fish.update_anim(DT, &input, &mut stun, &mut physics);
        physics.step(DT);
        let walk_pos = fish.state().walk_pos;
        assert!((0.0..TAU).contains(&walk_pos), "walk_pos {}", walk_pos);
    }
}

// ── Direction ──────────────────────────────────────────────────────────

#[test]
fn flip_waits_for_debounce() {
    let mut physics = floored_world();
    let mut human = controller(
        SpeciesParams::humanoid(),
        Vec2::new(0.0, 1.0),
        AnimConfig::default(),
        &mut physics,
    );
    let input = walking(Vec2::new(-1.0, 0.0));
    let mut stun = 0.0;
    for _ in 0..30 {
        human.update_anim(DT, &input, &mut stun, &mut physics);
    }
    assert_eq!(human.dir(), Direction::Right, "half a second is too soon");
    for _ in 0..40 {
        human.update_anim(DT, &input, &mut stun, &mut physics);
    }
    assert_eq!(human.dir(), Direction::Left);
}

#[test]
fn flip_intent_reset_restarts_debounce() {
    let mut physics = floored_world();
    let mut human = controller(
        SpeciesParams::humanoid(),
        Vec2::new(0.0, 1.0),
        AnimConfig::default(),
        &mut physics,
    );
    let mut stun = 0.0;
    for _ in 0..50 {
        human.update_anim(DT, &walking(Vec2::new(-1.0, 0.0)), &mut stun, &mut physics);
    }
    human.update_anim(DT, &walking(Vec2::new(1.0, 0.0)), &mut stun, &mut physics);
    for _ in 0..50 {
        human.update_anim(DT, &walking(Vec2::new(-1.0, 0.0)), &mut stun, &mut physics);
    }
    assert_eq!(human.dir(), Direction::Right);
}

#[test]
fn remote_characters_flip_immediately() {
    let mut physics = floored_world();
    let mut human = controller(
        SpeciesParams::humanoid(),
        Vec2::new(0.0, 1.0),
        AnimConfig::default(),
        &mut physics,
    );
    let input = AnimInput {
        remote_controlled: true,
        ..walking(Vec2::new(-1.0, 0.0))
    };
    let mut stun = 0.0;
    human.update_anim(DT, &input, &mut stun, &mut physics);
    assert_eq!(human.dir(), Direction::Left);
}

// ── Severing ───────────────────────────────────────────────────────────

#[test]
fn severed_limbs_receive_no_commands() {
    let mut physics = floored_world();
    let mut human = controller(
        SpeciesParams::humanoid(),
        Vec2::new(0.0, 1.0),
        AnimConfig::default(),
        &mut physics,
    );
    // left hip: thigh, leg and foot come off together
    assert!(human.ragdoll_mut().sever_joint(1, &mut physics));
    let severed: Vec<usize> = (0..human.ragdoll().limbs().len())
        .filter(|&i| human.ragdoll().limb(i).is_severed())
        .collect();
    assert_eq!(severed.len(), 3);

    let mut stun = 0.0;
    for _ in 0..30 {
        human.update_anim(DT, &walking(Vec2::new(1.0, 0.0)), &mut stun, &mut physics);
        physics.step(DT);
        let targets = human.limb_targets();
        assert!(!targets.commands.is_empty());
        for command in &targets.commands {
            assert!(!severed.contains(&command.limb()));
        }
        for &limb in &severed {
            let body = human.ragdoll().limb(limb).body;
            assert!(!physics.body(body).pull_joint.enabled);
        }
    }
}

#[test]
fn scaling_round_trip_restores_geometry() {
    let mut physics = PhysicsWorld::default();
    let mut human = controller(
        SpeciesParams::humanoid(),
        Vec2::new(0.0, 1.0),
        AnimConfig::default(),
        &mut physics,
    );
    let handle = human.ragdoll().joints()[1].handle;
    let original = physics.joint(handle).local_anchor_a;

    let mut params = human.species().ragdoll.clone();
    params.joint_scale = 2.0;
    human.set_ragdoll_params(params.clone(), &mut physics).unwrap();
    let scaled = physics.joint(handle).local_anchor_a;
    assert!((scaled - original * 2.0).length() < 1e-5);

    params.joint_scale = 1.0;
    human.set_ragdoll_params(params, &mut physics).unwrap();
    assert!((physics.joint(handle).local_anchor_a - original).length() < 1e-6);
}

#[test]
fn joint_scale_edit_waits_for_recreate() {
    let walk = |edit: bool| {
        let mut physics = floored_world();
        let mut human = controller(
            SpeciesParams::humanoid(),
            Vec2::new(0.0, 1.0),
            AnimConfig::default(),
            &mut physics,
        );
        if edit {
            human
                .params_mut()
                .ragdoll
                .set("joint_scale", ParamValue::Float(2.0))
                .unwrap();
        }
        let mut stun = 0.0;
        for _ in 0..20 {
            human.update_anim(DT, &walking(Vec2::new(1.0, 0.0)), &mut stun, &mut physics);
            physics.step(DT);
        }
        (human, physics)
    };
    let (plain, _) = walk(false);
    let (mut edited, mut physics) = walk(true);

    assert!(plain.state().walk_pos != 0.0);
    assert!((edited.state().walk_pos - plain.state().walk_pos).abs() < 1e-3);
    assert_eq!(edited.ragdoll().joint_scale(), 1.0);

    edited.recreate(&mut physics).unwrap();
    assert_eq!(edited.ragdoll().joint_scale(), 2.0);
}

// ── Editor pause ───────────────────────────────────────────────────────

#[test]
fn frozen_character_skips_its_tick() {
    let mut physics = PhysicsWorld::default();
    let sea = HullSystem::new();
    let mut human = Character::spawn(
        3,
        Arc::new(SpeciesParams::humanoid()),
        Vec2::new(0.0, 10.0),
        AnimConfig::default(),
        &mut physics,
    )
    .unwrap();
    human.stun = 1.0;
    let limbs: Vec<Vec2> = human
        .anim()
        .ragdoll()
        .limbs()
        .iter()
        .map(|l| l.position(&physics))
        .collect();
    human.anim_mut().set_frozen(true, &mut physics);

    for _ in 0..60 {
        human.update(DT, &sea, &mut physics);
        physics.step(DT);
        human.anim_mut().post_step(&mut physics);
    }
    for (limb, start) in human.anim().ragdoll().limbs().iter().zip(&limbs) {
        assert_eq!(limb.position(&physics), *start);
    }
    assert_eq!(human.stun, 1.0);
    assert_eq!(human.oxygen, 100.0);

    human.anim_mut().set_frozen(false, &mut physics);
    for _ in 0..30 {
        human.update(DT, &sea, &mut physics);
        physics.step(DT);
        human.anim_mut().post_step(&mut physics);
    }
    assert!(human.stun < 1.0);
    assert!(human.oxygen < 100.0);
}

// ── Death and incapacitation ───────────────────────────────────────────

#[test]
fn death_twitch_runs_for_its_duration_only() {
    let mut physics = PhysicsWorld::default();
    let config = AnimConfig::default();
    let mut fish = controller(
        SpeciesParams::fish(),
        Vec2::new(0.0, -20.0),
        config.clone(),
        &mut physics,
    );
    let input = AnimInput {
        dead: true,
        in_water: true,
        ..Default::default()
    };
    let mut stun = 0.0;
    for _ in 0..400 {
        fish.update_anim(DT, &input, &mut stun, &mut physics);
        physics.step(DT);
    }
    let timer = fish.state().death_timer;
    assert!(timer >= config.death_duration);
    assert!(timer < config.death_duration + DT + 1e-3);
    // locomotion never ran while dead
    assert!(fish.limb_targets().commands.is_empty());
    assert!(fish.limb_targets().collider_velocity.is_none());
    assert!(!physics.body(fish.ragdoll().collider()).enabled);
}

#[test]
fn zero_mass_limb_halts_death_animation() {
    let mut physics = PhysicsWorld::default();
    let mut fish = controller(
        SpeciesParams::fish(),
        Vec2::new(0.0, -20.0),
        AnimConfig::default(),
        &mut physics,
    );
    let torso = fish.ragdoll().limb(0).body;
    physics.body_mut(torso).mass = 0.0;

    let input = AnimInput {
        dead: true,
        ..Default::default()
    };
    let mut stun = 0.0;
    for _ in 0..10 {
        fish.update_anim(DT, &input, &mut stun, &mut physics);
    }
    let state = fish.state();
    assert_eq!(state.death_timer, 0.0);
    assert!(state.death_halted);
    assert!(state.has_reported(&AnimError::InvalidMass {
        limb: fish.ragdoll().limb(0).limb_type,
        mass: 0.0,
    }));
}

#[test]
fn stunned_character_goes_limp_without_twitch() {
    let mut physics = floored_world();
    let mut human = controller(
        SpeciesParams::humanoid(),
        Vec2::new(0.0, 1.0),
        AnimConfig::default(),
        &mut physics,
    );
    let input = AnimInput {
        incapacitated: true,
        ..walking(Vec2::new(1.0, 0.0))
    };
    let mut stun = 1.0;
    for _ in 0..10 {
        human.update_anim(DT, &input, &mut stun, &mut physics);
        physics.step(DT);
    }
    assert_eq!(human.state().death_timer, 0.0);
    assert!(!physics.body(human.ragdoll().collider()).enabled);

    // waking up turns the collider back on
    human.update_anim(DT, &walking(Vec2::ZERO), &mut stun, &mut physics);
    assert!(physics.body(human.ragdoll().collider()).enabled);
}

// ── Predation ──────────────────────────────────────────────────────────

#[test]
fn fish_bites_prey_apart_then_consumes_it() {
    let mut physics = PhysicsWorld::default();
    let config = AnimConfig {
        eat_speed: 1.0,
        ..Default::default()
    };
    let mut fish = controller(
        SpeciesParams::fish(),
        Vec2::new(0.0, 3.0),
        config,
        &mut physics,
    );
    let mouth = fish.ragdoll().mouth_position(&physics).unwrap();
    let mut prey = controller(
        SpeciesParams::humanoid(),
        mouth,
        AnimConfig::default(),
        &mut physics,
    );
    let mut rng = StdRng::seed_from_u64(42);

    let mut bites = 0;
    let mut consumed = false;
    for _ in 0..5000 {
        let view = PreyView::of(prey.ragdoll(), &physics);
        match fish.drag_character(DT, &view, &mut physics) {
            DragOutcome::Bite => {
                bites += 1;
                match resolve_bite(prey.ragdoll_mut(), &mut physics, &mut rng, 10.0) {
                    BiteOutcome::Severed(joint) => {
                        assert!(prey.ragdoll().joints()[joint].is_severed());
                    }
                    BiteOutcome::Consumed => {
                        consumed = true;
                        break;
                    }
                }
            }
            DragOutcome::Holding => {}
            DragOutcome::Release => panic!("prey escaped the mouth"),
        }
    }
    assert!(consumed);
    assert!(bites >= 2);
    assert!(prey.ragdoll().severable_joints().is_empty());
}

#[test]
fn fish_releases_prey_out_of_reach() {
    let mut physics = PhysicsWorld::default();
    let mut fish = controller(
        SpeciesParams::fish(),
        Vec2::new(0.0, 3.0),
        AnimConfig::default(),
        &mut physics,
    );
    let prey = controller(
        SpeciesParams::humanoid(),
        Vec2::new(10.0, 3.0),
        AnimConfig::default(),
        &mut physics,
    );
    fish.state_mut().eat_timer = 0.3;
    let view = PreyView::of(prey.ragdoll(), &physics);
    assert_eq!(
        fish.drag_character(DT, &view, &mut physics),
        DragOutcome::Release
    );
    assert_eq!(fish.state().eat_timer, 0.0);
}
