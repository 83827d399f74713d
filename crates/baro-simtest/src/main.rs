//! BaroSim Headless Simulation Harness
//!
//! Loads species content and runs creature scenarios through the engine.
//! Runs entirely in-process: no rendering, no networking.
//!
//! Usage:
//!   cargo run -p baro-simtest
//!   cargo run -p baro-simtest -- --verbose
//!   RUST_LOG=debug cargo run -p baro-simtest

use std::f32::consts::TAU;

use baro_core::engine::{Camera, EngineConfig, SimulationEngine};
use baro_core::components::RemovalReason;
use baro_core::snapshot::RagdollSnapshot;
use baro_logic::anim::AnimConfig;
use baro_logic::hull::{Gap, Hull};
use baro_logic::limb::Direction;
use baro_logic::lod::LodTier;
use baro_logic::{CharacterInput, ContentError, ContentRegistry, SpeciesParams, Vec2};

// ── Species content (same JSON the game ships) ──────────────────────────
const SPECIES_JSON: &[(&str, &str)] = &[
    ("human.json", include_str!("../../../data/species/human.json")),
    ("fish.json", include_str!("../../../data/species/fish.json")),
];

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== BaroSim Simulation Harness ===\n");
    if verbose {
        if let Ok(json) = serde_json::to_string_pretty(&EngineConfig::default()) {
            println!("Engine config:\n{}\n", json);
        }
    }

    let mut results = Vec::new();

    // 1. Species content
    let content = match load_content(&mut results) {
        Some(content) => content,
        None => {
            summarize(&results, verbose);
            std::process::exit(1);
        }
    };

    // 2. Walking and swimming
    results.extend(validate_locomotion(&content, verbose));

    // 3. Turning around
    results.extend(validate_flipping(&content));

    // 4. Flooding and breathing
    results.extend(validate_flooding(&content, verbose));

    // 5. Predation
    results.extend(validate_predation(&content, verbose));

    // 6. Death and stun
    results.extend(validate_death(&content));

    // 7. Level of detail
    results.extend(validate_lod(&content));

    // 8. Remote snapshots
    results.extend(validate_snapshots(&content, verbose));

    if summarize(&results, verbose) > 0 {
        std::process::exit(1);
    }
}

/// Print the summary and return the number of failures.
fn summarize(results: &[TestResult], verbose: bool) -> usize {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );
    failed
}

fn new_engine(content: &ContentRegistry, config: EngineConfig) -> SimulationEngine {
    SimulationEngine::new(config, content.clone())
}

fn run(engine: &mut SimulationEngine, steps: u32) {
    for _ in 0..steps {
        engine.step();
    }
}

fn moving(x: f32, y: f32, run: bool) -> CharacterInput {
    CharacterInput {
        movement: Vec2::new(x, y),
        run,
        ..Default::default()
    }
}

// ── 1. Species Content ──────────────────────────────────────────────────

fn load_content(results: &mut Vec<TestResult>) -> Option<ContentRegistry> {
    println!("--- Species Content ---");
    let mut content = ContentRegistry::new();

    for (file, json) in SPECIES_JSON {
        match content.load_json(file, json) {
            Ok(species) => results.push(TestResult {
                name: format!("content_load_{}", species.name),
                passed: true,
                detail: format!(
                    "{}: {} limbs, {} joints, {:?}",
                    file,
                    species.ragdoll.limbs.len(),
                    species.ragdoll.joints.len(),
                    species.body_plan
                ),
            }),
            Err(e) => results.push(TestResult {
                name: format!("content_load_{}", file),
                passed: false,
                detail: e.to_string(),
            }),
        }
    }
    if results.iter().any(|r| !r.passed) {
        return None;
    }

    // Shipped content has the same shape as the built-in species
    for builtin in [SpeciesParams::humanoid(), SpeciesParams::fish()] {
        let loaded = content.get(&builtin.name).ok();
        let same_shape = loaded.as_ref().is_some_and(|l| {
            l.body_plan == builtin.body_plan
                && l.ragdoll.limbs.len() == builtin.ragdoll.limbs.len()
                && l.ragdoll.joints.len() == builtin.ragdoll.joints.len()
                && l.needs_air == builtin.needs_air
        });
        results.push(TestResult {
            name: format!("content_matches_builtin_{}", builtin.name),
            passed: same_shape,
            detail: "body plan, limb and joint counts agree".into(),
        });
    }

    let duplicate = content.load_json("fish.json", SPECIES_JSON[1].1);
    results.push(TestResult {
        name: "content_rejects_duplicate".into(),
        passed: matches!(duplicate, Err(ContentError::DuplicateSpecies(_))),
        detail: "loading fish twice is an error".into(),
    });

    let broken = content.load_json("broken.json", r#"{ "name": "eel" }"#);
    results.push(TestResult {
        name: "content_rejects_malformed".into(),
        passed: matches!(broken, Err(ContentError::Decode { .. })),
        detail: match broken {
            Err(e) => e.to_string(),
            Ok(_) => "decoded a species without a ragdoll".into(),
        },
    });

    Some(content)
}

// ── 2. Locomotion ───────────────────────────────────────────────────────

fn validate_locomotion(content: &ContentRegistry, verbose: bool) -> Vec<TestResult> {
    println!("--- Locomotion ---");
    let mut results = Vec::new();

    let mut engine = new_engine(content, EngineConfig::default());
    engine.add_hull(Hull::new(Vec2::new(-50.0, 0.0), Vec2::new(100.0, 5.0)));
    let human = match engine.spawn("human", Vec2::new(0.0, 1.0)) {
        Ok(id) => id,
        Err(e) => {
            results.push(TestResult {
                name: "walk_spawn".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    engine.set_input(human, moving(1.0, 0.0, false));

    let mut phase_in_range = true;
    for _ in 0..180 {
        engine.step();
        if let Some(c) = engine.character(human) {
            phase_in_range &= (0.0..TAU).contains(&c.anim().state().walk_pos);
        }
    }
    let x = engine
        .character(human)
        .map_or(f32::NAN, |c| c.position(&engine.physics).x);
    results.push(TestResult {
        name: "walk_moves_forward".into(),
        passed: x > 1.0,
        detail: format!("human at x={:.2} after 3s", x),
    });
    results.push(TestResult {
        name: "walk_phase_wrapped".into(),
        passed: phase_in_range,
        detail: "walk phase stayed within [0, 2π)".into(),
    });

    let mut sea = new_engine(content, EngineConfig::default());
    let Ok(fish) = sea.spawn("fish", Vec2::new(0.0, -20.0)) else {
        return results;
    };
    sea.set_input(fish, moving(1.0, 0.0, true));
    run(&mut sea, 180);
    let (x, swim_pos, swimming) = sea.character(fish).map_or((f32::NAN, f32::NAN, false), |c| {
        let state = c.anim().state();
        (
            c.position(&sea.physics).x,
            state.walk_pos,
            state.animation.is_swimming(),
        )
    });
    results.push(TestResult {
        name: "swim_moves_forward".into(),
        passed: x > 0.5 && swimming,
        detail: format!("fish at x={:.2}, swimming={}", x, swimming),
    });
    results.push(TestResult {
        name: "swim_phase_wrapped".into(),
        passed: (0.0..TAU).contains(&swim_pos),
        detail: format!("swim phase {:.3}", swim_pos),
    });

    if verbose {
        if let Some(transforms) = sea.render_transforms(fish) {
            for t in transforms {
                println!(
                    "    limb {:2}: ({:7.2}, {:7.2}) rot {:6.2}",
                    t.limb_id, t.position.x, t.position.y, t.rotation
                );
            }
        }
    }

    results
}

// ── 3. Flipping ─────────────────────────────────────────────────────────

fn validate_flipping(content: &ContentRegistry) -> Vec<TestResult> {
    println!("--- Flipping ---");
    let mut results = Vec::new();

    let mut engine = new_engine(content, EngineConfig::default());
    engine.add_hull(Hull::new(Vec2::new(-50.0, 0.0), Vec2::new(100.0, 5.0)));
    let Ok(human) = engine.spawn("human", Vec2::new(0.0, 1.0)) else {
        return results;
    };
    engine.set_input(human, moving(-1.0, 0.0, false));
    run(&mut engine, 20);
    let early = engine.character(human).map(|c| c.anim().dir());
    results.push(TestResult {
        name: "flip_debounced".into(),
        passed: early == Some(Direction::Right),
        detail: format!("facing {:?} after 1/3s of input", early),
    });

    run(&mut engine, 100);
    let late = engine.character(human).map(|c| c.anim().dir());
    results.push(TestResult {
        name: "flip_after_debounce".into(),
        passed: late == Some(Direction::Left),
        detail: format!("facing {:?} after 2s of input", late),
    });

    results
}

// ── 4. Flooding ─────────────────────────────────────────────────────────

fn validate_flooding(content: &ContentRegistry, verbose: bool) -> Vec<TestResult> {
    println!("--- Flooding ---");
    let mut results = Vec::new();

    let mut engine = new_engine(content, EngineConfig::default());
    let room = engine.add_hull(Hull::new(Vec2::new(-5.0, 0.0), Vec2::new(10.0, 3.0)));
    let neighbour = engine.add_hull(Hull::new(Vec2::new(5.0, 0.0), Vec2::new(10.0, 3.0)));
    let breach = engine.add_gap(Gap::ocean(room, Vec2::new(-5.0, 0.5), 1.0));
    engine.add_gap(Gap::wall(room, neighbour, Vec2::new(5.0, 0.5), 1.0));
    let Ok(human) = engine.spawn("human", Vec2::new(0.0, 1.0)) else {
        return results;
    };

    for second in 0..10 {
        run(&mut engine, 60);
        if verbose {
            println!(
                "    t={:2}s  water {:5.1}/{:5.1}  oxygen(hull) {:5.1}",
                second + 1,
                engine.hulls.hull(room).water_volume,
                engine.hulls.hull(neighbour).water_volume,
                engine.hulls.hull(room).oxygen,
            );
        }
    }

    let flooded = engine.hulls.hull(room).is_full();
    results.push(TestResult {
        name: "flood_breached_room_fills".into(),
        passed: flooded && engine.hulls.hull(room).pressure > 0.0,
        detail: format!(
            "water {:.1}/{:.1}, pressure {:.1}",
            engine.hulls.hull(room).water_volume,
            engine.hulls.hull(room).capacity(),
            engine.hulls.hull(room).pressure
        ),
    });
    results.push(TestResult {
        name: "flood_spreads_through_wall_gap".into(),
        passed: engine.hulls.hull(neighbour).water_volume > 0.0,
        detail: format!(
            "neighbour holds {:.1}",
            engine.hulls.hull(neighbour).water_volume
        ),
    });

    let oxygen = engine.character(human).map_or(f32::NAN, |c| c.oxygen);
    results.push(TestResult {
        name: "flood_drowning_costs_oxygen".into(),
        passed: oxygen < 100.0,
        detail: format!("human oxygen {:.1}", oxygen),
    });

    engine.hulls.set_gap_open(breach, 0.0);
    let before = engine.hulls.hull(room).water_volume + engine.hulls.hull(neighbour).water_volume;
    run(&mut engine, 60);
    let after = engine.hulls.hull(room).water_volume + engine.hulls.hull(neighbour).water_volume;
    results.push(TestResult {
        name: "flood_sealed_breach_conserves_water".into(),
        passed: (after - before).abs() < 1e-2,
        detail: format!("{:.2} -> {:.2}", before, after),
    });

    results
}

// ── 5. Predation ────────────────────────────────────────────────────────

fn validate_predation(content: &ContentRegistry, verbose: bool) -> Vec<TestResult> {
    println!("--- Predation ---");
    let mut results = Vec::new();

    let config = EngineConfig {
        anim: AnimConfig {
            eat_reach: 100.0,
            eat_speed: 3.0,
            ..Default::default()
        },
        seed: 7,
        ..Default::default()
    };
    let mut engine = new_engine(content, config);
    let Ok(hunter) = engine.spawn("fish", Vec2::new(0.0, -10.0)) else {
        return results;
    };
    let Ok(prey) = engine.spawn("fish", Vec2::new(0.7, -10.0)) else {
        return results;
    };
    results.push(TestResult {
        name: "predation_grab".into(),
        passed: engine.grab(hunter, prey),
        detail: format!("#{} grabs #{}", hunter, prey),
    });

    let mut steps = 0;
    while engine.contains(prey) && steps < 1200 {
        engine.step();
        steps += 1;
    }
    results.push(TestResult {
        name: "predation_consumes_prey".into(),
        passed: !engine.contains(prey),
        detail: format!("prey gone after {} steps", steps),
    });
    let removed = engine.drain_removed();
    results.push(TestResult {
        name: "predation_reports_removal".into(),
        passed: removed == vec![(prey, RemovalReason::Consumed)],
        detail: format!("{:?}", removed),
    });
    let selected = engine.character(hunter).and_then(|c| c.selected);
    results.push(TestResult {
        name: "predation_clears_selection".into(),
        passed: selected.is_none(),
        detail: format!("hunter selection {:?}", selected),
    });

    // Out of reach with stock tuning
    let mut engine = new_engine(content, EngineConfig::default());
    let (Ok(hunter), Ok(prey)) = (
        engine.spawn("fish", Vec2::new(0.0, -10.0)),
        engine.spawn("human", Vec2::new(30.0, -10.0)),
    ) else {
        return results;
    };
    engine.grab(hunter, prey);
    engine.step();
    let selected = engine.character(hunter).and_then(|c| c.selected);
    results.push(TestResult {
        name: "predation_releases_distant_prey".into(),
        passed: selected.is_none() && engine.contains(prey),
        detail: format!("hunter selection {:?}", selected),
    });
    if verbose {
        println!("    {} characters remain", engine.character_count());
    }

    results
}

// ── 6. Death ────────────────────────────────────────────────────────────

fn validate_death(content: &ContentRegistry) -> Vec<TestResult> {
    println!("--- Death & Stun ---");
    let mut results = Vec::new();

    let mut engine = new_engine(content, EngineConfig::default());
    engine.add_hull(Hull::new(Vec2::new(-20.0, 0.0), Vec2::new(40.0, 5.0)));
    let Ok(human) = engine.spawn("human", Vec2::new(0.0, 1.0)) else {
        return results;
    };
    run(&mut engine, 30);
    if let Some(mut c) = engine.character_mut(human) {
        c.take_damage(1000.0);
    }
    run(&mut engine, 400);

    let duration = engine.config().anim.death_duration;
    let dt = engine.config().fixed_step;
    let (dead, timer) = engine
        .character(human)
        .map_or((false, f32::NAN), |c| (c.is_dead(), c.anim().state().death_timer));
    results.push(TestResult {
        name: "death_twitch_bounded".into(),
        passed: dead && timer >= duration && timer < duration + 2.0 * dt,
        detail: format!("death timer {:.3} (duration {:.1})", timer, duration),
    });

    let Ok(stunned) = engine.spawn("human", Vec2::new(5.0, 1.0)) else {
        return results;
    };
    if let Some(mut c) = engine.character_mut(stunned) {
        c.stun = 1.0;
    }
    run(&mut engine, 30);
    let (stun, timer) = engine
        .character(stunned)
        .map_or((f32::NAN, f32::NAN), |c| (c.stun, c.anim().state().death_timer));
    results.push(TestResult {
        name: "stun_goes_limp_without_twitch".into(),
        passed: stun > 0.0 && stun < 1.0 && timer == 0.0,
        detail: format!("stun {:.2}, death timer {:.2}", stun, timer),
    });

    results
}

// ── 7. Level of Detail ──────────────────────────────────────────────────

fn validate_lod(content: &ContentRegistry) -> Vec<TestResult> {
    println!("--- Level of Detail ---");
    let mut results = Vec::new();

    let mut engine = new_engine(content, EngineConfig::default());
    let (Ok(near), Ok(mid), Ok(far)) = (
        engine.spawn("fish", Vec2::new(0.0, -10.0)),
        engine.spawn("fish", Vec2::new(60.0, -10.0)),
        engine.spawn("fish", Vec2::new(400.0, -10.0)),
    ) else {
        return results;
    };
    engine.set_camera(Some(Camera {
        position: Vec2::new(0.0, -10.0),
        view_radius: 20.0,
    }));
    run(&mut engine, 10);

    let tiers: Vec<Option<LodTier>> = [near, mid, far]
        .iter()
        .map(|&id| engine.character(id).map(|c| c.lod()))
        .collect();
    results.push(TestResult {
        name: "lod_tiers_by_distance".into(),
        passed: tiers == vec![Some(LodTier::Full), Some(LodTier::Simple), Some(LodTier::Dormant)],
        detail: format!("{:?}", tiers),
    });

    let simple = engine
        .character(mid)
        .is_some_and(|c| c.anim().ragdoll().is_simple_physics());
    results.push(TestResult {
        name: "lod_simple_physics".into(),
        passed: simple,
        detail: "mid-range fish carries its limbs on the collider".into(),
    });

    engine.set_camera(None);
    run(&mut engine, 1);
    let restored = engine
        .character(far)
        .is_some_and(|c| c.lod() == LodTier::Full && !c.anim().ragdoll().is_simple_physics());
    results.push(TestResult {
        name: "lod_restores_full_detail".into(),
        passed: restored,
        detail: "limbs come back when the camera is cleared".into(),
    });

    results
}

// ── 8. Snapshots ────────────────────────────────────────────────────────

fn validate_snapshots(content: &ContentRegistry, verbose: bool) -> Vec<TestResult> {
    println!("--- Remote Snapshots ---");
    let mut results = Vec::new();

    let mut server = new_engine(content, EngineConfig::default());
    let mut client = new_engine(content, EngineConfig::default());
    let (Ok(id), Ok(_)) = (
        server.spawn("fish", Vec2::new(0.0, -10.0)),
        client.spawn_remote("fish", Vec2::new(0.0, -10.0)),
    ) else {
        return results;
    };
    server.set_input(id, moving(1.0, 0.0, false));
    run(&mut server, 120);

    let Some(snapshot) = server.snapshot(id) else {
        return results;
    };
    let decoded = snapshot
        .encode()
        .and_then(|bytes| {
            if verbose {
                println!("    snapshot is {} bytes", bytes.len());
            }
            RagdollSnapshot::decode(&bytes)
        });
    results.push(TestResult {
        name: "snapshot_roundtrip".into(),
        passed: decoded.as_ref().is_ok_and(|d| *d == snapshot),
        detail: match &decoded {
            Ok(d) => format!("{} limbs at step {}", d.limbs.len(), d.step),
            Err(e) => e.to_string(),
        },
    });

    let position = |engine: &SimulationEngine| {
        engine
            .character(id)
            .map_or(f32::NAN, |c| c.position(&engine.physics).distance(snapshot.position))
    };
    let before = position(&client);
    let applied = client.apply_snapshot(&snapshot);
    run(&mut client, 30);
    let after = position(&client);
    results.push(TestResult {
        name: "snapshot_remote_converges".into(),
        passed: matches!(applied, Ok(true)) && after < before * 0.5,
        detail: format!("error {:.3} -> {:.3}", before, after),
    });

    results
}
