//! Simulation engine - owns the world and runs the fixed-step loop

use std::collections::HashMap;

use baro_logic::anim::{DragOutcome, PreyView};
use baro_logic::hull::{Gap, Hull, HullConfig, HullSystem};
use baro_logic::limb::LimbTransform;
use baro_logic::lod::{classify_ragdoll, LodConfig, LodTier};
use baro_logic::predation::{resolve_bite, BiteOutcome};
use baro_logic::{
    AnimConfig, Character, CharacterInput, ContentError, ContentRegistry, PhysicsWorld, Vec2,
};
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::components::{CharacterId, Remote, RemovalReason};
use crate::snapshot::{RagdollSnapshot, SnapshotError};

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds per physics and animation step.
    pub fixed_step: f32,
    /// Steps run per frame before the backlog is dropped.
    pub max_steps_per_frame: u32,
    pub gravity: Vec2,
    pub seed: u64,
    pub anim: AnimConfig,
    pub lod: LodConfig,
    pub hull: HullConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            max_steps_per_frame: 5,
            gravity: Vec2::new(0.0, -9.81),
            seed: 0,
            anim: AnimConfig::default(),
            lod: LodConfig::default(),
            hull: HullConfig::default(),
        }
    }
}

/// Where the player is looking, for level of detail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    /// Distance from `position` that is still on screen.
    pub view_radius: f32,
}

/// The main simulation engine
pub struct SimulationEngine {
    /// ECS world holding one entity per character
    pub world: World,
    pub physics: PhysicsWorld,
    pub hulls: HullSystem,
    content: ContentRegistry,
    config: EngineConfig,
    rng: StdRng,
    entities: HashMap<u32, Entity>,
    next_id: u32,
    accumulator: f32,
    steps: u64,
    camera: Option<Camera>,
    removed: Vec<(u32, RemovalReason)>,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig, content: ContentRegistry) -> Self {
        Self {
            world: World::new(),
            physics: PhysicsWorld::new(config.gravity),
            hulls: HullSystem::new(),
            content,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            entities: HashMap::new(),
            next_id: 1,
            accumulator: 0.0,
            steps: 0,
            camera: None,
            removed: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut ContentRegistry {
        &mut self.content
    }

    /// Add a hull and register its floor with the physics world.
    pub fn add_hull(&mut self, hull: Hull) -> usize {
        let index = self.hulls.add_hull(hull);
        if let Some(floor) = self.hulls.floor_segments().get(index) {
            self.physics.add_floor(*floor);
        }
        index
    }

    pub fn add_gap(&mut self, gap: Gap) -> usize {
        self.hulls.add_gap(gap)
    }

    pub fn set_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
    }

    /// Spawn a character of a registered species. Returns its id.
    pub fn spawn(&mut self, species: &str, position: Vec2) -> Result<u32, ContentError> {
        let params = match self.content.get(species) {
            Ok(params) => params,
            Err(e) => {
                log::warn!("cannot spawn at {:?}: {}", position, e);
                return Err(e);
            }
        };
        let id = self.next_id;
        let character = Character::spawn(
            id,
            params,
            position,
            self.config.anim.clone(),
            &mut self.physics,
        )?;
        self.next_id += 1;
        let entity = self.world.spawn((CharacterId(id), character));
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Spawn a character driven by snapshots from elsewhere.
    pub fn spawn_remote(&mut self, species: &str, position: Vec2) -> Result<u32, ContentError> {
        let id = self.spawn(species, position)?;
        if let Some(&entity) = self.entities.get(&id) {
            let _ = self.world.insert_one(entity, Remote::default());
            if let Ok(mut character) = self.world.get::<&mut Character>(entity) {
                character.input.remote_controlled = true;
            }
        }
        Ok(id)
    }

    /// Remove a character now. Returns false for unknown ids.
    pub fn remove(&mut self, id: u32) -> bool {
        self.despawn(id, RemovalReason::Despawned)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn character(&self, id: u32) -> Option<hecs::Ref<'_, Character>> {
        let entity = *self.entities.get(&id)?;
        self.world.get::<&Character>(entity).ok()
    }

    pub fn character_mut(&mut self, id: u32) -> Option<hecs::RefMut<'_, Character>> {
        let entity = *self.entities.get(&id)?;
        self.world.get::<&mut Character>(entity).ok()
    }

    pub fn set_input(&mut self, id: u32, input: CharacterInput) -> bool {
        match self.character_mut(id) {
            Some(mut character) => {
                let remote = character.input.remote_controlled;
                character.input = CharacterInput {
                    remote_controlled: remote,
                    ..input
                };
                true
            }
            None => false,
        }
    }

    /// Pause or resume a character for editing. A frozen character keeps
    /// its pose and vitals until unfrozen.
    pub fn set_frozen(&mut self, id: u32, frozen: bool) -> bool {
        let Some(&entity) = self.entities.get(&id) else {
            return false;
        };
        match self.world.get::<&mut Character>(entity) {
            Ok(mut character) => {
                character.anim_mut().set_frozen(frozen, &mut self.physics);
                true
            }
            Err(_) => false,
        }
    }

    /// Make `predator` drag (and, for fish, eat) `prey`.
    pub fn grab(&mut self, predator: u32, prey: u32) -> bool {
        if predator == prey || !self.contains(prey) {
            return false;
        }
        match self.character_mut(predator) {
            Some(mut character) if !character.is_incapacitated() => {
                character.selected = Some(prey);
                true
            }
            _ => false,
        }
    }

    pub fn character_count(&self) -> usize {
        self.entities.len()
    }

    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Fixed steps run so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn sim_time(&self) -> f64 {
        self.steps as f64 * self.config.fixed_step as f64
    }

    /// Fraction of a step left in the accumulator, for render interpolation.
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.config.fixed_step).clamp(0.0, 1.0)
    }

    /// Characters removed since the last call.
    pub fn drain_removed(&mut self) -> Vec<(u32, RemovalReason)> {
        std::mem::take(&mut self.removed)
    }

    /// Advance by one frame. Runs as many fixed steps as fit and returns
    /// how many ran.
    pub fn update(&mut self, frame_dt: f32) -> u32 {
        if !(frame_dt > 0.0) || !frame_dt.is_finite() {
            return 0;
        }
        let step = self.config.fixed_step;
        self.accumulator += frame_dt;

        let mut ran = 0;
        while self.accumulator >= step && ran < self.config.max_steps_per_frame {
            self.step();
            self.accumulator -= step;
            ran += 1;
        }
        if self.accumulator >= step {
            log::warn!(
                "frame of {:.3}s needed more than {} steps; dropping {:.3}s",
                frame_dt,
                self.config.max_steps_per_frame,
                self.accumulator - self.accumulator % step
            );
            self.accumulator %= step;
        }
        ran
    }

    /// Run exactly one fixed step.
    pub fn step(&mut self) {
        let dt = self.config.fixed_step;

        self.update_hulls(dt);
        self.update_lod();

        let hulls = &self.hulls;
        let physics = &mut self.physics;
        for (_, character) in self.world.query_mut::<&mut Character>() {
            character.update(dt, hulls, physics);
        }

        self.update_dragging(dt);

        self.physics.step(dt);
        for (_, character) in self.world.query_mut::<&mut Character>() {
            character.anim_mut().post_step(&mut self.physics);
        }
        self.steps += 1;
    }

    fn update_hulls(&mut self, dt: f32) {
        let mut occupants = vec![0u32; self.hulls.hulls().len()];
        for (_, character) in self.world.query::<&Character>().iter() {
            if character.is_dead()
                || character.anim().is_frozen()
                || !character.species().needs_air
            {
                continue;
            }
            if let Some(hull) = self.hulls.hull_at(character.position(&self.physics)) {
                occupants[hull] += 1;
            }
        }
        self.hulls.update(dt, &occupants, &self.config.hull);
    }

    fn update_lod(&mut self) {
        let camera = self.camera;
        let config = &self.config.lod;
        let physics = &mut self.physics;
        for (_, character) in self.world.query_mut::<&mut Character>() {
            let tier = match camera {
                Some(camera) => {
                    let distance = character.position(physics).distance(camera.position);
                    classify_ragdoll(distance, distance <= camera.view_radius, config)
                }
                None => LodTier::Full,
            };
            character.set_lod(tier, physics);
        }
    }

    /// Drag grabbed characters, resolve bites and remove eaten prey.
    fn update_dragging(&mut self, dt: f32) {
        let mut pairs: Vec<(Entity, u32)> = self
            .world
            .query::<&Character>()
            .iter()
            .filter_map(|(entity, c)| c.selected.map(|prey| (entity, prey)))
            .collect();
        pairs.sort_by_key(|&(_, prey)| prey);

        let mut consumed = Vec::new();
        for (predator_entity, prey_id) in pairs {
            let prey_entity = match self.entities.get(&prey_id) {
                Some(&e) if e != predator_entity && !consumed.contains(&prey_id) => e,
                _ => {
                    self.release(predator_entity);
                    continue;
                }
            };
            let view = match self.world.get::<&Character>(prey_entity) {
                Ok(prey) if prey.anim().is_frozen() => continue,
                Ok(prey) => Some(PreyView::of(prey.anim().ragdoll(), &self.physics)),
                Err(_) => None,
            };
            let Some(view) = view else {
                self.release(predator_entity);
                continue;
            };

            let Ok(mut predator) = self.world.get::<&mut Character>(predator_entity) else {
                continue;
            };
            if predator.is_incapacitated() {
                predator.selected = None;
                continue;
            }
            let outcome = predator.anim_mut().drag_character(dt, &view, &mut self.physics);
            let damage = predator.species().bite_damage;
            let predator_id = predator.id();
            match outcome {
                DragOutcome::Holding => continue,
                DragOutcome::Release => {
                    predator.selected = None;
                    continue;
                }
                DragOutcome::Bite => {}
            }
            drop(predator);

            let Ok(mut prey) = self.world.get::<&mut Character>(prey_entity) else {
                continue;
            };
            prey.take_damage(damage);
            let bite = resolve_bite(
                prey.anim_mut().ragdoll_mut(),
                &mut self.physics,
                &mut self.rng,
                damage,
            );
            drop(prey);
            match bite {
                BiteOutcome::Severed(joint) => {
                    log::debug!("#{} tore joint {} off #{}", predator_id, joint, prey_id);
                }
                BiteOutcome::Consumed => {
                    log::info!("#{} consumed #{}", predator_id, prey_id);
                    consumed.push(prey_id);
                    self.release(predator_entity);
                }
            }
        }

        for id in consumed {
            self.despawn(id, RemovalReason::Consumed);
        }
    }

    fn release(&mut self, entity: Entity) {
        if let Ok(mut character) = self.world.get::<&mut Character>(entity) {
            character.selected = None;
        }
    }

    fn despawn(&mut self, id: u32, reason: RemovalReason) -> bool {
        let Some(entity) = self.entities.remove(&id) else {
            return false;
        };
        if let Ok(character) = self.world.get::<&Character>(entity) {
            character.remove(&mut self.physics);
        }
        if let Err(e) = self.world.despawn(entity) {
            log::warn!("character #{} had no entity to despawn: {}", id, e);
        }
        for (_, character) in self.world.query_mut::<&mut Character>() {
            if character.selected == Some(id) {
                character.selected = None;
            }
        }
        log::info!("removed character #{} ({:?})", id, reason);
        self.removed.push((id, reason));
        true
    }

    /// Capture the authoritative transform of a character.
    pub fn snapshot(&self, id: u32) -> Option<RagdollSnapshot> {
        let character = self.character(id)?;
        Some(RagdollSnapshot::capture(&character, &self.physics, self.steps))
    }

    /// Apply a received snapshot to a remote character. Snapshots older
    /// than the last applied one are ignored.
    pub fn apply_snapshot(&mut self, snapshot: &RagdollSnapshot) -> Result<bool, SnapshotError> {
        let Some(&entity) = self.entities.get(&snapshot.character) else {
            return Ok(false);
        };
        if let Ok(remote) = self.world.get::<&Remote>(entity) {
            if snapshot.step < remote.last_step {
                return Ok(false);
            }
        }
        if let Ok(mut character) = self.world.get::<&mut Character>(entity) {
            snapshot.apply_to(&mut character, &mut self.physics)?;
        }
        if let Ok(mut remote) = self.world.get::<&mut Remote>(entity) {
            remote.last_step = snapshot.step;
        }
        Ok(true)
    }

    /// Interpolated limb transforms for drawing.
    pub fn render_transforms(&self, id: u32) -> Option<Vec<LimbTransform>> {
        let character = self.character(id)?;
        Some(character.anim().ragdoll().limb_transforms(&self.physics, self.alpha()))
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), ContentRegistry::with_builtins())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_room() -> SimulationEngine {
        let mut engine = SimulationEngine::default();
        engine.add_hull(Hull::new(Vec2::new(-20.0, 0.0), Vec2::new(40.0, 5.0)));
        engine
    }

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::default();
        assert_eq!(engine.character_count(), 0);
        assert_eq!(engine.steps(), 0);
        assert_eq!(engine.sim_time(), 0.0);
        assert_eq!(engine.physics.gravity, Vec2::new(0.0, -9.81));
    }

    #[test]
    fn test_spawn_assigns_increasing_ids() {
        let mut engine = engine_with_room();
        let a = engine.spawn("human", Vec2::new(0.0, 1.0)).unwrap();
        let b = engine.spawn("fish", Vec2::new(3.0, 1.0)).unwrap();
        assert!(b > a);
        assert_eq!(engine.character_count(), 2);
        assert_eq!(engine.ids(), vec![a, b]);
        assert_eq!(engine.character(b).unwrap().species().name, "fish");
    }

    #[test]
    fn test_unknown_species_is_an_error() {
        let mut engine = engine_with_room();
        assert!(matches!(
            engine.spawn("kraken", Vec2::ZERO),
            Err(ContentError::UnknownSpecies(_))
        ));
        assert_eq!(engine.character_count(), 0);
    }

    #[test]
    fn test_update_runs_fixed_steps() {
        let mut engine = SimulationEngine::default();
        assert_eq!(engine.update(1.0 / 30.0 + 1e-4), 2);
        assert_eq!(engine.update(0.001), 0);
        assert_eq!(engine.steps(), 2);
        assert!(engine.alpha() > 0.0 && engine.alpha() < 1.0);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut engine = SimulationEngine::default();
        assert_eq!(engine.update(2.0), 5);
        assert!(engine.alpha() < 1.0);
        assert_eq!(engine.update(f32::NAN), 0);
        assert_eq!(engine.update(-1.0), 0);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut engine = engine_with_room();
        let fish = engine.spawn("fish", Vec2::new(0.0, 1.0)).unwrap();
        let human = engine.spawn("human", Vec2::new(1.0, 1.0)).unwrap();
        assert!(engine.grab(fish, human));
        assert!(engine.remove(human));
        assert!(!engine.remove(human));
        assert_eq!(engine.character(fish).unwrap().selected, None);
        assert_eq!(
            engine.drain_removed(),
            vec![(human, RemovalReason::Despawned)]
        );
        assert!(engine.drain_removed().is_empty());
    }

    #[test]
    fn test_grab_rejects_self_and_unknown() {
        let mut engine = engine_with_room();
        let fish = engine.spawn("fish", Vec2::new(0.0, 1.0)).unwrap();
        assert!(!engine.grab(fish, fish));
        assert!(!engine.grab(fish, 99));
    }

    #[test]
    fn test_far_characters_go_dormant() {
        let mut engine = engine_with_room();
        let near = engine.spawn("human", Vec2::new(0.0, 1.0)).unwrap();
        let far = engine.spawn("fish", Vec2::new(500.0, 1.0)).unwrap();
        engine.set_camera(Some(Camera {
            position: Vec2::new(0.0, 1.0),
            view_radius: 15.0,
        }));
        engine.step();
        assert_eq!(engine.character(near).unwrap().lod(), LodTier::Full);
        assert_eq!(engine.character(far).unwrap().lod(), LodTier::Dormant);
    }

    #[test]
    fn test_frozen_character_is_paused() {
        let mut engine = SimulationEngine::default();
        let id = engine.spawn("human", Vec2::new(0.0, 10.0)).unwrap();
        let before = engine.character(id).unwrap().position(&engine.physics);
        assert!(engine.set_frozen(id, true));
        for _ in 0..60 {
            engine.step();
        }
        {
            let human = engine.character(id).unwrap();
            assert_eq!(human.position(&engine.physics), before);
            // out at sea, so only the pause keeps the air in
            assert_eq!(human.oxygen, 100.0);
        }

        assert!(engine.set_frozen(id, false));
        for _ in 0..30 {
            engine.step();
        }
        {
            let human = engine.character(id).unwrap();
            assert!(human.oxygen < 100.0);
        }
        assert!(!engine.set_frozen(999, true));
    }

    #[test]
    fn test_removed_characters_leave_no_bodies() {
        let mut engine = engine_with_room();
        for _ in 0..200 {
            let id = engine.spawn("fish", Vec2::new(0.0, 2.0)).unwrap();
            engine.step();
            assert!(engine.remove(id));
        }
        assert_eq!(engine.character_count(), 0);
        assert_eq!(engine.physics.body_count(), 0);
        assert_eq!(engine.physics.joint_count(), 0);
    }

    #[test]
    fn test_remote_input_keeps_remote_flag() {
        let mut engine = engine_with_room();
        let id = engine.spawn_remote("human", Vec2::new(0.0, 1.0)).unwrap();
        assert!(engine.set_input(
            id,
            CharacterInput {
                movement: Vec2::new(1.0, 0.0),
                ..Default::default()
            }
        ));
        assert!(engine.character(id).unwrap().input.remote_controlled);
        assert!(!engine.set_input(404, CharacterInput::default()));
    }
}
