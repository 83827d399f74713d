//! A living character: vitals, input and the animation controller that
//! moves its ragdoll.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::anim::{AnimConfig, AnimController, AnimInput};
use crate::content::SpeciesParams;
use crate::error::ContentError;
use crate::hull::{HullSystem, FULL_OXYGEN};
use crate::lod::LodTier;
use crate::math::Vec2;
use crate::params::{AnimationType, LimbType};
use crate::physics::PhysicsWorld;

/// Oxygen percent lost per second without breathable air.
pub const OXYGEN_LOSS_RATE: f32 = 5.0;
/// Oxygen percent regained per second in breathable air.
pub const OXYGEN_GAIN_RATE: f32 = 10.0;
/// Hull oxygen below which the air does not sustain breathing.
pub const BREATHABLE_OXYGEN: f32 = 30.0;
/// Health lost per second at zero oxygen.
pub const SUFFOCATION_DAMAGE: f32 = 2.0;

/// What the player or AI wants this step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterInput {
    /// Desired direction; longer than 1 is clamped.
    pub movement: Vec2,
    pub run: bool,
    pub force_standing: bool,
    pub remote_controlled: bool,
}

#[derive(Debug, Clone)]
pub struct Character {
    id: u32,
    anim: AnimController,
    pub health: f32,
    pub oxygen: f32,
    /// Seconds of stun left.
    pub stun: f32,
    dead: bool,
    pub input: CharacterInput,
    /// Id of the character being dragged or eaten.
    pub selected: Option<u32>,
    lod: LodTier,
}

impl Character {
    pub fn spawn(
        id: u32,
        species: Arc<SpeciesParams>,
        position: Vec2,
        config: AnimConfig,
        physics: &mut PhysicsWorld,
    ) -> Result<Self, ContentError> {
        let health = species.max_health;
        let anim = AnimController::new(id, species, position, config, physics)?;
        log::info!("spawned {} #{} at {:?}", anim.species().name, id, position);
        Ok(Self {
            id,
            anim,
            health,
            oxygen: FULL_OXYGEN,
            stun: 0.0,
            dead: false,
            input: CharacterInput::default(),
            selected: None,
            lod: LodTier::Full,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn anim(&self) -> &AnimController {
        &self.anim
    }

    pub fn anim_mut(&mut self) -> &mut AnimController {
        &mut self.anim
    }

    pub fn species(&self) -> &SpeciesParams {
        self.anim.species()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_unconscious(&self) -> bool {
        !self.dead && self.oxygen <= 0.0
    }

    pub fn is_incapacitated(&self) -> bool {
        self.dead || self.is_unconscious() || self.stun > 0.0
    }

    pub fn lod(&self) -> LodTier {
        self.lod
    }

    pub fn set_lod(&mut self, tier: LodTier, physics: &mut PhysicsWorld) {
        if tier == self.lod {
            return;
        }
        if tier.simple_physics() != self.lod.simple_physics() {
            self.anim.set_simple_physics(tier.simple_physics(), physics);
        }
        self.lod = tier;
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Vec2 {
        physics.body(self.anim.ragdoll().collider()).position
    }

    /// Head position, or the main limb's for headless species.
    pub fn head_position(&self, physics: &PhysicsWorld) -> Vec2 {
        let ragdoll = self.anim.ragdoll();
        ragdoll
            .get_limb(LimbType::Head)
            .unwrap_or_else(|| ragdoll.main_limb())
            .position(physics)
    }

    pub fn take_damage(&mut self, amount: f32) {
        if self.dead || !(amount > 0.0) {
            return;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.kill();
        }
    }

    pub fn kill(&mut self) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.health = self.health.min(0.0);
        self.selected = None;
        log::info!("{} #{} died", self.anim.species().name, self.id);
    }

    /// One fixed step: vitals, then movement control and animation.
    /// Frozen characters skip it entirely.
    pub fn update(&mut self, dt: f32, hulls: &HullSystem, physics: &mut PhysicsWorld) {
        if !(dt > 0.0) || self.anim.is_frozen() {
            return;
        }
        self.stun = (self.stun - dt).max(0.0);
        self.anim
            .ragdoll()
            .update_submerged(physics, |p| hulls.is_in_water(p));

        if !self.dead && self.species().needs_air {
            let head = self.head_position(physics);
            let breathable =
                !hulls.is_in_water(head) && hulls.oxygen_at(head) >= BREATHABLE_OXYGEN;
            let rate = if breathable {
                OXYGEN_GAIN_RATE
            } else {
                -OXYGEN_LOSS_RATE
            };
            self.oxygen = (self.oxygen + rate * dt).clamp(0.0, FULL_OXYGEN);
            if self.oxygen <= 0.0 {
                self.take_damage(SUFFOCATION_DAMAGE * dt);
            }
        }

        self.control(dt, hulls, physics);
    }

    /// Turn the input into a target movement and run the animation.
    pub fn control(&mut self, dt: f32, hulls: &HullSystem, physics: &mut PhysicsWorld) {
        let position = self.position(physics);
        let in_water = hulls.is_in_water(position);
        let in_hull = hulls.hull_at(position).is_some();

        let swimming = in_water && !self.input.force_standing;
        let target_movement = if self.is_incapacitated() {
            Vec2::ZERO
        } else {
            self.target_movement(swimming)
        };
        let input = AnimInput {
            target_movement,
            in_water,
            in_hull,
            force_standing: self.input.force_standing,
            dead: self.dead,
            incapacitated: self.is_incapacitated(),
            remote_controlled: self.input.remote_controlled,
        };
        if self.lod.animates() {
            self.anim.update_anim(dt, &input, &mut self.stun, physics);
        }
    }

    /// Input direction times the speed of the matching animation slot.
    pub fn target_movement(&self, swimming: bool) -> Vec2 {
        let mut direction = self.input.movement;
        if !direction.is_valid() {
            return Vec2::ZERO;
        }
        if direction.length() > 1.0 {
            direction = direction.normalize();
        }
        if !swimming {
            direction.y = 0.0;
        }
        let slot = AnimationType::select(swimming, self.input.run);
        let speed = self.species().animations.get(slot).movement_speed();
        direction * speed
    }

    pub fn remove(&self, physics: &mut PhysicsWorld) {
        self.anim.remove(physics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hull::Hull;

    fn spawn(species: SpeciesParams, position: Vec2) -> (Character, PhysicsWorld) {
        let mut physics = PhysicsWorld::default();
        let character = Character::spawn(
            1,
            Arc::new(species),
            position,
            AnimConfig::default(),
            &mut physics,
        )
        .unwrap();
        (character, physics)
    }

    fn dry_room() -> HullSystem {
        let mut hulls = HullSystem::new();
        hulls.add_hull(Hull::new(Vec2::new(-10.0, 0.0), Vec2::new(20.0, 4.0)));
        hulls
    }

    #[test]
    fn test_target_movement_uses_slot_speed() {
        let (mut character, _) = spawn(SpeciesParams::humanoid(), Vec2::new(0.0, 1.0));
        character.input.movement = Vec2::new(1.0, 1.0);
        let walk = character.target_movement(false);
        assert_eq!(walk.y, 0.0);
        let speed = character.species().animations.walk.movement_speed();
        assert!((walk.x - speed / 2f32.sqrt()).abs() < 1e-5);

        character.input.run = true;
        let run = character.target_movement(false);
        assert!(run.x > walk.x);
        let swim = character.target_movement(true);
        assert!(swim.y > 0.0);
    }

    #[test]
    fn test_drowning_costs_oxygen_then_health() {
        let (mut character, mut physics) = spawn(SpeciesParams::humanoid(), Vec2::new(0.0, 1.0));
        let sea = HullSystem::new();
        for _ in 0..60 {
            character.update(1.0 / 60.0, &sea, &mut physics);
        }
        assert!(character.oxygen < FULL_OXYGEN);
        assert_eq!(character.health, 100.0);

        character.oxygen = 0.0;
        character.update(1.0, &sea, &mut physics);
        assert!(character.health < 100.0);
        assert!(character.is_unconscious());
    }

    #[test]
    fn test_fish_does_not_need_air() {
        let (mut character, mut physics) = spawn(SpeciesParams::fish(), Vec2::new(0.0, 1.0));
        character.update(1.0, &HullSystem::new(), &mut physics);
        assert_eq!(character.oxygen, FULL_OXYGEN);
    }

    #[test]
    fn test_breathable_air_restores_oxygen() {
        let (mut character, mut physics) = spawn(SpeciesParams::humanoid(), Vec2::new(0.0, 1.0));
        character.oxygen = 50.0;
        character.update(1.0 / 60.0, &dry_room(), &mut physics);
        assert!(character.oxygen > 50.0);
    }

    #[test]
    fn test_damage_kills_once() {
        let (mut character, _) = spawn(SpeciesParams::humanoid(), Vec2::ZERO);
        character.selected = Some(4);
        character.take_damage(150.0);
        assert!(character.is_dead());
        assert_eq!(character.selected, None);
        assert!(character.is_incapacitated());
        assert!(!character.is_unconscious());
    }

    #[test]
    fn test_lod_switches_simple_physics() {
        let (mut character, mut physics) = spawn(SpeciesParams::humanoid(), Vec2::new(0.0, 1.0));
        character.set_lod(LodTier::Simple, &mut physics);
        assert!(character.anim().ragdoll().is_simple_physics());
        character.set_lod(LodTier::Dormant, &mut physics);
        assert!(character.anim().ragdoll().is_simple_physics());
        character.set_lod(LodTier::Full, &mut physics);
        assert!(!character.anim().ragdoll().is_simple_physics());
    }
}
