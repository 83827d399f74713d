//! Per-character animation controller.
//!
//! One fixed step of [`AnimController::update_anim`] runs, in order:
//! 1. Dead or incapacitated: hand the body to the ragdoll (collider off,
//!    tracking the main limb), play the death twitch, return
//! 2. Re-enable the collider above the lowest limb if it was off
//! 3. Reset pull joints and turn the strongest impact into stun
//! 4. Swim gait in water, else stand the collider up and walk
//! 5. Stop here in simple physics
//! 6. Decide facing and flip after the debounce
//!
//! Dragging a grabbed character is a separate call
//! ([`AnimController::drag_character`]) because it needs the other
//! character's bodies.

pub mod config;
pub mod fish;
pub mod gait;
pub mod humanoid;

use std::sync::Arc;

pub use config::AnimConfig;
pub use fish::FishGait;
pub use gait::{
    DragContext, DragOutcome, Gait, GaitContext, LimbCommand, LimbTargets, PreyView,
};
pub use humanoid::HumanoidGait;

use crate::content::{BodyPlan, SpeciesParams};
use crate::error::{AnimError, ContentError};
use crate::limb::Direction;
use crate::math::{self, Vec2};
use crate::params::{AnimationParams, AnimationType, RagdollParams};
use crate::physics::PhysicsWorld;
use crate::ragdoll::Ragdoll;

/// What the owning character feeds the controller each step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimInput {
    /// Desired velocity in simulation units per second.
    pub target_movement: Vec2,
    pub in_water: bool,
    pub in_hull: bool,
    pub force_standing: bool,
    pub dead: bool,
    /// Unconscious or stunned.
    pub incapacitated: bool,
    /// Controlled by a remote peer; turns around without debounce.
    pub remote_controlled: bool,
}

/// Mutable animation state of one character.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimState {
    /// Gait cycle phase in `[0, 2π)`.
    pub walk_pos: f32,
    pub movement: Vec2,
    pub target_movement: Vec2,
    pub target_dir: Option<Direction>,
    pub flip_timer: f32,
    /// Skip updates entirely (editor pause).
    pub frozen: bool,
    pub in_water: bool,
    pub animation: AnimationType,
    /// Strongest impact above tolerance since the last update.
    pub strongest_impact: f32,
    pub death_timer: f32,
    /// The death twitch hit bad content and stopped for good.
    pub death_halted: bool,
    pub eat_timer: f32,
    reported: u8,
}

impl Default for AnimState {
    fn default() -> Self {
        Self {
            walk_pos: 0.0,
            movement: Vec2::ZERO,
            target_movement: Vec2::ZERO,
            target_dir: None,
            flip_timer: 0.0,
            frozen: false,
            in_water: false,
            animation: AnimationType::Walk,
            strongest_impact: 0.0,
            death_timer: 0.0,
            death_halted: false,
            eat_timer: 0.0,
            reported: 0,
        }
    }
}

impl AnimState {
    /// Log an error the first time this kind occurs for the character.
    pub fn report(&mut self, owner: u32, error: &AnimError) {
        let bit = error.report_bit();
        if self.reported & bit == 0 {
            self.reported |= bit;
            log::error!("character {}: {}", owner, error);
        }
    }

    pub fn has_reported(&self, error: &AnimError) -> bool {
        self.reported & error.report_bit() != 0
    }

    /// Advance the gait phase, keeping it in `[0, 2π)`.
    pub fn advance_walk_pos(&mut self, amount: f32) {
        self.walk_pos = math::wrap_angle_two_pi(self.walk_pos + math::valid_or_zero(amount));
    }
}

/// The gait strategy of a body plan.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeciesGait {
    Fish(FishGait),
    Humanoid(HumanoidGait),
}

impl SpeciesGait {
    pub fn for_plan(plan: BodyPlan) -> Self {
        match plan {
            BodyPlan::Fish => SpeciesGait::Fish(FishGait::default()),
            BodyPlan::Humanoid => SpeciesGait::Humanoid(HumanoidGait::default()),
        }
    }
}

impl Gait for SpeciesGait {
    fn walk(&mut self, ctx: &mut GaitContext<'_>) {
        match self {
            SpeciesGait::Fish(g) => g.walk(ctx),
            SpeciesGait::Humanoid(g) => g.walk(ctx),
        }
    }

    fn swim(&mut self, ctx: &mut GaitContext<'_>) {
        match self {
            SpeciesGait::Fish(g) => g.swim(ctx),
            SpeciesGait::Humanoid(g) => g.swim(ctx),
        }
    }

    fn dying(&mut self, ctx: &mut GaitContext<'_>) -> Result<(), AnimError> {
        match self {
            SpeciesGait::Fish(g) => g.dying(ctx),
            SpeciesGait::Humanoid(g) => g.dying(ctx),
        }
    }

    fn drag(&mut self, ctx: &mut DragContext<'_>, prey: &PreyView) -> DragOutcome {
        match self {
            SpeciesGait::Fish(g) => g.drag(ctx, prey),
            SpeciesGait::Humanoid(g) => g.drag(ctx, prey),
        }
    }
}

#[derive(Clone, Copy)]
enum Locomotion {
    Walk,
    Swim,
}

/// Drives one character's ragdoll from its species parameters.
#[derive(Debug, Clone)]
pub struct AnimController {
    owner: u32,
    species: Arc<SpeciesParams>,
    ragdoll: Ragdoll,
    gait: SpeciesGait,
    state: AnimState,
    config: AnimConfig,
    targets: LimbTargets,
    dying_targets: LimbTargets,
}

impl AnimController {
    /// Build the ragdoll with its collider centered on `position`.
    pub fn new(
        owner: u32,
        species: Arc<SpeciesParams>,
        position: Vec2,
        config: AnimConfig,
        physics: &mut PhysicsWorld,
    ) -> Result<Self, ContentError> {
        let ragdoll = Ragdoll::build(&species.name, &species.ragdoll, position, physics)?;
        Ok(Self {
            owner,
            gait: SpeciesGait::for_plan(species.body_plan),
            species,
            ragdoll,
            state: AnimState::default(),
            config,
            targets: LimbTargets::default(),
            dying_targets: LimbTargets::default(),
        })
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn ragdoll(&self) -> &Ragdoll {
        &self.ragdoll
    }

    pub fn ragdoll_mut(&mut self) -> &mut Ragdoll {
        &mut self.ragdoll
    }

    pub fn state(&self) -> &AnimState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AnimState {
        &mut self.state
    }

    pub fn species(&self) -> &SpeciesParams {
        &self.species
    }

    pub fn config(&self) -> &AnimConfig {
        &self.config
    }

    pub fn dir(&self) -> Direction {
        self.ragdoll.dir()
    }

    /// Targets of the last gait step.
    pub fn limb_targets(&self) -> &LimbTargets {
        &self.targets
    }

    /// Parameters of the active animation slot.
    pub fn current_params(&self) -> &AnimationParams {
        self.species.animations.get(self.state.animation)
    }

    /// Editable parameters. The first call detaches this character from
    /// the species data shared with others. Ragdoll geometry edits take
    /// effect at the next [`AnimController::recreate`].
    pub fn params_mut(&mut self) -> &mut SpeciesParams {
        Arc::make_mut(&mut self.species)
    }

    /// Replace the ragdoll parameters and rebuild the body.
    pub fn set_ragdoll_params(
        &mut self,
        params: RagdollParams,
        physics: &mut PhysicsWorld,
    ) -> Result<(), ContentError> {
        Arc::make_mut(&mut self.species).ragdoll = params;
        self.recreate(physics)
    }

    /// Rebuild the ragdoll from the current parameters.
    pub fn recreate(&mut self, physics: &mut PhysicsWorld) -> Result<(), ContentError> {
        self.ragdoll
            .rebuild(&self.species.name, &self.species.ragdoll, physics)?;
        if self.state.frozen {
            self.ragdoll.set_frozen(true, physics);
        }
        Ok(())
    }

    /// Pause the character for the editor: no animation, and its bodies
    /// drop out of the physics step until unfrozen.
    pub fn set_frozen(&mut self, frozen: bool, physics: &mut PhysicsWorld) {
        if frozen == self.state.frozen {
            return;
        }
        self.state.frozen = frozen;
        self.ragdoll.set_frozen(frozen, physics);
        log::debug!("character {} frozen: {}", self.owner, frozen);
    }

    pub fn is_frozen(&self) -> bool {
        self.state.frozen
    }

    pub fn set_simple_physics(&mut self, enabled: bool, physics: &mut PhysicsWorld) {
        self.ragdoll.set_simple_physics(enabled, physics);
    }

    /// Animation slot for the given locomotion and intended movement.
    pub fn select_animation(&self, swimming: bool, target_movement: Vec2) -> AnimationType {
        let set = &self.species.animations;
        let (slow, speed) = if swimming {
            (set.swim_slow.movement_speed(), target_movement.length())
        } else {
            (set.walk.movement_speed(), target_movement.x.abs())
        };
        AnimationType::select(swimming, speed > slow + 0.01)
    }

    /// Run one fixed animation step. `stun` is the owner's stun timer.
    pub fn update_anim(
        &mut self,
        dt: f32,
        input: &AnimInput,
        stun: &mut f32,
        physics: &mut PhysicsWorld,
    ) {
        if self.state.frozen || !(dt > 0.0) {
            return;
        }
        self.state.target_movement = if input.target_movement.is_valid() {
            input.target_movement
        } else {
            Vec2::ZERO
        };
        self.state.in_water = input.in_water;
        self.ragdoll.apply_remote_correction(
            self.config.remote_lerp,
            self.config.remote_teleport_distance,
            physics,
        );

        if input.dead || input.incapacitated {
            self.update_limp(dt, input.dead, physics);
            return;
        }
        self.state.death_timer = 0.0;
        self.state.death_halted = false;

        if !physics.body(self.ragdoll.collider()).enabled {
            self.enable_collider(physics);
        }

        self.ragdoll.reset_pull_joints(physics);
        if self.state.strongest_impact > 0.0 {
            let impact_stun = (self.state.strongest_impact * self.config.impact_stun_factor)
                .min(self.config.impact_stun_cap);
            *stun = stun.max(impact_stun);
            self.state.strongest_impact = 0.0;
        }

        let swimming = input.in_water && !input.force_standing;
        self.state.animation = self.select_animation(swimming, self.state.target_movement);
        self.targets.clear();
        if swimming {
            self.targets.collider_fixed_rotation = Some(false);
            self.run_gait(dt, Locomotion::Swim, physics);
        } else if self.species.ragdoll.can_enter_submarine && (input.in_hull || input.force_standing)
        {
            self.stand_upright(physics);
            self.run_gait(dt, Locomotion::Walk, physics);
        }
        self.targets.apply(&self.ragdoll, physics);

        if self.ragdoll.is_simple_physics() {
            return;
        }
        self.update_direction(dt, input, swimming, physics);
    }

    /// Read last step's impacts and carry simple-physics limbs along.
    /// Call after the physics step.
    pub fn post_step(&mut self, physics: &mut PhysicsWorld) {
        if self.state.frozen {
            return;
        }
        let impact = self.ragdoll.strongest_impact(physics) - self.config.impact_tolerance;
        if impact > self.state.strongest_impact {
            self.state.strongest_impact = impact;
        }
        self.ragdoll.follow_collider(physics);
    }

    /// Act on a grabbed character for one step.
    pub fn drag_character(
        &mut self,
        dt: f32,
        prey: &PreyView,
        physics: &mut PhysicsWorld,
    ) -> DragOutcome {
        if self.state.frozen || self.ragdoll.is_simple_physics() {
            return DragOutcome::Holding;
        }
        let mut ctx = DragContext {
            dt,
            owner: self.owner,
            state: &mut self.state,
            ragdoll: &self.ragdoll,
            physics,
            config: &self.config,
        };
        let outcome = self.gait.drag(&mut ctx, prey);
        if outcome == DragOutcome::Release {
            self.state.eat_timer = 0.0;
        }
        outcome
    }

    /// Turn around now, mirroring positions where the animation asks for it.
    pub fn flip(&mut self, mirror: bool, physics: &mut PhysicsWorld) {
        self.ragdoll.flip(physics);
        if mirror {
            self.ragdoll.mirror(physics);
        }
        self.state.flip_timer = 0.0;
        log::debug!("character {} turned {:?}", self.owner, self.ragdoll.dir());
    }

    pub fn remove(&self, physics: &mut PhysicsWorld) {
        self.ragdoll.remove(physics);
    }

    fn run_gait(&mut self, dt: f32, locomotion: Locomotion, physics: &PhysicsWorld) {
        let animation = self.state.animation;
        let mut ctx = GaitContext {
            dt,
            owner: self.owner,
            state: &mut self.state,
            params: self.species.animations.get(animation),
            joint_scale: self.ragdoll.joint_scale(),
            ragdoll: &self.ragdoll,
            physics,
            config: &self.config,
            targets: &mut self.targets,
        };
        match locomotion {
            Locomotion::Walk => self.gait.walk(&mut ctx),
            Locomotion::Swim => self.gait.swim(&mut ctx),
        }
    }

    /// Ragdoll takeover: the collider follows the main limb and, if dead,
    /// the death twitch plays until its timer runs out.
    fn update_limp(&mut self, dt: f32, dead: bool, physics: &mut PhysicsWorld) {
        let main = physics.body(self.ragdoll.main_limb().body);
        let (position, velocity) = (main.position, main.linear_velocity);
        let collider = physics.body_mut(self.ragdoll.collider());
        collider.enabled = false;
        let rotation = collider.rotation;
        collider.set_transform(position, rotation);
        collider.linear_velocity = velocity;
        self.ragdoll.reset_pull_joints(physics);

        if !dead || self.state.death_halted || self.state.death_timer >= self.config.death_duration {
            return;
        }
        self.dying_targets.clear();
        let animation = self.state.animation;
        let mut ctx = GaitContext {
            dt,
            owner: self.owner,
            state: &mut self.state,
            params: self.species.animations.get(animation),
            joint_scale: self.ragdoll.joint_scale(),
            ragdoll: &self.ragdoll,
            physics: &*physics,
            config: &self.config,
            targets: &mut self.dying_targets,
        };
        match self.gait.dying(&mut ctx) {
            Ok(()) => {
                self.dying_targets.apply(&self.ragdoll, physics);
                self.state.death_timer += dt;
            }
            Err(error) => {
                self.state.report(self.owner, &error);
                self.state.death_halted = true;
            }
        }
    }

    /// Turn the collider back on, lifted clear of the lowest limb.
    fn enable_collider(&mut self, physics: &mut PhysicsWorld) {
        let lowest = self
            .ragdoll
            .lowest_limb(physics)
            .map(|i| self.ragdoll.limb(i).position(physics).y);
        let collider = physics.body_mut(self.ragdoll.collider());
        if let Some(lowest_y) = lowest {
            let half = collider.shape.extent_below(0.0);
            let position = Vec2::new(collider.position.x, collider.position.y.max(lowest_y + half));
            collider.set_transform(position, 0.0);
        }
        collider.enabled = true;
        collider.linear_velocity = Vec2::ZERO;
    }

    /// Spin the collider toward its standing angle, locking it once there.
    fn stand_upright(&mut self, physics: &PhysicsWorld) {
        let stand = math::valid_or_zero(self.species.ragdoll.collider_stand_angle.to_radians())
            * self.ragdoll.dir().sign();
        let rotation = physics.body(self.ragdoll.collider()).rotation;
        let diff = math::shortest_angle(rotation, stand);
        if diff.abs() > self.config.upright_epsilon {
            self.targets.collider_fixed_rotation = Some(false);
            self.targets.collider_angular_velocity = Some(diff * self.config.upright_gain);
        } else {
            self.targets.collider_fixed_rotation = Some(true);
        }
    }

    fn update_direction(
        &mut self,
        dt: f32,
        input: &AnimInput,
        swimming: bool,
        physics: &mut PhysicsWorld,
    ) {
        let params = self.species.animations.get(self.state.animation);
        if !params.can_flip() {
            self.state.target_dir = None;
            self.state.flip_timer = 0.0;
            return;
        }
        let mirror = params.mirrors();
        let rotates = params.swim().map_or(false, |s| s.rotate_towards_movement);
        let intent = if !swimming || mirror || !rotates {
            self.intent_from_movement()
        } else {
            self.intent_from_rotation(physics)
        };
        if intent.is_some() {
            self.state.target_dir = intent;
        }

        match self.state.target_dir {
            Some(target) if target != self.ragdoll.dir() => {
                self.state.flip_timer += dt;
                if input.remote_controlled || self.state.flip_timer >= self.config.flip_debounce {
                    self.flip(mirror || !swimming, physics);
                }
            }
            _ => self.state.flip_timer = 0.0,
        }
    }

    fn intent_from_movement(&self) -> Option<Direction> {
        let target = self.state.target_movement;
        let min = self.config.flip_min_movement;
        let dominance = target.y.abs() * self.config.flip_dominance;
        if target.x > min && target.x > dominance {
            Some(Direction::Right)
        } else if target.x < -min && target.x < -dominance {
            Some(Direction::Left)
        } else {
            None
        }
    }

    /// Swimmers face the way their collider points.
    fn intent_from_rotation(&self, physics: &PhysicsWorld) -> Option<Direction> {
        let rotation = physics.body(self.ragdoll.collider()).rotation;
        let degrees = math::wrap_angle_two_pi(rotation).to_degrees();
        let (left, right) = (self.config.swim_left_range, self.config.swim_right_range);
        if degrees > left.0 && degrees < left.1 {
            Some(Direction::Left)
        } else if degrees > right.0 && degrees < right.1 {
            Some(Direction::Right)
        } else {
            None
        }
    }
}
