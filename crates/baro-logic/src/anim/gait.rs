//! Gait strategy seam.
//!
//! A gait reads the ragdoll and physics state and writes [`LimbTargets`];
//! the controller applies them to the world. Gaits never fail: missing
//! limbs and bad content are early returns with a neutral pose.

use std::f32::consts::TAU;

use super::{AnimConfig, AnimState};
use crate::error::AnimError;
use crate::limb::{Direction, Limb};
use crate::math::Vec2;
use crate::params::AnimationParams;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::ragdoll::Ragdoll;

/// One per-tick instruction for a limb, by index into the ragdoll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimbCommand {
    /// Enable the limb's pull joint toward a world target.
    Pull { limb: usize, target: Vec2 },
    /// Velocity-damped impulse toward a world target.
    MoveTo { limb: usize, target: Vec2, force: f32 },
    /// Torque toward an angle; without `wrap` the raw difference is used.
    Rotate {
        limb: usize,
        angle: f32,
        torque: f32,
        wrap: bool,
    },
    Torque { limb: usize, torque: f32 },
    /// Force, optionally applied at a world point.
    Force {
        limb: usize,
        force: Vec2,
        at: Option<Vec2>,
    },
}

/// Output of one gait step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimbTargets {
    pub collider_velocity: Option<Vec2>,
    pub collider_angular_velocity: Option<f32>,
    pub collider_fixed_rotation: Option<bool>,
    /// Smooth-rotate target and torque for the collider.
    pub collider_rotation: Option<(f32, f32)>,
    pub commands: Vec<LimbCommand>,
}

impl LimbTargets {
    pub fn clear(&mut self) {
        self.collider_velocity = None;
        self.collider_angular_velocity = None;
        self.collider_fixed_rotation = None;
        self.collider_rotation = None;
        self.commands.clear();
    }

    pub fn push(&mut self, command: LimbCommand) {
        self.commands.push(command);
    }

    /// Commands addressed to one limb.
    pub fn for_limb(&self, limb: usize) -> impl Iterator<Item = &LimbCommand> {
        self.commands.iter().filter(move |c| c.limb() == limb)
    }

    /// Write the targets into the physics world. Severed limbs are skipped.
    pub fn apply(&self, ragdoll: &Ragdoll, physics: &mut PhysicsWorld) {
        let collider = physics.body_mut(ragdoll.collider());
        if let Some(fixed) = self.collider_fixed_rotation {
            collider.fixed_rotation = fixed;
        }
        if let Some(velocity) = self.collider_velocity.filter(|v| v.is_valid()) {
            collider.linear_velocity = velocity;
        }
        if let Some(angular) = self.collider_angular_velocity.filter(|a| a.is_finite()) {
            collider.angular_velocity = angular;
        }
        if let Some((angle, torque)) = self.collider_rotation {
            collider.smooth_rotate(angle, torque, true);
        }

        for command in &self.commands {
            let Some(limb) = ragdoll.limbs().get(command.limb()) else {
                continue;
            };
            if limb.is_severed() {
                continue;
            }
            let body = physics.body_mut(limb.body);
            match *command {
                LimbCommand::Pull { target, .. } => {
                    if target.is_valid() {
                        body.pull_joint.enabled = true;
                        body.pull_joint.target = target;
                    }
                }
                LimbCommand::MoveTo { target, force, .. } => body.move_to_pos(target, force, None),
                LimbCommand::Rotate {
                    angle, torque, wrap, ..
                } => body.smooth_rotate(angle, torque, wrap),
                LimbCommand::Torque { torque, .. } => body.apply_torque(torque),
                LimbCommand::Force { force, at, .. } => match at {
                    Some(point) => body.apply_force_at(force, point),
                    None => body.apply_force(force),
                },
            }
        }
    }
}

impl LimbCommand {
    pub fn limb(&self) -> usize {
        match *self {
            LimbCommand::Pull { limb, .. }
            | LimbCommand::MoveTo { limb, .. }
            | LimbCommand::Rotate { limb, .. }
            | LimbCommand::Torque { limb, .. }
            | LimbCommand::Force { limb, .. } => limb,
        }
    }
}

/// Everything a gait may read, plus the targets it writes.
pub struct GaitContext<'a> {
    pub dt: f32,
    /// Id of the owning character, for error reports.
    pub owner: u32,
    pub state: &'a mut AnimState,
    pub params: &'a AnimationParams,
    pub joint_scale: f32,
    pub ragdoll: &'a Ragdoll,
    pub physics: &'a PhysicsWorld,
    pub config: &'a AnimConfig,
    pub targets: &'a mut LimbTargets,
}

impl GaitContext<'_> {
    pub fn dir(&self) -> Direction {
        self.ragdoll.dir()
    }

    pub fn report(&mut self, error: &AnimError) {
        self.state.report(self.owner, error);
    }

    pub fn limb(&self, index: usize) -> &Limb {
        self.ragdoll.limb(index)
    }

    pub fn collider_position(&self) -> Vec2 {
        self.physics.body(self.ragdoll.collider()).position
    }

    pub fn collider_velocity(&self) -> Vec2 {
        self.physics.body(self.ragdoll.collider()).linear_velocity
    }

    /// Rotation of the main limb, used to keep target angles on the same
    /// revolution as the body.
    pub fn main_rotation(&self) -> f32 {
        self.ragdoll.main_limb().rotation(self.physics)
    }

    /// Queue a rotation that stays on the main limb's revolution.
    pub fn rotate_relative(&mut self, limb: usize, angle: f32, torque: f32) {
        let angle = align_revolutions(angle, self.main_rotation());
        self.targets.push(LimbCommand::Rotate {
            limb,
            angle,
            torque,
            wrap: false,
        });
    }

    /// Where a foot steps from: under its reference joint when it has a
    /// valid one, else at `fallback`, shifted by the step offset.
    pub fn foot_base(&mut self, limb_index: usize, fallback: Vec2) -> Vec2 {
        let (ragdoll, physics) = (self.ragdoll, self.physics);
        let limb = ragdoll.limb(limb_index);
        let mut x = fallback.x;
        if let Some(index) = limb.ref_joint_index {
            let joints = ragdoll.joints();
            match joints.get(index) {
                Some(joint) => x = physics.joint_anchor_a(joint.handle).x,
                None => {
                    let error = AnimError::ReferenceJointOutOfRange {
                        limb: limb.limb_type,
                        index,
                        joint_count: joints.len(),
                    };
                    self.report(&error);
                }
            }
        }
        let offset = limb.step_offset;
        Vec2::new(x + offset.x * ragdoll.dir().sign(), fallback.y + offset.y)
    }
}

/// Locomotion strategy of a species.
pub trait Gait {
    /// Grounded walk or run.
    fn walk(&mut self, ctx: &mut GaitContext<'_>);
    /// Swimming.
    fn swim(&mut self, ctx: &mut GaitContext<'_>);
    /// Death twitch. An error halts the death timer of this character.
    fn dying(&mut self, _ctx: &mut GaitContext<'_>) -> Result<(), AnimError> {
        Ok(())
    }
    /// Act on a grabbed character.
    fn drag(&mut self, ctx: &mut DragContext<'_>, prey: &PreyView) -> DragOutcome;
}

/// Context for acting on another character's bodies.
pub struct DragContext<'a> {
    pub dt: f32,
    pub owner: u32,
    pub state: &'a mut AnimState,
    pub ragdoll: &'a Ragdoll,
    pub physics: &'a mut PhysicsWorld,
    pub config: &'a AnimConfig,
}

/// The parts of a grabbed character a gait may push around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreyView {
    pub main_limb: BodyHandle,
    pub collider: BodyHandle,
    pub mass: f32,
}

impl PreyView {
    pub fn of(ragdoll: &Ragdoll, physics: &PhysicsWorld) -> Self {
        Self {
            main_limb: ragdoll.main_limb().body,
            collider: ragdoll.collider(),
            mass: ragdoll.mass(physics),
        }
    }
}

/// Result of one drag tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Holding,
    /// A bite landed this tick: damage the prey and tear off a limb.
    Bite,
    /// The grab ended; clear the selection.
    Release,
}

/// Shift `angle` by whole turns so it is within one turn of `reference`.
pub fn align_revolutions(angle: f32, reference: f32) -> f32 {
    let turns = ((reference - angle) / TAU).trunc();
    if turns.is_finite() {
        angle + turns * TAU
    } else {
        angle
    }
}

/// Parametric step cycle: `(cos(phase)·x·3, sin(phase)·y·2)`.
pub fn step_cycle(walk_pos: f32, step_size: Vec2) -> Vec2 {
    Vec2::new(
        walk_pos.cos() * step_size.x * 3.0,
        walk_pos.sin() * step_size.y * 2.0,
    )
}

/// Foot targets for a step: the left foot takes `+x`, the right `-x`, and
/// each lifts only on its half of the cycle.
pub fn foot_step_targets(base: Vec2, step: Vec2, drift: f32, left: bool) -> Vec2 {
    if left {
        base + Vec2::new(step.x + drift, step.y.max(0.0))
    } else {
        base + Vec2::new(-step.x + drift, (-step.y).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_revolutions() {
        assert!((align_revolutions(0.5, 0.0) - 0.5).abs() < 1e-6);
        let a = align_revolutions(0.5, 4.0 * TAU + 0.2);
        assert!((a - (0.5 + 4.0 * TAU)).abs() < 1e-4);
        let b = align_revolutions(0.5, -3.0 * TAU);
        assert!(((-3.0 * TAU) - b).abs() <= TAU);
    }

    #[test]
    fn test_step_cycle_extremes() {
        let size = Vec2::new(0.3, 0.15);
        let s = step_cycle(0.0, size);
        assert!((s.x - 0.9).abs() < 1e-6);
        assert!(s.y.abs() < 1e-6);
        let s = step_cycle(std::f32::consts::FRAC_PI_2, size);
        assert!((s.y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_feet_alternate() {
        let step = Vec2::new(0.5, 0.2);
        let left = foot_step_targets(Vec2::ZERO, step, 0.0, true);
        let right = foot_step_targets(Vec2::ZERO, step, 0.0, false);
        assert_eq!(left, Vec2::new(0.5, 0.2));
        assert_eq!(right, Vec2::new(-0.5, 0.0));
    }
}
