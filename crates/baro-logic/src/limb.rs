//! Runtime limbs and the joints that link them.
//!
//! A limb owns one physics body. A joint references two limbs by index and
//! owns one revolute constraint. Severing is one-way: a severed joint never
//! applies force again, and limbs cut off from the main limb become free
//! bodies that the gaits skip.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::params::LimbType;
use crate::physics::{BodyHandle, JointHandle, PhysicsWorld};

/// Facing of a character. Ragdolls are authored facing right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// `1.0` for right, `-1.0` for left.
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Mirror an authored (right-facing) local vector into this facing.
    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(v.x * self.sign(), v.y)
    }
}

/// One body segment of a ragdoll.
#[derive(Debug, Clone, PartialEq)]
pub struct Limb {
    /// Id from the ragdoll params; foot angle maps are keyed by it.
    pub id: u32,
    pub limb_type: LimbType,
    pub body: BodyHandle,
    /// Local mouth offset (scaled, right-facing).
    pub mouth_pos: Option<Vec2>,
    /// Step target offset (scaled, right-facing).
    pub step_offset: Vec2,
    /// Index into the ragdoll's joint list. Not validated at build time.
    pub ref_joint_index: Option<usize>,
    pub steer_force: f32,
    /// Mirrored when the character turns around.
    pub flip: bool,
    /// Sprite orientation in radians.
    pub orientation: f32,
    pub constant_torque: f32,
    /// Radians.
    pub constant_angle: f32,
    /// Accumulated damage on this body part.
    pub damage: f32,
    pub(crate) severed: bool,
}

impl Limb {
    pub fn is_severed(&self) -> bool {
        self.severed
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Vec2 {
        physics.body(self.body).position
    }

    pub fn rotation(&self, physics: &PhysicsWorld) -> f32 {
        physics.body(self.body).rotation
    }

    pub fn mass(&self, physics: &PhysicsWorld) -> f32 {
        physics.body(self.body).mass
    }

    /// World position of the pull joint anchor on this limb.
    pub fn pull_anchor(&self, physics: &PhysicsWorld) -> Vec2 {
        let body = physics.body(self.body);
        body.world_point(body.pull_joint.local_anchor)
    }

    /// World position of the mouth, if the limb has one.
    pub fn mouth_world(&self, physics: &PhysicsWorld, dir: Direction) -> Option<Vec2> {
        self.mouth_pos
            .map(|m| physics.body(self.body).world_point(dir.apply(m)))
    }
}

/// A motorized, angle-limited link between two limbs.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbJoint {
    pub handle: JointHandle,
    /// Index of the first limb in the ragdoll.
    pub limb_a: usize,
    /// Index of the second limb in the ragdoll.
    pub limb_b: usize,
    pub can_be_severed: bool,
    pub(crate) severed: bool,
}

impl LimbJoint {
    pub fn is_severed(&self) -> bool {
        self.severed
    }

    /// Disable the constraint for good. The rapier joint is dropped at the
    /// next step.
    pub(crate) fn sever(&mut self, physics: &mut PhysicsWorld) {
        self.severed = true;
        physics.joint_mut(self.handle).enabled = false;
    }
}

/// Transform of one limb, as read by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimbTransform {
    pub limb_id: u32,
    pub position: Vec2,
    pub rotation: f32,
    pub severed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{RevoluteJoint, RigidBody, Shape};

    #[test]
    fn test_direction_mirror() {
        let v = Vec2::new(0.3, 0.1);
        assert_eq!(Direction::Right.apply(v), v);
        assert_eq!(Direction::Left.apply(v), Vec2::new(-0.3, 0.1));
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }

    #[test]
    fn test_sever_disables_constraint() {
        let mut physics = PhysicsWorld::default();
        let a = physics.add_body(RigidBody::new(Shape::Circle { radius: 0.1 }, 1.0, Vec2::ZERO));
        let b = physics.add_body(RigidBody::new(Shape::Circle { radius: 0.1 }, 1.0, Vec2::UNIT_X));
        let handle = physics.add_joint(RevoluteJoint::new(a, b, Vec2::ZERO, Vec2::ZERO));
        physics.step(crate::physics::NOMINAL_STEP);
        assert!(physics.is_joint_simulated(handle));
        let mut joint = LimbJoint {
            handle,
            limb_a: 0,
            limb_b: 1,
            can_be_severed: true,
            severed: false,
        };
        joint.sever(&mut physics);
        assert!(joint.is_severed());
        assert!(!physics.joint(handle).enabled);
        physics.step(crate::physics::NOMINAL_STEP);
        assert!(!physics.is_joint_simulated(handle));
    }
}
