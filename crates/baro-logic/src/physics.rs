//! Limb and collider bodies simulated by rapier2d.
//!
//! Gaits read and write plain [`RigidBody`] records. A single
//! [`PhysicsWorld::step`] per tick moves them through rapier:
//! 1. Pull joints turn into impulses on the record velocities
//! 2. Records are written to the rapier bodies (transform, velocity,
//!    accumulated force, gravity scale, damping, enabled)
//! 3. Joint descriptions that changed since the last step are re-inserted
//!    into the impulse joint set; disabled ones are removed from it
//! 4. One pipeline step
//! 5. Transforms and velocities are read back and floor contacts report
//!    the landing speed
//!
//! Limbs only collide with floors, never with each other. Bodies and joints
//! live in ordered maps keyed by creation order, so every pass visits them
//! in the same order and removal frees them for good.

use std::collections::BTreeMap;
use std::fmt;

use rapier2d::na::{Point2, UnitComplex, Vector2};
use rapier2d::prelude as rp;
use serde::{Deserialize, Serialize};

use crate::math::{self, Vec2};

/// Step length the tuning constants assume (60 Hz).
pub const NOMINAL_STEP: f32 = 1.0 / 60.0;

/// Gain of the pull joint spring (1/s).
const PULL_STIFFNESS: f32 = 20.0;
/// Fraction of the pull joint velocity error removed per step.
const PULL_SOFTNESS: f32 = 0.5;
/// Linear drag applied to submerged bodies (1/s).
const WATER_DRAG: f32 = 1.5;
/// Angular drag applied to submerged bodies (1/s).
const WATER_ANGULAR_DRAG: f32 = 2.0;
/// Damping of the joint velocity motors.
const MOTOR_DAMPING: f32 = 60.0;
/// Depth of the static slab under each floor segment.
const FLOOR_THICKNESS: f32 = 0.5;
const FLOOR_FRICTION: f32 = 1.0;
/// Smallest collider half extent handed to rapier.
const MIN_EXTENT: f32 = 1e-3;

const LIMB_GROUP: rp::Group = rp::Group::GROUP_1;
const FLOOR_GROUP: rp::Group = rp::Group::GROUP_2;

/// Key of a body in a [`PhysicsWorld`]. Never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Key of a revolute joint in a [`PhysicsWorld`]. Never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointHandle(pub u32);

/// Collision shape of a body, centered on the body origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
    /// Vertical capsule: `height` is the distance between the cap centers.
    Capsule { radius: f32, height: f32 },
}

impl Shape {
    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Rect { width, height } => width * height,
            Shape::Capsule { radius, height } => {
                std::f32::consts::PI * radius * radius + 2.0 * radius * height
            }
        }
    }

    /// Rotational inertia for the given mass.
    pub fn inertia(&self, mass: f32) -> f32 {
        match *self {
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
            Shape::Rect { width, height } => mass * (width * width + height * height) / 12.0,
            Shape::Capsule { radius, height } => {
                let w = radius * 2.0;
                let h = height + radius * 2.0;
                mass * (w * w + h * h) / 12.0
            }
        }
    }

    /// Distance from the center to the lowest point at the given rotation.
    pub fn extent_below(&self, rotation: f32) -> f32 {
        let (s, c) = rotation.sin_cos();
        match *self {
            Shape::Circle { radius } => radius,
            Shape::Rect { width, height } => (c.abs() * height + s.abs() * width) * 0.5,
            Shape::Capsule { radius, height } => c.abs() * height * 0.5 + radius,
        }
    }

    /// Same shape with every dimension multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Shape {
        match *self {
            Shape::Circle { radius } => Shape::Circle {
                radius: radius * factor,
            },
            Shape::Rect { width, height } => Shape::Rect {
                width: width * factor,
                height: height * factor,
            },
            Shape::Capsule { radius, height } => Shape::Capsule {
                radius: radius * factor,
                height: height * factor,
            },
        }
    }

    fn shared(&self) -> rp::SharedShape {
        match *self {
            Shape::Circle { radius } => rp::SharedShape::ball(radius.max(MIN_EXTENT)),
            Shape::Rect { width, height } => rp::SharedShape::cuboid(
                (width * 0.5).max(MIN_EXTENT),
                (height * 0.5).max(MIN_EXTENT),
            ),
            Shape::Capsule { radius, height } => {
                rp::SharedShape::capsule_y((height * 0.5).max(0.0), radius.max(MIN_EXTENT))
            }
        }
    }
}

/// Soft spring pulling a point of a body toward a world-space target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PullJoint {
    pub enabled: bool,
    /// Anchor on the body, in body-local coordinates.
    pub local_anchor: Vec2,
    /// World-space target the anchor is pulled toward.
    pub target: Vec2,
    pub max_force: f32,
}

/// State of one body as the gaits see it. Written into rapier before the
/// step and refreshed from it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub shape: Shape,
    pub position: Vec2,
    pub rotation: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub mass: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
    /// Disabled bodies are not simulated and their joints are inactive.
    pub enabled: bool,
    /// Paused by the editor. Independent of `enabled`, which the LOD and
    /// limp logic toggle.
    pub frozen: bool,
    pub fixed_rotation: bool,
    pub collides_with_floor: bool,
    /// Set by the owner each tick from the hull simulation.
    pub submerged: bool,
    pub pull_joint: PullJoint,
    force: Vec2,
    torque: f32,
    prev_position: Vec2,
    prev_rotation: f32,
    impact: f32,
}

impl RigidBody {
    pub fn new(shape: Shape, mass: f32, position: Vec2) -> Self {
        Self {
            shape,
            position,
            rotation: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass,
            friction: 0.3,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            enabled: true,
            frozen: false,
            fixed_rotation: false,
            collides_with_floor: true,
            submerged: false,
            pull_joint: PullJoint {
                enabled: false,
                local_anchor: Vec2::ZERO,
                target: position,
                max_force: 150.0 * mass.max(0.0),
            },
            force: Vec2::ZERO,
            torque: 0.0,
            prev_position: position,
            prev_rotation: 0.0,
            impact: 0.0,
        }
    }

    /// Whether the body takes part in the next step.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.frozen
    }

    /// Inverse mass; non-positive or invalid mass behaves as immovable.
    pub fn inv_mass(&self) -> f32 {
        if self.mass > 0.0 && self.mass.is_finite() {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    pub fn inertia(&self) -> f32 {
        self.shape.inertia(self.mass)
    }

    pub fn inv_inertia(&self) -> f32 {
        let inertia = self.inertia();
        if self.fixed_rotation || inertia <= 0.0 || !inertia.is_finite() {
            0.0
        } else {
            1.0 / inertia
        }
    }

    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position + local.rotate(self.rotation)
    }

    pub fn local_point(&self, world: Vec2) -> Vec2 {
        (world - self.position).rotate(-self.rotation)
    }

    /// Velocity of a world-space point attached to the body.
    pub fn velocity_at(&self, world: Vec2) -> Vec2 {
        self.linear_velocity + (world - self.position).perp() * self.angular_velocity
    }

    pub fn apply_force(&mut self, force: Vec2) {
        if force.is_valid() {
            self.force += force;
        }
    }

    pub fn apply_force_at(&mut self, force: Vec2, point: Vec2) {
        if force.is_valid() && point.is_valid() {
            self.force += force;
            self.torque += (point - self.position).cross(force);
        }
    }

    pub fn apply_torque(&mut self, torque: f32) {
        if torque.is_finite() {
            self.torque += torque;
        }
    }

    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if impulse.is_valid() {
            self.linear_velocity += impulse * self.inv_mass();
        }
    }

    pub fn apply_impulse_at(&mut self, impulse: Vec2, point: Vec2) {
        if !impulse.is_valid() || !point.is_valid() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass();
        self.angular_velocity += (point - self.position).cross(impulse) * self.inv_inertia();
    }

    /// Rotate toward `target` with a torque proportional to the remaining angle.
    ///
    /// With `wrap` the shortest way around is taken; without it the raw
    /// difference is used (clamped to half a turn), which lets a limb follow
    /// a parent that has already spun past ±π.
    pub fn smooth_rotate(&mut self, target: f32, force: f32, wrap: bool) {
        if !target.is_finite() {
            return;
        }
        let next = self.rotation + self.angular_velocity * NOMINAL_STEP;
        let angle = if wrap {
            math::shortest_angle(next, target)
        } else {
            (target - next).clamp(-std::f32::consts::PI, std::f32::consts::PI)
        };
        let torque = angle * 60.0 * (force / 100.0);
        self.apply_torque(self.mass * torque);
    }

    /// Impulse toward `target`, damped by the current velocity.
    pub fn move_to_pos(&mut self, target: Vec2, force: f32, pull_from: Option<Vec2>) {
        let pull_pos = pull_from.unwrap_or(self.position);
        let delta = target - pull_pos;
        if !delta.is_valid() || delta.length_squared() > 100.0 * 100.0 {
            return;
        }
        let impulse = (delta * force - self.linear_velocity * 0.5) * self.mass;
        if pull_from.is_some() {
            self.apply_impulse_at(impulse, pull_pos);
        } else {
            self.apply_impulse(impulse);
        }
    }

    /// Move the body without any velocity side effects.
    pub fn set_transform(&mut self, position: Vec2, rotation: f32) {
        if !position.is_valid() || !rotation.is_finite() {
            return;
        }
        self.position = position;
        self.rotation = rotation;
        self.prev_position = position;
        self.prev_rotation = rotation;
    }

    /// Position interpolated between the last two steps.
    pub fn interpolated_position(&self, alpha: f32) -> Vec2 {
        self.prev_position.lerp(self.position, alpha)
    }

    pub fn interpolated_rotation(&self, alpha: f32) -> f32 {
        math::lerp(self.prev_rotation, self.rotation, alpha)
    }

    /// Downward speed the body had when it touched a floor last step.
    pub fn impact(&self) -> f32 {
        self.impact
    }

    pub fn lowest_point(&self) -> f32 {
        self.position.y - self.shape.extent_below(self.rotation)
    }
}

/// Motorized, optionally angle-limited pin joint between two bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteJoint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub limit_enabled: bool,
    /// Radians, measured as rotation of b relative to a.
    pub lower_limit: f32,
    pub upper_limit: f32,
    pub motor_enabled: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,
    pub enabled: bool,
}

impl RevoluteJoint {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, anchor_a: Vec2, anchor_b: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: anchor_a,
            local_anchor_b: anchor_b,
            limit_enabled: false,
            lower_limit: 0.0,
            upper_limit: 0.0,
            motor_enabled: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            enabled: true,
        }
    }

    fn to_rapier(&self) -> rp::RevoluteJoint {
        let mut builder = rp::RevoluteJointBuilder::new()
            .local_anchor1(to_point(self.local_anchor_a))
            .local_anchor2(to_point(self.local_anchor_b))
            .contacts_enabled(false);
        if self.limit_enabled {
            let lower = self.lower_limit.min(self.upper_limit);
            let upper = self.lower_limit.max(self.upper_limit);
            builder = builder.limits([lower, upper]);
        }
        if self.motor_enabled && self.max_motor_torque > 0.0 {
            builder = builder
                .motor_velocity(self.motor_speed, MOTOR_DAMPING)
                .motor_max_force(self.max_motor_torque);
        }
        builder.build()
    }
}

/// Static horizontal floor segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorSegment {
    pub y: f32,
    pub min_x: f32,
    pub max_x: f32,
}

/// Collider properties last written to rapier.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColliderState {
    shape: Shape,
    mass: f32,
    friction: f32,
    collides_with_floor: bool,
}

impl ColliderState {
    fn of(body: &RigidBody) -> Self {
        Self {
            shape: body.shape,
            mass: if body.mass.is_finite() {
                body.mass.max(0.0)
            } else {
                0.0
            },
            friction: body.friction.max(0.0),
            collides_with_floor: body.collides_with_floor,
        }
    }

    fn groups(&self) -> rp::InteractionGroups {
        let filter = if self.collides_with_floor {
            FLOOR_GROUP
        } else {
            rp::Group::NONE
        };
        rp::InteractionGroups::new(LIMB_GROUP, filter)
    }

    fn build(&self) -> rp::Collider {
        rp::ColliderBuilder::new(self.shape.shared())
            .mass(self.mass)
            .friction(self.friction)
            .friction_combine_rule(rp::CoefficientCombineRule::Min)
            .collision_groups(self.groups())
            .build()
    }

    fn write(&self, collider: &mut rp::Collider) {
        collider.set_shape(self.shape.shared());
        collider.set_mass(self.mass);
        collider.set_friction(self.friction);
        collider.set_collision_groups(self.groups());
    }
}

struct BodySlot {
    record: RigidBody,
    handle: rp::RigidBodyHandle,
    collider: rp::ColliderHandle,
    applied: ColliderState,
    rotation_locked: bool,
}

struct JointSlot {
    joint: RevoluteJoint,
    /// Description the rapier joint was built from.
    applied: Option<RevoluteJoint>,
    handle: Option<rp::ImpulseJointHandle>,
}

/// The shared physics world. All limb and joint mutations for a tick must
/// happen before the single [`PhysicsWorld::step`] call.
pub struct PhysicsWorld {
    pub gravity: Vec2,
    bodies: BTreeMap<u32, BodySlot>,
    joints: BTreeMap<u32, JointSlot>,
    next_body: u32,
    next_joint: u32,
    floors: Vec<FloorSegment>,
    rigid_body_set: rp::RigidBodySet,
    collider_set: rp::ColliderSet,
    impulse_joint_set: rp::ImpulseJointSet,
    multibody_joint_set: rp::MultibodyJointSet,
    integration_parameters: rp::IntegrationParameters,
    physics_pipeline: rp::PhysicsPipeline,
    island_manager: rp::IslandManager,
    broad_phase: rp::DefaultBroadPhase,
    narrow_phase: rp::NarrowPhase,
    ccd_solver: rp::CCDSolver,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, -9.81))
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("joints", &self.joints.len())
            .field("floors", &self.floors.len())
            .finish()
    }
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: BTreeMap::new(),
            joints: BTreeMap::new(),
            next_body: 0,
            next_joint: 0,
            floors: Vec::new(),
            rigid_body_set: rp::RigidBodySet::new(),
            collider_set: rp::ColliderSet::new(),
            impulse_joint_set: rp::ImpulseJointSet::new(),
            multibody_joint_set: rp::MultibodyJointSet::new(),
            integration_parameters: rp::IntegrationParameters::default(),
            physics_pipeline: rp::PhysicsPipeline::new(),
            island_manager: rp::IslandManager::new(),
            broad_phase: rp::DefaultBroadPhase::new(),
            narrow_phase: rp::NarrowPhase::new(),
            ccd_solver: rp::CCDSolver::new(),
        }
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        let rigid_body = rp::RigidBodyBuilder::dynamic()
            .translation(to_vector(body.position))
            .rotation(body.rotation)
            .can_sleep(false)
            .build();
        let handle = self.rigid_body_set.insert(rigid_body);
        let applied = ColliderState::of(&body);
        let collider =
            self.collider_set
                .insert_with_parent(applied.build(), handle, &mut self.rigid_body_set);

        let id = self.next_body;
        self.next_body += 1;
        self.bodies.insert(
            id,
            BodySlot {
                record: body,
                handle,
                collider,
                applied,
                rotation_locked: false,
            },
        );
        BodyHandle(id)
    }

    /// Remove a body together with its collider and every joint attached
    /// to it.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        let Some(slot) = self.bodies.remove(&handle.0) else {
            return;
        };
        // rapier drops the attached colliders and joints with the body
        self.rigid_body_set.remove(
            slot.handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.joints
            .retain(|_, j| j.joint.body_a != handle && j.joint.body_b != handle);
    }

    /// # Panics
    ///
    /// If the body was removed.
    pub fn body(&self, handle: BodyHandle) -> &RigidBody {
        &self.bodies[&handle.0].record
    }

    /// # Panics
    ///
    /// If the body was removed.
    pub fn body_mut(&mut self, handle: BodyHandle) -> &mut RigidBody {
        match self.bodies.get_mut(&handle.0) {
            Some(slot) => &mut slot.record,
            None => panic!("body {:?} was removed", handle),
        }
    }

    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle.0)
    }

    pub fn add_joint(&mut self, joint: RevoluteJoint) -> JointHandle {
        let id = self.next_joint;
        self.next_joint += 1;
        self.joints.insert(
            id,
            JointSlot {
                joint,
                applied: None,
                handle: None,
            },
        );
        JointHandle(id)
    }

    pub fn remove_joint(&mut self, handle: JointHandle) {
        if let Some(slot) = self.joints.remove(&handle.0) {
            if let Some(joint) = slot.handle {
                self.impulse_joint_set.remove(joint, true);
            }
        }
    }

    /// # Panics
    ///
    /// If the joint was removed.
    pub fn joint(&self, handle: JointHandle) -> &RevoluteJoint {
        &self.joints[&handle.0].joint
    }

    /// # Panics
    ///
    /// If the joint was removed.
    pub fn joint_mut(&mut self, handle: JointHandle) -> &mut RevoluteJoint {
        match self.joints.get_mut(&handle.0) {
            Some(slot) => &mut slot.joint,
            None => panic!("joint {:?} was removed", handle),
        }
    }

    /// Whether rapier currently holds a constraint for the joint. Becomes
    /// false at the first step after the joint is disabled.
    pub fn is_joint_simulated(&self, handle: JointHandle) -> bool {
        self.joints
            .get(&handle.0)
            .map_or(false, |slot| slot.handle.is_some())
    }

    /// World-space position of a joint's anchor on body A.
    pub fn joint_anchor_a(&self, handle: JointHandle) -> Vec2 {
        let joint = self.joint(handle);
        self.body(joint.body_a).world_point(joint.local_anchor_a)
    }

    /// World-space position of a joint's anchor on body B.
    pub fn joint_anchor_b(&self, handle: JointHandle) -> Vec2 {
        let joint = self.joint(handle);
        self.body(joint.body_b).world_point(joint.local_anchor_b)
    }

    /// Add a static floor: a slab whose top surface is the segment.
    pub fn add_floor(&mut self, floor: FloorSegment) {
        let half_width = ((floor.max_x - floor.min_x) * 0.5).max(MIN_EXTENT);
        let center = Vec2::new(
            (floor.min_x + floor.max_x) * 0.5,
            floor.y - FLOOR_THICKNESS * 0.5,
        );
        let collider = rp::ColliderBuilder::cuboid(half_width, FLOOR_THICKNESS * 0.5)
            .translation(to_vector(center))
            .friction(FLOOR_FRICTION)
            .collision_groups(rp::InteractionGroups::new(FLOOR_GROUP, LIMB_GROUP))
            .build();
        self.collider_set.insert(collider);
        self.floors.push(floor);
    }

    pub fn floors(&self) -> &[FloorSegment] {
        &self.floors
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        self.solve_pull_joints(dt);
        self.write_bodies();
        self.write_joints();

        self.integration_parameters.dt = dt;
        let gravity = to_vector(self.gravity);
        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        self.read_bodies();
    }

    fn solve_pull_joints(&mut self, dt: f32) {
        for slot in self.bodies.values_mut() {
            let body = &mut slot.record;
            if !body.is_active() || !body.pull_joint.enabled || body.inv_mass() <= 0.0 {
                continue;
            }
            let anchor = body.world_point(body.pull_joint.local_anchor);
            let error = body.pull_joint.target - anchor;
            if !error.is_valid() {
                continue;
            }
            let desired = error * PULL_STIFFNESS;
            let mut impulse = (desired - body.velocity_at(anchor)) * (body.mass * PULL_SOFTNESS);
            let max_impulse = body.pull_joint.max_force * dt;
            let len = impulse.length();
            if len > max_impulse && len > 0.0 {
                impulse = impulse * (max_impulse / len);
            }
            body.apply_impulse_at(impulse, anchor);
        }
    }

    fn write_bodies(&mut self) {
        for slot in self.bodies.values_mut() {
            let record = &mut slot.record;
            record.prev_position = record.position;
            record.prev_rotation = record.rotation;
            record.impact = 0.0;

            let state = ColliderState::of(record);
            if state != slot.applied {
                if let Some(collider) = self.collider_set.get_mut(slot.collider) {
                    state.write(collider);
                }
                slot.applied = state;
            }

            let (force, torque) = (record.force, record.torque);
            record.force = Vec2::ZERO;
            record.torque = 0.0;

            let Some(body) = self.rigid_body_set.get_mut(slot.handle) else {
                continue;
            };
            let active = record.is_active();
            if body.is_enabled() != active {
                body.set_enabled(active);
            }
            body.set_translation(to_vector(record.position), false);
            body.set_rotation(UnitComplex::new(record.rotation), false);
            if !active {
                continue;
            }
            if slot.rotation_locked != record.fixed_rotation {
                body.lock_rotations(record.fixed_rotation, true);
                slot.rotation_locked = record.fixed_rotation;
            }
            let (mut linear_damping, mut angular_damping) =
                (record.linear_damping, record.angular_damping);
            // neutral buoyancy cancels gravity in water
            let gravity_scale = if record.submerged {
                linear_damping += WATER_DRAG;
                angular_damping += WATER_ANGULAR_DRAG;
                0.0
            } else {
                record.gravity_scale
            };
            body.set_gravity_scale(gravity_scale, true);
            body.set_linear_damping(linear_damping);
            body.set_angular_damping(angular_damping);
            body.set_linvel(to_vector(record.linear_velocity), true);
            let angvel = if record.fixed_rotation {
                0.0
            } else {
                record.angular_velocity
            };
            body.set_angvel(angvel, true);
            body.reset_forces(true);
            body.reset_torques(true);
            body.add_force(to_vector(force), true);
            body.add_torque(torque, true);
        }
    }

    fn write_joints(&mut self) {
        for slot in self.joints.values_mut() {
            if slot.applied.as_ref() == Some(&slot.joint) {
                continue;
            }
            if let Some(handle) = slot.handle.take() {
                self.impulse_joint_set.remove(handle, true);
            }
            if slot.joint.enabled {
                let a = self.bodies.get(&slot.joint.body_a.0);
                let b = self.bodies.get(&slot.joint.body_b.0);
                if let (Some(a), Some(b)) = (a, b) {
                    slot.handle = Some(self.impulse_joint_set.insert(
                        a.handle,
                        b.handle,
                        slot.joint.to_rapier(),
                        true,
                    ));
                }
            }
            slot.applied = Some(slot.joint.clone());
        }
    }

    fn read_bodies(&mut self) {
        for slot in self.bodies.values_mut() {
            let record = &mut slot.record;
            if !record.is_active() {
                continue;
            }
            let Some(body) = self.rigid_body_set.get(slot.handle) else {
                continue;
            };
            let pre_velocity = record.linear_velocity;
            record.position = from_vector(body.translation());
            // keep the record's rotation continuous past ±π
            record.rotation += math::shortest_angle(record.rotation, body.rotation().angle());
            record.linear_velocity = from_vector(body.linvel());
            record.angular_velocity = body.angvel();

            let touching = self
                .narrow_phase
                .contact_pairs_with(slot.collider)
                .any(|pair| pair.has_any_active_contact);
            if touching {
                record.impact = (-pre_velocity.y).max(0.0);
            }
        }
    }
}

fn to_vector(v: Vec2) -> Vector2<f32> {
    Vector2::new(v.x, v.y)
}

fn to_point(v: Vec2) -> Point2<f32> {
    Point2::new(v.x, v.y)
}

fn from_vector(v: &Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(world: &mut PhysicsWorld, pos: Vec2) -> BodyHandle {
        world.add_body(RigidBody::new(Shape::Circle { radius: 0.1 }, 1.0, pos))
    }

    fn floored() -> PhysicsWorld {
        let mut world = PhysicsWorld::default();
        world.add_floor(FloorSegment {
            y: 0.0,
            min_x: -10.0,
            max_x: 10.0,
        });
        world
    }

    #[test]
    fn test_body_falls_and_rests_on_floor() {
        let mut world = floored();
        let b = ball(&mut world, Vec2::new(0.0, 1.0));
        for _ in 0..240 {
            world.step(NOMINAL_STEP);
        }
        let body = world.body(b);
        assert!((body.position.y - 0.1).abs() < 0.02, "y = {}", body.position.y);
        assert!(body.linear_velocity.y.abs() < 0.05);
    }

    #[test]
    fn test_impact_recorded_on_landing() {
        let mut world = floored();
        let b = ball(&mut world, Vec2::new(0.0, 0.12));
        world.body_mut(b).linear_velocity = Vec2::new(0.0, -8.0);
        let mut strongest = 0.0f32;
        for _ in 0..3 {
            world.step(NOMINAL_STEP);
            strongest = strongest.max(world.body(b).impact());
        }
        assert!(strongest > 7.0, "impact = {}", strongest);
    }

    #[test]
    fn test_joint_keeps_anchors_together() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let a = ball(&mut world, Vec2::new(0.0, 0.0));
        let b = ball(&mut world, Vec2::new(0.5, 0.0));
        let j = world.add_joint(RevoluteJoint::new(
            a,
            b,
            Vec2::new(0.25, 0.0),
            Vec2::new(-0.25, 0.0),
        ));
        world.body_mut(b).linear_velocity = Vec2::new(3.0, 0.0);
        for _ in 0..30 {
            world.step(NOMINAL_STEP);
        }
        assert!(world.is_joint_simulated(j));
        let gap = world.joint_anchor_a(j).distance(world.joint_anchor_b(j));
        assert!(gap < 0.02, "gap = {}", gap);
    }

    #[test]
    fn test_disabled_joint_applies_nothing() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let a = ball(&mut world, Vec2::new(0.0, 0.0));
        let b = ball(&mut world, Vec2::new(0.5, 0.0));
        let j = world.add_joint(RevoluteJoint::new(a, b, Vec2::ZERO, Vec2::ZERO));
        world.joint_mut(j).enabled = false;
        world.step(NOMINAL_STEP);
        assert!(!world.is_joint_simulated(j));
        assert!(world.body(a).position.distance(Vec2::new(0.0, 0.0)) < 1e-5);
        assert!(world.body(b).position.distance(Vec2::new(0.5, 0.0)) < 1e-5);
    }

    #[test]
    fn test_angle_limit_enforced() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let a = ball(&mut world, Vec2::new(0.0, 0.0));
        let b = ball(&mut world, Vec2::new(0.2, 0.0));
        let mut joint = RevoluteJoint::new(a, b, Vec2::new(0.1, 0.0), Vec2::new(-0.1, 0.0));
        joint.limit_enabled = true;
        joint.lower_limit = -0.2;
        joint.upper_limit = 0.2;
        world.add_joint(joint);
        world.body_mut(b).angular_velocity = 20.0;
        for _ in 0..10 {
            world.step(NOMINAL_STEP);
        }
        let relative = world.body(b).rotation - world.body(a).rotation;
        assert!(relative <= 0.25, "relative = {}", relative);
    }

    #[test]
    fn test_pull_joint_moves_toward_target() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let b = ball(&mut world, Vec2::ZERO);
        {
            let body = world.body_mut(b);
            body.pull_joint.enabled = true;
            body.pull_joint.target = Vec2::new(1.0, 0.0);
        }
        for _ in 0..120 {
            world.step(NOMINAL_STEP);
        }
        assert!((world.body(b).position.x - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_zero_mass_body_ignores_forces() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let b = world.add_body(RigidBody::new(Shape::Circle { radius: 0.1 }, 0.0, Vec2::ZERO));
        world.body_mut(b).apply_force(Vec2::new(100.0, 0.0));
        world.step(NOMINAL_STEP);
        assert!(world.body(b).position.length() < 1e-5);
    }

    #[test]
    fn test_submerged_body_does_not_sink() {
        let mut world = PhysicsWorld::default();
        let b = ball(&mut world, Vec2::ZERO);
        world.body_mut(b).submerged = true;
        for _ in 0..60 {
            world.step(NOMINAL_STEP);
        }
        assert!(world.body(b).position.y.abs() < 1e-4);
    }

    #[test]
    fn test_frozen_body_stays_put() {
        let mut world = PhysicsWorld::default();
        let b = ball(&mut world, Vec2::new(0.0, 5.0));
        world.body_mut(b).frozen = true;
        for _ in 0..60 {
            world.step(NOMINAL_STEP);
        }
        assert_eq!(world.body(b).position, Vec2::new(0.0, 5.0));

        world.body_mut(b).frozen = false;
        for _ in 0..30 {
            world.step(NOMINAL_STEP);
        }
        assert!(world.body(b).position.y < 5.0);
    }

    #[test]
    fn test_removed_bodies_free_their_storage() {
        let mut world = floored();
        for _ in 0..50 {
            let a = ball(&mut world, Vec2::new(0.0, 1.0));
            let b = ball(&mut world, Vec2::new(0.2, 1.0));
            let j = world.add_joint(RevoluteJoint::new(a, b, Vec2::ZERO, Vec2::ZERO));
            world.step(NOMINAL_STEP);
            assert!(world.is_joint_simulated(j));
            world.remove_body(a);
            world.remove_body(b);
        }
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.joint_count(), 0);
        assert_eq!(world.rigid_body_set.len(), 0);
        assert_eq!(world.impulse_joint_set.len(), 0);
        // only the floor slab is left
        assert_eq!(world.collider_set.len(), 1);
    }
}
