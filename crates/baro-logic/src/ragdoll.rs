//! The physical body of a character: limbs, joints and the main collider.
//!
//! The ragdoll keeps no parameter data of its own. Geometry is always
//! derived from the unscaled [`RagdollParams`] it is built or rebuilt from,
//! mirrored into the current facing.

use std::collections::VecDeque;

use crate::error::ContentError;
use crate::limb::{Direction, Limb, LimbJoint, LimbTransform};
use crate::math::{self, Vec2};
use crate::params::{LimbType, RagdollParams};
use crate::physics::{BodyHandle, PhysicsWorld, RevoluteJoint, RigidBody};

#[derive(Debug, Clone)]
pub struct Ragdoll {
    limbs: Vec<Limb>,
    joints: Vec<LimbJoint>,
    collider: BodyHandle,
    main_limb: usize,
    dir: Direction,
    simple_physics: bool,
    /// Limb offsets from the collider captured when simple physics turned on.
    simple_offsets: Vec<(Vec2, f32)>,
    /// Rest offset of each limb from the main limb (scaled, right-facing).
    rest_pose: Vec<Vec2>,
    /// Joint scale the geometry was last built with.
    joint_scale: f32,
    /// Authoritative position received from a remote owner.
    pub target_position: Option<Vec2>,
    /// Authoritative collider rotation received from a remote owner.
    pub target_rotation: Option<f32>,
}

impl Ragdoll {
    /// Create limb bodies, joints and the collider, with the collider
    /// centered on `position` and the limbs laid out in their rest pose.
    pub fn build(
        species: &str,
        params: &RagdollParams,
        position: Vec2,
        physics: &mut PhysicsWorld,
    ) -> Result<Self, ContentError> {
        let problems = params.validate();
        if !problems.is_empty() {
            return Err(ContentError::InvalidRagdoll {
                name: species.to_string(),
                problems,
            });
        }

        let mut limbs = Vec::with_capacity(params.limbs.len());
        for limb in &params.limbs {
            let body = physics.add_body(RigidBody::new(limb.shape, 0.0, position));
            limbs.push(Limb {
                id: limb.id,
                limb_type: limb.limb_type,
                body,
                mouth_pos: None,
                step_offset: Vec2::ZERO,
                ref_joint_index: limb.ref_joint,
                steer_force: 0.0,
                flip: limb.flip,
                orientation: 0.0,
                constant_torque: 0.0,
                constant_angle: 0.0,
                damage: 0.0,
                severed: false,
            });
        }

        let mut joints = Vec::with_capacity(params.joints.len());
        for joint in &params.joints {
            // validate() guarantees both ids exist
            let a = index_of(params, joint.limb1).unwrap_or(0);
            let b = index_of(params, joint.limb2).unwrap_or(0);
            let handle = physics.add_joint(RevoluteJoint::new(
                limbs[a].body,
                limbs[b].body,
                Vec2::ZERO,
                Vec2::ZERO,
            ));
            joints.push(LimbJoint {
                handle,
                limb_a: a,
                limb_b: b,
                can_be_severed: joint.can_be_severed,
                severed: false,
            });
        }

        let main_limb = params
            .limbs
            .iter()
            .position(|l| l.limb_type == params.main_limb)
            .unwrap_or(0);
        let collider = physics.add_body(RigidBody::new(params.collider_shape(), 0.0, position));

        let mut ragdoll = Self {
            limbs,
            joints,
            collider,
            main_limb,
            dir: Direction::Right,
            simple_physics: false,
            simple_offsets: Vec::new(),
            rest_pose: Vec::new(),
            joint_scale: params.joint_scale,
            target_position: None,
            target_rotation: None,
        };
        ragdoll.apply_geometry(params, physics);
        {
            let body = physics.body_mut(collider);
            body.friction = 0.0;
            let stand = params.collider_stand_angle.to_radians();
            body.set_transform(position, math::valid_or_zero(stand));
        }
        ragdoll.place_limbs(position, physics);
        Ok(ragdoll)
    }

    /// Re-derive all geometry from `params` after a scale or shape edit.
    ///
    /// Limbs are laid out again around the main limb. Severed joints stay
    /// disabled. If the limb or joint count changed, the ragdoll is
    /// recreated from scratch.
    pub fn rebuild(
        &mut self,
        species: &str,
        params: &RagdollParams,
        physics: &mut PhysicsWorld,
    ) -> Result<(), ContentError> {
        let main_position = self.limbs[self.main_limb].position(physics);
        if params.limbs.len() != self.limbs.len() || params.joints.len() != self.joints.len() {
            let collider_position = physics.body(self.collider).position;
            let dir = self.dir;
            let mut fresh = Ragdoll::build(species, params, collider_position, physics)?;
            self.remove(physics);
            if dir == Direction::Left {
                fresh.flip(physics);
            }
            *self = fresh;
            return Ok(());
        }
        let problems = params.validate();
        if !problems.is_empty() {
            return Err(ContentError::InvalidRagdoll {
                name: species.to_string(),
                problems,
            });
        }
        self.apply_geometry(params, physics);
        for (i, limb) in self.limbs.iter().enumerate() {
            if limb.severed {
                continue;
            }
            let offset = self.dir.apply(self.rest_pose[i] - self.rest_pose[self.main_limb]);
            let body = physics.body_mut(limb.body);
            body.set_transform(main_position + offset, 0.0);
            body.linear_velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
        }
        log::debug!(
            "rebuilt ragdoll of {} (joint scale {}, limb scale {})",
            species,
            params.joint_scale,
            params.limb_scale
        );
        Ok(())
    }

    fn apply_geometry(&mut self, params: &RagdollParams, physics: &mut PhysicsWorld) {
        let dir = self.dir;
        let (js, ls) = (params.joint_scale, params.limb_scale);
        let mut total_mass = 0.0;
        for (limb, lp) in self.limbs.iter_mut().zip(&params.limbs) {
            let shape = lp.shape.scaled(ls);
            let mass = shape.area() * lp.density;
            total_mass += mass;
            limb.limb_type = lp.limb_type;
            limb.mouth_pos = lp.mouth_pos.map(|m| m * ls);
            limb.step_offset = lp.step_offset * js;
            limb.ref_joint_index = lp.ref_joint;
            limb.steer_force = lp.steer_force;
            limb.flip = lp.flip;
            limb.orientation = math::valid_or_zero(lp.orientation.to_radians());
            limb.constant_torque = lp.constant_torque;
            limb.constant_angle = math::valid_or_zero(lp.constant_angle.to_radians());

            let body = physics.body_mut(limb.body);
            body.shape = shape;
            body.mass = mass;
            body.friction = lp.friction;
            body.pull_joint.local_anchor = dir.apply(lp.pull_pos * ls);
            body.pull_joint.max_force = 150.0 * mass.max(0.0);
        }

        for (joint, jp) in self.joints.iter().zip(&params.joints) {
            let (lower, upper) = (jp.lower_limit.to_radians(), jp.upper_limit.to_radians());
            let j = physics.joint_mut(joint.handle);
            j.local_anchor_a = dir.apply(jp.limb1_anchor * js);
            j.local_anchor_b = dir.apply(jp.limb2_anchor * js);
            j.limit_enabled = jp.limit_enabled;
            (j.lower_limit, j.upper_limit) = match dir {
                Direction::Right => (lower, upper),
                Direction::Left => (-upper, -lower),
            };
            j.motor_enabled = jp.motor_torque > 0.0;
            j.motor_speed = 0.0;
            j.max_motor_torque = jp.motor_torque;
            j.enabled = !joint.severed;
        }

        let collider = physics.body_mut(self.collider);
        collider.shape = params.collider_shape();
        collider.mass = total_mass;
        collider.pull_joint.max_force = 150.0 * total_mass;

        self.rest_pose = rest_pose(params, self.main_limb);
        self.joint_scale = js;
    }

    /// Lay the limbs out around the collider, lifted so none starts below
    /// the collider bottom.
    fn place_limbs(&mut self, origin: Vec2, physics: &mut PhysicsWorld) {
        let main_offset = self.rest_pose[self.main_limb];
        for (i, limb) in self.limbs.iter().enumerate() {
            let position = origin + self.dir.apply(self.rest_pose[i] - main_offset);
            physics.body_mut(limb.body).set_transform(position, 0.0);
        }
        let bottom = self.collider_bottom(physics).y;
        let lowest = self
            .limbs
            .iter()
            .map(|l| physics.body(l.body).lowest_point())
            .fold(f32::INFINITY, f32::min);
        if lowest < bottom {
            let lift = Vec2::new(0.0, bottom - lowest);
            for limb in &self.limbs {
                let body = physics.body_mut(limb.body);
                let (position, rotation) = (body.position + lift, body.rotation);
                body.set_transform(position, rotation);
            }
        }
        for limb in &self.limbs {
            let body = physics.body_mut(limb.body);
            body.pull_joint.target = body.position;
        }
    }

    /// Remove every joint and body of this ragdoll from the world.
    pub fn remove(&self, physics: &mut PhysicsWorld) {
        for joint in &self.joints {
            physics.remove_joint(joint.handle);
        }
        for limb in &self.limbs {
            physics.remove_body(limb.body);
        }
        physics.remove_body(self.collider);
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    pub fn limb(&self, index: usize) -> &Limb {
        &self.limbs[index]
    }

    pub fn limb_mut(&mut self, index: usize) -> &mut Limb {
        &mut self.limbs[index]
    }

    pub fn joints(&self) -> &[LimbJoint] {
        &self.joints
    }

    pub fn collider(&self) -> BodyHandle {
        self.collider
    }

    pub fn main_limb(&self) -> &Limb {
        &self.limbs[self.main_limb]
    }

    pub fn main_limb_index(&self) -> usize {
        self.main_limb
    }

    pub fn dir(&self) -> Direction {
        self.dir
    }

    pub fn is_simple_physics(&self) -> bool {
        self.simple_physics
    }

    /// Joint scale of the current geometry. Parameter edits only change it
    /// through [`Ragdoll::rebuild`].
    pub fn joint_scale(&self) -> f32 {
        self.joint_scale
    }

    /// Index of the first intact limb of the given type.
    pub fn limb_index(&self, limb_type: LimbType) -> Option<usize> {
        self.limbs
            .iter()
            .position(|l| l.limb_type == limb_type && !l.severed)
    }

    pub fn get_limb(&self, limb_type: LimbType) -> Option<&Limb> {
        self.limb_index(limb_type).map(|i| &self.limbs[i])
    }

    /// Rest offset between two limbs in the current facing.
    pub fn rest_offset(&self, from: usize, to: usize) -> Vec2 {
        self.dir.apply(self.rest_pose[to] - self.rest_pose[from])
    }

    /// Limb that eats: the first with a mouth, else the head.
    pub fn mouth_limb(&self) -> Option<usize> {
        self.limbs
            .iter()
            .position(|l| l.mouth_pos.is_some() && !l.severed)
            .or_else(|| self.limb_index(LimbType::Head))
    }

    /// World position of the mouth, falling back to the mouth limb center.
    pub fn mouth_position(&self, physics: &PhysicsWorld) -> Option<Vec2> {
        let limb = &self.limbs[self.mouth_limb()?];
        Some(
            limb.mouth_world(physics, self.dir)
                .unwrap_or_else(|| limb.position(physics)),
        )
    }

    /// Sum of intact limb masses.
    pub fn mass(&self, physics: &PhysicsWorld) -> f32 {
        self.limbs
            .iter()
            .filter(|l| !l.severed)
            .map(|l| l.mass(physics))
            .sum()
    }

    /// Mass-weighted center of the intact limbs.
    pub fn center_of_mass(&self, physics: &PhysicsWorld) -> Option<Vec2> {
        let mut total = 0.0;
        let mut weighted = Vec2::ZERO;
        for limb in self.limbs.iter().filter(|l| !l.severed) {
            let body = physics.body(limb.body);
            total += body.mass;
            weighted += body.position * body.mass;
        }
        if total <= 0.0 {
            return None;
        }
        let center = weighted / total;
        center.is_valid().then_some(center)
    }

    /// Intact limb whose lowest point is lowest.
    pub fn lowest_limb(&self, physics: &PhysicsWorld) -> Option<usize> {
        self.limbs
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.severed)
            .map(|(i, l)| (i, physics.body(l.body).lowest_point()))
            .filter(|(_, y)| y.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Lowest point of the main collider.
    pub fn collider_bottom(&self, physics: &PhysicsWorld) -> Vec2 {
        let body = physics.body(self.collider);
        body.position - Vec2::new(0.0, body.shape.extent_below(body.rotation))
    }

    /// Joints that can still be torn off: intact, flagged severable, and
    /// linking two intact limbs.
    pub fn severable_joints(&self) -> Vec<usize> {
        self.joints
            .iter()
            .enumerate()
            .filter(|(_, j)| {
                !j.severed
                    && j.can_be_severed
                    && !self.limbs[j.limb_a].severed
                    && !self.limbs[j.limb_b].severed
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Permanently sever a joint. Limbs no longer connected to the main
    /// limb become free bodies. Returns false if there was nothing to do.
    pub fn sever_joint(&mut self, index: usize, physics: &mut PhysicsWorld) -> bool {
        let Some(joint) = self.joints.get_mut(index) else {
            return false;
        };
        if joint.severed {
            return false;
        }
        joint.sever(physics);

        let connected = self.connected_limbs(self.main_limb);
        for (i, limb) in self.limbs.iter_mut().enumerate() {
            if !connected[i] && !limb.severed {
                limb.severed = true;
                let body = physics.body_mut(limb.body);
                body.pull_joint.enabled = false;
                // free bodies resume simulating on their own
                body.enabled = true;
            }
        }
        log::debug!("severed joint {}", index);
        true
    }

    /// Limbs reachable from `root` through intact joints.
    pub fn connected_limbs(&self, root: usize) -> Vec<bool> {
        let mut visited = vec![false; self.limbs.len()];
        let mut queue = VecDeque::from([root]);
        visited[root] = true;
        while let Some(current) = queue.pop_front() {
            for joint in self.joints.iter().filter(|j| !j.severed) {
                let other = if joint.limb_a == current {
                    joint.limb_b
                } else if joint.limb_b == current {
                    joint.limb_a
                } else {
                    continue;
                };
                if !visited[other] {
                    visited[other] = true;
                    queue.push_back(other);
                }
            }
        }
        visited
    }

    /// Turn around: mirror joint anchors and limits, negate pull anchors
    /// and reflect the rotation of every flip-eligible limb.
    pub fn flip(&mut self, physics: &mut PhysicsWorld) {
        self.dir = self.dir.opposite();
        for joint in &self.joints {
            let j = physics.joint_mut(joint.handle);
            j.local_anchor_a.x = -j.local_anchor_a.x;
            j.local_anchor_b.x = -j.local_anchor_b.x;
            let (lower, upper) = (j.lower_limit, j.upper_limit);
            j.lower_limit = -upper;
            j.upper_limit = -lower;
        }
        for limb in self.limbs.iter().filter(|l| !l.severed) {
            let body = physics.body_mut(limb.body);
            body.pull_joint.local_anchor.x = -body.pull_joint.local_anchor.x;
            if limb.flip {
                let rotation = math::reflect_angle(body.rotation, limb.orientation);
                let position = body.position;
                body.set_transform(position, rotation);
                body.angular_velocity = -body.angular_velocity;
            }
        }
    }

    /// Mirror limb x-positions about the center of mass.
    pub fn mirror(&mut self, physics: &mut PhysicsWorld) {
        let Some(center) = self.center_of_mass(physics) else {
            return;
        };
        for limb in self.limbs.iter().filter(|l| !l.severed) {
            let body = physics.body_mut(limb.body);
            let mut position = body.position;
            position.x = 2.0 * center.x - position.x;
            let rotation = body.rotation;
            body.set_transform(position, rotation);
            body.pull_joint.target.x = 2.0 * center.x - body.pull_joint.target.x;
        }
    }

    /// Switch limb simulation off (limbs ride along with the collider) or
    /// back on.
    pub fn set_simple_physics(&mut self, enabled: bool, physics: &mut PhysicsWorld) {
        if enabled == self.simple_physics {
            return;
        }
        self.simple_physics = enabled;
        let collider = physics.body(self.collider);
        let (origin, velocity) = (collider.position, collider.linear_velocity);
        if enabled {
            self.simple_offsets = self
                .limbs
                .iter()
                .map(|l| {
                    let body = physics.body(l.body);
                    (body.position - origin, body.rotation)
                })
                .collect();
            for limb in self.limbs.iter().filter(|l| !l.severed) {
                physics.body_mut(limb.body).enabled = false;
            }
        } else {
            for (limb, (offset, rotation)) in self.limbs.iter().zip(&self.simple_offsets) {
                if limb.severed {
                    continue;
                }
                let body = physics.body_mut(limb.body);
                body.enabled = true;
                body.set_transform(origin + *offset, *rotation);
                body.linear_velocity = velocity;
                body.angular_velocity = 0.0;
            }
        }
    }

    /// Carry disabled limbs along with the collider in simple physics.
    pub fn follow_collider(&self, physics: &mut PhysicsWorld) {
        if !self.simple_physics {
            return;
        }
        let origin = physics.body(self.collider).position;
        for (limb, (offset, rotation)) in self.limbs.iter().zip(&self.simple_offsets) {
            if !limb.severed {
                physics.body_mut(limb.body).set_transform(origin + *offset, *rotation);
            }
        }
    }

    /// Pause or resume every body. Velocities are dropped either way and
    /// pull joints are pinned to where their anchors are now.
    pub fn set_frozen(&self, frozen: bool, physics: &mut PhysicsWorld) {
        for handle in self.limbs.iter().map(|l| l.body).chain([self.collider]) {
            let body = physics.body_mut(handle);
            body.frozen = frozen;
            body.linear_velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
            body.pull_joint.target = body.world_point(body.pull_joint.local_anchor);
        }
    }

    pub fn reset_pull_joints(&self, physics: &mut PhysicsWorld) {
        for limb in &self.limbs {
            physics.body_mut(limb.body).pull_joint.enabled = false;
        }
    }

    /// Move the whole ragdoll by `delta` without changing velocities.
    pub fn teleport(&self, delta: Vec2, physics: &mut PhysicsWorld) {
        if !delta.is_valid() {
            return;
        }
        for handle in self.limbs.iter().map(|l| l.body).chain([self.collider]) {
            let body = physics.body_mut(handle);
            let (position, rotation) = (body.position + delta, body.rotation);
            body.set_transform(position, rotation);
            body.pull_joint.target += delta;
        }
    }

    /// Ease the collider toward the remote target transform.
    ///
    /// Errors larger than `teleport_distance` snap the whole ragdoll.
    pub fn apply_remote_correction(
        &mut self,
        lerp: f32,
        teleport_distance: f32,
        physics: &mut PhysicsWorld,
    ) {
        if let Some(target) = self.target_position {
            let position = physics.body(self.collider).position;
            let error = target - position;
            if !error.is_valid() {
                self.target_position = None;
            } else if error.length() > teleport_distance {
                self.teleport(error, physics);
                self.target_position = None;
            } else if error.length() < 0.01 {
                self.target_position = None;
            } else {
                let body = physics.body_mut(self.collider);
                let rotation = body.rotation;
                body.set_transform(position + error * lerp, rotation);
            }
        }
        if let Some(target) = self.target_rotation {
            let body = physics.body_mut(self.collider);
            let diff = math::shortest_angle(body.rotation, target);
            let position = body.position;
            if diff.abs() < 0.01 || !diff.is_finite() {
                self.target_rotation = None;
            } else {
                let rotation = body.rotation + diff * lerp;
                body.set_transform(position, rotation);
            }
        }
    }

    /// Mark each body as in or out of water.
    pub fn update_submerged<F: Fn(Vec2) -> bool>(&self, physics: &mut PhysicsWorld, in_water: F) {
        for handle in self.limbs.iter().map(|l| l.body).chain([self.collider]) {
            let body = physics.body_mut(handle);
            body.submerged = in_water(body.position);
        }
    }

    /// Strongest floor impact of the collider or an intact limb last step.
    pub fn strongest_impact(&self, physics: &PhysicsWorld) -> f32 {
        self.limbs
            .iter()
            .filter(|l| !l.severed)
            .map(|l| physics.body(l.body).impact())
            .fold(physics.body(self.collider).impact(), f32::max)
    }

    /// Render transforms, interpolated between the last two steps.
    pub fn limb_transforms(&self, physics: &PhysicsWorld, alpha: f32) -> Vec<LimbTransform> {
        self.limbs
            .iter()
            .map(|l| {
                let body = physics.body(l.body);
                LimbTransform {
                    limb_id: l.id,
                    position: body.interpolated_position(alpha),
                    rotation: body.interpolated_rotation(alpha),
                    severed: l.severed,
                }
            })
            .collect()
    }
}

fn index_of(params: &RagdollParams, id: u32) -> Option<usize> {
    params.limbs.iter().position(|l| l.id == id)
}

/// Offset of every limb from the main limb with all joints at rest,
/// found by walking the joint graph outward. Unreachable limbs sit on the
/// main limb.
fn rest_pose(params: &RagdollParams, main_limb: usize) -> Vec<Vec2> {
    let scale = params.joint_scale;
    let mut offsets: Vec<Option<Vec2>> = vec![None; params.limbs.len()];
    offsets[main_limb] = Some(Vec2::ZERO);
    let mut changed = true;
    while changed {
        changed = false;
        for joint in &params.joints {
            let (Some(a), Some(b)) = (index_of(params, joint.limb1), index_of(params, joint.limb2))
            else {
                continue;
            };
            let anchor_a = joint.limb1_anchor * scale;
            let anchor_b = joint.limb2_anchor * scale;
            match (offsets[a], offsets[b]) {
                (Some(pa), None) => {
                    offsets[b] = Some(pa + anchor_a - anchor_b);
                    changed = true;
                }
                (None, Some(pb)) => {
                    offsets[a] = Some(pb + anchor_b - anchor_a);
                    changed = true;
                }
                _ => {}
            }
        }
    }
    offsets.into_iter().map(|o| o.unwrap_or(Vec2::ZERO)).collect()
}
