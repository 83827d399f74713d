//! Ragdoll construction parameters: limbs, joints, collider, scales.
//!
//! Dimensions here are unscaled. The ragdoll always derives its physics
//! geometry from these base values times `limb_scale` / `joint_scale`, so
//! changing a scale and rebuilding can be undone exactly.

use serde::{Deserialize, Serialize};

use super::{bool_property, float_property, vector_property, Property, PropertyTable};
use crate::math::Vec2;
use crate::physics::Shape;

/// Body part a limb represents. Gait code looks limbs up by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LimbType {
    Head,
    Torso,
    Waist,
    Tail,
    Jaw,
    LeftArm,
    RightArm,
    LeftForearm,
    RightForearm,
    LeftHand,
    RightHand,
    LeftThigh,
    RightThigh,
    LeftLeg,
    RightLeg,
    LeftFoot,
    RightFoot,
    Legs,
    Other,
}

impl LimbType {
    pub fn is_foot(self) -> bool {
        matches!(self, LimbType::LeftFoot | LimbType::RightFoot)
    }

    pub fn is_hand(self) -> bool {
        matches!(self, LimbType::LeftHand | LimbType::RightHand)
    }
}

/// Parameters of one limb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimbParams {
    pub id: u32,
    pub limb_type: LimbType,
    pub shape: Shape,
    /// Mass per unit area.
    pub density: f32,
    /// Local offset of the mouth, for limbs that can eat.
    pub mouth_pos: Option<Vec2>,
    /// Offset added to the foot target while stepping.
    pub step_offset: Vec2,
    /// Joint whose anchor the foot steps under.
    pub ref_joint: Option<usize>,
    /// Force pulling this limb along the swim direction.
    pub steer_force: f32,
    /// Whether the limb is mirrored when the character turns around.
    pub flip: bool,
    /// Sprite orientation in degrees; flips reflect about this axis.
    pub orientation: f32,
    pub constant_torque: f32,
    /// Degrees, relative to the movement heading.
    pub constant_angle: f32,
    /// Local anchor of the limb's pull joint.
    pub pull_pos: Vec2,
    pub friction: f32,
}

impl Default for LimbParams {
    fn default() -> Self {
        Self {
            id: 0,
            limb_type: LimbType::Other,
            shape: Shape::Circle { radius: 0.1 },
            density: 10.0,
            mouth_pos: None,
            step_offset: Vec2::ZERO,
            ref_joint: None,
            steer_force: 0.0,
            flip: true,
            orientation: 0.0,
            constant_torque: 0.0,
            constant_angle: 0.0,
            pull_pos: Vec2::ZERO,
            friction: 0.3,
        }
    }
}

static LIMB_PROPERTIES: &[Property<LimbParams>] = &[
    float_property!(LimbParams, "density", "Mass per unit area", [0.1, 100.0], density),
    float_property!(LimbParams, "steer_force", "Swim steering force", [0.0, 100.0], steer_force),
    float_property!(LimbParams, "constant_torque", "Torque toward the constant angle", [-1000.0, 1000.0], constant_torque),
    float_property!(LimbParams, "constant_angle", "Angle held relative to movement (deg)", [-360.0, 360.0], constant_angle),
    float_property!(LimbParams, "orientation", "Sprite orientation (deg)", [-360.0, 360.0], orientation),
    float_property!(LimbParams, "friction", "Floor friction", [0.0, 1.0], friction),
    vector_property!(LimbParams, "step_offset", "Foot target offset", step_offset),
    vector_property!(LimbParams, "pull_pos", "Pull joint anchor", pull_pos),
    bool_property!(LimbParams, "flip", "Mirror when turning", flip),
];

impl PropertyTable for LimbParams {
    fn properties() -> &'static [Property<Self>] {
        LIMB_PROPERTIES
    }
}

/// Parameters of one joint between two limbs (referenced by limb id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointParams {
    pub limb1: u32,
    pub limb2: u32,
    pub limb1_anchor: Vec2,
    pub limb2_anchor: Vec2,
    pub limit_enabled: bool,
    /// Degrees.
    pub lower_limit: f32,
    /// Degrees.
    pub upper_limit: f32,
    pub motor_torque: f32,
    pub can_be_severed: bool,
}

impl Default for JointParams {
    fn default() -> Self {
        Self {
            limb1: 0,
            limb2: 0,
            limb1_anchor: Vec2::ZERO,
            limb2_anchor: Vec2::ZERO,
            limit_enabled: true,
            lower_limit: -45.0,
            upper_limit: 45.0,
            motor_torque: 0.25,
            can_be_severed: true,
        }
    }
}

static JOINT_PROPERTIES: &[Property<JointParams>] = &[
    bool_property!(JointParams, "limit_enabled", "Enforce angle limits", limit_enabled),
    float_property!(JointParams, "lower_limit", "Lower angle limit (deg)", [-360.0, 360.0], lower_limit),
    float_property!(JointParams, "upper_limit", "Upper angle limit (deg)", [-360.0, 360.0], upper_limit),
    float_property!(JointParams, "motor_torque", "Joint friction torque", [0.0, 1000.0], motor_torque),
    bool_property!(JointParams, "can_be_severed", "Can be torn off", can_be_severed),
    vector_property!(JointParams, "limb1_anchor", "Anchor on the first limb", limb1_anchor),
    vector_property!(JointParams, "limb2_anchor", "Anchor on the second limb", limb2_anchor),
];

impl PropertyTable for JointParams {
    fn properties() -> &'static [Property<Self>] {
        JOINT_PROPERTIES
    }
}

/// Per-species ragdoll description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagdollParams {
    /// Multiplier on every joint anchor (and step offsets).
    pub joint_scale: f32,
    /// Multiplier on every limb size.
    pub limb_scale: f32,
    pub collider_radius: f32,
    pub collider_height: f32,
    /// Degrees the collider is rotated when standing.
    pub collider_stand_angle: f32,
    pub main_limb: LimbType,
    pub can_enter_submarine: bool,
    pub limbs: Vec<LimbParams>,
    pub joints: Vec<JointParams>,
}

impl Default for RagdollParams {
    fn default() -> Self {
        Self {
            joint_scale: 1.0,
            limb_scale: 1.0,
            collider_radius: 0.25,
            collider_height: 1.0,
            collider_stand_angle: 0.0,
            main_limb: LimbType::Torso,
            can_enter_submarine: true,
            limbs: Vec::new(),
            joints: Vec::new(),
        }
    }
}

static RAGDOLL_PROPERTIES: &[Property<RagdollParams>] = &[
    float_property!(RagdollParams, "joint_scale", "Scale of joint anchors", [0.1, 5.0], joint_scale),
    float_property!(RagdollParams, "limb_scale", "Scale of limb sizes", [0.1, 5.0], limb_scale),
    float_property!(RagdollParams, "collider_radius", "Main collider radius", [0.01, 10.0], collider_radius),
    float_property!(RagdollParams, "collider_height", "Main collider height", [0.0, 20.0], collider_height),
    float_property!(RagdollParams, "collider_stand_angle", "Standing collider angle (deg)", [-360.0, 360.0], collider_stand_angle),
    bool_property!(RagdollParams, "can_enter_submarine", "Can walk inside hulls", can_enter_submarine),
];

impl PropertyTable for RagdollParams {
    fn properties() -> &'static [Property<Self>] {
        RAGDOLL_PROPERTIES
    }
}

impl RagdollParams {
    pub fn limb(&self, id: u32) -> Option<&LimbParams> {
        self.limbs.iter().find(|l| l.id == id)
    }

    pub fn limb_mut(&mut self, id: u32) -> Option<&mut LimbParams> {
        self.limbs.iter_mut().find(|l| l.id == id)
    }

    /// Scaled collider shape.
    pub fn collider_shape(&self) -> Shape {
        Shape::Capsule {
            radius: self.collider_radius * self.limb_scale,
            height: self.collider_height * self.limb_scale,
        }
    }

    /// Check internal consistency; returns a description of every problem.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.limbs.is_empty() {
            problems.push("ragdoll has no limbs".to_string());
        }
        if !self.limbs.iter().any(|l| l.limb_type == self.main_limb) {
            problems.push(format!("main limb {:?} is missing", self.main_limb));
        }
        for (i, limb) in self.limbs.iter().enumerate() {
            if self.limbs[..i].iter().any(|other| other.id == limb.id) {
                problems.push(format!("duplicate limb id {}", limb.id));
            }
        }
        for (i, joint) in self.joints.iter().enumerate() {
            for id in [joint.limb1, joint.limb2] {
                if self.limb(id).is_none() {
                    problems.push(format!("joint {} references missing limb {}", i, id));
                }
            }
            if joint.limb1 == joint.limb2 {
                problems.push(format!("joint {} connects limb {} to itself", i, joint.limb1));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Editable, ParamValue};

    fn two_limbs() -> RagdollParams {
        RagdollParams {
            limbs: vec![
                LimbParams {
                    id: 0,
                    limb_type: LimbType::Torso,
                    ..Default::default()
                },
                LimbParams {
                    id: 1,
                    limb_type: LimbType::Head,
                    ..Default::default()
                },
            ],
            joints: vec![JointParams {
                limb1: 0,
                limb2: 1,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_ragdoll_has_no_problems() {
        assert!(two_limbs().validate().is_empty());
    }

    #[test]
    fn test_missing_joint_limb_reported() {
        let mut params = two_limbs();
        params.joints[0].limb2 = 9;
        let problems = params.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("missing limb 9"));
    }

    #[test]
    fn test_missing_main_limb_reported() {
        let mut params = two_limbs();
        params.main_limb = LimbType::Tail;
        assert!(params.validate().iter().any(|p| p.contains("main limb")));
    }

    #[test]
    fn test_reset_keeps_limbs() {
        let mut params = two_limbs();
        params.set("limb_scale", ParamValue::Float(2.0)).unwrap();
        params.reset();
        assert_eq!(params.limb_scale, 1.0);
        assert_eq!(params.limbs.len(), 2);
    }

    #[test]
    fn test_joint_table_edits_limits() {
        let mut joint = JointParams::default();
        joint.set("upper_limit", ParamValue::Float(10.0)).unwrap();
        assert_eq!(joint.upper_limit, 10.0);
        assert_eq!(
            joint.default_value("upper_limit").unwrap(),
            ParamValue::Float(45.0)
        );
    }

    #[test]
    fn test_limbs_deserialize_with_defaults() {
        let json = r#"{ "id": 3, "limb_type": "Tail" }"#;
        let limb: LimbParams = serde_json::from_str(json).unwrap();
        assert_eq!(limb.id, 3);
        assert_eq!(limb.limb_type, LimbType::Tail);
        assert!(limb.flip);
        assert_eq!(limb.density, 10.0);
    }
}
