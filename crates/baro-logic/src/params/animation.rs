//! Animation parameters, one closed variant per (locomotion × body plan).
//!
//! | Variant | Used when |
//! |---------|-----------|
//! | `FishGrounded` | fish-like species crawling inside a hull |
//! | `FishSwim` | fish-like species in water (sine gait) |
//! | `HumanGrounded` | humanoid walking/running |
//! | `HumanSwim` | humanoid swimming |
//!
//! Angles are stored in degrees (designer units) and read through the
//! `*_radians` accessors, which fall back to 0 on NaN.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    angle_property, angle_radians, bool_property, float_property, vector_property, Editable,
    Property, PropertyTable,
};
use crate::math::{self, Vec2};

/// Foot angle maps are written as `[[limb_id, degrees], ...]` so they
/// survive the buffering done by flattened and tagged containers.
mod foot_angle_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(map: &BTreeMap<u32, f32>, s: S) -> Result<S::Ok, S::Error> {
        map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<u32, f32>, D::Error> {
        Ok(Vec::<(u32, f32)>::deserialize(d)?.into_iter().collect())
    }
}

/// The four animation slots every species defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationType {
    Walk,
    Run,
    SwimSlow,
    SwimFast,
}

impl AnimationType {
    pub fn is_swimming(self) -> bool {
        matches!(self, AnimationType::SwimSlow | AnimationType::SwimFast)
    }

    pub fn select(in_water: bool, fast: bool) -> Self {
        match (in_water, fast) {
            (true, true) => AnimationType::SwimFast,
            (true, false) => AnimationType::SwimSlow,
            (false, true) => AnimationType::Run,
            (false, false) => AnimationType::Walk,
        }
    }
}

/// Fields shared by every grounded gait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundedParams {
    pub movement_speed: f32,
    /// Gait phase advance per unit of horizontal velocity (rad/s per m/s).
    pub cycle_speed: f32,
    pub step_size: Vec2,
    /// Height of the head above the collider bottom.
    pub head_position: f32,
    /// Height of the torso above the collider bottom.
    pub torso_position: f32,
    pub head_angle: Option<f32>,
    pub torso_angle: Option<f32>,
    pub head_torque: f32,
    pub torso_torque: f32,
    pub foot_torque: f32,
    pub head_move_force: f32,
    pub torso_move_force: f32,
    pub foot_move_force: f32,
    /// Fixed foot angles in degrees, keyed by limb id.
    #[serde(with = "foot_angle_list")]
    pub foot_angles: BTreeMap<u32, f32>,
}

impl Default for GroundedParams {
    fn default() -> Self {
        Self {
            movement_speed: 1.0,
            cycle_speed: 6.0,
            step_size: Vec2::new(0.3, 0.15),
            head_position: 1.3,
            torso_position: 0.9,
            head_angle: None,
            torso_angle: None,
            head_torque: 50.0,
            torso_torque: 50.0,
            foot_torque: 25.0,
            head_move_force: 1.0,
            torso_move_force: 1.0,
            foot_move_force: 1.0,
            foot_angles: BTreeMap::new(),
        }
    }
}

/// Fields shared by every swim gait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwimParams {
    pub movement_speed: f32,
    pub steer_torque: f32,
    pub head_angle: Option<f32>,
    pub torso_angle: Option<f32>,
    pub head_torque: f32,
    pub torso_torque: f32,
    pub foot_torque: f32,
    pub rotate_towards_movement: bool,
    /// Fixed foot angles in degrees, keyed by limb id.
    #[serde(with = "foot_angle_list")]
    pub foot_angles: BTreeMap<u32, f32>,
}

impl Default for SwimParams {
    fn default() -> Self {
        Self {
            movement_speed: 1.5,
            steer_torque: 25.0,
            head_angle: None,
            torso_angle: None,
            head_torque: 50.0,
            torso_torque: 50.0,
            foot_torque: 25.0,
            rotate_towards_movement: true,
            foot_angles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FishGroundedParams {
    #[serde(flatten)]
    pub common: GroundedParams,
    pub tail_angle: Option<f32>,
    pub tail_torque: f32,
    pub leg_torque: f32,
    pub flip: bool,
}

impl Default for FishGroundedParams {
    fn default() -> Self {
        Self {
            common: GroundedParams::default(),
            tail_angle: None,
            tail_torque: 25.0,
            leg_torque: 0.0,
            flip: true,
        }
    }
}

static FISH_GROUNDED_PROPERTIES: &[Property<FishGroundedParams>] = &[
    float_property!(FishGroundedParams, "movement_speed", "Target speed", [0.0, 20.0], common.movement_speed),
    float_property!(FishGroundedParams, "cycle_speed", "Step cycle speed", [0.0, 50.0], common.cycle_speed),
    vector_property!(FishGroundedParams, "step_size", "Step length and lift", common.step_size),
    float_property!(FishGroundedParams, "head_position", "Head height", [0.0, 10.0], common.head_position),
    float_property!(FishGroundedParams, "torso_position", "Torso height", [0.0, 10.0], common.torso_position),
    angle_property!(FishGroundedParams, "head_angle", "Head angle (deg)", common.head_angle),
    angle_property!(FishGroundedParams, "torso_angle", "Torso angle (deg)", common.torso_angle),
    angle_property!(FishGroundedParams, "tail_angle", "Tail angle (deg)", tail_angle),
    float_property!(FishGroundedParams, "head_torque", "Head rotation torque", [0.0, 1000.0], common.head_torque),
    float_property!(FishGroundedParams, "torso_torque", "Torso rotation torque", [0.0, 1000.0], common.torso_torque),
    float_property!(FishGroundedParams, "tail_torque", "Tail rotation torque", [0.0, 1000.0], tail_torque),
    float_property!(FishGroundedParams, "foot_torque", "Foot rotation torque", [0.0, 1000.0], common.foot_torque),
    float_property!(FishGroundedParams, "leg_torque", "Constant leg torque", [-1000.0, 1000.0], leg_torque),
    float_property!(FishGroundedParams, "head_move_force", "Head pull force", [0.0, 100.0], common.head_move_force),
    float_property!(FishGroundedParams, "torso_move_force", "Torso pull force", [0.0, 100.0], common.torso_move_force),
    float_property!(FishGroundedParams, "foot_move_force", "Foot pull force", [0.0, 100.0], common.foot_move_force),
    bool_property!(FishGroundedParams, "flip", "Turn around when walking", flip),
];

impl PropertyTable for FishGroundedParams {
    fn properties() -> &'static [Property<Self>] {
        FISH_GROUNDED_PROPERTIES
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FishSwimParams {
    #[serde(flatten)]
    pub common: SwimParams,
    pub wave_amplitude: f32,
    pub wave_length: f32,
    pub tail_angle: Option<f32>,
    pub tail_torque: f32,
    /// Bob the main limb with the wave instead of lerping it to the collider.
    pub use_sine_movement: bool,
    /// Mirror limb positions when turning (side-view swimmers).
    pub mirror: bool,
    pub flip: bool,
}

impl Default for FishSwimParams {
    fn default() -> Self {
        Self {
            common: SwimParams::default(),
            wave_amplitude: 1.0,
            wave_length: 10.0,
            tail_angle: None,
            tail_torque: 25.0,
            use_sine_movement: false,
            mirror: false,
            flip: true,
        }
    }
}

static FISH_SWIM_PROPERTIES: &[Property<FishSwimParams>] = &[
    float_property!(FishSwimParams, "movement_speed", "Target speed", [0.0, 20.0], common.movement_speed),
    float_property!(FishSwimParams, "steer_torque", "Collider steering torque", [0.0, 1000.0], common.steer_torque),
    angle_property!(FishSwimParams, "head_angle", "Head angle (deg)", common.head_angle),
    angle_property!(FishSwimParams, "torso_angle", "Torso angle (deg)", common.torso_angle),
    angle_property!(FishSwimParams, "tail_angle", "Tail angle (deg)", tail_angle),
    float_property!(FishSwimParams, "head_torque", "Head rotation torque", [0.0, 1000.0], common.head_torque),
    float_property!(FishSwimParams, "torso_torque", "Torso rotation torque", [0.0, 1000.0], common.torso_torque),
    float_property!(FishSwimParams, "tail_torque", "Tail wave torque", [0.0, 1000.0], tail_torque),
    float_property!(FishSwimParams, "foot_torque", "Foot rotation torque", [0.0, 1000.0], common.foot_torque),
    float_property!(FishSwimParams, "wave_amplitude", "Tail wave amplitude", [-100.0, 100.0], wave_amplitude),
    float_property!(FishSwimParams, "wave_length", "Tail wave length", [-1000.0, 1000.0], wave_length),
    bool_property!(FishSwimParams, "rotate_towards_movement", "Face the swim direction", common.rotate_towards_movement),
    bool_property!(FishSwimParams, "use_sine_movement", "Bob with the wave", use_sine_movement),
    bool_property!(FishSwimParams, "mirror", "Mirror limbs when turning", mirror),
    bool_property!(FishSwimParams, "flip", "Turn around when swimming", flip),
];

impl PropertyTable for FishSwimParams {
    fn properties() -> &'static [Property<Self>] {
        FISH_SWIM_PROPERTIES
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanGroundedParams {
    #[serde(flatten)]
    pub common: GroundedParams,
    /// Horizontal head offset per unit of movement.
    pub head_lean_amount: f32,
    /// Horizontal torso offset per unit of movement.
    pub torso_lean_amount: f32,
    /// Arm swing length, relative to the step length.
    pub hand_move_strength: f32,
    pub hand_move_force: f32,
    pub leg_torque: f32,
}

impl Default for HumanGroundedParams {
    fn default() -> Self {
        Self {
            common: GroundedParams::default(),
            head_lean_amount: 0.1,
            torso_lean_amount: 0.1,
            hand_move_strength: 0.7,
            hand_move_force: 0.6,
            leg_torque: 0.0,
        }
    }
}

static HUMAN_GROUNDED_PROPERTIES: &[Property<HumanGroundedParams>] = &[
    float_property!(HumanGroundedParams, "movement_speed", "Target speed", [0.0, 20.0], common.movement_speed),
    float_property!(HumanGroundedParams, "cycle_speed", "Step cycle speed", [0.0, 50.0], common.cycle_speed),
    vector_property!(HumanGroundedParams, "step_size", "Step length and lift", common.step_size),
    float_property!(HumanGroundedParams, "head_position", "Head height", [0.0, 10.0], common.head_position),
    float_property!(HumanGroundedParams, "torso_position", "Torso height", [0.0, 10.0], common.torso_position),
    angle_property!(HumanGroundedParams, "head_angle", "Head angle (deg)", common.head_angle),
    angle_property!(HumanGroundedParams, "torso_angle", "Torso angle (deg)", common.torso_angle),
    float_property!(HumanGroundedParams, "head_torque", "Head rotation torque", [0.0, 1000.0], common.head_torque),
    float_property!(HumanGroundedParams, "torso_torque", "Torso rotation torque", [0.0, 1000.0], common.torso_torque),
    float_property!(HumanGroundedParams, "foot_torque", "Foot rotation torque", [0.0, 1000.0], common.foot_torque),
    float_property!(HumanGroundedParams, "head_move_force", "Head pull force", [0.0, 100.0], common.head_move_force),
    float_property!(HumanGroundedParams, "torso_move_force", "Torso pull force", [0.0, 100.0], common.torso_move_force),
    float_property!(HumanGroundedParams, "foot_move_force", "Foot pull force", [0.0, 100.0], common.foot_move_force),
    float_property!(HumanGroundedParams, "head_lean_amount", "Head lean", [-5.0, 5.0], head_lean_amount),
    float_property!(HumanGroundedParams, "torso_lean_amount", "Torso lean", [-5.0, 5.0], torso_lean_amount),
    float_property!(HumanGroundedParams, "hand_move_strength", "Arm swing", [0.0, 5.0], hand_move_strength),
    float_property!(HumanGroundedParams, "hand_move_force", "Hand pull force", [0.0, 100.0], hand_move_force),
    float_property!(HumanGroundedParams, "leg_torque", "Constant leg torque", [-1000.0, 1000.0], leg_torque),
];

impl PropertyTable for HumanGroundedParams {
    fn properties() -> &'static [Property<Self>] {
        HUMAN_GROUNDED_PROPERTIES
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanSwimParams {
    #[serde(flatten)]
    pub common: SwimParams,
    /// Amplitude of the leg kick.
    pub leg_move_amount: f32,
    /// Distance travelled per kick cycle.
    pub leg_cycle_length: f32,
    /// Size of the hand stroke ellipse.
    pub hand_move_amount: Vec2,
    /// Hand stroke cycle speed relative to the kick.
    pub hand_cycle_speed: f32,
    pub hand_move_force: f32,
    pub foot_move_force: f32,
}

impl Default for HumanSwimParams {
    fn default() -> Self {
        Self {
            common: SwimParams::default(),
            leg_move_amount: 0.3,
            leg_cycle_length: 1.5,
            hand_move_amount: Vec2::new(0.5, 0.4),
            hand_cycle_speed: 0.5,
            hand_move_force: 0.7,
            foot_move_force: 0.5,
        }
    }
}

static HUMAN_SWIM_PROPERTIES: &[Property<HumanSwimParams>] = &[
    float_property!(HumanSwimParams, "movement_speed", "Target speed", [0.0, 20.0], common.movement_speed),
    float_property!(HumanSwimParams, "steer_torque", "Collider steering torque", [0.0, 1000.0], common.steer_torque),
    angle_property!(HumanSwimParams, "head_angle", "Head angle (deg)", common.head_angle),
    angle_property!(HumanSwimParams, "torso_angle", "Torso angle (deg)", common.torso_angle),
    float_property!(HumanSwimParams, "head_torque", "Head rotation torque", [0.0, 1000.0], common.head_torque),
    float_property!(HumanSwimParams, "torso_torque", "Torso rotation torque", [0.0, 1000.0], common.torso_torque),
    float_property!(HumanSwimParams, "foot_torque", "Foot rotation torque", [0.0, 1000.0], common.foot_torque),
    bool_property!(HumanSwimParams, "rotate_towards_movement", "Face the swim direction", common.rotate_towards_movement),
    float_property!(HumanSwimParams, "leg_move_amount", "Kick amplitude", [0.0, 5.0], leg_move_amount),
    float_property!(HumanSwimParams, "leg_cycle_length", "Kick cycle length", [0.01, 20.0], leg_cycle_length),
    vector_property!(HumanSwimParams, "hand_move_amount", "Stroke size", hand_move_amount),
    float_property!(HumanSwimParams, "hand_cycle_speed", "Stroke speed", [0.0, 10.0], hand_cycle_speed),
    float_property!(HumanSwimParams, "hand_move_force", "Hand pull force", [0.0, 100.0], hand_move_force),
    float_property!(HumanSwimParams, "foot_move_force", "Foot pull force", [0.0, 100.0], foot_move_force),
];

impl PropertyTable for HumanSwimParams {
    fn properties() -> &'static [Property<Self>] {
        HUMAN_SWIM_PROPERTIES
    }
}

/// One animation slot of a species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AnimationParams {
    FishGrounded(FishGroundedParams),
    FishSwim(FishSwimParams),
    HumanGrounded(HumanGroundedParams),
    HumanSwim(HumanSwimParams),
}

impl AnimationParams {
    pub fn is_swim(&self) -> bool {
        matches!(
            self,
            AnimationParams::FishSwim(_) | AnimationParams::HumanSwim(_)
        )
    }

    pub fn is_fish(&self) -> bool {
        matches!(
            self,
            AnimationParams::FishGrounded(_) | AnimationParams::FishSwim(_)
        )
    }

    pub fn movement_speed(&self) -> f32 {
        match self {
            AnimationParams::FishGrounded(p) => p.common.movement_speed,
            AnimationParams::HumanGrounded(p) => p.common.movement_speed,
            AnimationParams::FishSwim(p) => p.common.movement_speed,
            AnimationParams::HumanSwim(p) => p.common.movement_speed,
        }
    }

    /// Grounded fields, if this is a grounded variant.
    pub fn grounded(&self) -> Option<&GroundedParams> {
        match self {
            AnimationParams::FishGrounded(p) => Some(&p.common),
            AnimationParams::HumanGrounded(p) => Some(&p.common),
            _ => None,
        }
    }

    /// Swim fields, if this is a swim variant.
    pub fn swim(&self) -> Option<&SwimParams> {
        match self {
            AnimationParams::FishSwim(p) => Some(&p.common),
            AnimationParams::HumanSwim(p) => Some(&p.common),
            _ => None,
        }
    }

    /// Whether this animation lets the character turn around.
    pub fn can_flip(&self) -> bool {
        match self {
            AnimationParams::FishGrounded(p) => p.flip,
            AnimationParams::FishSwim(p) => p.flip,
            _ => true,
        }
    }

    /// Whether turning around mirrors limb positions.
    pub fn mirrors(&self) -> bool {
        matches!(self, AnimationParams::FishSwim(p) if p.mirror)
    }

    fn foot_angles_mut(&mut self) -> &mut BTreeMap<u32, f32> {
        match self {
            AnimationParams::FishGrounded(p) => &mut p.common.foot_angles,
            AnimationParams::HumanGrounded(p) => &mut p.common.foot_angles,
            AnimationParams::FishSwim(p) => &mut p.common.foot_angles,
            AnimationParams::HumanSwim(p) => &mut p.common.foot_angles,
        }
    }

    fn foot_angles(&self) -> &BTreeMap<u32, f32> {
        match self {
            AnimationParams::FishGrounded(p) => &p.common.foot_angles,
            AnimationParams::HumanGrounded(p) => &p.common.foot_angles,
            AnimationParams::FishSwim(p) => &p.common.foot_angles,
            AnimationParams::HumanSwim(p) => &p.common.foot_angles,
        }
    }

    /// Fixed foot angle for a limb, in radians (NaN → 0).
    pub fn foot_angle_radians(&self, limb_id: u32) -> Option<f32> {
        angle_radians(self.foot_angles().get(&limb_id).copied())
    }

    pub fn set_foot_angle(&mut self, limb_id: u32, degrees: f32) {
        self.foot_angles_mut().insert(limb_id, degrees);
    }

    pub fn remove_foot_angle(&mut self, limb_id: u32) -> Option<f32> {
        self.foot_angles_mut().remove(&limb_id)
    }

    /// The named-property view of the active variant.
    pub fn editable(&self) -> &dyn Editable {
        match self {
            AnimationParams::FishGrounded(p) => p as &dyn Editable,
            AnimationParams::FishSwim(p) => p as &dyn Editable,
            AnimationParams::HumanGrounded(p) => p as &dyn Editable,
            AnimationParams::HumanSwim(p) => p as &dyn Editable,
        }
    }

    pub fn editable_mut(&mut self) -> &mut dyn Editable {
        match self {
            AnimationParams::FishGrounded(p) => p as &mut dyn Editable,
            AnimationParams::FishSwim(p) => p as &mut dyn Editable,
            AnimationParams::HumanGrounded(p) => p as &mut dyn Editable,
            AnimationParams::HumanSwim(p) => p as &mut dyn Editable,
        }
    }
}

impl GroundedParams {
    pub fn head_angle_radians(&self) -> Option<f32> {
        angle_radians(self.head_angle)
    }

    pub fn torso_angle_radians(&self) -> Option<f32> {
        angle_radians(self.torso_angle)
    }

    /// Step size with NaN components zeroed.
    pub fn valid_step_size(&self) -> Vec2 {
        Vec2::new(
            math::valid_or_zero(self.step_size.x),
            math::valid_or_zero(self.step_size.y),
        )
    }
}

impl SwimParams {
    pub fn head_angle_radians(&self) -> Option<f32> {
        angle_radians(self.head_angle)
    }

    pub fn torso_angle_radians(&self) -> Option<f32> {
        angle_radians(self.torso_angle)
    }
}

impl FishGroundedParams {
    pub fn tail_angle_radians(&self) -> Option<f32> {
        angle_radians(self.tail_angle)
    }
}

impl FishSwimParams {
    pub fn tail_angle_radians(&self) -> Option<f32> {
        angle_radians(self.tail_angle)
    }
}

/// The four animation slots of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSet {
    pub walk: AnimationParams,
    pub run: AnimationParams,
    pub swim_slow: AnimationParams,
    pub swim_fast: AnimationParams,
}

impl AnimationSet {
    pub fn get(&self, kind: AnimationType) -> &AnimationParams {
        match kind {
            AnimationType::Walk => &self.walk,
            AnimationType::Run => &self.run,
            AnimationType::SwimSlow => &self.swim_slow,
            AnimationType::SwimFast => &self.swim_fast,
        }
    }

    pub fn get_mut(&mut self, kind: AnimationType) -> &mut AnimationParams {
        match kind {
            AnimationType::Walk => &mut self.walk,
            AnimationType::Run => &mut self.run,
            AnimationType::SwimSlow => &mut self.swim_slow,
            AnimationType::SwimFast => &mut self.swim_fast,
        }
    }

    /// Default humanoid set.
    pub fn humanoid() -> Self {
        let run = HumanGroundedParams {
            common: GroundedParams {
                movement_speed: 2.5,
                cycle_speed: 5.0,
                step_size: Vec2::new(0.45, 0.2),
                ..GroundedParams::default()
            },
            torso_lean_amount: 0.25,
            head_lean_amount: 0.3,
            ..HumanGroundedParams::default()
        };
        let swim_fast = HumanSwimParams {
            common: SwimParams {
                movement_speed: 2.5,
                ..SwimParams::default()
            },
            leg_move_amount: 0.45,
            ..HumanSwimParams::default()
        };
        Self {
            walk: AnimationParams::HumanGrounded(HumanGroundedParams::default()),
            run: AnimationParams::HumanGrounded(run),
            swim_slow: AnimationParams::HumanSwim(HumanSwimParams::default()),
            swim_fast: AnimationParams::HumanSwim(swim_fast),
        }
    }

    /// Default fish set.
    pub fn fish() -> Self {
        let swim_fast = FishSwimParams {
            common: SwimParams {
                movement_speed: 4.0,
                ..SwimParams::default()
            },
            wave_amplitude: 1.5,
            ..FishSwimParams::default()
        };
        let run = FishGroundedParams {
            common: GroundedParams {
                movement_speed: 2.0,
                ..GroundedParams::default()
            },
            ..FishGroundedParams::default()
        };
        Self {
            walk: AnimationParams::FishGrounded(FishGroundedParams::default()),
            run: AnimationParams::FishGrounded(run),
            swim_slow: AnimationParams::FishSwim(FishSwimParams::default()),
            swim_fast: AnimationParams::FishSwim(swim_fast),
        }
    }

    /// Every slot must be of the matching locomotion kind and one body plan.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, params, swim) in [
            ("walk", &self.walk, false),
            ("run", &self.run, false),
            ("swim_slow", &self.swim_slow, true),
            ("swim_fast", &self.swim_fast, true),
        ] {
            if params.is_swim() != swim {
                problems.push(format!("{} animation has the wrong locomotion kind", name));
            }
            if params.is_fish() != self.walk.is_fish() {
                problems.push(format!("{} animation mixes body plans", name));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn test_select_animation_type() {
        assert_eq!(AnimationType::select(false, false), AnimationType::Walk);
        assert_eq!(AnimationType::select(false, true), AnimationType::Run);
        assert_eq!(AnimationType::select(true, false), AnimationType::SwimSlow);
        assert_eq!(AnimationType::select(true, true), AnimationType::SwimFast);
    }

    #[test]
    fn test_editable_dispatches_on_variant() {
        let mut params = AnimationParams::FishSwim(FishSwimParams::default());
        assert!(params.editable().property_names().contains(&"wave_length"));
        assert!(!params.editable().property_names().contains(&"cycle_speed"));
        params
            .editable_mut()
            .set("wave_length", ParamValue::Float(4.0))
            .unwrap();
        match &params {
            AnimationParams::FishSwim(p) => assert_eq!(p.wave_length, 4.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_nested_common_field_editable() {
        let mut params = HumanGroundedParams::default();
        params
            .set("movement_speed", ParamValue::Float(3.0))
            .unwrap();
        assert_eq!(params.common.movement_speed, 3.0);
        params
            .set("head_angle", ParamValue::OptionalFloat(Some(15.0)))
            .unwrap();
        assert_eq!(params.common.head_angle, Some(15.0));
        params.reset();
        assert_eq!(params.common.head_angle, None);
    }

    #[test]
    fn test_foot_angles() {
        let mut params = AnimationParams::FishGrounded(FishGroundedParams::default());
        params.set_foot_angle(4, 90.0);
        let r = params.foot_angle_radians(4).unwrap();
        assert!((r - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        params.set_foot_angle(5, f32::NAN);
        assert_eq!(params.foot_angle_radians(5), Some(0.0));
        assert_eq!(params.remove_foot_angle(4), Some(90.0));
        assert_eq!(params.foot_angle_radians(4), None);
    }

    #[test]
    fn test_default_sets_validate() {
        assert!(AnimationSet::humanoid().validate().is_empty());
        assert!(AnimationSet::fish().validate().is_empty());
        let mut mixed = AnimationSet::fish();
        mixed.run = AnimationParams::HumanGrounded(HumanGroundedParams::default());
        assert_eq!(mixed.validate().len(), 1);
    }

    #[test]
    fn test_tagged_json_roundtrip_shape() {
        let json = r#"{ "kind": "FishSwim", "wave_length": 6.0, "movement_speed": 2.0,
                        "foot_angles": [[3, 45.0]] }"#;
        let params: AnimationParams = serde_json::from_str(json).unwrap();
        match params {
            AnimationParams::FishSwim(p) => {
                assert_eq!(p.wave_length, 6.0);
                assert_eq!(p.common.movement_speed, 2.0);
                assert_eq!(p.tail_torque, 25.0);
                assert_eq!(p.common.foot_angles.get(&3), Some(&45.0));
            }
            _ => panic!("wrong variant"),
        }
    }
}
