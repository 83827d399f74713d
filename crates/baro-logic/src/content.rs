//! Species content: ragdoll and animation parameters per species, decoded
//! from JSON and shared between characters through `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ContentError;
use crate::math::Vec2;
use crate::params::{
    AnimationParams, AnimationSet, JointParams, LimbParams, LimbType, RagdollParams,
};
use crate::physics::Shape;

/// Which gait family drives a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyPlan {
    Humanoid,
    Fish,
}

/// Everything needed to spawn a character of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParams {
    pub name: String,
    pub body_plan: BodyPlan,
    pub ragdoll: RagdollParams,
    pub animations: AnimationSet,
    #[serde(default = "default_max_health")]
    pub max_health: f32,
    #[serde(default = "default_needs_air")]
    pub needs_air: bool,
    /// Damage dealt to prey per bite.
    #[serde(default = "default_bite_damage")]
    pub bite_damage: f32,
}

fn default_max_health() -> f32 {
    100.0
}

fn default_needs_air() -> bool {
    true
}

fn default_bite_damage() -> f32 {
    10.0
}

fn rect(width: f32, height: f32) -> Shape {
    Shape::Rect { width, height }
}

fn limb(id: u32, limb_type: LimbType, shape: Shape) -> LimbParams {
    LimbParams {
        id,
        limb_type,
        shape,
        ..LimbParams::default()
    }
}

fn joint(limb1: u32, limb2: u32, anchor1: (f32, f32), anchor2: (f32, f32)) -> JointParams {
    JointParams {
        limb1,
        limb2,
        limb1_anchor: Vec2::new(anchor1.0, anchor1.1),
        limb2_anchor: Vec2::new(anchor2.0, anchor2.1),
        ..JointParams::default()
    }
}

impl SpeciesParams {
    /// A standing biped: torso, head, two legs of three segments and two
    /// arms of two.
    pub fn humanoid() -> Self {
        let mut limbs = vec![
            limb(0, LimbType::Torso, rect(0.3, 0.5)),
            limb(1, LimbType::Head, Shape::Circle { radius: 0.12 }),
            limb(2, LimbType::LeftThigh, rect(0.12, 0.3)),
            limb(3, LimbType::RightThigh, rect(0.12, 0.3)),
            limb(4, LimbType::LeftLeg, rect(0.1, 0.3)),
            limb(5, LimbType::RightLeg, rect(0.1, 0.3)),
            limb(6, LimbType::LeftFoot, rect(0.2, 0.06)),
            limb(7, LimbType::RightFoot, rect(0.2, 0.06)),
            limb(8, LimbType::LeftArm, rect(0.1, 0.28)),
            limb(9, LimbType::RightArm, rect(0.1, 0.28)),
            limb(10, LimbType::LeftHand, rect(0.08, 0.14)),
            limb(11, LimbType::RightHand, rect(0.08, 0.14)),
        ];
        // feet step under their hips
        limbs[6].ref_joint = Some(1);
        limbs[7].ref_joint = Some(2);
        for foot in &mut limbs[6..8] {
            foot.friction = 0.8;
        }

        let mut joints = vec![
            joint(0, 1, (0.0, 0.25), (0.0, -0.12)),
            joint(0, 2, (0.0, -0.25), (0.0, 0.15)),
            joint(0, 3, (0.0, -0.25), (0.0, 0.15)),
            joint(2, 4, (0.0, -0.15), (0.0, 0.15)),
            joint(3, 5, (0.0, -0.15), (0.0, 0.15)),
            joint(4, 6, (0.0, -0.15), (-0.05, 0.03)),
            joint(5, 7, (0.0, -0.15), (-0.05, 0.03)),
            joint(0, 8, (0.0, 0.2), (0.0, 0.14)),
            joint(0, 9, (0.0, 0.2), (0.0, 0.14)),
            joint(8, 10, (0.0, -0.14), (0.0, 0.07)),
            joint(9, 11, (0.0, -0.14), (0.0, 0.07)),
        ];
        // knees only bend backwards
        for knee in &mut joints[3..5] {
            knee.lower_limit = 0.0;
            knee.upper_limit = 120.0;
        }
        for arm in &mut joints[7..9] {
            arm.lower_limit = -150.0;
            arm.upper_limit = 150.0;
        }

        let mut animations = AnimationSet::humanoid();
        for slot in [&mut animations.walk, &mut animations.run] {
            if let AnimationParams::HumanGrounded(p) = slot {
                p.common.torso_angle = Some(0.0);
                p.common.head_angle = Some(0.0);
            }
        }

        Self {
            name: "human".to_string(),
            body_plan: BodyPlan::Humanoid,
            ragdoll: RagdollParams {
                collider_radius: 0.25,
                collider_height: 1.3,
                main_limb: LimbType::Torso,
                limbs,
                joints,
                ..RagdollParams::default()
            },
            animations,
            max_health: default_max_health(),
            needs_air: true,
            bite_damage: 5.0,
        }
    }

    /// A three-segment swimmer lying on its side, with a mouth on the head.
    pub fn fish() -> Self {
        let torso = limb(0, LimbType::Torso, rect(0.8, 0.3));
        let mut head = limb(1, LimbType::Head, rect(0.3, 0.25));
        head.mouth_pos = Some(Vec2::new(0.15, 0.0));
        head.steer_force = 1.0;
        let tail = limb(2, LimbType::Tail, rect(0.5, 0.15));

        let mut animations = AnimationSet::fish();
        for slot in [&mut animations.swim_slow, &mut animations.swim_fast] {
            if let AnimationParams::FishSwim(p) = slot {
                p.common.torso_angle = Some(90.0);
                p.common.head_angle = Some(90.0);
                p.tail_angle = Some(90.0);
            }
        }

        Self {
            name: "fish".to_string(),
            body_plan: BodyPlan::Fish,
            ragdoll: RagdollParams {
                collider_radius: 0.2,
                collider_height: 0.8,
                collider_stand_angle: 90.0,
                main_limb: LimbType::Torso,
                can_enter_submarine: false,
                limbs: vec![torso, head, tail],
                joints: vec![
                    joint(0, 1, (0.4, 0.0), (-0.15, 0.0)),
                    joint(0, 2, (-0.4, 0.0), (0.25, 0.0)),
                ],
                ..RagdollParams::default()
            },
            animations,
            max_health: 150.0,
            needs_air: false,
            bite_damage: default_bite_damage(),
        }
    }

    /// Every problem with this species, ragdoll first.
    pub fn validate(&self) -> Result<(), ContentError> {
        let problems = self.ragdoll.validate();
        if !problems.is_empty() {
            return Err(ContentError::InvalidRagdoll {
                name: self.name.clone(),
                problems,
            });
        }
        let mut problems = self.animations.validate();
        if self.animations.walk.is_fish() != (self.body_plan == BodyPlan::Fish) {
            problems.push(format!("animations do not match body plan {:?}", self.body_plan));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ContentError::InvalidAnimations {
                name: self.name.clone(),
                problems,
            })
        }
    }
}

/// Loaded species, by name.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    species: HashMap<String, Arc<SpeciesParams>>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in human and fish.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for species in [SpeciesParams::humanoid(), SpeciesParams::fish()] {
            // built-in names are distinct
            let _ = registry.insert(species);
        }
        registry
    }

    /// Decode and register one species from JSON. `source` names the file
    /// in error messages.
    pub fn load_json(&mut self, source: &str, json: &str) -> Result<Arc<SpeciesParams>, ContentError> {
        let species: SpeciesParams =
            serde_json::from_str(json).map_err(|source_err| ContentError::Decode {
                name: source.to_string(),
                source: source_err,
            })?;
        self.insert(species)
    }

    pub fn insert(&mut self, species: SpeciesParams) -> Result<Arc<SpeciesParams>, ContentError> {
        if self.species.contains_key(&species.name) {
            return Err(ContentError::DuplicateSpecies(species.name));
        }
        species.validate()?;
        log::info!(
            "registered species {} ({} limbs, {} joints)",
            species.name,
            species.ragdoll.limbs.len(),
            species.ragdoll.joints.len()
        );
        let species = Arc::new(species);
        self.species.insert(species.name.clone(), Arc::clone(&species));
        Ok(species)
    }

    pub fn get(&self, name: &str) -> Result<Arc<SpeciesParams>, ContentError> {
        self.species
            .get(name)
            .cloned()
            .ok_or_else(|| ContentError::UnknownSpecies(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.species.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        assert!(SpeciesParams::humanoid().validate().is_ok());
        assert!(SpeciesParams::fish().validate().is_ok());
        let registry = ContentRegistry::with_builtins();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("human").is_ok());
    }

    #[test]
    fn test_json_round_trip_through_registry() {
        let json = serde_json::to_string(&SpeciesParams::fish()).unwrap();
        let mut registry = ContentRegistry::new();
        let fish = registry.load_json("fish.json", &json).unwrap();
        assert_eq!(fish.body_plan, BodyPlan::Fish);
        assert_eq!(fish.ragdoll.limbs.len(), 3);
    }

    #[test]
    fn test_duplicate_species_rejected() {
        let mut registry = ContentRegistry::with_builtins();
        let err = registry.insert(SpeciesParams::fish()).unwrap_err();
        assert!(matches!(err, ContentError::DuplicateSpecies(name) if name == "fish"));
    }

    #[test]
    fn test_bad_json_names_the_source() {
        let mut registry = ContentRegistry::new();
        let err = registry.load_json("broken.json", "{ not json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_mismatched_body_plan_rejected() {
        let mut species = SpeciesParams::fish();
        species.body_plan = BodyPlan::Humanoid;
        assert!(matches!(
            species.validate(),
            Err(ContentError::InvalidAnimations { .. })
        ));
    }

    #[test]
    fn test_unknown_species() {
        let registry = ContentRegistry::new();
        assert!(matches!(
            registry.get("crawler"),
            Err(ContentError::UnknownSpecies(_))
        ));
    }
}
