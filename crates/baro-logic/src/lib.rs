//! Pure ragdoll animation logic for BaroSim.
//!
//! This crate contains the character animation core independent of any
//! ECS or engine: a small deterministic physics world, ragdolls built from
//! designer parameters, and the per-character controller that drives them
//! with species-specific gaits. Functions take plain data, which keeps
//! everything unit-testable.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`anim`] | AnimController, gait strategies (fish, humanoid), tuning config |
//! | [`character`] | Vitals, input and movement control around the controller |
//! | [`content`] | Species parameters, built-in species, JSON content registry |
//! | [`error`] | Content and animation error types |
//! | [`hull`] | Hulls and gaps: water flow, pressure, oxygen |
//! | [`limb`] | Limbs, joints, facing direction, render transforms |
//! | [`lod`] | Level-of-detail tiers for distant ragdolls |
//! | [`math`] | 2D vectors and angle helpers |
//! | [`params`] | Editable ragdoll and animation parameter objects |
//! | [`physics`] | Minimal 2D rigid-body world with revolute and pull joints |
//! | [`predation`] | Bites that tear limbs off prey |
//! | [`ragdoll`] | Limb/joint assembly, flipping, severing, simple physics |

pub mod anim;
pub mod character;
pub mod content;
pub mod error;
pub mod hull;
pub mod limb;
pub mod lod;
pub mod math;
pub mod params;
pub mod physics;
pub mod predation;
pub mod ragdoll;

pub use anim::{AnimConfig, AnimController, AnimInput, AnimState};
pub use character::{Character, CharacterInput};
pub use content::{BodyPlan, ContentRegistry, SpeciesParams};
pub use error::{AnimError, ContentError};
pub use math::Vec2;
pub use physics::PhysicsWorld;
pub use ragdoll::Ragdoll;
