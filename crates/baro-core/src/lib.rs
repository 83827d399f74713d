//! BaroSim Core - Submarine Creature Simulation Engine
//!
//! Runs characters from [`baro_logic`] inside an ECS world on a fixed
//! physics timestep, together with the flooding hulls they move through.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Characters, one per creature or crew member
//! - **Components**: The logic crate's `Character` plus ids and markers
//! - **Engine**: Shared physics world, hulls, content and the step loop
//!
//! Each fixed step runs hulls, level of detail, character control and
//! animation, dragging and bites, the physics step, then post-step reads
//! and removals.
//!
//! # Example
//!
//! ```rust,no_run
//! use baro_core::prelude::*;
//!
//! let mut engine = SimulationEngine::default();
//! let fish = engine.spawn("fish", Vec2::new(0.0, -5.0)).unwrap();
//!
//! loop {
//!     engine.update(1.0 / 60.0);
//!     let _limbs = engine.render_transforms(fish);
//! }
//! ```

pub mod components;
pub mod engine;
pub mod snapshot;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{Camera, EngineConfig, SimulationEngine};
    pub use crate::snapshot::{RagdollSnapshot, SnapshotError};
    pub use baro_logic::{Character, CharacterInput, ContentRegistry, Vec2};
}
