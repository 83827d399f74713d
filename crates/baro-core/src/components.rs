//! ECS components attached to character entities.
//!
//! The character itself ([`baro_logic::Character`]) is stored directly as
//! a component next to these.

use serde::{Deserialize, Serialize};

/// Stable id of a character, shared with the network and the logic crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Marks a character whose authoritative state lives elsewhere. Its
/// transform follows received snapshots instead of local input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    /// Simulation step of the newest snapshot applied.
    pub last_step: u64,
}

/// Why a character left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    Consumed,
    Despawned,
}
