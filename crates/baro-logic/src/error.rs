//! Error types shared across the logic crate.

use crate::params::LimbType;

/// Problems with species content, found at load or build time.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to decode species `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("species `{0}` is already registered")]
    DuplicateSpecies(String),
    #[error("unknown species `{0}`")]
    UnknownSpecies(String),
    #[error("invalid ragdoll for `{name}`: {}", problems.join("; "))]
    InvalidRagdoll { name: String, problems: Vec<String> },
    #[error("invalid animations for `{name}`: {}", problems.join("; "))]
    InvalidAnimations { name: String, problems: Vec<String> },
}

/// Conditions that stop an animation routine from proceeding.
///
/// These never leave the controller: they are logged once per character
/// and turned into a neutral pose or a halted timer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnimError {
    #[error("limb {limb:?} has invalid mass {mass}")]
    InvalidMass { limb: LimbType, mass: f32 },
    #[error("center of mass is not a valid position")]
    InvalidCenterOfMass,
    #[error(
        "limb {limb:?} references joint {index} but the ragdoll has {joint_count} joints; \
         fix the limb's ref_joint in the ragdoll content"
    )]
    ReferenceJointOutOfRange {
        limb: LimbType,
        index: usize,
        joint_count: usize,
    },
    #[error("no limb with a mouth or head to eat with")]
    NoMouthLimb,
}

impl AnimError {
    /// Bit used to remember that this kind of error was already reported.
    pub(crate) fn report_bit(&self) -> u8 {
        match self {
            AnimError::InvalidMass { .. } => 1,
            AnimError::InvalidCenterOfMass => 1 << 1,
            AnimError::ReferenceJointOutOfRange { .. } => 1 << 2,
            AnimError::NoMouthLimb => 1 << 3,
        }
    }
}
