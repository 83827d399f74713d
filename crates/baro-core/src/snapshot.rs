//! Ragdoll snapshots for remote reconciliation.
//!
//! The authoritative side captures a [`RagdollSnapshot`] per character and
//! encodes it with bincode. The receiving side decodes it and applies it
//! to its copy of the character: the collider transform becomes the
//! ragdoll's target, which the controller eases toward (or teleports to
//! when the error is large).

use std::io::{Read, Write};

use baro_logic::limb::{Direction, LimbTransform};
use baro_logic::{Character, PhysicsWorld, Vec2};
use serde::{Deserialize, Serialize};

/// Version number for the snapshot format (increment when it changes)
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("snapshot version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("snapshot has {found} limbs but the character has {expected}")]
    LimbCountMismatch { expected: usize, found: usize },
    #[error("snapshot is for character {found}, not {expected}")]
    CharacterMismatch { expected: u32, found: u32 },
}

/// Authoritative transform of one ragdoll at one simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagdollSnapshot {
    pub version: u32,
    pub character: u32,
    pub step: u64,
    pub position: Vec2,
    pub rotation: f32,
    pub dir: Direction,
    pub limbs: Vec<LimbTransform>,
}

impl RagdollSnapshot {
    pub fn capture(character: &Character, physics: &PhysicsWorld, step: u64) -> Self {
        let ragdoll = character.anim().ragdoll();
        let collider = physics.body(ragdoll.collider());
        Self {
            version: SNAPSHOT_VERSION,
            character: character.id(),
            step,
            position: collider.position,
            rotation: collider.rotation,
            dir: ragdoll.dir(),
            limbs: ragdoll.limb_transforms(physics, 1.0),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)?;
        snapshot.check_version()
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), SnapshotError> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize_from(reader)?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: self.version,
            });
        }
        Ok(self)
    }

    /// Point the character's ragdoll at this snapshot. Facing is applied
    /// immediately; the transform is smoothed by the next animation steps.
    pub fn apply_to(
        &self,
        character: &mut Character,
        physics: &mut PhysicsWorld,
    ) -> Result<(), SnapshotError> {
        if self.character != character.id() {
            return Err(SnapshotError::CharacterMismatch {
                expected: character.id(),
                found: self.character,
            });
        }
        let limb_count = character.anim().ragdoll().limbs().len();
        if self.limbs.len() != limb_count {
            return Err(SnapshotError::LimbCountMismatch {
                expected: limb_count,
                found: self.limbs.len(),
            });
        }

        let anim = character.anim_mut();
        if anim.dir() != self.dir {
            anim.flip(false, physics);
        }
        let ragdoll = anim.ragdoll_mut();
        ragdoll.target_position = Some(self.position);
        ragdoll.target_rotation = Some(self.rotation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baro_logic::{AnimConfig, SpeciesParams};
    use std::sync::Arc;

    fn spawn(id: u32, species: SpeciesParams, physics: &mut PhysicsWorld) -> Character {
        Character::spawn(
            id,
            Arc::new(species),
            Vec2::new(0.0, 2.0),
            AnimConfig::default(),
            physics,
        )
        .unwrap()
    }

    #[test]
    fn test_encode_decode() {
        let mut physics = PhysicsWorld::default();
        let fish = spawn(3, SpeciesParams::fish(), &mut physics);
        let snapshot = RagdollSnapshot::capture(&fish, &physics, 42);
        assert_eq!(snapshot.limbs.len(), 3);

        let bytes = snapshot.encode().unwrap();
        let decoded = RagdollSnapshot::decode(&bytes).unwrap();
        assert_eq!(decoded, snapshot);

        let mut buffer = Vec::new();
        snapshot.write_to(&mut buffer).unwrap();
        assert_eq!(buffer, bytes);
        assert_eq!(RagdollSnapshot::read_from(buffer.as_slice()).unwrap(), snapshot);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut physics = PhysicsWorld::default();
        let fish = spawn(3, SpeciesParams::fish(), &mut physics);
        let mut snapshot = RagdollSnapshot::capture(&fish, &physics, 0);
        snapshot.version = SNAPSHOT_VERSION + 1;
        let bytes = snapshot.encode().unwrap();
        assert!(matches!(
            RagdollSnapshot::decode(&bytes),
            Err(SnapshotError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(matches!(
            RagdollSnapshot::decode(&[1, 2]),
            Err(SnapshotError::Bincode(_))
        ));
    }

    #[test]
    fn test_apply_sets_targets_and_facing() {
        let mut physics = PhysicsWorld::default();
        let mut fish = spawn(3, SpeciesParams::fish(), &mut physics);
        let mut snapshot = RagdollSnapshot::capture(&fish, &physics, 1);
        snapshot.position = Vec2::new(4.0, 2.0);
        snapshot.rotation = 0.5;
        snapshot.dir = fish.anim().dir().opposite();

        snapshot.apply_to(&mut fish, &mut physics).unwrap();
        let ragdoll = fish.anim().ragdoll();
        assert_eq!(ragdoll.target_position, Some(Vec2::new(4.0, 2.0)));
        assert_eq!(ragdoll.target_rotation, Some(0.5));
        assert_eq!(fish.anim().dir(), snapshot.dir);
    }

    #[test]
    fn test_apply_checks_shape() {
        let mut physics = PhysicsWorld::default();
        let fish = spawn(3, SpeciesParams::fish(), &mut physics);
        let mut human = spawn(4, SpeciesParams::humanoid(), &mut physics);
        let mut snapshot = RagdollSnapshot::capture(&fish, &physics, 1);

        assert!(matches!(
            snapshot.apply_to(&mut human, &mut physics),
            Err(SnapshotError::CharacterMismatch { expected: 4, found: 3 })
        ));
        snapshot.character = 4;
        assert!(matches!(
            snapshot.apply_to(&mut human, &mut physics),
            Err(SnapshotError::LimbCountMismatch { expected: 12, found: 3 })
        ));
        assert_eq!(human.anim().ragdoll().target_position, None);
    }
}
