//! Bites: tear one limb off the prey per bite until nothing is left.

use rand::Rng;

use crate::physics::PhysicsWorld;
use crate::ragdoll::Ragdoll;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiteOutcome {
    /// Joint with this index was severed.
    Severed(usize),
    /// No severable joint remains; the prey is eaten.
    Consumed,
}

/// Sever one uniformly chosen severable joint of the prey, crediting
/// `damage` to the torn-off limb.
pub fn resolve_bite<R: Rng>(
    prey: &mut Ragdoll,
    physics: &mut PhysicsWorld,
    rng: &mut R,
    damage: f32,
) -> BiteOutcome {
    let candidates = prey.severable_joints();
    if candidates.is_empty() {
        return BiteOutcome::Consumed;
    }
    let index = candidates[rng.gen_range(0..candidates.len())];
    let torn = prey.joints()[index].limb_b;
    prey.limb_mut(torn).damage += damage;
    prey.sever_joint(index, physics);
    BiteOutcome::Severed(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SpeciesParams;
    use crate::math::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bites_until_consumed() {
        let mut physics = PhysicsWorld::default();
        let species = SpeciesParams::fish();
        let mut prey =
            Ragdoll::build("fish", &species.ragdoll, Vec2::new(0.0, 3.0), &mut physics).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let mut severed = Vec::new();
        loop {
            match resolve_bite(&mut prey, &mut physics, &mut rng, 10.0) {
                BiteOutcome::Severed(i) => {
                    assert!(!severed.contains(&i));
                    assert!(prey.joints()[i].is_severed());
                    severed.push(i);
                }
                BiteOutcome::Consumed => break,
            }
            assert!(severed.len() <= prey.joints().len());
        }
        assert_eq!(severed.len(), 2);
        assert!(prey.severable_joints().is_empty());
    }

    #[test]
    fn test_bite_never_picks_protected_joint() {
        let mut physics = PhysicsWorld::default();
        let mut species = SpeciesParams::fish();
        species.ragdoll.joints[0].can_be_severed = false;
        let mut prey =
            Ragdoll::build("fish", &species.ragdoll, Vec2::new(0.0, 3.0), &mut physics).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            resolve_bite(&mut prey, &mut physics, &mut rng, 1.0),
            BiteOutcome::Severed(1)
        );
        assert_eq!(
            resolve_bite(&mut prey, &mut physics, &mut rng, 1.0),
            BiteOutcome::Consumed
        );
        assert!(!prey.joints()[0].is_severed());
    }
}
