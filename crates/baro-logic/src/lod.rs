//! Level-of-detail tiers for ragdolls.
//!
//! Characters far from the camera do not need articulated limbs. This
//! module classifies each character into a tier; the engine turns the
//! tier into simple physics or a skipped animation update.
//!
//! | Tier | Who | Limbs | Animation |
//! |------|-----|-------|-----------|
//! | `Full` | On screen or close | simulated | every step |
//! | `Simple` | Off screen, within `dormant_distance` | carried by the collider | collider only |
//! | `Dormant` | Beyond `dormant_distance` | carried by the collider | skipped |
//!
//! ```
//! use baro_logic::lod::{classify_ragdoll, LodConfig, LodTier};
//!
//! let config = LodConfig::default();
//! assert_eq!(classify_ragdoll(5.0, true, &config), LodTier::Full);
//! assert_eq!(classify_ragdoll(500.0, false, &config), LodTier::Dormant);
//! ```

use serde::{Deserialize, Serialize};

/// Simulation tier of one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LodTier {
    Full,
    /// Limbs disabled and carried along with the collider.
    Simple,
    /// No animation update at all; the collider still integrates.
    Dormant,
}

impl LodTier {
    pub fn simple_physics(self) -> bool {
        !matches!(self, LodTier::Full)
    }

    pub fn animates(self) -> bool {
        !matches!(self, LodTier::Dormant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Off-screen characters beyond this distance lose their limbs.
    pub simple_distance: f32,
    /// Characters beyond this distance stop animating.
    pub dormant_distance: f32,
    /// Extra distance an on-screen character may be from the camera and
    /// still count as close.
    pub on_screen_margin: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            simple_distance: 30.0,
            dormant_distance: 150.0,
            on_screen_margin: 10.0,
        }
    }
}

/// Classify a character by its distance to the camera.
///
/// On-screen characters are always `Full` unless they are implausibly far
/// (beyond the dormant distance plus the margin).
pub fn classify_ragdoll(distance: f32, on_screen: bool, config: &LodConfig) -> LodTier {
    if !distance.is_finite() {
        return LodTier::Dormant;
    }
    if on_screen {
        if distance <= config.dormant_distance + config.on_screen_margin {
            return LodTier::Full;
        }
        return LodTier::Dormant;
    }
    if distance <= config.simple_distance {
        LodTier::Full
    } else if distance <= config.dormant_distance {
        LodTier::Simple
    } else {
        LodTier::Dormant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_is_full() {
        let config = LodConfig::default();
        assert_eq!(classify_ragdoll(0.0, false, &config), LodTier::Full);
        assert_eq!(classify_ragdoll(30.0, false, &config), LodTier::Full);
    }

    #[test]
    fn test_off_screen_mid_range_is_simple() {
        let config = LodConfig::default();
        assert_eq!(classify_ragdoll(31.0, false, &config), LodTier::Simple);
        assert_eq!(classify_ragdoll(100.0, true, &config), LodTier::Full);
    }

    #[test]
    fn test_far_is_dormant() {
        let config = LodConfig::default();
        assert_eq!(classify_ragdoll(151.0, false, &config), LodTier::Dormant);
        assert_eq!(classify_ragdoll(f32::NAN, true, &config), LodTier::Dormant);
    }

    #[test]
    fn test_tier_flags() {
        assert!(!LodTier::Full.simple_physics());
        assert!(LodTier::Simple.simple_physics());
        assert!(LodTier::Simple.animates());
        assert!(!LodTier::Dormant.animates());
    }
}
