use serde::{Deserialize, Serialize};

/// Tuned constants of the animation controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimConfig {
    /// Seconds a direction intent must persist before the character turns.
    pub flip_debounce: f32,
    /// Length of the death twitch animation in seconds.
    pub death_duration: f32,
    pub death_torque: f32,
    /// Phase advance of the death twitch per second at full strength.
    pub death_phase_speed: f32,
    /// Impact speed the body absorbs without being stunned.
    pub impact_tolerance: f32,
    pub impact_stun_factor: f32,
    pub impact_stun_cap: f32,
    /// Angular velocity per radian of tilt when standing the collider up.
    pub upright_gain: f32,
    /// Tilt below which the collider rotation is locked.
    pub upright_epsilon: f32,
    /// Per-tick blend of collider velocity toward the swim movement.
    pub swim_lerp: f32,
    /// Rate at which an idle swimmer's phase returns to neutral.
    pub idle_phase_rate: f32,
    /// Per-tick smoothing of movement toward the target movement.
    pub movement_smoothing: f32,
    /// Minimum horizontal intent that turns the character.
    pub flip_min_movement: f32,
    /// Horizontal intent must exceed this fraction of the vertical intent.
    pub flip_dominance: f32,
    /// Collider rotation range (degrees) that makes a swimmer face left.
    pub swim_left_range: (f32, f32),
    /// Collider rotation range (degrees) that makes a swimmer face right.
    pub swim_right_range: (f32, f32),
    /// Prey farther than this from the mouth escapes.
    pub eat_reach: f32,
    /// Eat cycle speed at equal predator and prey mass.
    pub eat_speed: f32,
    /// Per-tick blend toward a remote target transform.
    pub remote_lerp: f32,
    /// Remote error beyond which the ragdoll is teleported.
    pub remote_teleport_distance: f32,
}

impl Default for AnimConfig {
    fn default() -> Self {
        Self {
            flip_debounce: 1.0,
            death_duration: 5.0,
            death_torque: 30.0,
            death_phase_speed: 10.0,
            impact_tolerance: 4.0,
            impact_stun_factor: 0.5,
            impact_stun_cap: 5.0,
            upright_gain: 60.0,
            upright_epsilon: 0.001,
            swim_lerp: 0.5,
            idle_phase_rate: 5.0,
            movement_smoothing: 0.2,
            flip_min_movement: 0.1,
            flip_dominance: 0.5,
            swim_left_range: (20.0, 160.0),
            swim_right_range: (200.0, 340.0),
            eat_reach: 1.0,
            eat_speed: 0.1,
            remote_lerp: 0.2,
            remote_teleport_distance: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AnimConfig = serde_json::from_str(r#"{ "flip_debounce": 0.5 }"#).unwrap();
        assert_eq!(config.flip_debounce, 0.5);
        assert_eq!(config.death_duration, 5.0);
        assert_eq!(config.swim_left_range, (20.0, 160.0));
    }
}
