//! Gait of fish-like species: sine-wave swimming, a grounded crawl, the
//! death twitch and eating.

use std::f32::consts::FRAC_PI_2;

use super::gait::{
    foot_step_targets, step_cycle, DragContext, DragOutcome, Gait, GaitContext, LimbCommand,
    PreyView,
};
use crate::error::AnimError;
use crate::math::{self, Vec2};
use crate::params::{AnimationParams, LimbType};
use crate::physics::NOMINAL_STEP;

/// Pull-joint anchors farther than this (squared) from the collider snap
/// straight to it.
const MAX_ANCHOR_DRIFT_SQ: f32 = 10.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FishGait;

impl Gait for FishGait {
    fn walk(&mut self, ctx: &mut GaitContext<'_>) {
        let all = ctx.params;
        let AnimationParams::FishGrounded(params) = all else {
            return;
        };
        let (ragdoll, physics) = (ctx.ragdoll, ctx.physics);
        let common = &params.common;
        let sign = ragdoll.dir().sign();

        ctx.state.movement = ctx
            .state
            .movement
            .smooth_step(ctx.state.target_movement, ctx.config.movement_smoothing);
        let movement = ctx.state.movement;
        let velocity = ctx.collider_velocity();
        let vertical = if velocity.y > 0.0 {
            velocity.y * 0.5
        } else {
            velocity.y
        };
        ctx.targets.collider_velocity = Some(Vec2::new(movement.x, vertical));
        if ragdoll.is_simple_physics() {
            return;
        }

        let bottom = ragdoll.collider_bottom(physics);
        let main = ragdoll.main_limb_index();
        for (limb_type, angle, torque, height, force) in [
            (
                LimbType::Torso,
                common.torso_angle_radians(),
                common.torso_torque,
                common.torso_position,
                common.torso_move_force,
            ),
            (
                LimbType::Head,
                common.head_angle_radians(),
                common.head_torque,
                common.head_position,
                common.head_move_force,
            ),
        ] {
            let Some(index) = ragdoll.limb_index(limb_type) else {
                continue;
            };
            if let Some(angle) = angle {
                ctx.rotate_relative(index, angle * sign, torque);
            }
            let mut target = bottom + Vec2::UNIT_Y * height;
            if index != main {
                target.x = ragdoll.limb(index).position(physics).x;
            }
            ctx.targets.push(LimbCommand::MoveTo {
                limb: index,
                target,
                force,
            });
            ctx.targets.push(LimbCommand::Pull {
                limb: index,
                target,
            });
        }
        if let (Some(tail), Some(angle)) = (
            ragdoll.limb_index(LimbType::Tail),
            params.tail_angle_radians(),
        ) {
            ctx.rotate_relative(tail, angle * sign, params.tail_torque);
        }

        let joint_scale = if ctx.joint_scale > 0.0 {
            ctx.joint_scale
        } else {
            1.0
        };
        ctx.state
            .advance_walk_pos(velocity.x * common.cycle_speed / joint_scale * ctx.dt);
        let step = step_cycle(ctx.state.walk_pos, common.valid_step_size());

        for (index, limb) in ragdoll.limbs().iter().enumerate() {
            if limb.is_severed() {
                continue;
            }
            if limb.constant_torque != 0.0 {
                ctx.rotate_relative(index, limb.constant_angle * sign, limb.constant_torque);
            }
            match limb.limb_type {
                LimbType::LeftFoot | LimbType::RightFoot => {
                    let under = Vec2::new(limb.position(physics).x, bottom.y);
                    let base = ctx.foot_base(index, under);
                    let left = limb.limb_type == LimbType::LeftFoot;
                    let target = foot_step_targets(base, step, movement.x * 0.1, left);
                    ctx.targets.push(LimbCommand::MoveTo {
                        limb: index,
                        target,
                        force: common.foot_move_force,
                    });
                    if let Some(angle) = all.foot_angle_radians(limb.id) {
                        ctx.rotate_relative(index, angle * sign, common.foot_torque);
                    }
                }
                LimbType::Legs
                | LimbType::LeftLeg
                | LimbType::RightLeg
                | LimbType::LeftThigh
                | LimbType::RightThigh
                    if params.leg_torque != 0.0 =>
                {
                    ctx.targets.push(LimbCommand::Torque {
                        limb: index,
                        torque: -params.leg_torque * sign,
                    });
                }
                _ => {}
            }
        }
    }

    fn swim(&mut self, ctx: &mut GaitContext<'_>) {
        let all = ctx.params;
        let AnimationParams::FishSwim(params) = all else {
            return;
        };
        let (ragdoll, physics, config) = (ctx.ragdoll, ctx.physics, ctx.config);
        let common = &params.common;
        let sign = ragdoll.dir().sign();
        let collider = physics.body(ragdoll.collider());
        let collider_pos = collider.position;

        ctx.state.movement = ctx.state.target_movement;
        let movement = ctx.state.movement;
        ctx.targets.collider_velocity = Some(collider.linear_velocity.lerp(movement, config.swim_lerp));
        if ragdoll.is_simple_physics() {
            return;
        }

        let main = ragdoll.main_limb_index();
        let previous_anchor = physics.body(ragdoll.main_limb().body).pull_joint.target;
        if movement.length_squared() < 1e-5 {
            // resting float
            ctx.state.walk_pos = math::smooth_step(
                ctx.state.walk_pos,
                FRAC_PI_2,
                ctx.dt * config.idle_phase_rate,
            );
            ctx.targets.push(LimbCommand::Pull {
                limb: main,
                target: previous_anchor.lerp(collider_pos, 0.5),
            });
            return;
        }

        let heading = if common.rotate_towards_movement {
            movement.to_angle() - FRAC_PI_2
        } else {
            -FRAC_PI_2 * sign
        };
        ctx.targets.collider_rotation = Some((heading, common.steer_torque));
        for (limb_type, angle, torque) in [
            (
                LimbType::Torso,
                common.torso_angle_radians(),
                common.torso_torque,
            ),
            (LimbType::Head, common.head_angle_radians(), common.head_torque),
            (LimbType::Tail, params.tail_angle_radians(), params.tail_torque),
        ] {
            if let (Some(index), Some(angle)) = (ragdoll.limb_index(limb_type), angle) {
                ctx.rotate_relative(index, heading + angle * sign, torque);
            }
        }

        for (index, limb) in ragdoll.limbs().iter().enumerate() {
            if limb.is_severed() {
                continue;
            }
            if limb.constant_torque != 0.0 {
                ctx.rotate_relative(
                    index,
                    heading + limb.constant_angle * sign,
                    limb.constant_torque,
                );
            }
            if limb.steer_force != 0.0 {
                ctx.targets.push(LimbCommand::Force {
                    limb: index,
                    force: movement * (limb.steer_force * limb.mass(physics)),
                    at: Some(limb.pull_anchor(physics)),
                });
            }
        }

        if params.wave_length != 0.0 && params.wave_amplitude != 0.0 {
            let advance = movement.length() / params.wave_length.abs() * (ctx.dt / NOMINAL_STEP);
            ctx.state.advance_walk_pos(advance);
            if let Some(tail) = ragdoll.limb_index(LimbType::Tail) {
                let mass = ragdoll.limb(tail).mass(physics);
                ctx.targets.push(LimbCommand::Torque {
                    limb: tail,
                    torque: ctx.state.walk_pos.sin()
                        * mass
                        * params.tail_torque
                        * params.wave_amplitude
                        * sign,
                });
            }
        }

        let mut anchor = if params.use_sine_movement {
            previous_anchor.smooth_step(collider_pos, ctx.state.walk_pos.sin().abs())
        } else {
            previous_anchor.lerp(collider_pos, 0.5)
        };
        if (anchor - collider_pos).length_squared() > MAX_ANCHOR_DRIFT_SQ {
            anchor = collider_pos;
        }
        ctx.targets.push(LimbCommand::Pull {
            limb: main,
            target: anchor,
        });
    }

    fn dying(&mut self, ctx: &mut GaitContext<'_>) -> Result<(), AnimError> {
        let (ragdoll, physics, config) = (ctx.ragdoll, ctx.physics, ctx.config);
        if config.death_duration <= 0.0 {
            return Ok(());
        }
        for limb in ragdoll.limbs().iter().filter(|l| !l.is_severed()) {
            let mass = limb.mass(physics);
            if !(mass > 0.0) {
                return Err(AnimError::InvalidMass {
                    limb: limb.limb_type,
                    mass,
                });
            }
        }
        let center = ragdoll
            .center_of_mass(physics)
            .ok_or(AnimError::InvalidCenterOfMass)?;

        let strength = (1.0 - ctx.state.death_timer / config.death_duration).clamp(0.0, 1.0);
        let wave = ctx.state.walk_pos.sin();
        let sign = ragdoll.dir().sign();
        for (limb_type, phase) in [(LimbType::Head, 1.0), (LimbType::Tail, -1.0)] {
            if let Some(index) = ragdoll.limb_index(limb_type) {
                let mass = ragdoll.limb(index).mass(physics);
                ctx.targets.push(LimbCommand::Torque {
                    limb: index,
                    torque: phase * mass.sqrt() * sign * wave * config.death_torque * strength,
                });
            }
        }
        for (index, limb) in ragdoll.limbs().iter().enumerate() {
            if limb.is_severed() {
                continue;
            }
            let pull = (center - limb.position(physics))
                * (wave * limb.mass(physics).sqrt() * config.death_torque * strength);
            ctx.targets.push(LimbCommand::Force {
                limb: index,
                force: pull,
                at: None,
            });
        }
        ctx.state
            .advance_walk_pos(ctx.dt * config.death_phase_speed * strength);
        Ok(())
    }

    /// Hold the prey in the mouth and bite on every half cycle.
    fn drag(&mut self, ctx: &mut DragContext<'_>, prey: &PreyView) -> DragOutcome {
        let ragdoll = ctx.ragdoll;
        let (Some(mouth_limb), Some(mouth)) = (
            ragdoll.mouth_limb(),
            ragdoll.mouth_position(ctx.physics),
        ) else {
            ctx.state.report(ctx.owner, &AnimError::NoMouthLimb);
            return DragOutcome::Release;
        };

        let prey_position = ctx.physics.body(prey.main_limb).position;
        let diff = prey_position - mouth;
        if !diff.is_valid() || diff.length() >= ctx.config.eat_reach {
            return DragOutcome::Release;
        }

        let own_mass = ragdoll.mass(ctx.physics);
        let eat_speed = if prey.mass > 0.0 && own_mass > 0.0 {
            own_mass / prey.mass * ctx.config.eat_speed
        } else {
            ctx.config.eat_speed
        };
        let previous = ctx.state.eat_timer;
        ctx.state.eat_timer += ctx.dt * eat_speed;
        let t = ctx.state.eat_timer;

        let hold = t.sin() + 10.0;
        let mouth_rotation = ragdoll.limb(mouth_limb).rotation(ctx.physics);
        {
            let body = ctx.physics.body_mut(prey.main_limb);
            body.move_to_pos(mouth, hold, None);
            body.smooth_rotate(mouth_rotation, 20.0, true);
        }
        let prey_collider = ctx.physics.body_mut(prey.collider);
        if prey_collider.enabled {
            prey_collider.move_to_pos(mouth, hold, None);
        }

        let chew = t.sin() * (t * 0.5).sin().max(0.0);
        let body = ctx.physics.body_mut(ragdoll.limb(mouth_limb).body);
        let mass = body.mass;
        body.apply_force(diff * (mass * 50.0 * chew));

        if crossed_half_cycle(previous, t) {
            DragOutcome::Bite
        } else {
            DragOutcome::Holding
        }
    }
}

/// Whether the eat timer passed a `k + 0.5` mark between two values.
fn crossed_half_cycle(previous: f32, current: f32) -> bool {
    (current - 0.5).floor() > (previous - 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bite_on_half_cycle_crossing() {
        assert!(crossed_half_cycle(0.45, 0.55));
        assert!(!crossed_half_cycle(0.55, 0.95));
        assert!(!crossed_half_cycle(0.95, 1.05));
        assert!(crossed_half_cycle(1.45, 1.5));
        assert!(crossed_half_cycle(0.4, 2.6));
    }
}
