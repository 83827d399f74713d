//! Bipedal gait: upright walking with swinging arms, and a kick-and-stroke
//! swim.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use super::gait::{
    foot_step_targets, step_cycle, DragContext, DragOutcome, Gait, GaitContext, LimbCommand,
    PreyView,
};
use crate::math::{self, Vec2};
use crate::params::{AnimationParams, LimbType};

/// Grabbed characters farther than this many eat reaches are let go.
const GRAB_RANGE: f32 = 2.0;
const GRAB_FORCE: f32 = 2.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumanoidGait;

/// Pull `target` back inside a circle of `reach` around `origin`.
fn clamp_reach(origin: Vec2, target: Vec2, reach: f32) -> Vec2 {
    let offset = target - origin;
    let length = offset.length();
    if length > reach && length > 0.0 {
        origin + offset * (reach / length)
    } else {
        target
    }
}

impl Gait for HumanoidGait {
    fn walk(&mut self, ctx: &mut GaitContext<'_>) {
        let all = ctx.params;
        let AnimationParams::HumanGrounded(params) = all else {
            return;
        };
        let (ragdoll, physics) = (ctx.ragdoll, ctx.physics);
        let common = &params.common;
        let sign = ragdoll.dir().sign();

        let mut movement = ctx
            .state
            .movement
            .smooth_step(ctx.state.target_movement, ctx.config.movement_smoothing);
        if movement.x.abs() < 0.005 {
            movement.x = 0.0;
        }
        movement.y = 0.0;
        ctx.state.movement = movement;

        let collider = physics.body(ragdoll.collider());
        let collider_pos = collider.position;
        let velocity = collider.linear_velocity;
        // a tilted collider walks slower
        let upright = collider.rotation.cos().abs();
        let vertical = if velocity.y > 0.0 {
            velocity.y * 0.5
        } else {
            velocity.y
        };
        ctx.targets.collider_velocity = Some(Vec2::new(movement.x * upright, vertical));
        if ragdoll.is_simple_physics() {
            return;
        }

        let joint_scale = if ctx.joint_scale > 0.0 {
            ctx.joint_scale
        } else {
            1.0
        };
        ctx.state
            .advance_walk_pos(velocity.x * common.cycle_speed / joint_scale * ctx.dt);
        let step_size = common.valid_step_size();
        let step = step_cycle(ctx.state.walk_pos, step_size);
        let moving = ctx.state.target_movement.x.abs() > 0.01;
        let bob = if moving { step.y.abs() * 0.25 } else { 0.0 };
        let bottom = ragdoll.collider_bottom(physics);

        let torso = ragdoll.limb_index(LimbType::Torso);
        if let Some(torso) = torso {
            let target = Vec2::new(
                collider_pos.x + movement.x * params.torso_lean_amount,
                bottom.y + common.torso_position - bob,
            );
            ctx.targets.push(LimbCommand::MoveTo {
                limb: torso,
                target,
                force: common.torso_move_force,
            });
            ctx.targets.push(LimbCommand::Pull {
                limb: torso,
                target,
            });
            if let Some(angle) = common.torso_angle_radians() {
                ctx.targets.push(LimbCommand::Rotate {
                    limb: torso,
                    angle: angle * sign,
                    torque: common.torso_torque,
                    wrap: true,
                });
            }
        }
        if let Some(head) = ragdoll.limb_index(LimbType::Head) {
            let target = Vec2::new(
                collider_pos.x + movement.x * params.head_lean_amount,
                bottom.y + common.head_position - bob,
            );
            ctx.targets.push(LimbCommand::MoveTo {
                limb: head,
                target,
                force: common.head_move_force,
            });
            ctx.targets.push(LimbCommand::Pull {
                limb: head,
                target,
            });
            if let Some(angle) = common.head_angle_radians() {
                ctx.rotate_relative(head, angle * sign, common.head_torque);
            }
        }

        let stance = step_size.x * 0.5 * sign;
        for (index, limb) in ragdoll.limbs().iter().enumerate() {
            if limb.is_severed() {
                continue;
            }
            match limb.limb_type {
                LimbType::LeftFoot | LimbType::RightFoot => {
                    let left = limb.limb_type == LimbType::LeftFoot;
                    let base = ctx.foot_base(index, Vec2::new(collider_pos.x, bottom.y));
                    let target = if moving {
                        foot_step_targets(base, step, movement.x * 0.1, left)
                    } else if left {
                        base + Vec2::new(stance, 0.0)
                    } else {
                        base - Vec2::new(stance, 0.0)
                    };
                    ctx.targets.push(LimbCommand::MoveTo {
                        limb: index,
                        target,
                        force: common.foot_move_force,
                    });
                    let angle = all.foot_angle_radians(limb.id).unwrap_or(0.0);
                    ctx.rotate_relative(index, angle * sign, common.foot_torque);
                }
                LimbType::LeftThigh | LimbType::RightThigh
                    if moving && params.leg_torque != 0.0 =>
                {
                    ctx.targets.push(LimbCommand::Torque {
                        limb: index,
                        torque: -params.leg_torque * sign,
                    });
                }
                LimbType::LeftHand | LimbType::RightHand => {
                    let Some(torso) = torso else {
                        continue;
                    };
                    let torso_pos = ragdoll.limb(torso).position(physics);
                    let rest = ragdoll.rest_offset(torso, index);
                    // arms swing against the legs
                    let swing = if !moving {
                        0.0
                    } else if limb.limb_type == LimbType::LeftHand {
                        -step.x * params.hand_move_strength
                    } else {
                        step.x * params.hand_move_strength
                    };
                    let target = torso_pos + rest + Vec2::new(swing, swing.abs() * 0.3);
                    ctx.targets.push(LimbCommand::MoveTo {
                        limb: index,
                        target: clamp_reach(torso_pos, target, rest.length()),
                        force: params.hand_move_force,
                    });
                }
                _ => {}
            }
        }
    }

    fn swim(&mut self, ctx: &mut GaitContext<'_>) {
        let all = ctx.params;
        let AnimationParams::HumanSwim(params) = all else {
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

        let torso = ragdoll.limb_index(LimbType::Torso);
        if movement.length_squared() < 1e-5 {
            ctx.state.walk_pos = math::smooth_step(
                ctx.state.walk_pos,
                FRAC_PI_2,
                ctx.dt * config.idle_phase_rate,
            );
            if let Some(torso) = torso {
                ctx.targets.push(LimbCommand::Pull {
                    limb: torso,
                    target: collider_pos,
                });
            }
            return;
        }

        let heading = if common.rotate_towards_movement {
            movement.to_angle() - FRAC_PI_2
        } else {
            0.0
        };
        ctx.targets.collider_rotation = Some((heading, common.steer_torque));
        let Some(torso) = torso else {
            return;
        };
        ctx.targets.push(LimbCommand::Pull {
            limb: torso,
            target: collider_pos,
        });
        ctx.targets.push(LimbCommand::Rotate {
            limb: torso,
            angle: heading + common.torso_angle_radians().unwrap_or(0.0) * sign,
            torque: common.torso_torque,
            wrap: true,
        });
        if let (Some(head), Some(angle)) = (
            ragdoll.limb_index(LimbType::Head),
            common.head_angle_radians(),
        ) {
            ctx.rotate_relative(head, heading + angle * sign, common.head_torque);
        }

        let cycle = params.leg_cycle_length.abs().max(0.01);
        ctx.state
            .advance_walk_pos(movement.length() / cycle * TAU * ctx.dt);
        let walk_pos = ctx.state.walk_pos;

        let torso_pos = ragdoll.limb(torso).position(physics);
        let up = Vec2::from_angle(heading + FRAC_PI_2);
        let side = Vec2::new(up.y, -up.x);
        for (index, limb) in ragdoll.limbs().iter().enumerate() {
            if limb.is_severed() {
                continue;
            }
            let phase = match limb.limb_type {
                LimbType::LeftFoot | LimbType::LeftHand => 0.0,
                LimbType::RightFoot | LimbType::RightHand => PI,
                _ => continue,
            };
            let reach = ragdoll.rest_offset(torso, index).length();
            if limb.limb_type.is_foot() {
                let kick = side * ((walk_pos + phase).sin() * params.leg_move_amount);
                ctx.targets.push(LimbCommand::MoveTo {
                    limb: index,
                    target: torso_pos - up * reach + kick,
                    force: params.foot_move_force,
                });
                if let Some(angle) = all.foot_angle_radians(limb.id) {
                    ctx.rotate_relative(index, heading + angle * sign, common.foot_torque);
                }
            } else {
                let p = walk_pos * params.hand_cycle_speed + phase;
                let stroke = up * (p.cos() * params.hand_move_amount.x)
                    + side * (p.sin() * params.hand_move_amount.y * sign);
                ctx.targets.push(LimbCommand::MoveTo {
                    limb: index,
                    target: clamp_reach(torso_pos, torso_pos + stroke, reach),
                    force: params.hand_move_force,
                });
            }
        }
    }

    /// Hold a grabbed character at the hand.
    fn drag(&mut self, ctx: &mut DragContext<'_>, prey: &PreyView) -> DragOutcome {
        let ragdoll = ctx.ragdoll;
        let hand = ragdoll
            .limb_index(LimbType::RightHand)
            .or_else(|| ragdoll.limb_index(LimbType::LeftHand))
            .unwrap_or_else(|| ragdoll.main_limb_index());
        let grip = ragdoll.limb(hand).position(ctx.physics);
        let body = ctx.physics.body_mut(prey.main_limb);
        if !grip.is_valid() || body.position.distance(grip) > ctx.config.eat_reach * GRAB_RANGE {
            return DragOutcome::Release;
        }
        body.move_to_pos(grip, GRAB_FORCE, None);
        DragOutcome::Holding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_reach() {
        let origin = Vec2::new(1.0, 1.0);
        let clamped = clamp_reach(origin, Vec2::new(4.0, 1.0), 1.0);
        assert!((clamped - Vec2::new(2.0, 1.0)).length() < 1e-6);
        let inside = Vec2::new(1.5, 1.0);
        assert_eq!(clamp_reach(origin, inside, 1.0), inside);
    }
}
