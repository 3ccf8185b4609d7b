//! Goalkeeper behavior and home-box constraints
//!
//! The goalkeeper never joins midfield contests. It chases the ball only
//! while the ball is inside its home box; otherwise it holds a clamped
//! point between ball and goal. A reflex clear kick fires when the ball is
//! close in our half -- except when the ball is controllable inside the
//! box, where the possession layer should catch-and-hold instead.

use crate::engine::geometry::dist;
use crate::engine::physics_constants::{field, robot};
use crate::engine::world::{Ball, Command, Point, Robot, TeamSign, World};

/// Home box in front of our goal.
pub const BOX_DEPTH_M: f32 = 1.15;
pub const BOX_HALF_WIDTH_M: f32 = 1.05;

/// Ball speed below which the keeper can trap the ball instead of clearing.
const CONTROLLABLE_SPEED_MPS: f32 = 0.85;

pub fn decide(this: &Robot, world: &World, sign: TeamSign) -> Command {
    let mut cmd = Command::stop(this.id);
    let ball = &world.ball;
    let sf = sign as f32;

    let own_goal_x = -sf * field::HALF_LENGTH_M;

    // Reflex clear: ball close and in our half. Suppressed when the ball is
    // controllable inside the box so the catch/hold can happen.
    let ball_in_our_half = if sign > 0 { ball.pos.0 < 0.0 } else { ball.pos.0 > 0.0 };
    let control_range = robot::RADIUS_M + 0.05;
    let controllable = ball.speed2() <= CONTROLLABLE_SPEED_MPS * CONTROLLABLE_SPEED_MPS;
    if ball_in_our_half
        && dist(ball.pos, this.pos) <= control_range
        && !(controllable && ball_in_box(ball, sign))
    {
        cmd.kick = true;
        cmd.kick_vel = (5.0 * sf, 0.0);
        return cmd;
    }

    // Box-constrained positioning.
    let field_dir = sf; // direction from our goal into the field
    let edge_x = own_goal_x + field_dir * robot::RADIUS_M;
    let deep_x = own_goal_x + field_dir * BOX_DEPTH_M;
    let (min_x, max_x) = (edge_x.min(deep_x), edge_x.max(deep_x));
    let (min_y, max_y) = (-BOX_HALF_WIDTH_M, BOX_HALF_WIDTH_M);

    let home = (own_goal_x + field_dir * 0.35, 0.0);

    let in_box = ball_in_box(ball, sign);
    let (target, speed): (Point, f32) = if in_box {
        // Ball in our box: go take it.
        ((ball.pos.0.clamp(min_x, max_x), ball.pos.1.clamp(min_y, max_y)), 1.7)
    } else if ball.pos.0 * sf > 0.5 {
        // Ball deep in the opponent half: just go home.
        (home, 1.4)
    } else {
        // Hold a point between ball and goal, clamped to the box.
        let toward = ((ball.pos.0 + own_goal_x) * 0.5, ball.pos.1 * 0.7);
        ((toward.0.clamp(min_x, max_x), toward.1.clamp(min_y, max_y)), 1.4)
    };

    let d = dist(target, this.pos);
    if d > 1e-6 {
        cmd.vel = ((target.0 - this.pos.0) / d * speed, (target.1 - this.pos.1) / d * speed);
    }
    cmd
}

/// Ball inside this team's goalkeeper box (with a small tolerance).
pub fn ball_in_box(ball: &Ball, sign: TeamSign) -> bool {
    let sf = sign as f32;
    let own_goal_x = -sf * field::HALF_LENGTH_M;
    let x_from_goal = (ball.pos.0 - own_goal_x) * sf;
    if !(0.0..=BOX_DEPTH_M + 0.05).contains(&x_from_goal) {
        return false;
    }
    ball.pos.1.abs() <= BOX_HALF_WIDTH_M + 0.05
}
