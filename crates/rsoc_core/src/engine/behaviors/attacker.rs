//! Ball-winner behavior: pass, shoot or carry
//!
//! Decision ladder once in control of the ball:
//! 1. learned shoot-vs-pass gate (only with a clear, reachable shot line)
//! 2. learned short pass, outside the shoot zone
//! 3. "requested" pass toward the teammate closest to our own best
//!    attacking grid point (couples the off-ball score map to the passer)
//! 4. safe back-pass reset when nothing forward is available
//! 5. long switch-of-play ball to a far, wide teammate
//! 6. rare exploration shot
//! 7. otherwise keep the ball and carry toward goal with a lateral search
//!
//! Kicks tagged as passes carry the receiver id; deliberate shots set
//! `shot_intent`. The physics layer turns those tags into pending-outcome
//! records when the kick actually happens.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::engine::geometry::{closest_point_on_segment, dist, dist2, segment_blocked};
use crate::engine::learning::Learning;
use crate::engine::physics_constants::{ball as ball_consts, field, goal, robot, tick};
use crate::engine::score_grid::find_best;
use crate::engine::scorers::attack_off_ball;
use crate::engine::steering::seek_with_avoidance;
use crate::engine::world::{Command, Point, Robot, TeamSign, World};

/// Lane danger radius for attacker pass checks (a bit conservative so we
/// don't force passes).
const PASS_LANE_DANGER_M: f32 = 0.28;
/// Receiver must have no opponent within this radius for short passes.
const OPEN_RADIUS_M: f32 = 0.45;
/// Long balls tolerate slightly tighter receivers.
const OPEN_RADIUS_LONG_M: f32 = 0.35;

pub fn decide(
    this: &Robot,
    world: &World,
    sign: TeamSign,
    learning: &Learning,
    rng: &mut ChaCha8Rng,
) -> Command {
    let mut cmd = Command::stop(this.id);
    let ball = &world.ball;
    let sf = sign as f32;

    let ball_d = dist(ball.pos, this.pos);
    let control_range = robot::RADIUS_M + 0.06;
    if ball_d > control_range {
        // Chase the ball with gentle collision avoidance.
        cmd.vel = seek_with_avoidance(
            this,
            ball.pos,
            1.4,
            robot::RADIUS_M * 2.4,
            1.2,
            &[world.mates(sign), world.opponents(sign)],
        );
        return cmd;
    }

    let mates = world.mates(sign);
    let opps = world.opponents(sign);

    // Plain nearest-mate option (floor of the pass ladder).
    let mate = best_pass_target(this, mates);
    let can_pass = mate.map_or(false, |m| {
        pass_lane_safe(ball.pos, m.pos, opps) && mate_open(m, opps, OPEN_RADIUS_M)
    });

    // Learned short pass: progressive, open, clear lane.
    let learned_short = learning.pass.pick_best_receiver(this, world, sign, 1.05, 5.2);
    let can_learned_short = learned_short.map_or(false, |sp| {
        pass_lane_safe(ball.pos, sp.receiver_pos, opps)
            && open_at(sp.receiver_pos, opps, OPEN_RADIUS_M)
    });

    // Requested pass: pick the best attacking grid point for ourselves,
    // then feed the teammate closest to it.
    let requested_mate = {
        let best = find_best(world, this, sign, 0.55, &attack_off_ball);
        closest_mate_to_point(this, mates, best.pos())
    };
    let can_requested = requested_mate.map_or(false, |m| {
        pass_lane_safe(ball.pos, m.pos, opps) && mate_open(m, opps, OPEN_RADIUS_M)
    });

    // Long ball / switch of play when short options are congested.
    let long_mate = best_long_pass_target(this, mates, opps, sign);
    let can_long = long_mate.map_or(false, |m| {
        pass_lane_safe(ball.pos, m.pos, opps) && mate_open(m, opps, OPEN_RADIUS_LONG_M)
    });

    // Shot geometry.
    let half_l = field::HALF_LENGTH_M;
    let x_toward_goal = ball.pos.0 * sf;
    let in_shoot_zone = x_toward_goal > half_l * 0.30;
    let goal_x = sf * half_l;
    let shot_y = pick_best_shot_y(ball.pos, goal_x, goal::HALF_WIDTH_M, opps);
    let planned_shot_speed = if in_shoot_zone { 5.6 } else { 5.0 };
    let can_shoot = shot_y
        .map_or(false, |y| can_reach_goal(ball.pos, (goal_x, y), planned_shot_speed));

    // Learned shoot-vs-pass gate.
    let epsilon = if in_shoot_zone { 0.05 } else { 0.07 };
    let prefer_shoot = learning
        .action
        .features(world, sign, this.id, &learning.pass)
        .map_or(false, |f| learning.action.choose_shoot(&f, epsilon, rng));

    if can_shoot && prefer_shoot {
        return shot_command(this, ball.pos, (goal_x, shot_y.unwrap()), planned_shot_speed);
    }

    if !in_shoot_zone && can_learned_short {
        let sp = learned_short.unwrap();
        return pass_command(this, ball.pos, sp.receiver_pos, sp.receiver_id, 4.1);
    }

    // Requested pass is useful, but don't spam it: require real progress.
    if can_requested {
        let m = requested_mate.unwrap();
        let forward = (m.pos.0 - ball.pos.0) * sf;
        if forward > 0.35 {
            return pass_command(this, ball.pos, m.pos, m.id, 4.2);
        }
    }

    // Nothing forward: prefer a safe reset over a solo dribble.
    if !can_pass && !can_requested && !can_long {
        if let Some(back) = best_back_pass_target(this, mates, opps, sign) {
            if pass_lane_safe(ball.pos, back.pos, opps)
                && mate_open(back, opps, OPEN_RADIUS_LONG_M)
            {
                return pass_command(this, ball.pos, back.pos, back.id, 3.8);
            }
        }
    }

    if can_pass {
        let m = mate.unwrap();
        return pass_command(this, ball.pos, m.pos, m.id, 4.0);
    }

    if can_long {
        let m = long_mate.unwrap();
        return pass_command(this, ball.pos, m.pos, m.id, 6.4);
    }

    // Occasional exploration shot when the lane happens to be open.
    if can_shoot && rng.gen::<f32>() < 0.05 {
        return shot_command(this, ball.pos, (goal_x, shot_y.unwrap()), planned_shot_speed);
    }

    // Keep the ball: carry toward goal with a small lateral lane search.
    let carry_x = (ball.pos.0 + 1.05 * sf)
        .clamp(-field::HALF_LENGTH_M + 0.5, field::HALF_LENGTH_M - 0.5);
    let carry_y = (ball.pos.1 + carry_offset_y(this, world))
        .clamp(-field::HALF_WIDTH_M + 0.5, field::HALF_WIDTH_M - 0.5);
    cmd.vel = seek_with_avoidance(
        this,
        (carry_x, carry_y),
        1.0,
        robot::RADIUS_M * 2.4,
        1.2,
        &[world.mates(sign), world.opponents(sign)],
    );
    cmd
}

fn pass_command(this: &Robot, from: Point, to: Point, receiver: i32, speed: f32) -> Command {
    let mut cmd = Command::stop(this.id);
    cmd.kick = true;
    cmd.pass_target = Some(receiver);
    cmd.kick_vel = kick_toward(from, to, speed);
    cmd
}

fn shot_command(this: &Robot, from: Point, target: Point, speed: f32) -> Command {
    let mut cmd = Command::stop(this.id);
    cmd.kick = true;
    cmd.shot_intent = true;
    cmd.kick_vel = kick_toward(from, target, speed);
    cmd
}

fn kick_toward(from: Point, to: Point, speed: f32) -> Point {
    let d = dist(from, to);
    if d <= 1e-6 {
        return (0.0, 0.0);
    }
    ((to.0 - from.0) / d * speed, (to.1 - from.1) / d * speed)
}

fn pass_lane_safe(a: Point, b: Point, opps: &[Robot]) -> bool {
    if dist(a, b) < 1e-6 {
        return false;
    }
    !segment_blocked(a, b, opps, PASS_LANE_DANGER_M)
}

fn mate_open(mate: &Robot, opps: &[Robot], radius: f32) -> bool {
    open_at(mate.pos, opps, radius)
}

fn open_at(p: Point, opps: &[Robot], radius: f32) -> bool {
    let r2 = radius * radius;
    opps.iter().all(|o| dist2(o.pos, p) >= r2)
}

/// Nearest teammate beyond a minimum tap distance.
fn best_pass_target<'a>(this: &Robot, mates: &'a [Robot]) -> Option<&'a Robot> {
    let mut best: Option<(&Robot, f32)> = None;
    for r in mates {
        if r.id == this.id {
            continue;
        }
        let d = dist(r.pos, this.pos);
        if d < 0.5 {
            continue;
        }
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((r, d));
        }
    }
    best.map(|(r, _)| r)
}

/// Teammate closest to a target point, unless it is basically on top of us.
fn closest_mate_to_point<'a>(this: &Robot, mates: &'a [Robot], p: Point) -> Option<&'a Robot> {
    let mut best: Option<(&Robot, f32)> = None;
    for r in mates {
        if r.id == this.id {
            continue;
        }
        let d2 = dist2(r.pos, p);
        if best.map_or(true, |(_, bd2)| d2 < bd2) {
            best = Some((r, d2));
        }
    }
    let (r, _) = best?;
    if dist2(r.pos, this.pos) < 0.55 * 0.55 {
        return None;
    }
    Some(r)
}

/// Far, forward, wide receivers for a switch of play.
fn best_long_pass_target<'a>(
    this: &Robot,
    mates: &'a [Robot],
    opps: &[Robot],
    sign: TeamSign,
) -> Option<&'a Robot> {
    let sf = sign as f32;
    let mut best: Option<(&Robot, f32)> = None;
    for r in mates {
        if r.id == this.id {
            continue;
        }
        let dx = r.pos.0 - this.pos.0;
        let dy = r.pos.1 - this.pos.1;
        let d = (dx * dx + dy * dy).sqrt();
        if d < 2.6 {
            continue;
        }
        let forward = dx * sf;
        if forward < -0.5 {
            continue;
        }
        let width = r.pos.1.abs().min(field::HALF_WIDTH_M);
        let nearest_opp = crate::engine::geometry::nearest_robot_distance(opps, r.pos);
        let score = 0.9 * forward + 0.6 * width - 0.7 * d + 0.35 * nearest_opp;
        if best.map_or(true, |(_, bs)| score > bs) {
            best = Some((r, score));
        }
    }
    best.map(|(r, _)| r)
}

/// Back-pass/reset target: behind the ball, not a tiny tap, preferably
/// central and not under immediate pressure.
fn best_back_pass_target<'a>(
    this: &Robot,
    mates: &'a [Robot],
    opps: &[Robot],
    sign: TeamSign,
) -> Option<&'a Robot> {
    let sf = sign as f32;
    let mut best: Option<(&Robot, f32)> = None;
    for r in mates {
        if r.id == this.id {
            continue;
        }
        let d = dist(r.pos, this.pos);
        if d < 0.8 {
            continue;
        }
        let behind = (this.pos.0 - r.pos.0) * sf;
        if behind < 0.35 {
            continue;
        }
        let central = 1.0 - (r.pos.1.abs() / field::HALF_WIDTH_M).min(1.0);
        let open_bonus = if mate_open(r, opps, OPEN_RADIUS_LONG_M) { 0.7 } else { 0.0 };
        let dist_penalty = -0.25 * d;
        let score = 1.2 * central + open_bonus + dist_penalty;
        if best.map_or(true, |(_, bs)| score > bs) {
            best = Some((r, score));
        }
    }
    best.map(|(r, _)| r)
}

/// Pick a shot target y inside the goal mouth with the best clearance.
/// `None` when every line through the mouth is threatened.
fn pick_best_shot_y(from: Point, goal_x: f32, goal_half_w: f32, opps: &[Robot]) -> Option<f32> {
    // Avoid aiming exactly at the posts.
    let margin = 0.06;
    let (lo, hi) = if goal_half_w - margin < -goal_half_w + margin {
        (-goal_half_w, goal_half_w)
    } else {
        (-goal_half_w + margin, goal_half_w - margin)
    };

    let samples = [0.0, lo * 0.55, hi * 0.55, lo, hi];
    let danger = 0.28;

    let mut best: Option<(f32, f32)> = None;
    for y in samples {
        let cy = y.clamp(lo, hi);
        let mut clearance = 9.0f32;
        for o in opps {
            let p = closest_point_on_segment(from, (goal_x, cy), o.pos);
            let d = dist(o.pos, p);
            if d < clearance {
                clearance = d;
            }
        }
        if clearance < danger {
            continue;
        }
        // Higher clearance first, then closer to center.
        let score = clearance * 2.0 - cy.abs() * 0.25;
        if best.map_or(true, |(_, bs)| score > bs) {
            best = Some((cy, score));
        }
    }
    best.map(|(y, _)| y)
}

/// Can a kick at `speed` reach the goal under the damped-ball model?
/// Total travel of the geometric decay is `v0*dt / (1 - damping)`.
fn can_reach_goal(from: Point, target: Point, kick_speed: f32) -> bool {
    let max_travel = (kick_speed * tick::DT) / (1.0 - ball_consts::DAMPING) * 0.92;
    dist(from, target) <= max_travel
}

/// Deterministic sideways offset for lane searching while carrying
/// (id parity, biased back inward near a touchline).
fn carry_offset_y(this: &Robot, world: &World) -> f32 {
    let mut base = if this.id % 2 == 0 { 0.6 } else { -0.6 };
    let y = world.ball.pos.1;
    if y > field::HALF_WIDTH_M - 0.8 {
        base = -0.6;
    }
    if y < -field::HALF_WIDTH_M + 0.8 {
        base = 0.6;
    }
    base
}
