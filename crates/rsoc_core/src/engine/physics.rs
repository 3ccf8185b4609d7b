//! Ball integration, collision resolution and command application
//!
//! Order inside a tick: commands apply (robots move, kicks fire), the ball
//! integrates (damping, wall bounce, goal detection), then ball-robot and
//! robot-robot overlaps resolve. The possession layer runs after all of
//! this so robots can actually reach the ball they were pushed toward.

use super::config::PossessionConfig;
use super::geometry::{dist, dist2};
use super::learning::Learning;
use super::physics_constants::{ball as ball_consts, field, goal, robot};
use super::possession::PossessionState;
use super::rewards::OutcomeTracker;
use super::world::{keep_inside_field, Command, Point, Robot, RobotId, TeamSign, World};

/// Integrate the ball one step. Returns the scoring team when the ball
/// fully crosses the goal line inside the mouth; the caller owns the reset.
pub fn integrate_ball(world: &mut World, dt: f32) -> Option<TeamSign> {
    let b = &mut world.ball;

    b.pos.0 += b.vel.0 * dt;
    b.pos.1 += b.vel.1 * dt;

    b.vel.0 *= ball_consts::DAMPING;
    b.vel.1 *= ball_consts::DAMPING;

    let half_l = field::HALF_LENGTH_M;
    let half_w = field::HALF_WIDTH_M;

    // Goal mouth first: crossing the line inside it scores instead of bouncing.
    if b.pos.0 < -half_l && b.pos.1.abs() <= goal::HALF_WIDTH_M {
        b.place((0.0, 0.0));
        return Some(-1); // red scores on the -x goal
    }
    if b.pos.0 > half_l && b.pos.1.abs() <= goal::HALF_WIDTH_M {
        b.place((0.0, 0.0));
        return Some(1);
    }

    // Simple wall bounce elsewhere.
    if b.pos.0 < -half_l {
        b.pos.0 = -half_l;
        b.vel.0 = -b.vel.0;
    } else if b.pos.0 > half_l {
        b.pos.0 = half_l;
        b.vel.0 = -b.vel.0;
    }
    if b.pos.1 < -half_w {
        b.pos.1 = -half_w;
        b.vel.1 = -b.vel.1;
    } else if b.pos.1 > half_w {
        b.pos.1 = half_w;
        b.vel.1 = -b.vel.1;
    }

    None
}

/// Push the ball out of every overlapping robot except the current owner
/// (the carry model would be undone otherwise).
pub fn resolve_ball_robot_collisions(world: &mut World, owner: Option<(RobotId, TeamSign)>) {
    let min_dist = ball_consts::COLLIDE_DIST_M;
    let min_dist2 = min_dist * min_dist;

    let mut ball = world.ball;
    for (team, roster) in [(1i8, &world.our_robots), (-1i8, &world.opp_robots)] {
        for r in roster {
            if owner == Some((r.id, team)) {
                continue;
            }
            push_ball_out(&mut ball, r, min_dist, min_dist2);
        }
    }
    world.ball = ball;
}

fn push_ball_out(ball: &mut super::world::Ball, robot: &Robot, min_dist: f32, min_dist2: f32) {
    let dx = ball.pos.0 - robot.pos.0;
    let dy = ball.pos.1 - robot.pos.1;
    let d2 = dx * dx + dy * dy;
    if d2 >= min_dist2 {
        return;
    }

    let d = d2.max(1e-9).sqrt();
    let n = (dx / d, dy / d);

    // Separate to the contact boundary.
    ball.pos = (robot.pos.0 + n.0 * min_dist, robot.pos.1 + n.1 * min_dist);

    // Reflect-and-damp the inbound velocity component along the normal.
    let vn = ball.vel.0 * n.0 + ball.vel.1 * n.1;
    if vn < 0.0 {
        ball.vel.0 -= ball_consts::COLLIDE_RESTITUTION * vn * n.0;
        ball.vel.1 -= ball_consts::COLLIDE_RESTITUTION * vn * n.1;
    }
}

/// Iterative pairwise separation of overlapping robots (two passes handle
/// the multi-overlap pile-ups well enough at this density).
pub fn resolve_robot_robot_collisions(world: &mut World) {
    let min_dist = robot::RADIUS_M * 2.0;
    let min_dist2 = min_dist * min_dist;

    let our_len = world.our_robots.len();
    let total = our_len + world.opp_robots.len();

    for _ in 0..2 {
        for i in 0..total {
            for j in (i + 1)..total {
                let (a, b) = {
                    let a = get_robot(world, i, our_len);
                    let b = get_robot(world, j, our_len);
                    separate_pair(a, b, min_dist, min_dist2)
                };
                if let (Some(a), Some(b)) = (a, b) {
                    *get_robot_mut(world, i, our_len) = a;
                    *get_robot_mut(world, j, our_len) = b;
                }
            }
        }
    }
}

fn get_robot(world: &World, idx: usize, our_len: usize) -> Robot {
    if idx < our_len {
        world.our_robots[idx]
    } else {
        world.opp_robots[idx - our_len]
    }
}

fn get_robot_mut(world: &mut World, idx: usize, our_len: usize) -> &mut Robot {
    if idx < our_len {
        &mut world.our_robots[idx]
    } else {
        &mut world.opp_robots[idx - our_len]
    }
}

fn separate_pair(
    mut a: Robot,
    mut b: Robot,
    min_dist: f32,
    min_dist2: f32,
) -> (Option<Robot>, Option<Robot>) {
    let dx = b.pos.0 - a.pos.0;
    let dy = b.pos.1 - a.pos.1;
    let d2 = dx * dx + dy * dy;
    if d2 >= min_dist2 {
        return (None, None);
    }

    let d = d2.max(1e-9).sqrt();
    let n = (dx / d, dy / d);
    let push = (min_dist - d) * 0.5;

    a.pos.0 -= n.0 * push;
    a.pos.1 -= n.1 * push;
    b.pos.0 += n.0 * push;
    b.pos.1 += n.1 * push;

    keep_inside_field(&mut a);
    keep_inside_field(&mut b);
    (Some(a), Some(b))
}

/// Apply one robot's command in the true frame: clamp, shape near-ball
/// right-of-way, move the robot, and execute the kick (recording tagged
/// pass / shoot-vs-pass attempts for reward attribution).
#[allow(clippy::too_many_arguments)]
pub fn apply_command(
    world: &mut World,
    sign: TeamSign,
    roster_idx: usize,
    cmd: &Command,
    dt: f32,
    possession: &mut PossessionState,
    poss_cfg: &PossessionConfig,
    tracker: &mut OutcomeTracker,
    learning: &Learning,
    now: f64,
) {
    let this = if sign > 0 { world.our_robots[roster_idx] } else { world.opp_robots[roster_idx] };

    let mut vx = cmd.vel.0.clamp(-robot::MAX_SPEED_MPS, robot::MAX_SPEED_MPS);
    let mut vy = cmd.vel.1.clamp(-robot::MAX_SPEED_MPS, robot::MAX_SPEED_MPS);
    let omega = cmd.omega.clamp(-robot::MAX_OMEGA_RADPS, robot::MAX_OMEGA_RADPS);

    let mut kick = cmd.kick;
    let mut kick_vel = cmd.kick_vel;

    let is_owner = possession.owner().map_or(false, |o| o.id == this.id && o.team == sign);

    // Owner near a wall: slow down so we don't glue into the corner, and
    // auto-clear back into play under pressure.
    if is_owner {
        let half_l = field::HALF_LENGTH_M;
        let half_w = field::HALF_WIDTH_M;
        let wall_band = 0.35;
        let near_wall =
            this.pos.0.abs() > half_l - wall_band || this.pos.1.abs() > half_w - wall_band;
        if near_wall {
            vx *= 0.55;
            vy *= 0.55;

            let opp_d2 = World::closest_to(world.opponents(sign), world.ball.pos)
                .map_or(f32::INFINITY, |(_, d2)| d2);
            let pressure = opp_d2 < 0.55 * 0.55;
            let ball_near_wall = world.ball.pos.0.abs() > half_l - 0.08
                || world.ball.pos.1.abs() > half_w - 0.08;

            if pressure || ball_near_wall {
                kick = true;
                // Back toward the field center with a small forward component.
                let mut to_center = (-world.ball.pos.0, -world.ball.pos.1);
                let d = dist((0.0, 0.0), to_center);
                if d < 1e-6 {
                    to_center = (0.0, 0.0);
                } else {
                    to_center = (to_center.0 / d, to_center.1 / d);
                }
                let mut k = (to_center.0 * 0.8 + sign as f32 * 0.2, to_center.1 * 0.8);
                let kd = dist((0.0, 0.0), k);
                if kd > 1e-9 {
                    k = (k.0 / kd, k.1 / kd);
                }
                kick_vel = (k.0 * 4.2, k.1 * 4.2);
            }
        }
    }

    // Right-of-way near the ball: only each team's closest robot contests;
    // everyone else yields so the ball stays reachable. This is a steering
    // rule, not a distance constraint.
    {
        let our_closest = world.closest_to_ball(sign).map(|r| r.id);
        let is_contestant = our_closest == Some(this.id);

        let ball_d2 = dist2(this.pos, world.ball.pos);
        let gk_priority = this.is_goalkeeper()
            && super::behaviors::goalkeeper::ball_in_box(&world.ball, sign);

        if !is_contestant && !gk_priority && ball_d2 < 0.55 * 0.55 {
            vx *= 0.35;
            vy *= 0.35;
            let away = (this.pos.0 - world.ball.pos.0, this.pos.1 - world.ball.pos.1);
            let d = dist((0.0, 0.0), away);
            if d > 1e-6 {
                vx += away.0 / d * 0.25;
                vy += away.1 / d * 0.25;
            }
        }

        // In a genuine two-sided contest, push the contestants onto the ball
        // so contact actually happens.
        let our_d2 = World::closest_to(world.mates(sign), world.ball.pos)
            .map_or(f32::INFINITY, |(_, d2)| d2);
        let opp_d2 = World::closest_to(world.opponents(sign), world.ball.pos)
            .map_or(f32::INFINITY, |(_, d2)| d2);
        let contest2 = 0.65 * 0.65;
        if is_contestant && our_d2 < contest2 && opp_d2 < contest2 {
            let to_ball = (world.ball.pos.0 - this.pos.0, world.ball.pos.1 - this.pos.1);
            let d = dist((0.0, 0.0), to_ball);
            if d > 1e-6 {
                vx += to_ball.0 / d * 0.45;
                vy += to_ball.1 / d * 0.45;
            }
        }
    }

    // Move.
    let robot_mut = if sign > 0 {
        &mut world.our_robots[roster_idx]
    } else {
        &mut world.opp_robots[roster_idx]
    };
    robot_mut.pos.0 += vx * dt;
    robot_mut.pos.1 += vy * dt;
    robot_mut.orientation += omega * dt;
    keep_inside_field(robot_mut);
    let this = *robot_mut;

    // Kick execution.
    if kick {
        // Keeper catch override: a controllable ball inside the box is for
        // the possession layer to trap, not for a reflex punt.
        if this.is_goalkeeper() {
            let controllable = world.ball.speed2()
                <= poss_cfg.attach_max_speed_mps * poss_cfg.attach_max_speed_mps;
            if controllable && super::behaviors::goalkeeper::ball_in_box(&world.ball, sign) {
                return;
            }
        }

        let d = dist(world.ball.pos, this.pos);
        if d <= robot::KICK_RANGE_M {
            let is_owner_now =
                possession.owner().map_or(false, |o| o.id == this.id && o.team == sign);

            // Tag pending outcomes for learning before the ball leaves.
            if is_owner_now {
                if let Some(target) = cmd.pass_target {
                    if let Some(features) =
                        learning.pass.features_for_receiver(world, sign, target)
                    {
                        tracker.record_pass_attempt(
                            sign,
                            this.id,
                            target,
                            world.ball.pos.0,
                            features,
                            now,
                        );
                    }
                }
                if cmd.pass_target.is_some() || cmd.shot_intent {
                    if let Some(features) =
                        learning.action.features(world, sign, this.id, &learning.pass)
                    {
                        tracker.record_action_attempt(
                            sign,
                            this.id,
                            cmd.shot_intent,
                            cmd.pass_target,
                            world.ball.pos.0,
                            features,
                            now,
                        );
                    }
                }
            }

            let mut k: Point = kick_vel;
            if k.0.abs() < 1e-9 && k.1.abs() < 1e-9 {
                // Fallback punt toward the attacking direction.
                k = (robot::DEFAULT_KICK_SPEED * sign as f32, 0.0);
            }
            world.ball.vel = k;

            // Ownership releases immediately so the ball can travel.
            possession.release_on_kick(this.id, sign);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::EngineConfig;
    use crate::engine::physics_constants::tick;

    fn setup() -> (World, PossessionState, OutcomeTracker, Learning, EngineConfig) {
        let mut w = World::default();
        w.reset_kickoff();
        (
            w,
            PossessionState::new(),
            OutcomeTracker::new(),
            Learning::in_memory(),
            EngineConfig::default(),
        )
    }

    #[test]
    fn test_ball_damps_to_rest_inside_field() {
        let mut w = World::default();
        w.reset_kickoff();
        w.our_robots.clear();
        w.opp_robots.clear();
        w.ball.pos = (0.0, 0.0);
        w.ball.vel = (2.0, 1.0);

        let mut last_speed = w.ball.speed();
        for _ in 0..2000 {
            let goal = integrate_ball(&mut w, tick::DT);
            assert!(goal.is_none());
            let s = w.ball.speed();
            if s > ball_consts::REST_SPEED_MPS {
                assert!(s < last_speed, "speed must strictly decrease while rolling");
            }
            last_speed = s;
            assert!(w.ball.pos.0.abs() <= field::HALF_LENGTH_M + 1e-5);
            assert!(w.ball.pos.1.abs() <= field::HALF_WIDTH_M + 1e-5);
        }
        assert!(last_speed < ball_consts::REST_SPEED_MPS);
    }

    #[test]
    fn test_goal_detection_inside_mouth() {
        let mut w = World::default();
        w.ball.pos = (field::HALF_LENGTH_M - 0.01, 0.1);
        w.ball.vel = (3.0, 0.0);
        let mut scored = None;
        for _ in 0..5 {
            scored = integrate_ball(&mut w, tick::DT);
            if scored.is_some() {
                break;
            }
        }
        assert_eq!(scored, Some(1));
        assert_eq!(w.ball.pos, (0.0, 0.0));
        assert_eq!(w.ball.vel, (0.0, 0.0));
    }

    #[test]
    fn test_wall_bounce_outside_mouth() {
        let mut w = World::default();
        w.ball.pos = (field::HALF_LENGTH_M - 0.01, goal::HALF_WIDTH_M + 0.5);
        w.ball.vel = (3.0, 0.0);
        let scored = integrate_ball(&mut w, tick::DT);
        assert_eq!(scored, None);
        assert_eq!(w.ball.pos.0, field::HALF_LENGTH_M);
        assert!(w.ball.vel.0 < 0.0, "x velocity reflects off the wall");
    }

    #[test]
    fn test_opposite_goal_credits_red() {
        let mut w = World::default();
        w.ball.pos = (-field::HALF_LENGTH_M + 0.01, -0.2);
        w.ball.vel = (-3.0, 0.0);
        let mut scored = None;
        for _ in 0..5 {
            scored = integrate_ball(&mut w, tick::DT);
            if scored.is_some() {
                break;
            }
        }
        assert_eq!(scored, Some(-1));
    }

    #[test]
    fn test_ball_pushed_out_of_robot() {
        let mut w = World::default();
        w.our_robots = vec![Robot::new(4, 0.0, 0.0, 0.0)];
        w.ball.pos = (0.05, 0.0);
        w.ball.vel = (-1.0, 0.0);
        resolve_ball_robot_collisions(&mut w, None);
        assert!(dist(w.ball.pos, (0.0, 0.0)) >= ball_consts::COLLIDE_DIST_M - 1e-5);
        assert!(w.ball.vel.0 > 0.0, "inbound velocity reflects");
    }

    #[test]
    fn test_owner_excluded_from_ball_collision() {
        let mut w = World::default();
        w.our_robots = vec![Robot::new(4, 0.0, 0.0, 0.0)];
        w.ball.pos = (0.05, 0.0);
        let before = w.ball.pos;
        resolve_ball_robot_collisions(&mut w, Some((4, 1)));
        assert_eq!(w.ball.pos, before, "carried ball must not be ejected");
    }

    #[test]
    fn test_robots_separate() {
        let mut w = World::default();
        w.our_robots = vec![Robot::new(1, 0.0, 0.0, 0.0)];
        w.opp_robots = vec![Robot::new(11, 0.05, 0.0, 0.0)];
        resolve_robot_robot_collisions(&mut w);
        let d = dist(w.our_robots[0].pos, w.opp_robots[0].pos);
        assert!(d >= robot::RADIUS_M * 2.0 - 1e-5);
    }

    #[test]
    fn test_apply_command_moves_and_clamps() {
        let (mut w, mut poss, mut tracker, learning, cfg) = setup();
        let mut cmd = Command::stop(4);
        cmd.vel = (100.0, 0.0); // way over the clamp
        let x0 = w.our_robots[4].pos.0;
        apply_command(
            &mut w,
            1,
            4,
            &cmd,
            tick::DT,
            &mut poss,
            &cfg.possession,
            &mut tracker,
            &learning,
            0.0,
        );
        let moved = w.our_robots[4].pos.0 - x0;
        assert!(moved > 0.0);
        assert!(moved <= robot::MAX_SPEED_MPS * tick::DT + 1e-5);
    }

    #[test]
    fn test_kick_fires_only_in_range_and_records_pass() {
        let (mut w, mut poss, mut tracker, learning, cfg) = setup();

        // Robot 4 owns the ball at its feet.
        w.our_robots[4].pos = (0.0, 0.0);
        w.ball.place((cfg.possession.carry_offset_m, 0.0));
        poss.update(&mut w, &cfg.possession, &cfg.goalkeeper, 0.0);
        assert!(poss.owner().is_some());

        let mut cmd = Command::stop(4);
        cmd.kick = true;
        cmd.pass_target = Some(5);
        cmd.kick_vel = (4.0, 0.0);
        apply_command(
            &mut w,
            1,
            4,
            &cmd,
            tick::DT,
            &mut poss,
            &cfg.possession,
            &mut tracker,
            &learning,
            0.1,
        );
        assert!(w.ball.vel.0 > 3.0, "kick imparts the requested velocity");
        assert!(poss.owner().is_none(), "ownership releases on kick");
        assert!(tracker.has_pending_pass(1), "tagged pass is recorded");
        assert!(tracker.has_pending_action(1));
    }

    #[test]
    fn test_kick_out_of_range_is_noop() {
        let (mut w, mut poss, mut tracker, learning, cfg) = setup();
        w.our_robots[4].pos = (0.0, 0.0);
        w.ball.place((1.0, 0.0)); // out of kick range
        let mut cmd = Command::stop(4);
        cmd.kick = true;
        cmd.kick_vel = (4.0, 0.0);
        apply_command(
            &mut w,
            1,
            4,
            &cmd,
            tick::DT,
            &mut poss,
            &cfg.possession,
            &mut tracker,
            &learning,
            0.0,
        );
        assert!(w.ball.speed() < 0.01);
        assert!(!tracker.has_pending_pass(1));
    }

    #[test]
    fn test_default_kick_direction_by_team() {
        let (mut w, mut poss, mut tracker, learning, cfg) = setup();
        // Red robot kicks with no explicit vector: punt goes toward -x.
        w.opp_robots[4].pos = (0.0, 0.0);
        w.ball.place((0.05, 0.0));
        let mut cmd = Command::stop(14);
        cmd.kick = true;
        apply_command(
            &mut w,
            -1,
            4,
            &cmd,
            tick::DT,
            &mut poss,
            &cfg.possession,
            &mut tracker,
            &learning,
            0.0,
        );
        assert!(w.ball.vel.0 < 0.0);
    }

    #[test]
    fn test_non_contestant_yields_near_ball() {
        let (mut w, mut poss, mut tracker, learning, cfg) = setup();
        // Robot 5 is near the ball but robot 4 is the team's closest.
        w.our_robots[4].pos = (0.05, 0.0);
        w.our_robots[5].pos = (0.3, 0.0);
        w.ball.place((0.0, 0.0));
        let mut cmd = Command::stop(5);
        cmd.vel = (-1.0, 0.0); // driving straight at the ball
        apply_command(
            &mut w,
            1,
            5,
            &cmd,
            tick::DT,
            &mut poss,
            &cfg.possession,
            &mut tracker,
            &learning,
            0.0,
        );
        // Yield scales the inbound speed down and pushes away; the robot
        // must end up moving slower toward the ball than commanded.
        let x_moved = w.our_robots[5].pos.0 - 0.3;
        assert!(x_moved > -1.0 * tick::DT, "yielding robot moves slower than commanded");
    }
}
