//! Stuck-contest detection and recovery
//!
//! Watches for near-zero ball displacement over a short rolling window
//! while at least one robot is on the ball. A true close contest (both
//! teams' nearest robots in contact range) is settled deterministically in
//! favor of the non-owning team's nearest robot; a mere pin or stall just
//! strips ownership and nudges the ball back into play toward the field
//! center, blended with an away-from-wall component. The thresholds are
//! empirically tuned and live in `StuckConfig`.

use std::collections::HashMap;

use super::config::StuckConfig;
use super::geometry::dist2;
use super::physics_constants::{field, robot};
use super::possession::PossessionState;
use super::world::{Point, RobotId, TeamSign, World};

/// What the breaker did this tick (surfaced for logging/telemetry).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StuckOutcome {
    /// Close contest settled: possession awarded outright.
    Awarded { id: RobotId, team: TeamSign },
    /// Pin/stall broken: ownership stripped, ball nudged into play.
    Nudged,
}

pub struct StuckBreaker {
    stuck_since: Option<f64>,
    last_ball: Point,
    last_robot_pos: HashMap<RobotId, Point>,
}

impl StuckBreaker {
    pub fn new(ball: Point) -> Self {
        Self { stuck_since: None, last_ball: ball, last_robot_pos: HashMap::new() }
    }

    /// Forget all motion history (resets, debug placements).
    pub fn reset(&mut self, ball: Point) {
        self.stuck_since = None;
        self.last_ball = ball;
        self.last_robot_pos.clear();
    }

    /// Run once per tick after possession resolution.
    pub fn update(
        &mut self,
        world: &mut World,
        possession: &mut PossessionState,
        cfg: &StuckConfig,
        now: f64,
    ) -> Option<StuckOutcome> {
        let ball = world.ball.pos;
        let moved2 = dist2(ball, self.last_ball);
        self.last_ball = ball;

        // Corners can hold the ball near-static even while robots push, so
        // the displacement gate is deliberately loose.
        let barely_moved = moved2 < cfg.move_eps_m * cfg.move_eps_m;
        if !barely_moved {
            self.stuck_since = None;
            self.track_robots(world);
            return None;
        }

        // Robot motion history; without enough of it, never trigger.
        let tracked = self.track_robots(world);
        if tracked < 4 {
            self.stuck_since = None;
            return None;
        }

        let blue = world.closest_to_ball(1).copied();
        let red = world.closest_to_ball(-1).copied();
        let (Some(blue), Some(red)) = (blue, red) else {
            self.stuck_since = None;
            return None;
        };
        let blue_d2 = dist2(blue.pos, ball);
        let red_d2 = dist2(red.pos, ball);

        // Never override the keeper's protected hold.
        if possession.gk_hold_active(now) {
            self.stuck_since = None;
            return None;
        }

        let near2 = cfg.near_ball_radius_m * cfg.near_ball_radius_m;
        let someone_near =
            blue_d2 < near2 || red_d2 < near2 || possession.owner().is_some();
        if !someone_near {
            self.stuck_since = None;
            return None;
        }

        let since = match self.stuck_since {
            None => {
                self.stuck_since = Some(now);
                return None;
            }
            Some(s) => s,
        };
        if now - since < cfg.persistence_s {
            return None;
        }

        let half_l = field::HALF_LENGTH_M;
        let half_w = field::HALF_WIDTH_M;
        let ball_near_wall =
            ball.0.abs() > half_l - 0.10 || ball.1.abs() > half_w - 0.10;

        let contact2 = cfg.contact_radius_m * cfg.contact_radius_m;
        let close_contest = blue_d2 < contact2 && red_d2 < contact2;

        if !close_contest {
            // Pinned or stalled without contact: free the ball, no
            // possession grant.
            possession.strip();

            let (mut kx, mut ky) = to_center_dir(ball);
            let wall_n = wall_normal(ball);
            if wall_n != (0.0, 0.0) {
                kx = kx * 0.70 + wall_n.0 * 0.30;
                ky = ky * 0.70 + wall_n.1 * 0.30;
            }
            let km = (kx * kx + ky * ky).sqrt();
            if km > 1e-9 {
                kx /= km;
                ky /= km;
            }

            let speed =
                if ball_near_wall { cfg.wall_nudge_speed_mps } else { cfg.nudge_speed_mps };
            world.ball.vel = (kx * speed, ky * speed);

            // Step off the boundary so it doesn't immediately re-stick.
            let margin = robot::RADIUS_M + 0.06;
            world.ball.pos.0 =
                (world.ball.pos.0 + kx * 0.10).clamp(-half_l + margin, half_l - margin);
            world.ball.pos.1 =
                (world.ball.pos.1 + ky * 0.10).clamp(-half_w + margin, half_w - margin);

            self.stuck_since = None;
            return Some(StuckOutcome::Nudged);
        }

        // True contest: award deterministically, preferring the team that
        // does NOT currently own the ball (the contest wasn't resolving in
        // its favor anyway).
        let (winner, team) = match possession.owner().map(|o| o.team) {
            Some(1) => (red, -1),
            Some(_) => (blue, 1),
            None => {
                if blue_d2 <= red_d2 {
                    (blue, 1)
                } else {
                    (red, -1)
                }
            }
        };

        possession.award(winner.id, team);

        // Snap the ball slightly in front of the winner to break symmetry.
        let fwd = winner.forward();
        let carry = robot::RADIUS_M + 0.012;
        world.ball.pos = (winner.pos.0 + fwd.0 * carry, winner.pos.1 + fwd.1 * carry);
        world.ball.vel = (world.ball.vel.0 * 0.2, world.ball.vel.1 * 0.2);

        // Extra shove away from walls/corners.
        let n = wall_normal(world.ball.pos);
        if n != (0.0, 0.0) {
            let margin = robot::RADIUS_M + 0.06;
            world.ball.pos.0 =
                (world.ball.pos.0 + n.0 * 0.10).clamp(-half_l + margin, half_l - margin);
            world.ball.pos.1 =
                (world.ball.pos.1 + n.1 * 0.10).clamp(-half_w + margin, half_w - margin);
            world.ball.vel.0 += n.0 * 0.35;
            world.ball.vel.1 += n.1 * 0.35;
        }

        self.stuck_since = None;
        Some(StuckOutcome::Awarded { id: winner.id, team })
    }

    /// Record robot positions; returns how many had prior history.
    fn track_robots(&mut self, world: &World) -> usize {
        let mut tracked = 0;
        for r in world.our_robots.iter().chain(world.opp_robots.iter()) {
            if self.last_robot_pos.contains_key(&r.id) {
                tracked += 1;
            }
            self.last_robot_pos.insert(r.id, r.pos);
        }
        tracked
    }
}

fn to_center_dir(p: Point) -> Point {
    let d = (p.0 * p.0 + p.1 * p.1).sqrt();
    if d < 1e-6 {
        (0.0, 0.0)
    } else {
        (-p.0 / d, -p.1 / d)
    }
}

/// Unit normal pointing into the field when `p` sits inside the wall
/// margin, (0,0) in open play.
fn wall_normal(p: Point) -> Point {
    let margin = robot::RADIUS_M + 0.06;
    let mut n = (0.0f32, 0.0f32);
    if p.0 < -field::HALF_LENGTH_M + margin {
        n.0 = 1.0;
    } else if p.0 > field::HALF_LENGTH_M - margin {
        n.0 = -1.0;
    }
    if p.1 < -field::HALF_WIDTH_M + margin {
        n.1 = 1.0;
    } else if p.1 > field::HALF_WIDTH_M - margin {
        n.1 = -1.0;
    }
    let m = (n.0 * n.0 + n.1 * n.1).sqrt();
    if m > 0.0 {
        (n.0 / m, n.1 / m)
    } else {
        (0.0, 0.0)
    }
}
