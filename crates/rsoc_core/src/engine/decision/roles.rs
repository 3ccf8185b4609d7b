//! Ball-winner selection (with hysteresis) and rest-defender choice

use crate::engine::geometry::dist2;
use crate::engine::physics_constants::field;
use crate::engine::world::{Point, Robot, RobotId, TeamSign, World};

/// Minimum time a ball-winner keeps the role before any switch (seconds).
const WINNER_HOLD_S: f64 = 0.6;

/// Per-team role stabilization state.
#[derive(Clone, Copy, Debug)]
pub struct RoleState {
    pub ball_winner_id: Option<RobotId>,
    pub last_switch: f64,
}

impl RoleState {
    pub fn new() -> Self {
        Self { ball_winner_id: None, last_switch: f64::NEG_INFINITY }
    }

    /// Reset on formation resets so stale ids don't linger.
    pub fn clear(&mut self) {
        self.ball_winner_id = None;
        self.last_switch = f64::NEG_INFINITY;
    }

    /// Update the held ball-winner id against the current closest robot.
    ///
    /// A candidate must be *clearly* closer (25% relative or 0.25m
    /// absolute) and the current holder must have kept the role for a
    /// minimum duration. Near the center line the margin is stricter so
    /// midfield scrambles don't flip the role every tick.
    pub fn update(&mut self, mates: &[Robot], ball: Point, now: f64) {
        let Some((closest, cand_d2)) = World::closest_to(mates, ball) else {
            self.ball_winner_id = None;
            return;
        };

        let current = self
            .ball_winner_id
            .and_then(|id| mates.iter().find(|r| r.id == id));

        let Some(current) = current else {
            // No valid holder: take the closest immediately.
            self.ball_winner_id = Some(closest.id);
            self.last_switch = now;
            return;
        };

        if closest.id == current.id {
            return;
        }
        if now - self.last_switch < WINNER_HOLD_S {
            return;
        }

        let cur_d2 = dist2(current.pos, ball);

        let min_abs2 = 0.25 * 0.25;
        let clearly_closer = cand_d2 < cur_d2 * 0.75 || (cur_d2 - cand_d2) > min_abs2;
        if !clearly_closer {
            return;
        }

        // Near the center line, require an even stronger advantage.
        let center_deadband = 0.15;
        if ball.0.abs() < center_deadband {
            let very_clearly = cand_d2 < cur_d2 * 0.55 || (cur_d2 - cand_d2) > 0.35 * 0.35;
            if !very_clearly {
                return;
            }
        }

        self.ball_winner_id = Some(closest.id);
        self.last_switch = now;
    }
}

impl Default for RoleState {
    fn default() -> Self {
        Self::new()
    }
}

/// Attack threshold past which the safety switches from "deepest" to
/// "most central", freeing both wide defenders to join the attack.
const ADVANCED_BALL_X: f32 = 0.45;

/// The single rest-defender held back while the team attacks.
///
/// Normal case: the deepest (closest to our goal) non-GK robot. Once the
/// ball is well into the attacking half, the most central robot instead,
/// so both wide defenders are free to join the attack. The ball winner is
/// never the safety.
pub fn rest_defender_id(
    world: &World,
    sign: TeamSign,
    winner_id: Option<RobotId>,
) -> Option<RobotId> {
    if !world.is_attacking(sign) {
        return None;
    }

    let sf = sign as f32;
    let ball_advanced = world.ball.pos.0 * sf > ADVANCED_BALL_X;

    let mates = world.mates(sign);
    let our_goal_x = -sf * field::HALF_LENGTH_M;

    let mut best: Option<(RobotId, f32)> = None;
    for r in mates {
        if r.is_goalkeeper() || winner_id == Some(r.id) {
            continue;
        }
        let key = if ball_advanced {
            r.pos.1.abs() // most central
        } else {
            (r.pos.0 - our_goal_x).abs() // deepest
        };
        if best.map_or(true, |(_, bk)| key < bk) {
            best = Some((r.id, key));
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mates() -> Vec<Robot> {
        vec![
            Robot::new(0, -4.15, 0.0, 0.0),
            Robot::new(1, -3.15, -1.0, 0.0),
            Robot::new(2, -3.15, 0.0, 0.0),
            Robot::new(3, -3.15, 1.0, 0.0),
            Robot::new(4, -0.6, -0.9, 0.0),
            Robot::new(5, -0.6, 0.9, 0.0),
        ]
    }

    #[test]
    fn test_initial_pick_is_closest() {
        let mut state = RoleState::new();
        state.update(&mates(), (-0.5, -0.9), 0.0);
        assert_eq!(state.ball_winner_id, Some(4));
    }

    #[test]
    fn test_hold_duration_blocks_switch() {
        let mut state = RoleState::new();
        let team = mates();
        state.update(&team, (-0.5, -0.9), 0.0);
        assert_eq!(state.ball_winner_id, Some(4));
        // Ball teleports to robot 5, but inside the hold window.
        state.update(&team, (-0.5, 0.9), 0.3);
        assert_eq!(state.ball_winner_id, Some(4));
        // After the hold expires the clearly-closer robot takes over.
        state.update(&team, (-0.5, 0.9), 0.7);
        assert_eq!(state.ball_winner_id, Some(5));
    }

    #[test]
    fn test_marginal_advantage_does_not_switch() {
        let mut state = RoleState::new();
        let team = vec![Robot::new(4, 1.0, 0.1, 0.0), Robot::new(5, 1.0, -0.12, 0.0)];
        state.update(&team, (1.0, 0.0), 0.0);
        let held = state.ball_winner_id;
        // Tiny differences must not flip the role even after the hold.
        state.update(&team, (1.0, 0.0), 5.0);
        assert_eq!(state.ball_winner_id, held);
    }

    #[test]
    fn test_center_line_needs_stronger_margin() {
        // Holder 0.6m out, candidate 0.5m: passes the normal margin
        // (0.25 < 0.75*0.36, diff 0.11 > 0.0625) but fails the stricter
        // center-line one (0.25 > 0.55*0.36 and diff 0.11 < 0.1225).
        let team = vec![Robot::new(4, 0.0, 0.6, 0.0), Robot::new(5, 0.0, -0.5, 0.0)];

        let mut at_center = RoleState::new();
        at_center.ball_winner_id = Some(4);
        at_center.last_switch = -10.0;
        at_center.update(&team, (0.0, 0.0), 0.0);
        assert_eq!(at_center.ball_winner_id, Some(4), "center-line deadband should hold");

        // Same geometry away from the center line switches.
        let team_shifted =
            vec![Robot::new(4, 1.5, 0.6, 0.0), Robot::new(5, 1.5, -0.5, 0.0)];
        let mut away = RoleState::new();
        away.ball_winner_id = Some(4);
        away.last_switch = -10.0;
        away.update(&team_shifted, (1.5, 0.0), 0.0);
        assert_eq!(away.ball_winner_id, Some(5));
    }

    #[test]
    fn test_rest_defender_deepest_then_central() {
        let mut w = World::default();
        w.reset_kickoff();

        // Not attacking: no rest defender.
        w.ball.place((-1.0, 0.0));
        assert_eq!(rest_defender_id(&w, 1, Some(4)), None);

        // Attacking but ball barely over the line: deepest non-GK wins.
        // Pull defender 3 slightly deeper so the choice is unambiguous.
        w.ball.place((0.2, 0.0));
        w.our_robots[3].pos = (-3.4, 1.0);
        assert_eq!(rest_defender_id(&w, 1, Some(4)), Some(3));

        // Ball well advanced: most central (|y| smallest) wins instead.
        w.ball.place((1.5, 0.0));
        w.our_robots[2].pos = (-3.15, 0.05);
        assert_eq!(rest_defender_id(&w, 1, Some(4)), Some(2));
    }

    #[test]
    fn test_rest_defender_excludes_winner_and_gk() {
        let mut w = World::default();
        w.reset_kickoff();
        w.ball.place((0.5, 0.0));
        // If the deepest defender is the ball winner, the next one is used.
        let id = rest_defender_id(&w, 1, Some(1)).unwrap();
        assert_ne!(id, 1);
        assert_ne!(id, 0);
    }
}
