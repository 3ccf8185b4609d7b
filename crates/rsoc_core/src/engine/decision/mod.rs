//! Per-team decision pass
//!
//! Runs once per team per tick, always in a frame where the team attacks
//! +x (the true world for blue, the mirrored view for red). Produces one
//! command per robot plus the per-tick context the snapshot layer and the
//! reward tracker need.

pub mod marking;
pub mod offball;
pub mod roles;

pub use marking::{assign_marks, OwnerInfo};
pub use roles::RoleState;

use std::collections::HashMap;

use rand_chacha::ChaCha8Rng;

use super::behaviors::{self, attacker, goalkeeper, supporter, Role};
use super::geometry::dist;
use super::learning::Learning;
use super::rewards::OutcomeTracker;
use super::world::{Command, Point, Robot, RobotId, TeamSign, World};
use self::offball::{apply_ball_approach_bias, offball_command, OffballContext};

/// Result of one team's decision pass (all in the decision frame).
pub struct TeamDecisions {
    /// One command per roster entry, in roster order
    pub commands: Vec<Command>,
    /// Final off-ball targets by robot id (after deconfliction)
    pub planned_targets: HashMap<RobotId, Point>,
    /// Representative off-ball target for the debug overlay
    pub debug_target: Option<Point>,
    /// The ball-winner decided to attempt a pass this tick
    pub team_passing: bool,
}

#[allow(clippy::too_many_arguments)]
pub fn decide_team(
    frame_world: &World,
    role_state: &mut RoleState,
    frame_marks: &HashMap<RobotId, Point>,
    owner: OwnerInfo,
    true_sign: TeamSign,
    learning: &Learning,
    tracker: &mut OutcomeTracker,
    rng: &mut ChaCha8Rng,
    now: f64,
) -> TeamDecisions {
    let sign: TeamSign = 1; // the frame is always +x-attacking
    let mates = &frame_world.our_robots;

    role_state.update(mates, frame_world.ball.pos, now);
    let winner_id = role_state.ball_winner_id;

    // Pre-compute the ball-winner command so teammates can react (spread)
    // within the same tick.
    let winner_robot = winner_id.and_then(|id| frame_world.find_robot(id, sign));
    let mut winner_cmd: Option<Command> = None;
    let mut team_passing = false;
    if let Some(w) = winner_robot {
        if !w.is_goalkeeper() {
            let cmd = attacker::decide(w, frame_world, sign, learning, rng);
            team_passing = cmd.is_tagged_pass();
            winner_cmd = Some(cmd);
        }
    }

    // "Likely regain soon": we clearly arrive first at a free ball and the
    // opponent is not close enough to contest.
    let we_own = owner.map_or(false, |(_, t)| t == true_sign);
    let regain_soon = if we_own {
        false
    } else {
        match winner_robot {
            Some(w) if !w.is_goalkeeper() => {
                let d_our = dist(w.pos, frame_world.ball.pos);
                let d_opp = frame_world
                    .closest_to_ball(-sign)
                    .map_or(9.0, |o| dist(o.pos, frame_world.ball.pos));
                let opponent_close = d_opp <= 0.75;
                let we_arrive_soon = d_our <= 0.75;
                let clear_lead = d_our + 0.18 < d_opp;
                we_arrive_soon && clear_lead && !opponent_close
            }
            _ => false,
        }
    };

    let rest_defender_id = roles::rest_defender_id(frame_world, sign, winner_id);
    let backup_id = backup_candidate(mates, frame_world.ball.pos);

    let ctx = OffballContext {
        rest_defender_id,
        marks: frame_marks,
        team_passing,
        regain_soon,
    };

    let mut planned: HashMap<RobotId, Point> = HashMap::new();
    let mut debug_target: Option<Point> = None;
    let mut commands = Vec::with_capacity(mates.len());

    for robot in mates {
        let role = behaviors::role_for(robot, winner_id, backup_id);
        let cmd = match role {
            Role::Goalkeeper => goalkeeper::decide(robot, frame_world, sign),
            Role::BallWinner => winner_cmd
                .filter(|c| c.robot_id == robot.id)
                .unwrap_or_else(|| attacker::decide(robot, frame_world, sign, learning, rng)),
            Role::Supporter => {
                // Grid decision first (records the plan and position
                // features), then the lane-opening backup override.
                let out = offball_command(
                    frame_world,
                    robot,
                    sign,
                    &ctx,
                    &mut planned,
                    learning,
                    tracker,
                    now,
                );
                debug_target = Some(out.target);
                let mut cmd = supporter::backup_support_command(robot, frame_world, sign);
                apply_ball_approach_bias(&mut cmd, robot, frame_world);
                cmd
            }
            Role::Defender => {
                let out = offball_command(
                    frame_world,
                    robot,
                    sign,
                    &ctx,
                    &mut planned,
                    learning,
                    tracker,
                    now,
                );
                debug_target = Some(out.target);
                let mut cmd = out.command;
                apply_ball_approach_bias(&mut cmd, robot, frame_world);
                cmd
            }
        };
        commands.push(cmd);
    }

    TeamDecisions { commands, planned_targets: planned, debug_target, team_passing }
}

/// Second-closest roster robot to the ball (backup supporter candidate).
fn backup_candidate(mates: &[Robot], ball: Point) -> Option<RobotId> {
    if mates.len() < 2 {
        return None;
    }
    mates
        .iter()
        .find(|r| World::is_second_closest(mates, ball, r.id))
        .map(|r| r.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn setup() -> (World, RoleState, Learning, OutcomeTracker, ChaCha8Rng) {
        let mut w = World::default();
        w.reset_kickoff();
        (
            w,
            RoleState::new(),
            Learning::in_memory(),
            OutcomeTracker::new(),
            ChaCha8Rng::seed_from_u64(11),
        )
    }

    #[test]
    fn test_one_command_per_robot() {
        let (mut w, mut roles, learning, mut tracker, mut rng) = setup();
        w.ball.place((0.5, 0.0));
        let marks = HashMap::new();
        let out = decide_team(
            &w,
            &mut roles,
            &marks,
            None,
            1,
            &learning,
            &mut tracker,
            &mut rng,
            0.0,
        );
        assert_eq!(out.commands.len(), w.our_robots.len());
        for (cmd, robot) in out.commands.iter().zip(w.our_robots.iter()) {
            assert_eq!(cmd.robot_id, robot.id);
        }
    }

    #[test]
    fn test_offball_robots_record_plans() {
        let (mut w, mut roles, learning, mut tracker, mut rng) = setup();
        w.ball.place((1.0, 0.2)); // attacking
        let marks = HashMap::new();
        let out = decide_team(
            &w,
            &mut roles,
            &marks,
            None,
            1,
            &learning,
            &mut tracker,
            &mut rng,
            0.0,
        );
        // GK and ball-winner don't plan off-ball targets; the rest do.
        assert!(out.planned_targets.len() >= 3);
        assert!(out.debug_target.is_some());
    }

    #[test]
    fn test_winner_held_by_role_state() {
        let (mut w, mut roles, learning, mut tracker, mut rng) = setup();
        w.ball.place((-0.5, -0.9));
        let marks = HashMap::new();
        let _ = decide_team(
            &w,
            &mut roles,
            &marks,
            None,
            1,
            &learning,
            &mut tracker,
            &mut rng,
            0.0,
        );
        assert_eq!(roles.ball_winner_id, Some(4));
    }
}
