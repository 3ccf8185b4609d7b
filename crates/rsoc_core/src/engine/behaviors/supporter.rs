//! Backup supporter: open a lane behind the nearest opposing defender
//!
//! The second-closest robot to the ball stands just behind the opponent
//! most likely to block the ball (relative to the ball->goal direction),
//! with a small lateral offset so the passing lane past that defender is
//! actually usable.

use crate::engine::geometry::{closest_robot, dist};
use crate::engine::physics_constants::{field, robot};
use crate::engine::steering::seek;
use crate::engine::world::{Command, Robot, TeamSign, World};

pub fn backup_support_command(this: &Robot, world: &World, sign: TeamSign) -> Command {
    let mut cmd = Command::stop(this.id);
    let ball = &world.ball;
    let sf = sign as f32;

    // The likely blocker is the opponent nearest the ball.
    let nearest_opp = closest_robot(world.opponents(sign), ball.pos);

    let goal = (sf * field::HALF_LENGTH_M, 0.0);
    let mut dir = (goal.0 - ball.pos.0, goal.1 - ball.pos.1);
    let dir_d = dist((0.0, 0.0), dir);
    if dir_d < 1e-6 {
        dir = (sf, 0.0);
    } else {
        dir = (dir.0 / dir_d, dir.1 / dir_d);
    }

    let lat = (-dir.1, dir.0);
    let lateral = if this.id % 2 == 0 { 0.45 } else { -0.45 };

    let (mut tx, mut ty) = match nearest_opp {
        Some(opp) => {
            let behind = 0.55;
            (
                opp.pos.0 - dir.0 * behind + lat.0 * lateral,
                opp.pos.1 - dir.1 * behind + lat.1 * lateral,
            )
        }
        None => {
            // No opponents at all: hold behind the ball instead.
            let behind = 0.8;
            (
                ball.pos.0 - behind * sf,
                ball.pos.1 + if this.id % 2 == 0 { 0.7 } else { -0.7 },
            )
        }
    };

    let margin = robot::RADIUS_M + 0.05;
    tx = tx.clamp(-field::HALF_LENGTH_M + margin, field::HALF_LENGTH_M - margin);
    ty = ty.clamp(-field::HALF_WIDTH_M + margin, field::HALF_WIDTH_M - margin);

    cmd.vel = seek(this.pos, (tx, ty), 1.2);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_behind_nearest_defender() {
        let mut w = World::default();
        w.our_robots = vec![Robot::new(5, 0.0, 1.5, 0.0)];
        w.opp_robots = vec![Robot::new(14, 2.0, 0.0, 0.0)];
        w.ball.place((1.0, 0.0));

        let cmd = backup_support_command(&w.our_robots[0], &w, 1);
        // Supporter above the lane moves down/right toward a point near the
        // defender, not away from play.
        assert!(cmd.vel.0 != 0.0 || cmd.vel.1 != 0.0);
        assert!(!cmd.kick);
    }

    #[test]
    fn test_fallback_without_opponents() {
        let mut w = World::default();
        w.our_robots = vec![Robot::new(4, 2.0, 0.0, 0.0)];
        w.ball.place((1.0, 0.0));
        let cmd = backup_support_command(&w.our_robots[0], &w, 1);
        // Target is behind the ball (toward -x), so we move toward -x.
        assert!(cmd.vel.0 < 0.0);
    }

    #[test]
    fn test_lateral_offset_parity() {
        let mut w = World::default();
        w.our_robots = vec![Robot::new(4, -2.0, 0.0, 0.0), Robot::new(5, -2.0, 0.0, 0.0)];
        w.opp_robots = vec![Robot::new(14, 2.0, 0.0, 0.0)];
        w.ball.place((1.0, 0.0));
        let even = backup_support_command(&w.our_robots[0], &w, 1);
        let odd = backup_support_command(&w.our_robots[1], &w, 1);
        // Even and odd ids take opposite lateral sides of the lane.
        assert!(even.vel.1 * odd.vel.1 <= 0.0);
    }
}
