//! Mirrored-frame transforms
//!
//! All decision code is written once, for a team attacking +x. The red team
//! is decided inside a mirrored world frame: positions and velocities are
//! negated and orientations rotated by pi. Commands coming out of that frame
//! are inverse-transformed before they touch the true rosters.
//!
//! The transform is an involution: `mirror(mirror(x)) == x` (orientation up
//! to 2*pi). Tests below pin that down; decision code relies on it.

use super::world::{Ball, Command, Point, Robot, World};

#[inline]
pub fn mirror_point(p: Point) -> Point {
    (-p.0, -p.1)
}

pub fn mirror_robot(r: &Robot) -> Robot {
    Robot {
        id: r.id,
        pos: mirror_point(r.pos),
        orientation: r.orientation + std::f32::consts::PI,
    }
}

pub fn mirror_ball(b: &Ball) -> Ball {
    Ball { pos: mirror_point(b.pos), vel: mirror_point(b.vel) }
}

/// Build the mirrored world view for the red roster: rosters swap so that
/// `our_robots` is the team attacking +x in the mirrored frame.
pub fn mirror_world(world: &World) -> World {
    World {
        our_robots: world.opp_robots.iter().map(mirror_robot).collect(),
        opp_robots: world.our_robots.iter().map(mirror_robot).collect(),
        ball: mirror_ball(&world.ball),
    }
}

/// Inverse-transform a command decided in the mirrored frame back into the
/// true frame. Velocities and kick vectors negate; the angular rate is a
/// scalar about +z and is unchanged.
pub fn unmirror_command(cmd: &Command) -> Command {
    Command {
        robot_id: cmd.robot_id,
        vel: mirror_point(cmd.vel),
        omega: cmd.omega,
        kick: cmd.kick,
        kick_vel: mirror_point(cmd.kick_vel),
        pass_target: cmd.pass_target,
        shot_intent: cmd.shot_intent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_angle(a: f32) -> f32 {
        let two_pi = 2.0 * std::f32::consts::PI;
        a.rem_euclid(two_pi)
    }

    #[test]
    fn test_mirror_robot_involution() {
        let r = Robot::new(3, 1.25, -0.8, 0.7);
        let rr = mirror_robot(&mirror_robot(&r));
        assert_eq!(rr.id, r.id);
        assert!((rr.pos.0 - r.pos.0).abs() < 1e-6);
        assert!((rr.pos.1 - r.pos.1).abs() < 1e-6);
        assert!((wrap_angle(rr.orientation) - wrap_angle(r.orientation)).abs() < 1e-5);
    }

    #[test]
    fn test_mirror_world_swaps_and_restores() {
        let mut w = World::default();
        w.reset_kickoff();
        w.ball.pos = (0.8, -0.4);
        w.ball.vel = (1.0, 0.5);

        let m = mirror_world(&w);
        // Rosters swap: mirrored "our" is the red roster.
        assert_eq!(m.our_robots[0].id, w.opp_robots[0].id);
        assert_eq!(m.ball.pos, (-0.8, 0.4));
        assert_eq!(m.ball.vel, (-1.0, -0.5));

        let back = mirror_world(&m);
        assert_eq!(back.our_robots[0].id, w.our_robots[0].id);
        for (a, b) in back.our_robots.iter().zip(w.our_robots.iter()) {
            assert!((a.pos.0 - b.pos.0).abs() < 1e-6);
            assert!((a.pos.1 - b.pos.1).abs() < 1e-6);
        }
        assert!((back.ball.pos.0 - w.ball.pos.0).abs() < 1e-6);
    }

    #[test]
    fn test_unmirror_command_involution() {
        let cmd = Command {
            robot_id: 12,
            vel: (1.4, -0.3),
            omega: 2.0,
            kick: true,
            kick_vel: (4.0, 1.0),
            pass_target: Some(14),
            shot_intent: false,
        };
        let back = unmirror_command(&unmirror_command(&cmd));
        assert_eq!(back.vel, cmd.vel);
        assert_eq!(back.kick_vel, cmd.kick_vel);
        assert_eq!(back.omega, cmd.omega);
        assert_eq!(back.pass_target, cmd.pass_target);
    }

    #[cfg(feature = "proptest")]
    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_mirror_point_involution(x in -10.0f32..10.0, y in -10.0f32..10.0) {
                let p = mirror_point(mirror_point((x, y)));
                prop_assert!((p.0 - x).abs() < 1e-6);
                prop_assert!((p.1 - y).abs() < 1e-6);
            }
        }
    }
}
