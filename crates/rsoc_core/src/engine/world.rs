//! World model: ball, robots, rosters and per-tick commands
//!
//! Convention: the blue roster defends the -x goal and attacks +x, red is
//! the mirror image. All decision code is written for the +x perspective
//! and the red team runs inside a mirrored world frame (see `coordinates`).

use serde::{Deserialize, Serialize};

use super::geometry::dist2;
use super::physics_constants::{field, robot};

/// 2D point / vector in field meters
pub type Point = (f32, f32);

/// Stable robot identity. Encodes team and role by convention:
/// blue 0..=5, red 10..=15, ids 0 and 10 are the goalkeepers.
pub type RobotId = i32;

/// +1 attacks toward +x (blue), -1 attacks toward -x (red)
pub type TeamSign = i8;

pub const GK_BLUE: RobotId = 0;
pub const GK_RED: RobotId = 10;

/// Back-line id ranges used by the marking assignment
pub const BLUE_BACK_LINE: std::ops::RangeInclusive<RobotId> = 1..=3;
pub const RED_BACK_LINE: std::ops::RangeInclusive<RobotId> = 11..=13;

pub fn is_goalkeeper_id(id: RobotId) -> bool {
    id == GK_BLUE || id == GK_RED
}

pub fn is_back_line_id(id: RobotId, sign: TeamSign) -> bool {
    if sign > 0 {
        BLUE_BACK_LINE.contains(&id)
    } else {
        RED_BACK_LINE.contains(&id)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Point,
    pub vel: Point,
}

impl Ball {
    pub fn speed(&self) -> f32 {
        (self.vel.0 * self.vel.0 + self.vel.1 * self.vel.1).sqrt()
    }

    pub fn speed2(&self) -> f32 {
        self.vel.0 * self.vel.0 + self.vel.1 * self.vel.1
    }

    /// Reposition (kickoff, debug placement). Keeps the same ball instance.
    pub fn place(&mut self, pos: Point) {
        self.pos = pos;
        self.vel = (0.0, 0.0);
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Robot {
    pub id: RobotId,
    pub pos: Point,
    /// Facing angle in radians (0 = +x)
    pub orientation: f32,
}

impl Robot {
    pub fn new(id: RobotId, x: f32, y: f32, orientation: f32) -> Self {
        Self { id, pos: (x, y), orientation }
    }

    pub fn is_goalkeeper(&self) -> bool {
        is_goalkeeper_id(self.id)
    }

    /// Unit forward vector from orientation
    pub fn forward(&self) -> Point {
        (self.orientation.cos(), self.orientation.sin())
    }
}

/// Per-tick snapshot of both rosters plus the ball.
///
/// `our_robots` is whichever roster attacks +x in the frame this world is
/// expressed in (blue in the true frame, red inside the mirrored frame).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct World {
    pub our_robots: Vec<Robot>,
    pub opp_robots: Vec<Robot>,
    pub ball: Ball,
}

impl World {
    /// Roster attacking in the direction of `sign` (in this world's frame).
    pub fn mates(&self, sign: TeamSign) -> &[Robot] {
        if sign > 0 {
            &self.our_robots
        } else {
            &self.opp_robots
        }
    }

    /// Roster opposing the team with `sign`.
    pub fn opponents(&self, sign: TeamSign) -> &[Robot] {
        if sign > 0 {
            &self.opp_robots
        } else {
            &self.our_robots
        }
    }

    pub fn find_robot(&self, id: RobotId, sign: TeamSign) -> Option<&Robot> {
        self.mates(sign).iter().find(|r| r.id == id)
    }

    /// Closest robot of a roster to a point, with its squared distance.
    pub fn closest_to(robots: &[Robot], p: Point) -> Option<(&Robot, f32)> {
        let mut best: Option<(&Robot, f32)> = None;
        for r in robots {
            let d2 = dist2(r.pos, p);
            if best.map_or(true, |(_, bd2)| d2 < bd2) {
                best = Some((r, d2));
            }
        }
        best
    }

    pub fn closest_to_ball(&self, sign: TeamSign) -> Option<&Robot> {
        Self::closest_to(self.mates(sign), self.ball.pos).map(|(r, _)| r)
    }

    /// True when `candidate` is the second-closest robot of `robots` to the ball.
    pub fn is_second_closest(robots: &[Robot], ball: Point, candidate: RobotId) -> bool {
        if robots.len() < 2 {
            return false;
        }
        let mut best: Option<(RobotId, f32)> = None;
        let mut second: Option<(RobotId, f32)> = None;
        for r in robots {
            let d2 = dist2(r.pos, ball);
            match best {
                Some((_, bd2)) if d2 >= bd2 => {
                    if second.map_or(true, |(_, sd2)| d2 < sd2) {
                        second = Some((r.id, d2));
                    }
                }
                _ => {
                    second = best;
                    best = Some((r.id, d2));
                }
            }
        }
        second.map_or(false, |(id, _)| id == candidate)
    }

    /// Kickoff formation: GK + 3 defenders + 2 attackers per side.
    /// Repositions the existing rosters (or creates them on first use).
    pub fn reset_kickoff(&mut self) {
        let hl = field::HALF_LENGTH_M;

        self.our_robots.clear();
        self.opp_robots.clear();

        // Blue: GK on the goal line, back three, front two
        self.our_robots.push(Robot::new(GK_BLUE, -hl + 0.35, 0.0, 0.0));
        self.our_robots.push(Robot::new(1, -hl + 1.35, -1.0, 0.0));
        self.our_robots.push(Robot::new(2, -hl + 1.35, 0.0, 0.0));
        self.our_robots.push(Robot::new(3, -hl + 1.35, 1.0, 0.0));
        self.our_robots.push(Robot::new(4, -0.6, -0.9, 0.0));
        self.our_robots.push(Robot::new(5, -0.6, 0.9, 0.0));

        // Red mirrored, facing -x
        let pi = std::f32::consts::PI;
        self.opp_robots.push(Robot::new(GK_RED, hl - 0.35, 0.0, pi));
        self.opp_robots.push(Robot::new(11, hl - 1.35, -1.0, pi));
        self.opp_robots.push(Robot::new(12, hl - 1.35, 0.0, pi));
        self.opp_robots.push(Robot::new(13, hl - 1.35, 1.0, pi));
        self.opp_robots.push(Robot::new(14, 0.6, -0.9, pi));
        self.opp_robots.push(Robot::new(15, 0.6, 0.9, pi));

        for r in self.our_robots.iter_mut().chain(self.opp_robots.iter_mut()) {
            keep_inside_field(r);
        }

        self.ball.place((0.0, 0.0));
    }

    /// A team is "attacking" when the ball is inside the opponent half.
    pub fn is_attacking(&self, sign: TeamSign) -> bool {
        if sign > 0 {
            self.ball.pos.0 > 0.0
        } else {
            self.ball.pos.0 < 0.0
        }
    }
}

/// Clamp a robot center into the play area.
pub fn keep_inside_field(r: &mut Robot) {
    let m = robot::RADIUS_M;
    r.pos.0 = r.pos.0.clamp(-field::HALF_LENGTH_M + m, field::HALF_LENGTH_M - m);
    r.pos.1 = r.pos.1.clamp(-field::HALF_WIDTH_M + m, field::HALF_WIDTH_M - m);
}

/// Desired motion + kick for one robot, produced fresh each tick and
/// consumed exactly once by the physics layer.
#[derive(Clone, Copy, Debug)]
pub struct Command {
    pub robot_id: RobotId,
    /// Desired velocity (m/s), clamped on apply
    pub vel: Point,
    /// Desired angular rate (rad/s)
    pub omega: f32,
    pub kick: bool,
    /// Kick vector in field coordinates; (0,0) falls back to a forward punt
    pub kick_vel: Point,
    /// Set when the kick is a deliberate pass to a teammate
    pub pass_target: Option<RobotId>,
    /// Set when the kick is a deliberate shot on goal
    pub shot_intent: bool,
}

impl Command {
    pub fn stop(robot_id: RobotId) -> Self {
        Self {
            robot_id,
            vel: (0.0, 0.0),
            omega: 0.0,
            kick: false,
            kick_vel: (0.0, 0.0),
            pass_target: None,
            shot_intent: false,
        }
    }

    /// A kick command that is a tagged pass toward a receiver.
    pub fn is_tagged_pass(&self) -> bool {
        self.kick && self.pass_target.is_some() && !self.shot_intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kickoff_formation_counts() {
        let mut w = World::default();
        w.reset_kickoff();
        assert_eq!(w.our_robots.len(), 6);
        assert_eq!(w.opp_robots.len(), 6);
        assert_eq!(w.ball.pos, (0.0, 0.0));
        assert_eq!(w.ball.vel, (0.0, 0.0));
    }

    #[test]
    fn test_goalkeeper_convention() {
        let mut w = World::default();
        w.reset_kickoff();
        assert!(w.our_robots[0].is_goalkeeper());
        assert!(w.opp_robots[0].is_goalkeeper());
        assert!(!w.our_robots[1].is_goalkeeper());
        assert!(is_back_line_id(2, 1));
        assert!(is_back_line_id(12, -1));
        assert!(!is_back_line_id(12, 1));
        assert!(!is_back_line_id(4, 1));
    }

    #[test]
    fn test_closest_and_second_closest() {
        let mut w = World::default();
        w.reset_kickoff();
        w.ball.place((-0.5, -0.9));
        // Robot 4 sits at (-0.6, -0.9): closest; robot 5 at (-0.6, 0.9): second.
        let c = w.closest_to_ball(1).unwrap();
        assert_eq!(c.id, 4);
        assert!(World::is_second_closest(&w.our_robots, w.ball.pos, 5));
        assert!(!World::is_second_closest(&w.our_robots, w.ball.pos, 4));
    }

    #[test]
    fn test_keep_inside_field_clamps() {
        let mut r = Robot::new(7, 100.0, -100.0, 0.0);
        keep_inside_field(&mut r);
        assert!(r.pos.0 <= field::HALF_LENGTH_M - robot::RADIUS_M);
        assert!(r.pos.1 >= -field::HALF_WIDTH_M + robot::RADIUS_M);
    }

    #[test]
    fn test_mates_opponents_by_sign() {
        let mut w = World::default();
        w.reset_kickoff();
        assert_eq!(w.mates(1)[0].id, GK_BLUE);
        assert_eq!(w.mates(-1)[0].id, GK_RED);
        assert_eq!(w.opponents(1)[0].id, GK_RED);
        assert!(w.find_robot(13, -1).is_some());
        assert!(w.find_robot(13, 1).is_none());
    }
}
