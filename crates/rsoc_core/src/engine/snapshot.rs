//! Read-only per-tick snapshot for the presentation shell
//!
//! The core draws nothing and parses no input. It publishes this typed,
//! serde-serializable snapshot once per tick; a display layer (or a replay
//! dumper) only ever reads it. Debug overlays ride along so a viewer can
//! draw planned targets and marking assignments without reaching into
//! engine internals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::world::{Point, Robot, RobotId, World};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RobotSnapshot {
    pub id: RobotId,
    pub x: f32,
    pub y: f32,
    pub orientation: f32,
}

impl From<&Robot> for RobotSnapshot {
    fn from(r: &Robot) -> Self {
        Self { id: r.id, x: r.pos.0, y: r.pos.1, orientation: r.orientation }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Score {
    pub blue: u32,
    pub red: u32,
}

/// Optional overlays for debugging viewers. All coordinates are in the
/// true (blue-attacks-+x) frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DebugOverlay {
    /// One representative off-ball target per team: [blue, red]
    pub team_targets: [Option<Point>; 2],
    /// Final planned off-ball target per robot id
    pub planned_targets: HashMap<RobotId, Point>,
    /// Active mark target per defender id
    pub mark_targets: HashMap<RobotId, Point>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub sim_time: f64,
    pub running: bool,
    pub blue: Vec<RobotSnapshot>,
    pub red: Vec<RobotSnapshot>,
    pub ball: BallSnapshot,
    pub score: Score,
    pub debug: DebugOverlay,
}

impl WorldSnapshot {
    pub fn capture(
        world: &World,
        tick: u64,
        sim_time: f64,
        running: bool,
        score: Score,
        debug: DebugOverlay,
    ) -> Self {
        Self {
            tick,
            sim_time,
            running,
            blue: world.our_robots.iter().map(RobotSnapshot::from).collect(),
            red: world.opp_robots.iter().map(RobotSnapshot::from).collect(),
            ball: BallSnapshot {
                x: world.ball.pos.0,
                y: world.ball.pos.1,
                vx: world.ball.vel.0,
                vy: world.ball.vel.1,
            },
            score,
            debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_serialize() {
        let mut w = World::default();
        w.reset_kickoff();
        let snap = WorldSnapshot::capture(
            &w,
            42,
            0.7,
            true,
            Score { blue: 1, red: 0 },
            DebugOverlay::default(),
        );
        assert_eq!(snap.blue.len(), 6);
        assert_eq!(snap.red.len(), 6);
        assert_eq!(snap.tick, 42);

        let json = serde_json::to_string(&snap).unwrap();
        let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score.blue, 1);
        assert_eq!(back.blue[0].id, snap.blue[0].id);
    }
}
