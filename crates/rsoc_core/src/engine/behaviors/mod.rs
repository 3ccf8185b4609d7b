//! Per-role command production
//!
//! Roles are a tagged variant dispatched through one decision function so
//! the compiler checks every role is handled. The goalkeeper and ball
//! winner have dedicated behaviors; the supporter and generic defender are
//! driven by the position-scoring grid (see `decision::offball`), with the
//! supporter's movement overridden by its lane-opening backup positioning.

pub mod attacker;
pub mod goalkeeper;
pub mod supporter;

use super::world::{Robot, RobotId};

/// Role assigned to an agent for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Reserved-id keeper, constrained to its home box
    Goalkeeper,
    /// Closest teammate to the ball (with hysteresis), plays the ball
    BallWinner,
    /// Second-closest teammate, opens a pass lane behind the nearest defender
    Supporter,
    /// Everyone else: grid-search positioning (attack or defense rubric)
    Defender,
}

/// Role for one robot given the team's held ball-winner and backup ids.
pub fn role_for(robot: &Robot, winner_id: Option<RobotId>, backup_id: Option<RobotId>) -> Role {
    if robot.is_goalkeeper() {
        Role::Goalkeeper
    } else if winner_id == Some(robot.id) {
        Role::BallWinner
    } else if backup_id == Some(robot.id) {
        Role::Supporter
    } else {
        Role::Defender
    }
}
