//! Brute-force position scoring over a uniform field grid
//!
//! No gradient ascent, no refinement: resolution is controlled purely by the
//! step size (coarser for defense, finer for attack). The scan order is
//! fixed and ties resolve to the first maximum, so identical inputs always
//! return the identical point. Test reproducibility depends on that.

use serde::{Deserialize, Serialize};

use super::physics_constants::{field, grid};
use super::world::{Point, Robot, TeamSign, World};

/// A candidate point with its score (higher is better).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl GridPoint {
    pub fn pos(&self) -> Point {
        (self.x, self.y)
    }
}

/// Scores a candidate position for a specific robot. Higher is better.
/// Rubrics are ordinary closures so context (marks, learned bonuses,
/// per-tick team flags) composes by capture.
pub trait PositionScorer {
    fn score(&self, world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32;
}

impl<F> PositionScorer for F
where
    F: Fn(&World, &Robot, Point, TeamSign) -> f32,
{
    fn score(&self, world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32 {
        self(world, this, p, sign)
    }
}

/// Scan the playable area (minus a boundary margin) on a uniform grid and
/// return the best-scoring sample. The robot's own position (score -inf)
/// is returned when nothing beats the initial bound, so callers always get
/// a usable target.
pub fn find_best<S: PositionScorer>(
    world: &World,
    this: &Robot,
    sign: TeamSign,
    step: f32,
    scorer: &S,
) -> GridPoint {
    let margin = grid::MARGIN_M;
    let half_l = field::HALF_LENGTH_M;
    let half_w = field::HALF_WIDTH_M;

    let mut best = GridPoint { x: this.pos.0, y: this.pos.1, score: f32::NEG_INFINITY };

    let mut x = -half_l + margin;
    while x <= half_l - margin {
        let mut y = -half_w + margin;
        while y <= half_w - margin {
            let s = scorer.score(world, this, (x, y), sign);
            if s > best.score {
                best = GridPoint { x, y, score: s };
            }
            y += step;
        }
        x += step;
    }

    best
}
