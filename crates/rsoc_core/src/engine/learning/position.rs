//! Online learning for off-ball positioning
//!
//! Two small linear heads behind one learner:
//! - attack: receiving locations that historically led to good outcomes
//! - defense: locations that historically denied opponent progress/passes
//!
//! The learned score enters the grid search as a small additive bonus
//! (scaled down so the handcrafted rubrics still dominate).

use std::sync::Mutex;

use super::store::WeightStore;
use super::REWARD_CLAMP;
use crate::engine::geometry::{
    closest_point_on_segment, dist, lane_clearance, nearest_robot_distance,
    nearest_robot_distance_excluding,
};
use crate::engine::physics_constants::field;
use crate::engine::scorers::most_advanced_opponent;
use crate::engine::world::{Point, Robot, TeamSign, World};

const LR: f32 = 0.055;
const L2: f32 = 0.002;
const SAVE_EVERY: u32 = 18;

/// Bonus scale: keep the learned term small next to the heuristics.
const BONUS_SCALE: f32 = 0.55;

pub const ATTACK_FEATURES: usize = 6;
pub const DEFENSE_FEATURES: usize = 5;

const A_FORWARD: usize = 0;
const A_OPEN: usize = 1;
const A_LANE: usize = 2;
const A_RANGE: usize = 3;
const A_CENTRAL: usize = 4;
const A_TEAMSPACE: usize = 5;

const D_GOALSIDE: usize = 0;
const D_LINEHOLD: usize = 1;
const D_LANECUT: usize = 2;
const D_MARKDIST: usize = 3;
const D_MOVE: usize = 4;

const ATTACK_KEYS: [&str; ATTACK_FEATURES] =
    ["wa.forward", "wa.open", "wa.lane", "wa.range", "wa.central", "wa.teamspace"];
const DEFENSE_KEYS: [&str; DEFENSE_FEATURES] =
    ["wd.goalside", "wd.linehold", "wd.lanecut", "wd.markdist", "wd.move"];

/// Defaults: mild preference in the same direction as the handcrafted
/// heuristics, so early play is sensible before any rewards arrive.
const ATTACK_DEFAULTS: [f32; ATTACK_FEATURES] = [0.35, 0.65, 0.75, 0.25, 0.10, 0.20];
const DEFENSE_DEFAULTS: [f32; DEFENSE_FEATURES] = [0.65, 0.45, 0.55, 0.20, -0.15];

struct PositionState {
    wa: [f32; ATTACK_FEATURES],
    wd: [f32; DEFENSE_FEATURES],
    updates_since_save: u32,
}

/// Off-ball position learner (attack + defense heads, one mutex boundary).
pub struct PositionLearner {
    store: WeightStore,
    state: Mutex<PositionState>,
}

impl PositionLearner {
    pub fn new(store: WeightStore) -> Self {
        let map = store.load();
        let mut wa = ATTACK_DEFAULTS;
        for (i, key) in ATTACK_KEYS.iter().enumerate() {
            wa[i] = WeightStore::get_or(&map, key, wa[i]);
        }
        let mut wd = DEFENSE_DEFAULTS;
        for (i, key) in DEFENSE_KEYS.iter().enumerate() {
            wd[i] = WeightStore::get_or(&map, key, wd[i]);
        }
        Self { store, state: Mutex::new(PositionState { wa, wd, updates_since_save: 0 }) }
    }

    /// Additive bonus for an attacking candidate point.
    pub fn attack_bonus(&self, world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32 {
        let f = attack_features(world, this, p, sign);
        let wa = self.state.lock().unwrap().wa;
        dot(&wa, &f) * BONUS_SCALE
    }

    /// Additive bonus for a defensive candidate point (mark-aware).
    pub fn defense_bonus(
        &self,
        world: &World,
        this: &Robot,
        p: Point,
        sign: TeamSign,
        mark: Option<Point>,
    ) -> f32 {
        let f = defense_features(world, this, p, sign, mark);
        let wd = self.state.lock().unwrap().wd;
        dot5(&wd, &f) * BONUS_SCALE
    }

    pub fn apply_attack_reward(&self, reward: f32, features: &[f32; ATTACK_FEATURES]) {
        let r = reward.clamp(-REWARD_CLAMP, REWARD_CLAMP);
        let mut state = self.state.lock().unwrap();
        for i in 0..ATTACK_FEATURES {
            state.wa[i] += LR * (r * features[i] - L2 * state.wa[i]);
        }
        state.updates_since_save += 1;
        if state.updates_since_save >= SAVE_EVERY {
            state.updates_since_save = 0;
            let (wa, wd) = (state.wa, state.wd);
            drop(state);
            self.persist(&wa, &wd);
        }
    }

    pub fn apply_defense_reward(&self, reward: f32, features: &[f32; DEFENSE_FEATURES]) {
        let r = reward.clamp(-REWARD_CLAMP, REWARD_CLAMP);
        let mut state = self.state.lock().unwrap();
        for i in 0..DEFENSE_FEATURES {
            state.wd[i] += LR * (r * features[i] - L2 * state.wd[i]);
        }
        state.updates_since_save += 1;
        if state.updates_since_save >= SAVE_EVERY {
            state.updates_since_save = 0;
            let (wa, wd) = (state.wa, state.wd);
            drop(state);
            self.persist(&wa, &wd);
        }
    }

    pub fn save(&self) {
        let state = self.state.lock().unwrap();
        let (wa, wd) = (state.wa, state.wd);
        drop(state);
        self.persist(&wa, &wd);
    }

    fn persist(&self, wa: &[f32; ATTACK_FEATURES], wd: &[f32; DEFENSE_FEATURES]) {
        let mut entries: Vec<(&str, f32)> =
            ATTACK_KEYS.iter().copied().zip(wa.iter().copied()).collect();
        entries.extend(DEFENSE_KEYS.iter().copied().zip(wd.iter().copied()));
        self.store.save("Learned off-ball positioning weights", &entries);
    }

    pub fn attack_weights(&self) -> [f32; ATTACK_FEATURES] {
        self.state.lock().unwrap().wa
    }

    pub fn defense_weights(&self) -> [f32; DEFENSE_FEATURES] {
        self.state.lock().unwrap().wd
    }
}

/// Attack features for a candidate point, clamped per-entry.
pub fn attack_features(
    world: &World,
    this: &Robot,
    p: Point,
    sign: TeamSign,
) -> [f32; ATTACK_FEATURES] {
    let ball = &world.ball;
    let opps = world.opponents(sign);
    let mates = world.mates(sign);

    let forward = (p.0 - ball.pos.0) * sign as f32;
    let open = nearest_robot_distance(opps, p);
    let lane = lane_clearance(ball.pos, p, opps);
    let d = dist(p, ball.pos);
    let range = 1.0 - (d - 2.0).abs() / 2.0;
    let central = 1.0 - (p.1.abs() / (field::HALF_WIDTH_M + 1e-9)).min(1.0);
    let mate_min = nearest_robot_distance_excluding(mates, p, this.id);

    let mut f = [0.0; ATTACK_FEATURES];
    f[A_FORWARD] = (forward / 3.5).clamp(-1.0, 1.0);
    f[A_OPEN] = (open / 2.5).clamp(0.0, 1.5);
    f[A_LANE] = (lane / 1.0).clamp(0.0, 1.5);
    f[A_RANGE] = range.clamp(-0.3, 1.0);
    f[A_CENTRAL] = central.clamp(0.0, 1.0);
    f[A_TEAMSPACE] = (mate_min / 1.4).clamp(0.0, 1.5);
    f
}

/// Defense features for a candidate point (lane-cut switches to the mark
/// when one is assigned).
pub fn defense_features(
    world: &World,
    this: &Robot,
    p: Point,
    sign: TeamSign,
    mark: Option<Point>,
) -> [f32; DEFENSE_FEATURES] {
    let ball = &world.ball;
    let sf = sign as f32;
    let our_goal_x = -sf * field::HALF_LENGTH_M;

    // Goalside: closer to our goal than the ball is.
    let ball_to_goal = (ball.pos.0 - our_goal_x).abs();
    let point_to_goal = (p.0 - our_goal_x).abs();
    let goalside = ((ball_to_goal - point_to_goal) / 2.0).clamp(-1.0, 1.0);

    // Line hold: band 2..5m from our goal depending on ball depth.
    let desired = (1.9 + 0.35 * ball_to_goal).clamp(2.0, 5.2);
    let line_hold = (-(point_to_goal - desired).abs() / 3.0).clamp(-1.2, 0.0);

    // Lane cut to the mark (or the most advanced opponent).
    let cut = match mark {
        Some(m) => {
            let c = closest_point_on_segment(ball.pos, m, p);
            -(dist(p, c) / 2.0).clamp(0.0, 1.0)
        }
        None => match most_advanced_opponent(world, sign) {
            Some(t) => {
                let c = closest_point_on_segment(ball.pos, t.pos, p);
                -(dist(p, c) / 2.4).clamp(0.0, 1.0)
            }
            None => 0.0,
        },
    };

    // Mark distance preference: 0.8..1.8m from the mark.
    let mark_dist = match mark {
        Some(m) => {
            let err = (dist(p, m) - 1.25).abs();
            -((err - 0.70) / 1.2).clamp(0.0, 1.0)
        }
        None => 0.0,
    };

    // Move cost (prefer smoother relocations).
    let mv = -dist(p, this.pos) / 4.0;

    let mut f = [0.0; DEFENSE_FEATURES];
    f[D_GOALSIDE] = goalside;
    f[D_LINEHOLD] = line_hold;
    f[D_LANECUT] = cut;
    f[D_MARKDIST] = mark_dist;
    f[D_MOVE] = mv;
    f
}

fn dot(w: &[f32; ATTACK_FEATURES], f: &[f32; ATTACK_FEATURES]) -> f32 {
    w.iter().zip(f.iter()).map(|(a, b)| a * b).sum()
}

fn dot5(w: &[f32; DEFENSE_FEATURES], f: &[f32; DEFENSE_FEATURES]) -> f32 {
    w.iter().zip(f.iter()).map(|(a, b)| a * b).sum()
}
