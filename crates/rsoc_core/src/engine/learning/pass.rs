//! Online learning for pass-receiver selection
//!
//! A small linear model, no external ML machinery:
//! - score = w . features
//! - update: `w_i += lr * (r * f_i - l2 * w_i)`
//!
//! Rewards come from the outcome tracker when a tagged pass resolves.
//! Light L2 plus the reward clamp keep the weights bounded over time.

use std::sync::Mutex;

use super::store::WeightStore;
use super::REWARD_CLAMP;
use crate::engine::geometry::{dist, lane_clearance, nearest_robot_distance};
use crate::engine::physics_constants::field;
use crate::engine::world::{Point, Robot, RobotId, TeamSign, World};

const LR: f32 = 0.06;
const L2: f32 = 0.002;
const SAVE_EVERY: u32 = 12;

pub const PASS_FEATURES: usize = 5;

const F_FORWARD: usize = 0;
const F_OPENNESS: usize = 1;
const F_LANE: usize = 2;
const F_RANGE: usize = 3;
const F_CENTRAL: usize = 4;

/// Stable keys for the persisted mapping, index-aligned with the features.
const KEYS: [&str; PASS_FEATURES] = ["w.forward", "w.openness", "w.lane", "w.range", "w.central"];

/// Defaults: pass forward, to open receivers, through clear lanes, at medium
/// range, preferring central targets.
const DEFAULTS: [f32; PASS_FEATURES] = [0.55, 0.85, 0.95, 0.40, 0.25];

/// A receiver candidate scored by the learned model.
#[derive(Clone, Copy, Debug)]
pub struct ScoredPass {
    pub receiver_id: RobotId,
    pub receiver_pos: Point,
    pub score: f32,
    pub features: [f32; PASS_FEATURES],
}

struct PassState {
    w: [f32; PASS_FEATURES],
    updates_since_save: u32,
}

/// Pass-selection learner. All weight access funnels through one mutex so
/// decision-time scoring and reward application stay safe even if a future
/// version parallelizes per-agent decisions.
pub struct PassLearner {
    store: WeightStore,
    state: Mutex<PassState>,
}

impl PassLearner {
    pub fn new(store: WeightStore) -> Self {
        let map = store.load();
        let mut w = DEFAULTS;
        for (i, key) in KEYS.iter().enumerate() {
            w[i] = WeightStore::get_or(&map, key, w[i]);
        }
        Self { store, state: Mutex::new(PassState { w, updates_since_save: 0 }) }
    }

    /// Choose the best receiver among teammates within a ball-distance band.
    /// Callers still gate by their own safety checks (lane, openness).
    pub fn pick_best_receiver(
        &self,
        passer: &Robot,
        world: &World,
        sign: TeamSign,
        min_dist: f32,
        max_dist: f32,
    ) -> Option<ScoredPass> {
        let ball = world.ball.pos;
        let w = self.weights();

        let mut best: Option<ScoredPass> = None;
        for r in world.mates(sign) {
            if r.id == passer.id {
                continue;
            }
            let d = dist(r.pos, ball);
            if d < min_dist || d > max_dist {
                continue;
            }
            let f = compute_features(ball, sign, r, world.opponents(sign));
            let s = dot(&w, &f);
            if best.map_or(true, |b| s > b.score) {
                best = Some(ScoredPass {
                    receiver_id: r.id,
                    receiver_pos: r.pos,
                    score: s,
                    features: f,
                });
            }
        }
        best
    }

    /// Feature vector the scorer would use for a specific receiver id.
    /// `None` when the receiver is not on the roster.
    pub fn features_for_receiver(
        &self,
        world: &World,
        sign: TeamSign,
        receiver_id: RobotId,
    ) -> Option<[f32; PASS_FEATURES]> {
        let recv = world.find_robot(receiver_id, sign)?;
        Some(compute_features(world.ball.pos, sign, recv, world.opponents(sign)))
    }

    pub fn apply_reward(&self, reward: f32, features: &[f32; PASS_FEATURES]) {
        let r = reward.clamp(-REWARD_CLAMP, REWARD_CLAMP);
        let mut state = self.state.lock().unwrap();
        for i in 0..PASS_FEATURES {
            state.w[i] += LR * (r * features[i] - L2 * state.w[i]);
        }
        state.updates_since_save += 1;
        if state.updates_since_save >= SAVE_EVERY {
            state.updates_since_save = 0;
            let w = state.w;
            drop(state);
            self.persist(&w);
        }
    }

    pub fn save(&self) {
        let w = self.weights();
        self.persist(&w);
    }

    fn persist(&self, w: &[f32; PASS_FEATURES]) {
        let entries: Vec<(&str, f32)> = KEYS.iter().copied().zip(w.iter().copied()).collect();
        self.store.save("Learned pass scoring weights", &entries);
    }

    pub fn weights(&self) -> [f32; PASS_FEATURES] {
        self.state.lock().unwrap().w
    }
}

/// Feature vector for passing `ball -> receiver`, every entry clamped to a
/// bounded range so single gradient steps stay stable.
fn compute_features(
    ball: Point,
    sign: TeamSign,
    receiver: &Robot,
    opps: &[Robot],
) -> [f32; PASS_FEATURES] {
    let mut f = [0.0; PASS_FEATURES];

    // 1) Forward progress in the attack direction
    let forward = (receiver.pos.0 - ball.0) * sign as f32;
    f[F_FORWARD] = (forward / 3.5).clamp(-1.0, 1.0);

    // 2) Receiver openness: distance to the nearest opponent
    let open = nearest_robot_distance(opps, receiver.pos);
    f[F_OPENNESS] = (open / 2.5).clamp(0.0, 1.2);

    // 3) Lane clearance: closest opponent approach to the pass segment
    let lane = lane_clearance(ball, receiver.pos, opps);
    f[F_LANE] = (lane / 1.0).clamp(0.0, 1.5);

    // 4) Range preference: peak around 2m
    let d = dist(receiver.pos, ball);
    f[F_RANGE] = (1.0 - (d - 2.0).abs() / 2.0).clamp(-0.2, 1.0);

    // 5) Centrality: keep the ball away from the touchlines
    let central = 1.0 - (receiver.pos.1.abs() / (field::HALF_WIDTH_M + 1e-9)).min(1.0);
    f[F_CENTRAL] = central.clamp(0.0, 1.0);

    f
}

fn dot(w: &[f32; PASS_FEATURES], f: &[f32; PASS_FEATURES]) -> f32 {
    w.iter().zip(f.iter()).map(|(a, b)| a * b).sum()
}
