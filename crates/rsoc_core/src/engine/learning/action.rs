//! Online learning for the shoot-vs-pass decision
//!
//! Models `P(shoot) = sigmoid(w . f)` and updates with a logistic /
//! policy-gradient style rule:
//!
//! `w_i += lr * (r * (a - p) * f_i - l2 * w_i)`  (a = 1 shoot, 0 pass)
//!
//! Selection mixes in a small epsilon-greedy exploration rate. The RNG is
//! owned by the engine and passed in, so a fixed seed replays the match.

use std::sync::Mutex;

use rand::Rng;

use super::pass::PassLearner;
use super::store::WeightStore;
use super::REWARD_CLAMP;
use crate::engine::geometry::{dist, segment_blocked};
use crate::engine::physics_constants::field;
use crate::engine::world::{Robot, RobotId, TeamSign, World};

const LR: f32 = 0.06;
const L2: f32 = 0.002;
const SAVE_EVERY: u32 = 12;

pub const ACTION_FEATURES: usize = 6;

const F_IN_SHOOT_ZONE: usize = 0;
const F_GOAL_LANE: usize = 1;
const F_DIST_TO_GOAL: usize = 2;
const F_BALL_X_ATTACK: usize = 3;
const F_BEST_PASS_SCORE: usize = 4;
const F_SAFE_PASS_COUNT: usize = 5;

const KEYS: [&str; ACTION_FEATURES] = [
    "w.in_shoot_zone",
    "w.goal_lane",
    "w.dist_to_goal",
    "w.ball_x_attack",
    "w.best_pass_score",
    "w.safe_pass_count",
];

/// Conservative defaults: shoot more in good zones with a clear lane, less
/// when a good pass exists.
const DEFAULTS: [f32; ACTION_FEATURES] = [0.85, 0.90, -0.35, 0.20, -0.55, -0.25];

/// Pass segments are considered unsafe when an opponent sits this close.
const PASS_LANE_DANGER_M: f32 = 0.30;

struct ActionState {
    w: [f32; ACTION_FEATURES],
    updates_since_save: u32,
}

/// Shoot-vs-pass learner. Weight access funnels through one mutex.
pub struct ActionLearner {
    store: WeightStore,
    state: Mutex<ActionState>,
}

impl ActionLearner {
    pub fn new(store: WeightStore) -> Self {
        let map = store.load();
        let mut w = DEFAULTS;
        for (i, key) in KEYS.iter().enumerate() {
            w[i] = WeightStore::get_or(&map, key, w[i]);
        }
        Self { store, state: Mutex::new(ActionState { w, updates_since_save: 0 }) }
    }

    /// Decision features for the current holder. `None` when the passer id
    /// is not on the roster.
    pub fn features(
        &self,
        world: &World,
        sign: TeamSign,
        passer_id: RobotId,
        pass: &PassLearner,
    ) -> Option<[f32; ACTION_FEATURES]> {
        let passer = world.find_robot(passer_id, sign)?;
        let ball = &world.ball;
        let sf = sign as f32;
        let half_l = field::HALF_LENGTH_M;

        let ball_x_attack = ball.pos.0 * sf;

        // Shoot zone: roughly the final 30% of the field.
        let in_shoot_zone = ball_x_attack > half_l * 0.30;

        let goal = (sf * half_l, 0.0);
        let goal_lane_safe =
            !segment_blocked(ball.pos, goal, world.opponents(sign), PASS_LANE_DANGER_M);

        let dist_to_goal = dist(ball.pos, goal);

        // How good is the best available pass by the learned receiver score?
        let best_pass_score = pass
            .pick_best_receiver(passer, world, sign, 0.75, 4.2)
            .map_or(-1.0, |sp| sp.score);

        let safe_count = count_safe_passes(passer, world, sign);

        let mut f = [0.0; ACTION_FEATURES];
        f[F_IN_SHOOT_ZONE] = if in_shoot_zone { 1.0 } else { 0.0 };
        f[F_GOAL_LANE] = if goal_lane_safe { 1.0 } else { 0.0 };
        f[F_DIST_TO_GOAL] = (dist_to_goal / (half_l * 2.0)).clamp(0.0, 1.2);
        f[F_BALL_X_ATTACK] = (ball_x_attack / half_l).clamp(-1.0, 1.0);
        f[F_BEST_PASS_SCORE] = (best_pass_score / 4.0).clamp(-1.0, 1.0);
        f[F_SAFE_PASS_COUNT] = (safe_count as f32 / 4.0).clamp(0.0, 1.2);
        Some(f)
    }

    /// Epsilon-greedy draw from the learned policy.
    pub fn choose_shoot<R: Rng>(
        &self,
        features: &[f32; ACTION_FEATURES],
        epsilon: f32,
        rng: &mut R,
    ) -> bool {
        let w = self.state.lock().unwrap().w;
        let p = sigmoid(dot(&w, features));

        if rng.gen::<f32>() < epsilon {
            return rng.gen::<f32>() < 0.5;
        }
        rng.gen::<f32>() < p
    }

    /// Predicted P(shoot) for the given features (no exploration).
    pub fn shoot_probability(&self, features: &[f32; ACTION_FEATURES]) -> f32 {
        let w = self.state.lock().unwrap().w;
        sigmoid(dot(&w, features))
    }

    pub fn apply_reward(&self, action_shoot: bool, reward: f32, features: &[f32; ACTION_FEATURES]) {
        let r = reward.clamp(-REWARD_CLAMP, REWARD_CLAMP);
        let mut state = self.state.lock().unwrap();
        let p = sigmoid(dot(&state.w, features));
        let a = if action_shoot { 1.0 } else { 0.0 };
        let g = a - p;
        for i in 0..ACTION_FEATURES {
            state.w[i] += LR * (r * g * features[i] - L2 * state.w[i]);
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
        let w = self.state.lock().unwrap().w;
        self.persist(&w);
    }

    fn persist(&self, w: &[f32; ACTION_FEATURES]) {
        let entries: Vec<(&str, f32)> = KEYS.iter().copied().zip(w.iter().copied()).collect();
        self.store.save("Learned shoot vs pass weights", &entries);
    }

    pub fn weights(&self) -> [f32; ACTION_FEATURES] {
        self.state.lock().unwrap().w
    }
}

/// Count teammates in a passable band with an unblocked lane.
fn count_safe_passes(passer: &Robot, world: &World, sign: TeamSign) -> u32 {
    let ball = world.ball.pos;
    let opps = world.opponents(sign);
    let mut count = 0;
    for r in world.mates(sign) {
        if r.id == passer.id {
            continue;
        }
        let d = dist(r.pos, ball);
        if !(0.75..=4.2).contains(&d) {
            continue;
        }
        if segment_blocked(ball, r.pos, opps, PASS_LANE_DANGER_M) {
            continue;
        }
        count += 1;
    }
    count
}

fn dot(w: &[f32; ACTION_FEATURES], f: &[f32; ACTION_FEATURES]) -> f32 {
    w.iter().zip(f.iter()).map(|(a, b)| a * b).sum()
}

/// Numerically-stable logistic function.
fn sigmoid(z: f32) -> f32 {
    if z >= 0.0 {
        let ez = (-z).exp();
        1.0 / (1.0 + ez)
    } else {
        let ez = z.exp();
        ez / (1.0 + ez)
    }
}
