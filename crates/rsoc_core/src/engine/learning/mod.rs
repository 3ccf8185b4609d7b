//! Online reward-driven learning modules
//!
//! Three independent learners share one pattern: a fixed-size clamped
//! feature vector, a dot-product score (the action module adds a logistic
//! squash), and a single-sample online update
//!
//! `w_i += lr * (reward * gradient_term_i * f_i - l2 * w_i)`
//!
//! with the reward clamped before use. Weights are flushed to a flat
//! key=value store every few updates, not every tick.
//!
//! Learners are explicit objects constructed once at startup and passed
//! into the decision layer; each guards its weight vector with a mutex so
//! scoring and reward application share one exclusion boundary.

pub mod action;
pub mod pass;
pub mod position;
pub mod store;

pub use action::{ActionLearner, ACTION_FEATURES};
pub use pass::{PassLearner, ScoredPass, PASS_FEATURES};
pub use position::{PositionLearner, ATTACK_FEATURES, DEFENSE_FEATURES};
pub use store::WeightStore;

use std::path::Path;

/// Rewards are clamped to this magnitude before any update.
pub const REWARD_CLAMP: f32 = 2.0;

/// The three learners bundled for the decision layer.
pub struct Learning {
    pub pass: PassLearner,
    pub action: ActionLearner,
    pub position: PositionLearner,
}

impl Learning {
    /// File-backed learners: one key=value file per module inside `dir`.
    pub fn with_weights_dir(dir: &Path) -> Self {
        Self {
            pass: PassLearner::new(WeightStore::new(dir.join("pass-weights.properties"))),
            action: ActionLearner::new(WeightStore::new(dir.join("action-weights.properties"))),
            position: PositionLearner::new(WeightStore::new(
                dir.join("position-weights.properties"),
            )),
        }
    }

    /// In-memory learners (tests, embedded use without persistence).
    pub fn in_memory() -> Self {
        Self {
            pass: PassLearner::new(WeightStore::disabled()),
            action: ActionLearner::new(WeightStore::disabled()),
            position: PositionLearner::new(WeightStore::disabled()),
        }
    }

    /// Force-flush all modules (normally they flush on their own cadence).
    pub fn save_all(&self) {
        self.pass.save();
        self.action.save();
        self.position.save();
    }
}
