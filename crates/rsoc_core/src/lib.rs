//! # rsoc_core - deterministic 6v6 robot soccer simulation engine
//!
//! A fixed-timestep (60 Hz) multi-agent decision and physics engine for a
//! simplified robot soccer match: grid-based position scoring, role
//! assignment with marking and rest-defense, a possession/dribble state
//! machine with a goalkeeper hold window, simple rigid-body ball physics,
//! and online reward-driven learning for pass, shoot-vs-pass and off-ball
//! positioning decisions.
//!
//! ## Features
//! - Deterministic: same seed and same request stream, same match
//! - Single-threaded cooperative tick loop; no background timers
//! - Typed read-only snapshots for a presentation shell (no drawing here)
//! - Best-effort flat-file persistence of learned weights
//!
//! ```no_run
//! use rsoc_core::engine::{EngineConfig, ExternalRequest, MatchEngine, TeamSide};
//!
//! let mut engine = MatchEngine::new(EngineConfig::default());
//! engine.post(ExternalRequest::PlaceBallNearGoalkeeper(TeamSide::Blue));
//! for _ in 0..600 {
//!     engine.tick();
//! }
//! let snapshot = engine.snapshot();
//! println!("score {}:{}", snapshot.score.blue, snapshot.score.red);
//! ```

pub mod engine;
pub mod error;

pub use engine::{
    Ball, Command, EngineConfig, ExternalRequest, MatchEngine, Point, Robot, RobotId, Score,
    TeamSide, TeamSign, World, WorldSnapshot,
};
pub use error::{Result, StoreError};
