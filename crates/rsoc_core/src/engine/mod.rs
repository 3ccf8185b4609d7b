pub mod behaviors;
pub mod config;
pub mod coordinates;
pub mod decision;
pub mod geometry;
pub mod learning;
pub mod match_loop;
pub mod physics;
pub mod physics_constants;
pub mod possession;
pub mod rewards;
pub mod score_grid;
pub mod scorers;
pub mod snapshot;
pub mod steering;
pub mod stuck;
pub mod world;

pub use config::{EngineConfig, GoalkeeperConfig, PossessionConfig, StuckConfig};
pub use match_loop::{ExternalRequest, MatchEngine, TeamSide};
pub use snapshot::{BallSnapshot, DebugOverlay, RobotSnapshot, Score, WorldSnapshot};
pub use world::{Ball, Command, Point, Robot, RobotId, TeamSign, World};
