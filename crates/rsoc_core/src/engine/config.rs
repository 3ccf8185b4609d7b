//! Tunable engine parameters
//!
//! The possession radii, goalkeeper hold window and stuck-contest
//! thresholds are empirically tuned values with no derivation; they live
//! here as configuration (with the tuned defaults) instead of buried
//! constants so experiments don't require rebuilds.

use serde::{Deserialize, Serialize};

use super::physics_constants::{robot, tick};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PossessionConfig {
    /// Attach radius: robot must be this close to trap the ball
    pub control_dist_m: f32,
    /// Ball must be slower than this to be trapped
    pub attach_max_speed_mps: f32,
    /// Release radius: owner drifting past this loses the ball
    pub detach_dist_m: f32,
    /// Carried ball sits this far in front of the owner
    pub carry_offset_m: f32,
    /// Pickup ban after a failed steal attempt
    pub failed_steal_ban_s: f64,
    /// Pickup ban for the loser after a successful steal
    pub steal_loser_ban_s: f64,
    /// A pickup this soon after a loss counts as a steal
    pub steal_window_s: f64,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            control_dist_m: robot::RADIUS_M + 0.035,
            attach_max_speed_mps: 0.85,
            detach_dist_m: robot::RADIUS_M + 0.10,
            carry_offset_m: robot::RADIUS_M + 0.012,
            failed_steal_ban_s: 0.8,
            steal_loser_ban_s: 1.0,
            steal_window_s: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GoalkeeperConfig {
    /// Protected hold window after the keeper traps the ball
    pub hold_duration_s: f64,
    /// Forced distribution fires this long before the window closes
    pub pass_lead_s: f64,
    /// Distribution pass speed
    pub pass_speed_mps: f32,
    /// Fallback clear speed when no receiver is available
    pub clear_speed_mps: f32,
}

impl Default for GoalkeeperConfig {
    fn default() -> Self {
        Self { hold_duration_s: 2.0, pass_lead_s: 0.35, pass_speed_mps: 4.1, clear_speed_mps: 4.4 }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StuckConfig {
    /// Per-tick ball displacement below this reads as "not moving"
    pub move_eps_m: f32,
    /// The stall must persist this long before the breaker fires
    pub persistence_s: f64,
    /// Both teams inside this radius makes it a true close contest
    pub contact_radius_m: f32,
    /// At least one robot inside this radius (or an owner) qualifies the
    /// stall as a contest at all
    pub near_ball_radius_m: f32,
    /// Escape nudge speed in open field
    pub nudge_speed_mps: f32,
    /// Escape nudge speed when pinned against a wall
    pub wall_nudge_speed_mps: f32,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            move_eps_m: 0.02,
            persistence_s: 0.65,
            contact_radius_m: 0.33,
            near_ball_radius_m: 0.65,
            nudge_speed_mps: 1.5,
            wall_nudge_speed_mps: 1.9,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed timestep (seconds)
    pub dt: f32,
    /// RNG seed (exploration draws); same seed + inputs = same match
    pub seed: u64,
    pub possession: PossessionConfig,
    pub goalkeeper: GoalkeeperConfig,
    pub stuck: StuckConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dt: tick::DT,
            seed: 0,
            possession: PossessionConfig::default(),
            goalkeeper: GoalkeeperConfig::default(),
            stuck: StuckConfig::default(),
        }
    }
}
