//! Physics and field constants for the 6v6 robot soccer simulation
//!
//! Tuned for a Division-B style small field (9m x 6m). Everything is in
//! meters / seconds / radians unless a suffix says otherwise.

/// Tick timing
pub mod tick {
    /// Simulation rate (Hz)
    pub const RATE_HZ: f32 = 60.0;

    /// Fixed timestep (seconds)
    pub const DT: f32 = 1.0 / RATE_HZ;
}

/// Field geometry (play area, inside the lines)
pub mod field {
    /// Goal-to-goal direction (x)
    pub const LENGTH_M: f32 = 9.0;
    /// Touchline-to-touchline direction (y)
    pub const WIDTH_M: f32 = 6.0;

    pub const HALF_LENGTH_M: f32 = LENGTH_M / 2.0;
    pub const HALF_WIDTH_M: f32 = WIDTH_M / 2.0;

    pub const CENTER_CIRCLE_RADIUS_M: f32 = 0.5;

    /// Defense area: rectangle touching the goal line
    pub const DEFENSE_AREA_DEPTH_M: f32 = 1.0;
    pub const DEFENSE_AREA_WIDTH_M: f32 = 2.0;
}

/// Goal mouth
pub mod goal {
    /// Inner width of the goal mouth
    pub const WIDTH_M: f32 = 1.0;
    pub const HALF_WIDTH_M: f32 = WIDTH_M / 2.0;
}

/// Robot body
pub mod robot {
    /// Cylindrical robot, 18cm diameter
    pub const RADIUS_M: f32 = 0.09;

    /// Command clamps applied by the physics layer
    pub const MAX_SPEED_MPS: f32 = 2.0;
    pub const MAX_OMEGA_RADPS: f32 = 6.0;

    /// Kick is only executed when the ball is within this range
    pub const KICK_RANGE_M: f32 = RADIUS_M + 0.03;

    /// Fallback kick speed when a behavior sets kick without a vector
    pub const DEFAULT_KICK_SPEED: f32 = 4.0;
}

/// Ball motion
pub mod ball {
    /// Per-tick velocity damping (crude rolling friction)
    pub const DAMPING: f32 = 0.98;

    /// Below this speed the ball is considered at rest for tests/telemetry
    pub const REST_SPEED_MPS: f32 = 0.02;

    /// Separation distance for ball-robot collision (ball radius folded in,
    /// slightly relaxed so contested touches don't constantly eject the ball)
    pub const COLLIDE_DIST_M: f32 = super::robot::RADIUS_M + 0.016;

    /// Velocity reflection factor along the contact normal
    pub const COLLIDE_RESTITUTION: f32 = 1.6;
}

/// Grid search sampling
pub mod grid {
    /// Boundary margin: robot radius plus a small pad
    pub const MARGIN_M: f32 = super::robot::RADIUS_M + 0.06;

    /// Finer sampling while attacking
    pub const ATTACK_STEP_M: f32 = 0.45;
    /// Coarser sampling while defending
    pub const DEFENSE_STEP_M: f32 = 0.55;
}

/// Numeric guards
pub mod eps {
    /// Guard before normalizing a direction vector
    pub const DIR: f32 = 1e-6;
    /// Guard for degenerate segments (squared length)
    pub const SEG2: f32 = 1e-9;
}
