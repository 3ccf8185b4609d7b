//! Fixed-timestep match engine
//!
//! One tick = drain external requests -> assign marks -> decide blue (true
//! frame) -> decide red (mirrored frame) -> apply commands -> integrate
//! ball -> resolve collisions -> resolve possession -> resolve pending
//! rewards -> break stuck contests -> publish snapshot. Single logical
//! thread; every time window is measured against the accumulated sim
//! clock, checked once per tick.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::config::EngineConfig;
use super::coordinates::{mirror_point, mirror_world, unmirror_command};
use super::decision::{self, assign_marks, RoleState};
use super::learning::Learning;
use super::physics;
use super::possession::{PossessionEvent, PossessionState};
use super::rewards::OutcomeTracker;
use super::snapshot::{DebugOverlay, Score, WorldSnapshot};
use super::stuck::StuckBreaker;
use super::world::{Point, RobotId, World};

/// Which goal a debug ball placement targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeamSide {
    Blue,
    Red,
}

/// Discrete requests from the presentation shell, applied atomically at
/// tick boundaries (never mid-tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalRequest {
    ToggleRunning,
    ResetKickoff,
    /// Place the ball at rest just in front of the chosen goalkeeper's goal
    PlaceBallNearGoalkeeper(TeamSide),
}

pub struct MatchEngine {
    config: EngineConfig,
    world: World,
    learning: Learning,
    tracker: OutcomeTracker,
    possession: PossessionState,
    stuck: StuckBreaker,
    blue_roles: RoleState,
    red_roles: RoleState,
    rng: ChaCha8Rng,
    score: Score,
    running: bool,
    requests: Mutex<Vec<ExternalRequest>>,
    sim_time: f64,
    tick_count: u64,
    snapshot: WorldSnapshot,
}

impl MatchEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_learning(config, Learning::in_memory())
    }

    /// Engine with file-backed learning state under `dir`.
    pub fn with_weights_dir(config: EngineConfig, dir: &Path) -> Self {
        Self::with_learning(config, Learning::with_weights_dir(dir))
    }

    fn with_learning(config: EngineConfig, learning: Learning) -> Self {
        let mut world = World::default();
        world.reset_kickoff();
        let stuck = StuckBreaker::new(world.ball.pos);
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let snapshot = WorldSnapshot::capture(
            &world,
            0,
            0.0,
            true,
            Score::default(),
            DebugOverlay::default(),
        );
        Self {
            config,
            world,
            learning,
            tracker: OutcomeTracker::new(),
            possession: PossessionState::new(),
            stuck,
            blue_roles: RoleState::new(),
            red_roles: RoleState::new(),
            rng,
            score: Score::default(),
            running: true,
            requests: Mutex::new(Vec::new()),
            sim_time: 0.0,
            tick_count: 0,
            snapshot,
        }
    }

    /// Queue an external request; it takes effect at the next tick boundary.
    pub fn post(&self, request: ExternalRequest) {
        self.requests.lock().unwrap().push(request);
    }

    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn possession(&self) -> &PossessionState {
        &self.possession
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Flush learned weights (the learners also flush on their own cadence).
    pub fn save_learning(&self) {
        self.learning.save_all();
    }

    /// Advance the simulation by one fixed step.
    pub fn tick(&mut self) {
        self.drain_requests();

        if !self.running {
            self.publish_snapshot(DebugOverlay::default());
            return;
        }

        let dt = self.config.dt;
        let now = self.sim_time;
        let owner = self.possession.owner().map(|o| (o.id, o.team));

        // Marking assignments for whichever teams are defending, computed
        // in the true frame.
        let blue_marks: HashMap<RobotId, Point> = if !self.world.is_attacking(1) {
            assign_marks(&self.world, 1, owner)
        } else {
            HashMap::new()
        };
        let red_marks_true: HashMap<RobotId, Point> = if !self.world.is_attacking(-1) {
            assign_marks(&self.world, -1, owner)
        } else {
            HashMap::new()
        };

        // --- Blue: decide and apply in the true frame ---
        let blue_out = decision::decide_team(
            &self.world,
            &mut self.blue_roles,
            &blue_marks,
            owner,
            1,
            &self.learning,
            &mut self.tracker,
            &mut self.rng,
            now,
        );
        for (idx, cmd) in blue_out.commands.iter().enumerate() {
            physics::apply_command(
                &mut self.world,
                1,
                idx,
                cmd,
                dt,
                &mut self.possession,
                &self.config.possession,
                &mut self.tracker,
                &self.learning,
                now,
            );
        }

        // --- Red: decide in the mirrored frame, apply unmirrored ---
        let red_frame_marks: HashMap<RobotId, Point> =
            red_marks_true.iter().map(|(id, p)| (*id, mirror_point(*p))).collect();
        let mirrored = mirror_world(&self.world);
        let red_out = decision::decide_team(
            &mirrored,
            &mut self.red_roles,
            &red_frame_marks,
            owner,
            -1,
            &self.learning,
            &mut self.tracker,
            &mut self.rng,
            now,
        );
        for (idx, cmd) in red_out.commands.iter().enumerate() {
            let true_cmd = unmirror_command(cmd);
            physics::apply_command(
                &mut self.world,
                -1,
                idx,
                &true_cmd,
                dt,
                &mut self.possession,
                &self.config.possession,
                &mut self.tracker,
                &self.learning,
                now,
            );
        }

        // --- Physics ---
        if let Some(scoring_team) = physics::integrate_ball(&mut self.world, dt) {
            self.on_goal(scoring_team);
            return;
        }

        let owner_now = self.possession.owner().map(|o| (o.id, o.team));
        physics::resolve_ball_robot_collisions(&mut self.world, owner_now);
        physics::resolve_robot_robot_collisions(&mut self.world);

        // --- Possession ---
        let events = self.possession.update(
            &mut self.world,
            &self.config.possession,
            &self.config.goalkeeper,
            now,
        );
        for event in events {
            match event {
                PossessionEvent::Gained { id, team, stolen_from } => {
                    log::debug!("possession: robot {id} (team {team}) trapped the ball");
                    self.tracker.on_possession_gained(
                        &self.world,
                        id,
                        team,
                        self.world.ball.pos.0,
                        now,
                        &self.learning,
                    );
                    if let Some(lost_team) = stolen_from {
                        self.tracker.on_turnover(
                            &self.world,
                            lost_team,
                            team,
                            now,
                            &self.learning,
                        );
                    }
                }
                PossessionEvent::GkDistributed { team, receiver } => {
                    log::debug!("goalkeeper distribution (team {team}) -> {receiver:?}");
                }
            }
        }

        // --- Pending-outcome expiry ---
        let owner_team = self.possession.owner().map(|o| o.team);
        self.tracker.expire_pending(
            owner_team,
            self.world.ball.pos.0,
            now,
            &self.learning,
        );

        // --- Stuck-contest recovery ---
        if let Some(outcome) =
            self.stuck
                .update(&mut self.world, &mut self.possession, &self.config.stuck, now)
        {
            log::debug!("stuck contest broken: {outcome:?}");
        }

        self.sim_time += dt as f64;
        self.tick_count += 1;

        // --- Publish ---
        let mut debug = DebugOverlay {
            team_targets: [
                blue_out.debug_target,
                red_out.debug_target.map(mirror_point),
            ],
            planned_targets: blue_out.planned_targets,
            mark_targets: blue_marks,
        };
        for (id, p) in red_out.planned_targets {
            debug.planned_targets.insert(id, mirror_point(p));
        }
        for (id, p) in red_marks_true {
            debug.mark_targets.insert(id, p);
        }
        self.publish_snapshot(debug);
    }

    fn on_goal(&mut self, scoring_team: i8) {
        if scoring_team > 0 {
            self.score.blue += 1;
        } else {
            self.score.red += 1;
        }
        log::info!(
            "GOAL! team {scoring_team} scores; blue {} - red {}",
            self.score.blue,
            self.score.red
        );

        // Reward while the shapes that produced the goal still exist.
        self.tracker
            .on_goal(&self.world, scoring_team, self.sim_time, &self.learning);

        self.reset_play();
        self.sim_time += self.config.dt as f64;
        self.tick_count += 1;
        self.publish_snapshot(DebugOverlay::default());
    }

    fn reset_play(&mut self) {
        self.world.reset_kickoff();
        self.possession.reset();
        self.tracker.reset();
        self.blue_roles.clear();
        self.red_roles.clear();
        self.stuck.reset(self.world.ball.pos);
    }

    fn drain_requests(&mut self) {
        let requests: Vec<ExternalRequest> = {
            let mut queue = self.requests.lock().unwrap();
            std::mem::take(&mut *queue)
        };
        for request in requests {
            match request {
                ExternalRequest::ToggleRunning => {
                    self.running = !self.running;
                    log::info!("running = {}", self.running);
                }
                ExternalRequest::ResetKickoff => {
                    self.reset_play();
                    log::info!("reset to kickoff");
                }
                ExternalRequest::PlaceBallNearGoalkeeper(side) => {
                    let hl = super::physics_constants::field::HALF_LENGTH_M;
                    let x = match side {
                        TeamSide::Blue => -hl + 0.75,
                        TeamSide::Red => hl - 0.75,
                    };
                    self.world.ball.place((x, 0.0));
                    self.possession.reset();
                    self.stuck.reset(self.world.ball.pos);
                    log::info!("ball placed near {side:?} goalkeeper");
                }
            }
        }
    }

    fn publish_snapshot(&mut self, debug: DebugOverlay) {
        self.snapshot = WorldSnapshot::capture(
            &self.world,
            self.tick_count,
            self.sim_time,
            self.running,
            self.score,
            debug,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics_constants::field;
    use crate::engine::world::{GK_BLUE, GK_RED};

    fn engine() -> MatchEngine {
        MatchEngine::new(EngineConfig::default())
    }

    #[test]
    fn test_tick_advances_time_and_publishes() {
        let mut e = engine();
        e.tick();
        assert_eq!(e.snapshot().tick, 1);
        assert!(e.sim_time() > 0.0);
        assert_eq!(e.snapshot().blue.len(), 6);
    }

    #[test]
    fn test_pause_freezes_world() {
        let mut e = engine();
        e.post(ExternalRequest::ToggleRunning);
        let before = e.world().ball.pos;
        for _ in 0..10 {
            e.tick();
        }
        assert!(!e.is_running());
        assert_eq!(e.world().ball.pos, before);
        // Resume works.
        e.post(ExternalRequest::ToggleRunning);
        e.tick();
        assert!(e.is_running());
    }

    #[test]
    fn test_reset_request_restores_kickoff() {
        let mut e = engine();
        for _ in 0..120 {
            e.tick();
        }
        e.post(ExternalRequest::ResetKickoff);
        e.tick();
        // Ball back at (or carried within a step of) the center spot.
        let b = e.world().ball.pos;
        assert!(b.0.abs() < 0.5 && b.1.abs() < 0.5, "ball near center after reset, got {b:?}");
    }

    #[test]
    fn test_possession_invariant_over_many_ticks() {
        let mut e = engine();
        for _ in 0..600 {
            e.tick();
            // At most one owner, and the owner must exist on its roster.
            if let Some(owner) = e.possession().owner() {
                assert!(e.world().find_robot(owner.id, owner.team).is_some());
            }
            // Ball stays inside the field.
            let b = e.world().ball.pos;
            assert!(b.0.abs() <= field::HALF_LENGTH_M + 1e-4);
            assert!(b.1.abs() <= field::HALF_WIDTH_M + 1e-4);
        }
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let mut a = MatchEngine::new(EngineConfig { seed: 9, ..EngineConfig::default() });
        let mut b = MatchEngine::new(EngineConfig { seed: 9, ..EngineConfig::default() });
        for _ in 0..240 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.world().ball.pos, b.world().ball.pos);
        for (ra, rb) in a.world().our_robots.iter().zip(b.world().our_robots.iter()) {
            assert_eq!(ra.pos, rb.pos);
        }
        assert_eq!(a.score().blue, b.score().blue);
    }

    #[test]
    fn test_goalkeeper_catch_hold_and_distribute() {
        let mut e = engine();
        e.post(ExternalRequest::PlaceBallNearGoalkeeper(TeamSide::Blue));

        // Let the keeper reach and trap the ball.
        let mut held_at = None;
        for _ in 0..600 {
            e.tick();
            if e.possession().owner().map(|o| o.id) == Some(GK_BLUE) {
                held_at = Some(e.sim_time());
                break;
            }
        }
        let held_at = held_at.expect("blue goalkeeper must trap the placed ball");
        let deadline = e
            .possession()
            .gk_hold_deadline()
            .expect("hold window must be set on keeper pickup");
        assert!(deadline > held_at);

        // Within the hold window (minus the pass lead) the keeper must
        // distribute: ownership releases and the ball really travels.
        let hold = e.config.goalkeeper.hold_duration_s;
        let max_ticks = (hold / e.config.dt as f64).ceil() as usize + 10;
        let mut distributed = false;
        for _ in 0..max_ticks {
            e.tick();
            let gk_owns = e.possession().owner().map(|o| o.id) == Some(GK_BLUE);
            if !gk_owns && e.world().ball.speed() > 1.0 {
                distributed = true;
                break;
            }
        }
        assert!(distributed, "keeper must pass before the hold window closes");
    }

    #[test]
    fn test_goal_resets_and_scores() {
        let mut e = engine();
        // Fire the ball straight into the red goal.
        e.world.ball.pos = (field::HALF_LENGTH_M - 0.2, 0.0);
        e.world.ball.vel = (6.0, 0.0);
        // Keep robots away so nothing intercepts.
        for r in e.world.our_robots.iter_mut().chain(e.world.opp_robots.iter_mut()) {
            r.pos.1 = -2.5;
        }
        let mut scored = false;
        for _ in 0..10 {
            e.tick();
            if e.score().blue == 1 {
                scored = true;
                break;
            }
        }
        assert!(scored, "crossing the goal mouth must score exactly once");
        assert_eq!(e.score().red, 0);
        let b = e.world().ball;
        assert!(b.pos.0.abs() < 0.5, "ball resets to the center spot");
    }

    #[test]
    fn test_snapshot_mark_targets_true_frame() {
        let mut e = engine();
        // Ball deep in red's half: red defends, so red back-line robots
        // should carry marks in the snapshot.
        e.world.ball.pos = (2.5, 0.0);
        e.tick();
        let marks = &e.snapshot().debug.mark_targets;
        assert!(
            marks.keys().any(|id| (11..=13).contains(id)),
            "red back line should be marking, got {marks:?}"
        );
        // Mark positions must be inside the field in true-frame coordinates.
        for p in marks.values() {
            assert!(p.0.abs() <= field::HALF_LENGTH_M);
            assert!(p.1.abs() <= field::HALF_WIDTH_M);
        }
    }

    #[test]
    fn test_red_goalkeeper_symmetric_catch() {
        let mut e = engine();
        e.post(ExternalRequest::PlaceBallNearGoalkeeper(TeamSide::Red));
        let mut caught = false;
        for _ in 0..600 {
            e.tick();
            if e.possession().owner().map(|o| o.id) == Some(GK_RED) {
                caught = true;
                break;
            }
        }
        assert!(caught, "mirrored logic must let the red keeper trap the placed ball too");
    }
}
