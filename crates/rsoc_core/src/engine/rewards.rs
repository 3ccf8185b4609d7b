//! Deferred, windowed reward attribution
//!
//! A small outbox of pending pass / shoot-vs-pass records, resolved by
//! watching possession transitions and goal events. At most one pending
//! pass and one pending action per team (last writer wins). Expiry is
//! checked once per tick against the sim clock. This component owns no
//! weights of its own; every reward flows through the learning modules.

use std::collections::HashMap;

use super::learning::{Learning, ACTION_FEATURES, ATTACK_FEATURES, DEFENSE_FEATURES, PASS_FEATURES};
use super::world::{RobotId, TeamSign, World};

/// Pass resolution window (seconds).
const PASS_WINDOW_S: f64 = 1.25;
/// Shoot-vs-pass resolution window (seconds).
const ACTION_WINDOW_S: f64 = 1.75;
/// Off-ball position features stay attributable this long (seconds).
const POSITION_WINDOW_S: f64 = 2.0;

#[derive(Clone, Copy, Debug)]
struct PendingPass {
    from: RobotId,
    to: RobotId,
    start_x: f32,
    at: f64,
    features: [f32; PASS_FEATURES],
}

#[derive(Clone, Copy, Debug)]
struct PendingAction {
    from: RobotId,
    shoot: bool,
    pass_to: Option<RobotId>,
    start_x: f32,
    at: f64,
    features: [f32; ACTION_FEATURES],
}

#[derive(Clone, Copy, Debug, Default)]
struct PositionTrace {
    attack: Option<([f32; ATTACK_FEATURES], f64)>,
    defense: Option<([f32; DEFENSE_FEATURES], f64)>,
}

fn team_idx(sign: TeamSign) -> usize {
    if sign > 0 {
        0
    } else {
        1
    }
}

/// Pending-outcome bookkeeping for both teams.
#[derive(Default)]
pub struct OutcomeTracker {
    pending_pass: [Option<PendingPass>; 2],
    pending_action: [Option<PendingAction>; 2],
    traces: HashMap<RobotId, PositionTrace>,
}

impl OutcomeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all pending records (kickoff / goal reset). Position traces are
    /// cleared too: the shapes they describe no longer exist.
    pub fn reset(&mut self) {
        self.pending_pass = [None, None];
        self.pending_action = [None, None];
        self.traces.clear();
    }

    // ---- recording -------------------------------------------------------

    pub fn record_pass_attempt(
        &mut self,
        team: TeamSign,
        from: RobotId,
        to: RobotId,
        ball_x: f32,
        features: [f32; PASS_FEATURES],
        now: f64,
    ) {
        self.pending_pass[team_idx(team)] =
            Some(PendingPass { from, to, start_x: ball_x, at: now, features });
    }

    pub fn record_action_attempt(
        &mut self,
        team: TeamSign,
        from: RobotId,
        shoot: bool,
        pass_to: Option<RobotId>,
        ball_x: f32,
        features: [f32; ACTION_FEATURES],
        now: f64,
    ) {
        self.pending_action[team_idx(team)] =
            Some(PendingAction { from, shoot, pass_to, start_x: ball_x, at: now, features });
    }

    pub fn note_attack_position(
        &mut self,
        id: RobotId,
        features: [f32; ATTACK_FEATURES],
        now: f64,
    ) {
        self.traces.entry(id).or_default().attack = Some((features, now));
    }

    pub fn note_defense_position(
        &mut self,
        id: RobotId,
        features: [f32; DEFENSE_FEATURES],
        now: f64,
    ) {
        self.traces.entry(id).or_default().defense = Some((features, now));
    }

    pub fn has_pending_pass(&self, team: TeamSign) -> bool {
        self.pending_pass[team_idx(team)].is_some()
    }

    pub fn has_pending_action(&self, team: TeamSign) -> bool {
        self.pending_action[team_idx(team)].is_some()
    }

    // ---- resolution ------------------------------------------------------

    /// A robot just gained possession. Resolves pending passes of both
    /// teams against the new owner.
    pub fn on_possession_gained(
        &mut self,
        world: &World,
        new_owner: RobotId,
        new_team: TeamSign,
        ball_x: f32,
        now: f64,
        learning: &Learning,
    ) {
        for team in [1i8, -1i8] {
            let idx = team_idx(team);
            let Some(pass) = self.pending_pass[idx] else {
                continue;
            };

            if now - pass.at > PASS_WINDOW_S {
                self.fail_pass(team, learning);
                continue;
            }

            if new_team != team {
                // Opponent got there first: interception.
                self.fail_pass(team, learning);
                continue;
            }

            if new_owner == pass.to {
                // Intended receiver: success scaled by forward progress.
                let prog = (ball_x - pass.start_x) * team as f32;
                let reward = 1.0 + (prog * 0.20).clamp(-1.0, 1.0);
                learning.pass.apply_reward(reward, &pass.features);

                // Reward the action choice that led here, when it matches.
                if let Some(action) = self.pending_action[idx] {
                    if !action.shoot
                        && action.from == pass.from
                        && action.pass_to == Some(pass.to)
                    {
                        learning.action.apply_reward(false, reward, &action.features);
                        self.pending_action[idx] = None;
                    }
                }

                // Successful receptions lightly reward the whole attacking shape.
                let shape = 0.22 + (prog * 0.05).clamp(-0.25, 0.35);
                self.reward_team_attack_positions(world, team, shape, now, learning);

                self.pending_pass[idx] = None;
            }
            // A different teammate trapping the ball leaves the record
            // pending; the per-tick expiry settles it.
        }
    }

    /// Possession moved from one team to the other outside a clean pass.
    pub fn on_turnover(
        &mut self,
        world: &World,
        lost_team: TeamSign,
        gained_team: TeamSign,
        now: f64,
        learning: &Learning,
    ) {
        // The losing shape didn't protect the ball; the winning shape earned it.
        self.reward_team_attack_positions(world, lost_team, -0.25, now, learning);
        self.reward_team_defense_positions(world, gained_team, 0.25, now, learning);

        // The action that likely caused the turnover.
        let idx = team_idx(lost_team);
        if let Some(action) = self.pending_action[idx] {
            learning.action.apply_reward(action.shoot, -1.0, &action.features);
            self.pending_action[idx] = None;
        }
    }

    /// Once-per-tick expiry. Pass timeouts are failures; action timeouts
    /// fall back to a forward-progress heuristic -- deliberately an
    /// approximation, there is no stricter outcome signal to consult.
    pub fn expire_pending(
        &mut self,
        owner_team: Option<TeamSign>,
        ball_x: f32,
        now: f64,
        learning: &Learning,
    ) {
        for team in [1i8, -1i8] {
            let idx = team_idx(team);

            if let Some(pass) = self.pending_pass[idx] {
                if now - pass.at > PASS_WINDOW_S {
                    self.fail_pass(team, learning);
                }
            }

            if let Some(action) = self.pending_action[idx] {
                if now - action.at > ACTION_WINDOW_S {
                    match owner_team {
                        Some(t) if t != team => {
                            learning.action.apply_reward(action.shoot, -1.0, &action.features);
                        }
                        _ => {
                            let prog = (ball_x - action.start_x) * team as f32;
                            let reward = (prog * 0.10).clamp(-0.6, 0.6);
                            learning.action.apply_reward(action.shoot, reward, &action.features);
                        }
                    }
                    self.pending_action[idx] = None;
                }
            }
        }
    }

    /// Goal event: large signal to the most recent actions, shaped signal
    /// to both teams' recent off-ball positions.
    pub fn on_goal(
        &mut self,
        world: &World,
        scoring_team: TeamSign,
        now: f64,
        learning: &Learning,
    ) {
        for team in [1i8, -1i8] {
            let idx = team_idx(team);
            if let Some(action) = self.pending_action[idx].take() {
                let r = if team == scoring_team { 2.0 } else { -2.0 };
                learning.action.apply_reward(action.shoot, r, &action.features);
            }
        }

        // Attacking shape that produced the goal, defensive shape that
        // conceded it.
        self.reward_team_attack_positions(world, scoring_team, 0.6, now, learning);
        self.reward_team_defense_positions(world, scoring_team, 0.3, now, learning);
        self.reward_team_attack_positions(world, -scoring_team, -0.4, now, learning);
        self.reward_team_defense_positions(world, -scoring_team, -0.8, now, learning);
    }

    // ---- internals -------------------------------------------------------

    fn fail_pass(&mut self, team: TeamSign, learning: &Learning) {
        let idx = team_idx(team);
        if let Some(pass) = self.pending_pass[idx].take() {
            learning.pass.apply_reward(-1.0, &pass.features);
            // The linked pass-action shares the blame (slightly less when it
            // merely timed out, matching the original shaping).
            if let Some(action) = self.pending_action[idx] {
                if !action.shoot {
                    learning.action.apply_reward(false, -0.8, &action.features);
                    self.pending_action[idx] = None;
                }
            }
        }
    }

    fn reward_team_attack_positions(
        &self,
        world: &World,
        team: TeamSign,
        reward: f32,
        now: f64,
        learning: &Learning,
    ) {
        for r in world.mates(team) {
            if let Some(trace) = self.traces.get(&r.id) {
                if let Some((features, at)) = trace.attack {
                    if now - at <= POSITION_WINDOW_S {
                        learning.position.apply_attack_reward(reward, &features);
                    }
                }
            }
        }
    }

    fn reward_team_defense_positions(
        &self,
        world: &World,
        team: TeamSign,
        reward: f32,
        now: f64,
        learning: &Learning,
    ) {
        for r in world.mates(team) {
            if let Some(trace) = self.traces.get(&r.id) {
                if let Some((features, at)) = trace.defense {
                    if now - at <= POSITION_WINDOW_S {
                        learning.position.apply_defense_reward(reward, &features);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (World, Learning, OutcomeTracker) {
        let mut w = World::default();
        w.reset_kickoff();
        (w, Learning::in_memory(), OutcomeTracker::new())
    }

    const PF: [f32; PASS_FEATURES] = [0.5, 0.8, 1.0, 0.4, 0.3];
    const AF: [f32; ACTION_FEATURES] = [1.0, 1.0, 0.3, 0.5, -0.2, 0.2];

    #[test]
    fn test_successful_pass_rewards_positively() {
        let (w, learning, mut tracker) = setup();
        let w0 = learning.pass.weights();

        tracker.record_pass_attempt(1, 4, 5, 0.0, PF, 0.0);
        // Receiver 5 traps the ball 1m forward, inside the window.
        tracker.on_possession_gained(&w, 5, 1, 1.0, 0.5, &learning);

        assert!(!tracker.has_pending_pass(1));
        let w1 = learning.pass.weights();
        // Positive reward on positive features raises every weight.
        for i in 0..PASS_FEATURES {
            assert!(w1[i] > w0[i], "w[{i}] should increase");
        }
    }

    #[test]
    fn test_interception_penalizes() {
        let (w, learning, mut tracker) = setup();
        let w0 = learning.pass.weights();

        tracker.record_pass_attempt(1, 4, 5, 0.0, PF, 0.0);
        tracker.on_possession_gained(&w, 14, -1, 0.5, 0.4, &learning);

        assert!(!tracker.has_pending_pass(1));
        let w1 = learning.pass.weights();
        for i in 0..PASS_FEATURES {
            assert!(w1[i] < w0[i], "w[{i}] should decrease on interception");
        }
    }

    #[test]
    fn test_other_teammate_leaves_record_pending() {
        let (w, learning, mut tracker) = setup();
        tracker.record_pass_attempt(1, 4, 5, 0.0, PF, 0.0);
        // A different teammate traps it: not a resolution either way.
        tracker.on_possession_gained(&w, 3, 1, 0.2, 0.4, &learning);
        assert!(tracker.has_pending_pass(1));
    }

    #[test]
    fn test_pass_timeout_fails_and_drags_action() {
        let (_w, learning, mut tracker) = setup();
        tracker.record_pass_attempt(1, 4, 5, 0.0, PF, 0.0);
        tracker.record_action_attempt(1, 4, false, Some(5), 0.0, AF, 0.0);

        tracker.expire_pending(None, 0.0, 2.0, &learning);
        assert!(!tracker.has_pending_pass(1));
        assert!(!tracker.has_pending_action(1));
    }

    #[test]
    fn test_action_timeout_uses_progress_heuristic() {
        let (_w, learning, mut tracker) = setup();
        let p0 = learning.action.shoot_probability(&AF);

        tracker.record_action_attempt(1, 4, true, None, 0.0, AF, 0.0);
        // Ball advanced 3m by the time the window closes and we still own it.
        tracker.expire_pending(Some(1), 3.0, 2.0, &learning);
        assert!(!tracker.has_pending_action(1));
        // Positive progress reward on a taken shot raises P(shoot).
        assert!(learning.action.shoot_probability(&AF) > p0);
    }

    #[test]
    fn test_action_timeout_opponent_owned_is_failure() {
        let (_w, learning, mut tracker) = setup();
        let p0 = learning.action.shoot_probability(&AF);
        tracker.record_action_attempt(1, 4, true, None, 0.0, AF, 0.0);
        tracker.expire_pending(Some(-1), 3.0, 2.0, &learning);
        assert!(learning.action.shoot_probability(&AF) < p0);
    }

    #[test]
    fn test_last_writer_wins_per_team() {
        let (_w, _learning, mut tracker) = setup();
        tracker.record_pass_attempt(1, 4, 5, 0.0, PF, 0.0);
        tracker.record_pass_attempt(1, 5, 3, 0.5, PF, 0.1);
        // Only one slot per team; red slot independent.
        assert!(tracker.has_pending_pass(1));
        assert!(!tracker.has_pending_pass(-1));
        tracker.record_pass_attempt(-1, 14, 15, 0.0, PF, 0.1);
        assert!(tracker.has_pending_pass(-1));
    }

    #[test]
    fn test_goal_rewards_shapes_within_window() {
        let (w, learning, mut tracker) = setup();
        let att0 = learning.position.attack_weights();

        // Fresh attack traces for blue robots.
        for r in 1..=5 {
            tracker.note_attack_position(r, [0.5, 0.5, 0.5, 0.2, 0.1, 0.3], 1.0);
        }
        // Stale trace outside the window must not contribute.
        tracker.note_attack_position(11, [1.0; ATTACK_FEATURES], -5.0);

        tracker.on_goal(&w, 1, 1.5, &learning);
        let att1 = learning.position.attack_weights();
        assert!(att1[0] > att0[0], "scoring team's shape is rewarded");
    }

    #[test]
    fn test_turnover_shapes_and_action() {
        let (w, learning, mut tracker) = setup();
        tracker.record_action_attempt(1, 4, false, Some(5), 0.0, AF, 0.0);
        for r in 1..=5 {
            tracker.note_defense_position(r + 10, [0.4, -0.2, -0.3, 0.0, -0.1], 0.2);
        }
        tracker.on_turnover(&w, 1, -1, 0.4, &learning);
        assert!(!tracker.has_pending_action(1));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (_w, _learning, mut tracker) = setup();
        tracker.record_pass_attempt(1, 4, 5, 0.0, PF, 0.0);
        tracker.record_action_attempt(-1, 14, true, None, 0.0, AF, 0.0);
        tracker.note_attack_position(4, [0.1; ATTACK_FEATURES], 0.0);
        tracker.reset();
        assert!(!tracker.has_pending_pass(1));
        assert!(!tracker.has_pending_action(-1));
    }
}
