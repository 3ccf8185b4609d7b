//! Grid-driven off-ball positioning with target deconfliction
//!
//! Attack: pick a rubric by role (rest-defender safety, wide defenders
//! joining, everyone else receiving), add the learned position bonus and
//! per-tick context bonuses, grid-search, then deconflict the chosen point
//! against teammates' already-planned targets. Defense: lane-cut rubric
//! with the mark passed in explicitly; marked defenders skip deconfliction
//! so tracking stays decisive.

use std::collections::HashMap;

use crate::engine::learning::{position, Learning};
use crate::engine::physics_constants::{field, grid, robot};
use crate::engine::rewards::OutcomeTracker;
use crate::engine::score_grid::find_best;
use crate::engine::scorers;
use crate::engine::steering::seek_or_hold;
use crate::engine::world::{Command, Point, Robot, RobotId, TeamSign, World};

/// Movement speeds for off-ball relocation
const ATTACK_MOVE_SPEED: f32 = 1.35;
const DEFENSE_MOVE_SPEED: f32 = 1.25;

/// Per-tick inputs shared by every off-ball decision of one team.
pub struct OffballContext<'a> {
    /// Team's designated rest defender (attack only)
    pub rest_defender_id: Option<RobotId>,
    /// Mark targets in the decision frame, by defender id
    pub marks: &'a HashMap<RobotId, Point>,
    /// The team's ball-winner is about to pass
    pub team_passing: bool,
    /// The team will likely regain the free ball uncontested
    pub regain_soon: bool,
}

/// Output of one off-ball decision: the command plus the final (possibly
/// deconflicted) target for the planning table and debug overlay.
pub struct OffballDecision {
    pub command: Command,
    pub target: Point,
}

pub fn offball_command(
    world: &World,
    this: &Robot,
    sign: TeamSign,
    ctx: &OffballContext<'_>,
    planned: &mut HashMap<RobotId, Point>,
    learning: &Learning,
    tracker: &mut OutcomeTracker,
    now: f64,
) -> OffballDecision {
    if world.is_attacking(sign) {
        attack_positioning(world, this, sign, ctx, planned, learning, tracker, now)
    } else {
        defense_positioning(world, this, sign, ctx, planned, learning, tracker, now)
    }
}

#[allow(clippy::too_many_arguments)]
fn attack_positioning(
    world: &World,
    this: &Robot,
    sign: TeamSign,
    ctx: &OffballContext<'_>,
    planned: &mut HashMap<RobotId, Point>,
    learning: &Learning,
    tracker: &mut OutcomeTracker,
    now: f64,
) -> OffballDecision {
    let is_rest = ctx.rest_defender_id == Some(this.id);
    let is_side_defender = this.pos.1.abs() > 0.55;

    let team_passing = ctx.team_passing;
    let regain_soon = ctx.regain_soon;

    // Rubric by role; the learned bonus and context bonuses stack on top.
    let scorer = |w: &World, s: &Robot, p: Point, ts: TeamSign| -> f32 {
        let base = if is_rest {
            scorers::defend_while_attacking(w, s, p, ts)
        } else if is_side_defender {
            scorers::wide_defender_join_attack(w, s, p, ts)
        } else {
            scorers::attack_off_ball(w, s, p, ts)
        };
        let mut v = base + learning.position.attack_bonus(w, s, p, ts);
        if team_passing && !is_rest {
            v += scorers::pass_spread_bonus(w, s, p, ts);
        }
        if regain_soon && !is_rest {
            v += scorers::pre_regain_spread_bonus(w, s, p, ts);
        }
        v
    };

    let best = find_best(world, this, sign, grid::ATTACK_STEP_M, &scorer);
    let mut target = best.pos();

    let off = deconflict_offset(this, planned, target);
    target.0 += off.0;
    target.1 += off.1;

    planned.insert(this.id, target);
    tracker.note_attack_position(
        this.id,
        position::attack_features(world, this, target, sign),
        now,
    );

    let mut command = Command::stop(this.id);
    command.vel = seek_or_hold(this.pos, target, ATTACK_MOVE_SPEED, 1e-6);
    OffballDecision { command, target }
}

#[allow(clippy::too_many_arguments)]
fn defense_positioning(
    world: &World,
    this: &Robot,
    sign: TeamSign,
    ctx: &OffballContext<'_>,
    planned: &mut HashMap<RobotId, Point>,
    learning: &Learning,
    tracker: &mut OutcomeTracker,
    now: f64,
) -> OffballDecision {
    let mark = ctx.marks.get(&this.id).copied();
    let regain_soon = ctx.regain_soon;

    let scorer = |w: &World, s: &Robot, p: Point, ts: TeamSign| -> f32 {
        let mut v = scorers::defend_off_ball(w, s, p, ts, mark)
            + learning.position.defense_bonus(w, s, p, ts, mark);
        // Unmarked defenders spread early when a regain is coming.
        if mark.is_none() && regain_soon {
            v += scorers::pre_regain_spread_bonus(w, s, p, ts);
        }
        v
    };

    let best = find_best(world, this, sign, grid::DEFENSE_STEP_M, &scorer);
    let mut target = best.pos();

    // Marking ignores spacing shaping; it must stay decisive.
    if mark.is_none() {
        let off = deconflict_offset(this, planned, target);
        target.0 += off.0;
        target.1 += off.1;
    }

    planned.insert(this.id, target);
    tracker.note_defense_position(
        this.id,
        position::defense_features(world, this, target, sign, mark),
        now,
    );

    let mut command = Command::stop(this.id);
    command.vel = seek_or_hold(this.pos, target, DEFENSE_MOVE_SPEED, 1e-6);
    OffballDecision { command, target }
}

/// Push a planned target away from teammates' already-planned targets.
/// Repulsion is proportional to (radius - distance), squared for close
/// pairs, capped in magnitude, and clamped into the field. Identical
/// points get a deterministic angular tie-break so robots never stack.
pub fn deconflict_offset(
    this: &Robot,
    planned: &HashMap<RobotId, Point>,
    target: Point,
) -> Point {
    let mut push = (0.0f32, 0.0f32);

    // Stronger deconfliction for defender-like (central) robots so the back
    // line doesn't collapse onto one lane-cut point.
    let defender_like = this.pos.1.abs() <= 1.2;
    let (radius, gain) = if defender_like { (1.15, 0.55) } else { (0.95, 0.42) };

    // Stable id order: float accumulation must not depend on map layout.
    let mut entries: Vec<(&RobotId, &Point)> = planned.iter().collect();
    entries.sort_by_key(|(id, _)| **id);

    for (id, p) in entries {
        if *id == this.id {
            continue;
        }
        let dx = target.0 - p.0;
        let dy = target.1 - p.1;
        let d2 = dx * dx + dy * dy;
        if d2 < 1e-9 {
            // Identical point: deterministic tiny push derived from ids.
            let ang = this.id as f32 * 1.7 + *id as f32 * 0.9;
            push.0 += ang.cos();
            push.1 += ang.sin();
            continue;
        }
        let d = d2.sqrt();
        if d > radius {
            continue;
        }
        let strength = ((radius - d) / radius).powi(2);
        push.0 += dx / d * strength;
        push.1 += dy / d * strength;
    }

    let max_off = 0.70;
    let mag = (push.0 * push.0 + push.1 * push.1).sqrt();
    if mag > 1e-6 {
        let scaled = (mag * gain).min(max_off);
        push.0 = push.0 / mag * scaled;
        push.1 = push.1 / mag * scaled;
    }

    // Clamp the final point into the field and express as an offset.
    let margin = robot::RADIUS_M + 0.05;
    let nx = (target.0 + push.0)
        .clamp(-field::HALF_LENGTH_M + margin, field::HALF_LENGTH_M - margin);
    let ny = (target.1 + push.1)
        .clamp(-field::HALF_WIDTH_M + margin, field::HALF_WIDTH_M - margin);
    (nx - target.0, ny - target.1)
}

/// Lateral nudge applied when a command steers almost straight at the ball:
/// alternate sides by id parity so converging robots fan out instead of
/// forming a queue.
pub fn apply_ball_approach_bias(cmd: &mut Command, this: &Robot, world: &World) {
    let dx = world.ball.pos.0 - this.pos.0;
    let dy = world.ball.pos.1 - this.pos.1;
    let d = (dx * dx + dy * dy).sqrt();
    if d < 1e-6 {
        return;
    }

    let v = (cmd.vel.0 * cmd.vel.0 + cmd.vel.1 * cmd.vel.1).sqrt();
    if v < 0.2 {
        return;
    }

    let cos = (cmd.vel.0 * dx + cmd.vel.1 * dy) / (v * d);
    if cos < 0.85 {
        return;
    }

    let lat = (-dy / d, dx / d);
    let side = if this.id.rem_euclid(2) == 0 { 1.0 } else { -1.0 };
    let bias = 0.18;
    cmd.vel.0 += lat.0 * bias * side;
    cmd.vel.1 += lat.1 * bias * side;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rewards::OutcomeTracker;

    fn setup() -> (World, Learning, OutcomeTracker) {
        let mut w = World::default();
        w.reset_kickoff();
        (w, Learning::in_memory(), OutcomeTracker::new())
    }

    #[test]
    fn test_deconflict_pushes_apart_within_radius() {
        let this = Robot::new(5, 0.0, 2.0, 0.0); // wide: attacker-like radius
        let mut planned = HashMap::new();
        planned.insert(4, (1.0, 1.0));

        let off = deconflict_offset(&this, &planned, (1.2, 1.0));
        assert!(off.0 > 0.0, "push away from the planned point at lower x");
        let mag = (off.0 * off.0 + off.1 * off.1).sqrt();
        assert!(mag <= 0.70 + 1e-5, "offset must stay capped");
    }

    #[test]
    fn test_deconflict_identical_points_break_ties() {
        let this = Robot::new(2, 0.0, 0.0, 0.0);
        let mut planned = HashMap::new();
        planned.insert(1, (0.5, 0.5));
        let off = deconflict_offset(&this, &planned, (0.5, 0.5));
        assert!(off.0 != 0.0 || off.1 != 0.0, "identical targets must separate");
    }

    #[test]
    fn test_deconflict_ignores_far_targets() {
        let this = Robot::new(5, 0.0, 2.0, 0.0);
        let mut planned = HashMap::new();
        planned.insert(4, (-3.0, -2.0));
        assert_eq!(deconflict_offset(&this, &planned, (3.0, 2.0)), (0.0, 0.0));
    }

    #[test]
    fn test_attack_branch_records_plan_and_features() {
        let (mut w, learning, mut tracker) = setup();
        w.ball.place((1.5, 0.0)); // blue attacking
        let this = w.our_robots[5];
        let marks = HashMap::new();
        let ctx = OffballContext {
            rest_defender_id: Some(2),
            marks: &marks,
            team_passing: false,
            regain_soon: false,
        };
        let mut planned = HashMap::new();
        let out =
            offball_command(&w, &this, 1, &ctx, &mut planned, &learning, &mut tracker, 0.0);
        assert!(planned.contains_key(&this.id));
        assert!(out.command.vel.0 != 0.0 || out.command.vel.1 != 0.0);
        assert!(!out.command.kick);
        // Target stays inside the field margin.
        assert!(out.target.0.abs() <= field::HALF_LENGTH_M);
        assert!(out.target.1.abs() <= field::HALF_WIDTH_M);
    }

    #[test]
    fn test_defense_branch_marked_skips_deconflict() {
        let (mut w, learning, mut tracker) = setup();
        w.ball.place((-1.5, 0.0)); // blue defending
        let this = w.our_robots[1];
        let mut marks = HashMap::new();
        let mark_pos = (-1.0, -0.8);
        marks.insert(this.id, mark_pos);
        let ctx = OffballContext {
            rest_defender_id: None,
            marks: &marks,
            team_passing: false,
            regain_soon: false,
        };

        // Pre-plan a colliding target for a teammate; a marked defender must
        // ignore it (no deconfliction shift away from its mark-driven spot).
        let mut planned = HashMap::new();
        let first = offball_command(
            &w,
            &this,
            1,
            &ctx,
            &mut planned,
            &learning,
            &mut tracker,
            0.0,
        );
        let mut planned2 = HashMap::new();
        planned2.insert(3, first.target);
        let second = offball_command(
            &w,
            &this,
            1,
            &ctx,
            &mut planned2,
            &learning,
            &mut tracker,
            0.0,
        );
        assert_eq!(first.target, second.target);
    }

    #[test]
    fn test_ball_approach_bias_only_when_converging() {
        let mut w = World::default();
        w.reset_kickoff();
        w.ball.place((2.0, 0.0));
        let this = Robot::new(4, 0.0, 0.0, 0.0);

        // Straight at the ball: bias kicks in.
        let mut cmd = Command::stop(4);
        cmd.vel = (1.0, 0.0);
        apply_ball_approach_bias(&mut cmd, &this, &w);
        assert!(cmd.vel.1 != 0.0);

        // Moving away: untouched.
        let mut cmd2 = Command::stop(4);
        cmd2.vel = (-1.0, 0.0);
        apply_ball_approach_bias(&mut cmd2, &this, &w);
        assert_eq!(cmd2.vel, (-1.0, 0.0));
    }
}
