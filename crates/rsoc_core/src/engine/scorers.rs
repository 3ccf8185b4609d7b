//! Heuristic position-scoring rubrics
//!
//! Each rubric is a weighted sum of interpretable terms. The intent is not
//! perfect soccer but a framework where terms can be re-weighted and the
//! team shape visibly changes. All rubrics share a 10-point core (openness,
//! teammate spacing, available pass lines, shootability) and differ in the
//! shaping terms layered on top.
//!
//! Rubrics are evaluated in a frame where the scored team attacks +x; the
//! mirrored view handles the other team.

use super::geometry::{
    closest_point_on_segment, dist, nearest_robot_distance, nearest_robot_distance_excluding,
    pass_interceptable, predict_ball_pos, segment_blocked,
};
use super::physics_constants::field;
use super::world::{Point, Robot, TeamSign, World};

/// Danger radius for "is this pass line blocked" checks inside rubrics
const PASS_LANE_DANGER_M: f32 = 0.30;
/// Danger radius for "is the shot line blocked" checks
const SHOT_LANE_DANGER_M: f32 = 0.35;

/// Shared 10-point core:
/// - openness from the nearest opponent: up to 2
/// - spacing from the nearest teammate: up to 1
/// - one point per unblocked pass line from a teammate (capped)
/// - unblocked shot line to the opponent goal: `shot_value`
fn core_rubric(
    world: &World,
    this: &Robot,
    p: Point,
    sign: TeamSign,
    pass_cap: i32,
    shot_value: f32,
) -> f32 {
    let opps = world.opponents(sign);
    let mates = world.mates(sign);

    let opp_d = nearest_robot_distance(opps, p);
    let open2 = if opp_d >= 1.0 { 2.0 } else { (opp_d / 1.0).clamp(0.0, 1.0) * 2.0 };

    let mate_min = nearest_robot_distance_excluding(mates, p, this.id);
    let mate1 = if mate_min >= 1.05 { 1.0 } else { (mate_min / 1.05).clamp(0.0, 1.0) };

    let mut pass_options = 0;
    for r in mates {
        if r.id == this.id {
            continue;
        }
        if !segment_blocked(r.pos, p, opps, PASS_LANE_DANGER_M) {
            pass_options += 1;
        }
    }
    let pass_pts = pass_options.min(pass_cap) as f32;

    let their_goal = ((sign as f32) * field::HALF_LENGTH_M, 0.0);
    let shoot = if segment_blocked(p, their_goal, opps, SHOT_LANE_DANGER_M) {
        0.0
    } else {
        shot_value
    };

    open2 + mate1 + pass_pts + shoot
}

/// Attacking off-ball scoring.
///
/// Core rubric plus: don't hug the ball, don't camp near our own goal,
/// penalize easily interceptable receiving spots, anticipate where the
/// ball is rolling, and drift forward with a forward-moving ball.
pub fn attack_off_ball(world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32 {
    let ball = &world.ball;
    let sf = sign as f32;

    let ball_speed = ball.speed();
    let ball_future = predict_ball_pos(world, 0.45);

    let score10 = core_rubric(world, this, p, sign, 4, 2.0);

    // Interceptability: motion-aware via an assumed pass speed (a slow ball
    // makes interceptions easier).
    let assumed_ball_speed = (ball_speed * 0.9 + 1.2).max(1.2);
    let interceptable = pass_interceptable(
        ball.pos,
        p,
        world.opponents(sign),
        assumed_ball_speed,
        1.55,
        0.18,
    );
    let intercept_penalty = if interceptable { -1.15 } else { 0.0 };

    // Keep a minimum distance from the ball.
    let ball_d = dist(p, ball.pos);
    let min_ball_d = 0.85;
    let near_ball_penalty = if ball_d < min_ball_d { -(min_ball_d - ball_d) * 1.2 } else { 0.0 };

    // Be available where the ball is going, not only where it is now. Mild,
    // so a fast clearance doesn't drag the whole team forward.
    let future_d = dist(p, ball_future);
    let anticipate_bonus =
        if ball_speed > 0.25 { (1.6 - future_d).clamp(-2.0, 2.0) * 0.35 } else { 0.0 };

    // When the ball itself moves forward, reward being in front of it.
    let ball_v_attack = ball.vel.0 * sf;
    let ahead_of_ball = p.0 * sf - ball.pos.0 * sf;
    let forward_flow = if ball_speed > 0.25 && ball_v_attack > 0.20 {
        ahead_of_ball.clamp(-1.5, 2.5) * 0.18
    } else {
        0.0
    };

    // Not glued to our own goal while attacking.
    let our_goal_x = -sf * field::HALF_LENGTH_M;
    let goal_dist = (p.0 - our_goal_x).abs();
    let goal_penalty = if goal_dist < 1.1 { -(1.1 - goal_dist) * 0.8 } else { 0.0 };

    score10 + near_ball_penalty + goal_penalty + intercept_penalty + anticipate_bonus + forward_flow
}

/// Rest-defender scoring while the team attacks.
///
/// Offense-like core so the safety still occupies a useful, passable spot,
/// constrained to a stand-off band behind the ball and explicitly kept out
/// of our deep corners (the classic "defender stuck in the corner" trap).
pub fn defend_while_attacking(world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32 {
    let ball = &world.ball;
    let sf = sign as f32;
    let half_w = field::HALF_WIDTH_M;

    let ball_speed = ball.speed();
    let ball_future = predict_ball_pos(world, 0.35);

    let score10 = core_rubric(world, this, p, sign, 3, 2.0);

    // Stand-off band behind the ball: cover distance without being left behind.
    let x_attack = p.0 * sf;
    let ball_x_attack = ball.pos.0 * sf;
    let behind_ball = ball_x_attack - x_attack; // positive => behind
    let desired = 2.2;
    let slack = 0.9;
    let err = (behind_ball - desired).abs();
    let behind_penalty = -((err - slack).max(0.0)) * 0.95;

    let too_far_penalty = if behind_ball > 4.2 { -(behind_ball - 4.2) * 1.15 } else { 0.0 };
    let ahead_penalty = if behind_ball < -0.2 { -(-0.2 - behind_ball) * 1.35 } else { 0.0 };

    // Don't hang in our own third while attacking.
    let our_goal_x = -sf * field::HALF_LENGTH_M;
    let from_our_goal = (p.0 - our_goal_x).abs();
    let deep_penalty = if from_our_goal < 2.8 { -(2.8 - from_our_goal) * 0.9 } else { 0.0 };

    let ball_d = dist(p, ball.pos);
    let near_ball_penalty = if ball_d < 1.05 { -(1.05 - ball_d) * 1.4 } else { 0.0 };

    // Stay conservative when the ball is moving back toward our half fast.
    let ball_v_attack = ball.vel.0 * sf;
    let transition_penalty =
        if ball_speed > 0.35 && ball_v_attack < -0.25 { -0.9 } else { 0.0 };

    let future_d = dist(p, ball_future);
    let cover_future =
        if ball_speed > 0.25 { (2.2 - future_d).clamp(-2.0, 2.0) * 0.25 } else { 0.0 };

    // Compact rest-defense: no extreme wings.
    let y_norm = p.1.abs() / half_w;
    let wing_penalty = if y_norm > 0.70 { -(y_norm - 0.70) * 0.8 } else { 0.0 };

    // Scoring ties plus deconfliction can push the safety into a deep corner;
    // penalize corner camping explicitly.
    let in_deep_third = from_our_goal < 2.2;
    let near_touch = p.1.abs() > half_w * 0.82;
    let corner_penalty = if in_deep_third && near_touch { -3.5 } else { 0.0 };

    let goal_line_penalty =
        if from_our_goal < 1.0 { -(1.0 - from_our_goal) * 1.6 } else { 0.0 };

    score10
        + behind_penalty
        + too_far_penalty
        + ahead_penalty
        + deep_penalty
        + near_ball_penalty
        + wing_penalty
        + corner_penalty
        + goal_line_penalty
        + transition_penalty
        + cover_future
}

/// Wide defenders joining the attack as temporary midfielders.
///
/// Pushes toward midfield only once the ball has advanced, keeps width for
/// a safe outlet, and still rewards open / spaced / passable points.
pub fn wide_defender_join_attack(world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32 {
    let ball = &world.ball;
    let sf = sign as f32;
    let half_w = field::HALF_WIDTH_M;

    let base = core_rubric(world, this, p, sign, 3, 2.0);

    let ball_x_attack = ball.pos.0 * sf;
    let x_attack = p.0 * sf;

    // Desired x: slightly behind the ball near midfield, around the middle
    // third once the ball is far advanced.
    let desired_x_attack = if ball_x_attack < 0.30 {
        ball_x_attack - 0.55
    } else {
        (ball_x_attack - 1.05).max(0.20)
    };
    let x_err = (x_attack - desired_x_attack).abs();
    let x_hold = -x_err * 0.85;

    let cross_mid_reward = if ball_x_attack > 0.45 && x_attack > 0.0 { 1.2 } else { 0.0 };

    // Keep width but don't hug the wall.
    let y_abs = p.1.abs();
    let ideal_y = (half_w * 0.48).clamp(0.75, 2.20);
    let y_err = (y_abs - ideal_y).abs();
    let width_score = -y_err * 0.55;
    let wall_penalty = if y_abs > half_w * 0.90 { -(y_abs - half_w * 0.90) * 1.4 } else { 0.0 };

    let ball_d = dist(p, ball.pos);
    let near_ball_penalty = if ball_d < 1.10 { -(1.10 - ball_d) * 1.4 } else { 0.0 };

    let our_goal_x = -sf * field::HALF_LENGTH_M;
    let from_our_goal = (p.0 - our_goal_x).abs();
    let deep_penalty = if from_our_goal < 3.1 { -(3.1 - from_our_goal) * 1.1 } else { 0.0 };

    base + x_hold + cross_mid_reward + width_score + wall_penalty + near_ball_penalty + deep_penalty
}

/// Off-ball defensive scoring.
///
/// Cuts the line from the ball to the most advanced opponent (or to the
/// assigned mark), holds a goal-side line that rises with the ball, and
/// actively resists ball-chasing on fast transitions. When a mark is
/// assigned, the generic open/spacing/pass-line terms are suppressed --
/// they would fight the mark-tracking objective.
pub fn defend_off_ball(
    world: &World,
    this: &Robot,
    p: Point,
    sign: TeamSign,
    mark: Option<Point>,
) -> f32 {
    let ball = &world.ball;
    let sf = sign as f32;
    let half_l = field::HALF_LENGTH_M;
    let half_w = field::HALF_WIDTH_M;

    let ball_speed = ball.speed();
    let ball_future = predict_ball_pos(world, 0.35);

    let base = if mark.is_some() { 0.0 } else { core_rubric(world, this, p, sign, 2, 1.0) };

    // (A) Lane anchoring: keep the back line from collapsing onto one lane.
    let lane_err = (p.1 - this.pos.1).abs();
    let lane_hold = -lane_err * 0.28;

    // (B) Resist large x excursions when the ball is fast.
    let ball_v_attack = ball.vel.0 * sf;
    let speed_hold = if ball_speed > 0.45 { -(p.0 - this.pos.0).abs() * 0.22 } else { 0.0 };

    // Goal-side: prefer being closer to our goal than the ball.
    let our_goal_x = -sf * half_l;
    let ball_to_goal = (ball.pos.0 - our_goal_x).abs();
    let point_to_goal = (p.0 - our_goal_x).abs();
    let goalside_score = (ball_to_goal - point_to_goal).clamp(-2.0, 2.0);

    // Defensive line rises with the ball so the back line doesn't camp deep.
    let desired_line = (1.9 + 0.35 * ball_to_goal).clamp(2.0, 5.2);
    let line_hold = -(point_to_goal - desired_line).abs() * 0.55;

    // Cut the lane to the most advanced opponent.
    let threat = most_advanced_opponent(world, sign);
    let line_cut = threat.map_or(0.0, |t| {
        let c = closest_point_on_segment(ball.pos, t.pos, p);
        -dist(p, c).clamp(0.0, 2.0)
    });

    // Same cut against the projected ball position while the ball rolls.
    let future_cut = match threat {
        Some(t) if ball_speed > 0.25 => {
            let c = closest_point_on_segment(ball_future, t.pos, p);
            -dist(p, c).clamp(0.0, 2.4) * 0.45
        }
        _ => 0.0,
    };

    // Don't crowd the ball (disabled while marking).
    let ball_d = dist(p, ball.pos);
    let ball_band_penalty = if mark.is_some() {
        0.0
    } else if ball_d < 0.90 {
        -(0.90 - ball_d) * 1.8
    } else {
        0.0
    };

    // (C) Hard anti-chase: a fast or goal-bound ball is not for off-ball
    // defenders to chase.
    let dangerous_transition = ball_speed > 0.35 && ball_v_attack < -0.20;
    let chase_discourage = if ball_d < 1.20 && (ball_speed > 0.45 || dangerous_transition) {
        -(1.20 - ball_d) * 2.2
    } else {
        0.0
    };

    let speed_structure = if ball_speed > 0.45 { 0.25 } else { 0.0 };

    let move_cost = dist(p, this.pos);
    let move_penalty = -0.25 * move_cost;

    let y_norm = p.1.abs() / half_w;
    let width_hold = -((y_norm - 0.88).max(0.0)) * 0.7;

    // Man-mark shaping: stay contest-close and goal-side of the mark, cut
    // the ball->mark lane, and take a per-defender lane offset so the back
    // three spread around the mark instead of stacking.
    let mut mark_bias = 0.0;
    let mut mark_goal_side = 0.0;
    let mut mark_lane_cut = 0.0;
    let mut mark_lane_separate = 0.0;
    if let Some(m) = mark {
        let d_mark = dist(p, m);
        let desired = 1.25;
        let err = (d_mark - desired).abs();
        mark_bias = -((err - 0.70).max(0.0)) * 0.55;

        let mark_to_goal = (m.0 - our_goal_x).abs();
        let not_goal_side = point_to_goal - mark_to_goal;
        mark_goal_side =
            if not_goal_side > 0.0 { -not_goal_side.clamp(0.0, 2.0) * 1.05 } else { 0.0 };

        let lp = closest_point_on_segment(ball.pos, m, p);
        mark_lane_cut = -dist(p, lp).clamp(0.0, 2.2) * 0.45;

        let lane_sign = if this.pos.1 >= 0.0 { 1.0 } else { -1.0 };
        let y_lane = p.1 - m.1;
        let desired_lane = lane_sign * 0.55;
        mark_lane_separate = -(y_lane - desired_lane).abs() * 0.18;
    }

    base + 1.10 * goalside_score
        + 0.95 * line_hold
        + 0.85 * line_cut
        + future_cut
        + lane_hold
        + speed_hold
        + width_hold
        + (1.0 + speed_structure) * move_penalty
        + ball_band_penalty
        + chase_discourage
        + mark_bias
        + mark_goal_side
        + mark_lane_cut
        + mark_lane_separate
}

/// Most advanced opponent toward our goal (the pass-lane threat).
/// Advancement for the opponent of a `sign` team runs along `-sign`.
pub fn most_advanced_opponent<'w>(world: &'w World, sign: TeamSign) -> Option<&'w Robot> {
    let sf = sign as f32;
    world
        .opponents(sign)
        .iter()
        .max_by(|a, b| {
            let aa = a.pos.0 * -sf;
            let bb = b.pos.0 * -sf;
            aa.partial_cmp(&bb).unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Bonus layered on while the team's ball-winner is about to pass: use
/// width, keep spacing, and don't shrink into tiny triangles at the ball.
pub fn pass_spread_bonus(world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32 {
    let half_w = field::HALF_WIDTH_M;

    let width01 = (p.1.abs() / (half_w + 1e-9)).min(1.0);
    let width_bonus = 0.85 * width01;

    let db = dist(p, world.ball.pos);
    let ball_penalty = if db < 1.10 { -1.35 * (1.10 - db) / 1.10 } else { 0.0 };

    let nearest = nearest_robot_distance_excluding(world.mates(sign), p, this.id);
    let spacing = ((nearest - 1.4) / 1.2).clamp(-1.0, 1.0);
    let spacing_bonus = 0.65 * spacing;

    let forward = (p.0 - world.ball.pos.0) * sign as f32;
    let forward_bonus = 0.20 * (forward / 2.5).clamp(-1.0, 1.0);

    width_bonus + spacing_bonus + ball_penalty + forward_bonus
}

/// Lighter spread applied when the team is about to regain a free ball
/// uncontested: get ready for the next pass without abandoning structure.
pub fn pre_regain_spread_bonus(world: &World, this: &Robot, p: Point, sign: TeamSign) -> f32 {
    let half_w = field::HALF_WIDTH_M;

    let width01 = (p.1.abs() / (half_w + 1e-9)).min(1.0);
    let width_bonus = 0.55 * width01;

    let db = dist(p, world.ball.pos);
    let ball_penalty = if db < 1.05 { -0.90 * (1.05 - db) / 1.05 } else { 0.0 };

    let nearest = nearest_robot_distance_excluding(world.mates(sign), p, this.id);
    let spacing = ((nearest - 1.35) / 1.1).clamp(-1.0, 1.0);
    let spacing_bonus = 0.45 * spacing;

    let forward = (p.0 - world.ball.pos.0) * sign as f32;
    let forward_bonus = 0.12 * (forward / 2.8).clamp(-1.0, 1.0);

    width_bonus + spacing_bonus + ball_penalty + forward_bonus
}
