//! Deterministic greedy marking assignment for the defending team
//!
//! Only the back line takes marks (attackers and the supporter pressure
//! instead). Priorities: the opponent ball-holder first, the likely
//! receiver second, then a greedy cost match for the rest. Cost rewards
//! threat (advancement toward our goal) and ball proximity, penalizes
//! lane mismatch and marking an opponent behind the defender.

use std::collections::{HashMap, HashSet};

use crate::engine::geometry::{dist, dist2};
use crate::engine::world::{is_back_line_id, Point, Robot, RobotId, TeamSign, World};

/// Current possession owner in true-frame terms (id, team sign).
pub type OwnerInfo = Option<(RobotId, TeamSign)>;

/// Compute mark targets for `sign`'s defenders. Returns defender id ->
/// marked opponent position, in the same frame as `world`.
pub fn assign_marks(world: &World, sign: TeamSign, owner: OwnerInfo) -> HashMap<RobotId, Point> {
    let mut marks = HashMap::new();

    let defenders = world.mates(sign);
    let opponents = world.opponents(sign);
    if defenders.is_empty() || opponents.is_empty() {
        return marks;
    }

    // The defending team's ball-winner pressures the ball and never marks.
    let ball_winner_id = world.closest_to_ball(sign).map(|r| r.id);

    // Back-line defenders only, sorted central-first so lane matching is
    // stable across ticks.
    let mut def_list: Vec<&Robot> = defenders
        .iter()
        .filter(|d| {
            !d.is_goalkeeper()
                && Some(d.id) != ball_winner_id
                && is_back_line_id(d.id, sign)
        })
        .collect();
    def_list.sort_by(|a, b| {
        a.pos
            .1
            .abs()
            .partial_cmp(&b.pos.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let opp_sign = -sign;
    let opp_holder: Option<&Robot> = match owner {
        Some((id, team)) if team == opp_sign => world.find_robot(id, opp_sign),
        _ => None,
    };

    // Likely receiver: closest non-GK opponent to the ball, excluding the holder.
    let mut likely_receiver: Option<&Robot> = None;
    let mut best_recv_d2 = f32::INFINITY;
    for o in opponents {
        if o.is_goalkeeper() {
            continue;
        }
        if opp_holder.map_or(false, |h| h.id == o.id) {
            continue;
        }
        let d2 = dist2(o.pos, world.ball.pos);
        if d2 < best_recv_d2 {
            best_recv_d2 = d2;
            likely_receiver = Some(o);
        }
    }

    let mut opp_taken: HashSet<RobotId> = HashSet::new();
    let mut used_def: HashSet<RobotId> = HashSet::new();

    // Priority 1: nearest free defender takes the ball holder.
    if let Some(holder) = opp_holder {
        if let Some(best) = nearest_defender(&def_list, &used_def, holder.pos) {
            marks.insert(best, holder.pos);
            opp_taken.insert(holder.id);
            used_def.insert(best);
        }
    }

    // Priority 2: nearest remaining defender takes the likely receiver.
    if let Some(recv) = likely_receiver {
        if let Some(best) = nearest_defender(&def_list, &used_def, recv.pos) {
            marks.insert(best, recv.pos);
            opp_taken.insert(recv.id);
            used_def.insert(best);
        }
    }

    // Remaining defenders: greedy cost match over untaken opponents.
    for d in &def_list {
        if used_def.contains(&d.id) {
            continue;
        }
        let mut best: Option<(&Robot, f32)> = None;
        for o in opponents {
            if opp_taken.contains(&o.id) {
                continue;
            }
            // The opponent GK is only markable while holding the ball.
            if o.is_goalkeeper() && opp_holder.map_or(true, |h| h.id != o.id) {
                continue;
            }
            let cost = mark_cost(world, d, o, sign);
            if best.map_or(true, |(_, bc)| cost < bc) {
                best = Some((o, cost));
            }
        }
        if let Some((o, _)) = best {
            marks.insert(d.id, o.pos);
            opp_taken.insert(o.id);
        }
    }

    marks
}

fn nearest_defender(
    def_list: &[&Robot],
    used: &HashSet<RobotId>,
    target: Point,
) -> Option<RobotId> {
    let mut best: Option<(RobotId, f32)> = None;
    for d in def_list {
        if used.contains(&d.id) {
            continue;
        }
        let d2 = dist2(d.pos, target);
        if best.map_or(true, |(_, bd2)| d2 < bd2) {
            best = Some((d.id, d2));
        }
    }
    best.map(|(id, _)| id)
}

/// Lower cost is better: pick threatening, soon-to-receive opponents while
/// keeping lane stability across the back line.
fn mark_cost(world: &World, defender: &Robot, opp: &Robot, sign: TeamSign) -> f32 {
    let sf = sign as f32;

    // Opponents advanced toward our goal are dangerous.
    let adv_to_our_goal = opp.pos.0 * -sf;
    let threat_bonus = adv_to_our_goal.clamp(-6.0, 6.0) * 0.75;

    // Closer to the ball means a likelier receiver.
    let d_ball = dist(opp.pos, world.ball.pos);
    let receive_bonus = (2.2 - d_ball).clamp(-2.2, 2.2) * 0.60;

    // Lane stability: match by y so the back three don't converge on the
    // same central man.
    let y_cost = (opp.pos.1 - defender.pos.1).abs() * 1.05;

    // Marking someone behind you pulls you out of the line.
    let ahead = (opp.pos.0 - defender.pos.0) * sf;
    let behind_penalty = if ahead < -0.2 { -ahead * 0.65 } else { 0.0 };

    y_cost + behind_penalty - threat_bonus - receive_bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defending_world() -> World {
        let mut w = World::default();
        w.reset_kickoff();
        // Ball in blue's half: blue defends.
        w.ball.place((-1.5, 0.0));
        w
    }

    #[test]
    fn test_marks_are_distinct_opponents() {
        let w = defending_world();
        let marks = assign_marks(&w, 1, None);
        assert!(!marks.is_empty());
        // Every marked position must be unique (no two defenders on one man).
        let mut seen: Vec<Point> = Vec::new();
        for p in marks.values() {
            assert!(
                !seen.iter().any(|q| dist2(*q, *p) < 1e-9),
                "two defenders share a mark at {p:?}"
            );
            seen.push(*p);
        }
    }

    #[test]
    fn test_only_back_line_marks() {
        let w = defending_world();
        let marks = assign_marks(&w, 1, None);
        for id in marks.keys() {
            assert!(is_back_line_id(*id, 1), "non-back-line robot {id} got a mark");
        }
    }

    #[test]
    fn test_holder_marked_by_nearest_defender() {
        let mut w = defending_world();
        // Red robot 14 holds the ball deep in blue territory.
        w.opp_robots[4].pos = (-2.0, -0.8);
        w.ball.place((-2.0, -0.8));
        let holder_pos = w.opp_robots[4].pos;

        let marks = assign_marks(&w, 1, Some((14, -1)));
        // Some back-line defender is on the holder's position.
        assert!(
            marks.values().any(|p| dist2(*p, holder_pos) < 1e-9),
            "holder must be marked: {marks:?}"
        );
    }

    #[test]
    fn test_deterministic() {
        let w = defending_world();
        let a = assign_marks(&w, 1, None);
        let b = assign_marks(&w, 1, None);
        assert_eq!(a.len(), b.len());
        for (id, p) in &a {
            assert_eq!(b.get(id), Some(p));
        }
    }

    #[test]
    fn test_opp_gk_not_marked_unless_holder() {
        let w = defending_world();
        let gk_pos = w.opp_robots[0].pos;
        let marks = assign_marks(&w, 1, None);
        assert!(
            !marks.values().any(|p| dist2(*p, gk_pos) < 1e-9),
            "opponent GK must not be marked while not holding"
        );
    }

    #[test]
    fn test_empty_rosters_no_marks() {
        let mut w = World::default();
        w.ball.place((0.0, 0.0));
        assert!(assign_marks(&w, 1, None).is_empty());
    }
}
