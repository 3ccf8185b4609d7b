//! Geometry primitives shared by the scorers and behaviors
//!
//! These are deliberately allocation-free helpers over `(f32, f32)` tuples.
//! Every function that divides guards against degenerate inputs first.

use super::physics_constants::eps;
use super::world::{Point, Robot, World};

#[inline]
pub fn dist2(a: Point, b: Point) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

#[inline]
pub fn dist(a: Point, b: Point) -> f32 {
    dist2(a, b).sqrt()
}

#[inline]
pub fn magnitude(v: Point) -> f32 {
    (v.0 * v.0 + v.1 * v.1).sqrt()
}

/// Normalize to unit length; returns (0,0) for near-zero vectors.
#[inline]
pub fn normalize(v: Point) -> Point {
    let len = magnitude(v);
    if len < eps::DIR {
        (0.0, 0.0)
    } else {
        (v.0 / len, v.1 / len)
    }
}

/// Closest robot of a list to a point.
pub fn closest_robot(robots: &[Robot], p: Point) -> Option<&Robot> {
    World::closest_to(robots, p).map(|(r, _)| r)
}

/// Distance from a point to the nearest robot in a list.
/// Returns a large sentinel (9.0) when the list is empty, so openness
/// terms saturate instead of failing.
pub fn nearest_robot_distance(robots: &[Robot], p: Point) -> f32 {
    World::closest_to(robots, p).map_or(9.0, |(_, d2)| d2.sqrt())
}

/// Same as `nearest_robot_distance` but skipping one id (self spacing).
pub fn nearest_robot_distance_excluding(robots: &[Robot], p: Point, exclude: i32) -> f32 {
    let mut best = 9.0f32;
    for r in robots {
        if r.id == exclude {
            continue;
        }
        let d = dist(r.pos, p);
        if d < best {
            best = d;
        }
    }
    best
}

/// Closest point to `p` on segment a-b.
pub fn closest_point_on_segment(a: Point, b: Point, p: Point) -> Point {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (p.0 - a.0, p.1 - a.1);

    let ab2 = ab.0 * ab.0 + ab.1 * ab.1;
    if ab2 <= eps::SEG2 {
        return a;
    }

    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / ab2).clamp(0.0, 1.0);
    (a.0 + t * ab.0, a.1 + t * ab.1)
}

/// Distance from `p` to segment a-b.
pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f32 {
    dist(p, closest_point_on_segment(a, b, p))
}

/// True when any robot in `opps` sits within `danger_radius` of segment a-b.
pub fn segment_blocked(a: Point, b: Point, opps: &[Robot], danger_radius: f32) -> bool {
    let danger2 = danger_radius * danger_radius;
    for o in opps {
        let c = closest_point_on_segment(a, b, o.pos);
        if dist2(o.pos, c) < danger2 {
            return true;
        }
    }
    false
}

/// Minimum clearance of any robot in `opps` to segment a-b.
/// Large sentinel (9.0) when the list is empty.
pub fn lane_clearance(a: Point, b: Point, opps: &[Robot]) -> f32 {
    let mut best = 9.0f32;
    for o in opps {
        let d = distance_point_to_segment(o.pos, a, b);
        if d < best {
            best = d;
        }
    }
    best
}

/// Straight-line ball projection after `t_sec` under current velocity
/// (no deceleration; intentionally optimistic for anticipation terms).
pub fn predict_ball_pos(world: &World, t_sec: f32) -> Point {
    let b = &world.ball;
    (b.pos.0 + b.vel.0 * t_sec, b.pos.1 + b.vel.1 * t_sec)
}

/// Rough pass interception test: can any opponent reach within
/// `capture_radius` of the pass segment before the ball passes that point?
/// Robots are assumed to run straight at `opp_max_speed`; the ball travels
/// at a constant `ball_speed` (no deceleration for this estimate).
pub fn pass_interceptable(
    a: Point,
    b: Point,
    opps: &[Robot],
    ball_speed: f32,
    opp_max_speed: f32,
    capture_radius: f32,
) -> bool {
    if opps.is_empty() {
        return false;
    }
    let seg_len = dist(a, b);
    if seg_len < eps::DIR {
        return false;
    }
    let travel_time = seg_len / ball_speed.max(0.1);

    for o in opps {
        // Best intercept point is the closest point on the segment.
        let p = closest_point_on_segment(a, b, o.pos);
        let od = dist(o.pos, p);

        // Time for the opponent to reach the capture radius of that point.
        let need = (od - capture_radius).max(0.0);
        let t_opp = need / opp_max_speed.max(0.1);

        // Time for the ball to arrive at that point (distance along segment).
        let along = dist(a, p);
        let t_ball = along / ball_speed.max(0.1);

        if t_opp < t_ball && t_ball <= travel_time + 1e-6 {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::world::Robot;

    fn robot_at(id: i32, x: f32, y: f32) -> Robot {
        Robot::new(id, x, y, 0.0)
    }

    #[test]
    fn test_closest_point_on_segment_interior_and_ends() {
        let a = (0.0, 0.0);
        let b = (10.0, 0.0);

        let mid = closest_point_on_segment(a, b, (5.0, 3.0));
        assert!((mid.0 - 5.0).abs() < 1e-6);
        assert!(mid.1.abs() < 1e-6);

        // Beyond the ends the projection clamps to the endpoints.
        let before = closest_point_on_segment(a, b, (-4.0, 1.0));
        assert_eq!(before, a);
        let after = closest_point_on_segment(a, b, (14.0, -1.0));
        assert_eq!(after, b);
    }

    #[test]
    fn test_closest_point_degenerate_segment() {
        let a = (2.0, 2.0);
        let p = closest_point_on_segment(a, a, (5.0, 5.0));
        assert_eq!(p, a);
    }

    #[test]
    fn test_segment_blocked_detects_interposed_robot() {
        let opps = vec![robot_at(20, 5.0, 0.1)];
        assert!(segment_blocked((0.0, 0.0), (10.0, 0.0), &opps, 0.3));
        assert!(!segment_blocked((0.0, 0.0), (10.0, 0.0), &opps, 0.05));
        // Robot far off the lane does not block.
        let far = vec![robot_at(21, 5.0, 2.0)];
        assert!(!segment_blocked((0.0, 0.0), (10.0, 0.0), &far, 0.3));
    }

    #[test]
    fn test_segment_blocked_symmetric() {
        let opps = vec![robot_at(20, 3.0, 0.2), robot_at(21, 7.0, -1.0)];
        let a = (0.5, -0.3);
        let b = (8.0, 1.1);
        for r in [0.1f32, 0.3, 0.6, 1.2] {
            assert_eq!(
                segment_blocked(a, b, &opps, r),
                segment_blocked(b, a, &opps, r),
                "blocked test must not depend on segment direction (r={r})"
            );
        }
    }

    #[test]
    fn test_pass_interceptable_race() {
        // Opponent sitting right on the lane intercepts a slow pass...
        let on_lane = vec![robot_at(20, 2.0, 0.4)];
        assert!(pass_interceptable((0.0, 0.0), (4.0, 0.0), &on_lane, 1.0, 1.55, 0.18));
        // ...but not a fast one launched past it.
        assert!(!pass_interceptable((0.0, 0.0), (4.0, 0.0), &on_lane, 50.0, 1.55, 0.18));
        // Distant opponent cannot make the race at all.
        let far = vec![robot_at(21, 2.0, 5.0)];
        assert!(!pass_interceptable((0.0, 0.0), (4.0, 0.0), &far, 1.0, 1.55, 0.18));
    }

    #[test]
    fn test_lane_clearance_and_sentinels() {
        assert_eq!(lane_clearance((0.0, 0.0), (1.0, 0.0), &[]), 9.0);
        assert_eq!(nearest_robot_distance(&[], (0.0, 0.0)), 9.0);
        let opps = vec![robot_at(20, 0.5, 0.7)];
        assert!((lane_clearance((0.0, 0.0), (1.0, 0.0), &opps) - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_zero_guard() {
        assert_eq!(normalize((0.0, 0.0)), (0.0, 0.0));
        let n = normalize((3.0, 4.0));
        assert!((magnitude(n) - 1.0).abs() < 1e-6);
    }

    #[cfg(feature = "proptest")]
    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// segment_blocked(A,B) == segment_blocked(B,A) for arbitrary inputs
            #[test]
            fn prop_segment_blocked_symmetry(
                ax in -4.5f32..4.5, ay in -3.0f32..3.0,
                bx in -4.5f32..4.5, by in -3.0f32..3.0,
                ox in -4.5f32..4.5, oy in -3.0f32..3.0,
                r in 0.01f32..1.5,
            ) {
                let opps = vec![Robot::new(20, ox, oy, 0.0)];
                prop_assert_eq!(
                    segment_blocked((ax, ay), (bx, by), &opps, r),
                    segment_blocked((bx, by), (ax, ay), &opps, r)
                );
            }

            /// the projected point always lies within the segment's bounding box
            #[test]
            fn prop_projection_in_bounds(
                ax in -4.5f32..4.5, ay in -3.0f32..3.0,
                bx in -4.5f32..4.5, by in -3.0f32..3.0,
                px in -9.0f32..9.0, py in -9.0f32..9.0,
            ) {
                let p = closest_point_on_segment((ax, ay), (bx, by), (px, py));
                prop_assert!(p.0 >= ax.min(bx) - 1e-4 && p.0 <= ax.max(bx) + 1e-4);
                prop_assert!(p.1 >= ay.min(by) - 1e-4 && p.1 <= ay.max(by) + 1e-4);
            }
        }
    }
}
