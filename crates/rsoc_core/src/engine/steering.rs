//! Steering helpers (minimal set)
//!
//! These return desired-velocity vectors for the Command layer; the physics
//! engine clamps and integrates them. Straight-line steering plus local
//! repulsion only -- there is deliberately no path planning here.

use super::geometry::normalize;
use super::world::{Point, Robot};

/// Seek: move toward a target at the given speed.
pub fn seek(current: Point, target: Point, speed: f32) -> Point {
    if speed <= 0.0 {
        return (0.0, 0.0);
    }
    let dir = normalize((target.0 - current.0, target.1 - current.1));
    (dir.0 * speed, dir.1 * speed)
}

/// Seek with a dead zone: stop when already at the target.
pub fn seek_or_hold(current: Point, target: Point, speed: f32, hold_radius: f32) -> Point {
    let dx = target.0 - current.0;
    let dy = target.1 - current.1;
    if (dx * dx + dy * dy).sqrt() < hold_radius {
        return (0.0, 0.0);
    }
    seek(current, target, speed)
}

/// Summed repulsion away from nearby robots. Pushes hard inside `keep`
/// distance, fades to zero at twice that range.
pub fn repulsion(this: &Robot, robots: &[Robot], keep: f32) -> Point {
    let keep2 = keep * keep;
    let influence = keep * 2.0;
    let influence2 = influence * influence;

    let mut rx = 0.0;
    let mut ry = 0.0;
    for r in robots {
        if r.id == this.id {
            continue;
        }
        let dx = this.pos.0 - r.pos.0;
        let dy = this.pos.1 - r.pos.1;
        let d2 = dx * dx + dy * dy;
        if d2 < 1e-9 || d2 > influence2 {
            continue;
        }
        let w = if d2 < keep2 { 1.0 } else { (influence2 - d2) / (influence2 - keep2) };
        let d = d2.sqrt();
        rx += (dx / d) * w;
        ry += (dy / d) * w;
    }
    (rx, ry)
}

/// Seek blended with repulsion from all listed robots, capped at `speed`.
pub fn seek_with_avoidance(
    this: &Robot,
    target: Point,
    speed: f32,
    keep: f32,
    repel_gain: f32,
    all_robots: &[&[Robot]],
) -> Point {
    let dx = target.0 - this.pos.0;
    let dy = target.1 - this.pos.1;
    let dist = (dx * dx + dy * dy).sqrt();

    let mut vx = 0.0;
    let mut vy = 0.0;
    if dist >= 0.05 {
        vx = (dx / dist) * speed;
        vy = (dy / dist) * speed;
    }

    for list in all_robots {
        let r = repulsion(this, list, keep);
        vx += r.0 * repel_gain;
        vy += r.1 * repel_gain;
    }

    let mag = (vx * vx + vy * vy).sqrt();
    if mag > speed && mag > 1e-9 {
        vx = vx / mag * speed;
        vy = vy / mag * speed;
    }
    (vx, vy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_direction() {
        let v = seek((0.0, 0.0), (10.0, 0.0), 5.0);
        assert!(v.0 > 0.0);
        assert_eq!(v.1, 0.0);
    }

    #[test]
    fn test_seek_zero_speed() {
        assert_eq!(seek((0.0, 0.0), (1.0, 1.0), 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_seek_or_hold_dead_zone() {
        let v = seek_or_hold((1.0, 1.0), (1.01, 1.0), 2.0, 0.05);
        assert_eq!(v, (0.0, 0.0));
    }

    #[test]
    fn test_repulsion_pushes_away() {
        let this = Robot::new(1, 0.0, 0.0, 0.0);
        let others = vec![Robot::new(2, 0.1, 0.0, 0.0)];
        let r = repulsion(&this, &others, 0.3);
        assert!(r.0 < 0.0, "must push away from a robot on the +x side");
    }

    #[test]
    fn test_repulsion_ignores_self_and_far() {
        let this = Robot::new(1, 0.0, 0.0, 0.0);
        let others = vec![Robot::new(1, 0.1, 0.0, 0.0), Robot::new(2, 5.0, 0.0, 0.0)];
        assert_eq!(repulsion(&this, &others, 0.3), (0.0, 0.0));
    }

    #[test]
    fn test_seek_with_avoidance_speed_cap() {
        let this = Robot::new(1, 0.0, 0.0, 0.0);
        let blockers = vec![Robot::new(2, 0.2, 0.05, 0.0)];
        let v = seek_with_avoidance(&this, (5.0, 0.0), 1.4, 0.216, 1.2, &[&blockers]);
        let mag = (v.0 * v.0 + v.1 * v.1).sqrt();
        assert!(mag <= 1.4 + 1e-5);
        // Still generally forward.
        assert!(v.0 > 0.0);
    }
}
