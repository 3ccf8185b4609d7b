//! Possession / dribble state machine
//!
//! FREE -> OWNED when an eligible (non-banned) robot is within the control
//! radius of a slow ball; OWNED -> FREE on kick, on the owner drifting
//! past the detach radius, or on the owner vanishing. While owned, the
//! ball snaps to a fixed carry offset in front of the owner each tick,
//! with a wall-slide so a carried ball pinned against the boundary slides
//! laterally instead of sticking.
//!
//! The goalkeeper gets a protected hold window after trapping the ball and
//! is forced to distribute shortly before it expires. Failed steals and
//! fresh losers receive short pickup bans to damp oscillating contests.
//!
//! Invariant: at most one owner at any tick boundary; every attach/detach
//! goes through this module.

use std::collections::HashMap;

use super::config::{GoalkeeperConfig, PossessionConfig};
use super::geometry::{dist, dist2};
use super::physics_constants::field;
use super::world::{Point, Robot, RobotId, TeamSign, World};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Owner {
    pub id: RobotId,
    pub team: TeamSign,
}

#[derive(Clone, Copy, Debug)]
struct GkHold {
    owner_id: RobotId,
    team: TeamSign,
    until: f64,
}

#[derive(Clone, Copy, Debug)]
struct LostRecord {
    id: RobotId,
    team: TeamSign,
    at: f64,
}

/// Events surfaced to the engine so reward attribution can react.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PossessionEvent {
    /// A robot trapped the free ball. `stolen_from` is the team that lost
    /// the ball within the steal window, when the pickup was a turnover.
    Gained { id: RobotId, team: TeamSign, stolen_from: Option<TeamSign> },
    /// The keeper's forced distribution fired (ownership released).
    GkDistributed { team: TeamSign, receiver: Option<RobotId> },
}

#[derive(Default)]
pub struct PossessionState {
    owner: Option<Owner>,
    gk_hold: Option<GkHold>,
    recently_lost: Option<LostRecord>,
    pickup_bans: HashMap<RobotId, f64>,
}

impl PossessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full reset (kickoff, goal, debug ball placement).
    pub fn reset(&mut self) {
        self.owner = None;
        self.gk_hold = None;
        self.recently_lost = None;
        self.pickup_bans.clear();
    }

    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Deadline of the active goalkeeper hold window, if any.
    pub fn gk_hold_deadline(&self) -> Option<f64> {
        self.gk_hold.map(|h| h.until)
    }

    /// The current owner is a keeper inside its protected window.
    pub fn gk_hold_active(&self, now: f64) -> bool {
        match (self.owner, self.gk_hold) {
            (Some(o), Some(h)) => o.id == h.owner_id && now < h.until,
            _ => false,
        }
    }

    pub fn is_banned(&self, id: RobotId, now: f64) -> bool {
        self.pickup_bans.get(&id).map_or(false, |until| now < *until)
    }

    /// Ownership releases immediately on a kick so the ball can travel.
    pub fn release_on_kick(&mut self, id: RobotId, team: TeamSign) {
        if self.owner == Some(Owner { id, team }) {
            self.owner = None;
            if self.gk_hold.map_or(false, |h| h.owner_id == id) {
                self.gk_hold = None;
            }
        }
    }

    /// Stuck-contest breaker: strip ownership without a loss record.
    pub fn strip(&mut self) {
        self.owner = None;
        self.gk_hold = None;
    }

    /// Stuck-contest breaker: grant possession outright.
    pub fn award(&mut self, id: RobotId, team: TeamSign) {
        self.owner = Some(Owner { id, team });
        self.gk_hold = None;
    }

    /// Run one possession update after physics and collisions.
    pub fn update(
        &mut self,
        world: &mut World,
        cfg: &PossessionConfig,
        gk_cfg: &GoalkeeperConfig,
        now: f64,
    ) -> Vec<PossessionEvent> {
        let mut events = Vec::new();

        if let Some(owner) = self.owner {
            match find_robot(world, owner.id, owner.team) {
                None => {
                    // Owner disappeared: treat as lost possession.
                    self.note_loss(owner, now);
                }
                Some(owner_robot) => {
                    let owner_pos = owner_robot.pos;
                    let owner_fwd = owner_robot.forward();
                    let owner_is_gk = owner_robot.is_goalkeeper();

                    if owner_is_gk {
                        // Start/maintain the protected hold window.
                        let needs_new = self
                            .gk_hold
                            .map_or(true, |h| h.owner_id != owner.id || h.team != owner.team);
                        if needs_new {
                            self.gk_hold = Some(GkHold {
                                owner_id: owner.id,
                                team: owner.team,
                                until: now + gk_cfg.hold_duration_s.max(0.0),
                            });
                        }

                        // Force a pass shortly before the window closes so
                        // the keeper distributes instead of wandering.
                        let until = self.gk_hold.map(|h| h.until).unwrap_or(now);
                        if until - now <= gk_cfg.pass_lead_s {
                            let receiver =
                                pick_gk_receiver(world, owner.team, owner.id);
                            match receiver {
                                Some((_, rpos)) => {
                                    let dir = direction(world.ball.pos, rpos);
                                    world.ball.vel = (
                                        dir.0 * gk_cfg.pass_speed_mps,
                                        dir.1 * gk_cfg.pass_speed_mps,
                                    );
                                }
                                None => {
                                    // Nobody open: clear toward the opponent half.
                                    world.ball.vel =
                                        (gk_cfg.clear_speed_mps * owner.team as f32, 0.0);
                                }
                            }
                            self.owner = None;
                            self.gk_hold = None;
                            events.push(PossessionEvent::GkDistributed {
                                team: owner.team,
                                receiver: receiver.map(|(id, _)| id),
                            });
                            return events;
                        }
                    } else if self.gk_hold.map_or(false, |h| h.owner_id == owner.id) {
                        // Stale hold left behind by an id collision.
                        self.gk_hold = None;
                    }

                    let d2 = dist2(owner_pos, world.ball.pos);
                    if d2 > cfg.detach_dist_m * cfg.detach_dist_m {
                        // Owner drifted away.
                        self.note_loss(owner, now);
                    } else {
                        self.ban_failed_stealers(world, owner, now, cfg);
                        self.carry(world, owner_pos, owner_fwd, cfg);
                        return events;
                    }
                }
            }
        }

        // No (remaining) owner: try to attach.
        let attach2 =
            cfg.attach_max_speed_mps * cfg.attach_max_speed_mps;
        if world.ball.speed2() > attach2 {
            return events;
        }

        self.gc_bans(now);

        let mut best: Option<(RobotId, TeamSign, Point, f32, f32)> = None;
        for (team, roster) in [(1i8, &world.our_robots), (-1i8, &world.opp_robots)] {
            for r in roster {
                if self.is_banned(r.id, now) {
                    continue;
                }
                let d2 = dist2(r.pos, world.ball.pos);
                if best.map_or(true, |(_, _, _, _, bd2)| d2 < bd2) {
                    best = Some((r.id, team, r.pos, r.orientation, d2));
                }
            }
        }

        let Some((id, team, pos, orientation, d2)) = best else {
            return events;
        };
        if d2 > cfg.control_dist_m * cfg.control_dist_m {
            return events;
        }

        // Steal handling: ban the fresh loser so it cannot instantly re-take.
        let mut stolen_from = None;
        if let Some(lost) = self.recently_lost {
            if now - lost.at <= cfg.steal_window_s && lost.team != team && lost.id != id {
                self.pickup_bans.insert(lost.id, now + cfg.steal_loser_ban_s);
                stolen_from = Some(lost.team);
            }
        }

        self.owner = Some(Owner { id, team });
        self.recently_lost = None;
        events.push(PossessionEvent::Gained { id, team, stolen_from });

        // Keeper pickup starts its hold window immediately.
        if super::world::is_goalkeeper_id(id) {
            self.gk_hold =
                Some(GkHold { owner_id: id, team, until: now + gk_cfg.hold_duration_s.max(0.0) });
        }

        // Snap the ball to the carry point.
        let fwd = (orientation.cos(), orientation.sin());
        world.ball.pos =
            (pos.0 + fwd.0 * cfg.carry_offset_m, pos.1 + fwd.1 * cfg.carry_offset_m);
        world.ball.vel = (world.ball.vel.0 * 0.2, world.ball.vel.1 * 0.2);

        events
    }

    fn note_loss(&mut self, owner: Owner, now: f64) {
        if self.gk_hold.map_or(false, |h| h.owner_id == owner.id) {
            self.gk_hold = None;
        }
        self.recently_lost = Some(LostRecord { id: owner.id, team: owner.team, at: now });
        self.owner = None;
    }

    /// A non-GK opponent close enough to "try" a steal that doesn't change
    /// ownership gets a short pickup ban (damps oscillating contests).
    /// Never handed out while the keeper's protected hold is active.
    fn ban_failed_stealers(
        &mut self,
        world: &World,
        owner: Owner,
        now: f64,
        cfg: &PossessionConfig,
    ) {
        if self.gk_hold_active(now) {
            return;
        }
        let attach2 = cfg.attach_max_speed_mps * cfg.attach_max_speed_mps;
        if world.ball.speed2() > attach2 {
            return;
        }

        let stealers = world.opponents(owner.team);
        let mut closest: Option<(RobotId, f32)> = None;
        for s in stealers {
            if s.is_goalkeeper() {
                continue;
            }
            let d2 = dist2(s.pos, world.ball.pos);
            if closest.map_or(true, |(_, bd2)| d2 < bd2) {
                closest = Some((s.id, d2));
            }
        }
        if let Some((id, d2)) = closest {
            if d2 <= cfg.control_dist_m * cfg.control_dist_m && !self.is_banned(id, now) {
                self.pickup_bans.insert(id, now + cfg.failed_steal_ban_s);
            }
        }
    }

    /// Carry model: ball snaps in front of the owner with a wall-slide so
    /// it never pins into the boundary.
    fn carry(&self, world: &mut World, owner_pos: Point, fwd: Point, cfg: &PossessionConfig) {
        let bx = owner_pos.0 + fwd.0 * cfg.carry_offset_m;
        let by = owner_pos.1 + fwd.1 * cfg.carry_offset_m;

        let margin = 0.02;
        let mut cx = bx.clamp(-field::HALF_LENGTH_M + margin, field::HALF_LENGTH_M - margin);
        let mut cy = by.clamp(-field::HALF_WIDTH_M + margin, field::HALF_WIDTH_M - margin);

        let hit_wall_x = (bx - cx).abs() > 1e-9;
        let hit_wall_y = (by - cy).abs() > 1e-9;
        if hit_wall_x || hit_wall_y {
            // Slide perpendicular to the owner's facing; side by id parity.
            let lat = (-fwd.1, fwd.0);
            let owner_id = self.owner.map(|o| o.id).unwrap_or(0);
            let slide = if owner_id.rem_euclid(2) == 0 { 0.03 } else { -0.03 };
            if hit_wall_x {
                cy = (cy + lat.1 * slide)
                    .clamp(-field::HALF_WIDTH_M + margin, field::HALF_WIDTH_M - margin);
            }
            if hit_wall_y {
                cx = (cx + lat.0 * slide)
                    .clamp(-field::HALF_LENGTH_M + margin, field::HALF_LENGTH_M - margin);
            }
        }

        world.ball.pos = (cx, cy);
        world.ball.vel = (world.ball.vel.0 * 0.4, world.ball.vel.1 * 0.4);
    }

    fn gc_bans(&mut self, now: f64) {
        self.pickup_bans.retain(|_, until| now < *until);
    }
}

fn find_robot(world: &World, id: RobotId, team: TeamSign) -> Option<Robot> {
    world.find_robot(id, team).copied()
}

fn direction(from: Point, to: Point) -> Point {
    let d = dist(from, to);
    if d < 1e-6 {
        (0.0, 0.0)
    } else {
        ((to.0 - from.0) / d, (to.1 - from.1) / d)
    }
}

/// Keeper distribution target: open, forward, medium-range teammates.
fn pick_gk_receiver(world: &World, team: TeamSign, exclude: RobotId) -> Option<(RobotId, Point)> {
    let ball = world.ball.pos;
    let opps = world.opponents(team);
    let mut best: Option<(RobotId, Point, f32)> = None;

    for r in world.mates(team) {
        if r.id == exclude || r.is_goalkeeper() {
            continue;
        }
        let d_ball = dist(r.pos, ball);
        if d_ball < 0.65 {
            continue; // too close to pass
        }

        let nearest_opp = super::geometry::nearest_robot_distance(opps, r.pos);
        let open_score = nearest_opp.clamp(0.0, 3.0) * 0.55;
        let forward_score = (r.pos.0 * team as f32).clamp(-3.0, 6.0) * 0.35;
        let range_score = -(d_ball - 2.0).abs() * 0.35;
        let score = open_score + forward_score + range_score;

        if best.map_or(true, |(_, _, bs)| score > bs) {
            best = Some((r.id, r.pos, score));
        }
    }
    best.map(|(id, pos, _)| (id, pos))
}
