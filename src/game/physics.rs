//! Player movement and contact resolution

use glam::DVec2;

use crate::ws::protocol::InputKeys;

use super::geometry::{circle_rect_intersect, Circle, Rect};

/// Movement constants. Units are world units per tick.
#[derive(Debug, Clone, Copy)]
pub struct MovementStats {
    /// Velocity added per tick for each held key
    pub acceleration: f64,
    /// Velocity multiplier applied every tick (< 1)
    pub friction: f64,
    /// Per-axis speed cap
    pub max_speed: f64,
}

impl Default for MovementStats {
    fn default() -> Self {
        Self {
            acceleration: 0.25,
            friction: 0.85,
            max_speed: 4.5,
        }
    }
}

/// Velocity impulse given to each player of a colliding pair
pub const PLAYER_COLLISION_IMPULSE: f64 = 1.0;
/// Velocity impulse given to a player bumping into a hazard
pub const HAZARD_KNOCKBACK: f64 = 1.5;

/// The movable part of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: DVec2,
    pub velocity: DVec2,
    pub radius: f64,
}

impl Body {
    pub fn circle(&self) -> Circle {
        Circle::new(self.position, self.radius)
    }
}

/// Physics system for updating player positions and velocities
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Apply held keys, friction and the speed cap to a velocity
    pub fn accelerate(velocity: DVec2, keys: InputKeys, stats: &MovementStats) -> DVec2 {
        let mut velocity = velocity;
        if keys.up {
            velocity.y -= stats.acceleration;
        }
        if keys.down {
            velocity.y += stats.acceleration;
        }
        if keys.left {
            velocity.x -= stats.acceleration;
        }
        if keys.right {
            velocity.x += stats.acceleration;
        }

        velocity *= stats.friction;

        DVec2::new(
            velocity.x.clamp(-stats.max_speed, stats.max_speed),
            velocity.y.clamp(-stats.max_speed, stats.max_speed),
        )
    }

    /// Push two overlapping players apart by half the overlap each and add an
    /// impulse along the collision normal. Non-overlapping pairs are returned unchanged.
    pub fn resolve_player_collision(a: Body, b: Body, impulse: f64) -> (Body, Body) {
        let delta = b.position - a.position;
        let dist = delta.length();
        let overlap = a.radius + b.radius - dist;
        if overlap <= 0.0 {
            return (a, b);
        }

        // Coincident centres: pick a fixed axis so the result stays deterministic
        let normal = if dist < 1e-9 { DVec2::X } else { delta / dist };
        let push = overlap / 2.0;

        let a = Body {
            position: a.position - normal * push,
            velocity: a.velocity - normal * impulse,
            ..a
        };
        let b = Body {
            position: b.position + normal * push,
            velocity: b.velocity + normal * impulse,
            ..b
        };
        (a, b)
    }

    /// Keep a body out of a solid rectangle. The body leaves along the axis
    /// with the smaller penetration and its velocity on that axis is turned outward.
    pub fn push_out_of_zone(body: Body, zone: Rect) -> Body {
        if !circle_rect_intersect(body.circle(), zone) {
            return body;
        }
        let (normal, depth) = Self::rect_exit(body, zone);
        let mut out = body;
        out.position += normal * depth;
        if normal.x != 0.0 {
            out.velocity.x = normal.x * body.velocity.x.abs();
        } else {
            out.velocity.y = normal.y * body.velocity.y.abs();
        }
        out
    }

    /// Separate a body from a hazard footprint and knock it back
    pub fn push_off_footprint(body: Body, footprint: Rect, knockback: f64) -> Body {
        let closest = footprint.closest_point(body.position);
        let delta = body.position - closest;
        let dist = delta.length();

        let (normal, depth) = if dist > 1e-9 {
            (delta / dist, (body.radius - dist).max(0.0))
        } else {
            Self::rect_exit(body, footprint)
        };

        Body {
            position: body.position + normal * depth,
            velocity: body.velocity + normal * knockback,
            ..body
        }
    }

    /// Shortest axis-aligned way out of a rectangle: (outward normal, distance)
    fn rect_exit(body: Body, rect: Rect) -> (DVec2, f64) {
        let r = body.radius;
        let pos = body.position;
        let to_left = pos.x + r - rect.x;
        let to_right = rect.right() - (pos.x - r);
        let to_top = pos.y + r - rect.y;
        let to_bottom = rect.bottom() - (pos.y - r);

        let (depth_x, dir_x) = if to_left <= to_right {
            (to_left, -1.0)
        } else {
            (to_right, 1.0)
        };
        let (depth_y, dir_y) = if to_top <= to_bottom {
            (to_top, -1.0)
        } else {
            (to_bottom, 1.0)
        };

        if depth_x <= depth_y {
            (DVec2::new(dir_x, 0.0), depth_x)
        } else {
            (DVec2::new(0.0, dir_y), depth_y)
        }
    }

    /// Clamp a body's centre to `[r, w - r] x [r, h - r]` inside `bounds`
    pub fn clamp_to_bounds(body: Body, bounds: Rect) -> Body {
        let r = body.radius;
        let x = body.position.x.max(bounds.x + r).min(bounds.right() - r);
        let y = body.position.y.max(bounds.y + r).min(bounds.bottom() - r);
        Body {
            position: DVec2::new(x, y),
            ..body
        }
    }

    /// Impulse pushing a victim away from the impact point.
    /// Falls back to `fallback_dir` (e.g. the projectile's heading) when the
    /// impact is exactly at the victim's centre.
    pub fn knockback(victim: DVec2, impact: DVec2, fallback_dir: DVec2, force: f64) -> DVec2 {
        let dir = (victim - impact)
            .try_normalize()
            .or_else(|| fallback_dir.try_normalize())
            .unwrap_or(DVec2::X);
        dir * force
    }
}
