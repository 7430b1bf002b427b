//! Combat system - projectiles, hit detection, weapon cooldown

use glam::DVec2;

use crate::config::PenetrationPolicy;
use crate::util::time::elapsed_ms;
use crate::ws::protocol::{HazardId, HazardTier, PlayerId, ProjectileId};

use super::geometry::{circle_rect_intersect, circles_overlap, Circle, Rect};
use super::physics::Body;

/// Weapon stats shared by every player
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Minimum time between two shots (ms)
    pub cooldown_ms: u64,
    /// Projectile speed (units per tick)
    pub projectile_speed: f64,
    pub projectile_radius: f64,
    /// Starting damage strength
    pub projectile_strength: f64,
    /// Extra distance past the shooter's radius where projectiles appear
    pub muzzle_offset: f64,
    /// Impulse given to a player hit by a projectile
    pub knockback: f64,
    /// How long a stopped projectile stays visible (ms)
    pub fade_duration_ms: u64,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            cooldown_ms: 250,
            projectile_speed: 10.0,
            projectile_radius: 10.0,
            projectile_strength: 20.0,
            muzzle_offset: 0.0,
            knockback: 0.5,
            fade_duration_ms: 1_000,
        }
    }
}

/// Lifecycle of a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileState {
    /// Moving and able to hit things
    Active,
    /// Stopped at the map edge or a wall, removed after the fade duration
    Fading { since: u64 },
    /// Strength used up; removed at the end of the tick
    Spent,
}

/// Something a projectile can strike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Player(PlayerId),
    Hazard(HazardTier, HazardId),
}

/// Projectile in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub body: Body,
    /// Remaining damage strength
    pub strength: f64,
    pub color: String,
    state: ProjectileState,
    struck: Vec<Target>,
}

impl Projectile {
    /// Spawn at the shooter's edge, heading along `angle`
    pub fn new(
        id: ProjectileId,
        owner_id: PlayerId,
        shooter: Body,
        angle: f64,
        color: String,
        stats: &WeaponStats,
    ) -> Self {
        let dir = DVec2::from_angle(angle);
        Self {
            id,
            owner_id,
            body: Body {
                position: shooter.position + dir * (shooter.radius + stats.muzzle_offset),
                velocity: dir * stats.projectile_speed,
                radius: stats.projectile_radius,
            },
            strength: stats.projectile_strength,
            color,
            state: ProjectileState::Active,
            struck: Vec::new(),
        }
    }

    pub fn state(&self) -> ProjectileState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ProjectileState::Active
    }

    pub fn circle(&self) -> Circle {
        self.body.circle()
    }

    /// Move one tick. Only active projectiles move.
    pub fn advance(&mut self) {
        if self.is_active() {
            self.body.position += self.body.velocity;
        }
    }

    /// Freeze in place and start fading
    pub fn start_fading(&mut self, now: u64) {
        if self.is_active() {
            self.body.velocity = DVec2::ZERO;
            self.state = ProjectileState::Fading { since: now };
        }
    }

    pub fn mark_spent(&mut self) {
        self.state = ProjectileState::Spent;
    }

    /// True once the projectile has faded for at least `duration_ms`
    pub fn fade_expired(&self, now: u64, duration_ms: u64) -> bool {
        match self.state {
            ProjectileState::Fading { since } => elapsed_ms(since, now) >= duration_ms,
            _ => false,
        }
    }

    pub fn has_struck(&self, target: Target) -> bool {
        self.struck.contains(&target)
    }

    /// Record a damaging hit and weaken the projectile according to `policy`.
    /// Returns true when the projectile is spent.
    pub fn register_hit(
        &mut self,
        target: Target,
        target_strength: f64,
        policy: PenetrationPolicy,
    ) -> bool {
        self.struck.push(target);
        let spent = match policy {
            PenetrationPolicy::Consume => true,
            PenetrationPolicy::Penetrate => {
                self.strength = (self.strength - target_strength).max(0.0);
                self.strength <= 0.0
            }
        };
        if spent {
            self.mark_spent();
        }
        spent
    }
}

/// Combat system for weapons and hit detection
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire (cooldown check)
    pub fn can_fire(last_shot_at: Option<u64>, now: u64, cooldown_ms: u64) -> bool {
        match last_shot_at {
            Some(at) => elapsed_ms(at, now) >= cooldown_ms,
            None => true,
        }
    }

    /// Check collision with a circular target
    pub fn hits_circle(projectile: &Projectile, target: Circle) -> bool {
        circles_overlap(projectile.circle(), target)
    }

    /// Check collision with a rectangular footprint
    pub fn hits_footprint(projectile: &Projectile, footprint: Rect) -> bool {
        circle_rect_intersect(projectile.circle(), footprint)
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub projectile_id: ProjectileId,
    pub shooter_id: PlayerId,
    pub target: Target,
    pub damage: f64,
    pub destroyed: bool,
}
