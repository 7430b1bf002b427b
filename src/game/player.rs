//! Player entity and its vital statistics

use std::collections::VecDeque;

use glam::DVec2;
use uuid::Uuid;

use crate::config::RadiusRule;
use crate::util::time::elapsed_ms;
use crate::ws::protocol::{InputKeys, PlayerId};

use super::combat::CombatSystem;
use super::geometry::Circle;
use super::physics::Body;

pub const MAX_HEALTH: f64 = 100.0;
/// Time without damage before health starts coming back
pub const HP_REGEN_DELAY_MS: u64 = 20_000;
/// Health regained per tick once regeneration is active
pub const HP_REGEN_RATE: f64 = 0.05;
/// Damage each player of an overlapping pair takes per tick
pub const PLAYER_COLLISION_DAMAGE: f64 = 1.0;
/// Strength a penetrating projectile loses when it passes through a player
pub const PLAYER_DEFENSE_STRENGTH: f64 = 10.0;
pub const BASE_RADIUS: f64 = 25.0;
pub const MAX_RADIUS: f64 = 60.0;
/// Radius growth per square root of score under `RadiusRule::ScoreScaled`
const RADIUS_PER_SQRT_SCORE: f64 = 0.25;

pub const CHAT_LIFETIME_MS: u64 = 5_000;
pub const MAX_CHAT_LINES: usize = 5;

pub const COLOR_POOL: [&str; 8] = [
    "#ff6b6b", "#ffd166", "#06d6a0", "#4dabf7", "#f06595", "#845ef7", "#20c997", "#fcc419",
];

/// Lifecycle of a player inside the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Alive,
    /// Health reached zero; the player is evicted at the end of the tick
    Eliminated { at: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub text: String,
    pub sent_at: u64,
}

/// Authoritative player state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub connection_id: Uuid,
    pub name: String,
    pub color: String,
    pub body: Body,
    /// Aim angle in radians
    pub aim_angle: f64,
    health: f64,
    pub max_health: f64,
    pub score: f64,
    pub last_damage_at: Option<u64>,
    pub last_shot_at: Option<u64>,
    pub keys: InputKeys,
    pub chat: VecDeque<ChatLine>,
    status: PlayerStatus,
}

impl Player {
    pub fn new(id: PlayerId, connection_id: Uuid, name: String, position: DVec2) -> Self {
        Self {
            id,
            connection_id,
            name,
            color: COLOR_POOL[(id % COLOR_POOL.len() as u64) as usize].to_string(),
            body: Body {
                position,
                velocity: DVec2::ZERO,
                radius: BASE_RADIUS,
            },
            aim_angle: 0.0,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            score: 0.0,
            last_damage_at: None,
            last_shot_at: None,
            keys: InputKeys::default(),
            chat: VecDeque::new(),
            status: PlayerStatus::Alive,
        }
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn is_alive(&self) -> bool {
        self.status == PlayerStatus::Alive
    }

    pub fn is_depleted(&self) -> bool {
        self.health <= 0.0
    }

    pub fn circle(&self) -> Circle {
        self.body.circle()
    }

    /// Subtract health (never below zero) and stamp the damage time.
    /// Returns true when this hit left the player with no health.
    pub fn apply_damage(&mut self, amount: f64, now: u64) -> bool {
        if !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        self.last_damage_at = Some(now);
        self.is_depleted()
    }

    /// Linear regeneration once `HP_REGEN_DELAY_MS` passed without damage
    pub fn regenerate(&mut self, now: u64) {
        if self.health >= self.max_health {
            return;
        }
        let rested = match self.last_damage_at {
            Some(at) => elapsed_ms(at, now) > HP_REGEN_DELAY_MS,
            None => true,
        };
        if rested {
            self.health = (self.health + HP_REGEN_RATE).min(self.max_health);
        }
    }

    /// Move to `Eliminated`. Returns false when the player was already eliminated.
    pub fn eliminate(&mut self, now: u64) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.status = PlayerStatus::Eliminated { at: now };
        true
    }

    pub fn award(&mut self, points: f64) {
        if points.is_finite() {
            self.score += points;
        }
    }

    pub fn can_shoot(&self, now: u64, cooldown_ms: u64) -> bool {
        CombatSystem::can_fire(self.last_shot_at, now, cooldown_ms)
    }

    /// Append a chat line, dropping the oldest beyond `MAX_CHAT_LINES`
    pub fn push_chat(&mut self, text: String, now: u64) {
        self.chat.push_back(ChatLine { text, sent_at: now });
        while self.chat.len() > MAX_CHAT_LINES {
            self.chat.pop_front();
        }
    }

    pub fn prune_chat(&mut self, now: u64) {
        self.chat
            .retain(|line| elapsed_ms(line.sent_at, now) < CHAT_LIFETIME_MS);
    }

    pub fn update_radius(&mut self, rule: RadiusRule) {
        self.body.radius = match rule {
            RadiusRule::Fixed => BASE_RADIUS,
            RadiusRule::ScoreScaled => radius_for_score(self.score),
        };
    }

    #[cfg(test)]
    pub(crate) fn set_health(&mut self, health: f64) {
        self.health = health.clamp(0.0, self.max_health);
    }
}

/// Radius under `RadiusRule::ScoreScaled`
pub fn radius_for_score(score: f64) -> f64 {
    (BASE_RADIUS + score.max(0.0).sqrt() * RADIUS_PER_SQRT_SCORE).min(MAX_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(0, Uuid::new_v4(), "tester".to_string(), DVec2::new(500.0, 500.0))
    }

    #[test]
    fn damage_never_drops_health_below_zero() {
        let mut p = player();
        assert!(!p.apply_damage(40.0, 10));
        assert_eq!(p.health(), 60.0);
        assert!(p.apply_damage(1_000.0, 20));
        assert_eq!(p.health(), 0.0);
        assert_eq!(p.last_damage_at, Some(20));
    }

    #[test]
    fn invalid_damage_is_ignored() {
        let mut p = player();
        assert!(!p.apply_damage(f64::NAN, 10));
        assert!(!p.apply_damage(-5.0, 10));
        assert_eq!(p.health(), MAX_HEALTH);
        assert_eq!(p.last_damage_at, None);
    }

    #[test]
    fn regeneration_waits_for_the_delay_and_caps_at_max() {
        let mut p = player();
        p.apply_damage(0.02, 1_000);
        p.regenerate(1_000 + HP_REGEN_DELAY_MS);
        assert_eq!(p.health(), MAX_HEALTH - 0.02);

        p.regenerate(1_001 + HP_REGEN_DELAY_MS);
        assert_eq!(p.health(), MAX_HEALTH);
    }

    #[test]
    fn elimination_happens_once() {
        let mut p = player();
        assert!(p.eliminate(5));
        assert!(!p.eliminate(6));
        assert_eq!(p.status(), PlayerStatus::Eliminated { at: 5 });
    }

    #[test]
    fn chat_queue_is_bounded_and_expires() {
        let mut p = player();
        for n in 0..8 {
            p.push_chat(format!("line {n}"), 1_000 + n);
        }
        assert_eq!(p.chat.len(), MAX_CHAT_LINES);
        assert_eq!(p.chat.front().map(|line| line.text.as_str()), Some("line 3"));

        p.prune_chat(1_004 + CHAT_LIFETIME_MS);
        assert_eq!(p.chat.len(), 3);
        p.prune_chat(10_000 + CHAT_LIFETIME_MS);
        assert!(p.chat.is_empty());
    }

    #[test]
    fn shot_cooldown_guard() {
        let mut p = player();
        assert!(p.can_shoot(0, 250));
        p.last_shot_at = Some(1_000);
        assert!(!p.can_shoot(1_249, 250));
        assert!(p.can_shoot(1_250, 250));
    }

    #[test]
    fn score_scaled_radius_grows_and_caps() {
        assert_eq!(radius_for_score(0.0), BASE_RADIUS);
        assert_eq!(radius_for_score(400.0), BASE_RADIUS + 5.0);
        assert_eq!(radius_for_score(1e9), MAX_RADIUS);
        assert_eq!(radius_for_score(-50.0), BASE_RADIUS);
    }
}
