//! Destructible world objects and their per-tier stats

use glam::DVec2;

use crate::ws::protocol::{HazardId, HazardTier, Rarity};

use super::geometry::Rect;
use super::registry::Registry;

/// Damage a hazard takes per tick of contact with a player
pub const BODY_DAMAGE: f64 = 5.0;
/// Chance that a freshly placed hazard is shiny
pub const SHINY_CHANCE: f64 = 0.05;
/// Shiny score is drawn from this multiple range of the tier score
pub const SHINY_SCORE_RANGE: (f64, f64) = (4.0, 6.0);

/// Stats shared by every hazard of a tier
#[derive(Debug, Clone, Copy)]
pub struct TierStats {
    /// Side of the square footprint
    pub size: f64,
    /// Strength subtracted from a penetrating projectile
    pub strength: f64,
    pub score: f64,
    /// `None` for one-shot tiers
    pub health: Option<f64>,
    /// Population cap
    pub cap: usize,
    pub spawn_period_ms: u64,
    /// Damage dealt to a touching player per tick
    pub contact_damage: f64,
    /// Margin kept from the map edges when placing in the field
    pub padding: f64,
    pub color: &'static str,
    pub shiny_color: &'static str,
}

impl TierStats {
    pub fn for_tier(tier: HazardTier) -> Self {
        match tier {
            HazardTier::Small => Self {
                size: 20.0,
                strength: 5.0,
                score: 5.0,
                health: None,
                cap: 10,
                spawn_period_ms: 5_000,
                contact_damage: 1.0,
                padding: 10.0,
                color: "#ffe869",
                shiny_color: "#8aff69",
            },
            HazardTier::Medium => Self {
                size: 40.0,
                strength: 15.0,
                score: 15.0,
                health: Some(15.0),
                cap: 5,
                spawn_period_ms: 6_000,
                contact_damage: 2.0,
                padding: 10.0,
                color: "#fc7677",
                shiny_color: "#76fcf0",
            },
            HazardTier::Large => Self {
                size: 50.0,
                strength: 50.0,
                score: 20.0,
                health: Some(50.0),
                cap: 3,
                spawn_period_ms: 8_000,
                contact_damage: 3.0,
                padding: 0.0,
                color: "#768dfc",
                shiny_color: "#e5fc76",
            },
        }
    }
}

/// A destructible block with a square footprint
#[derive(Debug, Clone, PartialEq)]
pub struct Hazard {
    pub id: HazardId,
    pub tier: HazardTier,
    /// Top-left corner of the footprint
    pub position: DVec2,
    pub size: f64,
    pub strength: f64,
    pub score: f64,
    health: Option<f64>,
    pub max_health: Option<f64>,
    pub rarity: Rarity,
    pub color: String,
}

impl Hazard {
    pub fn new(id: HazardId, tier: HazardTier, position: DVec2, rarity: Rarity, score: f64) -> Self {
        let stats = TierStats::for_tier(tier);
        let color = match rarity {
            Rarity::Common => stats.color,
            Rarity::Shiny => stats.shiny_color,
        };
        Self {
            id,
            tier,
            position,
            size: stats.size,
            strength: stats.strength,
            score,
            health: stats.health,
            max_health: stats.health,
            rarity,
            color: color.to_string(),
        }
    }

    pub fn health(&self) -> Option<f64> {
        self.health
    }

    pub fn footprint(&self) -> Rect {
        Rect::square(self.position, self.size)
    }

    /// Apply damage. One-shot hazards are destroyed by any hit.
    /// Returns true when the hazard is destroyed.
    pub fn take_damage(&mut self, amount: f64) -> bool {
        match self.health.as_mut() {
            None => true,
            Some(health) => {
                if amount.is_finite() && amount > 0.0 {
                    *health = (*health - amount).max(0.0);
                }
                *health <= 0.0
            }
        }
    }
}

/// One registry per tier, each with its own id counter
#[derive(Debug, Clone, Default)]
pub struct Hazards {
    tiers: [Registry<Hazard>; 3],
}

impl Hazards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, tier: HazardTier) -> &Registry<Hazard> {
        &self.tiers[tier.index()]
    }

    pub fn tier_mut(&mut self, tier: HazardTier) -> &mut Registry<Hazard> {
        &mut self.tiers[tier.index()]
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(Registry::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_tier_dies_on_any_hit() {
        let mut small = Hazard::new(0, HazardTier::Small, DVec2::ZERO, Rarity::Common, 5.0);
        assert_eq!(small.health(), None);
        assert!(small.take_damage(0.5));
    }

    #[test]
    fn health_tiers_absorb_damage_until_zero() {
        let mut medium = Hazard::new(0, HazardTier::Medium, DVec2::ZERO, Rarity::Common, 15.0);
        assert!(!medium.take_damage(10.0));
        assert_eq!(medium.health(), Some(5.0));
        assert!(medium.take_damage(20.0));
        assert_eq!(medium.health(), Some(0.0));
    }

    #[test]
    fn shiny_hazards_use_the_alternate_colour() {
        let stats = TierStats::for_tier(HazardTier::Large);
        let shiny = Hazard::new(0, HazardTier::Large, DVec2::ZERO, Rarity::Shiny, 100.0);
        assert_eq!(shiny.color, stats.shiny_color);
        assert_eq!(shiny.score, 100.0);
    }

    #[test]
    fn footprint_is_anchored_at_top_left() {
        let h = Hazard::new(0, HazardTier::Medium, DVec2::new(10.0, 20.0), Rarity::Common, 15.0);
        assert_eq!(h.footprint(), Rect::new(10.0, 20.0, 40.0, 40.0));
    }

    #[test]
    fn tier_counters_are_independent() {
        fn insert(hazards: &mut Hazards, tier: HazardTier) -> HazardId {
            hazards
                .tier_mut(tier)
                .insert_with(|id| Hazard::new(id, tier, DVec2::ZERO, Rarity::Common, 1.0))
        }

        let mut hazards = Hazards::new();
        insert(&mut hazards, HazardTier::Small);
        insert(&mut hazards, HazardTier::Small);
        let id = insert(&mut hazards, HazardTier::Large);
        assert_eq!(id, 0);
        assert_eq!(hazards.len(), 3);
    }
}
