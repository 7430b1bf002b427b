//! Randomised placement of hazards and players

use glam::DVec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::ws::protocol::{HazardTier, Rarity};

use super::geometry::{circle_rect_intersect, rect_rect_intersect, Circle, MapGeometry, Rect};
use super::hazard::{Hazard, TierStats, SHINY_CHANCE, SHINY_SCORE_RANGE};
use super::player::Player;
use super::registry::Registry;

/// Random placements tried before a spawn is skipped
pub const MAX_PLACEMENT_ATTEMPTS: usize = 100;

/// Randomised placement with a bounded number of retries
pub struct Spawner;

impl Spawner {
    /// Region a tier's top-left corner is drawn from
    pub fn region_for(tier: HazardTier, map: &MapGeometry) -> Rect {
        let stats = TierStats::for_tier(tier);
        match (tier, map.spawn_area()) {
            (HazardTier::Large, Some(area)) => {
                Rect::new(area.x, area.y, area.width - stats.size, area.height - stats.size)
            }
            _ => Rect::new(
                map.bounds.x + stats.padding,
                map.bounds.y + stats.padding,
                map.bounds.width - stats.size - stats.padding * 2.0,
                map.bounds.height - stats.size - stats.padding * 2.0,
            ),
        }
    }

    /// Find a free spot for a new hazard of `tier`, or `None` once every attempt collided
    pub fn find_hazard_placement(
        rng: &mut ChaCha8Rng,
        map: &MapGeometry,
        tier: HazardTier,
        same_tier: &Registry<Hazard>,
        players: &Registry<Player>,
    ) -> Option<DVec2> {
        let size = TierStats::for_tier(tier).size;
        let region = Self::region_for(tier, map);
        let reserved = match tier {
            HazardTier::Large => None,
            _ => map.spawn_area(),
        };

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let position = Self::sample(rng, region)?;
            let footprint = Rect::square(position, size);

            let blocked = same_tier
                .values()
                .any(|other| rect_rect_intersect(footprint, other.footprint()))
                || map
                    .solid_zone()
                    .is_some_and(|zone| rect_rect_intersect(footprint, zone))
                || reserved.is_some_and(|area| rect_rect_intersect(footprint, area))
                || players
                    .values()
                    .any(|player| circle_rect_intersect(player.circle(), footprint));

            if !blocked {
                return Some(position);
            }
        }

        trace!(%tier, "No free hazard placement found");
        None
    }

    /// Common or shiny, with the score that goes with it
    pub fn roll_rarity(rng: &mut ChaCha8Rng, tier: HazardTier) -> (Rarity, f64) {
        let base = TierStats::for_tier(tier).score;
        if rng.gen_bool(SHINY_CHANCE) {
            let (low, high) = SHINY_SCORE_RANGE;
            (Rarity::Shiny, base * rng.gen_range(low..=high))
        } else {
            (Rarity::Common, base)
        }
    }

    /// Spawn point for a player of `radius`, avoiding a solid neutral zone.
    /// Falls back to a quarter of the map when every attempt collided.
    pub fn find_player_spawn(rng: &mut ChaCha8Rng, map: &MapGeometry, radius: f64) -> DVec2 {
        let bounds = map.bounds;
        let region = Rect::new(
            bounds.x + radius,
            bounds.y + radius,
            bounds.width - radius * 2.0,
            bounds.height - radius * 2.0,
        );

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let Some(position) = Self::sample(rng, region) else {
                break;
            };
            let clear = map
                .solid_zone()
                .map_or(true, |zone| !circle_rect_intersect(Circle::new(position, radius), zone));
            if clear {
                return position;
            }
        }

        trace!("Falling back to default player spawn");
        DVec2::new(bounds.x + bounds.width / 4.0, bounds.y + bounds.height / 4.0)
    }

    /// Uniform point inside `region`; `None` for a degenerate region
    fn sample(rng: &mut ChaCha8Rng, region: Rect) -> Option<DVec2> {
        if !(region.width >= 0.0 && region.height >= 0.0) {
            return None;
        }
        Some(DVec2::new(
            rng.gen_range(region.x..=region.right()),
            rng.gen_range(region.y..=region.bottom()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use uuid::Uuid;

    use super::*;
    use crate::config::{ArenaSettings, NeutralZoneMode};

    fn map(mode: NeutralZoneMode) -> MapGeometry {
        MapGeometry::from_settings(&ArenaSettings {
            neutral_zone: mode,
            ..ArenaSettings::default()
        })
    }

    #[test]
    fn large_tier_lands_inside_the_spawn_area() {
        let map = map(NeutralZoneMode::SpawnArea);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let area = map.spawn_area().unwrap();
        for _ in 0..50 {
            let pos = Spawner::find_hazard_placement(
                &mut rng,
                &map,
                HazardTier::Large,
                &Registry::new(),
                &Registry::new(),
            )
            .unwrap();
            assert!(area.contains(pos));
            assert!(area.contains(pos + DVec2::splat(50.0)));
        }
    }

    #[test]
    fn field_tiers_avoid_the_reserved_area() {
        let map = map(NeutralZoneMode::SpawnArea);
        let area = map.spawn_area().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            let pos = Spawner::find_hazard_placement(
                &mut rng,
                &map,
                HazardTier::Medium,
                &Registry::new(),
                &Registry::new(),
            )
            .unwrap();
            assert!(!rect_rect_intersect(Rect::square(pos, 40.0), area));
            assert!(pos.x >= 10.0 && pos.x <= 4000.0 - 40.0 - 10.0);
        }
    }

    #[test]
    fn placement_gives_up_when_players_cover_the_region() {
        let settings = ArenaSettings {
            map_width: 100.0,
            map_height: 100.0,
            neutral_zone: NeutralZoneMode::None,
            ..ArenaSettings::default()
        };
        let map = MapGeometry::from_settings(&settings);
        let mut players = Registry::new();
        players.insert_with(|id| {
            let mut p = Player::new(id, Uuid::new_v4(), "big".into(), DVec2::new(50.0, 50.0));
            p.body.radius = 200.0;
            p
        });
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let placement = Spawner::find_hazard_placement(
            &mut rng,
            &map,
            HazardTier::Small,
            &Registry::new(),
            &players,
        );
        assert_eq!(placement, None);
    }

    #[test]
    fn player_spawn_avoids_a_solid_zone() {
        let map = map(NeutralZoneMode::Solid);
        let zone = map.solid_zone().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..200 {
            let pos = Spawner::find_player_spawn(&mut rng, &map, 25.0);
            assert!(!circle_rect_intersect(Circle::new(pos, 25.0), zone));
        }
    }

    #[test]
    fn player_spawn_falls_back_when_nothing_fits() {
        let map = map(NeutralZoneMode::None);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let pos = Spawner::find_player_spawn(&mut rng, &map, 3000.0);
        assert_eq!(pos, DVec2::new(1000.0, 1000.0));
    }

    #[test]
    fn rarity_roll_is_reproducible_and_bounded() {
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        let mut shiny = 0;
        for _ in 0..2_000 {
            let roll = Spawner::roll_rarity(&mut a, HazardTier::Small);
            assert_eq!(roll, Spawner::roll_rarity(&mut b, HazardTier::Small));
            match roll {
                (Rarity::Common, score) => assert_eq!(score, 5.0),
                (Rarity::Shiny, score) => {
                    shiny += 1;
                    assert!((20.0..=30.0).contains(&score));
                }
            }
        }
        assert!(shiny > 0 && shiny < 400);
    }
}
