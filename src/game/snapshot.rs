//! Snapshot building for network transmission

use crate::ws::protocol::{
    ChatSnapshot, HazardCollections, HazardSnapshot, HazardTier, IdMap, PlayerId, PlayerSnapshot,
    ProjectileSnapshot, ServerMsg, TierVisual, VisualConstants,
};

use super::combat::{Projectile, ProjectileState};
use super::hazard::{Hazard, TierStats};
use super::player::{Player, CHAT_LIFETIME_MS, MAX_HEALTH};
use super::world::World;

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            color: p.color.clone(),
            x: p.body.position.x,
            y: p.body.position.y,
            vel_x: p.body.velocity.x,
            vel_y: p.body.velocity.y,
            radius: p.body.radius,
            angle: p.aim_angle,
            health: p.health(),
            max_health: p.max_health,
            score: p.score,
            last_damage_at: p.last_damage_at,
            last_shot_at: p.last_shot_at,
            keys: p.keys,
            chat: p
                .chat
                .iter()
                .map(|line| ChatSnapshot {
                    text: line.text.clone(),
                    sent_at: line.sent_at,
                })
                .collect(),
        }
    }
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        let fade_started_at = match p.state() {
            ProjectileState::Fading { since } => Some(since),
            _ => None,
        };
        Self {
            id: p.id,
            owner_id: p.owner_id,
            x: p.body.position.x,
            y: p.body.position.y,
            vel_x: p.body.velocity.x,
            vel_y: p.body.velocity.y,
            radius: p.body.radius,
            strength: p.strength,
            fading: fade_started_at.is_some(),
            fade_started_at,
            color: p.color.clone(),
        }
    }
}

impl From<&Hazard> for HazardSnapshot {
    fn from(h: &Hazard) -> Self {
        Self {
            id: h.id,
            tier: h.tier,
            x: h.position.x,
            y: h.position.y,
            size: h.size,
            strength: h.strength,
            score: h.score,
            health: h.health(),
            max_health: h.max_health,
            rarity: h.rarity,
            color: h.color.clone(),
        }
    }
}

pub fn player_snapshots(world: &World) -> IdMap<PlayerSnapshot> {
    world
        .players()
        .iter()
        .map(|(id, p)| (id.to_string(), p.into()))
        .collect()
}

pub fn projectile_snapshots(world: &World) -> IdMap<ProjectileSnapshot> {
    world
        .projectiles()
        .iter()
        .map(|(id, p)| (id.to_string(), p.into()))
        .collect()
}

pub fn hazard_snapshots(world: &World, tier: HazardTier) -> IdMap<HazardSnapshot> {
    world
        .hazards()
        .tier(tier)
        .iter()
        .map(|(id, h)| (id.to_string(), h.into()))
        .collect()
}

/// Constants a client needs to draw what it receives
pub fn visual_constants(world: &World) -> VisualConstants {
    VisualConstants {
        max_health: MAX_HEALTH,
        fade_duration_ms: world.weapon().fade_duration_ms,
        chat_lifetime_ms: CHAT_LIFETIME_MS,
        projectile_radius: world.weapon().projectile_radius,
        tiers: HazardTier::ALL
            .into_iter()
            .map(|tier| {
                let stats = TierStats::for_tier(tier);
                TierVisual {
                    tier,
                    size: stats.size,
                    color: stats.color.to_string(),
                    shiny_color: stats.shiny_color.to_string(),
                }
            })
            .collect(),
    }
}

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Post-tick frames: players, projectiles, then one message per hazard tier
    pub fn build(&self, world: &World) -> Vec<ServerMsg> {
        let tick = world.tick_count();
        let mut frames = Vec::with_capacity(2 + HazardTier::ALL.len());
        frames.push(ServerMsg::Players {
            tick,
            players: player_snapshots(world),
        });
        frames.push(ServerMsg::Projectiles {
            tick,
            projectiles: projectile_snapshots(world),
        });
        for tier in HazardTier::ALL {
            frames.push(ServerMsg::Hazards {
                tick,
                tier,
                hazards: hazard_snapshots(world, tier),
            });
        }
        frames
    }

    /// Full state for a newly identified connection
    pub fn build_init(&self, world: &World, self_id: PlayerId) -> ServerMsg {
        ServerMsg::Init {
            self_id,
            players: player_snapshots(world),
            projectiles: projectile_snapshots(world),
            hazards: HazardCollections {
                small: hazard_snapshots(world, HazardTier::Small),
                medium: hazard_snapshots(world, HazardTier::Medium),
                large: hazard_snapshots(world, HazardTier::Large),
            },
            map: world.map().map_info(),
            neutral_zone: world.map().zone_info(),
            visuals: visual_constants(world),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::config::{ArenaSettings, NeutralZoneMode};

    const T0: u64 = 1_700_000_000_000;

    fn busy_world() -> World {
        let mut world = World::new(ArenaSettings {
            seed: Some(11),
            ..ArenaSettings::default()
        });
        let a = Uuid::new_v4();
        world.identify(a, Some("alpha"), T0);
        world.identify(Uuid::new_v4(), Some("beta"), T0);
        world.chat(a, "gg", T0);
        world.shoot(a, T0);
        for tier in HazardTier::ALL {
            world.spawn_hazard(tier);
            world.spawn_hazard(tier);
        }
        world.tick(T0 + 16);
        world
    }

    #[test]
    fn interval_controls_cadence() {
        let mut builder = SnapshotBuilder::new(3);
        let sent: Vec<bool> = (0..6).map(|_| builder.should_send()).collect();
        assert_eq!(sent, vec![false, false, true, false, false, true]);
        assert!(SnapshotBuilder::new(0).should_send());
    }

    #[test]
    fn frames_cover_every_collection() {
        let world = busy_world();
        let frames = SnapshotBuilder::new(1).build(&world);
        assert_eq!(frames.len(), 5);
        assert!(matches!(&frames[0], ServerMsg::Players { players, .. } if players.len() == 2));
        assert!(matches!(&frames[1], ServerMsg::Projectiles { projectiles, .. } if projectiles.len() == 1));
        assert!(matches!(
            &frames[4],
            ServerMsg::Hazards { tier: HazardTier::Large, hazards, .. } if hazards.len() == 2
        ));
    }

    #[test]
    fn serialized_snapshot_reconstructs_the_registry() {
        let world = busy_world();
        let init = SnapshotBuilder::new(1).build_init(&world, 0);
        let json = serde_json::to_string(&init).unwrap();
        let decoded: ServerMsg = serde_json::from_str(&json).unwrap();

        let ServerMsg::Init {
            self_id,
            players,
            projectiles,
            hazards,
            map,
            neutral_zone,
            ..
        } = decoded
        else {
            panic!("expected init");
        };

        assert_eq!(self_id, 0);
        assert_eq!(players.len(), world.players().len());
        for (id, player) in world.players().iter() {
            assert_eq!(players[&id.to_string()], PlayerSnapshot::from(player));
        }
        assert_eq!(players["0"].chat[0].text, "gg");
        for (id, projectile) in world.projectiles().iter() {
            assert_eq!(projectiles[&id.to_string()], ProjectileSnapshot::from(projectile));
        }
        for (id, hazard) in world.hazards().tier(HazardTier::Medium).iter() {
            assert_eq!(hazards.medium[&id.to_string()], HazardSnapshot::from(hazard));
        }
        assert_eq!(hazards.large.len(), world.hazards().tier(HazardTier::Large).len());
        assert_eq!(map.width, 4000.0);
        assert_eq!(neutral_zone.map(|z| z.mode), Some(NeutralZoneMode::SpawnArea));
    }
}
