//! Authoritative world state and the fixed-rate simulation tick

use std::collections::{BTreeSet, HashMap};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ArenaSettings;
use crate::ws::protocol::{HazardId, HazardTier, PlayerId, ProjectileId};

use super::combat::{CombatSystem, HitResult, Projectile, ProjectileState, Target, WeaponStats};
use super::geometry::{circle_rect_intersect, circles_overlap, MapGeometry};
use super::hazard::{Hazard, Hazards, TierStats, BODY_DAMAGE};
use super::physics::{
    MovementStats, PhysicsSystem, HAZARD_KNOCKBACK, PLAYER_COLLISION_IMPULSE,
};
use super::player::{Player, PLAYER_COLLISION_DAMAGE, PLAYER_DEFENSE_STRENGTH};
use super::registry::Registry;
use super::spawner::Spawner;

/// A player that reached zero health during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Elimination {
    pub player_id: PlayerId,
    pub connection_id: Uuid,
    /// Owner of the finishing projectile; `None` for contact damage
    pub killer_id: Option<PlayerId>,
    pub killer_name: Option<String>,
    pub final_score: f64,
}

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub eliminated: Vec<Elimination>,
    pub hits: Vec<HitResult>,
}

/// Entities queued for removal at the end of the tick
#[derive(Debug, Default)]
struct Removals {
    players: BTreeSet<PlayerId>,
    projectiles: BTreeSet<ProjectileId>,
    hazards: BTreeSet<(HazardTier, HazardId)>,
}

/// The whole simulation. Owned by the arena task; nothing else mutates it.
pub struct World {
    pub(super) settings: ArenaSettings,
    pub(super) map: MapGeometry,
    pub(super) movement: MovementStats,
    pub(super) weapon: WeaponStats,
    pub(super) players: Registry<Player>,
    pub(super) projectiles: Registry<Projectile>,
    pub(super) hazards: Hazards,
    /// Connection id to its live player
    pub(super) sessions: HashMap<Uuid, PlayerId>,
    pub(super) rng: ChaCha8Rng,
    tick: u64,
}

impl World {
    pub fn new(settings: ArenaSettings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        info!(seed, "Creating world");
        Self {
            map: MapGeometry::from_settings(&settings),
            settings,
            movement: MovementStats::default(),
            weapon: WeaponStats::default(),
            players: Registry::new(),
            projectiles: Registry::new(),
            hazards: Hazards::new(),
            sessions: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn map(&self) -> &MapGeometry {
        &self.map
    }

    pub fn weapon(&self) -> &WeaponStats {
        &self.weapon
    }

    pub fn players(&self) -> &Registry<Player> {
        &self.players
    }

    pub fn projectiles(&self) -> &Registry<Projectile> {
        &self.projectiles
    }

    pub fn hazards(&self) -> &Hazards {
        &self.hazards
    }

    /// Place one hazard of `tier` if the tier is below its cap and a free spot exists
    pub fn spawn_hazard(&mut self, tier: HazardTier) -> Option<HazardId> {
        let stats = TierStats::for_tier(tier);
        if self.hazards.tier(tier).len() >= stats.cap {
            return None;
        }
        let position = Spawner::find_hazard_placement(
            &mut self.rng,
            &self.map,
            tier,
            self.hazards.tier(tier),
            &self.players,
        )?;
        let (rarity, score) = Spawner::roll_rarity(&mut self.rng, tier);
        let id = self
            .hazards
            .tier_mut(tier)
            .insert_with(|id| Hazard::new(id, tier, position, rarity, score));
        debug!(%tier, hazard_id = id, ?rarity, "Hazard spawned");
        Some(id)
    }

    /// Run one simulation step at wall-clock time `now` (unix millis)
    pub fn tick(&mut self, now: u64) -> TickReport {
        self.tick += 1;
        let mut removals = Removals::default();
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        self.collide_players(now);
        if self.settings.hazard_contact {
            self.collide_hazards(now, &mut removals);
        }
        self.integrate_players(now, &mut removals, &mut report);
        self.update_projectiles(now, &mut removals, &mut report);
        self.evict(removals);

        report
    }

    /// Contact damage between every overlapping pair of players
    fn collide_players(&mut self, now: u64) {
        let ids = self.players.ids();
        for (i, &a_id) in ids.iter().enumerate() {
            for &b_id in &ids[i + 1..] {
                let (Some(a), Some(b)) = (self.players.get(a_id), self.players.get(b_id)) else {
                    continue;
                };
                if !circles_overlap(a.circle(), b.circle()) {
                    continue;
                }

                let (a_body, b_body) = if self.settings.player_separation {
                    PhysicsSystem::resolve_player_collision(a.body, b.body, PLAYER_COLLISION_IMPULSE)
                } else {
                    (a.body, b.body)
                };

                for (id, body) in [(a_id, a_body), (b_id, b_body)] {
                    if let Some(player) = self.players.get_mut(id) {
                        player.apply_damage(PLAYER_COLLISION_DAMAGE, now);
                        player.body = body;
                    }
                }
            }
        }
    }

    /// Players bumping into hazards hurt each other
    fn collide_hazards(&mut self, now: u64, removals: &mut Removals) {
        for player_id in self.players.ids() {
            for tier in HazardTier::ALL {
                let contact_damage = TierStats::for_tier(tier).contact_damage;
                for hazard_id in self.hazards.tier(tier).ids() {
                    if removals.hazards.contains(&(tier, hazard_id)) {
                        continue;
                    }
                    let (Some(player), Some(hazard)) = (
                        self.players.get_mut(player_id),
                        self.hazards.tier_mut(tier).get_mut(hazard_id),
                    ) else {
                        continue;
                    };
                    let footprint = hazard.footprint();
                    if !circle_rect_intersect(player.circle(), footprint) {
                        continue;
                    }

                    player.apply_damage(contact_damage, now);
                    player.body =
                        PhysicsSystem::push_off_footprint(player.body, footprint, HAZARD_KNOCKBACK);

                    if hazard.take_damage(BODY_DAMAGE) {
                        player.award(hazard.score);
                        removals.hazards.insert((tier, hazard_id));
                        debug!(player_id, %tier, hazard_id, "Hazard destroyed by contact");
                    }
                }
            }
        }
    }

    /// Movement, bounds, regeneration, chat expiry and elimination
    fn integrate_players(&mut self, now: u64, removals: &mut Removals, report: &mut TickReport) {
        let bounds = self.map.bounds;
        let solid_zone = self.map.solid_zone();

        for player_id in self.players.ids() {
            let Some(player) = self.players.get_mut(player_id) else {
                continue;
            };
            if !player.is_alive() {
                continue;
            }

            // Resolve obstacles with the radius the player ends the tick with
            player.update_radius(self.settings.radius_rule);
            let mut body = player.body;
            body.velocity = PhysicsSystem::accelerate(body.velocity, player.keys, &self.movement);
            body.position += body.velocity;
            if let Some(zone) = solid_zone {
                body = PhysicsSystem::push_out_of_zone(body, zone);
            }
            player.body = PhysicsSystem::clamp_to_bounds(body, bounds);

            player.regenerate(now);
            player.prune_chat(now);

            if player.is_depleted() && player.eliminate(now) {
                removals.players.insert(player_id);
                report.eliminated.push(Elimination {
                    player_id,
                    connection_id: player.connection_id,
                    killer_id: None,
                    killer_name: None,
                    final_score: player.score,
                });
            }
        }
    }

    /// Advance projectiles, resolve their hits and expire faded ones
    fn update_projectiles(&mut self, now: u64, removals: &mut Removals, report: &mut TickReport) {
        let bounds = self.map.bounds;
        let solid_zone = self.map.solid_zone();
        let fade_duration = self.weapon.fade_duration_ms;

        for projectile_id in self.projectiles.ids() {
            let Some(projectile) = self.projectiles.get_mut(projectile_id) else {
                continue;
            };

            match projectile.state() {
                ProjectileState::Spent => {
                    removals.projectiles.insert(projectile_id);
                    continue;
                }
                ProjectileState::Fading { .. } => {
                    if projectile.fade_expired(now, fade_duration) {
                        removals.projectiles.insert(projectile_id);
                    }
                    continue;
                }
                ProjectileState::Active => {}
            }

            projectile.advance();
            let blocked = solid_zone
                .is_some_and(|zone| circle_rect_intersect(projectile.circle(), zone));
            if !bounds.contains(projectile.body.position) || blocked {
                projectile.start_fading(now);
                continue;
            }

            self.strike_players(projectile_id, now, removals, report);
            self.strike_hazards(projectile_id, removals, report);

            if self
                .projectiles
                .get(projectile_id)
                .is_some_and(|p| p.state() == ProjectileState::Spent)
            {
                removals.projectiles.insert(projectile_id);
            }
        }
    }

    fn strike_players(
        &mut self,
        projectile_id: ProjectileId,
        now: u64,
        removals: &mut Removals,
        report: &mut TickReport,
    ) {
        for target_id in self.players.ids() {
            let Some(projectile) = self.projectiles.get(projectile_id) else {
                return;
            };
            if !projectile.is_active() {
                return;
            }
            let target = Target::Player(target_id);
            if target_id == projectile.owner_id || projectile.has_struck(target) {
                continue;
            }
            let Some(victim) = self.players.get_mut(target_id) else {
                continue;
            };
            if !victim.is_alive() || !CombatSystem::hits_circle(projectile, victim.circle()) {
                continue;
            }

            let owner_id = projectile.owner_id;
            let damage = projectile.strength;
            let killed = victim.apply_damage(damage, now);
            victim.body.velocity += PhysicsSystem::knockback(
                victim.body.position,
                projectile.body.position,
                projectile.body.velocity,
                self.weapon.knockback,
            );
            let victim_score = victim.score;
            let victim_connection = victim.connection_id;
            if killed {
                victim.eliminate(now);
            }

            if let Some(projectile) = self.projectiles.get_mut(projectile_id) {
                projectile.register_hit(target, PLAYER_DEFENSE_STRENGTH, self.settings.penetration);
            }
            report.hits.push(HitResult {
                projectile_id,
                shooter_id: owner_id,
                target,
                damage,
                destroyed: killed,
            });

            if killed {
                removals.players.insert(target_id);
                let reward = self.settings.kill_reward.amount(victim_score);
                let killer_name = self.players.get_mut(owner_id).map(|killer| {
                    if killer.is_alive() {
                        killer.award(reward);
                    }
                    killer.name.clone()
                });
                info!(
                    player_id = target_id,
                    killer_id = owner_id,
                    final_score = victim_score,
                    "Player eliminated"
                );
                report.eliminated.push(Elimination {
                    player_id: target_id,
                    connection_id: victim_connection,
                    killer_id: Some(owner_id),
                    killer_name,
                    final_score: victim_score,
                });
            }
        }
    }

    fn strike_hazards(
        &mut self,
        projectile_id: ProjectileId,
        removals: &mut Removals,
        report: &mut TickReport,
    ) {
        for tier in HazardTier::ALL {
            for hazard_id in self.hazards.tier(tier).ids() {
                let Some(projectile) = self.projectiles.get_mut(projectile_id) else {
                    return;
                };
                if !projectile.is_active() {
                    return;
                }
                let target = Target::Hazard(tier, hazard_id);
                if removals.hazards.contains(&(tier, hazard_id)) || projectile.has_struck(target) {
                    continue;
                }
                let Some(hazard) = self.hazards.tier_mut(tier).get_mut(hazard_id) else {
                    continue;
                };
                if !CombatSystem::hits_footprint(projectile, hazard.footprint()) {
                    continue;
                }

                let damage = projectile.strength;
                let destroyed = hazard.take_damage(damage);
                projectile.register_hit(target, hazard.strength, self.settings.penetration);
                let owner_id = projectile.owner_id;
                report.hits.push(HitResult {
                    projectile_id,
                    shooter_id: owner_id,
                    target,
                    damage,
                    destroyed,
                });

                if destroyed {
                    removals.hazards.insert((tier, hazard_id));
                    let score = hazard.score;
                    if let Some(shooter) = self.players.get_mut(owner_id).filter(|p| p.is_alive()) {
                        shooter.award(score);
                    }
                    debug!(%tier, hazard_id, shooter_id = owner_id, "Hazard destroyed");
                }
            }
        }
    }

    /// Apply every removal collected during the tick
    fn evict(&mut self, removals: Removals) {
        for id in &removals.players {
            self.players.remove(*id);
        }
        if !removals.players.is_empty() {
            self.sessions
                .retain(|_, player_id| !removals.players.contains(player_id));
        }
        for id in removals.projectiles {
            self.projectiles.remove(id);
        }
        for (tier, id) in removals.hazards {
            self.hazards.tier_mut(tier).remove(id);
        }
    }
}
