//! Session-facing operations on the world: identify, input, aim, shoot, chat, disconnect

use tracing::{debug, info};
use uuid::Uuid;

use crate::util::text::{sanitize_display_name, sanitize_line, MAX_CHAT_LENGTH};
use crate::ws::protocol::{InputKeys, PlayerId, ProjectileId};

use super::combat::Projectile;
use super::player::{Player, BASE_RADIUS};
use super::spawner::Spawner;
use super::world::World;

impl World {
    /// Live player owned by a connection
    pub fn player_for(&self, connection_id: Uuid) -> Option<PlayerId> {
        self.sessions.get(&connection_id).copied()
    }

    fn session_player_mut(&mut self, connection_id: Uuid) -> Option<&mut Player> {
        let id = self.sessions.get(&connection_id)?;
        self.players.get_mut(*id)
    }

    /// Create a player for this connection, replacing any player it already owns
    pub fn identify(&mut self, connection_id: Uuid, name: Option<&str>, now: u64) -> PlayerId {
        let fallback = format!("Player_{}", &connection_id.to_string()[..8]);
        let name = sanitize_display_name(name.unwrap_or_default(), &fallback);

        if let Some(previous) = self.sessions.remove(&connection_id) {
            self.players.remove(previous);
            debug!(connection_id = %connection_id, player_id = previous, "Replacing player");
        }

        let position = Spawner::find_player_spawn(&mut self.rng, &self.map, BASE_RADIUS);
        let id = self
            .players
            .insert_with(|id| Player::new(id, connection_id, name, position));
        if let Some(player) = self.players.get_mut(id) {
            player.update_radius(self.settings.radius_rule);
        }
        self.sessions.insert(connection_id, id);

        info!(
            connection_id = %connection_id,
            player_id = id,
            joined_at = now,
            player_count = self.players.len(),
            "Player joined arena"
        );
        id
    }

    pub fn set_input(&mut self, connection_id: Uuid, keys: InputKeys) {
        if let Some(player) = self.session_player_mut(connection_id) {
            player.keys = keys;
        }
    }

    pub fn set_aim(&mut self, connection_id: Uuid, angle: f64) {
        if !angle.is_finite() {
            return;
        }
        if let Some(player) = self.session_player_mut(connection_id) {
            player.aim_angle = angle;
        }
    }

    /// Fire along the player's aim. `None` while the weapon is cooling down.
    pub fn shoot(&mut self, connection_id: Uuid, now: u64) -> Option<ProjectileId> {
        let cooldown = self.weapon.cooldown_ms;
        let player_id = self.player_for(connection_id)?;
        let player = self.players.get_mut(player_id)?;
        if !player.is_alive() || !player.can_shoot(now, cooldown) {
            return None;
        }
        player.last_shot_at = Some(now);

        let (body, angle, color) = (player.body, player.aim_angle, player.color.clone());
        let weapon = self.weapon;
        let id = self
            .projectiles
            .insert_with(|id| Projectile::new(id, player_id, body, angle, color, &weapon));
        Some(id)
    }

    /// Attach a chat line to the player. Returns false when nothing was added.
    pub fn chat(&mut self, connection_id: Uuid, text: &str, now: u64) -> bool {
        let Some(line) = sanitize_line(text, MAX_CHAT_LENGTH) else {
            return false;
        };
        let Some(player) = self.session_player_mut(connection_id) else {
            return false;
        };
        player.push_chat(line, now);
        true
    }

    /// Remove the connection's player immediately
    pub fn disconnect(&mut self, connection_id: Uuid) -> Option<PlayerId> {
        let id = self.sessions.remove(&connection_id)?;
        self.players.remove(id);
        info!(connection_id = %connection_id, player_id = id, "Player left arena");
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArenaSettings, NeutralZoneMode};

    const T0: u64 = 1_700_000_000_000;

    fn world() -> World {
        World::new(ArenaSettings {
            neutral_zone: NeutralZoneMode::None,
            seed: Some(7),
            ..ArenaSettings::default()
        })
    }

    #[test]
    fn identify_assigns_placeholder_name() {
        let mut world = world();
        let connection = Uuid::new_v4();
        let id = world.identify(connection, Some("   "), T0);
        let player = world.players().get(id).unwrap();
        assert_eq!(player.name, format!("Player_{}", &connection.to_string()[..8]));
        assert_eq!(world.player_for(connection), Some(id));
    }

    #[test]
    fn re_identify_replaces_the_previous_player() {
        let mut world = world();
        let connection = Uuid::new_v4();
        let first = world.identify(connection, Some("one"), T0);
        let second = world.identify(connection, Some("two"), T0 + 5);
        assert_ne!(first, second);
        assert!(!world.players().contains(first));
        assert_eq!(world.players().len(), 1);
        assert_eq!(world.players().get(second).unwrap().name, "two");
    }

    #[test]
    fn shots_inside_the_cooldown_are_ignored() {
        let mut world = world();
        let connection = Uuid::new_v4();
        world.identify(connection, Some("gunner"), T0);

        assert!(world.shoot(connection, T0).is_some());
        assert!(world.shoot(connection, T0 + 100).is_none());
        assert_eq!(world.projectiles().len(), 1);
        assert!(world.shoot(connection, T0 + 250).is_some());
    }

    #[test]
    fn projectile_follows_the_aim() {
        let mut world = world();
        let connection = Uuid::new_v4();
        let id = world.identify(connection, None, T0);
        world.set_aim(connection, std::f64::consts::FRAC_PI_2);
        world.set_aim(connection, f64::NAN);

        let projectile = world.shoot(connection, T0).unwrap();
        let player = world.players().get(id).unwrap();
        let projectile = world.projectiles().get(projectile).unwrap();
        assert!(projectile.body.velocity.x.abs() < 1e-9);
        assert!((projectile.body.velocity.y - 10.0).abs() < 1e-9);
        assert!((projectile.body.position.y - (player.body.position.y + 25.0)).abs() < 1e-9);
        assert_eq!(projectile.color, player.color);
    }

    #[test]
    fn input_for_unknown_connection_is_a_no_op() {
        let mut world = world();
        world.set_input(
            Uuid::new_v4(),
            InputKeys {
                up: true,
                ..InputKeys::default()
            },
        );
        assert!(world.shoot(Uuid::new_v4(), T0).is_none());
        assert!(!world.chat(Uuid::new_v4(), "hello", T0));
        assert!(world.players().is_empty());
    }

    #[test]
    fn chat_is_sanitised_and_attached() {
        let mut world = world();
        let connection = Uuid::new_v4();
        let id = world.identify(connection, Some("talker"), T0);
        assert!(world.chat(connection, "  hello \n world  ", T0));
        assert!(!world.chat(connection, "   ", T0));

        let long = "x".repeat(500);
        assert!(world.chat(connection, &long, T0 + 1));

        let chat = &world.players().get(id).unwrap().chat;
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].text, "hello world");
        assert_eq!(chat[1].text.chars().count(), MAX_CHAT_LENGTH);
    }

    #[test]
    fn disconnect_removes_player_and_session() {
        let mut world = world();
        let connection = Uuid::new_v4();
        let id = world.identify(connection, Some("leaver"), T0);
        assert_eq!(world.disconnect(connection), Some(id));
        assert!(world.players().is_empty());
        assert_eq!(world.disconnect(connection), None);
    }
}
