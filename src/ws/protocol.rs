//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::NeutralZoneMode;

/// Player ids come from the player registry counter
pub type PlayerId = u64;
/// Projectile ids come from the projectile registry counter
pub type ProjectileId = u64;
/// Hazard ids come from the counter of the hazard's own tier
pub type HazardId = u64;

/// Entities keyed by their decimal id. JSON object keys are strings, and tagged
/// messages only decode string keys, so the key is stored as one.
pub type IdMap<T> = BTreeMap<String, T>;

/// Size/strength tiers of destructible world objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardTier {
    /// Small one-shot blocks scattered over the field
    Small,
    /// Mid-sized blocks that take a few hits
    Medium,
    /// Large, tough blocks, usually kept inside the neutral zone
    Large,
}

impl HazardTier {
    pub const ALL: [HazardTier; 3] = [HazardTier::Small, HazardTier::Medium, HazardTier::Large];

    pub fn index(self) -> usize {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Large => 2,
        }
    }
}

impl fmt::Display for HazardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        };
        f.write_str(name)
    }
}

/// Colour variant of a hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    /// Rare variant worth several times the tier score
    Shiny,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Create (or replace) this connection's player
    Identify {
        /// Display name, a placeholder is assigned when absent
        #[serde(default)]
        name: Option<String>,
    },

    /// Currently held movement keys. Missing keys count as released.
    Input {
        #[serde(default, alias = "w")]
        up: bool,
        #[serde(default, alias = "s")]
        down: bool,
        #[serde(default, alias = "a")]
        left: bool,
        #[serde(default, alias = "d")]
        right: bool,
    },

    /// Aim direction in radians
    Aim {
        #[serde(alias = "barrel_angle", alias = "barrelAngle")]
        angle: f64,
    },

    /// Fire one projectile; origin and velocity are computed by the server
    Shoot,

    /// Short chat line shown next to the player
    Chat { text: String },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Full world state, sent once to a newly identified connection
    Init {
        self_id: PlayerId,
        players: IdMap<PlayerSnapshot>,
        projectiles: IdMap<ProjectileSnapshot>,
        hazards: HazardCollections,
        map: MapInfo,
        neutral_zone: Option<NeutralZoneInfo>,
        visuals: VisualConstants,
    },

    /// All players after a tick
    Players {
        tick: u64,
        players: IdMap<PlayerSnapshot>,
    },

    /// All projectiles after a tick
    Projectiles {
        tick: u64,
        projectiles: IdMap<ProjectileSnapshot>,
    },

    /// All hazards of one tier after a tick
    Hazards {
        tick: u64,
        tier: HazardTier,
        hazards: IdMap<HazardSnapshot>,
    },

    /// A projectile was fired
    NewProjectile { projectile: ProjectileSnapshot },

    /// This connection's player reached zero health
    Eliminated {
        killer_id: Option<PlayerId>,
        killer_name: Option<String>,
        final_score: f64,
    },
}

/// Held movement keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// A chat line attached to a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    pub text: String,
    /// Unix millis when the line was received
    pub sent_at: u64,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    /// Position X
    pub x: f64,
    /// Position Y
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub radius: f64,
    /// Aim angle in radians
    pub angle: f64,
    pub health: f64,
    pub max_health: f64,
    pub score: f64,
    pub last_damage_at: Option<u64>,
    pub last_shot_at: Option<u64>,
    pub keys: InputKeys,
    pub chat: Vec<ChatSnapshot>,
}

/// Projectile state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub radius: f64,
    /// Remaining damage strength
    pub strength: f64,
    pub fading: bool,
    pub fade_started_at: Option<u64>,
    pub color: String,
}

/// Hazard state in a snapshot. `x`/`y` is the top-left corner of the footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardSnapshot {
    pub id: HazardId,
    pub tier: HazardTier,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub strength: f64,
    pub score: f64,
    /// Absent for one-shot tiers
    pub health: Option<f64>,
    pub max_health: Option<f64>,
    pub rarity: Rarity,
    pub color: String,
}

/// Every hazard, grouped by tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardCollections {
    pub small: IdMap<HazardSnapshot>,
    pub medium: IdMap<HazardSnapshot>,
    pub large: IdMap<HazardSnapshot>,
}

/// Map bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    pub width: f64,
    pub height: f64,
}

/// Neutral zone geometry and behaviour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeutralZoneInfo {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub mode: NeutralZoneMode,
}

/// Constants the client needs to draw the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualConstants {
    pub max_health: f64,
    pub fade_duration_ms: u64,
    pub chat_lifetime_ms: u64,
    pub projectile_radius: f64,
    pub tiers: Vec<TierVisual>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierVisual {
    pub tier: HazardTier,
    pub size: f64,
    pub color: String,
    pub shiny_color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_defaults_missing_keys() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"input","up":true}"#).unwrap();
        match msg {
            ClientMsg::Input {
                up,
                down,
                left,
                right,
            } => {
                assert!(up);
                assert!(!down && !left && !right);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn input_accepts_wasd_names() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"input","w":false,"a":true,"s":true,"d":false}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMsg::Input {
                up: false,
                down: true,
                left: true,
                right: false
            }
        ));
    }

    #[test]
    fn aim_without_angle_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"aim"}"#).is_err());
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"aim","barrelAngle":1.5}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Aim { angle } if angle == 1.5));
    }

    #[test]
    fn identify_name_is_optional() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"identify"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Identify { name: None }));
    }

    #[test]
    fn players_frame_survives_a_json_round_trip() {
        let player = PlayerSnapshot {
            id: 7,
            name: "ace".to_string(),
            color: "#ff0000".to_string(),
            x: 120.25,
            y: 3_999.9,
            vel_x: -0.1,
            vel_y: 0.3,
            radius: 25.0,
            angle: std::f64::consts::FRAC_PI_3,
            health: 97.0,
            max_health: 100.0,
            score: 15.0,
            last_damage_at: Some(1_700_000_000_016),
            last_shot_at: None,
            keys: InputKeys {
                up: true,
                ..InputKeys::default()
            },
            chat: vec![ChatSnapshot {
                text: "gg".to_string(),
                sent_at: 1_700_000_000_000,
            }],
        };
        let frame = ServerMsg::Players {
            tick: 42,
            players: IdMap::from([(player.id.to_string(), player.clone())]),
        };

        let json = serde_json::to_string(&frame).unwrap();
        let decoded: ServerMsg = serde_json::from_str(&json).unwrap();
        match decoded {
            ServerMsg::Players { tick, players } => {
                assert_eq!(tick, 42);
                assert_eq!(players["7"], player);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn server_messages_are_tagged_snake_case() {
        let msg = ServerMsg::Eliminated {
            killer_id: Some(3),
            killer_name: Some("ace".to_string()),
            final_score: 12.0,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "eliminated");
        assert_eq!(json["killer_id"], 3);

        let tier = serde_json::to_value(HazardTier::Large).unwrap();
        assert_eq!(tier, "large");
    }
}
