//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::hazard::TierStats;
use crate::game::player::MAX_RADIUS;
use crate::util::time::SIMULATION_TPS;
use crate::ws::protocol::HazardTier;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,

    /// Allowed client origins for CORS (empty = any origin)
    pub client_origins: Vec<String>,
    /// Directory holding the client bundle and its `index.html`
    pub static_dir: PathBuf,

    /// Simulation settings for the arena
    pub arena: ArenaSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_var("LOG_FORMAT", LogFormat::Pretty)?,

            client_origins: env::var("CLIENT_ORIGIN")
                .map(|value| {
                    value
                        .split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),

            arena: ArenaSettings::from_env()?,
        })
    }
}

/// Tunable rules of the simulation. Fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaSettings {
    /// Map width in world units
    pub map_width: f64,
    /// Map height in world units
    pub map_height: f64,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Broadcast snapshots every N ticks
    pub snapshot_every: u32,
    /// Behaviour of the central neutral zone
    pub neutral_zone: NeutralZoneMode,
    /// Side length of the square neutral zone
    pub neutral_zone_size: f64,
    /// What happens to a projectile after a damaging hit
    pub penetration: PenetrationPolicy,
    /// Score awarded to a player for an elimination
    pub kill_reward: KillReward,
    /// How a player's collision radius is derived
    pub radius_rule: RadiusRule,
    /// Whether players collide with (and take damage from) hazards
    pub hazard_contact: bool,
    /// Whether overlapping players are pushed apart
    pub player_separation: bool,
    /// Seed for the spawner RNG; random when unset
    pub seed: Option<u64>,
}

impl ArenaSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            map_width: parse_var("MAP_WIDTH", defaults.map_width)?,
            map_height: parse_var("MAP_HEIGHT", defaults.map_height)?,
            tick_rate: parse_var("TICK_RATE", defaults.tick_rate)?,
            snapshot_every: parse_var("SNAPSHOT_EVERY", defaults.snapshot_every)?,
            neutral_zone: parse_var("NEUTRAL_ZONE", defaults.neutral_zone)?,
            neutral_zone_size: parse_var("NEUTRAL_ZONE_SIZE", defaults.neutral_zone_size)?,
            penetration: parse_var("PROJECTILE_PENETRATION", defaults.penetration)?,
            kill_reward: parse_var("KILL_REWARD", defaults.kill_reward)?,
            radius_rule: parse_var("PLAYER_RADIUS_RULE", defaults.radius_rule)?,
            hazard_contact: parse_var("HAZARD_CONTACT", defaults.hazard_contact)?,
            player_separation: parse_var("PLAYER_SEPARATION", defaults.player_separation)?,
            seed: match env::var("WORLD_SEED") {
                Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "WORLD_SEED",
                    value,
                })?),
                Err(_) => None,
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let min_extent = min_map_extent();
        if !(self.map_width.is_finite() && self.map_width >= min_extent) {
            return Err(ConfigError::OutOfRange("MAP_WIDTH"));
        }
        if !(self.map_height.is_finite() && self.map_height >= min_extent) {
            return Err(ConfigError::OutOfRange("MAP_HEIGHT"));
        }
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::OutOfRange("TICK_RATE"));
        }
        if self.snapshot_every == 0 {
            return Err(ConfigError::OutOfRange("SNAPSHOT_EVERY"));
        }
        let zone_fits = self.neutral_zone_size > 0.0
            && self.neutral_zone_size < self.map_width.min(self.map_height);
        if self.neutral_zone != NeutralZoneMode::None && !zone_fits {
            return Err(ConfigError::OutOfRange("NEUTRAL_ZONE_SIZE"));
        }
        // Large hazards spawn inside the area
        let large = TierStats::for_tier(HazardTier::Large).size;
        if self.neutral_zone == NeutralZoneMode::SpawnArea && self.neutral_zone_size < large {
            return Err(ConfigError::OutOfRange("NEUTRAL_ZONE_SIZE"));
        }
        // A full-size player must fit on either side of a wall
        let gap = self.map_width.min(self.map_height) - self.neutral_zone_size;
        if self.neutral_zone == NeutralZoneMode::Solid && gap < 4.0 * MAX_RADIUS {
            return Err(ConfigError::OutOfRange("NEUTRAL_ZONE_SIZE"));
        }
        Ok(())
    }
}

/// Smallest map side that holds the largest player and every padded hazard footprint
pub fn min_map_extent() -> f64 {
    HazardTier::ALL
        .into_iter()
        .map(|tier| {
            let stats = TierStats::for_tier(tier);
            stats.size + 2.0 * stats.padding
        })
        .fold(2.0 * MAX_RADIUS, f64::max)
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            map_width: 4000.0,
            map_height: 4000.0,
            tick_rate: SIMULATION_TPS,
            snapshot_every: 1,
            neutral_zone: NeutralZoneMode::SpawnArea,
            neutral_zone_size: 800.0,
            penetration: PenetrationPolicy::Penetrate,
            kill_reward: KillReward::VictimScore,
            radius_rule: RadiusRule::Fixed,
            hazard_contact: true,
            player_separation: true,
            seed: None,
        }
    }
}

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// How the central neutral zone behaves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeutralZoneMode {
    /// No neutral zone at all
    None,
    /// Impassable obstacle for players and projectiles
    Solid,
    /// Drawn by clients, no gameplay effect
    Open,
    /// Reserved spawn region for the large hazard tier
    SpawnArea,
}

impl FromStr for NeutralZoneMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "solid" | "wall" => Ok(Self::Solid),
            "open" | "visual" => Ok(Self::Open),
            "spawn" | "spawn_area" => Ok(Self::SpawnArea),
            _ => Err(()),
        }
    }
}

/// Projectile behaviour after a damaging hit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PenetrationPolicy {
    /// Spent on the first damaging hit
    Consume,
    /// Loses the target's strength per hit, spent once it reaches zero
    Penetrate,
}

impl FromStr for PenetrationPolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "consume" => Ok(Self::Consume),
            "penetrate" => Ok(Self::Penetrate),
            _ => Err(()),
        }
    }
}

/// Score transferred to the shooter on an elimination
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KillReward {
    /// The victim's whole accumulated score
    VictimScore,
    /// A fixed amount per elimination
    Fixed(f64),
}

impl KillReward {
    pub fn amount(&self, victim_score: f64) -> f64 {
        match self {
            Self::VictimScore => victim_score,
            Self::Fixed(amount) => *amount,
        }
    }
}

impl FromStr for KillReward {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        if value == "victim_score" || value == "victim" {
            return Ok(Self::VictimScore);
        }
        let amount = value
            .strip_prefix("fixed:")
            .and_then(|amount| amount.parse::<f64>().ok())
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
            .ok_or(())?;
        Ok(Self::Fixed(amount))
    }
}

/// How a player's collision radius is derived
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadiusRule {
    /// Always the base radius
    Fixed,
    /// Grows with the square root of the score, capped
    ScoreScaled,
}

impl FromStr for RadiusRule {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "score" | "score_scaled" => Ok(Self::ScoreScaled),
            _ => Err(()),
        }
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Environment variable {0} is out of range")]
    OutOfRange(&'static str),
}
