//! Configuration module - environment variable parsing and gameplay tunables

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Optional JSON file with gameplay tunables
    pub sim_config_path: Option<PathBuf>,
    /// Fixed seed for spawn placement, random per match when unset
    pub match_seed: Option<u64>,
    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
    /// Allowed CORS origins (comma-separated, `*` for any)
    pub client_origin: String,
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

            sim_config_path: env::var("SIM_CONFIG_PATH").ok().map(PathBuf::from),

            match_seed: parse_env("MATCH_SEED")?,

            log_json: env::var("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        })
    }

    /// Gameplay configuration: defaults, then the JSON file, then env overrides
    pub fn load_sim_config(&self) -> Result<SimConfig, ConfigError> {
        let mut sim = match &self.sim_config_path {
            Some(path) => SimConfig::from_file(path)?,
            None => SimConfig::default(),
        };
        sim.apply_env_overrides()?;
        sim.validate()?;
        Ok(sim)
    }
}

/// Gameplay tunables consumed by the simulation as plain data
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Tick broadcasts per second
    pub snapshot_rate: u32,
    /// Countdown between reaching the player threshold and play starting
    pub countdown_seconds: u32,
    /// Joined players required to leave the lobby
    pub player_amount: u32,
    /// Ticks between a player's death and their respawn
    pub respawn_tick_count: u32,
    /// Ignore contacts between entities of the same team
    pub friendly_fire_screening: bool,
    /// Ticks retained by every per-entity command buffer
    pub command_buffer_capacity: usize,
    pub player: PlayerConfig,
    /// Missing fields keep the rogue preset
    #[serde(deserialize_with = "rogue_track")]
    pub rogue: EnemyConfig,
    /// Missing fields keep the slime preset
    #[serde(deserialize_with = "slime_track")]
    pub slime: EnemyConfig,
    pub rogue_attack: AttackConfig,
    /// Enemy spawn points, consumed round-robin
    pub spawn_points: Vec<Vec3>,
    /// Spawn jitter cycles over `[-range, range]`
    pub spawn_jitter_range: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            snapshot_rate: 20,
            countdown_seconds: 3,
            player_amount: 2,
            respawn_tick_count: 300,
            friendly_fire_screening: true,
            command_buffer_capacity: 64,
            player: PlayerConfig::default(),
            rogue: EnemyConfig::rogue(),
            slime: EnemyConfig::slime(),
            rogue_attack: AttackConfig::default(),
            spawn_points: vec![
                Vec3::new(-20.0, 0.0, 20.0),
                Vec3::new(20.0, 0.0, 20.0),
                Vec3::new(20.0, 0.0, -20.0),
                Vec3::new(-20.0, 0.0, -20.0),
            ],
            spawn_jitter_range: 5.0,
        }
    }
}

impl SimConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = parse_env("TICK_RATE")? {
            self.tick_rate = v;
        }
        if let Some(v) = parse_env("PLAYER_AMOUNT")? {
            self.player_amount = v;
        }
        if let Some(v) = parse_env("COUNTDOWN_SECONDS")? {
            self.countdown_seconds = v;
        }
        if let Some(v) = parse_env("RESPAWN_TICK_COUNT")? {
            self.respawn_tick_count = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Validation("tick_rate must be positive"));
        }
        if self.snapshot_rate == 0 {
            return Err(ConfigError::Validation("snapshot_rate must be positive"));
        }
        if self.player_amount == 0 {
            return Err(ConfigError::Validation("player_amount must be positive"));
        }
        if self.command_buffer_capacity == 0 {
            return Err(ConfigError::Validation("command_buffer_capacity must be positive"));
        }
        Ok(())
    }

    /// Ticks between two tick broadcasts
    pub fn snapshot_interval(&self) -> u32 {
        (self.tick_rate / self.snapshot_rate.max(1)).max(1)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub max_hit_points: i32,
    pub walk_speed: f32,
    pub sprint_speed: f32,
    /// Seconds of sprint available from a full pool
    pub sprint_duration: f32,
    /// Seconds sprinting is locked after the pool runs dry
    pub sprint_cooldown: f32,
    /// Players spawn at a random x in `[-half_width, half_width)`
    pub spawn_half_width: f32,
    pub collider_radius: f32,
    /// Velocity and look smoothing factor, multiplied by the step length
    pub look_smoothing: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_hit_points: 100,
            walk_speed: 5.0,
            sprint_speed: 9.0,
            sprint_duration: 3.0,
            sprint_cooldown: 2.0,
            spawn_half_width: 10.0,
            collider_radius: 0.5,
            look_smoothing: 10.0,
        }
    }
}

/// One enemy population track
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnemyConfig {
    /// Total spawns allowed for the match
    pub cap: u32,
    pub spawn_cooldown_seconds: f32,
    pub max_hit_points: i32,
    pub target_radius: f32,
    /// Chase speed; zero keeps the enemy stationary
    pub move_speed: f32,
    /// Damage dealt on touch; zero disables contact damage
    pub contact_damage: i32,
    pub collider_radius: f32,
}

impl EnemyConfig {
    pub fn rogue() -> Self {
        Self {
            cap: 4,
            spawn_cooldown_seconds: 8.0,
            max_hit_points: 60,
            target_radius: 15.0,
            move_speed: 0.0,
            contact_damage: 0,
            collider_radius: 0.6,
        }
    }

    pub fn slime() -> Self {
        Self {
            cap: 10,
            spawn_cooldown_seconds: 4.0,
            max_hit_points: 30,
            target_radius: 12.0,
            move_speed: 3.0,
            contact_damage: 15,
            collider_radius: 0.5,
        }
    }
}

/// Enemy track fields as written in the config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnemyOverrides {
    cap: Option<u32>,
    spawn_cooldown_seconds: Option<f32>,
    max_hit_points: Option<i32>,
    target_radius: Option<f32>,
    move_speed: Option<f32>,
    contact_damage: Option<i32>,
    collider_radius: Option<f32>,
}

impl EnemyOverrides {
    fn apply(self, base: EnemyConfig) -> EnemyConfig {
        EnemyConfig {
            cap: self.cap.unwrap_or(base.cap),
            spawn_cooldown_seconds: self
                .spawn_cooldown_seconds
                .unwrap_or(base.spawn_cooldown_seconds),
            max_hit_points: self.max_hit_points.unwrap_or(base.max_hit_points),
            target_radius: self.target_radius.unwrap_or(base.target_radius),
            move_speed: self.move_speed.unwrap_or(base.move_speed),
            contact_damage: self.contact_damage.unwrap_or(base.contact_damage),
            collider_radius: self.collider_radius.unwrap_or(base.collider_radius),
        }
    }
}

fn rogue_track<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EnemyConfig, D::Error> {
    EnemyOverrides::deserialize(deserializer).map(|o| o.apply(EnemyConfig::rogue()))
}

fn slime_track<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EnemyConfig, D::Error> {
    EnemyOverrides::deserialize(deserializer).map(|o| o.apply(EnemyConfig::slime()))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    pub cooldown_ticks: u32,
    pub fire_point_offset: Vec3,
    pub projectile_damage: i32,
    pub projectile_speed: f32,
    pub projectile_lifetime_seconds: f32,
    pub projectile_radius: f32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            cooldown_ticks: 90,
            fire_point_offset: Vec3::new(0.0, 1.0, 0.0),
            projectile_damage: 10,
            projectile_speed: 12.0,
            projectile_lifetime_seconds: 2.0,
            projectile_radius: 0.25,
        }
    }
}

fn parse_env<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Parse(serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Validation(&'static str),
}
