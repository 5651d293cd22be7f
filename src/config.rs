//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::games::paperio::PaperioConfig;

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:9000";
pub const DEFAULT_LOG_LEVEL: &str = "territory_server=info";
pub const DEFAULT_SESSION_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_BROADCAST_HZ: u32 = 20;

/// Server configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// UDP binding address
    pub server_addr: SocketAddr,
    /// Default tracing directive when `RUST_LOG` is unset
    pub log_level: String,
    /// Seconds of silence before a session stops receiving frames
    pub session_timeout_secs: u64,
    /// Upper bound on frames per second sent to each session
    pub broadcast_hz: u32,
    pub game: PaperioConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECONDS,
            broadcast_hz: DEFAULT_BROADCAST_HZ,
            game: PaperioConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Missing keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let game_defaults = defaults.game.clone();

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        let game = PaperioConfig {
            grid_width: parse_or(&lookup, "GRID_WIDTH", game_defaults.grid_width)?,
            grid_height: parse_or(&lookup, "GRID_HEIGHT", game_defaults.grid_height)?,
            tick_rate_hz: parse_or(&lookup, "TICK_RATE_HZ", game_defaults.tick_rate_hz)?,
            speed_cells_per_second: parse_or(&lookup, "PLAYER_SPEED", game_defaults.speed_cells_per_second)?,
            starting_territory_size: parse_or(&lookup, "STARTING_TERRITORY_SIZE", game_defaults.starting_territory_size)?,
            rng_seed: parse_or(&lookup, "RNG_SEED", game_defaults.rng_seed)?,
            start_paused: parse_or(&lookup, "START_PAUSED", game_defaults.start_paused)?,
            ..game_defaults
        };

        let cell_count = game.grid_width as u64 * game.grid_height as u64;
        let too_wide = game.grid_width > i32::MAX as u32 || game.grid_height > i32::MAX as u32;
        if cell_count == 0 || cell_count > u32::MAX as u64 || too_wide {
            return Err(ConfigError::Invalid {
                key: "GRID_WIDTH/GRID_HEIGHT",
                value: format!("{}x{}", game.grid_width, game.grid_height),
            });
        }
        // The tick period must stay representable in whole microseconds.
        if game.tick_rate_hz == 0 || game.tick_duration().is_zero() {
            return Err(ConfigError::Invalid {
                key: "TICK_RATE_HZ",
                value: game.tick_rate_hz.to_string(),
            });
        }
        if !(game.speed_cells_per_second.is_finite() && game.speed_cells_per_second > 0.0) {
            return Err(ConfigError::Invalid {
                key: "PLAYER_SPEED",
                value: game.speed_cells_per_second.to_string(),
            });
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr.clone()))?,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            session_timeout_secs: parse_or(&lookup, "SESSION_TIMEOUT_SECONDS", defaults.session_timeout_secs)?,
            broadcast_hz: parse_or(&lookup, "BROADCAST_HZ", defaults.broadcast_hz)?,
            game,
        })
    }

    /// Minimum spacing between broadcast frames; zero disables throttling.
    pub fn broadcast_gap(&self) -> Duration {
        if self.broadcast_hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(1_000_000 / self.broadcast_hz as u64)
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid server address format: {0:?}")]
    InvalidAddress(String),
}
