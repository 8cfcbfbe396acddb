//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::{ArenaRules, RespawnPolicy};
use crate::util::time::unix_millis;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Allowed client origins for CORS; empty allows any origin
    pub client_origins: Vec<String>,
    /// Directory served as static assets
    pub static_dir: Option<PathBuf>,

    /// Ticks per second
    pub tick_rate: u32,
    /// Outbound frames queued per session before it is dropped
    pub session_buffer: usize,
    /// Inbound frames per second per session
    pub input_rate_limit: u32,
    /// Seed for spawn positions and colours
    pub world_seed: u64,

    /// Simulation constants for the arena
    pub rules: ArenaRules,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port.trim()),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let tick_rate: u32 = parse_or(&lookup, "TICK_RATE", 60)?;
        if tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE", "must be greater than zero".into()));
        }

        let grace_ms = parse_or(&lookup, "RESPAWN_GRACE_MS", 3000)?;
        let respawn = match lookup("RESPAWN_POLICY").as_deref().map(str::trim) {
            None | Some("respawn") => RespawnPolicy::Respawn { grace_ms },
            Some("single_life") => RespawnPolicy::SingleLife,
            Some(other) => {
                return Err(ConfigError::Invalid(
                    "RESPAWN_POLICY",
                    format!("expected respawn or single_life, got {other}"),
                ))
            }
        };

        let defaults = ArenaRules::default();
        let rules = ArenaRules {
            world_width: parse_or(&lookup, "WORLD_WIDTH", defaults.world_width)?,
            world_height: parse_or(&lookup, "WORLD_HEIGHT", defaults.world_height)?,
            respawn,
            ..defaults
        };
        rules
            .validate()
            .map_err(|reason| ConfigError::Invalid("WORLD_WIDTH/WORLD_HEIGHT", reason.into()))?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            client_origins,
            static_dir: lookup("STATIC_DIR").map(PathBuf::from),

            tick_rate,
            session_buffer: parse_or(&lookup, "SESSION_BUFFER", 64)?,
            input_rate_limit: parse_or(&lookup, "INPUT_RATE_LIMIT", 120)?,
            world_seed: match lookup("WORLD_SEED") {
                Some(_) => parse_required(&lookup, "WORLD_SEED")?,
                None => unix_millis(),
            },

            rules,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(_) => parse_required(lookup, key),
        None => Ok(default),
    }
}

fn parse_required<F, T>(lookup: &F, key: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key).ok_or(ConfigError::Missing(key))?;
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, format!("cannot parse {raw:?}")))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),

    #[error("Invalid server address format")]
    InvalidAddress,
}
