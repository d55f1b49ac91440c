//! Application configuration structs
//!
//! Loads configuration from environment variables or a layered config file.

use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use super::MemberCacheFlags;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub chunking: ChunkConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: Environment::default(),
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Entity cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Message ring buffer capacity; zero or negative selects the default
    #[serde(default = "default_max_messages")]
    pub max_messages: i64,
    /// Capacity of the semantic event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default)]
    pub member_cache_flags: MemberCacheFlags,
}

impl StateConfig {
    /// Effective ring buffer capacity
    #[must_use]
    pub fn message_capacity(&self) -> usize {
        usize::try_from(self.max_messages)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_MESSAGES)
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            event_buffer: default_event_buffer(),
            member_cache_flags: MemberCacheFlags::default(),
        }
    }
}

/// Member chunking settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_true")]
    pub chunk_guilds_at_startup: bool,
    /// Per-guild wait while the session is hydrating
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Per-guild wait for guilds joined or made available later
    #[serde(default = "default_guild_timeout_ms")]
    pub guild_timeout_ms: u64,
    /// Deadline for explicit member queries
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl ChunkConfig {
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    #[must_use]
    pub fn guild_timeout(&self) -> Duration {
        Duration::from_millis(self.guild_timeout_ms)
    }

    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_guilds_at_startup: true,
            ready_timeout_ms: default_ready_timeout_ms(),
            guild_timeout_ms: default_guild_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

/// Guild presence subscription settings
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_true")]
    pub auto_subscribe: bool,
    /// How many guilds may subscribe at the same time
    #[serde(default = "default_concurrent_guilds")]
    pub concurrent_guilds: usize,
    #[serde(default = "default_max_online")]
    pub max_online: u32,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
            concurrent_guilds: default_concurrent_guilds(),
            max_online: default_max_online(),
        }
    }
}

const DEFAULT_MAX_MESSAGES: usize = 1000;

// Default value functions
fn default_app_name() -> String {
    "relay".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_messages() -> i64 {
    DEFAULT_MAX_MESSAGES as i64
}

fn default_event_buffer() -> usize {
    1024
}

fn default_ready_timeout_ms() -> u64 {
    5_000
}

fn default_guild_timeout_ms() -> u64 {
    60_000
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

fn default_concurrent_guilds() -> usize {
    2
}

fn default_max_online() -> u32 {
    6000
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(None),
    }
}

fn parse_bool(name: &'static str) -> Result<Option<bool>, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(name, raw)),
        },
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional; unparsable values are reported.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let member_cache_flags = match env::var("MEMBER_CACHE_FLAGS") {
            Ok(raw) => MemberCacheFlags::parse(&raw)?,
            Err(_) => MemberCacheFlags::default(),
        };

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            state: StateConfig {
                max_messages: parse_var("MAX_MESSAGES")?.unwrap_or_else(default_max_messages),
                event_buffer: parse_var("EVENT_BUFFER")?.unwrap_or_else(default_event_buffer),
                member_cache_flags,
            },
            chunking: ChunkConfig {
                chunk_guilds_at_startup: parse_bool("CHUNK_GUILDS_AT_STARTUP")?.unwrap_or(true),
                ready_timeout_ms: parse_var("READY_CHUNK_TIMEOUT_MS")?
                    .unwrap_or_else(default_ready_timeout_ms),
                guild_timeout_ms: parse_var("GUILD_CHUNK_TIMEOUT_MS")?
                    .unwrap_or_else(default_guild_timeout_ms),
                query_timeout_ms: parse_var("QUERY_TIMEOUT_MS")?
                    .unwrap_or_else(default_query_timeout_ms),
            },
            subscription: SubscriptionConfig {
                auto_subscribe: parse_bool("AUTO_SUBSCRIBE")?.unwrap_or(true),
                concurrent_guilds: parse_var("SUBSCRIBE_CONCURRENCY")?
                    .unwrap_or_else(default_concurrent_guilds),
                max_online: parse_var("SUBSCRIBE_MAX_ONLINE")?.unwrap_or_else(default_max_online),
            },
        })
    }

    /// Load configuration from a file, with `RELAY__SECTION__KEY` overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),
}
