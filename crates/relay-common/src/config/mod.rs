//! Configuration structs

mod app_config;
mod cache_flags;

pub use app_config::{
    AppConfig, AppSettings, ChunkConfig, ConfigError, Environment, StateConfig, SubscriptionConfig,
};
pub use cache_flags::MemberCacheFlags;
