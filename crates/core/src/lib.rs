//! Environment configuration shared by the tabula crates

pub mod config;

pub use config::{AppConfig, AppConfigTrait, ConfigError, ConfigSource, DatabaseSettings, Environment};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get toolkit version
pub fn version() -> &'static str {
    VERSION
}
