//! Service settings
//!
//! Defaults overlaid by `USERS_*` environment variables, e.g.
//! `USERS_BIND_ADDRESS=127.0.0.1:8080` or `USERS_STORAGE=memory`.
//! The seed file defaults to this crate's `seed-data/users.csv`; deployed
//! binaries should point `USERS_SEED_FILE` at their own copy.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

const DEFAULT_SEED_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/seed-data/users.csv");

/// Which store backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Users service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_address: String,
    pub storage: StorageBackend,
    /// Delimited-text file read by the seed endpoint
    pub seed_file: PathBuf,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_address", "0.0.0.0:3002")?
            .set_default("storage", "postgres")?
            .set_default("seed_file", DEFAULT_SEED_FILE)?
            .set_default("log_level", "info")?
            .add_source(Environment::with_prefix("USERS"))
            .build()?
            .try_deserialize()
    }
}
