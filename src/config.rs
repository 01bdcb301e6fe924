//! Startup configuration from the environment.
//!
//! `RELAY_ADDR` has no default: the downstream command bridge is an external
//! deployment detail and refusing to start without it beats guessing.

use crate::relay::RelayConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid {expected}: {value}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub relay: RelayConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let relay_addr = env::var("RELAY_ADDR").map_err(|_| ConfigError::Missing("RELAY_ADDR"))?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned());
        let db_path = match env::var("DB_PATH") {
            Ok(p) => PathBuf::from(p),
            Err(_) => default_db_path(),
        };

        let connect_ms = parse_u64("RELAY_CONNECT_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let response_ms = parse_u64("RELAY_RESPONSE_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let max_bytes = parse_u64(
            "RELAY_MAX_RESPONSE_BYTES",
            DEFAULT_MAX_RESPONSE_BYTES as u64,
        )? as usize;

        Ok(Self {
            bind_addr,
            db_path,
            relay: RelayConfig {
                addr: relay_addr,
                connect_timeout: Duration::from_millis(connect_ms),
                response_timeout: Duration::from_millis(response_ms),
                max_response_bytes: max_bytes,
            },
        })
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tracker-hub")
        .join("hub.sqlite3")
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            expected: "integer",
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}
