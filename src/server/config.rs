use std::env;
use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid listen address {addr}: {source}")]
    InvalidListenAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("ROUTER_ENCRYPTION_KEY must be 64 hex characters (32 bytes)")]
    InvalidEncryptionKey,
}

/// Process configuration, read once at startup. `.env` loading is the
/// binary's job; this only reads the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub encryption_key: String,
    pub listen_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let encryption_key = env::var("ROUTER_ENCRYPTION_KEY")
            .map_err(|_| ConfigError::Missing("ROUTER_ENCRYPTION_KEY"))?;
        if encryption_key.len() != 64 || hex::decode(&encryption_key).is_err() {
            return Err(ConfigError::InvalidEncryptionKey);
        }
        let addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = addr
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddr { addr, source })?;
        Ok(Self {
            database_url,
            encryption_key,
            listen_addr,
        })
    }
}
