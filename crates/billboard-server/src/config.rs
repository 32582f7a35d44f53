// ABOUTME: Configuration loading and validation for the billboard server.
// ABOUTME: Reads bind address, database path, timeout, and Cloudinary credentials from env.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cloudinary::{CloudinaryConfig, DEFAULT_BASE_URL};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BILLBOARD_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("BILLBOARD_TXN_TIMEOUT_MS is not a positive integer: {0}")]
    InvalidTimeout(String),

    #[error("partial Cloudinary config; set every CLOUDINARY_* credential or none ({0} missing)")]
    PartialCloudinary(&'static str),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BillboardConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub txn_timeout: Duration,
    pub cloudinary: Option<CloudinaryConfig>,
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl BillboardConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - BILLBOARD_BIND: socket address to bind (default: 127.0.0.1:8080)
    /// - BILLBOARD_DB_PATH: SQLite database file (default: ./billboard.db)
    /// - BILLBOARD_TXN_TIMEOUT_MS: unit of work timeout in milliseconds (default: 5000)
    /// - CLOUDINARY_CLOUD_NAME / CLOUDINARY_API_KEY / CLOUDINARY_API_SECRET: upload credentials
    /// - CLOUDINARY_BASE_URL: upload API base (default: https://api.cloudinary.com)
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_str =
            std::env::var("BILLBOARD_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let db_path = non_empty("BILLBOARD_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("billboard.db"));

        let txn_timeout = match non_empty("BILLBOARD_TXN_TIMEOUT_MS") {
            None => billboard_core::consistency::DEFAULT_TXN_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        let cloudinary = match (
            non_empty("CLOUDINARY_CLOUD_NAME"),
            non_empty("CLOUDINARY_API_KEY"),
            non_empty("CLOUDINARY_API_SECRET"),
        ) {
            (None, None, None) => None,
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                base_url: non_empty("CLOUDINARY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            }),
            (None, _, _) => return Err(ConfigError::PartialCloudinary("CLOUDINARY_CLOUD_NAME")),
            (_, None, _) => return Err(ConfigError::PartialCloudinary("CLOUDINARY_API_KEY")),
            (_, _, None) => return Err(ConfigError::PartialCloudinary("CLOUDINARY_API_SECRET")),
        };

        Ok(Self {
            bind,
            db_path,
            txn_timeout,
            cloudinary,
        })
    }
}
