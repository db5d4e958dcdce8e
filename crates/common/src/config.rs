//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Master secret: protects owner bootstrap and seeds server key derivation
    pub master_password: String,

    /// Public base URL clients reach this deployment at
    pub external_url: String,

    /// Comma-separated list of allowed CORS origins
    pub allowed_origins: Vec<String>,

    /// Session token lifetime in hours
    pub jwt_expiration_hours: i64,

    /// Login challenge lifetime in seconds
    pub challenge_ttl_sec: i64,

    /// Owner bootstrap assertion freshness window in seconds
    pub registration_token_ttl_sec: i64,

    /// Retention sweep: events older than this many days are deleted
    pub event_retention_days: i64,

    /// Local wall-clock hour the retention sweep first runs at
    pub sweep_hour_local: u32,

    /// Runtime configuration
    pub log_level: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "4545".to_string())
            .parse()
            .unwrap_or(4545);

        let external_url =
            env::var("EXTERNAL_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|csv| {
                csv.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    external_url.clone(),
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,

            master_password: env::var("MASTER_PASSWORD")
                .map_err(|_| anyhow::anyhow!("MASTER_PASSWORD is required"))?,

            external_url,
            allowed_origins,

            jwt_expiration_hours: parse_env_or("JWT_EXPIRATION_HOURS", 24),
            challenge_ttl_sec: parse_env_or("CHALLENGE_TTL_SEC", 300),
            registration_token_ttl_sec: parse_env_or("REGISTRATION_TOKEN_TTL_SEC", 10),
            event_retention_days: parse_env_or("EVENT_RETENTION_DAYS", 7),
            sweep_hour_local: parse_env_or("SWEEP_HOUR_LOCAL", 2i64) as u32,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            port,
        };

        Ok(config)
    }
}

fn parse_env_or(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
