// src/config.rs
use std::env;
use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "default_secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub bcrypt_cost: u32,
    pub secure_cookies: bool,
    pub credential_attempts_per_minute: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: None,
            db_max_connections: 5,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            secure_cookies: false,
            credential_attempts_per_minute: 10,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set. Falling back to an insecure default secret.");
                defaults.jwt_secret
            }
        };

        Ok(AppConfig {
            database_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            bcrypt_cost: parse_var("BCRYPT_COST", defaults.bcrypt_cost)?,
            secure_cookies: parse_bool("SECURE_COOKIES", defaults.secure_cookies)?,
            credential_attempts_per_minute: parse_var(
                "CREDENTIAL_ATTEMPTS_PER_MINUTE",
                defaults.credential_attempts_per_minute,
            )?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
        Err(_) => Ok(default),
    }
}
