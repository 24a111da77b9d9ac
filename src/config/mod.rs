//! Configuration management
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::time::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Database connection URL; in-memory stores are used when unset
    pub database_url: Option<String>,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Rate limit: requests per second per IP
    pub rate_limit_rps: u32,

    /// CORS allowed origins (comma separated)
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 900 = 15 minutes)
    pub jwt_access_token_ttl_seconds: i64,

    /// Refresh token TTL in days (default: 7)
    pub jwt_refresh_token_ttl_days: i64,

    /// Challenge nonce freshness window in milliseconds (default: 60000)
    pub auth_nonce_ttl_ms: u64,

    /// Name shown in the sign-in message
    pub app_name: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_source(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_source<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let port = var("PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let database_url = var("DATABASE_URL").filter(|url| !url.is_empty());

        let db_max_connections = var("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let rate_limit_rps = var("RATE_LIMIT_RPS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(100);

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS");

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            None => DEV_JWT_SECRET.to_string(),
        };

        let jwt_access_token_ttl_seconds = var("JWT_ACCESS_TOKEN_TTL_SECONDS")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(900);

        let jwt_refresh_token_ttl_days = var("JWT_REFRESH_TOKEN_TTL_DAYS")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7);

        let auth_nonce_ttl_ms = var("AUTH_NONCE_TTL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60_000);

        let app_name = var("AUTH_APP_NAME").unwrap_or_else(|| "Wallet Auth".to_string());

        Ok(Config {
            environment,
            port,
            database_url,
            db_max_connections,
            rate_limit_rps,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_access_token_ttl_seconds,
            jwt_refresh_token_ttl_days,
            auth_nonce_ttl_ms,
            app_name,
        })
    }

    pub fn nonce_ttl(&self) -> Duration {
        Duration::from_millis(self.auth_nonce_ttl_ms)
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        let Some(url) = &self.database_url else {
            return "<memory>".to_string();
        };

        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        url.clone()
    }
}
