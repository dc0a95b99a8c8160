// Centralized configuration - load ALL env vars ONCE at startup

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Accessor so call sites read `config()` instead of touching the static
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Server
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,

    // Database (SQLite file path or `sqlite://` URL)
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_connect_timeout: u64,

    // Geolocation provider
    pub geo_lookup_enabled: bool,
    pub geo_timeout_secs: u64,

    // Trial management
    pub trial_sweep_interval_secs: u64,
    pub session_ttl_hours: i64,

    // Dashboard URL used when handing out tokens
    pub dashboard_base_url: String,

    // CORS
    pub cors_allowed_origins: Vec<String>,

    // Payment provider placeholders. Never real credentials; webhook
    // handlers are stubs and do not verify signatures.
    pub stripe_api_key: String,
    pub paypal_client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_var("PORT", 8080_u16)?;

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .into(),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "visitor_investigations.db".to_string()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5_u32)?,
            database_connect_timeout: parse_var("DATABASE_CONNECT_TIMEOUT", 10_u64)?,
            geo_lookup_enabled: parse_var("GEO_LOOKUP_ENABLED", true)?,
            geo_timeout_secs: parse_var("GEO_TIMEOUT_SECS", 5_u64)?,
            trial_sweep_interval_secs: parse_var("TRIAL_SWEEP_INTERVAL_SECS", 3600_u64)?,
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 24_i64)?,
            dashboard_base_url: env::var("DASHBOARD_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.trim().to_string())
                .collect(),
            stripe_api_key: env::var("STRIPE_API_KEY")
                .unwrap_or_else(|_| "sk_test_placeholder".to_string()),
            paypal_client_id: env::var("PAYPAL_CLIENT_ID")
                .unwrap_or_else(|_| "paypal_client_placeholder".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!(Environment::from("prod".to_string()), Environment::Production);
        assert_eq!(Environment::from("dev".to_string()), Environment::Development);
        assert_eq!(
            Environment::from("anything-else".to_string()),
            Environment::Development
        );
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = AppConfig::from_env().expect("defaults should load");
        assert!(config.database_max_connections >= 1);
        assert!(config.trial_sweep_interval_secs > 0);
    }
}
