//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use live_poker::{
    bot::registry::DEFAULT_BOT_PREFIX,
    db::DatabaseConfig,
    game::constants::{
        DEFAULT_BLIND_STEP_SECONDS, DEVICE_FRESHNESS_WINDOW_SECS, MAX_SEATS, MIN_PLAYERS,
    },
    table::TableConfig,
    video::webhook::DEFAULT_WEBHOOK_LEEWAY_SECS,
};
use std::net::{Ipv4Addr, SocketAddr};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// PostgreSQL settings; `None` runs against the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Security configuration
    pub security: SecurityConfig,
    /// Defaults for tables provisioned at startup
    pub table_defaults: TableDefaultsConfig,
    /// Number of new tables to provision on startup
    pub num_tables: usize,
    /// Prometheus scrape address, if metrics are enabled
    pub metrics_bind: Option<SocketAddr>,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Session JWT secret (required)
    pub jwt_secret: String,
    /// Shared token the bot scheduler presents in `x-scheduler-token`
    pub scheduler_token: Option<String>,
    /// Conferencing API secret; enables the video webhook when set
    pub video_api_secret: Option<String>,
    /// Leeway for webhook token expiry checks
    pub video_leeway_secs: u64,
    /// Allowed clock skew for scanner timestamps
    pub device_freshness_secs: i64,
}

/// Default table configuration
#[derive(Debug, Clone)]
pub struct TableDefaultsConfig {
    /// Session subject of the dealer running startup tables
    pub dealer_id: String,
    /// Base small blind
    pub small_blind: i64,
    /// Base big blind
    pub big_blind: i64,
    /// Seconds per blind level
    pub blind_step_seconds: i64,
    /// Seats per table
    pub seat_count: u8,
    /// Session subject prefix reserved for bots
    pub bot_prefix: String,
}

impl TableDefaultsConfig {
    /// Table config for the `index`th startup table (zero based).
    pub fn table_config(&self, index: usize) -> TableConfig {
        TableConfig {
            name: format!("Table {}", index + 1),
            dealer_id: self.dealer_id.clone(),
            small_blind: self.small_blind,
            big_blind: self.big_blind,
            blind_step_seconds: Some(self.blind_step_seconds),
            seat_count: self.seat_count,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `num_tables_override` - Optional number of tables override (from CLI args)
    /// * `memory` - Ignore any database URL and use the in-memory store
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        num_tables_override: Option<usize>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, 6969)));

        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty() && !memory);

        let database = database_url.map(|database_url| {
            let defaults = DatabaseConfig::development();
            DatabaseConfig {
                database_url,
                max_connections: parse_env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
                min_connections: parse_env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
                connection_timeout_secs: parse_env_or(
                    "DB_CONNECTION_TIMEOUT",
                    defaults.connection_timeout_secs,
                ),
                idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
                max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
            }
        });

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let security = SecurityConfig {
            jwt_secret,
            scheduler_token: optional_env("BOT_SCHEDULER_TOKEN"),
            video_api_secret: optional_env("VIDEO_API_SECRET"),
            video_leeway_secs: parse_env_or("VIDEO_WEBHOOK_LEEWAY_SECS", DEFAULT_WEBHOOK_LEEWAY_SECS),
            device_freshness_secs: parse_env_or(
                "DEVICE_FRESHNESS_SECS",
                DEVICE_FRESHNESS_WINDOW_SECS,
            ),
        };

        let table_defaults = TableDefaultsConfig {
            dealer_id: std::env::var("TABLE_DEALER_ID").unwrap_or_else(|_| "dealer".to_string()),
            small_blind: parse_env_or("TABLE_SMALL_BLIND", 5),
            big_blind: parse_env_or("TABLE_BIG_BLIND", 10),
            blind_step_seconds: parse_env_or("TABLE_BLIND_STEP_SECS", DEFAULT_BLIND_STEP_SECONDS),
            seat_count: parse_env_or("TABLE_SEAT_COUNT", MAX_SEATS),
            bot_prefix: std::env::var("BOT_PREFIX")
                .unwrap_or_else(|_| DEFAULT_BOT_PREFIX.to_string()),
        };

        // A persistent store keeps its tables across restarts
        let default_tables = if database.is_some() { 0 } else { 1 };
        let num_tables =
            num_tables_override.unwrap_or_else(|| parse_env_or("STARTUP_TABLES", default_tables));

        let metrics_bind = std::env::var("METRICS_BIND")
            .ok()
            .and_then(|s| s.parse().ok());

        Ok(ServerConfig {
            bind,
            database,
            security,
            table_defaults,
            num_tables,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self
            .security
            .scheduler_token
            .as_ref()
            .is_some_and(|token| token.len() < 16)
        {
            return Err(ConfigError::Invalid {
                var: "BOT_SCHEDULER_TOKEN".to_string(),
                reason: "Must be at least 16 characters".to_string(),
            });
        }

        if self.security.device_freshness_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "DEVICE_FRESHNESS_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        let defaults = &self.table_defaults;
        if defaults.dealer_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "TABLE_DEALER_ID".to_string(),
                reason: "Cannot be empty".to_string(),
            });
        }

        if defaults.small_blind <= 0 {
            return Err(ConfigError::Invalid {
                var: "TABLE_SMALL_BLIND".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if defaults.big_blind <= defaults.small_blind {
            return Err(ConfigError::Invalid {
                var: "TABLE_BIG_BLIND".to_string(),
                reason: format!(
                    "Must be greater than small blind ({})",
                    defaults.small_blind
                ),
            });
        }

        if defaults.blind_step_seconds <= 0 {
            return Err(ConfigError::Invalid {
                var: "TABLE_BLIND_STEP_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if usize::from(defaults.seat_count) < MIN_PLAYERS || defaults.seat_count > MAX_SEATS {
            return Err(ConfigError::Invalid {
                var: "TABLE_SEAT_COUNT".to_string(),
                reason: format!("Must be between {MIN_PLAYERS} and {MAX_SEATS}"),
            });
        }

        if defaults.bot_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "BOT_PREFIX".to_string(),
                reason: "Cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
