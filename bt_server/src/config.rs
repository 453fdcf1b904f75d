//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use blast_tournament::db::DatabaseConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis URL for the ranked store; in-memory store when absent
    pub redis_url: Option<String>,
    /// Remote dynamic configuration
    pub remote_config: RemoteConfigSettings,
    /// Prometheus scrape address; exporter disabled when absent
    pub metrics_bind: Option<SocketAddr>,
    /// Per-topic bus queue capacity
    pub bus_capacity: usize,
    /// Leaderboard page cache lifetime in seconds
    pub leaderboard_cache_ttl_secs: u64,
    /// Whether this instance runs the daily create/close jobs
    pub scheduler_enabled: bool,
}

/// Where the dynamic configuration document is fetched from
#[derive(Debug, Clone)]
pub struct RemoteConfigSettings {
    /// Document URL; built-in defaults are used when absent
    pub url: Option<String>,
    /// Bearer token sent with the request
    pub token: Option<String>,
    /// Refresh period in seconds
    pub refresh_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `redis_url_override` - Optional Redis URL override (from CLI args)
    /// * `metrics_bind_override` - Optional metrics address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        database_url_override: Option<String>,
        redis_url_override: Option<String>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let defaults = DatabaseConfig::development();
        let database = DatabaseConfig {
            database_url: database_url_override
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .unwrap_or(defaults.database_url),
            max_connections: parse_env("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: parse_env(
                "DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,
            read_timeout_ms: parse_env("DB_READ_TIMEOUT_MS", defaults.read_timeout_ms)?,
            write_timeout_ms: parse_env("DB_WRITE_TIMEOUT_MS", defaults.write_timeout_ms)?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs)?,
        };

        let redis_url = redis_url_override.or_else(|| non_empty_env("REDIS_URL"));

        let remote_config = RemoteConfigSettings {
            url: non_empty_env("CONFIG_URL"),
            token: non_empty_env("CONFIG_TOKEN"),
            refresh_secs: parse_env("CONFIG_REFRESH_SECS", 300)?,
        };

        let metrics_bind = match metrics_bind_override {
            Some(addr) => Some(addr),
            None => non_empty_env("METRICS_BIND")
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::Invalid {
                        var: "METRICS_BIND".to_string(),
                        reason: format!("'{v}' is not a socket address"),
                    })
                })
                .transpose()?,
        };

        Ok(ServerConfig {
            database,
            redis_url,
            remote_config,
            metrics_bind,
            bus_capacity: parse_env("BUS_TOPIC_CAPACITY", 1024)?,
            leaderboard_cache_ttl_secs: parse_env("LEADERBOARD_CACHE_TTL_SECS", 30)?,
            scheduler_enabled: parse_env("SCHEDULER_ENABLED", true)?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.database.read_timeout_ms == 0 || self.database.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_READ_TIMEOUT_MS/DB_WRITE_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(url) = &self.remote_config.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    var: "CONFIG_URL".to_string(),
                    reason: "Must be an http(s) URL".to_string(),
                });
            }
        }

        if self.remote_config.refresh_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "CONFIG_REFRESH_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.bus_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "BUS_TOPIC_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.leaderboard_cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "LEADERBOARD_CACHE_TTL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn leaderboard_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.leaderboard_cache_ttl_secs)
    }

    pub fn config_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.remote_config.refresh_secs)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match non_empty_env(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Cannot parse '{raw}'"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            database: DatabaseConfig::development(),
            redis_url: None,
            remote_config: RemoteConfigSettings {
                url: None,
                token: None,
                refresh_secs: 300,
            },
            metrics_bind: None,
            bus_capacity: 1024,
            leaderboard_cache_ttl_secs: 30,
            scheduler_enabled: true,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "CONFIG_URL".to_string(),
            reason: "Must be an http(s) URL".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CONFIG_URL"));
        assert!(msg.contains("http(s)"));
    }

    #[test]
    fn test_default_config_is_valid() {
        config().validate().unwrap();
        assert_eq!(config().leaderboard_cache_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_validation_pool_bounds() {
        let mut config = config();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var, .. }) if var == "DB_MIN_CONNECTIONS"
        ));
    }

    #[test]
    fn test_config_validation_remote_url() {
        let mut config = config();
        config.remote_config.url = Some("ftp://example.com/config.json".to_string());
        assert!(config.validate().is_err());

        config.remote_config.url = Some("https://example.com/config.json".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn test_config_validation_zero_capacity() {
        let mut config = config();
        config.bus_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_default_when_unset() {
        let value: u64 = parse_env("BT_SERVER_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }
}
