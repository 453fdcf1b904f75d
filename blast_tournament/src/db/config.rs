//! Database configuration module.

use std::env;
use std::time::Duration;

use super::timeouts::{DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,

    /// Per-query read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Per-statement write timeout in milliseconds
    pub write_timeout_ms: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECT_TIMEOUT_SECS`: Acquire timeout (default: 5)
    /// - `DB_READ_TIMEOUT_MS`: Read query timeout (default: 3000)
    /// - `DB_WRITE_TIMEOUT_MS`: Write statement timeout (default: 5000)
    /// - `DB_IDLE_TIMEOUT_SECS`: Idle timeout (default: 600)
    /// - `DB_MAX_LIFETIME_SECS`: Max lifetime (default: 1800)
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5),
            connect_timeout_secs: parse_env_or("DB_CONNECT_TIMEOUT_SECS", 5),
            read_timeout_ms: parse_env_or(
                "DB_READ_TIMEOUT_MS",
                DEFAULT_READ_TIMEOUT.as_millis() as u64,
            ),
            write_timeout_ms: parse_env_or(
                "DB_WRITE_TIMEOUT_MS",
                DEFAULT_WRITE_TIMEOUT.as_millis() as u64,
            ),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
        })
    }

    /// Create a default configuration for development
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/blast_tournament".to_string(),
            max_connections: 20,
            min_connections: 5,
            connect_timeout_secs: 5,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT.as_millis() as u64,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_timeouts() {
        let config = DatabaseConfig::development();
        assert_eq!(config.read_timeout(), DEFAULT_READ_TIMEOUT);
        assert_eq!(config.write_timeout(), DEFAULT_WRITE_TIMEOUT);
        assert!(config.min_connections <= config.max_connections);
    }
}
