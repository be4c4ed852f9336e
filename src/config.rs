//! Application configuration management.
//!
//! Provides typed configuration loaded from environment variables with validation.

use crate::engine::EnginePolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL
    pub database_url: String,

    /// Database connection pool settings
    pub pool: PoolConfig,

    /// Engine behavior settings
    pub engine: EngineConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
}

/// Engine behavior configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reject dependency edges whose predecessor is outside the successor's
    /// valid-predecessor candidate set
    pub strict_predecessors: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_size: 10 }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_predecessors: false,
        }
    }
}

impl EngineConfig {
    pub fn policy(&self) -> EnginePolicy {
        EnginePolicy {
            strict_predecessors: self.strict_predecessors,
        }
    }
}

/// Configuration loading error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error for '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional environment variables:
    /// - `POOL_MAX_SIZE`: Max pool connections (default: 10)
    /// - `STRICT_PREDECESSORS`: Restrict edges to the candidate set (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError {
            field: "DATABASE_URL".to_string(),
            message: "Required environment variable not set".to_string(),
        })?;

        let pool = PoolConfig {
            max_size: parse_env_or("POOL_MAX_SIZE", 10)?,
        };

        let engine = EngineConfig {
            strict_predecessors: parse_env_or("STRICT_PREDECESSORS", 0)? != 0,
        };

        let config = Self {
            database_url,
            pool,
            engine,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError {
                field: "DATABASE_URL".to_string(),
                message: "Cannot be empty".to_string(),
            });
        }

        if self.pool.max_size == 0 {
            return Err(ConfigError {
                field: "POOL_MAX_SIZE".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Parse an environment variable or return a default value.
fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val.parse().map_err(|_| ConfigError {
            field: name.to_string(),
            message: format!("Invalid value '{}', expected a valid number", val),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_size, 10);
    }

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();
        assert!(!config.strict_predecessors);
    }

    #[test]
    fn test_validate_rejects_empty_database_url() {
        let config = Config {
            database_url: String::new(),
            pool: PoolConfig::default(),
            engine: EngineConfig::default(),
        };
        assert!(config.validate().is_err());
    }
}
