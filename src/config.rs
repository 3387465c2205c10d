use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

pub const ADDR_VAR: &str = "CHECKERS_ADDR";
pub const WORKERS_VAR: &str = "CHECKERS_WORKERS";
pub const IDLE_SECS_VAR: &str = "CHECKERS_IDLE_SECS";
pub const LOG_VAR: &str = "CHECKERS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Connection worker threads.
    pub workers: usize,
    /// Sessions untouched for this long are swept.
    pub idle_timeout: Duration,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            workers: 8,
            idle_timeout: Duration::from_secs(30 * 60),
            log_filter: "checkers=info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`, keeping the default for every unset
    /// key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = read(&lookup, ADDR_VAR)? {
            config.bind_addr = parse(ADDR_VAR, value, "socket address")?;
        }
        if let Some(value) = read(&lookup, WORKERS_VAR)? {
            let workers: usize = parse(WORKERS_VAR, value.clone(), "positive integer")?;
            if workers == 0 {
                return Err(ConfigError::Invalid {
                    key: WORKERS_VAR,
                    value,
                    expected: "positive integer",
                });
            }
            config.workers = workers;
        }
        if let Some(value) = read(&lookup, IDLE_SECS_VAR)? {
            config.idle_timeout = Duration::from_secs(parse(IDLE_SECS_VAR, value, "number of seconds")?);
        }
        if let Some(value) = read(&lookup, LOG_VAR)? {
            config.log_filter = value;
        }

        Ok(config)
    }
}

fn read(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<String>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { key }),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String, expected: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value,
        expected,
    })
}
