use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Service Configuration - read from the environment
// ============================================================================
//
// `.env` is loaded by `main` before `Config::from_env` runs. Every setting
// has a default, so an empty environment starts an in-memory service on
// 0.0.0.0:8080.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Scylla,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "scylla" => Ok(StorageBackend::Scylla),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// One of debug, info, warn, error
    pub log_level: String,
    pub log_format: LogFormat,
    pub storage: StorageBackend,
    pub scylla_nodes: Vec<String>,
    pub scylla_keyspace: String,
    pub database_timeout: Duration,
    pub code_regenerations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            storage: StorageBackend::Memory,
            scylla_nodes: vec!["127.0.0.1:9042".to_string()],
            scylla_keyspace: "orders_ks".to_string(),
            database_timeout: Duration::from_secs(5),
            code_regenerations: 1,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, then validates it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse(&get, "SERVER_PORT", "expected a port number")?
                .unwrap_or(defaults.server_port),
            log_level: get("LOGGER_LEVEL")
                .map(|v| v.to_ascii_lowercase())
                .unwrap_or(defaults.log_level),
            log_format: parse(&get, "LOGGER_FORMAT", "expected json or text")?
                .unwrap_or(defaults.log_format),
            storage: parse(&get, "STORAGE_BACKEND", "expected memory or scylla")?
                .unwrap_or(defaults.storage),
            scylla_nodes: get("SCYLLA_NODES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|node| !node.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.scylla_nodes),
            scylla_keyspace: get("SCYLLA_KEYSPACE").unwrap_or(defaults.scylla_keyspace),
            database_timeout: parse::<u64, _>(&get, "DATABASE_TIMEOUT_SECS", "expected seconds")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.database_timeout),
            code_regenerations: parse(&get, "ORDER_CODE_REGENERATIONS", "expected a count")?
                .unwrap_or(defaults.code_regenerations),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_level.as_str(), "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::InvalidValue {
                key: "LOGGER_LEVEL",
                value: self.log_level.clone(),
                reason: "expected debug, info, warn or error",
            });
        }
        if self.storage == StorageBackend::Scylla && self.scylla_nodes.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SCYLLA_NODES",
                value: String::new(),
                reason: "at least one node is required",
            });
        }
        let keyspace_ok = !self.scylla_keyspace.is_empty()
            && self
                .scylla_keyspace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !keyspace_ok {
            return Err(ConfigError::InvalidValue {
                key: "SCYLLA_KEYSPACE",
                value: self.scylla_keyspace.clone(),
                reason: "expected letters, digits and underscores",
            });
        }
        if self.database_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server_host.clone(), self.server_port)
    }
}

fn parse<T, G>(get: &G, key: &'static str, reason: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value, reason }),
    }
}
