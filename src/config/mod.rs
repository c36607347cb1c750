//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `PLAGWATCH_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COLLECTION_NAME, DEFAULT_EMBEDDING_DIM, DEFAULT_PLAGIARISM_THRESHOLD, DEFAULT_TOP_K,
    DimConfig, MAX_THRESHOLD_CACHE_TTL_SECS, MAX_TOP_K,
};

/// Service configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `PLAGWATCH_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Postgres connection string for submissions and tenant settings.
    pub database_url: String,

    /// Upper bound on pooled Postgres connections. Default: `10`.
    pub db_max_connections: u32,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Collection holding one embedding per submission.
    pub collection_name: String,

    /// OpenAI-compatible embeddings endpoint.
    pub embedding_url: String,

    /// Model name sent with every embedding request.
    pub embedding_model: String,

    /// Optional bearer token for the embedding provider.
    pub embedding_api_key: Option<String>,

    /// Fixed embedding dimension for this deployment. Default: `768`.
    pub embedding_dim: usize,

    /// Timeout for a single embedding call.
    pub embed_timeout: Duration,

    /// Timeout for a single similarity query.
    pub search_timeout: Duration,

    /// Neighbours compared per ingested submission. Default: `10`.
    pub top_k: usize,

    /// Threshold used when a tenant has none configured. Default: `0.85`.
    pub default_threshold: f32,

    /// TTL for cached tenant thresholds; zero disables the cache.
    pub threshold_cache_ttl: Duration,

    /// Capacity of the channel between the bus callback and the consumer.
    pub channel_capacity: usize,

    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

/// Default Qdrant URL used when `PLAGWATCH_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Default Postgres URL used when `PLAGWATCH_DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/plagwatch";

/// Default embeddings endpoint (a local OpenAI-compatible server).
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11434/v1/embeddings";

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: 10,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            embed_timeout: Duration::from_millis(10_000),
            search_timeout: Duration::from_millis(5_000),
            top_k: DEFAULT_TOP_K,
            default_threshold: DEFAULT_PLAGIARISM_THRESHOLD,
            threshold_cache_ttl: Duration::ZERO,
            channel_capacity: 1024,
            log_json: false,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "PLAGWATCH_PORT";
    const ENV_BIND_ADDR: &'static str = "PLAGWATCH_BIND_ADDR";
    const ENV_DATABASE_URL: &'static str = "PLAGWATCH_DATABASE_URL";
    const ENV_DB_MAX_CONNECTIONS: &'static str = "PLAGWATCH_DB_MAX_CONNECTIONS";
    const ENV_QDRANT_URL: &'static str = "PLAGWATCH_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "PLAGWATCH_COLLECTION";
    const ENV_EMBEDDING_URL: &'static str = "PLAGWATCH_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "PLAGWATCH_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "PLAGWATCH_EMBEDDING_API_KEY";
    const ENV_EMBEDDING_DIM: &'static str = "PLAGWATCH_EMBEDDING_DIM";
    const ENV_EMBED_TIMEOUT_MS: &'static str = "PLAGWATCH_EMBED_TIMEOUT_MS";
    const ENV_SEARCH_TIMEOUT_MS: &'static str = "PLAGWATCH_SEARCH_TIMEOUT_MS";
    const ENV_TOP_K: &'static str = "PLAGWATCH_TOP_K";
    const ENV_DEFAULT_THRESHOLD: &'static str = "PLAGWATCH_DEFAULT_THRESHOLD";
    const ENV_THRESHOLD_CACHE_TTL_SECS: &'static str = "PLAGWATCH_THRESHOLD_CACHE_TTL_SECS";
    const ENV_CHANNEL_CAPACITY: &'static str = "PLAGWATCH_CHANNEL_CAPACITY";
    const ENV_LOG_JSON: &'static str = "PLAGWATCH_LOG_JSON";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let database_url = Self::parse_string_from_env(Self::ENV_DATABASE_URL, defaults.database_url);
        let db_max_connections =
            Self::parse_number_from_env(Self::ENV_DB_MAX_CONNECTIONS, defaults.db_max_connections)?;
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let collection_name =
            Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection_name);
        let embedding_url =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_URL, defaults.embedding_url);
        let embedding_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_MODEL, defaults.embedding_model);
        let embedding_api_key = Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_API_KEY);
        let embedding_dim =
            Self::parse_number_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim)?;
        let embed_timeout = Self::parse_millis_from_env(Self::ENV_EMBED_TIMEOUT_MS, defaults.embed_timeout)?;
        let search_timeout =
            Self::parse_millis_from_env(Self::ENV_SEARCH_TIMEOUT_MS, defaults.search_timeout)?;
        let top_k = Self::parse_number_from_env(Self::ENV_TOP_K, defaults.top_k)?;
        let default_threshold =
            Self::parse_number_from_env(Self::ENV_DEFAULT_THRESHOLD, defaults.default_threshold)?;
        let threshold_cache_ttl = Duration::from_secs(Self::parse_number_from_env(
            Self::ENV_THRESHOLD_CACHE_TTL_SECS,
            defaults.threshold_cache_ttl.as_secs(),
        )?);
        let channel_capacity =
            Self::parse_number_from_env(Self::ENV_CHANNEL_CAPACITY, defaults.channel_capacity)?;
        let log_json = Self::parse_bool_from_env(Self::ENV_LOG_JSON, defaults.log_json);

        Ok(Self {
            port,
            bind_addr,
            database_url,
            db_max_connections,
            qdrant_url,
            collection_name,
            embedding_url,
            embedding_model,
            embedding_api_key,
            embedding_dim,
            embed_timeout,
            search_timeout,
            top_k,
            default_threshold,
            threshold_cache_ttl,
            channel_capacity,
            log_json,
        })
    }

    /// Validates ranges and basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dim == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_EMBEDDING_DIM,
            });
        }

        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.default_threshold,
            });
        }

        if self.top_k == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_TOP_K,
            });
        }
        if self.top_k > MAX_TOP_K {
            return Err(ConfigError::AboveMaximum {
                name: Self::ENV_TOP_K,
                value: self.top_k as u64,
                max: MAX_TOP_K as u64,
            });
        }

        let ttl_secs = self.threshold_cache_ttl.as_secs();
        if ttl_secs > MAX_THRESHOLD_CACHE_TTL_SECS {
            return Err(ConfigError::AboveMaximum {
                name: Self::ENV_THRESHOLD_CACHE_TTL_SECS,
                value: ttl_secs,
                max: MAX_THRESHOLD_CACHE_TTL_SECS,
            });
        }

        if self.embed_timeout.is_zero() {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_EMBED_TIMEOUT_MS,
            });
        }
        if self.search_timeout.is_zero() {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_SEARCH_TIMEOUT_MS,
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_CHANNEL_CAPACITY,
            });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_DB_MAX_CONNECTIONS,
            });
        }

        for (name, value) in [
            (Self::ENV_DATABASE_URL, &self.database_url),
            (Self::ENV_QDRANT_URL, &self.qdrant_url),
            (Self::ENV_EMBEDDING_URL, &self.embedding_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyUrl { name });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Returns the embedding dimension as a [`DimConfig`].
    pub fn dim_config(&self) -> DimConfig {
        DimConfig::new(self.embedding_dim)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_number_from_env<T: std::str::FromStr>(
        var_name: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_millis_from_env(
        var_name: &'static str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        let millis = Self::parse_number_from_env(var_name, default.as_millis() as u64)?;
        Ok(Duration::from_millis(millis))
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(default)
    }
}
