//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.
//!
//! Values are read once and passed to the components at construction; nothing
//! here is consulted as process-wide state afterwards.

use crate::client::OpenSearchConfig;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "SENTRY_NODESTORE_OPENSEARCH_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub opensearch: OpenSearchConfig,

    #[serde(default)]
    pub nodestore: NodeStoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Index layout and template settings for the node store
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStoreConfig {
    /// Static part of every index name (`<prefix>-YYYY.MM.DD`)
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,

    #[serde(default = "default_number_of_shards")]
    pub number_of_shards: u32,

    #[serde(default = "default_number_of_replicas")]
    pub number_of_replicas: u32,

    #[serde(default)]
    pub index_codec: IndexCodec,

    /// Template name; derived from the prefix when unset
    #[serde(default)]
    pub template_name: Option<String>,

    /// Alias the template attaches to every bucket; derived from the prefix when unset
    #[serde(default)]
    pub alias_name: Option<String>,

    /// Search all buckets when a read or delete has no timestamp hint
    #[serde(default = "default_true")]
    pub search_fallback: bool,

    /// LZ4-compress payloads before base64-encoding them
    #[serde(default = "default_true")]
    pub compress_payloads: bool,
}

fn default_index_prefix() -> String {
    "sentry".to_string()
}

fn default_number_of_shards() -> u32 {
    3
}

fn default_number_of_replicas() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for NodeStoreConfig {
    fn default() -> Self {
        Self {
            index_prefix: default_index_prefix(),
            number_of_shards: default_number_of_shards(),
            number_of_replicas: default_number_of_replicas(),
            index_codec: IndexCodec::default(),
            template_name: None,
            alias_name: None,
            search_fallback: default_true(),
            compress_payloads: default_true(),
        }
    }
}

impl NodeStoreConfig {
    pub fn new(index_prefix: impl Into<String>) -> Self {
        Self {
            index_prefix: index_prefix.into(),
            ..Default::default()
        }
    }

    /// Glob matching every bucket index
    pub fn index_pattern(&self) -> String {
        format!("{}-*", self.index_prefix)
    }

    pub fn template_name(&self) -> String {
        self.template_name
            .clone()
            .unwrap_or_else(|| format!("{}-nodestore", self.index_prefix))
    }

    /// Alias covering every bucket created from the template
    pub fn alias_name(&self) -> String {
        self.alias_name
            .clone()
            .unwrap_or_else(|| format!("{}-nodestore", self.index_prefix))
    }

    /// Set the prefix from an index pattern such as `custom-events-*`
    pub fn set_index_pattern(&mut self, pattern: &str) {
        let prefix = pattern.trim_end_matches('*').trim_end_matches('-');
        if prefix.is_empty() {
            tracing::warn!("Ignoring index pattern {:?} without a prefix", pattern);
            return;
        }
        self.index_prefix = prefix.to_string();
    }
}

/// Store-side compression codec for bucket indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexCodec {
    /// LZ4, the store's default
    Default,
    /// DEFLATE, smallest on disk and slowest
    BestCompression,
    #[default]
    Zstd,
    ZstdNoDict,
}

impl IndexCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexCodec::Default => "default",
            IndexCodec::BestCompression => "best_compression",
            IndexCodec::Zstd => "zstd",
            IndexCodec::ZstdNoDict => "zstd_no_dict",
        }
    }
}

impl fmt::Display for IndexCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexCodec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "lz4" => Ok(IndexCodec::Default),
            "best_compression" | "deflate" => Ok(IndexCodec::BestCompression),
            "zstd" => Ok(IndexCodec::Zstd),
            "zstd_no_dict" => Ok(IndexCodec::ZstdNoDict),
            other => Err(ConfigError::Invalid {
                key: "index_codec".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("nodestore").join("config.toml")),
            Some(PathBuf::from("/etc/nodestore/config.toml")),
            Some(PathBuf::from("./nodestore.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply process environment overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok());
    }

    /// Apply overrides from a lookup keyed by the variable name without prefix.
    ///
    /// Values that fail to parse are ignored and the current value is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Index layout
        if let Some(pattern) = lookup("INDEX_PATTERN") {
            self.nodestore.set_index_pattern(&pattern);
        }
        if let Some(prefix) = lookup("INDEX_PREFIX") {
            self.nodestore.index_prefix = prefix;
        }
        if let Some(name) = lookup("TEMPLATE_NAME") {
            self.nodestore.template_name = Some(name);
        }
        if let Some(name) = lookup("ALIAS_NAME") {
            self.nodestore.alias_name = Some(name);
        }
        override_parsed(&lookup, "NUMBER_OF_SHARDS", &mut self.nodestore.number_of_shards);
        override_parsed(&lookup, "NUMBER_OF_REPLICAS", &mut self.nodestore.number_of_replicas);
        override_parsed(&lookup, "INDEX_CODEC", &mut self.nodestore.index_codec);
        override_parsed(&lookup, "SEARCH_FALLBACK", &mut self.nodestore.search_fallback);

        // Connection
        if let Some(url) = lookup("URL") {
            self.opensearch.url = url;
        }
        if let Some(username) = lookup("USERNAME") {
            self.opensearch.username = Some(username);
        }
        if let Some(password) = lookup("PASSWORD") {
            self.opensearch.password = Some(password);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}{}={:?}", ENV_PREFIX, key, raw);
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Node store configuration
#
# Environment variables override these settings
# (all prefixed with SENTRY_NODESTORE_OPENSEARCH_):
# - URL, USERNAME, PASSWORD
# - INDEX_PREFIX, INDEX_PATTERN, TEMPLATE_NAME, ALIAS_NAME
# - NUMBER_OF_SHARDS, NUMBER_OF_REPLICAS, INDEX_CODEC
# - SEARCH_FALLBACK
# - LOG_LEVEL, LOG_FORMAT

[opensearch]
# Cluster URL
url = "http://localhost:9200"

# Request timeout (ms)
request_timeout_ms = 30000

# Skip TLS verification (self-signed clusters only)
accept_invalid_certs = false

[nodestore]
# Indices are named <index_prefix>-YYYY.MM.DD
index_prefix = "sentry"

# Applied through the index template to every new daily index
number_of_shards = 3
number_of_replicas = 1

# One of: default, best_compression, zstd, zstd_no_dict
index_codec = "zstd"

# Look up records in every bucket when no timestamp is known
search_fallback = true

# LZ4-compress payloads before storing them
compress_payloads = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
