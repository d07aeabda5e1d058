//! Configuration file for the mixnet CLI.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mixnet_core::config::{
    DEFAULT_PAYLOAD_SIZE, DEFAULT_REPLAY_CACHE_CAPACITY, DEFAULT_SESSION_TIMEOUT,
};
use mixnet_core::{MixnetConfig, NodeId};
use serde::{Deserialize, Serialize};

/// Mixnet configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,
    /// Route configuration
    #[serde(default)]
    pub route: RouteConfig,
    /// Packet format configuration
    #[serde(default)]
    pub sphinx: SphinxConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulated network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Number of mix nodes
    #[serde(default = "default_node_count")]
    pub node_count: usize,
    /// Deadline for one send, in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Replay tags each node remembers before evicting the oldest
    #[serde(default = "default_replay_cache_capacity")]
    pub replay_cache_capacity: usize,
}

/// Route selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Hops per route
    #[serde(default = "default_path_length")]
    pub path_length: usize,
    /// Nodes never used as hops
    #[serde(default)]
    pub exclude: Vec<NodeId>,
}

/// Packet format configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SphinxConfig {
    /// Header capacity in hops; defaults to the path length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_hops: Option<usize>,
    /// Fixed payload size in bytes
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen host
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_node_count() -> usize {
    mixnet_core::DEFAULT_NODE_COUNT
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT.as_secs() * 1000 + u64::from(DEFAULT_SESSION_TIMEOUT.subsec_millis())
}

fn default_replay_cache_capacity() -> usize {
    DEFAULT_REPLAY_CACHE_CAPACITY
}

fn default_path_length() -> usize {
    mixnet_core::DEFAULT_PATH_LENGTH
}

fn default_payload_size() -> usize {
    DEFAULT_PAYLOAD_SIZE
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            session_timeout_ms: default_session_timeout_ms(),
            replay_cache_capacity: default_replay_cache_capacity(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            path_length: default_path_length(),
            exclude: Vec::new(),
        }
    }
}

impl Default for SphinxConfig {
    fn default() -> Self {
        Self {
            header_hops: None,
            payload_size: default_payload_size(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("mixnet/config.toml")
    }

    /// Load `path` if given, otherwise the default path if it exists,
    /// otherwise built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit or existing file cannot be loaded.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Listen address from the server section
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|_| anyhow::anyhow!("Invalid listen address: {addr}"))
    }

    /// Core configuration for building a [`mixnet_core::Mixnet`]
    #[must_use]
    pub fn to_mixnet_config(&self) -> MixnetConfig {
        MixnetConfig {
            node_count: self.network.node_count,
            path_length: self.route.path_length,
            header_hops: self.sphinx.header_hops,
            payload_size: self.sphinx.payload_size,
            excluded: self.route.exclude.iter().copied().collect(),
            session_timeout: Duration::from_millis(self.network.session_timeout_ms),
            replay_cache_capacity: self.network.replay_cache_capacity,
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr()?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if let Some(id) = self
            .route
            .exclude
            .iter()
            .find(|id| id.as_u32() as usize >= self.network.node_count)
        {
            anyhow::bail!(
                "Excluded node {id} is outside the network (node_count = {})",
                self.network.node_count
            );
        }

        self.to_mixnet_config().validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.network.node_count, 10);
        assert_eq!(config.route.path_length, 5);
        assert!(config.route.exclude.is_empty());
        assert_eq!(config.sphinx.payload_size, 1024);
        assert_eq!(config.server.port, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_match_core() {
        assert_eq!(Config::default().to_mixnet_config(), MixnetConfig::default());
        assert_eq!(
            Duration::from_millis(default_session_timeout_ms()),
            DEFAULT_SESSION_TIMEOUT
        );
    }

    #[test]
    fn test_replay_cache_capacity_from_file() {
        let config: Config = toml::from_str(
            r#"
            [network]
            replay_cache_capacity = 128
            "#,
        )
        .unwrap();
        assert_eq!(config.to_mixnet_config().replay_cache_capacity, 128);
        assert!(config.validate().is_ok());

        let zero: Config = toml::from_str("[network]\nreplay_cache_capacity = 0\n").unwrap();
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.network.node_count = 0;
        assert!(config.validate().is_err());

        config.network.node_count = 10;
        config.server.host = "not a host".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exclusion_outside_network_rejected() {
        let mut config = Config::default();
        config.route.exclude = vec![NodeId::new(10)];
        assert!(config.validate().is_err());

        config.route.exclude = vec![NodeId::new(9)];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [route]
            path_length = 3
            exclude = [0, 4]
            "#,
        )
        .unwrap();

        assert_eq!(config.route.path_length, 3);
        assert_eq!(config.route.exclude, vec![NodeId::new(0), NodeId::new(4)]);
        assert_eq!(config.network.node_count, 10);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_to_mixnet_config() {
        let mut config = Config::default();
        config.route.exclude = vec![NodeId::new(2)];
        config.network.session_timeout_ms = 250;

        let core = config.to_mixnet_config();
        assert_eq!(core.node_count, 10);
        assert!(core.excluded.contains(&NodeId::new(2)));
        assert_eq!(core.session_timeout, Duration::from_millis(250));
        assert_eq!(core.effective_header_hops(), 5);
    }

    #[test]
    fn test_listen_addr() {
        let config = Config::default();
        assert_eq!(
            config.listen_addr().unwrap(),
            "0.0.0.0:5000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = Config::default();
        config.route.exclude = vec![NodeId::new(1)];

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "mixnet-config-test-{}/config.toml",
            std::process::id()
        ));
        let mut config = Config::default();
        config.network.node_count = 7;

        config.save(&path).unwrap();
        let loaded = Config::resolve(Some(&path)).unwrap();
        assert_eq!(loaded.network.node_count, 7);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
