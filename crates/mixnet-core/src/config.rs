//! Network and session configuration

use std::collections::BTreeSet;
use std::time::Duration;

pub use mixnet_crypto::sphinx::DEFAULT_PAYLOAD_SIZE;
use mixnet_crypto::sphinx::SphinxParams;

use crate::error::{MixError, Result};
use crate::node::NodeId;
use crate::{DEFAULT_NODE_COUNT, DEFAULT_PATH_LENGTH};

/// Default deadline for [`crate::Mixnet::send_with_timeout`]
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of replay tags each node remembers
pub const DEFAULT_REPLAY_CACHE_CAPACITY: usize = 4096;

/// Mixnet configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixnetConfig {
    /// Number of mix nodes generated at startup
    pub node_count: usize,

    /// Hops per route
    pub path_length: usize,

    /// Header capacity in hops (defaults to `path_length`)
    pub header_hops: Option<usize>,

    /// Fixed payload size in bytes
    pub payload_size: usize,

    /// Nodes never selected as hops
    pub excluded: BTreeSet<NodeId>,

    /// Deadline for a timed send
    pub session_timeout: Duration,
    /// Replay tags each node remembers before evicting the oldest
    pub replay_cache_capacity: usize,
}

impl Default for MixnetConfig {
    fn default() -> Self {
        Self {
            node_count: DEFAULT_NODE_COUNT,
            path_length: DEFAULT_PATH_LENGTH,
            header_hops: None,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            excluded: BTreeSet::new(),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            replay_cache_capacity: DEFAULT_REPLAY_CACHE_CAPACITY,
        }
    }
}

impl MixnetConfig {
    /// Header capacity actually used for packets.
    #[must_use]
    pub fn effective_header_hops(&self) -> usize {
        self.header_hops.unwrap_or(self.path_length)
    }

    /// Packet geometry for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::InvalidConfig`] if header capacity or payload size
    /// are out of range.
    pub fn sphinx_params(&self) -> Result<SphinxParams> {
        SphinxParams::new(self.effective_header_hops(), self.payload_size)
            .map_err(|e| MixError::InvalidConfig(e.to_string().into()))
    }

    /// Validate configuration.
    ///
    /// A path longer than the eligible node count is accepted here and
    /// reported per send as [`MixError::InsufficientNodes`].
    ///
    /// # Errors
    ///
    /// Returns [`MixError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return Err(MixError::invalid_config("node_count must be at least 1"));
        }

        if self.path_length == 0 {
            return Err(MixError::invalid_config("path_length must be at least 1"));
        }

        if self.effective_header_hops() < self.path_length {
            return Err(MixError::InvalidConfig(
                format!(
                    "header_hops ({}) must be at least path_length ({})",
                    self.effective_header_hops(),
                    self.path_length
                )
                .into(),
            ));
        }

        if self.session_timeout.is_zero() {
            return Err(MixError::invalid_config("session_timeout must be non-zero"));
        }
        if self.replay_cache_capacity == 0 {
            return Err(MixError::invalid_config(
                "replay_cache_capacity must be at least 1",
            ));
        }

        self.sphinx_params()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MixnetConfig::default();

        assert_eq!(config.node_count, 10);
        assert_eq!(config.path_length, 5);
        assert_eq!(config.effective_header_hops(), 5);
        assert!(config.excluded.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_params() {
        let params = MixnetConfig::default().sphinx_params().unwrap();
        assert_eq!(params, SphinxParams::default());
    }

    #[test]
    fn test_zero_nodes_invalid() {
        let config = MixnetConfig {
            node_count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MixError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_path_invalid() {
        let config = MixnetConfig {
            path_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_header_smaller_than_path_invalid() {
        let config = MixnetConfig {
            path_length: 5,
            header_hops: Some(3),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_long_path_against_few_nodes_is_valid() {
        let config = MixnetConfig {
            node_count: 3,
            path_length: 6,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tiny_payload_invalid() {
        let config = MixnetConfig {
            payload_size: 8,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MixError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_timeout_invalid() {
        let config = MixnetConfig {
            session_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_replay_capacity_invalid() {
        let config = MixnetConfig {
            replay_cache_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MixError::InvalidConfig(_))));
    }
}
