//! Error types for the relay protocol
//!
//! Every failure a send can hit is a [`MixError`] variant. Errors are grouped
//! by the component that raises them so callers can decide what to do next.
//!
//! # Error Categories
//!
//! - **Setup**: registry or configuration problems, fatal to startup
//! - **Route**: the network cannot satisfy the requested route
//! - **Relay**: a packet failed somewhere along its route; a fresh route may
//!   succeed (see [`MixError::warrants_fresh_route`])
//!
//! # Example
//!
//! ```no_run
//! use mixnet_core::MixError;
//!
//! fn report(err: &MixError) {
//!     if err.warrants_fresh_route() {
//!         println!("send failed ({}), a new route may succeed: {err}", err.kind());
//!     } else {
//!         println!("send failed permanently: {err}");
//!     }
//! }
//! ```

use std::borrow::Cow;
use std::time::Duration;

use thiserror::Error;

use crate::node::NodeId;

/// Errors raised by the registry, path selector, packet adapter, relay driver
/// and session orchestrator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MixError {
    // ============ Setup Errors ============
    /// Key material for a node could not be generated
    #[error("Key generation failed: {0}")]
    KeyGeneration(Cow<'static, str>),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),

    // ============ Route Errors ============
    /// Node id is not in the registry
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Not enough eligible nodes for the requested path length
    #[error("Insufficient nodes: route needs {requested}, {available} eligible")]
    InsufficientNodes {
        /// Requested path length
        requested: usize,
        /// Eligible nodes in the registry
        available: usize,
    },

    /// Route is structurally invalid (empty or repeats a node)
    #[error("Invalid route: {0}")]
    InvalidRoute(Cow<'static, str>),

    // ============ Packet Errors ============
    /// Packet could not be built for this route and message
    #[error("Packet construction failed: {0}")]
    PacketConstruction(Cow<'static, str>),

    /// Packet failed authentication or decoding at a hop
    #[error("Integrity check failed: {0}")]
    Integrity(Cow<'static, str>),

    // ============ Relay Errors ============
    /// A relay instruction named a node that is not registered
    #[error("Unreachable node: {0}")]
    UnreachableNode(NodeId),

    /// Packet asked for more hops than its route allows
    #[error("Routing loop: packet still relaying after {limit} hops")]
    RoutingLoop {
        /// Hop limit of the route
        limit: usize,
    },

    /// Node has already processed this packet
    #[error("Replayed packet refused by {0}")]
    Replay(NodeId),

    /// Session deadline expired before delivery
    #[error("Send timed out after {0:?}")]
    Timeout(Duration),
}

impl MixError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            MixError::KeyGeneration(_) => "key_generation",
            MixError::InvalidConfig(_) => "invalid_config",
            MixError::UnknownNode(_) => "unknown_node",
            MixError::InsufficientNodes { .. } => "insufficient_nodes",
            MixError::InvalidRoute(_) => "invalid_route",
            MixError::PacketConstruction(_) => "packet_construction",
            MixError::Integrity(_) => "integrity",
            MixError::UnreachableNode(_) => "unreachable_node",
            MixError::RoutingLoop { .. } => "routing_loop",
            MixError::Replay(_) => "replay",
            MixError::Timeout(_) => "timeout",
        }
    }

    /// Returns true if resending the message over a freshly selected route
    /// could succeed.
    ///
    /// Nothing retries automatically; this only informs the caller.
    #[must_use]
    pub fn warrants_fresh_route(&self) -> bool {
        matches!(
            self,
            MixError::Integrity(_)
                | MixError::UnreachableNode(_)
                | MixError::RoutingLoop { .. }
                | MixError::Replay(_)
                | MixError::Timeout(_)
        )
    }

    /// Returns true if the error comes from setup rather than a single send
    #[must_use]
    pub fn is_setup(&self) -> bool {
        matches!(self, MixError::KeyGeneration(_) | MixError::InvalidConfig(_))
    }

    /// Create an invalid configuration error with static context (zero allocation)
    #[must_use]
    pub const fn invalid_config(context: &'static str) -> Self {
        MixError::InvalidConfig(Cow::Borrowed(context))
    }

    /// Create a key generation error with static context (zero allocation)
    #[must_use]
    pub const fn key_generation(context: &'static str) -> Self {
        MixError::KeyGeneration(Cow::Borrowed(context))
    }

    /// Create an invalid route error with static context (zero allocation)
    #[must_use]
    pub const fn invalid_route(context: &'static str) -> Self {
        MixError::InvalidRoute(Cow::Borrowed(context))
    }
}

/// Result type for mixnet operations
pub type Result<T> = std::result::Result<T, MixError>;
