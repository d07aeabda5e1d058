//! # Mixnet Core
//!
//! Relay protocol driver for a simulated Sphinx mix network.
//!
//! This crate provides:
//! - Node registry with node-scoped private keys
//! - Uniform random route selection
//! - Packet adapter over the `mixnet-crypto` Sphinx primitives
//! - Bounded relay state machine
//! - Send sessions tying the above together
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Mixnet (session)                         │
//! │   select route → construct packet → drive relay → deliver        │
//! ├──────────────────┬──────────────────┬───────────────────────────┤
//! │   PathSelector   │  PacketAdapter   │       RelayDriver         │
//! │  (random route)  │ (construct/peel/ │  (AwaitingHop → Delivered │
//! │                  │       open)      │         | Failed)         │
//! ├──────────────────┴──────────────────┴───────────────────────────┤
//! │                NodeRegistry (MixNode: own private key)           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod error;
pub mod node;
pub mod packet;
pub mod path;
pub mod registry;
pub mod relay;
pub mod session;

pub use config::MixnetConfig;
pub use error::{MixError, Result};
pub use node::{MixNode, NodeId};
pub use packet::{LayeredPacket, PacketAdapter, PeeledPacket, RoutingInstruction};
pub use path::{PathSelector, Route, select_route};
pub use registry::NodeRegistry;
pub use relay::{Delivered, RelayDriver, RelayState};
pub use session::{Delivery, Mixnet, SessionResult};

/// Default number of mix nodes in a simulated network
pub const DEFAULT_NODE_COUNT: usize = 10;

/// Default number of hops per route
pub const DEFAULT_PATH_LENGTH: usize = 5;

/// Destination label used by the HTTP front end
pub const DEFAULT_DESTINATION: &str = "destination_node";
