//! Bounded relay state machine.
//!
//! A packet moves through the network as a sequence of [`RelayState`]s:
//!
//! ```text
//! AwaitingHop(route[0]) ──Relay(next)──▶ AwaitingHop(next) ──Deliver──▶ Delivered
//!        │                                      │
//!        └──────────── error / hop limit ───────┴──────────────────────▶ Failed
//! ```
//!
//! The hop limit is the route length, so a packet can never cycle. The
//! driver is stepped one transition at a time, which lets an async caller
//! give up between hops.

use crate::error::MixError;
use crate::node::NodeId;
use crate::packet::{LayeredPacket, PacketAdapter, RoutingInstruction};
use crate::path::Route;
use crate::registry::NodeRegistry;

/// Body recovered by the final hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Destination label carried in the body
    pub destination: Vec<u8>,
    /// Recovered message
    pub message: Vec<u8>,
    /// Hops performed, including the final one
    pub hops: usize,
}

/// State of one packet in flight.
#[derive(Debug)]
pub enum RelayState {
    /// `node` is about to process `packet`
    AwaitingHop {
        /// Node holding the packet
        node: NodeId,
        /// Packet as that node receives it
        packet: LayeredPacket,
        /// Hops performed so far
        hops: usize,
        /// Maximum hops for this route
        limit: usize,
    },
    /// The final hop recovered the body
    Delivered(Delivered),
    /// Relay stopped with an error
    Failed {
        /// Cause
        error: MixError,
        /// Hops performed before failing
        hops: usize,
    },
}

impl RelayState {
    /// Whether no further transition is possible
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayState::AwaitingHop { .. })
    }

    /// Hops performed so far
    #[must_use]
    pub fn hops(&self) -> usize {
        match self {
            RelayState::AwaitingHop { hops, .. } | RelayState::Failed { hops, .. } => *hops,
            RelayState::Delivered(delivered) => delivered.hops,
        }
    }
}

/// Moves packets through the nodes of a registry.
#[derive(Debug, Clone, Copy)]
pub struct RelayDriver<'a> {
    registry: &'a NodeRegistry,
    adapter: &'a PacketAdapter,
}

impl<'a> RelayDriver<'a> {
    /// Create a driver over `registry`
    #[must_use]
    pub fn new(registry: &'a NodeRegistry, adapter: &'a PacketAdapter) -> Self {
        Self { registry, adapter }
    }

    /// Initial state: the entry node of `route` holds `packet`.
    #[must_use]
    pub fn start(&self, route: &Route, packet: LayeredPacket) -> RelayState {
        RelayState::AwaitingHop {
            node: route.first(),
            packet,
            hops: 0,
            limit: route.len(),
        }
    }

    /// Perform a single transition. Terminal states are returned unchanged.
    #[must_use]
    pub fn step(&self, state: RelayState) -> RelayState {
        let (node, packet, hops, limit) = match state {
            RelayState::AwaitingHop {
                node,
                packet,
                hops,
                limit,
            } => (node, packet, hops, limit),
            terminal => return terminal,
        };

        if hops >= limit {
            tracing::warn!(node = %node, limit, "packet exceeded its hop limit");
            return RelayState::Failed {
                error: MixError::RoutingLoop { limit },
                hops,
            };
        }

        let Some(mix) = self.registry.node(node) else {
            return RelayState::Failed {
                error: MixError::UnknownNode(node),
                hops,
            };
        };

        let hops = hops + 1;
        let peeled = match mix.process_hop(self.adapter, &packet) {
            Ok(peeled) => peeled,
            Err(error) => return RelayState::Failed { error, hops },
        };

        match peeled.instruction {
            RoutingInstruction::Relay(next) => {
                if !self.registry.contains(next) {
                    tracing::warn!(node = %node, next = %next, "relay to unregistered node");
                    return RelayState::Failed {
                        error: MixError::UnreachableNode(next),
                        hops,
                    };
                }

                tracing::debug!(node = %node, next = %next, hop = hops, "relayed");
                RelayState::AwaitingHop {
                    node: next,
                    packet: peeled.packet,
                    hops,
                    limit,
                }
            }
            RoutingInstruction::Deliver => {
                match self.adapter.open(&peeled.mac_key, &peeled.packet) {
                    Ok((destination, message)) => {
                        tracing::debug!(node = %node, hop = hops, "delivered");
                        RelayState::Delivered(Delivered {
                            destination,
                            message,
                            hops,
                        })
                    }
                    Err(error) => {
                        tracing::warn!(node = %node, error = %error, "final body rejected");
                        RelayState::Failed { error, hops }
                    }
                }
            }
        }
    }

    /// Step until the packet is delivered or fails.
    ///
    /// # Errors
    ///
    /// Returns the error of the [`RelayState::Failed`] state the packet ends in.
    pub fn run(&self, route: &Route, packet: LayeredPacket) -> Result<Delivered, MixError> {
        let mut state = self.start(route, packet);
        loop {
            state = match self.step(state) {
                RelayState::Delivered(delivered) => return Ok(delivered),
                RelayState::Failed { error, .. } => return Err(error),
                next => next,
            };
        }
    }
}
