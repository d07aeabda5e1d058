//! Routing-info codec for header slots.

use super::ROUTING_INFO_SIZE;
use crate::CryptoError;

/// Flag byte: forward to the node id that follows.
pub const RELAY_FLAG: u8 = 0xF0;

/// Flag byte: this hop is the final hop.
pub const DEST_FLAG: u8 = 0xF1;

/// Decoded routing instruction from one header slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingInfo {
    /// Forward the peeled packet to this node
    Relay(u32),
    /// Open the payload locally
    Deliver,
}

impl RoutingInfo {
    /// Encode as `flag ‖ node_id (big-endian)`.
    #[must_use]
    pub fn encode(&self) -> [u8; ROUTING_INFO_SIZE] {
        let mut out = [0u8; ROUTING_INFO_SIZE];
        match self {
            Self::Relay(node) => {
                out[0] = RELAY_FLAG;
                out[1..].copy_from_slice(&node.to_be_bytes());
            }
            Self::Deliver => out[0] = DEST_FLAG,
        }
        out
    }

    /// Decode a routing slot.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RoutingInfoTooShort`] for truncated input and
    /// [`CryptoError::InvalidRoutingFlag`] for any flag other than
    /// [`RELAY_FLAG`] or [`DEST_FLAG`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < ROUTING_INFO_SIZE {
            return Err(CryptoError::RoutingInfoTooShort {
                expected: ROUTING_INFO_SIZE,
                actual: bytes.len(),
            });
        }

        match bytes[0] {
            RELAY_FLAG => {
                let mut id = [0u8; 4];
                id.copy_from_slice(&bytes[1..ROUTING_INFO_SIZE]);
                Ok(Self::Relay(u32::from_be_bytes(id)))
            }
            DEST_FLAG => Ok(Self::Deliver),
            flag => Err(CryptoError::InvalidRoutingFlag(flag)),
        }
    }
}

/// Encode a relay instruction for `node`.
#[must_use]
pub fn encode_relay(node: u32) -> [u8; ROUTING_INFO_SIZE] {
    RoutingInfo::Relay(node).encode()
}

/// Encode the final-hop instruction.
#[must_use]
pub fn encode_deliver() -> [u8; ROUTING_INFO_SIZE] {
    RoutingInfo::Deliver.encode()
}

/// Classify a routing slot as relay or deliver.
///
/// # Errors
///
/// See [`RoutingInfo::decode`].
pub fn decode_routing(bytes: &[u8]) -> Result<RoutingInfo, CryptoError> {
    RoutingInfo::decode(bytes)
}
