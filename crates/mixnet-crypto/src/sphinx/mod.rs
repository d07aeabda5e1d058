//! Sphinx layered packet format.
//!
//! A packet is a fixed-size header plus a fixed-size payload:
//!
//! ```text
//! ┌──────────┬──────────────────────────────┬──────────┬──────────────────┐
//! │ alpha 32 │ beta  max_hops × SLOT_SIZE   │ gamma 16 │ delta payload    │
//! └──────────┴──────────────────────────────┴──────────┴──────────────────┘
//!   blinded     encrypted routing slots        header     layered body
//!   element     (flag ‖ node id ‖ next MAC)    MAC
//! ```
//!
//! Every hop derives a shared secret from `alpha` and its private key,
//! verifies `gamma` over the whole packet, strips one layer of `beta` and
//! `delta`, and blinds `alpha` for the next hop. Packets built with the same
//! [`SphinxParams`] all have the same size, whatever the route length or
//! message length.

mod build;
mod keys;
mod payload;
mod process;
mod routing;


pub use build::create_forward_message;
pub use keys::{MacKey, ReplayTag};
pub use process::{ProcessedPacket, process, receive_forward};
pub use routing::{
    DEST_FLAG, RELAY_FLAG, RoutingInfo, decode_routing, encode_deliver, encode_relay,
};

use crate::hash::MacTag;
use crate::{CryptoError, MAC_SIZE, X25519_PUBLIC_KEY_SIZE};

/// Encoded routing info: flag byte plus big-endian `u32` node id.
pub const ROUTING_INFO_SIZE: usize = 5;

/// One header slot: routing info followed by the next hop's MAC.
pub const SLOT_SIZE: usize = ROUTING_INFO_SIZE + MAC_SIZE;

/// Body framing overhead: payload tag plus two `u16` length prefixes.
pub const BODY_OVERHEAD: usize = MAC_SIZE + 2 + 2;

/// Default header capacity in hops
pub const DEFAULT_MAX_HOPS: usize = 5;

/// Default payload size in bytes
pub const DEFAULT_PAYLOAD_SIZE: usize = 1024;

/// Largest supported header capacity
pub const MAX_SUPPORTED_HOPS: usize = 32;

/// Largest supported payload (length prefixes are `u16`)
pub const MAX_PAYLOAD_SIZE: usize = 65_536;

/// Packet geometry shared by every sender and node of one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SphinxParams {
    max_hops: usize,
    payload_size: usize,
}

impl SphinxParams {
    /// Create parameters for the given header capacity and payload size.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidParameter`] if `max_hops` is outside
    /// `1..=MAX_SUPPORTED_HOPS` or the payload cannot hold the body framing.
    pub fn new(max_hops: usize, payload_size: usize) -> Result<Self, CryptoError> {
        if max_hops == 0 || max_hops > MAX_SUPPORTED_HOPS {
            return Err(CryptoError::InvalidParameter(format!(
                "max_hops must be between 1 and {MAX_SUPPORTED_HOPS}, got {max_hops}"
            )));
        }

        if payload_size <= BODY_OVERHEAD || payload_size > MAX_PAYLOAD_SIZE {
            return Err(CryptoError::InvalidParameter(format!(
                "payload_size must be between {} and {MAX_PAYLOAD_SIZE}, got {payload_size}",
                BODY_OVERHEAD + 1
            )));
        }

        Ok(Self {
            max_hops,
            payload_size,
        })
    }

    /// Maximum number of hops a header can address.
    #[must_use]
    pub const fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Fixed payload (delta) size.
    #[must_use]
    pub const fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Size of the encrypted routing block (beta).
    #[must_use]
    pub const fn beta_size(&self) -> usize {
        self.max_hops * SLOT_SIZE
    }

    /// Total header size (alpha + beta + gamma).
    #[must_use]
    pub const fn header_size(&self) -> usize {
        X25519_PUBLIC_KEY_SIZE + self.beta_size() + MAC_SIZE
    }

    /// Total serialized packet size.
    #[must_use]
    pub const fn packet_size(&self) -> usize {
        self.header_size() + self.payload_size
    }

    /// Bytes available for destination label plus message.
    #[must_use]
    pub const fn max_content_len(&self) -> usize {
        self.payload_size - BODY_OVERHEAD
    }
}

impl Default for SphinxParams {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            payload_size: DEFAULT_PAYLOAD_SIZE,
        }
    }
}

/// Packet header: blinded group element, routing block, header MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Blinded group element the current hop exchanges with
    pub alpha: [u8; 32],
    /// Encrypted routing slots for the remaining hops
    pub beta: Vec<u8>,
    /// MAC over alpha, beta and delta under the current hop's key
    pub gamma: MacTag,
}

/// A complete layered packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Routing and key material for the remaining hops
    pub header: Header,
    /// Still-encrypted body
    pub delta: Vec<u8>,
}

impl Packet {
    /// Serialize as `alpha ‖ beta ‖ gamma ‖ delta`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.header.alpha.len()
                + self.header.beta.len()
                + self.header.gamma.len()
                + self.delta.len(),
        );
        out.extend_from_slice(&self.header.alpha);
        out.extend_from_slice(&self.header.beta);
        out.extend_from_slice(&self.header.gamma);
        out.extend_from_slice(&self.delta);
        out
    }

    /// Parse a serialized packet laid out for `params`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPacketLength`] if `bytes` is not exactly
    /// `params.packet_size()` long.
    pub fn from_bytes(params: &SphinxParams, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != params.packet_size() {
            return Err(CryptoError::InvalidPacketLength {
                expected: params.packet_size(),
                actual: bytes.len(),
            });
        }

        let (alpha_bytes, rest) = bytes.split_at(X25519_PUBLIC_KEY_SIZE);
        let (beta, rest) = rest.split_at(params.beta_size());
        let (gamma_bytes, delta) = rest.split_at(MAC_SIZE);

        let mut alpha = [0u8; 32];
        alpha.copy_from_slice(alpha_bytes);
        let mut gamma = [0u8; MAC_SIZE];
        gamma.copy_from_slice(gamma_bytes);

        Ok(Self {
            header: Header {
                alpha,
                beta: beta.to_vec(),
                gamma,
            },
            delta: delta.to_vec(),
        })
    }

    /// Check that this packet matches the geometry of `params`.
    pub(crate) fn check_layout(&self, params: &SphinxParams) -> Result<(), CryptoError> {
        if self.header.beta.len() != params.beta_size() {
            return Err(CryptoError::InvalidPacketLength {
                expected: params.beta_size(),
                actual: self.header.beta.len(),
            });
        }
        if self.delta.len() != params.payload_size() {
            return Err(CryptoError::InvalidPacketLength {
                expected: params.payload_size(),
                actual: self.delta.len(),
            });
        }
        Ok(())
    }
}
