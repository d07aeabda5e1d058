//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Random number generation failed
    #[error("random number generation failed")]
    RandomFailed,

    /// Invalid public key (low-order point or non-contributory exchange)
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Header MAC did not verify (tampered packet or wrong key)
    #[error("packet authentication failed")]
    MacMismatch,

    /// Payload tag did not verify at the final hop
    #[error("payload authentication failed")]
    PayloadTagMismatch,

    /// Routing slot carried an unknown flag
    #[error("invalid routing flag: 0x{0:02X}")]
    InvalidRoutingFlag(u8),

    /// Routing slot was too short to decode
    #[error("routing info too short: expected {expected}, got {actual}")]
    RoutingInfoTooShort {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Decrypted body framing was inconsistent
    #[error("malformed payload: {0}")]
    MalformedPayload(&'static str),

    /// Destination label plus message does not fit in the payload
    #[error("payload too large: at most {max} bytes available, got {actual}")]
    PayloadTooLarge {
        /// Maximum bytes available for label + message
        max: usize,
        /// Bytes requested
        actual: usize,
    },

    /// Route is longer than the header can address
    #[error("too many hops: header holds {max}, route has {actual}")]
    TooManyHops {
        /// Header capacity
        max: usize,
        /// Route length
        actual: usize,
    },

    /// Route and key lists are empty or disagree in length
    #[error("invalid route: {0}")]
    InvalidRoute(&'static str),

    /// Packet bytes did not match the expected layout
    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidPacketLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
