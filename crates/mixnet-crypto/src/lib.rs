//! # Mixnet Crypto
//!
//! Cryptographic primitives for the mixnet simulator.
//!
//! This crate provides:
//! - X25519 key pairs with group-element blinding
//! - BLAKE3 key derivation, keyed MACs and key streams
//! - Constant-time comparison helpers
//! - The Sphinx layered packet format (build, per-hop process, final open)
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Security Level |
//! |----------|-----------|----------------|
//! | Key Exchange | X25519 | 128-bit |
//! | Header Blinding | X25519 scalar multiplication | 128-bit |
//! | KDF / Key Streams | BLAKE3 XOF | 128-bit |
//! | MAC | Keyed BLAKE3 (truncated to 128 bits) | 128-bit |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod constant_time;
pub mod error;
pub mod hash;
pub mod sphinx;
pub mod x25519;

pub use error::CryptoError;

/// X25519 public key size
pub const X25519_PUBLIC_KEY_SIZE: usize = 32;

/// X25519 secret key size
pub const X25519_SECRET_KEY_SIZE: usize = 32;

/// BLAKE3 output size
pub const BLAKE3_OUTPUT_SIZE: usize = 32;

/// Truncated MAC size used in packet headers and payload tags
pub const MAC_SIZE: usize = 16;
