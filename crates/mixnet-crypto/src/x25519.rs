//! X25519 key pairs and group-element blinding (RFC 7748).
//!
//! Provides curve25519 key agreement with:
//! - Low-order point rejection
//! - Automatic key clamping (RFC 7748)
//! - Multiplicative blinding of group elements, as needed by layered headers
//! - Zeroization of sensitive data

use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::CryptoError;
use crate::constant_time::is_all_zero;

/// The X25519 base point `u = 9`.
pub const BASEPOINT: [u8; 32] = x25519_dalek::X25519_BASEPOINT_BYTES;

/// X25519 private key (32 bytes).
#[derive(Clone, ZeroizeOnDrop, Zeroize)]
pub struct PrivateKey(x25519_dalek::StaticSecret);

/// X25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

/// X25519 shared secret (32 bytes).
#[derive(Clone, ZeroizeOnDrop, Zeroize)]
pub struct SharedSecret([u8; 32]);

impl PrivateKey {
    /// Generate a new random private key with RFC 7748 clamping.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(x25519_dalek::StaticSecret::random_from_rng(rng))
    }

    /// Generate a private key from the OS CSPRNG, reporting failure instead
    /// of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomFailed`] if the OS CSPRNG fails.
    pub fn try_generate() -> Result<Self, CryptoError> {
        let secret = random_secret()?;
        Ok(Self::from_bytes(*secret))
    }

    /// Derive the public key from this private key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(x25519_dalek::PublicKey::from(&self.0).to_bytes())
    }

    /// Perform Diffie-Hellman key exchange.
    ///
    /// Returns `None` if the peer's public key is a low-order point (security check).
    #[must_use]
    pub fn exchange(&self, peer_public: &PublicKey) -> Option<SharedSecret> {
        let peer = x25519_dalek::PublicKey::from(peer_public.0);
        let shared = self.0.diffie_hellman(&peer);

        if !shared.was_contributory() {
            return None;
        }

        Some(SharedSecret(*shared.as_bytes()))
    }

    /// Import from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(x25519_dalek::StaticSecret::from(bytes))
    }
}

impl PublicKey {
    /// Export public key as bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Import public key from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes as a slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl SharedSecret {
    /// Get shared secret as bytes.
    ///
    /// # Security
    ///
    /// The shared secret should be fed through a KDF before use as a key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Draw a 32-byte secret scalar from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`CryptoError::RandomFailed`] if the OS CSPRNG fails.
pub fn random_secret() -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut secret = Zeroizing::new([0u8; 32]);
    getrandom::getrandom(&mut *secret).map_err(|_| CryptoError::RandomFailed)?;
    Ok(secret)
}

/// Multiply a group element by a (clamped) scalar.
///
/// Used both for the sender's ephemeral exchange and for blinding the header
/// element between hops. Scalar multiplication commutes, so blinding by `b1`
/// then `b2` equals blinding by `b2` then `b1`.
#[must_use]
pub fn scalar_mult(scalar: &[u8; 32], element: &[u8; 32]) -> [u8; 32] {
    x25519_dalek::x25519(*scalar, *element)
}

/// Multiply a group element by a scalar, rejecting non-contributory results.
#[must_use]
pub fn checked_scalar_mult(scalar: &[u8; 32], element: &[u8; 32]) -> Option<SharedSecret> {
    let out = scalar_mult(scalar, element);
    if is_all_zero(&out) {
        return None;
    }
    Some(SharedSecret(out))
}
