//! BLAKE3 hashing, key derivation, key streams and MACs.
//!
//! Provides:
//! - Fast cryptographic hashing
//! - Context-specific KDF with arbitrary-length (XOF) output
//! - Keyed MAC truncated to [`MAC_SIZE`] bytes

use crate::MAC_SIZE;

/// BLAKE3 hash output (32 bytes).
pub type HashOutput = [u8; 32];

/// Truncated MAC output.
pub type MacTag = [u8; MAC_SIZE];

/// Compute BLAKE3 hash of input data.
#[must_use]
pub fn hash(data: &[u8]) -> HashOutput {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 Key Derivation Function with context.
///
/// Output is produced through the BLAKE3 XOF, so the same KDF also serves as
/// a key stream generator for header and payload encryption.
pub struct Kdf {
    context: &'static str,
}

impl Kdf {
    /// Create a KDF with a specific context string.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let kdf = Kdf::new("mixnet-sphinx-v1 mac");
    /// let key = kdf.derive_key(shared_secret.as_bytes());
    /// ```
    #[must_use]
    pub const fn new(context: &'static str) -> Self {
        Self { context }
    }

    /// Derive output from input key material.
    pub fn derive(&self, ikm: &[u8], output: &mut [u8]) {
        let key_hash = hash(ikm);
        let mut hasher = blake3::Hasher::new_keyed(&key_hash);
        hasher.update(self.context.as_bytes());

        let mut reader = hasher.finalize_xof();
        reader.fill(output);
    }

    /// Derive a 32-byte key.
    #[must_use]
    pub fn derive_key(&self, ikm: &[u8]) -> [u8; 32] {
        let mut output = [0u8; 32];
        self.derive(ikm, &mut output);
        output
    }

    /// Derive a key stream of `len` bytes.
    #[must_use]
    pub fn stream(&self, ikm: &[u8], len: usize) -> Vec<u8> {
        let mut output = vec![0u8; len];
        self.derive(ikm, &mut output);
        output
    }
}

/// Keyed BLAKE3 MAC over the concatenation of `parts`, truncated to 16 bytes.
#[must_use]
pub fn mac(key: &[u8; 32], parts: &[&[u8]]) -> MacTag {
    let mut hasher = blake3::Hasher::new_keyed(key);
    for part in parts {
        hasher.update(part);
    }

    let mut tag = [0u8; MAC_SIZE];
    tag.copy_from_slice(&hasher.finalize().as_bytes()[..MAC_SIZE]);
    tag
}
