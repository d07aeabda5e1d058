//! Per-hop key schedule derived from the hop's shared secret.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hash::Kdf;

const HEADER_STREAM: Kdf = Kdf::new("mixnet-sphinx-v1 header stream");
const HEADER_MAC: Kdf = Kdf::new("mixnet-sphinx-v1 header mac");
const PAYLOAD_STREAM: Kdf = Kdf::new("mixnet-sphinx-v1 payload stream");
const PAYLOAD_MAC: Kdf = Kdf::new("mixnet-sphinx-v1 payload mac");
const REPLAY_TAG: Kdf = Kdf::new("mixnet-sphinx-v1 replay tag");
const BLINDING: Kdf = Kdf::new("mixnet-sphinx-v1 blinding");

/// Fingerprint a node remembers to refuse a replayed packet.
pub type ReplayTag = [u8; 32];

/// Key that authenticates the recovered body at the final hop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MacKey([u8; 32]);

impl MacKey {
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for MacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MacKey(..)")
    }
}

/// Keys for a single hop, derived once from the shared secret.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct HopKeys {
    secret: [u8; 32],
}

impl HopKeys {
    pub(crate) fn new(secret: &[u8; 32]) -> Self {
        Self { secret: *secret }
    }

    pub(crate) fn header_stream(&self, len: usize) -> Vec<u8> {
        HEADER_STREAM.stream(&self.secret, len)
    }

    pub(crate) fn header_mac_key(&self) -> [u8; 32] {
        HEADER_MAC.derive_key(&self.secret)
    }

    pub(crate) fn payload_stream(&self, len: usize) -> Vec<u8> {
        PAYLOAD_STREAM.stream(&self.secret, len)
    }

    pub(crate) fn payload_mac_key(&self) -> MacKey {
        MacKey(PAYLOAD_MAC.derive_key(&self.secret))
    }

    pub(crate) fn replay_tag(&self) -> ReplayTag {
        REPLAY_TAG.derive_key(&self.secret)
    }

    /// Scalar that blinds `alpha` on its way to the next hop.
    pub(crate) fn blinding_factor(&self, alpha: &[u8; 32]) -> [u8; 32] {
        let mut ikm = [0u8; 64];
        ikm[..32].copy_from_slice(alpha);
        ikm[32..].copy_from_slice(&self.secret);
        let factor = BLINDING.derive_key(&ikm);
        ikm.zeroize();
        factor
    }
}
