//! Packet adapter over the Sphinx primitives.
//!
//! This is the only place where [`CryptoError`] is translated into the
//! [`MixError`] taxonomy: construction failures become
//! [`MixError::PacketConstruction`], everything a hop or the receiver detects
//! becomes [`MixError::Integrity`].

use mixnet_crypto::CryptoError;
use mixnet_crypto::sphinx::{
    self, MacKey, Packet, ReplayTag, RoutingInfo, SphinxParams, create_forward_message,
    receive_forward,
};
use mixnet_crypto::x25519::{PrivateKey, PublicKey};

use crate::error::{MixError, Result};
use crate::node::NodeId;
use crate::path::Route;

/// An onion-encrypted packet in flight.
///
/// Opaque outside this crate; all packets built by one adapter serialize to
/// the same size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredPacket {
    inner: Packet,
}

impl LayeredPacket {
    /// Serialize the packet.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_bytes()
    }

    /// Serialized size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.header.alpha.len()
            + self.inner.header.beta.len()
            + self.inner.header.gamma.len()
            + self.inner.delta.len()
    }
}

/// What a node learns from peeling its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingInstruction {
    /// Forward the peeled packet to this node
    Relay(NodeId),
    /// This node is the final hop
    Deliver,
}

impl From<RoutingInfo> for RoutingInstruction {
    fn from(info: RoutingInfo) -> Self {
        match info {
            RoutingInfo::Relay(id) => Self::Relay(NodeId::new(id)),
            RoutingInfo::Deliver => Self::Deliver,
        }
    }
}

/// Output of a single [`PacketAdapter::peel`].
#[derive(Debug)]
pub struct PeeledPacket {
    /// Routing decision for the peeled packet
    pub instruction: RoutingInstruction,
    /// Packet with one layer removed
    pub packet: LayeredPacket,
    /// Body key, used with [`PacketAdapter::open`] on `Deliver`
    pub mac_key: MacKey,
    /// Fingerprint the processing node remembers
    pub replay_tag: ReplayTag,
}

/// Builds, peels and opens layered packets for one set of [`SphinxParams`].
///
/// Pure with respect to node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketAdapter {
    params: SphinxParams,
}

impl PacketAdapter {
    /// Create an adapter for `params`.
    #[must_use]
    pub const fn new(params: SphinxParams) -> Self {
        Self { params }
    }

    /// Packet geometry
    #[must_use]
    pub const fn params(&self) -> &SphinxParams {
        &self.params
    }

    /// Wrap `message` for `route`, where `keys[i]` belongs to the i-th hop.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::PacketConstruction`] if the route does not fit the
    /// header, key and hop counts differ, a key is malformed, or label plus
    /// message exceed the payload.
    pub fn construct(
        &self,
        route: &Route,
        keys: &[PublicKey],
        destination: &[u8],
        message: &[u8],
    ) -> Result<LayeredPacket> {
        let hops: Vec<u32> = route.iter().map(|id| id.as_u32()).collect();

        let inner = create_forward_message(&self.params, &hops, keys, destination, message)
            .map_err(construction_error)?;

        Ok(LayeredPacket { inner })
    }

    /// Remove one layer with `private_key`.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::Integrity`] on any authentication or decoding
    /// failure, including a key that does not match this layer.
    pub fn peel(&self, private_key: &PrivateKey, packet: &LayeredPacket) -> Result<PeeledPacket> {
        let processed =
            sphinx::process(&self.params, private_key, &packet.inner).map_err(integrity_error)?;

        Ok(PeeledPacket {
            instruction: processed.routing.into(),
            packet: LayeredPacket {
                inner: processed.packet,
            },
            mac_key: processed.mac_key,
            replay_tag: processed.tag,
        })
    }

    /// Recover `(destination, message)` from a packet peeled by its final hop.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::Integrity`] if the body does not authenticate or
    /// its framing is corrupt.
    pub fn open(&self, mac_key: &MacKey, packet: &LayeredPacket) -> Result<(Vec<u8>, Vec<u8>)> {
        receive_forward(&self.params, mac_key, &packet.inner).map_err(integrity_error)
    }

    /// Parse a serialized packet.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::Integrity`] if `bytes` has the wrong length.
    pub fn decode(&self, bytes: &[u8]) -> Result<LayeredPacket> {
        let inner = Packet::from_bytes(&self.params, bytes).map_err(integrity_error)?;
        Ok(LayeredPacket { inner })
    }
}

fn construction_error(err: CryptoError) -> MixError {
    MixError::PacketConstruction(err.to_string().into())
}

fn integrity_error(err: CryptoError) -> MixError {
    MixError::Integrity(err.to_string().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn keys(count: usize) -> (Vec<PrivateKey>, Vec<PublicKey>) {
        let private: Vec<PrivateKey> = (0..count).map(|_| PrivateKey::generate(&mut OsRng)).collect();
        let public = private.iter().map(PrivateKey::public_key).collect();
        (private, public)
    }

    fn route(ids: &[u32]) -> Route {
        Route::new(ids.iter().copied().map(NodeId::new).collect()).unwrap()
    }

    #[test]
    fn test_construct_peel_open() {
        let adapter = PacketAdapter::default();
        let (private, public) = keys(3);
        let route = route(&[4, 9, 2]);

        let packet = adapter
            .construct(&route, &public, b"destination_node", b"hello")
            .unwrap();

        let first = adapter.peel(&private[0], &packet).unwrap();
        assert_eq!(first.instruction, RoutingInstruction::Relay(NodeId::new(9)));

        let second = adapter.peel(&private[1], &first.packet).unwrap();
        assert_eq!(second.instruction, RoutingInstruction::Relay(NodeId::new(2)));

        let last = adapter.peel(&private[2], &second.packet).unwrap();
        assert_eq!(last.instruction, RoutingInstruction::Deliver);

        let (dest, msg) = adapter.open(&last.mac_key, &last.packet).unwrap();
        assert_eq!(dest, b"destination_node");
        assert_eq!(msg, b"hello");
    }

    #[test]
    fn test_oversized_message_is_construction_error() {
        let adapter = PacketAdapter::default();
        let (_, public) = keys(1);
        let message = vec![b'x'; adapter.params().payload_size()];

        assert!(matches!(
            adapter.construct(&route(&[0]), &public, b"d", &message),
            Err(MixError::PacketConstruction(_))
        ));
    }

    #[test]
    fn test_route_longer_than_header_is_construction_error() {
        let adapter = PacketAdapter::new(SphinxParams::new(2, 256).unwrap());
        let (_, public) = keys(3);

        assert!(matches!(
            adapter.construct(&route(&[0, 1, 2]), &public, b"d", b"m"),
            Err(MixError::PacketConstruction(_))
        ));
    }

    #[test]
    fn test_key_count_mismatch_is_construction_error() {
        let adapter = PacketAdapter::default();
        let (_, public) = keys(1);

        assert!(matches!(
            adapter.construct(&route(&[0, 1]), &public, b"d", b"m"),
            Err(MixError::PacketConstruction(_))
        ));
    }

    #[test]
    fn test_payload_bit_flip_is_integrity_error() {
        let adapter = PacketAdapter::default();
        let (private, public) = keys(2);
        let packet = adapter
            .construct(&route(&[0, 1]), &public, b"d", b"hello")
            .unwrap();

        let mut bytes = packet.to_bytes();
        bytes[adapter.params().header_size() + 3] ^= 0x10;
        let tampered = adapter.decode(&bytes).unwrap();

        assert!(matches!(
            adapter.peel(&private[0], &tampered),
            Err(MixError::Integrity(_))
        ));
    }

    #[test]
    fn test_wrong_key_is_integrity_error() {
        let adapter = PacketAdapter::default();
        let (private, public) = keys(2);
        let packet = adapter
            .construct(&route(&[0, 1]), &public, b"d", b"hello")
            .unwrap();

        assert!(matches!(
            adapter.peel(&private[1], &packet),
            Err(MixError::Integrity(_))
        ));
    }

    #[test]
    fn test_open_with_wrong_mac_key_fails() {
        let adapter = PacketAdapter::default();
        let (private, public) = keys(2);
        let packet = adapter
            .construct(&route(&[0, 1]), &public, b"d", b"hello")
            .unwrap();

        // Intermediate hop's body key does not authenticate the final body
        let first = adapter.peel(&private[0], &packet).unwrap();
        let last = adapter.peel(&private[1], &first.packet).unwrap();

        assert!(matches!(
            adapter.open(&first.mac_key, &last.packet),
            Err(MixError::Integrity(_))
        ));
    }

    #[test]
    fn test_sizes_constant() {
        let adapter = PacketAdapter::default();
        let (_, public) = keys(5);

        let short = adapter.construct(&route(&[0]), &public[..1], b"d", b"").unwrap();
        let long = adapter
            .construct(&route(&[0, 1, 2, 3, 4]), &public, b"destination_node", &[7u8; 300])
            .unwrap();

        assert_eq!(short.size(), adapter.params().packet_size());
        assert_eq!(long.size(), adapter.params().packet_size());
        assert_eq!(long.to_bytes().len(), long.size());
    }

    #[test]
    fn test_decode_wrong_length() {
        let adapter = PacketAdapter::default();
        assert!(matches!(
            adapter.decode(&[0u8; 12]),
            Err(MixError::Integrity(_))
        ));
    }
}
