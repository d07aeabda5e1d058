//! Node-side layer stripping and final-hop opening.

use super::keys::{HopKeys, MacKey, ReplayTag};
use super::payload::decode_body;
use super::routing::RoutingInfo;
use super::{Header, Packet, ROUTING_INFO_SIZE, SLOT_SIZE, SphinxParams};
use crate::constant_time::{verify_16, xor_in_place};
use crate::hash::mac;
use crate::x25519::{PrivateKey, PublicKey, scalar_mult};
use crate::{CryptoError, MAC_SIZE};

/// Result of stripping one layer.
#[derive(Debug)]
pub struct ProcessedPacket {
    /// Replay fingerprint for this hop
    pub tag: ReplayTag,
    /// Where the peeled packet goes next
    pub routing: RoutingInfo,
    /// The peeled packet
    pub packet: Packet,
    /// Body authentication key, meaningful when `routing` is `Deliver`
    pub mac_key: MacKey,
}

/// Strip one layer of `packet` with this node's private key.
///
/// # Errors
///
/// - [`CryptoError::InvalidPacketLength`] if the packet does not match `params`
/// - [`CryptoError::InvalidPublicKey`] if `alpha` is a low-order point
/// - [`CryptoError::MacMismatch`] if the header MAC fails (tampering or wrong key)
/// - [`CryptoError::InvalidRoutingFlag`] if the decrypted slot is malformed
pub fn process(
    params: &SphinxParams,
    private_key: &PrivateKey,
    packet: &Packet,
) -> Result<ProcessedPacket, CryptoError> {
    packet.check_layout(params)?;

    let Header { alpha, beta, gamma } = &packet.header;

    let secret = private_key
        .exchange(&PublicKey::from_bytes(*alpha))
        .ok_or(CryptoError::InvalidPublicKey)?;
    let hop = HopKeys::new(secret.as_bytes());

    let expected = mac(
        &hop.header_mac_key(),
        &[alpha.as_slice(), beta, &packet.delta],
    );
    if !verify_16(&expected, gamma) {
        return Err(CryptoError::MacMismatch);
    }

    let stream_size = params.beta_size() + SLOT_SIZE;
    let mut block = Vec::with_capacity(stream_size);
    block.extend_from_slice(beta);
    block.extend_from_slice(&[0u8; SLOT_SIZE]);
    xor_in_place(&mut block, &hop.header_stream(stream_size));

    let routing = RoutingInfo::decode(&block[..ROUTING_INFO_SIZE])?;
    let mut next_gamma = [0u8; MAC_SIZE];
    next_gamma.copy_from_slice(&block[ROUTING_INFO_SIZE..SLOT_SIZE]);
    let next_beta = block.split_off(SLOT_SIZE);

    let next_alpha = scalar_mult(&hop.blinding_factor(alpha), alpha);

    let mut next_delta = packet.delta.clone();
    xor_in_place(&mut next_delta, &hop.payload_stream(params.payload_size()));

    Ok(ProcessedPacket {
        tag: hop.replay_tag(),
        routing,
        packet: Packet {
            header: Header {
                alpha: next_alpha,
                beta: next_beta,
                gamma: next_gamma,
            },
            delta: next_delta,
        },
        mac_key: hop.payload_mac_key(),
    })
}

/// Open the body of a packet that the final hop has just peeled.
///
/// Returns `(destination, message)`.
///
/// # Errors
///
/// - [`CryptoError::InvalidPacketLength`] if the payload does not match `params`
/// - [`CryptoError::PayloadTagMismatch`] if the body does not authenticate
/// - [`CryptoError::MalformedPayload`] if the framing is inconsistent
pub fn receive_forward(
    params: &SphinxParams,
    mac_key: &MacKey,
    packet: &Packet,
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    if packet.delta.len() != params.payload_size() {
        return Err(CryptoError::InvalidPacketLength {
            expected: params.payload_size(),
            actual: packet.delta.len(),
        });
    }

    decode_body(mac_key, &packet.delta)
}
