//! Sender-side packet construction.

use zeroize::Zeroizing;

use super::keys::HopKeys;
use super::payload::encode_body;
use super::routing::RoutingInfo;
use super::{Header, Packet, ROUTING_INFO_SIZE, SLOT_SIZE, SphinxParams};
use crate::constant_time::xor_in_place;
use crate::hash::mac;
use crate::x25519::{BASEPOINT, PublicKey, checked_scalar_mult, random_secret, scalar_mult};
use crate::CryptoError;

/// Build a forward packet for `route`, where `keys[i]` is the public key of
/// `route[i]`. The final hop recovers `destination` and `message`.
///
/// # Errors
///
/// - [`CryptoError::InvalidRoute`] if the route is empty or `keys` has a
///   different length
/// - [`CryptoError::TooManyHops`] if the route exceeds `params.max_hops()`
/// - [`CryptoError::PayloadTooLarge`] if label plus message do not fit
/// - [`CryptoError::InvalidPublicKey`] if any key is a low-order point
/// - [`CryptoError::RandomFailed`] if the ephemeral secret cannot be drawn
pub fn create_forward_message(
    params: &SphinxParams,
    route: &[u32],
    keys: &[PublicKey],
    destination: &[u8],
    message: &[u8],
) -> Result<Packet, CryptoError> {
    let ephemeral = random_secret()?;
    build_with_ephemeral(params, route, keys, destination, message, &ephemeral)
}

pub(crate) fn build_with_ephemeral(
    params: &SphinxParams,
    route: &[u32],
    keys: &[PublicKey],
    destination: &[u8],
    message: &[u8],
    ephemeral: &[u8; 32],
) -> Result<Packet, CryptoError> {
    if route.is_empty() {
        return Err(CryptoError::InvalidRoute("route is empty"));
    }
    if route.len() != keys.len() {
        return Err(CryptoError::InvalidRoute("route and key counts differ"));
    }
    if route.len() > params.max_hops() {
        return Err(CryptoError::TooManyHops {
            max: params.max_hops(),
            actual: route.len(),
        });
    }

    let hops = route.len();
    let beta_size = params.beta_size();
    let stream_size = beta_size + SLOT_SIZE;

    // Shared secrets and the alpha each hop will see.
    let mut alpha = scalar_mult(ephemeral, &BASEPOINT);
    let mut alphas = Vec::with_capacity(hops);
    let mut blinds: Vec<Zeroizing<[u8; 32]>> = Vec::with_capacity(hops);
    let mut hop_keys = Vec::with_capacity(hops);

    for key in keys {
        let mut secret =
            checked_scalar_mult(ephemeral, key.as_bytes()).ok_or(CryptoError::InvalidPublicKey)?;
        for blind in &blinds {
            secret = checked_scalar_mult(blind, secret.as_bytes())
                .ok_or(CryptoError::InvalidPublicKey)?;
        }

        let hop = HopKeys::new(secret.as_bytes());
        let blind = Zeroizing::new(hop.blinding_factor(&alpha));

        alphas.push(alpha);
        alpha = scalar_mult(&blind, &alpha);
        blinds.push(blind);
        hop_keys.push(hop);
    }

    // Filler: the tail every intermediate hop appends and then decrypts.
    let mut filler: Vec<u8> = Vec::with_capacity((hops - 1) * SLOT_SIZE);
    for hop in &hop_keys[..hops - 1] {
        filler.extend_from_slice(&[0u8; SLOT_SIZE]);
        let stream = hop.header_stream(stream_size);
        let offset = stream_size - filler.len();
        xor_in_place(&mut filler, &stream[offset..]);
    }

    // Payload layers, innermost first.
    let last = &hop_keys[hops - 1];
    let mut delta = encode_body(params, &last.payload_mac_key(), destination, message)?;
    let mut deltas = vec![Vec::new(); hops];
    for (i, hop) in hop_keys.iter().enumerate().rev() {
        xor_in_place(&mut delta, &hop.payload_stream(params.payload_size()));
        deltas[i] = delta.clone();
    }

    // Innermost header slot carries the deliver instruction.
    let pad_len = beta_size - (hops - 1) * SLOT_SIZE;
    let mut beta = vec![0u8; pad_len];
    beta[..ROUTING_INFO_SIZE].copy_from_slice(&RoutingInfo::Deliver.encode());
    xor_in_place(&mut beta, &last.header_stream(pad_len));
    beta.extend_from_slice(&filler);
    let mut gamma = mac(
        &last.header_mac_key(),
        &[alphas[hops - 1].as_slice(), &beta, &deltas[hops - 1]],
    );

    for i in (0..hops - 1).rev() {
        let mut wrapped = Vec::with_capacity(beta_size);
        wrapped.extend_from_slice(&RoutingInfo::Relay(route[i + 1]).encode());
        wrapped.extend_from_slice(&gamma);
        wrapped.extend_from_slice(&beta[..beta_size - SLOT_SIZE]);
        xor_in_place(&mut wrapped, &hop_keys[i].header_stream(beta_size));

        beta = wrapped;
        gamma = mac(
            &hop_keys[i].header_mac_key(),
            &[alphas[i].as_slice(), &beta, &deltas[i]],
        );
    }

    Ok(Packet {
        header: Header {
            alpha: alphas[0],
            beta,
            gamma,
        },
        delta,
    })
}
