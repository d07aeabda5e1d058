//! Fuzz target for layer peeling
//!
//! Arbitrary packets and node keys must be rejected cleanly, never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mixnet_core::PacketAdapter;
use mixnet_crypto::sphinx::SphinxParams;
use mixnet_crypto::x25519::PrivateKey;

#[derive(Debug, Arbitrary)]
struct Input {
    key: [u8; 32],
    max_hops: u8,
    payload_size: u16,
    packet: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let Ok(params) = SphinxParams::new(usize::from(input.max_hops), usize::from(input.payload_size))
    else {
        return;
    };
    let adapter = PacketAdapter::new(params);
    let key = PrivateKey::from_bytes(input.key);

    // Pad or truncate to the right size so the MAC path is reached too
    let mut bytes = input.packet;
    bytes.resize(params.packet_size(), 0);

    if let Ok(packet) = adapter.decode(&bytes) {
        if let Ok(peeled) = adapter.peel(&key, &packet) {
            let _ = adapter.open(&peeled.mac_key, &peeled.packet);
        }
    }
});
