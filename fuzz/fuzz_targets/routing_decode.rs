//! Fuzz target for routing slot decoding

#![no_main]

use libfuzzer_sys::fuzz_target;
use mixnet_crypto::sphinx::{RoutingInfo, decode_routing};

fuzz_target!(|data: &[u8]| {
    // Whatever decodes must re-encode to the same prefix
    if let Ok(info) = decode_routing(data) {
        let encoded = info.encode();
        assert_eq!(&data[..encoded.len()], &encoded[..]);
        assert_eq!(RoutingInfo::decode(&encoded), Ok(info));
    }
});
