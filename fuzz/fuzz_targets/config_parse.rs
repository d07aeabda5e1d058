//! Fuzz test for configuration file parsing
//!
//! Arbitrary TOML must either fail to parse or fail validation, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mixnet_cli::config::Config;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = toml::from_str::<Config>(s) {
        if config.validate().is_ok() {
            // Valid configs always produce a usable listen address and core config
            let _ = config.listen_addr();
            let core = config.to_mixnet_config();
            assert!(core.validate().is_ok());
        }
    }
});
