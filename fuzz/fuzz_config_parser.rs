//! Fuzz target for the client configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // any config that parses has already passed validation
        if let Ok(config) = signerctl_config::ClientConfig::parse(s) {
            assert!(config.validate().is_ok());
        }
    }
});
