//! Fuzz target for batch-mode response framing.
//!
//! Run with: cargo +nightly fuzz run fuzz_response_framing

#![no_main]

use libfuzzer_sys::fuzz_target;
use signerctl_core::driver::{SENTINEL, strip_sentinel};

fuzz_target!(|data: &[u8]| {
    match strip_sentinel(data) {
        Ok((body, true)) => {
            assert_eq!(body.len() + SENTINEL.len(), data.len());
            assert!(data.ends_with(SENTINEL));
        }
        Ok((body, false)) => assert_eq!(body, data),
        Err(_) => assert!(data.len() < SENTINEL.len()),
    }
});
