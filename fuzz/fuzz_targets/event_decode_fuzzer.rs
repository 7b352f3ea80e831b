//! Fuzz target for notification decoding
//!
//! # Invariants
//!
//! - Arbitrary bytes NEVER panic the decoder
//! - Anything that decodes re-encodes to an equivalent event

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealbox_core::RelayEvent;

fuzz_target!(|data: &[u8]| {
    let Ok(event) = RelayEvent::decode(data) else {
        return;
    };

    let Ok(encoded) = event.encode() else {
        panic!("decoded event failed to encode: {event:?}");
    };
    match RelayEvent::decode(&encoded) {
        Ok(again) => assert_eq!(again, event),
        Err(e) => panic!("re-encoded event failed to decode: {e:?}"),
    }
});
