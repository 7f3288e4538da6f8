//! Fuzz target for envelope and link parsing
//!
//! Arbitrary text is decoded as a JSON envelope and as a share link. Invalid
//! input must be rejected with an error; anything accepted must survive a
//! re-encode unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use onceread_core::{ShareLink, WireEnvelope};

fuzz_target!(|data: &str| {
    if let Ok(envelope) = WireEnvelope::decode_json(data) {
        let json = WireEnvelope::from(envelope.clone()).to_json();
        assert_eq!(WireEnvelope::decode_json(&json).ok(), Some(envelope));
    }

    if let Ok(link) = ShareLink::parse(data) {
        let reparsed = ShareLink::parse(&link.to_string()).ok();
        assert!(reparsed.is_some_and(|r| r == link), "link did not survive a round trip");
    }
});
