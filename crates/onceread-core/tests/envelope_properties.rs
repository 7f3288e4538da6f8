//! Property-based tests for ids, links and the wire envelope
//!
//! These tests verify invariants that must hold for all inputs: ids always
//! carry v4 bits, links never leak their key into the request form, and the
//! wire decoder rejects inconsistent envelopes instead of guessing.

use onceread_core::{
    Envelope, EnvelopeId, FileKind, Metadata, ShareLink, Timestamp, ValidationError, WireEnvelope,
};
use proptest::prelude::*;
use url::Url;

fn metadata_strategy() -> impl Strategy<Value = Metadata> {
    prop_oneof![
        Just(Metadata::Text),
        ("[a-z]{1,12}\\.png", "image/(png|jpeg|gif)")
            .prop_map(|(name, mime)| Metadata::file(FileKind::Photo, name, mime)),
        ("[a-z]{1,12}\\.[a-z]{2,4}", "(application|text)/[a-z]{2,10}")
            .prop_map(|(name, mime)| Metadata::file(FileKind::Document, name, mime)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: every id is a v4 UUID that parses back to itself
    #[test]
    fn prop_id_is_v4_and_parses_back(bytes in any::<[u8; 16]>()) {
        let id = EnvelopeId::from_random_bytes(bytes);
        let text = id.to_string();

        prop_assert_eq!(text.as_bytes()[14], b'4');
        prop_assert!(matches!(text.as_bytes()[19], b'8' | b'9' | b'a' | b'b'));
        prop_assert_eq!(text.parse::<EnvelopeId>().unwrap(), id);
    }

    /// Property: the request form of a link never contains its key
    #[test]
    fn prop_request_url_never_carries_key(
        bytes in any::<[u8; 16]>(),
        key in "[0-9a-f]{32}",
        prefix in "(/[a-z]{1,8}){0,3}",
    ) {
        let base = Url::parse(&format!("https://example.org{prefix}")).unwrap();
        let link = ShareLink::new(base, EnvelopeId::from_random_bytes(bytes), Some(key.clone()))?;

        let request = link.request_url();
        prop_assert!(request.fragment().is_none());
        prop_assert!(!request.as_str().contains(&key));

        // ORACLE: parsing the full link recovers both halves
        let parsed = ShareLink::parse(link.to_url().as_str())?;
        prop_assert_eq!(parsed.id(), link.id());
        prop_assert_eq!(parsed.key(), Some(key.as_str()));
    }

    /// Property: wire conversion preserves every well-formed envelope
    #[test]
    fn prop_wire_preserves_envelope(
        bytes in any::<[u8; 16]>(),
        created in 0u64..1 << 50,
        ttl in 1u64..604_800_001,
        password_protected in any::<bool>(),
        metadata in metadata_strategy(),
    ) {
        let envelope = Envelope {
            id: EnvelopeId::from_random_bytes(bytes),
            ciphertext: "c2VhbGVk".to_string(),
            created_at: Timestamp::from_millis(created),
            expires_at: Timestamp::from_millis(created + ttl),
            password_protected,
            metadata,
        };

        let json = WireEnvelope::from(envelope.clone()).to_json();
        prop_assert_eq!(WireEnvelope::decode_json(&json)?, envelope);
    }

    /// Property: an envelope that does not expire after creation is rejected
    #[test]
    fn prop_wire_rejects_non_increasing_timestamps(
        created in any::<u64>(),
        back in 0u64..1_000_000,
    ) {
        let wire = WireEnvelope {
            id: EnvelopeId::from_random_bytes([0; 16]).to_string(),
            encrypted_content: String::new(),
            created_at: created,
            expires_at: created.saturating_sub(back),
            password_protected: false,
            file_name: None,
            file_type: None,
            message_type: None,
        };
        prop_assert_eq!(Envelope::try_from(wire), Err(ValidationError::InvalidTimestamps));
    }
}
