mod common;

use common::{make_facts, pinned_facts, test_codec, TEST_SECRET};
use keymint_license::{validate_format, KeyCodec, LicenseError, LicenseKey, KEY_LENGTH};

// ── validate_format ──────────────────────────────────────────────

#[test]
fn format_accepts_canonical_key() {
    assert!(validate_format("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY"));
}

#[test]
fn format_rejects_24_chars() {
    assert!(!validate_format("ABCDE-FGHIJ-KLMNO-PQRST-UVWX"));
}

#[test]
fn format_rejects_punctuation_padding() {
    // Stripping the '!' leaves 24 characters
    assert!(!validate_format("ABCDE-FGHIJ-KLMNO-PQRST-UVWX!"));
}

#[test]
fn format_is_case_and_delimiter_insensitive() {
    assert!(validate_format("abcde fghij klmno pqrst uvwxy"));
    assert!(validate_format("ABCDEFGHIJKLMNOPQRSTUVWXY"));
    assert!(validate_format("abcde-FGHIJ-klmno-PQRST-uvwxy"));
}

#[test]
fn format_rejects_empty_and_garbage() {
    assert!(!validate_format(""));
    assert!(!validate_format("-----"));
    assert!(!validate_format("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY-ZZZZZ"));
}

// ── LicenseKey parsing ───────────────────────────────────────────

#[test]
fn parse_normalizes_to_grouped_uppercase() {
    let key = LicenseKey::parse("abcde fghij klmno pqrst uvwxy").unwrap();
    assert_eq!(key.as_str(), "ABCDE-FGHIJ-KLMNO-PQRST-UVWXY");
}

#[test]
fn parse_rejects_wrong_length() {
    let result = LicenseKey::parse("ABCDE-FGHIJ");
    assert!(matches!(result, Err(LicenseError::InvalidFormat)));
}

#[test]
fn normalized_is_25_chars() {
    let key = LicenseKey::parse("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY").unwrap();
    assert_eq!(key.normalized().len(), KEY_LENGTH);
    assert!(!key.normalized().contains('-'));
}

#[test]
fn key_serde_is_transparent() {
    let key = LicenseKey::parse("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY").unwrap();
    let json = serde_json::to_string(&key).unwrap();
    assert_eq!(json, "\"ABCDE-FGHIJ-KLMNO-PQRST-UVWXY\"");
    let parsed: LicenseKey = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, key);
}

// ── Mint ─────────────────────────────────────────────────────────

#[test]
fn mint_produces_grouped_25_char_key() {
    let minted = test_codec().mint(&make_facts()).unwrap();
    let rendered = minted.key.as_str();
    assert_eq!(rendered.len(), 29); // 25 chars + 4 dashes
    for (i, group) in rendered.split('-').enumerate() {
        assert_eq!(group.len(), 5, "group {i} wrong length");
        assert!(group.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
    assert_eq!(rendered.split('-').count(), 5);
}

#[test]
fn mint_is_deterministic_for_same_facts() {
    let codec = test_codec();
    let facts = pinned_facts();
    let a = codec.mint(&facts).unwrap();
    let b = codec.mint(&facts).unwrap();
    assert_eq!(a.key, b.key);
    assert_eq!(a.signature, b.signature);
}

#[test]
fn mint_differs_by_instance_id() {
    let codec = test_codec();
    let mut facts = pinned_facts();
    let a = codec.mint(&facts).unwrap();
    facts.uuid = keymint_types::InstanceId::new();
    let b = codec.mint(&facts).unwrap();
    assert_ne!(a.key, b.key);
}

#[test]
fn mint_differs_by_secret() {
    let facts = pinned_facts();
    let a = KeyCodec::from_secret("secret-a").mint(&facts).unwrap();
    let b = KeyCodec::from_secret("secret-b").mint(&facts).unwrap();
    assert_ne!(a.key, b.key);
}

#[test]
fn mint_signature_is_keyed_digest_hex() {
    let minted = test_codec().mint(&pinned_facts()).unwrap();
    assert_eq!(minted.signature.len(), 64);
    assert!(minted.signature.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn customer_name_affects_signature_but_not_key() {
    // The canonical key input omits the name; the full-fact signature
    // does not.
    let codec = test_codec();
    let mut facts = pinned_facts();
    let a = codec.mint(&facts).unwrap();
    facts.name = "Someone Else".to_string();
    let b = codec.mint(&facts).unwrap();
    assert_eq!(a.key, b.key);
    assert_ne!(a.signature, b.signature);
}

#[test]
fn feature_order_changes_the_key() {
    let codec = test_codec();
    let mut facts = pinned_facts();
    let a = codec.mint(&facts).unwrap();
    facts.features.reverse();
    let b = codec.mint(&facts).unwrap();
    assert_ne!(a.key, b.key);
}

// ── Verify ───────────────────────────────────────────────────────

#[test]
fn verify_accepts_minted_key() {
    let codec = test_codec();
    let facts = make_facts();
    let minted = codec.mint(&facts).unwrap();
    assert!(codec.verify(minted.key.as_str(), &facts));
}

#[test]
fn verify_is_delimiter_and_case_insensitive() {
    let codec = test_codec();
    let facts = make_facts();
    let minted = codec.mint(&facts).unwrap();
    let lowered = minted.key.normalized().to_lowercase();
    assert!(codec.verify(&lowered, &facts));
}

#[test]
fn verify_rejects_every_single_character_flip() {
    let codec = test_codec();
    let facts = pinned_facts();
    let minted = codec.mint(&facts).unwrap();
    let normalized = minted.key.normalized();

    for i in 0..normalized.len() {
        let mut chars: Vec<char> = normalized.chars().collect();
        chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.iter().collect();
        assert!(
            !codec.verify(&tampered, &facts),
            "flip at position {i} was accepted"
        );
    }
}

#[test]
fn verify_rejects_wrong_facts() {
    let codec = test_codec();
    let facts = pinned_facts();
    let minted = codec.mint(&facts).unwrap();

    let mut other = facts.clone();
    other.email = "other@example.com".to_string();
    assert!(!codec.verify(minted.key.as_str(), &other));
}

#[test]
fn verify_rejects_wrong_secret() {
    let facts = pinned_facts();
    let minted = KeyCodec::from_secret(TEST_SECRET).mint(&facts).unwrap();
    assert!(!KeyCodec::from_secret("rotated-secret").verify(minted.key.as_str(), &facts));
}

#[test]
fn verify_never_errors_on_malformed_input() {
    let codec = test_codec();
    let facts = make_facts();
    assert!(!codec.verify("", &facts));
    assert!(!codec.verify("short", &facts));
    assert!(!codec.verify("!!!!!-!!!!!-!!!!!-!!!!!-!!!!!", &facts));
    assert!(!codec.verify("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY-EXTRA", &facts));
}

#[test]
fn verify_rejects_structurally_valid_forgery() {
    let codec = test_codec();
    let facts = make_facts();
    assert!(!codec.verify("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY", &facts));
}
