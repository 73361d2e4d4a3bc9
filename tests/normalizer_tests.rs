/// Normalization rule tests: phone display formats, status derivation and
/// email syntax validation shared by every adapter.
use leadgrid_api::models::{EmailQuality, LeadStatus};
use leadgrid_api::normalizer::{derive_status, format_phone, is_valid_email};

#[test]
fn ten_digit_numbers_format_as_us_local() {
    assert_eq!(format_phone("5551234567"), "(555) 123-4567");
    assert_eq!(format_phone("555-123-4567"), "(555) 123-4567");
    assert_eq!(format_phone("(555) 123 4567"), "(555) 123-4567");
}

#[test]
fn eleven_digits_with_leading_one_format_as_plus_one() {
    assert_eq!(format_phone("15551234567"), "+1 (555) 123-4567");
    assert_eq!(format_phone("1-555-123-4567"), "+1 (555) 123-4567");
}

#[test]
fn plus_prefixed_numbers_are_left_untouched() {
    assert_eq!(format_phone("+44 20 7946 0958"), "+44 20 7946 0958");
    assert_eq!(format_phone("+15551234567"), "+15551234567");
}

#[test]
fn other_lengths_reduce_to_bare_digits() {
    assert_eq!(format_phone("123456"), "123456");
    assert_eq!(format_phone("25551234567"), "25551234567");
    assert_eq!(format_phone("ext. 42"), "42");
    assert_eq!(format_phone(""), "");
}

#[test]
fn status_requires_an_email() {
    assert_eq!(derive_status(None, None), LeadStatus::Unverified);
    assert_eq!(derive_status(Some(""), None), LeadStatus::Unverified);
    assert_eq!(derive_status(Some("a@b.com"), None), LeadStatus::Verified);
}

#[test]
fn status_respects_deliverability_verdict() {
    let good = EmailQuality {
        deliverable: true,
        quality_score: "0.97".to_string(),
        is_valid_format: true,
    };
    let bad = EmailQuality {
        deliverable: false,
        quality_score: "0.10".to_string(),
        is_valid_format: true,
    };
    assert_eq!(
        derive_status(Some("a@b.com"), Some(&good)),
        LeadStatus::Verified
    );
    assert_eq!(
        derive_status(Some("a@b.com"), Some(&bad)),
        LeadStatus::Unverified
    );
}

#[test]
fn email_validation_rejects_placeholders_and_garbage() {
    assert!(is_valid_email("ada.lovelace@example.com"));
    assert!(!is_valid_email("user999999@example.com"));
    assert!(!is_valid_email("a@b"));
    assert!(!is_valid_email("not-an-email"));
    assert!(!is_valid_email(""));
    assert!(!is_valid_email("spaced name@example.com"));
}
