//! Property-based tests for normalization and merge invariants.

use leadgrid_api::merger::merge;
use leadgrid_api::models::{EnrichmentResult, Lead};
use leadgrid_api::normalizer::format_phone;
use proptest::prelude::*;

fn email_result(source: &str, confidence: f64, email: &str) -> EnrichmentResult {
    let mut r = EnrichmentResult::new(source, source, confidence);
    r.record_str("email", email);
    r
}

proptest! {
    #[test]
    fn format_phone_never_panics(input in ".*") {
        let _ = format_phone(&input);
    }

    #[test]
    fn format_phone_is_idempotent(input in ".*") {
        let once = format_phone(&input);
        let twice = format_phone(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn ten_digit_inputs_take_us_local_shape(digits in "[0-9]{10}") {
        let out = format_phone(&digits);
        prop_assert_eq!(out.len(), 14);
        prop_assert!(out.starts_with('('));
        prop_assert!(out.contains(") "));
        prop_assert!(out.contains('-'));
    }

    #[test]
    fn eleven_digits_with_leading_one_take_plus_one_shape(digits in "1[0-9]{10}") {
        let out = format_phone(&digits);
        prop_assert!(out.starts_with("+1 ("));
        prop_assert_eq!(out.len(), 17);
    }

    #[test]
    fn plus_prefixed_inputs_pass_through(input in "\\+[0-9 ()\\-]{1,20}") {
        prop_assert_eq!(format_phone(&input), input);
    }

    #[test]
    fn merge_takes_the_highest_confidence_value(
        c_a in 0.01f64..=1.0,
        c_b in 0.01f64..=1.0,
    ) {
        let a = email_result("a", c_a, "a@example.com");
        let b = email_result("b", c_b, "b@example.com");
        let outcome = merge(&Lead::default(), &[a, b]);

        // Ties keep the earlier contribution.
        let expected = if c_b > c_a { "b@example.com" } else { "a@example.com" };
        prop_assert_eq!(outcome.lead.email.as_deref(), Some(expected));
    }

    #[test]
    fn merge_is_order_independent_for_distinct_confidences(
        c_low in 0.01f64..0.5,
        c_high in 0.51f64..=1.0,
    ) {
        let low = email_result("low", c_low, "low@example.com");
        let high = email_result("high", c_high, "high@example.com");

        let forward = merge(&Lead::default(), &[low.clone(), high.clone()]);
        let backward = merge(&Lead::default(), &[high, low]);
        prop_assert_eq!(forward.lead.email.as_deref(), Some("high@example.com"));
        prop_assert_eq!(forward.lead.email, backward.lead.email);
    }

    #[test]
    fn merge_never_clears_existing_fields(confidence in 0.0f64..=1.0) {
        let original = Lead {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("keep@example.com".to_string()),
            position: "Engineer".to_string(),
            ..Lead::default()
        };
        let mut r = EnrichmentResult::new("s", "s", confidence);
        r.record_str("company", "Initech");
        let outcome = merge(&original, &[r]);

        prop_assert!(outcome.lead.email.is_some());
        prop_assert_eq!(outcome.lead.position.as_str(), "Engineer");
    }
}
