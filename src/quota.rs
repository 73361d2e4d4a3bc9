//! Detection of hard quota / payment-required provider failures.
//!
//! Providers signal an exhausted plan either with HTTP 402 or with an error
//! payload whose type/message names a usage ceiling. Both translate into a
//! structured `usage_limit_reached` flag instead of a generic error, so
//! callers can stop retrying the provider and show a dedicated message.
//! Rate limiting (429, "rate limit" wording) is transient backpressure and
//! is never classified as a ceiling.

use reqwest::StatusCode;

const CEILING_MARKERS: &[&str] = &[
    "insufficient credits",
    "payment required",
    "usage limit",
    "usage_limit",
    "quota exceeded",
    "upgrade your plan",
    "plan limit",
];

/// Whether the status code alone indicates a hard usage ceiling.
pub fn is_usage_limit_status(status: StatusCode) -> bool {
    status == StatusCode::PAYMENT_REQUIRED
}

/// Whether an error payload's text indicates a usage ceiling.
pub fn body_indicates_usage_limit(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    CEILING_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Combined check used by adapters after a non-success response.
pub fn usage_limit_reached(status: StatusCode, body: &str) -> bool {
    // 429 means "slow down", not "plan exhausted"; latching a provider out
    // of fan-outs on it would turn a transient condition terminal.
    if status == StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    if is_usage_limit_status(status) {
        return true;
    }
    !status.is_success() && body_indicates_usage_limit(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_required_is_a_ceiling() {
        assert!(usage_limit_reached(StatusCode::PAYMENT_REQUIRED, ""));
    }

    #[test]
    fn ceiling_message_on_other_status_is_a_ceiling() {
        assert!(usage_limit_reached(
            StatusCode::FORBIDDEN,
            r#"{"error":{"type":"usage_limit","message":"Insufficient credits"}}"#
        ));
    }

    #[test]
    fn rate_limiting_is_never_a_ceiling() {
        assert!(!usage_limit_reached(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit reached, retry in 60 seconds"
        ));
        assert!(!usage_limit_reached(
            StatusCode::FORBIDDEN,
            "Rate limit reached, retry in 60 seconds"
        ));
        // Even ceiling wording on a 429 stays transient.
        assert!(!usage_limit_reached(
            StatusCode::TOO_MANY_REQUESTS,
            "upgrade your plan"
        ));
    }

    #[test]
    fn generic_failures_are_not_ceilings() {
        assert!(!usage_limit_reached(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error"
        ));
        assert!(!usage_limit_reached(StatusCode::NOT_FOUND, "no such person"));
    }

    #[test]
    fn success_with_ceiling_words_is_not_a_ceiling() {
        assert!(!usage_limit_reached(
            StatusCode::OK,
            "your usage limit is 10000 requests"
        ));
    }
}
