//! Shared normalization rules applied to every provider's raw response.
//!
//! Each adapter maps its own response shape onto the canonical `Lead`, but
//! the rules for names, emails, phones and status live here so all sources
//! agree on what "normalized" means. Missing optional fields normalize to
//! empty string / `None` / empty list, never an absent key.

use crate::models::{EmailQuality, LeadStatus};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Splits a full-name string into (first, last).
///
/// First whitespace token becomes the first name, the last token the last
/// name; middle tokens are dropped. A single token yields an empty last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or("").to_string();
    let last = tokens.last().unwrap_or("").to_string();
    (first, last)
}

/// Picks the preferred email from a provider's candidate list.
///
/// Accepts a plain string, a list of strings, or a list of objects with an
/// `email` value and optional `type` tag. Candidates tagged "personal" or
/// "professional" win over others; otherwise the first candidate is taken.
pub fn preferred_email(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(candidates) => {
            let mut first: Option<String> = None;
            for candidate in candidates {
                let (email, tag) = match candidate {
                    Value::String(s) => (Some(s.as_str()), None),
                    Value::Object(_) => (
                        candidate.get("email").and_then(|v| v.as_str()),
                        candidate.get("type").and_then(|v| v.as_str()),
                    ),
                    _ => (None, None),
                };
                let Some(email) = email.filter(|e| !e.is_empty()) else {
                    continue;
                };
                if matches!(tag, Some("personal") | Some("professional")) {
                    return Some(email.to_string());
                }
                if first.is_none() {
                    first = Some(email.to_string());
                }
            }
            first
        }
        _ => None,
    }
}

/// Extracts the first phone number from a provider's raw value.
///
/// Accepts a plain string, a list of strings, or a list of objects carrying
/// `number` (or `raw_number`/`sanitized_number`). The result is formatted
/// via [`format_phone`].
pub fn extract_phone(raw: &Value) -> Option<String> {
    let candidate = match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(_) => item
                .get("number")
                .or_else(|| item.get("raw_number"))
                .or_else(|| item.get("sanitized_number"))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from),
            _ => None,
        }),
        _ => None,
    };
    candidate.map(|c| format_phone(&c))
}

/// Formats a phone number for display.
///
/// A value already starting with `+` is assumed to be in international
/// format and left untouched. Otherwise non-digits are stripped: exactly 10
/// digits format as `(XXX) XXX-XXXX`, exactly 11 digits with a leading `1`
/// format as `+1 (XXX) XXX-XXXX`, anything else is returned as the bare
/// digit string.
pub fn format_phone(raw: &str) -> String {
    if raw.starts_with('+') {
        return raw.to_string();
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
    } else if digits.len() == 11 && digits.starts_with('1') {
        format!(
            "+1 ({}) {}-{}",
            &digits[1..4],
            &digits[4..7],
            &digits[7..11]
        )
    } else {
        digits
    }
}

/// Derives the lead status from its email and any verification data.
///
/// `Verified` requires a non-empty email; when quality data is present the
/// email must also be marked deliverable.
pub fn derive_status(email: Option<&str>, quality: Option<&EmailQuality>) -> LeadStatus {
    let has_email = email.is_some_and(|e| !e.is_empty());
    if !has_email {
        return LeadStatus::Unverified;
    }
    match quality {
        Some(q) if !q.deliverable => LeadStatus::Unverified,
        _ => LeadStatus::Verified,
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // RFC 5322 simplified: local@domain.tld
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email regex is valid")
    })
}

/// Validate email address syntax.
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Fake/placeholder patterns (repeated digits like 9999, 1111)
/// - Minimum length requirements
/// - Valid domain structure
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // Lead forms attract placeholder addresses with repeated digits.
    let fake_patterns = ["999999", "111111", "000000", "123456789"];
    for pattern in &fake_patterns {
        if email.contains(pattern) {
            tracing::debug!("Rejected email (fake pattern '{}'): {}", pattern, email);
            return false;
        }
    }

    if !email_regex().is_match(email) {
        tracing::debug!("Rejected email (format): {}", email);
        return false;
    }

    true
}

/// Normalizes a company domain: strips scheme, `www.`, path and whitespace,
/// lowercases the rest.
pub fn normalize_domain(raw: &str) -> String {
    let mut domain = raw.trim().to_ascii_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(prefix) {
            domain = rest.to_string();
        }
    }
    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }
    if let Some(slash) = domain.find('/') {
        domain.truncate(slash);
    }
    domain
}

/// Pulls a string out of a raw value, with the empty-string absent sentinel.
pub fn str_or_empty(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_drops_middle_tokens() {
        assert_eq!(
            split_full_name("Ada Byron Lovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(split_full_name("Cher"), ("Cher".to_string(), "".to_string()));
        assert_eq!(split_full_name(""), ("".to_string(), "".to_string()));
    }

    #[test]
    fn preferred_email_favors_personal_tag() {
        let raw = json!([
            {"email": "work@corp.com", "type": "work"},
            {"email": "me@gmail.com", "type": "personal"}
        ]);
        assert_eq!(preferred_email(&raw), Some("me@gmail.com".to_string()));
    }

    #[test]
    fn preferred_email_falls_back_to_first() {
        let raw = json!(["a@x.com", "b@x.com"]);
        assert_eq!(preferred_email(&raw), Some("a@x.com".to_string()));
    }

    #[test]
    fn phone_objects_take_first_number() {
        let raw = json!([{"number": "5551234567", "type": "mobile"}]);
        assert_eq!(extract_phone(&raw), Some("(555) 123-4567".to_string()));
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(normalize_domain("https://www.Example.com/about"), "example.com");
        assert_eq!(normalize_domain("example.com"), "example.com");
    }
}
