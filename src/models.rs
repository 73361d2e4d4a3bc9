use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============ Canonical Lead Record ============

/// Contactability confidence of a lead.
///
/// Defaults to `Unverified`; a lead is only `Verified` when a non-empty
/// email is present and, where verification data exists, it is marked
/// deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Unverified,
    Verified,
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::Unverified
    }
}

/// Email deliverability assessment attached to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailQuality {
    pub deliverable: bool,
    /// Provider score, kept as the string the provider reported.
    pub quality_score: String,
    pub is_valid_format: bool,
}

/// Phone metadata attached to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneQuality {
    #[serde(rename = "type")]
    pub phone_type: Option<String>,
    pub country_code: Option<String>,
    pub verified: bool,
    /// Id of the provider this number came from.
    pub source: String,
}

/// A past employment entry in a lead's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PastRole {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: String,
}

/// An education entry in a lead's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
}

/// Company attributes nested inside a lead.
///
/// Absent values normalize to empty strings so downstream merge logic has a
/// stable sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub linkedin_url: String,
}

/// Free-text profile attributes nested inside a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub past_roles: Vec<PastRole>,
    #[serde(default)]
    pub education: Vec<Education>,
}

/// Enrichment audit block stamped onto a lead after `enrich_lead`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentMeta {
    pub fields_enriched: Vec<String>,
    pub source_names: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// The canonical contact/company record every adapter normalizes into.
///
/// A lead has no provider-independent identity; within one search batch
/// identity is inferred by email match first, then exact (first, last) name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub company_domain: String,
    #[serde(default)]
    pub company_info: CompanyInfo,
    #[serde(default)]
    pub profile_info: ProfileInfo,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_quality: Option<EmailQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_quality: Option<PhoneQuality>,
    #[serde(
        default,
        rename = "_enrichment",
        skip_serializing_if = "Option::is_none"
    )]
    pub enrichment: Option<EnrichmentMeta>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether this lead already carries a usable contact point.
    pub fn has_contact_point(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
            || self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Batch-local identity: email match first, exact name match as fallback.
    pub fn matches_identity(&self, other: &Lead) -> bool {
        if let (Some(a), Some(b)) = (self.email.as_deref(), other.email.as_deref()) {
            if !a.is_empty() && a.eq_ignore_ascii_case(b) {
                return true;
            }
        }
        !self.first_name.is_empty()
            && !self.last_name.is_empty()
            && self.first_name == other.first_name
            && self.last_name == other.last_name
    }
}

// ============ Search ============

/// Flat set of optional search criteria.
///
/// No field is required; an adapter ignores filters it cannot express and
/// reports which ones it honored in `SearchMetadata.filters_applied`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Per-source search outcome metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Count of leads this source produced.
    pub total: usize,
    /// The query the source was asked to run, echoed back.
    pub query: SearchFilters,
    /// Names of the filters this source actually honored.
    pub filters_applied: Vec<String>,
    /// Transient failure description. A source with an error contributes no
    /// leads; partial success is not representable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the source hit a hard usage/billing ceiling, distinct from a
    /// transient error.
    #[serde(default)]
    pub usage_limit_reached: bool,
}

/// One adapter's output for one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source_id: String,
    pub source_name: String,
    pub leads: Vec<Lead>,
    pub metadata: SearchMetadata,
}

impl SourceResult {
    /// Successful result, possibly with zero leads.
    pub fn success(
        source_id: &str,
        source_name: &str,
        leads: Vec<Lead>,
        query: SearchFilters,
        filters_applied: Vec<String>,
    ) -> Self {
        let total = leads.len();
        Self {
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            leads,
            metadata: SearchMetadata {
                total,
                query,
                filters_applied,
                error: None,
                usage_limit_reached: false,
            },
        }
    }

    /// Error-shaped result: no leads, non-empty error message.
    pub fn failure(source_id: &str, source_name: &str, query: SearchFilters, error: String) -> Self {
        Self {
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            leads: Vec::new(),
            metadata: SearchMetadata {
                total: 0,
                query,
                filters_applied: Vec::new(),
                error: Some(error),
                usage_limit_reached: false,
            },
        }
    }

    /// Result for a source that hit its usage ceiling.
    pub fn usage_limit(source_id: &str, source_name: &str, query: SearchFilters, error: String) -> Self {
        let mut result = Self::failure(source_id, source_name, query, error);
        result.metadata.usage_limit_reached = true;
        result
    }
}

// ============ Enrichment ============

/// One adapter's enrichment attempt on a single lead.
///
/// `fields_enriched` is exactly the key set of `enriched_data`; null values
/// are never recorded. Confidence 0 means "do not trust this source for
/// merge purposes".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub source_id: String,
    pub source_name: String,
    pub enriched_data: HashMap<String, Value>,
    pub confidence: f64,
    pub fields_enriched: Vec<String>,
}

impl EnrichmentResult {
    pub fn new(source_id: &str, source_name: &str, confidence: f64) -> Self {
        Self {
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            enriched_data: HashMap::new(),
            confidence: confidence.clamp(0.0, 1.0),
            fields_enriched: Vec::new(),
        }
    }

    /// Zero-confidence empty result; the designated failure shape.
    pub fn empty(source_id: &str, source_name: &str) -> Self {
        Self::new(source_id, source_name, 0.0)
    }

    /// Records a field value, skipping nulls so `fields_enriched` stays in
    /// lockstep with `enriched_data`.
    pub fn record(&mut self, field: &str, value: Value) {
        if value.is_null() {
            return;
        }
        if self.enriched_data.insert(field.to_string(), value).is_none() {
            self.fields_enriched.push(field.to_string());
        }
    }

    /// Convenience for string-valued fields; empty strings are not recorded.
    pub fn record_str(&mut self, field: &str, value: &str) {
        if !value.is_empty() {
            self.record(field, Value::String(value.to_string()));
        }
    }
}

// ============ Registry Metadata ============

/// Cheap liveness/quota snapshot from an adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceStatus {
    pub fn available() -> Self {
        Self {
            available: true,
            quota_remaining: None,
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            quota_remaining: None,
            error: Some(error.into()),
        }
    }
}

/// Registry-facing metadata for one registered adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Derived from the live status check.
    pub enabled: bool,
    /// Registration order, descending: first registered = highest.
    pub priority: i32,
    pub required_env: String,
    /// Credentials present (no network call involved).
    pub has_valid_config: bool,
}

/// Result of a single-email verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailVerification {
    pub is_valid: bool,
    pub score: f64,
    /// "deliverable", "risky", "undeliverable", "error" or
    /// "service_unavailable".
    pub status: String,
}

impl EmailVerification {
    pub fn error(status: &str) -> Self {
        Self {
            is_valid: false,
            score: 0.0,
            status: status.to_string(),
        }
    }
}

/// Result of a name+domain email-finder lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailFinderResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub score: f64,
    /// "found", "not_found", "access_denied", "rate_limited" or "error".
    pub status: String,
    pub verified: bool,
}

impl EmailFinderResult {
    pub fn not_found(status: &str) -> Self {
        Self {
            email: None,
            score: 0.0,
            status: status.to_string(),
            verified: false,
        }
    }
}

// ============ API Request/Response Models ============

/// Options controlling a fan-out search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiSearchOptions {
    /// Restrict the fan-out to these adapter ids; unknown ids are dropped
    /// silently.
    #[serde(default)]
    pub use_services: Option<Vec<String>>,
    /// Cross-source deduplication switch. Deduplication is unimplemented;
    /// the per-source array is returned unchanged either way.
    #[serde(default)]
    pub combine_results: bool,
    #[serde(default)]
    pub max_results_per_service: Option<usize>,
}

impl MultiSearchOptions {
    pub const DEFAULT_MAX_RESULTS: usize = 25;

    pub fn max_results(&self) -> usize {
        self.max_results_per_service
            .unwrap_or(Self::DEFAULT_MAX_RESULTS)
    }
}

/// Request payload for `POST /api/v1/leads/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub options: MultiSearchOptions,
}

/// Response payload for `POST /api/v1/leads/search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Sum of per-source lead counts; duplicates across sources included.
    pub total: usize,
    pub sources: Vec<SourceResult>,
}

/// Request payload for `POST /api/v1/emails/verify`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
}

/// Request payload for `POST /api/v1/emails/find`.
#[derive(Debug, Clone, Deserialize)]
pub struct FindEmailRequest {
    pub first_name: String,
    pub last_name: String,
    pub domain: String,
}

/// Response payload for `POST /api/v1/emails/find`.
#[derive(Debug, Clone, Serialize)]
pub struct FindEmailResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub verified: bool,
    /// True when the address was composed locally instead of found upstream.
    pub guessed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Request payload for `POST /api/v1/leads/discover-contacts`.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverContactsRequest {
    pub leads: Vec<Lead>,
}

/// Response payload for `POST /api/v1/leads/discover-contacts`.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoverContactsResponse {
    pub leads: Vec<Lead>,
    /// How many leads gained an email during this pass.
    pub discovered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_matches_email_case_insensitively() {
        let a = Lead {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("Ada@Example.com".to_string()),
            ..Lead::default()
        };
        let b = Lead {
            first_name: "A.".to_string(),
            last_name: "L.".to_string(),
            email: Some("ada@example.com".to_string()),
            ..Lead::default()
        };
        assert!(a.matches_identity(&b));
    }

    #[test]
    fn identity_falls_back_to_exact_name() {
        let a = Lead {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..Lead::default()
        };
        let b = a.clone();
        assert!(a.matches_identity(&b));

        // Nameless leads never match by name.
        assert!(!Lead::default().matches_identity(&Lead::default()));
    }

    #[test]
    fn record_keeps_fields_in_lockstep_with_data() {
        let mut result = EnrichmentResult::new("s", "S", 0.8);
        result.record("email", json!("a@b.com"));
        result.record("skipped", Value::Null);
        result.record_str("empty", "");
        result.record("email", json!("later@b.com"));

        assert_eq!(result.fields_enriched, vec!["email"]);
        assert_eq!(result.enriched_data.len(), 1);
        assert_eq!(
            result.enriched_data.get("email").and_then(|v| v.as_str()),
            Some("later@b.com")
        );
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(EnrichmentResult::new("s", "S", 1.7).confidence, 1.0);
        assert_eq!(EnrichmentResult::new("s", "S", -0.3).confidence, 0.0);
    }
}
