//! Confidence-weighted merge of enrichment results onto a lead.
//!
//! Results are folded in arrival order. A field already claimed is only
//! overwritten by a strictly higher confidence; equal confidence keeps the
//! earlier source. Zero-confidence results (the adapter failure shape) never
//! contribute, so a lead can only gain or keep data, never lose it.

use crate::models::{EnrichmentResult, Lead};
use crate::normalizer;
use serde_json::Value;
use std::collections::HashMap;

/// Merged lead plus the audit trail of what changed and who contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub lead: Lead,
    /// Field names applied, sorted.
    pub fields_enriched: Vec<String>,
    /// Contributing source names, deduped, in first-contribution order.
    pub source_names: Vec<String>,
}

struct Claim {
    value: Value,
    confidence: f64,
    source_name: String,
}

/// Folds a batch of enrichment results onto `original`.
pub fn merge(original: &Lead, results: &[EnrichmentResult]) -> MergeOutcome {
    let mut claims: HashMap<String, Claim> = HashMap::new();
    let mut source_order: Vec<String> = Vec::new();

    for result in results {
        if result.confidence <= 0.0 {
            continue;
        }
        for (field, value) in &result.enriched_data {
            if value.is_null() {
                continue;
            }
            let wins = claims
                .get(field)
                .map(|existing| result.confidence > existing.confidence)
                .unwrap_or(true);
            if wins {
                claims.insert(
                    field.clone(),
                    Claim {
                        value: value.clone(),
                        confidence: result.confidence,
                        source_name: result.source_name.clone(),
                    },
                );
            }
        }
    }

    let mut lead = original.clone();
    let mut fields_enriched: Vec<String> = Vec::new();

    // Apply in field-name order so the audit trail is deterministic.
    let mut fields: Vec<&String> = claims.keys().collect();
    fields.sort();
    for field in fields {
        let claim = &claims[field];
        if apply_field(&mut lead, field, &claim.value) {
            fields_enriched.push(field.clone());
            if !source_order.contains(&claim.source_name) {
                source_order.push(claim.source_name.clone());
            }
        }
    }

    lead.status = normalizer::derive_status(lead.email.as_deref(), lead.email_quality.as_ref());

    MergeOutcome {
        lead,
        fields_enriched,
        source_names: source_order,
    }
}

/// Writes one claimed field onto the lead. Returns false for unknown field
/// names or non-string payloads, which are dropped rather than erroring.
fn apply_field(lead: &mut Lead, field: &str, value: &Value) -> bool {
    let Some(text) = value.as_str().filter(|s| !s.is_empty()) else {
        return false;
    };
    match field {
        "email" => lead.email = Some(text.to_string()),
        "phone" => lead.phone = Some(text.to_string()),
        "linkedin_url" => lead.linkedin_url = Some(text.to_string()),
        "position" => lead.position = text.to_string(),
        "company" => lead.company = text.to_string(),
        "company_domain" => lead.company_domain = normalizer::normalize_domain(text),
        "company_industry" => lead.company_info.industry = text.to_string(),
        "company_size" => lead.company_info.size = text.to_string(),
        "company_location" => lead.company_info.location = text.to_string(),
        "company_linkedin_url" => lead.company_info.linkedin_url = text.to_string(),
        "summary" => lead.profile_info.summary = text.to_string(),
        _ => {
            tracing::debug!("Ignoring unknown enrichment field '{}'", field);
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnrichmentResult;

    fn result_with(source: &str, confidence: f64, fields: &[(&str, &str)]) -> EnrichmentResult {
        let mut r = EnrichmentResult::new(source, source, confidence);
        for (field, value) in fields {
            r.record_str(field, value);
        }
        r
    }

    fn base_lead() -> Lead {
        Lead {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..Lead::default()
        }
    }

    #[test]
    fn higher_confidence_wins_regardless_of_order() {
        let low = result_with("a", 0.5, &[("email", "low@x.com")]);
        let high = result_with("b", 0.9, &[("email", "high@x.com")]);

        let forward = merge(&base_lead(), &[low.clone(), high.clone()]);
        let backward = merge(&base_lead(), &[high, low]);

        assert_eq!(forward.lead.email.as_deref(), Some("high@x.com"));
        assert_eq!(backward.lead.email.as_deref(), Some("high@x.com"));
    }

    #[test]
    fn equal_confidence_keeps_earlier_source() {
        let first = result_with("a", 0.7, &[("position", "CTO")]);
        let second = result_with("b", 0.7, &[("position", "Engineer")]);

        let outcome = merge(&base_lead(), &[first, second]);
        assert_eq!(outcome.lead.position, "CTO");
        assert_eq!(outcome.source_names, vec!["a".to_string()]);
    }

    #[test]
    fn zero_confidence_never_contributes() {
        let failed = result_with("a", 0.0, &[("email", "ghost@x.com")]);
        let outcome = merge(&base_lead(), &[failed]);
        assert_eq!(outcome.lead.email, None);
        assert!(outcome.fields_enriched.is_empty());
        assert!(outcome.source_names.is_empty());
    }

    #[test]
    fn fields_enriched_matches_applied_fields() {
        let r = result_with(
            "a",
            0.8,
            &[("email", "x@y.com"), ("company", "Initech"), ("company_domain", "https://www.initech.com/about")],
        );
        let outcome = merge(&base_lead(), &[r]);
        assert_eq!(
            outcome.fields_enriched,
            vec!["company", "company_domain", "email"]
        );
        assert_eq!(outcome.lead.company_domain, "initech.com");
    }

    #[test]
    fn status_rederived_after_merge() {
        let r = result_with("a", 0.8, &[("email", "x@y.com")]);
        let outcome = merge(&base_lead(), &[r]);
        assert_eq!(outcome.lead.status, crate::models::LeadStatus::Verified);
    }

    #[test]
    fn merge_never_removes_existing_data() {
        let mut lead = base_lead();
        lead.email = Some("keep@x.com".to_string());
        lead.phone = Some("(555) 123-4567".to_string());

        let r = result_with("a", 0.9, &[("position", "CEO")]);
        let outcome = merge(&lead, &[r]);

        assert_eq!(outcome.lead.email.as_deref(), Some("keep@x.com"));
        assert_eq!(outcome.lead.phone.as_deref(), Some("(555) 123-4567"));
        assert_eq!(outcome.lead.position, "CEO");
    }
}
