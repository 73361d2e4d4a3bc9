//! External provider adapters.
//!
//! Each adapter wraps exactly one upstream lead-data API behind the uniform
//! `LeadProvider` capability interface. Expected failure modes (network
//! errors, timeouts, bad credentials, rate limits, empty results) never
//! escape an adapter as errors: they are folded into the result shapes the
//! registry aggregates (`SourceResult.metadata.error`, zero-confidence
//! `EnrichmentResult`, error-status verification results).

use crate::config::Config;
use crate::models::*;
use crate::normalizer;
use crate::quota;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// Capabilities an adapter can declare at construction.
///
/// The registry only invokes a capability method when the matching tag is
/// present; there is no runtime probing of methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Search,
    Enrich,
    VerifyEmail,
    FindEmail,
}

/// Uniform adapter interface over one external lead-data provider.
#[async_trait]
pub trait LeadProvider: Send + Sync {
    /// Stable identifier used in `use_services` selections and descriptors.
    fn id(&self) -> &'static str;
    /// Human-readable display name.
    fn name(&self) -> &'static str;
    /// Short description for the sources listing.
    fn description(&self) -> &'static str;
    /// Environment variable holding this provider's credential.
    fn required_env(&self) -> &'static str;
    /// Capability tags declared at construction.
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// True iff the required credential is present. Pure, no network call.
    fn is_configured(&self) -> bool;

    /// Cheap liveness/quota check. Never errors: missing credentials or an
    /// unreachable upstream yield `available: false` with an explanation.
    async fn get_status(&self) -> SourceStatus;

    /// Runs a search. Never errors: all failures are captured into
    /// `SourceResult.metadata`. An upstream "nothing found" (404-class)
    /// response is success with zero leads, not an error.
    async fn search(&self, filters: &SearchFilters, limit: usize) -> SourceResult {
        let _ = limit;
        SourceResult::failure(
            self.id(),
            self.name(),
            filters.clone(),
            format!("{} does not support search", self.name()),
        )
    }

    /// Attempts to fill gaps in a partial lead. Idempotent for identical
    /// input and upstream state. Failure yields the zero-confidence empty
    /// result.
    async fn enrich(&self, lead: &Lead) -> EnrichmentResult {
        let _ = lead;
        EnrichmentResult::empty(self.id(), self.name())
    }

    /// Classifies one email's deliverability. Transport failures yield
    /// `status: "service_unavailable"` rather than an error.
    async fn verify_email(&self, email: &str) -> EmailVerification {
        let _ = email;
        EmailVerification::error("service_unavailable")
    }

    /// Looks up an email by name + domain. An upstream access-denied (403)
    /// yields an empty result so callers can fall back.
    async fn find_email(&self, first: &str, last: &str, domain: &str) -> EmailFinderResult {
        let _ = (first, last, domain);
        EmailFinderResult::not_found("not_found")
    }
}

/// Builds the shared outbound client with the fixed per-call timeout.
fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Reads a response body for diagnostics without failing.
async fn body_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}

// ============ Apollo (people data) ============

/// People-data provider: bulk people search plus person-match enrichment.
/// Authenticates with an API-key header.
pub struct ApolloService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApolloService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.request_timeout_secs),
            base_url: config.apollo_base_url.clone(),
            api_key: config.apollo_api_key.clone(),
        }
    }

    fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    /// Maps one raw person object onto the canonical lead.
    fn normalize_person(&self, raw: &Value) -> Lead {
        let mut first_name = normalizer::str_or_empty(raw, "first_name");
        let mut last_name = normalizer::str_or_empty(raw, "last_name");
        if first_name.is_empty() && last_name.is_empty() {
            let full = normalizer::str_or_empty(raw, "name");
            let (f, l) = normalizer::split_full_name(&full);
            first_name = f;
            last_name = l;
        }

        let email = raw
            .get("email")
            .and_then(normalizer::preferred_email)
            .or_else(|| raw.get("personal_emails").and_then(normalizer::preferred_email));

        let phone = raw
            .get("phone_numbers")
            .and_then(normalizer::extract_phone)
            .or_else(|| raw.get("sanitized_phone").and_then(normalizer::extract_phone));

        let org = raw.get("organization").or_else(|| raw.get("account"));
        let company = org
            .map(|o| normalizer::str_or_empty(o, "name"))
            .unwrap_or_default();
        let company_domain = org
            .map(|o| normalizer::normalize_domain(&normalizer::str_or_empty(o, "primary_domain")))
            .unwrap_or_default();
        let company_info = org
            .map(|o| CompanyInfo {
                industry: normalizer::str_or_empty(o, "industry"),
                size: o
                    .get("estimated_num_employees")
                    .and_then(|v| v.as_u64())
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
                location: normalizer::str_or_empty(o, "country"),
                linkedin_url: normalizer::str_or_empty(o, "linkedin_url"),
            })
            .unwrap_or_default();

        let past_roles = raw
            .get("employment_history")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| {
                        let start = normalizer::str_or_empty(entry, "start_date");
                        let end = normalizer::str_or_empty(entry, "end_date");
                        let duration = match (start.is_empty(), end.is_empty()) {
                            (true, true) => String::new(),
                            _ => format!("{} - {}", start, end).trim().to_string(),
                        };
                        PastRole {
                            company: normalizer::str_or_empty(entry, "organization_name"),
                            title: normalizer::str_or_empty(entry, "title"),
                            duration,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let email_quality = raw.get("email_status").and_then(|v| v.as_str()).map(|s| {
            EmailQuality {
                deliverable: s == "verified",
                quality_score: raw
                    .get("email_confidence")
                    .and_then(|v| v.as_f64())
                    .map(|c| format!("{:.2}", c))
                    .unwrap_or_else(|| if s == "verified" { "1.00" } else { "0.00" }.to_string()),
                is_valid_format: email
                    .as_deref()
                    .map(normalizer::is_valid_email)
                    .unwrap_or(false),
            }
        });

        let status = normalizer::derive_status(email.as_deref(), email_quality.as_ref());
        let phone_quality = phone.is_some().then(|| PhoneQuality {
            phone_type: None,
            country_code: None,
            verified: false,
            source: "apollo".to_string(),
        });

        Lead {
            first_name,
            last_name,
            email,
            phone,
            linkedin_url: raw
                .get("linkedin_url")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from),
            position: normalizer::str_or_empty(raw, "title"),
            company,
            company_domain,
            company_info,
            profile_info: ProfileInfo {
                summary: normalizer::str_or_empty(raw, "headline"),
                past_roles,
                education: Vec::new(),
            },
            status,
            email_quality,
            phone_quality,
            enrichment: None,
        }
    }

    /// Builds the search body, returning it with the filter names honored.
    fn search_body(filters: &SearchFilters, limit: usize) -> (Value, Vec<String>) {
        let mut body = json!({ "page": 1, "per_page": limit });
        let mut applied = Vec::new();

        if let Some(title) = filters.title.as_deref().filter(|s| !s.is_empty()) {
            body["person_titles"] = json!([title]);
            applied.push("title".to_string());
        }
        if let Some(company) = filters.company.as_deref().filter(|s| !s.is_empty()) {
            body["q_organization_name"] = json!(company);
            applied.push("company".to_string());
        }
        if let Some(location) = filters.location.as_deref().filter(|s| !s.is_empty()) {
            body["person_locations"] = json!([location]);
            applied.push("location".to_string());
        }
        if let Some(industry) = filters.industry.as_deref().filter(|s| !s.is_empty()) {
            body["q_organization_keyword_tags"] = json!([industry]);
            applied.push("industry".to_string());
        }
        if let Some(size) = filters.company_size.as_deref().filter(|s| !s.is_empty()) {
            body["organization_num_employees_ranges"] = json!([size]);
            applied.push("company_size".to_string());
        }
        if let Some(seniority) = filters.seniority.as_deref().filter(|s| !s.is_empty()) {
            body["person_seniorities"] = json!([seniority]);
            applied.push("seniority".to_string());
        }
        if let Some(domain) = filters.domain.as_deref().filter(|s| !s.is_empty()) {
            body["q_organization_domains"] = json!(normalizer::normalize_domain(domain));
            applied.push("domain".to_string());
        }
        if let Some(name) = filters.name.as_deref().filter(|s| !s.is_empty()) {
            body["q_keywords"] = json!(name);
            applied.push("name".to_string());
        }
        // The email filter is not expressible against this upstream.

        (body, applied)
    }
}

#[async_trait]
impl LeadProvider for ApolloService {
    fn id(&self) -> &'static str {
        "apollo"
    }

    fn name(&self) -> &'static str {
        "Apollo"
    }

    fn description(&self) -> &'static str {
        "People database search and person-match enrichment"
    }

    fn required_env(&self) -> &'static str {
        "APOLLO_API_KEY"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Search, Capability::Enrich]
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_status(&self) -> SourceStatus {
        if !self.is_configured() {
            return SourceStatus::unavailable("APOLLO_API_KEY not set");
        }

        let url = format!("{}/auth/health", self.base_url);
        match self
            .client
            .get(&url)
            .header("X-Api-Key", self.key())
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => SourceStatus::available(),
            Ok(response) => {
                let status = response.status();
                let body = body_text(response).await;
                if quota::usage_limit_reached(status, &body) {
                    SourceStatus::unavailable("usage limit reached")
                } else {
                    SourceStatus::unavailable(format!("health check returned status {}", status))
                }
            }
            Err(e) => SourceStatus::unavailable(format!("health check failed: {}", e)),
        }
    }

    async fn search(&self, filters: &SearchFilters, limit: usize) -> SourceResult {
        if !self.is_configured() {
            return SourceResult::failure(
                self.id(),
                self.name(),
                filters.clone(),
                "not configured: APOLLO_API_KEY not set".to_string(),
            );
        }

        let (body, applied) = Self::search_body(filters, limit);
        let url = format!("{}/mixed_people/search", self.base_url);
        tracing::info!("Apollo: searching people (filters: {:?})", applied);

        let response = match self
            .client
            .post(&url)
            .header("X-Api-Key", self.key())
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Apollo search request failed: {}", e);
                return SourceResult::failure(
                    self.id(),
                    self.name(),
                    filters.clone(),
                    format!("Apollo request failed: {}", e),
                );
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Upstream "no records" is success with zero results.
            return SourceResult::success(self.id(), self.name(), Vec::new(), filters.clone(), applied);
        }
        if !status.is_success() {
            let error_text = body_text(response).await;
            if quota::usage_limit_reached(status, &error_text) {
                tracing::warn!("Apollo usage limit reached: {}", error_text);
                return SourceResult::usage_limit(
                    self.id(),
                    self.name(),
                    filters.clone(),
                    format!("Apollo usage limit reached: {}", error_text),
                );
            }
            tracing::error!("Apollo returned error {}: {}", status, error_text);
            return SourceResult::failure(
                self.id(),
                self.name(),
                filters.clone(),
                format!("Apollo returned status {}: {}", status, error_text),
            );
        }

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return SourceResult::failure(
                    self.id(),
                    self.name(),
                    filters.clone(),
                    format!("Failed to parse Apollo response: {}", e),
                )
            }
        };

        let leads: Vec<Lead> = payload
            .get("people")
            .or_else(|| payload.get("contacts"))
            .and_then(|v| v.as_array())
            .map(|people| {
                people
                    .iter()
                    .take(limit)
                    .map(|p| self.normalize_person(p))
                    .collect()
            })
            .unwrap_or_default();

        tracing::info!("Apollo: search produced {} leads", leads.len());
        SourceResult::success(self.id(), self.name(), leads, filters.clone(), applied)
    }

    async fn enrich(&self, lead: &Lead) -> EnrichmentResult {
        if !self.is_configured() {
            return EnrichmentResult::empty(self.id(), self.name());
        }

        let mut body = json!({});
        let matched_by_email = lead.email.as_deref().is_some_and(|e| !e.is_empty());
        if let Some(email) = lead.email.as_deref().filter(|e| !e.is_empty()) {
            body["email"] = json!(email);
        } else if let Some(linkedin) = lead.linkedin_url.as_deref().filter(|l| !l.is_empty()) {
            body["linkedin_url"] = json!(linkedin);
        } else {
            body["first_name"] = json!(lead.first_name);
            body["last_name"] = json!(lead.last_name);
            if !lead.company_domain.is_empty() {
                body["domain"] = json!(lead.company_domain);
            } else {
                body["organization_name"] = json!(lead.company);
            }
        }

        let url = format!("{}/people/match", self.base_url);
        let response = match self
            .client
            .post(&url)
            .header("X-Api-Key", self.key())
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Apollo enrich request failed: {}", e);
                return EnrichmentResult::empty(self.id(), self.name());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = body_text(response).await;
            if quota::usage_limit_reached(status, &error_text) {
                tracing::warn!("Apollo usage limit reached during enrich: {}", error_text);
            } else if status != StatusCode::NOT_FOUND {
                tracing::warn!("Apollo enrich returned {}: {}", status, error_text);
            }
            return EnrichmentResult::empty(self.id(), self.name());
        }

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to parse Apollo enrich response: {}", e);
                return EnrichmentResult::empty(self.id(), self.name());
            }
        };

        let Some(person) = payload.get("person").filter(|p| p.is_object()) else {
            return EnrichmentResult::empty(self.id(), self.name());
        };

        // Self-reported match quality: an email-keyed match is an exact hit.
        let confidence = if matched_by_email { 0.9 } else { 0.75 };
        let mut result = EnrichmentResult::new(self.id(), self.name(), confidence);

        if let Some(email) = person.get("email").and_then(normalizer::preferred_email) {
            result.record_str("email", &email);
        }
        if let Some(phone) = person
            .get("phone_numbers")
            .and_then(normalizer::extract_phone)
            .or_else(|| person.get("sanitized_phone").and_then(normalizer::extract_phone))
        {
            result.record_str("phone", &phone);
        }
        result.record_str("linkedin_url", &normalizer::str_or_empty(person, "linkedin_url"));
        result.record_str("position", &normalizer::str_or_empty(person, "title"));
        if let Some(org) = person.get("organization") {
            result.record_str("company", &normalizer::str_or_empty(org, "name"));
            result.record_str(
                "company_domain",
                &normalizer::normalize_domain(&normalizer::str_or_empty(org, "primary_domain")),
            );
            result.record_str("company_industry", &normalizer::str_or_empty(org, "industry"));
        }

        tracing::info!(
            "Apollo: enriched {} field(s) for {}",
            result.fields_enriched.len(),
            lead.full_name()
        );
        result
    }
}

// ============ Hunter (email finder / verifier) ============

/// Email discovery provider: name+domain finder and single-address
/// verification. Authenticates with an API-key query parameter.
pub struct HunterService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HunterService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.request_timeout_secs),
            base_url: config.hunter_base_url.clone(),
            api_key: config.hunter_api_key.clone(),
        }
    }

    fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

#[async_trait]
impl LeadProvider for HunterService {
    fn id(&self) -> &'static str {
        "hunter"
    }

    fn name(&self) -> &'static str {
        "Hunter"
    }

    fn description(&self) -> &'static str {
        "Email finder and deliverability verification"
    }

    fn required_env(&self) -> &'static str {
        "HUNTER_API_KEY"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::FindEmail, Capability::VerifyEmail]
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_status(&self) -> SourceStatus {
        if !self.is_configured() {
            return SourceStatus::unavailable("HUNTER_API_KEY not set");
        }

        let url = format!("{}/account?api_key={}", self.base_url, self.key());
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let quota_remaining = response.json::<Value>().await.ok().and_then(|v| {
                    let searches = v.get("data")?.get("requests")?.get("searches")?;
                    let available = searches.get("available")?.as_u64()?;
                    let used = searches.get("used")?.as_u64()?;
                    Some(available.saturating_sub(used))
                });
                SourceStatus {
                    available: true,
                    quota_remaining,
                    error: None,
                }
            }
            Ok(response) => {
                let status = response.status();
                let body = body_text(response).await;
                if quota::usage_limit_reached(status, &body) {
                    SourceStatus::unavailable("usage limit reached")
                } else {
                    SourceStatus::unavailable(format!("account check returned status {}", status))
                }
            }
            Err(e) => SourceStatus::unavailable(format!("account check failed: {}", e)),
        }
    }

    async fn verify_email(&self, email: &str) -> EmailVerification {
        if !self.is_configured() {
            return EmailVerification::error("service_unavailable");
        }

        let url = format!(
            "{}/email-verifier?email={}&api_key={}",
            self.base_url, email, self.key()
        );
        tracing::info!("Hunter: verifying email {}", email);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Hunter verify request failed: {}", e);
                return EmailVerification::error("service_unavailable");
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!("Hunter verify returned status {}", status);
            return EmailVerification::error("error");
        }

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to parse Hunter verify response: {}", e);
                return EmailVerification::error("error");
            }
        };

        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        let result = data
            .get("result")
            .and_then(|v| v.as_str())
            .unwrap_or("error")
            .to_string();
        let score = data
            .get("score")
            .and_then(|v| v.as_f64())
            .map(|s| (s / 100.0).clamp(0.0, 1.0))
            .unwrap_or(0.0);

        EmailVerification {
            is_valid: result == "deliverable",
            score,
            status: result,
        }
    }

    async fn find_email(&self, first: &str, last: &str, domain: &str) -> EmailFinderResult {
        if !self.is_configured() {
            return EmailFinderResult::not_found("not_found");
        }

        let url = format!(
            "{}/email-finder?domain={}&first_name={}&last_name={}&api_key={}",
            self.base_url,
            normalizer::normalize_domain(domain),
            first,
            last,
            self.key()
        );
        tracing::info!("Hunter: finding email for {} {} @ {}", first, last, domain);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Hunter finder request failed: {}", e);
                return EmailFinderResult::not_found("error");
            }
        };

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            // Access denied on this plan: return an empty result so the
            // caller falls back instead of propagating.
            tracing::warn!("Hunter finder access denied (403)");
            return EmailFinderResult::not_found("access_denied");
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Hunter finder rate limited (429)");
            return EmailFinderResult::not_found("rate_limited");
        }
        if status == StatusCode::NOT_FOUND {
            return EmailFinderResult::not_found("not_found");
        }
        if !status.is_success() {
            tracing::warn!("Hunter finder returned status {}", status);
            return EmailFinderResult::not_found("error");
        }

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to parse Hunter finder response: {}", e);
                return EmailFinderResult::not_found("error");
            }
        };

        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        let email = data
            .get("email")
            .and_then(|v| v.as_str())
            .filter(|e| !e.is_empty())
            .map(String::from);
        let score = data
            .get("score")
            .and_then(|v| v.as_f64())
            .map(|s| (s / 100.0).clamp(0.0, 1.0))
            .unwrap_or(0.0);
        let verified = data
            .get("verification")
            .and_then(|v| v.get("status"))
            .and_then(|v| v.as_str())
            .map(|s| s == "valid" || s == "deliverable")
            .unwrap_or(false);

        match email {
            Some(email) => {
                tracing::info!("Hunter: found {} (score {:.2})", email, score);
                EmailFinderResult {
                    email: Some(email),
                    score,
                    status: "found".to_string(),
                    verified,
                }
            }
            None => EmailFinderResult::not_found("not_found"),
        }
    }
}

// ============ Clearbit (company enrichment) ============

/// Company-enrichment provider: combined person/company lookup keyed by
/// email, plus domain-keyed prospecting. Authenticates with a bearer token.
/// Its upstream reports "no record" as a 404, which normalizes to success
/// with zero results.
pub struct ClearbitService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ClearbitService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.request_timeout_secs),
            base_url: config.clearbit_base_url.clone(),
            api_key: config.clearbit_api_key.clone(),
        }
    }

    fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    fn normalize_prospect(&self, raw: &Value, domain: &str) -> Lead {
        let name = raw.get("name").cloned().unwrap_or(Value::Null);
        let mut first_name = normalizer::str_or_empty(&name, "givenName");
        let mut last_name = normalizer::str_or_empty(&name, "familyName");
        if first_name.is_empty() && last_name.is_empty() {
            let full = normalizer::str_or_empty(&name, "fullName");
            let (f, l) = normalizer::split_full_name(&full);
            first_name = f;
            last_name = l;
        }

        let email = raw
            .get("email")
            .and_then(normalizer::preferred_email);
        let status = normalizer::derive_status(email.as_deref(), None);

        Lead {
            first_name,
            last_name,
            email,
            phone: raw.get("phone").and_then(normalizer::extract_phone),
            linkedin_url: raw
                .get("linkedin")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|handle| format!("https://linkedin.com/{}", handle.trim_start_matches('/'))),
            position: normalizer::str_or_empty(raw, "title"),
            company: String::new(),
            company_domain: normalizer::normalize_domain(domain),
            status,
            ..Lead::default()
        }
    }

    /// Records company attributes from a raw company object.
    fn record_company(result: &mut EnrichmentResult, company: &Value) {
        result.record_str("company", &normalizer::str_or_empty(company, "name"));
        result.record_str(
            "company_domain",
            &normalizer::normalize_domain(&normalizer::str_or_empty(company, "domain")),
        );
        if let Some(industry) = company
            .get("category")
            .map(|c| normalizer::str_or_empty(c, "industry"))
            .filter(|s| !s.is_empty())
        {
            result.record_str("company_industry", &industry);
        }
        if let Some(employees) = company
            .get("metrics")
            .and_then(|m| m.get("employees"))
            .and_then(|v| v.as_u64())
        {
            result.record("company_size", json!(employees.to_string()));
        }
        if let Some(location) = company
            .get("geo")
            .map(|g| normalizer::str_or_empty(g, "country"))
            .filter(|s| !s.is_empty())
        {
            result.record_str("company_location", &location);
        }
        if let Some(handle) = company
            .get("linkedin")
            .map(|l| normalizer::str_or_empty(l, "handle"))
            .filter(|s| !s.is_empty())
        {
            result.record_str(
                "company_linkedin_url",
                &format!("https://linkedin.com/{}", handle),
            );
        }
    }
}

#[async_trait]
impl LeadProvider for ClearbitService {
    fn id(&self) -> &'static str {
        "clearbit"
    }

    fn name(&self) -> &'static str {
        "Clearbit"
    }

    fn description(&self) -> &'static str {
        "Person and company enrichment with domain-keyed prospecting"
    }

    fn required_env(&self) -> &'static str {
        "CLEARBIT_API_KEY"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Search, Capability::Enrich]
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_status(&self) -> SourceStatus {
        if !self.is_configured() {
            return SourceStatus::unavailable("CLEARBIT_API_KEY not set");
        }

        let url = format!("{}/v2/companies/find?domain=clearbit.com", self.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(self.key())
            .send()
            .await
        {
            // A 404 here still proves the upstream is reachable and the
            // credential is accepted.
            Ok(response)
                if response.status().is_success() || response.status() == StatusCode::NOT_FOUND =>
            {
                SourceStatus::available()
            }
            Ok(response) => {
                let status = response.status();
                let body = body_text(response).await;
                if status == StatusCode::UNAUTHORIZED {
                    SourceStatus::unavailable("invalid credentials")
                } else if quota::usage_limit_reached(status, &body) {
                    SourceStatus::unavailable("usage limit reached")
                } else {
                    SourceStatus::unavailable(format!("status check returned {}", status))
                }
            }
            Err(e) => SourceStatus::unavailable(format!("status check failed: {}", e)),
        }
    }

    async fn search(&self, filters: &SearchFilters, limit: usize) -> SourceResult {
        if !self.is_configured() {
            return SourceResult::failure(
                self.id(),
                self.name(),
                filters.clone(),
                "not configured: CLEARBIT_API_KEY not set".to_string(),
            );
        }

        // Prospecting is domain-keyed; without a domain (or a company name
        // we can treat as one) there is nothing to ask this upstream.
        let domain = filters
            .domain
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(normalizer::normalize_domain);
        let Some(domain) = domain else {
            tracing::debug!("Clearbit: no domain filter, returning zero results");
            return SourceResult::success(
                self.id(),
                self.name(),
                Vec::new(),
                filters.clone(),
                Vec::new(),
            );
        };

        let mut applied = vec!["domain".to_string()];
        let mut url = format!(
            "{}/v1/people/search?domain={}&limit={}",
            self.base_url, domain, limit
        );
        if let Some(title) = filters.title.as_deref().filter(|s| !s.is_empty()) {
            url.push_str(&format!("&title={}", title));
            applied.push("title".to_string());
        }
        if let Some(seniority) = filters.seniority.as_deref().filter(|s| !s.is_empty()) {
            url.push_str(&format!("&seniority={}", seniority));
            applied.push("seniority".to_string());
        }
        if let Some(name) = filters.name.as_deref().filter(|s| !s.is_empty()) {
            url.push_str(&format!("&name={}", name));
            applied.push("name".to_string());
        }

        tracing::info!("Clearbit: prospecting {} (filters: {:?})", domain, applied);

        let response = match self.client.get(&url).bearer_auth(self.key()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Clearbit prospect request failed: {}", e);
                return SourceResult::failure(
                    self.id(),
                    self.name(),
                    filters.clone(),
                    format!("Clearbit request failed: {}", e),
                );
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return SourceResult::success(self.id(), self.name(), Vec::new(), filters.clone(), applied);
        }
        if !status.is_success() {
            let error_text = body_text(response).await;
            if quota::usage_limit_reached(status, &error_text) {
                tracing::warn!("Clearbit usage limit reached: {}", error_text);
                return SourceResult::usage_limit(
                    self.id(),
                    self.name(),
                    filters.clone(),
                    format!("Clearbit usage limit reached: {}", error_text),
                );
            }
            tracing::error!("Clearbit returned error {}: {}", status, error_text);
            return SourceResult::failure(
                self.id(),
                self.name(),
                filters.clone(),
                format!("Clearbit returned status {}: {}", status, error_text),
            );
        }

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return SourceResult::failure(
                    self.id(),
                    self.name(),
                    filters.clone(),
                    format!("Failed to parse Clearbit response: {}", e),
                )
            }
        };

        let people = payload
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .or_else(|| payload.as_array().cloned())
            .unwrap_or_default();
        let leads: Vec<Lead> = people
            .iter()
            .take(limit)
            .map(|p| self.normalize_prospect(p, &domain))
            .collect();

        tracing::info!("Clearbit: prospecting produced {} leads", leads.len());
        SourceResult::success(self.id(), self.name(), leads, filters.clone(), applied)
    }

    async fn enrich(&self, lead: &Lead) -> EnrichmentResult {
        if !self.is_configured() {
            return EnrichmentResult::empty(self.id(), self.name());
        }

        // Email-keyed combined lookup when possible, company-only otherwise.
        let (url, confidence, person_lookup) =
            match lead.email.as_deref().filter(|e| !e.is_empty()) {
                Some(email) => (
                    format!("{}/v2/combined/find?email={}", self.base_url, email),
                    0.8,
                    true,
                ),
                None if !lead.company_domain.is_empty() => (
                    format!(
                        "{}/v2/companies/find?domain={}",
                        self.base_url, lead.company_domain
                    ),
                    0.7,
                    false,
                ),
                None => return EnrichmentResult::empty(self.id(), self.name()),
            };

        let response = match self.client.get(&url).bearer_auth(self.key()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Clearbit enrich request failed: {}", e);
                return EnrichmentResult::empty(self.id(), self.name());
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // No record for this key; nothing to contribute.
            return EnrichmentResult::empty(self.id(), self.name());
        }
        if !status.is_success() {
            let error_text = body_text(response).await;
            if quota::usage_limit_reached(status, &error_text) {
                tracing::warn!("Clearbit usage limit reached during enrich: {}", error_text);
            } else {
                tracing::warn!("Clearbit enrich returned {}: {}", status, error_text);
            }
            return EnrichmentResult::empty(self.id(), self.name());
        }

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to parse Clearbit enrich response: {}", e);
                return EnrichmentResult::empty(self.id(), self.name());
            }
        };

        let mut result = EnrichmentResult::new(self.id(), self.name(), confidence);

        if person_lookup {
            if let Some(person) = payload.get("person").filter(|p| p.is_object()) {
                if let Some(handle) = person
                    .get("linkedin")
                    .map(|l| normalizer::str_or_empty(l, "handle"))
                    .filter(|s| !s.is_empty())
                {
                    result.record_str(
                        "linkedin_url",
                        &format!("https://linkedin.com/{}", handle),
                    );
                }
                if let Some(title) = person
                    .get("employment")
                    .map(|e| normalizer::str_or_empty(e, "title"))
                    .filter(|s| !s.is_empty())
                {
                    result.record_str("position", &title);
                }
                result.record_str("summary", &normalizer::str_or_empty(person, "bio"));
            }
            if let Some(company) = payload.get("company").filter(|c| c.is_object()) {
                Self::record_company(&mut result, company);
            }
        } else {
            Self::record_company(&mut result, &payload);
        }

        tracing::info!(
            "Clearbit: enriched {} field(s) for {}",
            result.fields_enriched.len(),
            lead.full_name()
        );
        result
    }
}
