use crate::errors::{AppError, ResultExt};
use crate::fallback::ContactDiscovery;
use crate::models::*;
use crate::registry::ServiceRegistry;
use crate::services::Capability;
use axum::{extract::State, Json};
use moka::future::Cache;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub discovery: Arc<ContactDiscovery>,
    /// Verification verdicts keyed by email. Deliverability changes slowly,
    /// so hits here save a paid upstream call.
    pub verify_cache: Cache<String, EmailVerification>,
}

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "leadgrid-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Lists registered sources with a fresh availability check.
pub async fn list_sources(State(state): State<AppState>) -> Json<Value> {
    let sources = state.registry.refresh_sources().await;
    Json(json!({ "sources": *sources }))
}

/// Fans a search out across providers and returns per-source results.
pub async fn search_leads(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let sources = state
        .registry
        .multi_search(&request.filters, &request.options)
        .await;
    let total = sources.iter().map(|s| s.metadata.total).sum();
    Json(SearchResponse { total, sources })
}

/// Enriches one lead across all enrich-capable providers.
pub async fn enrich_lead(
    State(state): State<AppState>,
    Json(lead): Json<Lead>,
) -> Result<Json<Lead>, AppError> {
    let enriched = state
        .registry
        .enrich_lead(&lead)
        .await
        .context("enriching lead")?;
    Ok(Json(enriched))
}

/// Verifies one email's deliverability, cache first.
pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<EmailVerification>, AppError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }

    if let Some(cached) = state.verify_cache.get(&email).await {
        tracing::debug!("Verification cache hit for {}", email);
        return Ok(Json(cached));
    }

    let Some(provider) = state
        .registry
        .providers_with(Capability::VerifyEmail)
        .into_iter()
        .find(|p| p.is_configured())
    else {
        return Ok(Json(EmailVerification::error("service_unavailable")));
    };

    let verification = provider.verify_email(&email).await;
    // Error verdicts are transient; only cache real answers.
    if verification.status != "error" && verification.status != "service_unavailable" {
        state.verify_cache.insert(email, verification.clone()).await;
    }
    Ok(Json(verification))
}

/// Finds an email for a name + domain via the fallback chain.
pub async fn find_email(
    State(state): State<AppState>,
    Json(request): Json<FindEmailRequest>,
) -> Result<Json<FindEmailResponse>, AppError> {
    if request.first_name.trim().is_empty()
        || request.last_name.trim().is_empty()
        || request.domain.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "first_name, last_name and domain are required".to_string(),
        ));
    }

    let response = state
        .discovery
        .find_email(
            request.first_name.trim(),
            request.last_name.trim(),
            request.domain.trim(),
        )
        .await;
    Ok(Json(response))
}

/// Fills missing emails across a batch of leads.
pub async fn discover_contacts(
    State(state): State<AppState>,
    Json(request): Json<DiscoverContactsRequest>,
) -> Result<Json<DiscoverContactsResponse>, AppError> {
    if request.leads.is_empty() {
        return Err(AppError::BadRequest("leads must not be empty".to_string()));
    }
    let response = state.discovery.discover_for_batch(request.leads).await;
    Ok(Json(response))
}
