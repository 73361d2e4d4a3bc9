//! Central registry of provider adapters and the fan-out operations over
//! them.
//!
//! `multi_search` and `enrich_lead` dispatch to every selected adapter
//! concurrently and always wait for all of them; one adapter failing,
//! timing out or panicking never loses another adapter's results. Each
//! adapter task runs on its own spawned task so a panic is contained by the
//! join handle instead of tearing down the batch.

use crate::errors::AppError;
use crate::merger;
use crate::models::*;
use crate::services::{Capability, LeadProvider};
use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

struct RegisteredProvider {
    provider: Arc<dyn LeadProvider>,
    /// Latched when the provider reports a hard usage ceiling; cleared the
    /// next time a status refresh sees it available again.
    quota_exhausted: AtomicBool,
}

/// Registry of provider adapters, fixed at startup.
///
/// Registration order defines priority: first registered is highest. The
/// descriptor list is refreshed on demand and served from a cached snapshot
/// in between.
pub struct ServiceRegistry {
    providers: Vec<RegisteredProvider>,
    descriptors: RwLock<Arc<Vec<ServiceDescriptor>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            descriptors: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Registers an adapter. Re-registering an id replaces the previous
    /// adapter in place, keeping its priority slot.
    pub fn register(&mut self, provider: Arc<dyn LeadProvider>) {
        let entry = RegisteredProvider {
            provider: provider.clone(),
            quota_exhausted: AtomicBool::new(false),
        };
        if let Some(existing) = self
            .providers
            .iter_mut()
            .find(|p| p.provider.id() == provider.id())
        {
            tracing::warn!("Replacing already-registered provider '{}'", provider.id());
            *existing = entry;
        } else {
            tracing::info!("Registered provider '{}'", provider.id());
            self.providers.push(entry);
        }
    }

    /// Looks up one adapter by id.
    pub fn get_service(&self, id: &str) -> Option<Arc<dyn LeadProvider>> {
        self.providers
            .iter()
            .find(|p| p.provider.id() == id)
            .map(|p| p.provider.clone())
    }

    /// Adapters carrying a capability tag, in registration order.
    pub fn providers_with(&self, capability: Capability) -> Vec<Arc<dyn LeadProvider>> {
        self.providers
            .iter()
            .filter(|p| p.provider.supports(capability))
            .map(|p| p.provider.clone())
            .collect()
    }

    fn is_quota_exhausted(&self, id: &str) -> bool {
        self.providers
            .iter()
            .find(|p| p.provider.id() == id)
            .map(|p| p.quota_exhausted.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn set_quota_exhausted(&self, id: &str, exhausted: bool) {
        if let Some(entry) = self.providers.iter().find(|p| p.provider.id() == id) {
            entry.quota_exhausted.store(exhausted, Ordering::Relaxed);
        }
    }

    /// Cached descriptor snapshot from the last refresh.
    pub fn sources(&self) -> Arc<Vec<ServiceDescriptor>> {
        self.descriptors
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Re-checks every adapter's live status concurrently and swaps in a
    /// fresh descriptor snapshot. Never fails: an adapter whose status check
    /// errors or panics is listed as disabled.
    pub async fn refresh_sources(&self) -> Arc<Vec<ServiceDescriptor>> {
        let total = self.providers.len();
        let checks = self.providers.iter().enumerate().map(|(idx, entry)| {
            let provider = entry.provider.clone();
            async move {
                let status = tokio::spawn({
                    let provider = provider.clone();
                    async move { provider.get_status().await }
                })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Status check for '{}' panicked: {}", provider.id(), e);
                    SourceStatus::unavailable("status check panicked")
                });
                (idx, provider, status)
            }
        });

        let mut descriptors = Vec::with_capacity(total);
        for (idx, provider, status) in join_all(checks).await {
            if status.available {
                // A provider seen healthy again is allowed back into fan-outs.
                self.set_quota_exhausted(provider.id(), false);
            }
            if let Some(error) = &status.error {
                tracing::debug!("Provider '{}' unavailable: {}", provider.id(), error);
            }
            descriptors.push(ServiceDescriptor {
                id: provider.id().to_string(),
                name: provider.name().to_string(),
                description: provider.description().to_string(),
                enabled: status.available,
                priority: (total - idx) as i32,
                required_env: provider.required_env().to_string(),
                has_valid_config: provider.is_configured(),
            });
        }
        descriptors.sort_by(|a, b| b.priority.cmp(&a.priority));

        let snapshot = Arc::new(descriptors);
        if let Ok(mut guard) = self.descriptors.write() {
            *guard = snapshot.clone();
        }
        snapshot
    }

    /// Resolves the adapter set for a search fan-out.
    ///
    /// An explicit `use_services` selection is honored verbatim minus unknown
    /// ids, which are dropped with a warning. Without a selection every
    /// search-capable adapter participates.
    fn select_for_search(&self, options: &MultiSearchOptions) -> Vec<Arc<dyn LeadProvider>> {
        match &options.use_services {
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    let found = self.get_service(id);
                    if found.is_none() {
                        tracing::warn!("Ignoring unknown service id '{}' in use_services", id);
                    }
                    found
                })
                .collect(),
            None => self.providers_with(Capability::Search),
        }
    }

    /// Fans a search out to the selected adapters and returns one
    /// `SourceResult` per adapter, in selection order.
    pub async fn multi_search(
        &self,
        filters: &SearchFilters,
        options: &MultiSearchOptions,
    ) -> Vec<SourceResult> {
        let selected = self.select_for_search(options);
        if selected.is_empty() {
            tracing::warn!("Search fan-out selected no providers");
            return Vec::new();
        }

        let limit = options.max_results();
        tracing::info!(
            "Fanning search out to {} provider(s), limit {} per provider",
            selected.len(),
            limit
        );

        let tasks = selected.into_iter().map(|provider| {
            let filters = filters.clone();
            let exhausted = self.is_quota_exhausted(provider.id());
            async move {
                if exhausted {
                    // Known-exhausted providers are not called again until a
                    // status refresh clears the latch.
                    tracing::debug!("Skipping '{}': usage limit latched", provider.id());
                    return SourceResult::usage_limit(
                        provider.id(),
                        provider.name(),
                        filters,
                        "usage limit previously reached".to_string(),
                    );
                }
                let id = provider.id();
                let name = provider.name();
                tokio::spawn({
                    let filters = filters.clone();
                    async move { provider.search(&filters, limit).await }
                })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Search task for '{}' panicked: {}", id, e);
                    SourceResult::failure(id, name, filters, "search task panicked".to_string())
                })
            }
        });

        let results = join_all(tasks).await;
        for result in &results {
            if result.metadata.usage_limit_reached {
                self.set_quota_exhausted(&result.source_id, true);
            }
        }

        if options.combine_results {
            tracing::debug!("combine_results requested; returning per-source results unchanged");
        }
        results
    }

    /// Fans an enrichment out to every enrich-capable adapter and merges the
    /// contributions by confidence.
    ///
    /// The input must carry at least one lookup key: an email, a LinkedIn
    /// URL, or a name together with a company or domain.
    pub async fn enrich_lead(&self, lead: &Lead) -> Result<Lead, AppError> {
        let has_email = lead.email.as_deref().is_some_and(|e| !e.is_empty());
        let has_linkedin = lead.linkedin_url.as_deref().is_some_and(|l| !l.is_empty());
        let has_name = !lead.first_name.is_empty() && !lead.last_name.is_empty();
        let has_company = !lead.company.is_empty() || !lead.company_domain.is_empty();
        if !has_email && !has_linkedin && !(has_name && has_company) {
            return Err(AppError::BadRequest(
                "enrichment requires an email, a linkedin_url, or a name plus company/domain"
                    .to_string(),
            ));
        }

        let providers: Vec<_> = self
            .providers_with(Capability::Enrich)
            .into_iter()
            .filter(|p| !self.is_quota_exhausted(p.id()))
            .collect();
        tracing::info!(
            "Enriching {} via {} provider(s)",
            lead.full_name(),
            providers.len()
        );

        let tasks = providers.into_iter().map(|provider| {
            let lead = lead.clone();
            async move {
                let id = provider.id();
                let name = provider.name();
                tokio::spawn(async move { provider.enrich(&lead).await })
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!("Enrich task for '{}' panicked: {}", id, e);
                        EnrichmentResult::empty(id, name)
                    })
            }
        });
        let results = join_all(tasks).await;

        let outcome = merger::merge(lead, &results);
        let mut enriched = outcome.lead;
        enriched.enrichment = Some(EnrichmentMeta {
            fields_enriched: outcome.fields_enriched,
            source_names: outcome.source_names,
            timestamp: Utc::now(),
        });
        Ok(enriched)
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
