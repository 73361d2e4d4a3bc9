//! Email discovery fallback chain.
//!
//! Finding an address tries progressively cheaper sources: dedicated finder
//! providers first, then enrichment providers probed with name + domain, and
//! finally a locally composed `{first}.{last}@{domain}` pattern guess. A
//! guessed address is explicitly marked unverified so callers never mistake
//! it for provider data.
//!
//! Batch discovery runs serialized with a minimum delay between upstream
//! calls; a rate-limit response stretches the next delay instead of aborting
//! the batch.

use crate::config::Config;
use crate::models::*;
use crate::normalizer;
use crate::registry::ServiceRegistry;
use crate::services::Capability;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Outcome of one discovery attempt, including pacing hints for batch loops.
struct Attempt {
    response: FindEmailResponse,
    rate_limited: bool,
}

pub struct ContactDiscovery {
    registry: Arc<ServiceRegistry>,
    base_delay: Duration,
    rate_limit_backoff: Duration,
}

impl ContactDiscovery {
    pub fn new(registry: Arc<ServiceRegistry>, config: &Config) -> Self {
        Self {
            registry,
            base_delay: Duration::from_millis(config.contact_discovery_delay_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
        }
    }

    /// Composes the deterministic pattern guess, or `None` when the inputs
    /// do not form a syntactically valid address.
    fn pattern_guess(first: &str, last: &str, domain: &str) -> Option<String> {
        let domain = normalizer::normalize_domain(domain);
        if first.is_empty() || last.is_empty() || domain.is_empty() {
            return None;
        }
        let guess = format!("{}.{}@{}", first, last, domain).to_lowercase();
        normalizer::is_valid_email(&guess).then_some(guess)
    }

    /// Runs the full chain for one name + domain.
    async fn attempt(&self, first: &str, last: &str, domain: &str) -> Attempt {
        let mut rate_limited = false;

        // Dedicated finders first.
        for provider in self.registry.providers_with(Capability::FindEmail) {
            let result = provider.find_email(first, last, domain).await;
            match result.status.as_str() {
                "rate_limited" => {
                    rate_limited = true;
                    sleep(self.rate_limit_backoff).await;
                }
                _ => {
                    if let Some(email) = result.email {
                        return Attempt {
                            response: FindEmailResponse {
                                email: Some(email),
                                verified: result.verified,
                                guessed: false,
                                source: Some(provider.id().to_string()),
                            },
                            rate_limited,
                        };
                    }
                }
            }
        }

        // Enrichment providers probed with name + domain.
        let probe = Lead {
            first_name: first.to_string(),
            last_name: last.to_string(),
            company_domain: normalizer::normalize_domain(domain),
            ..Lead::default()
        };
        for provider in self.registry.providers_with(Capability::Enrich) {
            sleep(self.base_delay).await;
            let result = provider.enrich(&probe).await;
            if result.confidence <= 0.0 {
                continue;
            }
            if let Some(email) = result
                .enriched_data
                .get("email")
                .and_then(|v| v.as_str())
                .filter(|e| !e.is_empty())
            {
                return Attempt {
                    response: FindEmailResponse {
                        email: Some(email.to_string()),
                        verified: false,
                        guessed: false,
                        source: Some(provider.id().to_string()),
                    },
                    rate_limited,
                };
            }
        }

        // Last resort: compose the common first.last pattern.
        match Self::pattern_guess(first, last, domain) {
            Some(guess) => {
                tracing::info!("Falling back to pattern guess for {} {}", first, last);
                Attempt {
                    response: FindEmailResponse {
                        email: Some(guess),
                        verified: false,
                        guessed: true,
                        source: None,
                    },
                    rate_limited,
                }
            }
            None => Attempt {
                response: FindEmailResponse {
                    email: None,
                    verified: false,
                    guessed: false,
                    source: None,
                },
                rate_limited,
            },
        }
    }

    /// Single name + domain lookup, as exposed by the email-finder endpoint.
    pub async fn find_email(&self, first: &str, last: &str, domain: &str) -> FindEmailResponse {
        self.attempt(first, last, domain).await.response
    }

    /// Fills missing emails across a batch of leads.
    ///
    /// Leads that already carry an email, or lack the name + domain needed
    /// for discovery, pass through untouched and consume no delay. Calls are
    /// serialized with at least the base delay between network-bearing
    /// iterations.
    pub async fn discover_for_batch(&self, leads: Vec<Lead>) -> DiscoverContactsResponse {
        let mut out = Vec::with_capacity(leads.len());
        let mut discovered = 0;
        let mut next_delay: Option<Duration> = None;

        for mut lead in leads {
            let has_email = lead.email.as_deref().is_some_and(|e| !e.is_empty());
            let discoverable = !lead.first_name.is_empty()
                && !lead.last_name.is_empty()
                && !lead.company_domain.is_empty();
            if has_email || !discoverable {
                out.push(lead);
                continue;
            }

            if let Some(delay) = next_delay {
                sleep(delay).await;
            }

            let attempt = self
                .attempt(&lead.first_name, &lead.last_name, &lead.company_domain)
                .await;
            next_delay = Some(if attempt.rate_limited {
                self.rate_limit_backoff
            } else {
                self.base_delay
            });

            if let Some(email) = attempt.response.email {
                // Carry the finder's own verdict: only a provider-verified
                // hit counts as deliverable. Guesses never do.
                let deliverable = !attempt.response.guessed && attempt.response.verified;
                let is_valid_format = normalizer::is_valid_email(&email);
                lead.email = Some(email);
                lead.email_quality = Some(EmailQuality {
                    deliverable,
                    quality_score: if deliverable { "1.00" } else { "0.00" }.to_string(),
                    is_valid_format,
                });
                lead.status = normalizer::derive_status(
                    lead.email.as_deref(),
                    lead.email_quality.as_ref(),
                );
                discovered += 1;
            }
            out.push(lead);
        }

        tracing::info!("Batch discovery found {} email(s)", discovered);
        DiscoverContactsResponse {
            leads: out,
            discovered,
        }
    }
}
