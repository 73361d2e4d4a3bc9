use serde::Deserialize;

/// Runtime configuration, loaded from the environment.
///
/// Provider credentials are all optional: a missing key means the adapter
/// registers as "unconfigured" and reports itself unavailable, it never
/// prevents the service from starting. Base URLs are overridable so tests
/// can point adapters at a mock server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub apollo_api_key: Option<String>,
    pub apollo_base_url: String,
    pub hunter_api_key: Option<String>,
    pub hunter_base_url: String,
    pub clearbit_api_key: Option<String>,
    pub clearbit_base_url: String,
    /// Per-call timeout for outbound provider requests, in seconds.
    pub request_timeout_secs: u64,
    /// Minimum delay between provider calls in a batch discovery loop, in ms.
    pub contact_discovery_delay_ms: u64,
    /// Extended delay applied after a rate-limit response, in ms.
    pub rate_limit_backoff_ms: u64,
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn base_url_env(name: &str, default: &str) -> anyhow::Result<String> {
    let url = std::env::var(name).unwrap_or_else(|_| default.to_string());
    // Reject anything url::Url cannot parse as http(s) up front; adapters
    // concatenate paths onto this value blindly.
    let parsed = url::Url::parse(&url)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            apollo_api_key: optional_env("APOLLO_API_KEY"),
            apollo_base_url: base_url_env("APOLLO_BASE_URL", "https://api.apollo.io/v1")?,
            hunter_api_key: optional_env("HUNTER_API_KEY"),
            hunter_base_url: base_url_env("HUNTER_BASE_URL", "https://api.hunter.io/v2")?,
            clearbit_api_key: optional_env("CLEARBIT_API_KEY"),
            clearbit_base_url: base_url_env("CLEARBIT_BASE_URL", "https://api.clearbit.com")?,
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be a number"))?,
            contact_discovery_delay_ms: std::env::var("CONTACT_DISCOVERY_DELAY_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CONTACT_DISCOVERY_DELAY_MS must be a number"))?,
            rate_limit_backoff_ms: std::env::var("RATE_LIMIT_BACKOFF_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BACKOFF_MS must be a number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Apollo configured: {}, Hunter configured: {}, Clearbit configured: {}",
            config.apollo_api_key.is_some(),
            config.hunter_api_key.is_some(),
            config.clearbit_api_key.is_some()
        );
        tracing::debug!("Apollo Base URL: {}", config.apollo_base_url);
        tracing::debug!("Hunter Base URL: {}", config.hunter_base_url);
        tracing::debug!("Clearbit Base URL: {}", config.clearbit_base_url);

        Ok(config)
    }

    /// Configuration with no providers wired up; used by tests as a base.
    pub fn for_tests() -> Self {
        Self {
            port: 3000,
            apollo_api_key: None,
            apollo_base_url: "https://api.apollo.io/v1".to_string(),
            hunter_api_key: None,
            hunter_base_url: "https://api.hunter.io/v2".to_string(),
            clearbit_api_key: None,
            clearbit_base_url: "https://api.clearbit.com".to_string(),
            request_timeout_secs: 10,
            contact_discovery_delay_ms: 300,
            rate_limit_backoff_ms: 2000,
        }
    }
}
