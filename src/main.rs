use axum::{
    routing::{get, post},
    Router,
};
use leadgrid_api::config::Config;
use leadgrid_api::fallback::ContactDiscovery;
use leadgrid_api::handlers::{self, AppState};
use leadgrid_api::registry::ServiceRegistry;
use leadgrid_api::services::{ApolloService, ClearbitService, HunterService};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the provider registry, caches and the
/// HTTP routes with their middleware stack, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadgrid_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Register providers. Registration order is priority order.
    let mut registry = ServiceRegistry::new();
    registry.register(Arc::new(ApolloService::new(&config)));
    registry.register(Arc::new(HunterService::new(&config)));
    registry.register(Arc::new(ClearbitService::new(&config)));
    let registry = Arc::new(registry);

    // Take an initial availability snapshot so the first sources listing is
    // warm and quota latches start from live state.
    let sources = registry.refresh_sources().await;
    let enabled: Vec<&str> = sources
        .iter()
        .filter(|s| s.enabled)
        .map(|s| s.id.as_str())
        .collect();
    tracing::info!(
        "{} of {} provider(s) available at startup: {:?}",
        enabled.len(),
        sources.len(),
        enabled
    );

    // Email verification cache (24 hour TTL, 50k max entries)
    let verify_cache = Cache::builder()
        .time_to_live(Duration::from_secs(86400))
        .max_capacity(50_000)
        .build();
    tracing::info!("Email verification cache initialized");

    let discovery = Arc::new(ContactDiscovery::new(registry.clone(), &config));

    let app_state = AppState {
        registry,
        discovery,
        verify_cache,
    };

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/sources", get(handlers::list_sources))
        .route("/api/v1/leads/search", post(handlers::search_leads))
        .route("/api/v1/leads/enrich", post(handlers::enrich_lead))
        .route(
            "/api/v1/leads/discover-contacts",
            post(handlers::discover_contacts),
        )
        .route("/api/v1/emails/verify", post(handlers::verify_email))
        .route("/api/v1/emails/find", post(handlers::find_email))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
