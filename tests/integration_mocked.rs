/// Integration tests with mocked external APIs
/// Exercises the provider adapters end to end without hitting real services
use leadgrid_api::config::Config;
use leadgrid_api::models::*;
use leadgrid_api::services::{ApolloService, ClearbitService, HunterService, LeadProvider};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config with every provider pointed at the
/// given mock server.
fn create_test_config(base_url: String) -> Config {
    let mut config = Config::for_tests();
    config.apollo_api_key = Some("test_apollo_key".to_string());
    config.apollo_base_url = base_url.clone();
    config.hunter_api_key = Some("test_hunter_key".to_string());
    config.hunter_base_url = base_url.clone();
    config.clearbit_api_key = Some("test_clearbit_key".to_string());
    config.clearbit_base_url = base_url;
    config
}

// ============ Apollo ============

#[tokio::test]
async fn apollo_search_normalizes_people() {
    let mock_server = MockServer::start().await;

    let mock_response = json!({
        "people": [
            {
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@analytical.engineering",
                "email_status": "verified",
                "title": "Chief Engineer",
                "linkedin_url": "https://linkedin.com/in/ada",
                "phone_numbers": [{"raw_number": "5551234567"}],
                "organization": {
                    "name": "Analytical Engines",
                    "primary_domain": "https://www.analytical.engineering",
                    "industry": "Computing",
                    "estimated_num_employees": 42,
                    "country": "United Kingdom"
                },
                "employment_history": [
                    {"organization_name": "Babbage & Co", "title": "Analyst", "start_date": "1833", "end_date": "1842"}
                ]
            },
            {
                "name": "Alan Mathison Turing",
                "title": "Researcher"
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .and(header("X-Api-Key", "test_apollo_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ApolloService::new(&config);

    let filters = SearchFilters {
        title: Some("Engineer".to_string()),
        ..SearchFilters::default()
    };
    let result = service.search(&filters, 25).await;

    assert!(result.metadata.error.is_none());
    assert_eq!(result.metadata.total, 2);
    assert_eq!(result.metadata.filters_applied, vec!["title"]);

    let ada = &result.leads[0];
    assert_eq!(ada.first_name, "Ada");
    assert_eq!(ada.email.as_deref(), Some("ada@analytical.engineering"));
    assert_eq!(ada.phone.as_deref(), Some("(555) 123-4567"));
    assert_eq!(ada.company, "Analytical Engines");
    assert_eq!(ada.company_domain, "analytical.engineering");
    assert_eq!(ada.company_info.size, "42");
    assert_eq!(ada.status, LeadStatus::Verified);
    assert_eq!(ada.profile_info.past_roles.len(), 1);
    assert_eq!(ada.profile_info.past_roles[0].duration, "1833 - 1842");

    // Full-name split: middle token dropped.
    let alan = &result.leads[1];
    assert_eq!(alan.first_name, "Alan");
    assert_eq!(alan.last_name, "Turing");
    assert_eq!(alan.email, None);
    assert_eq!(alan.status, LeadStatus::Unverified);
}

#[tokio::test]
async fn apollo_404_is_success_with_zero_leads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ApolloService::new(&config);
    let result = service.search(&SearchFilters::default(), 25).await;

    assert!(result.metadata.error.is_none());
    assert_eq!(result.metadata.total, 0);
    assert!(result.leads.is_empty());
}

#[tokio::test]
async fn apollo_server_error_becomes_metadata() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ApolloService::new(&config);
    let result = service.search(&SearchFilters::default(), 25).await;

    let error = result.metadata.error.expect("error recorded");
    assert!(error.contains("500"));
    assert!(!result.metadata.usage_limit_reached);
}

#[tokio::test]
async fn apollo_payment_required_flags_usage_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(
            ResponseTemplate::new(402)
                .set_body_json(json!({"error": "Payment required, upgrade your plan"})),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ApolloService::new(&config);
    let result = service.search(&SearchFilters::default(), 25).await;

    assert!(result.metadata.usage_limit_reached);
    assert!(result.metadata.error.is_some());
    assert!(result.leads.is_empty());
}

#[tokio::test]
async fn apollo_rate_limit_is_a_transient_error_not_a_ceiling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string("Rate limit reached, retry in 60 seconds"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ApolloService::new(&config);
    let result = service.search(&SearchFilters::default(), 25).await;

    // Transient backpressure must not latch the provider out of fan-outs.
    assert!(!result.metadata.usage_limit_reached);
    assert!(result.metadata.error.is_some());
}

#[tokio::test]
async fn apollo_ceiling_message_on_403_flags_usage_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({"error": {"type": "usage_limit", "message": "Insufficient credits"}}),
        ))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ApolloService::new(&config);
    let result = service.search(&SearchFilters::default(), 25).await;

    assert!(result.metadata.usage_limit_reached);
}

#[tokio::test]
async fn apollo_enrich_records_found_fields() {
    let mock_server = MockServer::start().await;

    let mock_response = json!({
        "person": {
            "email": "ada@analytical.engineering",
            "title": "Chief Engineer",
            "linkedin_url": "https://linkedin.com/in/ada",
            "organization": {
                "name": "Analytical Engines",
                "primary_domain": "analytical.engineering"
            }
        }
    });

    Mock::given(method("POST"))
        .and(path("/people/match"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ApolloService::new(&config);

    let lead = Lead {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: Some("ada@analytical.engineering".to_string()),
        ..Lead::default()
    };
    let result = service.enrich(&lead).await;

    assert!(result.confidence > 0.8);
    assert!(result.fields_enriched.contains(&"position".to_string()));
    assert_eq!(
        result.enriched_data.get("company").and_then(|v| v.as_str()),
        Some("Analytical Engines")
    );
}

#[tokio::test]
async fn apollo_unconfigured_search_reports_missing_key() {
    let config = Config::for_tests();
    let service = ApolloService::new(&config);

    let result = service.search(&SearchFilters::default(), 25).await;
    let error = result.metadata.error.expect("error recorded");
    assert!(error.contains("APOLLO_API_KEY"));

    let status = service.get_status().await;
    assert!(!status.available);
}

// ============ Hunter ============

#[tokio::test]
async fn hunter_verify_maps_result_and_score() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/email-verifier"))
        .and(query_param("email", "ada@analytical.engineering"))
        .and(query_param("api_key", "test_hunter_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"result": "deliverable", "score": 92}
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = HunterService::new(&config);
    let verification = service.verify_email("ada@analytical.engineering").await;

    assert!(verification.is_valid);
    assert_eq!(verification.status, "deliverable");
    assert!((verification.score - 0.92).abs() < 1e-9);
}

#[tokio::test]
async fn hunter_finder_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/email-finder"))
        .and(query_param("domain", "analytical.engineering"))
        .and(query_param("first_name", "Ada"))
        .and(query_param("last_name", "Lovelace"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "email": "ada@analytical.engineering",
                "score": 97,
                "verification": {"status": "valid"}
            }
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = HunterService::new(&config);
    let result = service
        .find_email("Ada", "Lovelace", "analytical.engineering")
        .await;

    assert_eq!(result.email.as_deref(), Some("ada@analytical.engineering"));
    assert_eq!(result.status, "found");
    assert!(result.verified);
}

#[tokio::test]
async fn hunter_finder_403_is_access_denied_not_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/email-finder"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = HunterService::new(&config);
    let result = service.find_email("Ada", "Lovelace", "example.com").await;

    assert_eq!(result.email, None);
    assert_eq!(result.status, "access_denied");
}

#[tokio::test]
async fn hunter_finder_429_is_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/email-finder"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = HunterService::new(&config);
    let result = service.find_email("Ada", "Lovelace", "example.com").await;

    assert_eq!(result.email, None);
    assert_eq!(result.status, "rate_limited");
}

#[tokio::test]
async fn hunter_status_reports_remaining_quota() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"requests": {"searches": {"used": 30, "available": 100}}}
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = HunterService::new(&config);
    let status = service.get_status().await;

    assert!(status.available);
    assert_eq!(status.quota_remaining, Some(70));
}

// ============ Clearbit ============

#[tokio::test]
async fn clearbit_enrich_404_is_empty_not_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ClearbitService::new(&config);

    let lead = Lead {
        email: Some("nobody@example.com".to_string()),
        ..Lead::default()
    };
    let result = service.enrich(&lead).await;

    assert_eq!(result.confidence, 0.0);
    assert!(result.fields_enriched.is_empty());
}

#[tokio::test]
async fn clearbit_enrich_records_person_and_company() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/combined/find"))
        .and(query_param("email", "ada@analytical.engineering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "person": {
                "bio": "Pioneer of computing",
                "employment": {"title": "Chief Engineer"},
                "linkedin": {"handle": "in/ada"}
            },
            "company": {
                "name": "Analytical Engines",
                "domain": "analytical.engineering",
                "category": {"industry": "Computing"},
                "metrics": {"employees": 42},
                "geo": {"country": "United Kingdom"}
            }
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ClearbitService::new(&config);

    let lead = Lead {
        email: Some("ada@analytical.engineering".to_string()),
        ..Lead::default()
    };
    let result = service.enrich(&lead).await;

    assert!((result.confidence - 0.8).abs() < 1e-9);
    assert_eq!(
        result.enriched_data.get("position").and_then(|v| v.as_str()),
        Some("Chief Engineer")
    );
    assert_eq!(
        result
            .enriched_data
            .get("company_industry")
            .and_then(|v| v.as_str()),
        Some("Computing")
    );
    assert_eq!(
        result
            .enriched_data
            .get("company_size")
            .and_then(|v| v.as_str()),
        Some("42")
    );
}

#[tokio::test]
async fn clearbit_company_fallback_without_email() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/companies/find"))
        .and(query_param("domain", "analytical.engineering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Analytical Engines",
            "domain": "analytical.engineering",
            "metrics": {"employees": 42}
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ClearbitService::new(&config);

    let lead = Lead {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        company_domain: "analytical.engineering".to_string(),
        ..Lead::default()
    };
    let result = service.enrich(&lead).await;

    assert!((result.confidence - 0.7).abs() < 1e-9);
    assert_eq!(
        result.enriched_data.get("company").and_then(|v| v.as_str()),
        Some("Analytical Engines")
    );
}

#[tokio::test]
async fn clearbit_unreachable_upstream_is_empty_unlike_404() {
    // Nothing listens on this port: a transport error, not a 404.
    let config = create_test_config("http://127.0.0.1:9".to_string());
    let service = ClearbitService::new(&config);

    let lead = Lead {
        email: Some("ada@analytical.engineering".to_string()),
        ..Lead::default()
    };
    let result = service.enrich(&lead).await;
    assert_eq!(result.confidence, 0.0);

    let status = service.get_status().await;
    assert!(!status.available);
    assert!(status.error.is_some());
}

#[tokio::test]
async fn clearbit_status_treats_404_as_reachable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/companies/find"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ClearbitService::new(&config);
    let status = service.get_status().await;

    assert!(status.available);
}

#[tokio::test]
async fn clearbit_search_without_domain_returns_nothing() {
    let config = create_test_config("http://127.0.0.1:1".to_string());
    let service = ClearbitService::new(&config);

    // No domain filter: the adapter answers locally, no request made.
    let filters = SearchFilters {
        title: Some("Engineer".to_string()),
        ..SearchFilters::default()
    };
    let result = service.search(&filters, 25).await;

    assert!(result.metadata.error.is_none());
    assert_eq!(result.metadata.total, 0);
}

#[tokio::test]
async fn clearbit_prospects_by_domain() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/people/search"))
        .and(query_param("domain", "analytical.engineering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "name": {"givenName": "Ada", "familyName": "Lovelace"},
                    "email": "ada@analytical.engineering",
                    "title": "Chief Engineer"
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = ClearbitService::new(&config);

    let filters = SearchFilters {
        domain: Some("analytical.engineering".to_string()),
        ..SearchFilters::default()
    };
    let result = service.search(&filters, 25).await;

    assert_eq!(result.metadata.total, 1);
    assert_eq!(result.leads[0].first_name, "Ada");
    assert_eq!(result.leads[0].company_domain, "analytical.engineering");
    assert!(result.metadata.filters_applied.contains(&"domain".to_string()));
}
