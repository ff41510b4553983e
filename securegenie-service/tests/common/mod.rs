//! Shared setup for securegenie-service integration tests.
//!
//! Routers are driven in-process with `tower::ServiceExt::oneshot` and a
//! mock text provider, so no network access or API key is needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use securegenie_service::{
    build_router,
    config::{AnthropicConfig, Environment, GenieConfig, RateLimitConfig, SecurityConfig},
    services::providers::mock::{MockBehavior, MockTextProvider},
    AppState,
};
use service_core::config as core_config;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::net::SocketAddr;
use std::sync::Arc;

pub const TEST_ORIGIN: &str = "http://localhost:3000";
pub const TEST_CLIENT_IP: &str = "203.0.113.7";

pub fn test_config() -> GenieConfig {
    GenieConfig {
        common: core_config::Config {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "securegenie-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        anthropic: AnthropicConfig {
            api_key: "test-api-key".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            timeout_seconds: 5,
        },
        security: SecurityConfig {
            allowed_origins: vec![TEST_ORIGIN.to_string(), "https://*.vercel.app".to_string()],
            body_limit_bytes: 10 * 1024 * 1024,
        },
        rate_limit: RateLimitConfig {
            max_requests: 10,
            window_seconds: 3600,
            trust_forwarded_for: false,
            purge_interval_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockTextProvider>,
}

impl TestApp {
    pub fn new(behavior: MockBehavior) -> Self {
        Self::with_config(test_config(), behavior)
    }

    pub fn with_config(config: GenieConfig, behavior: MockBehavior) -> Self {
        let provider = Arc::new(MockTextProvider::new(behavior));
        let rate_limiter = create_ip_rate_limiter(
            config.rate_limit.max_requests,
            config.rate_limit.window_seconds,
            config.rate_limit.trust_forwarded_for,
        );

        let state = AppState {
            config,
            text_provider: provider.clone(),
            rate_limiter,
        };

        Self {
            router: build_router(state),
            provider,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::util::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    post_json_from(uri, body, TEST_CLIENT_IP)
}

/// Socket peer as `into_make_service_with_connect_info` would record it.
pub fn peer(client_ip: &str) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::new(client_ip.parse().unwrap(), 51234))
}

pub fn post_json_from(uri: &str, body: &str, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .extension(peer(client_ip))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .extension(peer(TEST_CLIENT_IP))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

pub const ACME_POLICY: &str = r#"{
    "companyName": "Acme",
    "industry": "technology",
    "size": "11-50",
    "specificRequirements": ""
}"#;

pub const COMPLIANCE_BODY: &str = r#"{
    "framework": "HIPAA",
    "currentSetup": "Cloud EHR, shared admin accounts",
    "industry": "healthcare"
}"#;

pub const QUESTIONNAIRE_BODY: &str = r#"{
    "questionnaire": "1. Do you enforce MFA?\n2. How often are backups tested?",
    "companyInfo": "Acme Corp, 40 staff, Google Workspace with MFA"
}"#;
