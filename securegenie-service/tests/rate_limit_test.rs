mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use common::{
    body_json, get, peer, post_json_from, test_config, TestApp, ACME_POLICY, TEST_CLIENT_IP,
};
use securegenie_service::services::providers::mock::MockBehavior;

#[tokio::test]
async fn eleventh_request_in_the_window_is_429() {
    let app = TestApp::new(MockBehavior::Text("generated".to_string()));

    for i in 0..10 {
        let response = app
            .send(post_json_from("/api/generate-policy", ACME_POLICY, TEST_CLIENT_IP))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "request {} rejected", i + 1);
        assert_eq!(response.headers()["ratelimit-limit"], "10");
        assert_eq!(
            response.headers()["ratelimit-remaining"],
            (9 - i).to_string().as_str()
        );
    }

    let response = app
        .send(post_json_from("/api/generate-policy", ACME_POLICY, TEST_CLIENT_IP))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    assert_eq!(response.headers()["ratelimit-remaining"], "0");

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Too many requests from this IP. Please try again later."
    );
    assert_eq!(body["retryAfter"], "1 hour");

    // The limited request never reached the model
    assert_eq!(app.provider.call_count(), 10);
}

#[tokio::test]
async fn budget_is_shared_across_endpoints() {
    let app = TestApp::new(MockBehavior::Text("generated".to_string()));
    let compliance = r#"{"framework": "SOC 2", "currentSetup": "none", "industry": "saas"}"#;

    for _ in 0..5 {
        let response = app
            .send(post_json_from("/api/generate-policy", ACME_POLICY, TEST_CLIENT_IP))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = app
            .send(post_json_from("/api/analyze-compliance", compliance, TEST_CLIENT_IP))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .send(post_json_from(
            "/api/fill-questionnaire",
            r#"{"questionnaire": "q", "companyInfo": "c"}"#,
            TEST_CLIENT_IP,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn other_clients_keep_their_own_budget() {
    let app = TestApp::new(MockBehavior::Text("generated".to_string()));

    for _ in 0..11 {
        app.send(post_json_from("/api/generate-policy", ACME_POLICY, "198.51.100.1"))
            .await;
    }

    let response = app
        .send(post_json_from("/api/generate-policy", ACME_POLICY, "198.51.100.2"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_validation_still_consumes_budget() {
    let app = TestApp::new(MockBehavior::Text("generated".to_string()));

    for _ in 0..10 {
        let response = app
            .send(post_json_from("/api/generate-policy", "{}", TEST_CLIENT_IP))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let response = app
        .send(post_json_from("/api/generate-policy", ACME_POLICY, TEST_CLIENT_IP))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn health_is_not_rate_limited() {
    let app = TestApp::new(MockBehavior::Text("generated".to_string()));

    for _ in 0..11 {
        app.send(post_json_from("/api/generate-policy", ACME_POLICY, TEST_CLIENT_IP))
            .await;
    }

    for _ in 0..20 {
        let response = app.send(get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("ratelimit-limit"));
    }
}

#[tokio::test]
async fn concurrent_burst_admits_exactly_the_quota() {
    let app = TestApp::new(MockBehavior::Text("generated".to_string()));

    let requests = (0..25).map(|_| {
        app.send(post_json_from("/api/generate-policy", ACME_POLICY, TEST_CLIENT_IP))
    });
    let responses = futures::future::join_all(requests).await;

    let accepted = responses
        .iter()
        .filter(|r| r.status() == StatusCode::OK)
        .count();
    let limited = responses
        .iter()
        .filter(|r| r.status() == StatusCode::TOO_MANY_REQUESTS)
        .count();

    assert_eq!(accepted, 10);
    assert_eq!(limited, 15);
    assert_eq!(app.provider.call_count(), 10);
}

fn spoofed_post(forwarded_for: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate-policy")
        .header("content-type", "application/json")
        .header("x-forwarded-for", forwarded_for)
        .extension(peer(TEST_CLIENT_IP))
        .body(Body::from(ACME_POLICY))
        .unwrap()
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_reset_the_budget() {
    let app = TestApp::new(MockBehavior::Text("generated".to_string()));

    for i in 0..10 {
        let response = app.send(spoofed_post(&format!("10.0.0.{}", i))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.send(spoofed_post("10.0.0.99")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.provider.call_count(), 10);
}

#[tokio::test]
async fn forwarded_for_is_the_key_when_proxy_is_trusted() {
    let mut config = test_config();
    config.rate_limit.trust_forwarded_for = true;
    let app = TestApp::with_config(config, MockBehavior::Text("generated".to_string()));

    for _ in 0..10 {
        let response = app.send(spoofed_post("198.51.100.20")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(
        app.send(spoofed_post("198.51.100.20")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // Same socket peer, different forwarded client
    let response = app.send(spoofed_post("198.51.100.21")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
