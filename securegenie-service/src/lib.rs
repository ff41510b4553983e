pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_from_headers, request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{origin_matches, GenieConfig};
use crate::handlers::fallback::{method_not_allowed, not_found};
use crate::handlers::generation::generate;
use crate::models::{ComplianceRequest, PolicyRequest, QuestionnaireRequest};
use crate::services::providers::TextProvider;
use crate::services::PromptTemplate;

#[derive(Clone)]
pub struct AppState {
    pub config: GenieConfig,
    pub text_provider: Arc<dyn TextProvider>,
    pub rate_limiter: IpRateLimiter,
}

/// Mount the generation handler for request type `T` at its operation's path.
fn generation_route<T>(router: Router<AppState>) -> Router<AppState>
where
    T: PromptTemplate + serde::de::DeserializeOwned + validator::Validate + Send + 'static,
{
    let path = T::OPERATION.spec().path;
    router.route(path, post(generate::<T>).fallback(method_not_allowed))
}

pub fn build_router(state: AppState) -> Router {
    // Generation endpoints, rate limited per client IP
    let api_routes = Router::new();
    let api_routes = generation_route::<PolicyRequest>(api_routes);
    let api_routes = generation_route::<ComplianceRequest>(api_routes);
    let api_routes = generation_route::<QuestionnaireRequest>(api_routes);
    let api_routes = api_routes.layer(from_fn_with_state(
        state.rate_limiter.clone(),
        ip_rate_limit_middleware,
    ));

    Router::new()
        .route(
            "/health",
            get(handlers::health::health_check).fallback(method_not_allowed),
        )
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api", api_routes)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(state.config.security.body_limit_bytes))
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id_from_headers(request.headers()),
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
        // Add CORS layer
        .layer(cors_layer(&state.config.security.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let patterns: Arc<Vec<String>> = Arc::new(allowed_origins.to_vec());
    if patterns.is_empty() {
        tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request| {
                origin
                    .to_str()
                    .map(|origin| patterns.iter().any(|p| origin_matches(p, origin)))
                    .unwrap_or(false)
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            header::RETRY_AFTER,
        ])
}
