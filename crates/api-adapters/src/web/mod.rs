//! # Axum web adapter
//!
//! Routes, shared state and the middleware stack. Entity routes live under
//! `/api/v1` behind [`extract::require_auth`]; account, health and metrics
//! routes are public.

pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use services::{AccountService, AdService, ProposalService};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::HttpMetrics;
use handlers::{accounts, ads, health, proposals};

#[derive(Clone)]
pub struct AppState {
    pub ads: Arc<AdService>,
    pub proposals: Arc<ProposalService>,
    pub accounts: Arc<AccountService>,
    pub page_size: u32,
    pub metrics: Arc<HttpMetrics>,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/ads", get(ads::list).post(ads::create))
        .route(
            "/ads/{id}",
            get(ads::retrieve)
                .put(ads::replace)
                .patch(ads::patch)
                .delete(ads::destroy),
        )
        .route("/proposals", get(proposals::list).post(proposals::create))
        .route(
            "/proposals/{id}",
            get(proposals::retrieve)
                .put(proposals::update_status)
                .patch(proposals::update_status)
                .delete(proposals::destroy),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            extract::require_auth,
        ));

    let api = Router::new()
        .route("/auth/register", post(accounts::register))
        .route("/auth/token", post(accounts::token))
        .merge(protected);

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/metrics", get(health::metrics))
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

/// Records count and latency per matched route template, so `/ads/1` and
/// `/ads/2` share one series.
async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_owned(), |path| path.as_str().to_owned());
    let method = request.method().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    state.metrics.observe(
        method.as_str(),
        &route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
