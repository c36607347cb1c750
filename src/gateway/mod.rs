//! HTTP gateway (Axum): health, push ingress for submission events, and the similar
//! submissions read API.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{ingest_event_handler, similar_submissions_handler};
pub use state::HandlerState;

use crate::vectordb::EmbeddingStore;

pub const STATUS_HEADER: &str = "x-plagwatch-status";
pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_READY: &str = "ready";
pub const STATUS_NOT_READY: &str = "not_ready";
pub const STATUS_ACCEPTED: &str = "accepted";

pub fn create_router_with_state<V>(state: HandlerState<V>) -> Router
where
    V: EmbeddingStore + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<V>))
        .route("/v1/events", post(ingest_event_handler::<V>))
        .route(
            "/v1/tenants/{tenant_id}/submissions/{submission_id}/similar",
            get(similar_submissions_handler::<V>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub vectordb: &'static str,
    pub subscription: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(STATUS_HEADER, HeaderValue::from_static(STATUS_HEALTHY));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler<V>(State(state): State<HandlerState<V>>) -> Response
where
    V: EmbeddingStore + 'static,
{
    let vectordb = if state.search.store().is_ready().await {
        STATUS_READY
    } else {
        "pending"
    };
    let subscription = if state.publisher.is_closed() {
        "closed"
    } else {
        STATUS_READY
    };

    let components = ComponentStatus {
        http: STATUS_READY,
        vectordb,
        subscription,
    };
    let is_ready = components.vectordb == STATUS_READY && components.subscription == STATUS_READY;

    let (status_code, status_msg, header) = if is_ready {
        (StatusCode::OK, "ok", STATUS_READY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "pending", STATUS_NOT_READY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(STATUS_HEADER, HeaderValue::from_static(header));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
