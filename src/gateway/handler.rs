use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::GatewayError;
use super::state::HandlerState;
use super::{STATUS_ACCEPTED, STATUS_HEADER};
use crate::events::PublishError;
use crate::search::SimilarityResult;
use crate::vectordb::EmbeddingStore;

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResponse {
    pub submission_id: String,
    pub results: Vec<SimilarityResult>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

/// Push ingress for the bus: the body is enqueued as-is and decoded by the consumer.
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn ingest_event_handler<V>(
    State(state): State<HandlerState<V>>,
    body: Bytes,
) -> Result<Response, GatewayError>
where
    V: EmbeddingStore + 'static,
{
    if body.is_empty() {
        return Err(GatewayError::InvalidRequest("empty event body".to_string()));
    }

    state
        .publisher
        .publish(body.to_vec())
        .await
        .map_err(|PublishError::Closed| GatewayError::ShuttingDown)?;
    debug!("Event enqueued");

    let mut headers = HeaderMap::new();
    headers.insert(STATUS_HEADER, HeaderValue::from_static(STATUS_ACCEPTED));
    Ok((
        StatusCode::ACCEPTED,
        headers,
        Json(AcceptedResponse { status: "accepted" }),
    )
        .into_response())
}

#[instrument(skip(state))]
pub async fn similar_submissions_handler<V>(
    State(state): State<HandlerState<V>>,
    Path((tenant_id, submission_id)): Path<(String, String)>,
    Query(query): Query<SimilarQuery>,
) -> Result<Json<SimilarResponse>, GatewayError>
where
    V: EmbeddingStore + 'static,
{
    let results = state
        .search
        .get_similar_submissions(&submission_id, &tenant_id, query.top_k)
        .await?;

    Ok(Json(SimilarResponse {
        submission_id,
        results,
    }))
}
