use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::AppState;
use crate::dto::{QueryBatchRequest, QueryBatchResponse, QueryResultDto};

/// Run a batch of queries concurrently. Every query gets its own entry in
/// the response, in request order.
///
/// Dropping the request (client disconnect) cancels every query in flight.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryBatchRequest>,
) -> Json<QueryBatchResponse> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let start = Instant::now();
    let count = body.queries.len();

    let outcomes = state.datasource.query_batch(body.queries, &cancel).await;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    tracing::info!(
        queries = count,
        failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Query batch complete"
    );

    Json(QueryBatchResponse {
        results: outcomes.into_iter().map(QueryResultDto::from).collect(),
    })
}
