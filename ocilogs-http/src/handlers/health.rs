use axum::{extract::State, http::StatusCode, Json};
use ocilogs::HealthStatus;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::AppState;

/// Connectivity check against every configured tenancy.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthStatus>) {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let status = state.datasource.check_health(&cancel).await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
