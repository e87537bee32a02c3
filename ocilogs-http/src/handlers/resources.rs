use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ocilogs::{QueryRequest, QueryType, TimeRange};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::AppState;

/// Query string of `GET /resources/:resource`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceParams {
    #[serde(default)]
    pub tenancy: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, rename = "tenancyOCID")]
    pub tenancy_ocid: String,
}

fn resource_query_type(resource: &str) -> Option<QueryType> {
    match resource {
        "tenancies" => Some(QueryType::Tenancies),
        "regions" => Some(QueryType::Regions),
        "compartments" => Some(QueryType::Compartments),
        _ => None,
    }
}

/// Listing helper backing the query editor's dropdowns.
pub async fn list_resource(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Query(params): Query<ResourceParams>,
) -> Response {
    let Some(query_type) = resource_query_type(&resource) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "unknown_resource",
                "message": format!("Unknown resource '{}'", resource),
            })),
        )
            .into_response();
    };

    let request = QueryRequest {
        ref_id: resource.clone(),
        environment: String::new(),
        tenancy_mode: String::new(),
        query_type,
        region: params.region,
        tenancy_ocid: params.tenancy_ocid,
        tenancy: params.tenancy,
        search_query: String::new(),
        max_data_points: None,
        panel_id: None,
        time_range: TimeRange::default(),
    };

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    match state.datasource.query(&request, &cancel).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}
