use ocilogs::{OciLogsError, QueryOutcome, QueryRequest, ResultSet};
use serde::{Deserialize, Serialize};

/// Body of `POST /query`.
#[derive(Debug, Deserialize)]
pub struct QueryBatchRequest {
    #[serde(default)]
    pub queries: Vec<QueryRequest>,
}

#[derive(Debug, Serialize)]
pub struct QueryBatchResponse {
    pub results: Vec<QueryResultDto>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Outcome of one query, carrying either its result set or its error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultDto {
    pub ref_id: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl From<QueryOutcome> for QueryResultDto {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome.result {
            Ok(result) => Self {
                ref_id: outcome.ref_id,
                status: 200,
                result: Some(result),
                error: None,
            },
            Err(e) => Self::from_error(outcome.ref_id, &e),
        }
    }
}

impl QueryResultDto {
    pub fn from_error(ref_id: String, e: &OciLogsError) -> Self {
        Self {
            ref_id,
            status: e.status_code().as_u16(),
            result: None,
            error: Some(ErrorBody {
                error: e.code().to_string(),
                message: e.to_string(),
            }),
        }
    }
}
