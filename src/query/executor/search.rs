use super::{cancellable, QueryExecutor, QueryParams};
use crate::client::models::SearchLogsDetails;
use crate::config::SEARCH_PAGE_LIMIT;
use crate::error::Result;
use crate::registry::ResolvedTenancy;
use crate::types::TimeRange;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl QueryExecutor {
    /// One page of log search results for the request window.
    pub(crate) async fn search_logs(
        &self,
        tenancy: &ResolvedTenancy,
        params: &QueryParams,
        time_range: &TimeRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<serde_json::Value>> {
        let (start, end) = time_range.bounds()?;
        let details = SearchLogsDetails {
            time_start: rfc3339(start),
            time_end: rfc3339(end),
            search_query: params.search_query.clone(),
            is_return_field_info: false,
        };
        let region = tenancy.region(&params.region);

        let page = cancellable(
            "SearchLogs",
            cancel,
            tenancy.search.search_logs(region, &details, SEARCH_PAGE_LIMIT),
        )
        .await?;

        if page.next_page.is_some() {
            tracing::debug!(
                tenancy = %tenancy.key,
                returned = page.results.len(),
                "Search has further pages, returning the first only"
            );
        }
        Ok(page.results)
    }
}
