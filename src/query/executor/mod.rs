use crate::cache::ResultCache;
use crate::error::{OciLogsError, Result};
use crate::registry::ClientRegistry;
use crate::types::{QueryRequest, QueryType, RawResultSet, TimeRange};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod health;
mod listing;
mod search;

pub use listing::ROOT_COMPARTMENT;

/// Per-request parameters the executor needs beyond the query type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Target region; empty means the tenancy's own region.
    pub region: String,
    /// Root compartment for listings; empty means the tenancy itself.
    pub tenancy_ocid: String,
    pub search_query: String,
}

impl From<&QueryRequest> for QueryParams {
    fn from(req: &QueryRequest) -> Self {
        Self {
            region: req.region.clone(),
            tenancy_ocid: req.tenancy_ocid.clone(),
            search_query: req.search_query.clone(),
        }
    }
}

/// Dispatches queries to the remote services of the addressed tenancy.
pub struct QueryExecutor {
    pub(crate) registry: Arc<ClientRegistry>,
    pub(crate) cache: ResultCache,
    pub(crate) ttl: Duration,
}

impl QueryExecutor {
    pub fn new(registry: Arc<ClientRegistry>, cache: ResultCache, ttl: Duration) -> Self {
        QueryExecutor {
            registry,
            cache,
            ttl,
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub async fn execute(
        &self,
        tenancy_key: &str,
        query_type: QueryType,
        params: &QueryParams,
        time_range: &TimeRange,
        cancel: &CancellationToken,
    ) -> Result<RawResultSet> {
        if query_type == QueryType::Tenancies {
            return Ok(RawResultSet::Tenancies(self.registry.keys()));
        }

        let tenancy = self.registry.select(tenancy_key)?;
        tracing::debug!(
            tenancy = %tenancy.key,
            query_type = query_type.as_str(),
            region = %tenancy.region(&params.region),
            "Executing query"
        );

        match query_type {
            QueryType::Compartments => self
                .compartments(&tenancy, params, cancel)
                .await
                .map(RawResultSet::Compartments),
            QueryType::Regions => self
                .regions(&tenancy, params, cancel)
                .await
                .map(RawResultSet::Regions),
            QueryType::Test => self
                .test_connectivity(&tenancy, params, cancel)
                .await
                .map(RawResultSet::Health),
            QueryType::SearchLogs => self
                .search_logs(&tenancy, params, time_range, cancel)
                .await
                .map(RawResultSet::Records),
            QueryType::Tenancies => Ok(RawResultSet::Tenancies(self.registry.keys())),
        }
    }
}

/// Run one remote call unless the request is cancelled before or while it
/// is in flight.
pub(crate) async fn cancellable<T, F>(
    operation: &str,
    cancel: &CancellationToken,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(OciLogsError::Cancelled(operation.to_string()));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OciLogsError::Cancelled(operation.to_string())),
        result = call => result,
    }
}
