//! One configured datasource instance: registry, shared cache and executor.

use crate::cache::ResultCache;
use crate::config::DatasourceConfig;
use crate::error::{OciLogsError, Result};
use crate::query::{bucket_count, framer, QueryExecutor, QueryParams};
use crate::registry::ClientRegistry;
use crate::settings::RawSettings;
use crate::types::{HealthStatus, QueryRequest, QueryType, RawResultSet, ResultSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one request of a batch, keyed by its `refId`.
#[derive(Debug)]
pub struct QueryOutcome {
    pub ref_id: String,
    pub result: Result<ResultSet>,
}

pub struct Datasource {
    executor: QueryExecutor,
    config: DatasourceConfig,
}

impl Datasource {
    /// Resolve every tenancy in `settings` and set up the shared cache.
    ///
    /// Fails without a partial instance if any tenancy cannot be resolved.
    pub async fn new(settings: &RawSettings, config: DatasourceConfig) -> Result<Self> {
        let registry = ClientRegistry::resolve(
            &settings.environment(),
            &settings.tenancy_mode(),
            settings,
            &config,
        )
        .await?;
        let cache = ResultCache::new(config.cache_max_cost);
        let executor = QueryExecutor::new(Arc::new(registry), cache, config.refresh_interval);
        Ok(Self { executor, config })
    }

    pub fn registry(&self) -> &ClientRegistry {
        self.executor.registry()
    }

    pub fn config(&self) -> &DatasourceConfig {
        &self.config
    }

    /// Execute one request and shape its result.
    pub async fn query(&self, req: &QueryRequest, cancel: &CancellationToken) -> Result<ResultSet> {
        let params = QueryParams::from(req);
        let raw = self
            .executor
            .execute(&req.tenancy, req.query_type, &params, &req.time_range, cancel)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    ref_id = %req.ref_id,
                    query_type = req.query_type.as_str(),
                    error = %e,
                    "Query failed"
                );
            })?;

        Ok(match raw {
            RawResultSet::Records(records) => ResultSet::Frame(framer::frame(
                &req.ref_id,
                &records,
                &req.time_range,
                bucket_count(req.max_data_points),
            )),
            RawResultSet::Compartments(compartments) => {
                framer::compartment_table(&req.ref_id, &compartments)
            }
            RawResultSet::Regions(names) | RawResultSet::Tenancies(names) => {
                framer::name_table(&req.ref_id, &names)
            }
            RawResultSet::Health(status) => framer::health_table(&req.ref_id, &status),
        })
    }

    /// Execute a batch concurrently, one task per request. Outcomes come back
    /// in request order; a failing request never affects its siblings.
    pub async fn query_batch(
        self: &Arc<Self>,
        requests: Vec<QueryRequest>,
        cancel: &CancellationToken,
    ) -> Vec<QueryOutcome> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|req| {
                let datasource = Arc::clone(self);
                let token = cancel.child_token();
                let ref_id = req.ref_id.clone();
                let handle = tokio::spawn(async move { datasource.query(&req, &token).await });
                (ref_id, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (ref_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(OciLogsError::Cancelled(ref_id.clone())),
                Err(e) => Err(OciLogsError::remote("Query", ref_id.clone(), e)),
            };
            outcomes.push(QueryOutcome { ref_id, result });
        }
        outcomes
    }

    /// Connectivity check against every resolved tenancy.
    pub async fn check_health(&self, cancel: &CancellationToken) -> HealthStatus {
        let registry = self.registry();
        for key in registry.keys() {
            let result = self
                .executor
                .execute(
                    &key,
                    QueryType::Test,
                    &QueryParams::default(),
                    &Default::default(),
                    cancel,
                )
                .await;
            if let Err(e) = result {
                tracing::warn!(tenancy = %key, error = %e, "Health check failed");
                return HealthStatus::error(format!("{}: {}", key, e));
            }
        }
        HealthStatus::ok(format!(
            "Success: {} tenancies reachable",
            registry.len()
        ))
    }
}
