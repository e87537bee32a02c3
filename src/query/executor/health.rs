use super::{cancellable, QueryExecutor, QueryParams};
use crate::error::{OciLogsError, Result};
use crate::registry::ResolvedTenancy;
use crate::types::HealthStatus;
use tokio_util::sync::CancellationToken;

impl QueryExecutor {
    /// Probe the logging management service with a one-item log group
    /// listing scoped to the tenancy root.
    pub(crate) async fn test_connectivity(
        &self,
        tenancy: &ResolvedTenancy,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HealthStatus> {
        let region = tenancy.region(&params.region);
        let probe = cancellable(
            "ListLogGroups",
            cancel,
            tenancy
                .management
                .list_log_groups(region, &tenancy.tenancy_ocid, 1),
        )
        .await;

        match probe {
            Ok(probe) if probe.is_success() => Ok(HealthStatus::ok(format!(
                "Success: tenancy {} reachable in {}",
                tenancy.key, region
            ))),
            Ok(probe) => Err(OciLogsError::Connectivity {
                status: probe.status,
                body: probe.body,
            }),
            Err(OciLogsError::Cancelled(op)) => Err(OciLogsError::Cancelled(op)),
            Err(e) => Err(OciLogsError::Connectivity {
                status: 0,
                body: e.to_string(),
            }),
        }
    }
}
