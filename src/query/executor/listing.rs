use super::{cancellable, QueryExecutor, QueryParams};
use crate::cache::TtlCached;
use crate::client::models::Compartment;
use crate::config::PAGE_CAP;
use crate::error::{OciLogsError, Result};
use crate::registry::ResolvedTenancy;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

/// Name of the synthetic entry standing for the tenancy root compartment.
pub const ROOT_COMPARTMENT: &str = "root compartment";

impl QueryExecutor {
    /// Active compartments under the tenancy root as name -> id, root first.
    pub(crate) async fn compartments(
        &self,
        tenancy: &ResolvedTenancy,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<IndexMap<String, String>> {
        let root = root_compartment(tenancy, params);
        let region = tenancy.region(&params.region);
        let cached: TtlCached<IndexMap<String, String>> = TtlCached::new(
            &self.cache,
            format!("compartments/{}/{}/{}", tenancy.key, region, root),
            self.ttl,
        );
        cached
            .get(|| list_compartments(tenancy, region, root, cancel))
            .await
    }

    /// Names of the regions the tenancy subscribes to.
    pub(crate) async fn regions(
        &self,
        tenancy: &ResolvedTenancy,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let root = root_compartment(tenancy, params);
        let region = tenancy.region(&params.region);
        let cached: TtlCached<Vec<String>> = TtlCached::new(
            &self.cache,
            format!("regions/{}/{}", tenancy.key, root),
            self.ttl,
        );
        cached
            .get(|| async move {
                let subscriptions = cancellable(
                    "ListRegionSubscriptions",
                    cancel,
                    tenancy.identity.list_region_subscriptions(region, root),
                )
                .await?;
                Ok(subscriptions.into_iter().map(|s| s.region_name).collect())
            })
            .await
    }
}

fn root_compartment<'a>(tenancy: &'a ResolvedTenancy, params: &'a QueryParams) -> &'a str {
    if params.tenancy_ocid.is_empty() {
        &tenancy.tenancy_ocid
    } else {
        &params.tenancy_ocid
    }
}

async fn list_compartments(
    tenancy: &ResolvedTenancy,
    region: &str,
    root: &str,
    cancel: &CancellationToken,
) -> Result<IndexMap<String, String>> {
    let mut compartments = IndexMap::new();
    compartments.insert(ROOT_COMPARTMENT.to_string(), root.to_string());

    let mut page: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let fetched = cancellable(
            "ListCompartments",
            cancel,
            tenancy
                .identity
                .list_compartments(region, root, page.as_deref()),
        )
        .await?;
        pages += 1;

        let total = fetched.items.len();
        let active: Vec<Compartment> = fetched
            .items
            .into_iter()
            .filter(Compartment::is_active)
            .collect();
        tracing::debug!(page = pages, total, active = active.len(), "Compartment page fetched");
        for compartment in active {
            compartments.insert(compartment.name, compartment.id);
        }

        match fetched.next_page {
            None => break,
            Some(_) if pages >= PAGE_CAP => {
                let truncated = OciLogsError::PaginationTruncated {
                    operation: "ListCompartments".to_string(),
                    pages,
                };
                tracing::warn!(tenancy = %tenancy.key, "{}", truncated);
                break;
            }
            Some(next) => page = Some(next),
        }
    }

    Ok(compartments)
}
