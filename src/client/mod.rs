//! Thin REST clients for the logging search, logging management and identity
//! services.
//!
//! Every client is an immutable handle: the target region is passed on each
//! call, so one handle can serve requests for any region concurrently.

pub mod models;

use crate::auth::{sign_request, CredentialProvider};
use crate::error::{OciLogsError, Result};
use models::{
    Compartment, CompartmentPage, ProbeResponse, RegionSubscription, SearchLogsDetails,
    SearchPage, SearchResponse, Tenancy,
};
use std::sync::Arc;

/// Response header carrying the continuation token of a paginated listing.
pub const NEXT_PAGE_HEADER: &str = "opc-next-page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Logging,
    Identity,
    Auth,
}

/// Placeholder in an endpoint override that is replaced by the call's region.
pub const REGION_PLACEHOLDER: &str = "{region}";

/// Resolves the base URL of a service in a region.
#[derive(Debug, Clone, Default)]
pub struct ServiceEndpoints {
    override_base: Option<String>,
}

impl ServiceEndpoints {
    pub fn new(override_base: Option<String>) -> Self {
        Self {
            override_base: override_base.map(|b| b.trim_end_matches('/').to_string()),
        }
    }

    pub fn base_url(&self, service: Service, region: &str) -> Result<String> {
        if let Some(base) = &self.override_base {
            if !base.contains(REGION_PLACEHOLDER) {
                return Ok(base.clone());
            }
            validate_region(region)?;
            return Ok(base.replace(REGION_PLACEHOLDER, region));
        }
        validate_region(region)?;
        Ok(match service {
            Service::Logging => format!("https://logging.{}.oci.oraclecloud.com", region),
            Service::Identity => format!("https://identity.{}.oci.oraclecloud.com", region),
            Service::Auth => format!("https://auth.{}.oraclecloud.com", region),
        })
    }
}

fn validate_region(region: &str) -> Result<()> {
    if region.is_empty()
        || !region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(OciLogsError::Config(format!("Invalid region '{}'", region)));
    }
    Ok(())
}

/// Shared plumbing: builds, signs and sends one request.
#[derive(Debug, Clone)]
struct SignedClient {
    http: reqwest::Client,
    endpoints: ServiceEndpoints,
    credentials: Arc<CredentialProvider>,
}

impl SignedClient {
    fn url(&self, service: Service, region: &str, path: &str) -> Result<String> {
        let region = if region.is_empty() {
            self.credentials.region()
        } else {
            region
        };
        Ok(format!("{}{}", self.endpoints.base_url(service, region)?, path))
    }

    async fn send(
        &self,
        operation: &str,
        params: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut request = builder
            .build()
            .map_err(|e| OciLogsError::remote(operation, params, e))?;
        let material = self.credentials.signing_material().await?;
        sign_request(&mut request, &material)?;

        tracing::debug!(operation, params, url = %request.url(), "Sending signed request");
        self.http
            .execute(request)
            .await
            .map_err(|e| OciLogsError::remote(operation, params, e))
    }

    /// Send and require a 2xx status.
    async fn send_ok(
        &self,
        operation: &str,
        params: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = self.send(operation, params, builder).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OciLogsError::remote(
                operation,
                params,
                format!("service returned {}: {}", status, body),
            ));
        }
        Ok(response)
    }

    async fn json<T: serde::de::DeserializeOwned>(
        operation: &str,
        params: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| OciLogsError::remote(operation, params, format!("bad response: {}", e)))
    }
}

fn next_page(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client for the log search service.
#[derive(Debug, Clone)]
pub struct SearchClient {
    inner: SignedClient,
}

impl SearchClient {
    pub async fn search_logs(
        &self,
        region: &str,
        details: &SearchLogsDetails,
        limit: usize,
    ) -> Result<SearchPage> {
        let params = format!("query={}, limit={}", details.search_query, limit);
        let url = self.inner.url(Service::Logging, region, "/20190909/search")?;
        let builder = self
            .inner
            .http
            .post(&url)
            .query(&[("limit", limit.to_string())])
            .json(details);

        let response = self.inner.send_ok("SearchLogs", &params, builder).await?;
        let next_page = next_page(&response);
        let body: SearchResponse = SignedClient::json("SearchLogs", &params, response).await?;
        Ok(SearchPage {
            results: body.results.into_iter().map(|r| r.data).collect(),
            next_page,
        })
    }
}

/// Client for the logging management service.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    inner: SignedClient,
}

impl ManagementClient {
    /// List log groups in a compartment, returning the raw status and body.
    ///
    /// Non-2xx statuses are not errors here; the caller decides.
    pub async fn list_log_groups(
        &self,
        region: &str,
        compartment_id: &str,
        limit: usize,
    ) -> Result<ProbeResponse> {
        let params = format!("compartmentId={}", compartment_id);
        let url = self.inner.url(Service::Logging, region, "/20200531/logGroups")?;
        let builder = self.inner.http.get(&url).query(&[
            ("compartmentId", compartment_id.to_string()),
            ("limit", limit.to_string()),
        ]);

        let response = self.inner.send("ListLogGroups", &params, builder).await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| OciLogsError::remote("ListLogGroups", &params, e))?;
        Ok(ProbeResponse { status, body })
    }
}

/// Client for the identity service.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    inner: SignedClient,
}

impl IdentityClient {
    /// One page of compartments in the subtree rooted at `root_id`.
    pub async fn list_compartments(
        &self,
        region: &str,
        root_id: &str,
        page: Option<&str>,
    ) -> Result<CompartmentPage> {
        let params = format!("compartmentId={}, page={}", root_id, page.unwrap_or("-"));
        let url = self.inner.url(Service::Identity, region, "/20160918/compartments")?;
        let mut query = vec![
            ("compartmentId", root_id.to_string()),
            ("compartmentIdInSubtree", "true".to_string()),
            ("accessLevel", "ANY".to_string()),
        ];
        if let Some(token) = page {
            query.push(("page", token.to_string()));
        }
        let builder = self.inner.http.get(&url).query(&query);

        let response = self
            .inner
            .send_ok("ListCompartments", &params, builder)
            .await?;
        let next_page = next_page(&response);
        let items: Vec<Compartment> =
            SignedClient::json("ListCompartments", &params, response).await?;
        Ok(CompartmentPage { items, next_page })
    }

    pub async fn list_region_subscriptions(
        &self,
        region: &str,
        tenancy_id: &str,
    ) -> Result<Vec<RegionSubscription>> {
        let params = format!("tenancyId={}", tenancy_id);
        let url = self.inner.url(
            Service::Identity,
            region,
            &format!("/20160918/tenancies/{}/regionSubscriptions", tenancy_id),
        )?;
        let builder = self.inner.http.get(&url);
        let response = self
            .inner
            .send_ok("ListRegionSubscriptions", &params, builder)
            .await?;
        SignedClient::json("ListRegionSubscriptions", &params, response).await
    }

    pub async fn get_tenancy(&self, region: &str, tenancy_id: &str) -> Result<Tenancy> {
        let params = format!("tenancyId={}", tenancy_id);
        let url = self.inner.url(
            Service::Identity,
            region,
            &format!("/20160918/tenancies/{}", tenancy_id),
        )?;
        let builder = self.inner.http.get(&url);
        let response = self.inner.send_ok("GetTenancy", &params, builder).await?;
        SignedClient::json("GetTenancy", &params, response).await
    }
}

/// The three service clients of one tenancy, sharing one credential provider
/// and one connection pool.
#[derive(Debug, Clone)]
pub struct ServiceClients {
    pub search: SearchClient,
    pub management: ManagementClient,
    pub identity: IdentityClient,
}

impl ServiceClients {
    pub fn new(credentials: Arc<CredentialProvider>, endpoints: ServiceEndpoints) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ocilogs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OciLogsError::ClientConstruction(e.to_string()))?;
        let inner = SignedClient {
            http,
            endpoints,
            credentials,
        };
        Ok(Self {
            search: SearchClient {
                inner: inner.clone(),
            },
            management: ManagementClient {
                inner: inner.clone(),
            },
            identity: IdentityClient { inner },
        })
    }
}
