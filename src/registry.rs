//! Per-tenancy credential and client resolution.
//!
//! A [`ClientRegistry`] is built once per datasource instance from the
//! settings blob. Construction performs network calls (federation for
//! instance principals and a tenancy self-report); any failure aborts the
//! whole registry. After construction the registry is read-only.

use crate::auth::{CredentialProvider, InstancePrincipalProvider, KeyFileProvider};
use crate::client::{IdentityClient, ManagementClient, SearchClient, ServiceClients, ServiceEndpoints};
use crate::config::DatasourceConfig;
use crate::error::{OciLogsError, Result};
use crate::settings::{
    parse_profiles, RawSettings, TenancyProfile, ENVIRONMENT_INSTANCE, ENVIRONMENT_LOCAL,
    TENANCY_MODE_MULTI,
};
use crate::types::SINGLE_TENANCY_KEY;
use indexmap::IndexMap;
use std::sync::Arc;

/// Clients and credentials for one tenancy.
#[derive(Debug)]
pub struct ResolvedTenancy {
    pub key: String,
    pub tenancy_ocid: String,
    pub default_region: String,
    pub search: SearchClient,
    pub management: ManagementClient,
    pub identity: IdentityClient,
    pub credentials: Arc<CredentialProvider>,
}

impl ResolvedTenancy {
    fn build(
        key: String,
        credentials: CredentialProvider,
        endpoints: &ServiceEndpoints,
    ) -> Result<Self> {
        let credentials = Arc::new(credentials);
        let clients = ServiceClients::new(Arc::clone(&credentials), endpoints.clone())?;
        Ok(Self {
            key,
            tenancy_ocid: credentials.tenancy_ocid().to_string(),
            default_region: credentials.region().to_string(),
            search: clients.search,
            management: clients.management,
            identity: clients.identity,
            credentials,
        })
    }

    /// The requested region, or the tenancy's own region when none was given.
    pub fn region<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() {
            &self.default_region
        } else {
            requested
        }
    }

    /// Ask the identity service about our own tenancy. Confirms the
    /// credentials work before the tenancy is registered.
    async fn self_report(&self) -> Result<()> {
        let tenancy = self
            .identity
            .get_tenancy(&self.default_region, &self.tenancy_ocid)
            .await
            .map_err(|e| {
                OciLogsError::ClientConstruction(format!(
                    "Tenancy self-report for '{}' failed: {}",
                    self.key, e
                ))
            })?;
        tracing::info!(
            key = %self.key,
            tenancy = %tenancy.id,
            name = %tenancy.name,
            "Tenancy resolved"
        );
        Ok(())
    }
}

/// Every resolved tenancy of a datasource instance, keyed by tenancy key.
#[derive(Debug)]
pub struct ClientRegistry {
    tenancies: IndexMap<String, Arc<ResolvedTenancy>>,
    multitenancy: bool,
}

impl ClientRegistry {
    /// Resolve credentials and clients for every tenancy the settings
    /// describe.
    pub async fn resolve(
        environment: &str,
        tenancy_mode: &str,
        settings: &RawSettings,
        config: &DatasourceConfig,
    ) -> Result<Self> {
        let multitenancy = tenancy_mode == TENANCY_MODE_MULTI;
        let endpoints = ServiceEndpoints::new(config.endpoint_override.clone());

        let tenancies = match environment {
            ENVIRONMENT_LOCAL => Self::resolve_local(settings, multitenancy, &endpoints).await?,
            ENVIRONMENT_INSTANCE => Self::resolve_instance(config, &endpoints).await?,
            other => return Err(OciLogsError::UnknownEnvironment(other.to_string())),
        };

        tracing::info!(
            environment,
            multitenancy,
            tenancies = tenancies.len(),
            "Client registry ready"
        );
        Ok(Self {
            tenancies,
            multitenancy,
        })
    }

    async fn resolve_local(
        settings: &RawSettings,
        multitenancy: bool,
        endpoints: &ServiceEndpoints,
    ) -> Result<IndexMap<String, Arc<ResolvedTenancy>>> {
        let profiles = parse_profiles(&settings.merged())?;
        if profiles.is_empty() {
            return Err(OciLogsError::Config(
                "No tenancy profiles configured".to_string(),
            ));
        }

        let selected: Vec<&TenancyProfile> = if multitenancy {
            profiles.values().collect()
        } else {
            for skipped in profiles.values().skip(1) {
                tracing::warn!(
                    profile = %skipped.profile_key,
                    "Single tenancy mode, ignoring profile"
                );
            }
            profiles.values().take(1).collect()
        };

        // Validate every key before any network call so a bad profile fails
        // the whole resolve without side effects.
        let providers = selected
            .iter()
            .map(|p| KeyFileProvider::from_profile(p).map(|provider| (*p, provider)))
            .collect::<Result<Vec<_>>>()?;

        let mut tenancies = IndexMap::new();
        for (profile, provider) in providers {
            let key = if multitenancy {
                format!("{}/{}", profile.profile_key, provider.tenancy_ocid())
            } else {
                SINGLE_TENANCY_KEY.to_string()
            };
            let resolved =
                ResolvedTenancy::build(key, CredentialProvider::KeyFile(provider), endpoints)?;
            resolved.self_report().await?;
            tenancies.insert(resolved.key.clone(), Arc::new(resolved));
        }
        Ok(tenancies)
    }

    async fn resolve_instance(
        config: &DatasourceConfig,
        endpoints: &ServiceEndpoints,
    ) -> Result<IndexMap<String, Arc<ResolvedTenancy>>> {
        let provider = InstancePrincipalProvider::new(&config.metadata_url, endpoints.clone())
            .await
            .map_err(|e| match e {
                OciLogsError::ClientConstruction(_) => e,
                other => OciLogsError::ClientConstruction(other.to_string()),
            })?;
        let resolved = ResolvedTenancy::build(
            SINGLE_TENANCY_KEY.to_string(),
            CredentialProvider::InstancePrincipal(provider),
            endpoints,
        )?;
        resolved.self_report().await?;

        let mut tenancies = IndexMap::new();
        tenancies.insert(resolved.key.clone(), Arc::new(resolved));
        Ok(tenancies)
    }

    pub fn is_multitenancy(&self) -> bool {
        self.multitenancy
    }

    pub fn get(&self, key: &str) -> Option<Arc<ResolvedTenancy>> {
        self.tenancies.get(key).cloned()
    }

    /// Tenancy keys in settings order.
    pub fn keys(&self) -> Vec<String> {
        self.tenancies.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tenancies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenancies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedTenancy>> {
        self.tenancies.values()
    }

    /// The tenancy a request addresses: its `tenancy` key in multitenancy
    /// mode, the single `DEFAULT/` tenancy otherwise.
    pub fn select(&self, requested_key: &str) -> Result<Arc<ResolvedTenancy>> {
        let key = if self.multitenancy {
            if requested_key.is_empty() {
                return Err(OciLogsError::TenancyNotFound(
                    "request does not name a tenancy".to_string(),
                ));
            }
            requested_key
        } else {
            SINGLE_TENANCY_KEY
        };
        self.get(key)
            .ok_or_else(|| OciLogsError::TenancyNotFound(key.to_string()))
    }
}
