use std::time::Duration;

/// Maximum number of pages fetched for one paginated listing.
pub const PAGE_CAP: usize = 20;

/// Page size requested from the log search service.
pub const SEARCH_PAGE_LIMIT: usize = 500;

/// Runtime configuration for a datasource instance, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DatasourceConfig {
    /// Approximate total cost budget of the shared result cache, in bytes.
    pub cache_max_cost: u64,
    /// How long a cached lookup is considered fresh.
    pub refresh_interval: Duration,
    /// Base URL of the instance metadata service.
    pub metadata_url: String,
    /// When set, every service client targets this base URL instead of the
    /// regional OCI endpoint. A `{region}` marker in it is replaced by the
    /// region of each call.
    pub endpoint_override: Option<String>,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            cache_max_cost: 64 * 1024 * 1024,
            refresh_interval: Duration::from_secs(60),
            metadata_url: "http://169.254.169.254".to_string(),
            endpoint_override: None,
        }
    }
}

impl DatasourceConfig {
    /// Load config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_max_cost: std::env::var("OCILOGS_CACHE_MAX_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_cost),
            refresh_interval: std::env::var("OCILOGS_CACHE_REFRESH_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            metadata_url: std::env::var("OCILOGS_METADATA_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.metadata_url),
            endpoint_override: std::env::var("OCILOGS_ENDPOINT_OVERRIDE")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    /// Config pointing every remote call at a single base URL (for tests).
    pub fn with_endpoint(base_url: &str) -> Self {
        Self {
            metadata_url: base_url.to_string(),
            endpoint_override: Some(base_url.to_string()),
            ..Self::default()
        }
    }
}
