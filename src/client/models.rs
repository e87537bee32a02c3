use serde::{Deserialize, Serialize};

/// Lifecycle state of a compartment that is usable for queries.
pub const LIFECYCLE_ACTIVE: &str = "ACTIVE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compartment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lifecycle_state: String,
}

impl Compartment {
    pub fn is_active(&self) -> bool {
        self.lifecycle_state == LIFECYCLE_ACTIVE
    }
}

/// One page of a compartment listing.
#[derive(Debug, Clone, Default)]
pub struct CompartmentPage {
    pub items: Vec<Compartment>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSubscription {
    pub region_name: String,
    #[serde(default)]
    pub region_key: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_home_region: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenancy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub home_region_key: Option<String>,
}

/// Body of a log search call. Times are RFC 3339 strings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogsDetails {
    pub time_start: String,
    pub time_end: String,
    pub search_query: String,
    pub is_return_field_info: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult {
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of log search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<serde_json::Value>,
    pub next_page: Option<String>,
}

/// Raw outcome of a connectivity probe, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
