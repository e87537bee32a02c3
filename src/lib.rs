//! # ocilogs
//!
//! A read-only, federated log search adapter for OCI Logging. It resolves
//! per-tenancy API credentials from a multi-profile settings blob, runs
//! paginated listings and log searches against the remote services, and
//! frames search results into fixed-width time buckets of typed columns.
//!
//! Expensive lookups (compartment trees, region subscriptions) are kept in a
//! cost-bounded cache shared by every request of an instance.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ocilogs::{Datasource, DatasourceConfig, QueryRequest, RawSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> ocilogs::Result<()> {
//! let settings = RawSettings::load(std::path::Path::new("settings.json"))?;
//! let datasource = Datasource::new(&settings, DatasourceConfig::from_env()).await?;
//!
//! let request: QueryRequest = serde_json::from_value(serde_json::json!({
//!     "refId": "A",
//!     "queryType": "searchLogs",
//!     "searchQuery": "search \"ocid1.compartment.oc1..example\"",
//!     "maxDataPoints": 5,
//!     "timeRange": {"fromEpochMs": 0, "toEpochMs": 600000}
//! }))?;
//! let result = datasource.query(&request, &CancellationToken::new()).await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```
//!
//! ## Tenancy modes
//!
//! In single mode only the first profile is used and it is registered under
//! [`SINGLE_TENANCY_KEY`]. In multitenancy mode every profile is registered
//! under `profile/tenancyOCID` and requests name the tenancy they address.
//!
//! ## Feature flags
//!
//! | Feature | Dependencies | Use case |
//! |---------|-------------|----------|
//! | `axum-support` | axum | [`OciLogsError`] implements `IntoResponse` |

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod datasource;
pub mod error;
pub mod query;
pub mod registry;
pub mod settings;
pub mod types;

pub use cache::{ResultCache, TtlCached};
pub use config::DatasourceConfig;
pub use datasource::{Datasource, QueryOutcome};
pub use error::{OciLogsError, Result};
pub use query::{QueryExecutor, QueryParams};
pub use registry::{ClientRegistry, ResolvedTenancy};
pub use settings::{RawSettings, TenancyProfile};
pub use types::*;
