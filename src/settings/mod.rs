//! Datasource instance settings as handed over by the host.
//!
//! The host stores two sub-blobs per instance: `jsonData` (plain values such
//! as the environment, tenancy mode, regions and profile names) and
//! `secureJsonData` (credentials). [`RawSettings`] carries both verbatim;
//! [`profiles::parse_profiles`] turns them into [`profiles::TenancyProfile`]s.

pub mod profiles;

use crate::error::{OciLogsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub use profiles::{parse_profiles, ProfileField, ProfileSlot, TenancyProfile, MAX_PROFILE_SLOTS};

/// Environment value selecting key-file credentials from the settings blob.
pub const ENVIRONMENT_LOCAL: &str = "local";
/// Environment value selecting instance-principal credentials.
pub const ENVIRONMENT_INSTANCE: &str = "OCI Instance";
/// Tenancy mode value enabling multiple tenancies per instance.
pub const TENANCY_MODE_MULTI: &str = "multitenancy";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    #[serde(default)]
    pub json_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub secure_json_data: HashMap<String, String>,
}

impl RawSettings {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| OciLogsError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Load settings from a JSON file holding `{jsonData, secureJsonData}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OciLogsError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn environment(&self) -> String {
        self.plain_string("environment").unwrap_or_default()
    }

    pub fn tenancy_mode(&self) -> String {
        self.plain_string("tenancyMode")
            .or_else(|| self.plain_string("tenancymode"))
            .unwrap_or_default()
    }

    pub fn is_multitenancy(&self) -> bool {
        self.tenancy_mode() == TENANCY_MODE_MULTI
    }

    fn plain_string(&self, key: &str) -> Option<String> {
        self.json_data.get(key).and_then(scalar_to_string)
    }

    /// Single view over both sub-blobs. Plain values win only for the
    /// profile name and region fields; secured values win everywhere else.
    pub fn merged(&self) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = self
            .secure_json_data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in &self.json_data {
            let Some(s) = scalar_to_string(value) else {
                continue;
            };
            if is_plain_field(key) {
                merged.insert(key.clone(), s);
            } else {
                merged.entry(key.clone()).or_insert(s);
            }
        }
        merged
    }
}

fn is_plain_field(key: &str) -> bool {
    key.rsplit_once('_').is_some_and(|(name, _)| {
        name == ProfileField::Profile.name() || name == ProfileField::Region.name()
    })
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
