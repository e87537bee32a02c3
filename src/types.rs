use crate::error::{OciLogsError, Result};
use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tenancy key used when the instance runs in single-tenancy mode.
pub const SINGLE_TENANCY_KEY: &str = "DEFAULT/";

/// Kind of query carried by a request.
///
/// Any value other than the recognised ones is treated as a log search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryType {
    Tenancies,
    Regions,
    Compartments,
    #[default]
    SearchLogs,
    Test,
}

impl From<&str> for QueryType {
    fn from(value: &str) -> Self {
        match value {
            "tenancies" => QueryType::Tenancies,
            "regions" => QueryType::Regions,
            "compartments" => QueryType::Compartments,
            "test" => QueryType::Test,
            _ => QueryType::SearchLogs,
        }
    }
}

impl From<String> for QueryType {
    fn from(value: String) -> Self {
        QueryType::from(value.as_str())
    }
}

impl From<QueryType> for String {
    fn from(value: QueryType) -> Self {
        value.as_str().to_string()
    }
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Tenancies => "tenancies",
            QueryType::Regions => "regions",
            QueryType::Compartments => "compartments",
            QueryType::SearchLogs => "searchLogs",
            QueryType::Test => "test",
        }
    }
}

/// Requested time window as millisecond epochs, `[from, to)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub from_epoch_ms: i64,
    pub to_epoch_ms: i64,
}

impl TimeRange {
    pub fn new(from_epoch_ms: i64, to_epoch_ms: i64) -> Self {
        Self {
            from_epoch_ms,
            to_epoch_ms,
        }
    }

    /// Both ends as UTC timestamps. Fails when either end is outside the
    /// representable calendar or the window is inverted.
    pub fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let convert = |ms: i64| {
            epoch_ms_to_utc(ms).ok_or_else(|| {
                OciLogsError::InvalidTimeRange(format!("epoch {} ms is out of range", ms))
            })
        };
        let start = convert(self.from_epoch_ms)?;
        let end = convert(self.to_epoch_ms)?;
        if start > end {
            return Err(OciLogsError::InvalidTimeRange(format!(
                "start {} ms is after end {} ms",
                self.from_epoch_ms, self.to_epoch_ms
            )));
        }
        Ok((start, end))
    }
}

pub(crate) fn epoch_ms_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// A single query as submitted by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub ref_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default, alias = "tenancymode")]
    pub tenancy_mode: String,
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default)]
    pub region: String,
    #[serde(default, rename = "tenancyOCID")]
    pub tenancy_ocid: String,
    /// Tenancy key (`profile/tenancyOCID`) when the instance runs in multitenancy mode.
    #[serde(default)]
    pub tenancy: String,
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub max_data_points: Option<i64>,
    #[serde(default)]
    pub panel_id: Option<i64>,
    #[serde(default)]
    pub time_range: TimeRange,
}

/// Value type of a framed column, fixed by the first value observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float64,
    Int,
    Time,
    String,
}

/// Column storage; every variant holds exactly one slot per time bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValues {
    Float64(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Time(Vec<Option<DateTime<Utc>>>),
    String(Vec<Option<String>>),
}

impl FieldValues {
    pub fn empty(value_type: ValueType, len: usize) -> Self {
        match value_type {
            ValueType::Float64 => FieldValues::Float64(vec![None; len]),
            ValueType::Int => FieldValues::Int(vec![None; len]),
            ValueType::Time => FieldValues::Time(vec![None; len]),
            ValueType::String => FieldValues::String(vec![None; len]),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValues::Float64(_) => ValueType::Float64,
            FieldValues::Int(_) => ValueType::Int,
            FieldValues::Time(_) => ValueType::Time,
            FieldValues::String(_) => ValueType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Float64(v) => v.len(),
            FieldValues::Int(v) => v.len(),
            FieldValues::Time(v) => v.len(),
            FieldValues::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_set(&self, slot: usize) -> bool {
        match self {
            FieldValues::Float64(v) => v.get(slot).is_some_and(Option::is_some),
            FieldValues::Int(v) => v.get(slot).is_some_and(Option::is_some),
            FieldValues::Time(v) => v.get(slot).is_some_and(Option::is_some),
            FieldValues::String(v) => v.get(slot).is_some_and(Option::is_some),
        }
    }

    /// Number of populated slots.
    pub fn populated(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_set(i)).count()
    }

    /// String rendering of a slot, used when a column is demoted to `String`.
    pub fn render(&self, slot: usize) -> Option<String> {
        match self {
            FieldValues::Float64(v) => v.get(slot).copied().flatten().map(|f| f.to_string()),
            FieldValues::Int(v) => v.get(slot).copied().flatten().map(|i| i.to_string()),
            FieldValues::Time(v) => v
                .get(slot)
                .copied()
                .flatten()
                .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            FieldValues::String(v) => v.get(slot).cloned().flatten(),
        }
    }
}

/// One typed column of a data frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub values: FieldValues,
}

/// Time-bucketed result of a log search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataFrame {
    pub name: String,
    pub fields: Vec<TypedField>,
}

impl DataFrame {
    pub fn field(&self, name: &str) -> Option<&TypedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of time buckets (every column has this many slots).
    pub fn bucket_count(&self) -> usize {
        self.fields.first().map(|f| f.values.len()).unwrap_or(0)
    }
}

/// Tabular rows returned by listing queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Per-request response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResultSet {
    Frame(DataFrame),
    Table(Table),
}

/// Raw output of the executor, before framing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResultSet {
    Records(Vec<serde_json::Value>),
    Compartments(IndexMap<String, String>),
    Regions(Vec<String>),
    Tenancies(Vec<String>),
    Health(HealthStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Ok,
    Error,
}

/// Outcome of the health-check surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub message: String,
}

impl HealthStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Error,
            message: message.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Ok
    }
}
