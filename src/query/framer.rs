//! Time-bucketed framing of log search results.
//!
//! The requested window `[start, end)` is split into N equal-width buckets.
//! Every leaf value of every record lands in the slot of its record's bucket
//! in the column identified by (field name, record labels). A later write to
//! the same slot replaces the earlier one.

use crate::types::{
    epoch_ms_to_utc, DataFrame, FieldValues, HealthState, HealthStatus, ResultSet, Table,
    TimeRange, TypedField, ValueType,
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_BUCKETS: usize = 5;
pub const MIN_BUCKETS: usize = 2;
pub const MAX_BUCKETS: usize = 10;

/// Name of the leading column holding each bucket's start instant.
pub const TIME_FIELD: &str = "time";

const DATETIME_KEY: &str = "datetime";
const TIME_KEY: &str = "time";
const LOG_CONTENT_KEY: &str = "logContent";
const LABELS_KEY: &str = "labels";

/// Bucket count for a request: absent or non-positive means the default,
/// anything else is clamped to `[MIN_BUCKETS, MAX_BUCKETS]`.
pub fn bucket_count(max_data_points: Option<i64>) -> usize {
    match max_data_points {
        Some(n) if n > 0 => (n as usize).clamp(MIN_BUCKETS, MAX_BUCKETS),
        _ => DEFAULT_BUCKETS,
    }
}

/// Partition of a time window into equal-width buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buckets {
    start_ms: i64,
    end_ms: i64,
    width_ms: i64,
    count: usize,
}

impl Buckets {
    pub fn new(range: &TimeRange, count: usize) -> Self {
        let count = count.max(1);
        let span = range.to_epoch_ms.saturating_sub(range.from_epoch_ms).max(0);
        Self {
            start_ms: range.from_epoch_ms,
            end_ms: range.to_epoch_ms,
            width_ms: (span / count as i64).max(1),
            count,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn width_ms(&self) -> i64 {
        self.width_ms
    }

    /// Bucket of a timestamp. The window end belongs to the last bucket;
    /// anything outside `[start, end]` has none.
    pub fn index(&self, ts_ms: i64) -> Option<usize> {
        if ts_ms < self.start_ms || ts_ms > self.end_ms {
            return None;
        }
        if ts_ms == self.end_ms {
            return Some(self.count - 1);
        }
        let idx = (ts_ms.saturating_sub(self.start_ms) / self.width_ms) as usize;
        Some(idx.min(self.count - 1))
    }

    /// Start of every bucket; `None` where it falls outside the calendar.
    pub fn starts(&self) -> Vec<Option<DateTime<Utc>>> {
        (0..self.count)
            .map(|i| {
                let offset = (i as i64).saturating_mul(self.width_ms);
                epoch_ms_to_utc(self.start_ms.saturating_add(offset))
            })
            .collect()
    }
}

/// Timestamp of a record in epoch milliseconds: `datetime` (epoch ms) or
/// `time` (RFC 3339), at the top level or under `logContent`.
pub fn record_timestamp(record: &Value) -> Option<i64> {
    timestamp_in(record).or_else(|| record.get(LOG_CONTENT_KEY).and_then(timestamp_in))
}

fn timestamp_in(value: &Value) -> Option<i64> {
    if let Some(dt) = value.get(DATETIME_KEY) {
        let parsed = match dt {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    value
        .get(TIME_KEY)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.timestamp_millis())
}

fn record_labels(record: &Value) -> BTreeMap<String, String> {
    let Some(Value::Object(labels)) = record.get(LABELS_KEY) else {
        return BTreeMap::new();
    };
    labels
        .iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k.clone(), s.clone())),
            Value::Null => None,
            other => Some((k.clone(), other.to_string())),
        })
        .collect()
}

/// A leaf value with its detected shape.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Int(i64),
    Float(f64),
    Time(DateTime<Utc>),
    Text(String),
}

impl Cell {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Cell::Text(b.to_string())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => Cell::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Value::String(s) => Some(match DateTime::parse_from_rfc3339(s) {
                Ok(t) => Cell::Time(t.with_timezone(&Utc)),
                Err(_) => Cell::Text(s.clone()),
            }),
            other => Some(Cell::Text(other.to_string())),
        }
    }

    fn value_type(&self) -> ValueType {
        match self {
            Cell::Int(_) => ValueType::Int,
            Cell::Float(_) => ValueType::Float64,
            Cell::Time(_) => ValueType::Time,
            Cell::Text(_) => ValueType::String,
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Time(t) => t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Walk a record and emit `(dotted path, leaf)` pairs. Top-level
/// timestamp and label keys are not data.
fn flatten(record: &Value, out: &mut Vec<(String, Cell)>) {
    let Value::Object(map) = record else {
        if let Some(cell) = Cell::from_json(record) {
            out.push(("value".to_string(), cell));
        }
        return;
    };
    for (key, value) in map {
        if key == DATETIME_KEY || key == TIME_KEY || key == LABELS_KEY {
            continue;
        }
        flatten_into(key.clone(), value, out);
    }
}

fn flatten_into(path: String, value: &Value, out: &mut Vec<(String, Cell)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                flatten_into(format!("{}.{}", path, key), nested, out);
            }
        }
        other => {
            if let Some(cell) = Cell::from_json(other) {
                out.push((path, cell));
            }
        }
    }
}

type FieldKey = (String, BTreeMap<String, String>);

/// Accumulates columns for one frame.
struct Columns {
    buckets: usize,
    columns: IndexMap<FieldKey, FieldValues>,
}

impl Columns {
    fn new(buckets: usize) -> Self {
        Self {
            buckets,
            columns: IndexMap::new(),
        }
    }

    fn write(&mut self, key: FieldKey, slot: usize, cell: Cell) {
        let buckets = self.buckets;
        let column = self
            .columns
            .entry(key)
            .or_insert_with(|| FieldValues::empty(cell.value_type(), buckets));

        if column.value_type() != cell.value_type() && column.value_type() != ValueType::String {
            let demoted = demote(column);
            *column = demoted;
        }

        match (column, cell) {
            (FieldValues::Int(v), Cell::Int(i)) => v[slot] = Some(i),
            (FieldValues::Float64(v), Cell::Float(f)) => v[slot] = Some(f),
            (FieldValues::Time(v), Cell::Time(t)) => v[slot] = Some(t),
            (FieldValues::String(v), cell) => v[slot] = Some(cell.render()),
            // Unreachable after demotion; every other pairing shares a type.
            (column, cell) => {
                tracing::debug!(
                    column = ?column.value_type(),
                    cell = ?cell.value_type(),
                    "Dropping value of mismatched shape"
                );
            }
        }
    }

    fn into_fields(self) -> Vec<TypedField> {
        self.columns
            .into_iter()
            .map(|((name, labels), values)| TypedField {
                name,
                value_type: values.value_type(),
                labels,
                values,
            })
            .collect()
    }
}

/// Re-render every slot of a column as text.
fn demote(column: &FieldValues) -> FieldValues {
    FieldValues::String((0..column.len()).map(|i| column.render(i)).collect())
}

/// Frame raw search records into a time-bucketed data frame.
pub fn frame(name: &str, records: &[Value], range: &TimeRange, bucket_count: usize) -> DataFrame {
    let buckets = Buckets::new(range, bucket_count);
    let mut columns = Columns::new(buckets.count());
    let mut dropped = 0usize;
    let mut leaves = Vec::new();

    for record in records {
        let Some(slot) = record_timestamp(record).and_then(|ts| buckets.index(ts)) else {
            dropped += 1;
            continue;
        };
        let labels = record_labels(record);

        leaves.clear();
        flatten(record, &mut leaves);
        for (path, cell) in leaves.drain(..) {
            columns.write((path, labels.clone()), slot, cell);
        }
    }

    if dropped > 0 {
        tracing::warn!(
            frame = name,
            dropped,
            total = records.len(),
            "Dropped records without a timestamp inside the query window"
        );
    }

    let mut fields = Vec::with_capacity(columns.columns.len() + 1);
    fields.push(TypedField {
        name: TIME_FIELD.to_string(),
        value_type: ValueType::Time,
        labels: BTreeMap::new(),
        values: FieldValues::Time(buckets.starts()),
    });
    fields.extend(columns.into_fields());

    DataFrame {
        name: name.to_string(),
        fields,
    }
}

/// Compartments as a `name, id` table, in listing order.
pub fn compartment_table(name: &str, compartments: &IndexMap<String, String>) -> ResultSet {
    ResultSet::Table(Table {
        name: name.to_string(),
        columns: vec!["name".to_string(), "id".to_string()],
        rows: compartments
            .iter()
            .map(|(n, id)| vec![n.clone(), id.clone()])
            .collect(),
    })
}

/// A single-column `name` table.
pub fn name_table(name: &str, names: &[String]) -> ResultSet {
    ResultSet::Table(Table {
        name: name.to_string(),
        columns: vec!["name".to_string()],
        rows: names.iter().map(|n| vec![n.clone()]).collect(),
    })
}

/// A one-row `status, message` table.
pub fn health_table(name: &str, status: &HealthStatus) -> ResultSet {
    let state = match status.status {
        HealthState::Ok => "OK",
        HealthState::Error => "ERROR",
    };
    ResultSet::Table(Table {
        name: name.to_string(),
        columns: vec!["status".to_string(), "message".to_string()],
        rows: vec![vec![state.to_string(), status.message.clone()]],
    })
}
