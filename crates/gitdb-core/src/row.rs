//! The row model: engine-managed fields plus a schema-ordered bag of
//! user columns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use crate::error::{GitDbError, Result};
use crate::schema::Schema;
use crate::value::{self, Value};

/// Engine-managed field names, reserved on every table (§3).
pub const ID: &str = "id";
pub const DELETED: &str = "deleted";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const DELETED_AT: &str = "deleted_at";

/// A single row: the engine-managed fields plus user columns in
/// declaration order.
#[derive(Debug, Clone)]
pub struct Row {
    pub id: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub fields: IndexMap<String, Value>,
}

impl Row {
    /// Render the row to the on-disk JSON shape: engine fields first (in
    /// the order they appear in spec row examples), then user columns in
    /// schema order.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        map.insert(ID.to_string(), Json::String(self.id.clone()));
        map.insert(DELETED.to_string(), Json::Bool(self.deleted));
        map.insert(
            CREATED_AT.to_string(),
            Json::String(self.created_at.to_rfc3339()),
        );
        if let Some(ts) = self.updated_at {
            map.insert(UPDATED_AT.to_string(), Json::String(ts.to_rfc3339()));
        }
        if let Some(ts) = self.deleted_at {
            map.insert(DELETED_AT.to_string(), Json::String(ts.to_rfc3339()));
        }
        for (name, val) in &self.fields {
            map.insert(name.clone(), value_to_json(val));
        }
        Json::Object(map)
    }

    /// Parse a row back from its on-disk JSON shape, decoding user columns
    /// according to `schema`.
    pub fn from_json(json: &Json, schema: &Schema) -> Result<Row> {
        let obj = json
            .as_object()
            .ok_or_else(|| GitDbError::Serialization(serde::de::Error::custom("row is not an object")))?;

        let id = obj
            .get(ID)
            .and_then(|v| v.as_str())
            .ok_or_else(|| missing_field(ID))?
            .to_string();
        let deleted = obj.get(DELETED).and_then(|v| v.as_bool()).unwrap_or(false);
        let created_at = obj
            .get(CREATED_AT)
            .and_then(|v| v.as_str())
            .and_then(parse_ts)
            .ok_or_else(|| missing_field(CREATED_AT))?;
        let updated_at = obj.get(UPDATED_AT).and_then(|v| v.as_str()).and_then(parse_ts);
        let deleted_at = obj.get(DELETED_AT).and_then(|v| v.as_str()).and_then(parse_ts);

        let mut fields = IndexMap::new();
        for column in schema.columns() {
            let raw = obj.get(&column.name).cloned().unwrap_or(Json::Null);
            let decoded = value::from_json(&raw, column.kind)?;
            fields.insert(column.name.clone(), decoded);
        }

        Ok(Row {
            id,
            deleted,
            created_at,
            updated_at,
            deleted_at,
            fields,
        })
    }

    /// `- key: value` preview lines for the history commit message body
    /// (§4.4 `write_row`).
    pub fn preview_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("- {}: {}", ID, self.id)];
        for (name, val) in &self.fields {
            lines.push(format!("- {}: {}", name, val.render()));
        }
        lines
    }
}

fn value_to_json(val: &Value) -> Json {
    match val {
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Bool(b) => Json::Bool(*b),
        Value::String(s) => Json::String(s.clone()),
        Value::Timestamp(t) => Json::String(t.to_rfc3339()),
        Value::Null => Json::Null,
    }
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Generate a new row id: the decimal digits of the monotonic wall-clock
/// nanosecond counter at insert time (§3, GLOSSARY "Row id").
///
/// Strictly increasing within this process even when the system clock
/// doesn't advance between two calls, so ids stay unique under the normal
/// case described by invariant I4; true clock non-monotonicity (e.g. NTP
/// stepping the clock backwards across process restarts) is out of scope,
/// as spec.md notes.
pub fn next_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    loop {
        let last = LAST_ID.load(Ordering::SeqCst);
        let candidate = if now > last { now } else { last + 1 };
        if LAST_ID
            .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return candidate.to_string();
        }
    }
}

fn missing_field(name: &str) -> GitDbError {
    GitDbError::Serialization(serde::de::Error::custom(format!(
        "row missing required field {name:?}"
    )))
}
