//! Column kinds and the typed [`Value`] they coerce textual literals into.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// `ColumnKind` round-trips through `_schema.json`, so it keeps `Deserialize`;
// `Value` does not (see doc comment above).

use crate::error::{GitDbError, Result};

/// The five scalar column kinds a schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnKind {
    Int,
    Float,
    Bool,
    String,
    Timestamp,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnKind::Int => "INT",
            ColumnKind::Float => "FLOAT",
            ColumnKind::Bool => "BOOL",
            ColumnKind::String => "STRING",
            ColumnKind::Timestamp => "TIMESTAMP",
        };
        f.write_str(s)
    }
}

impl ColumnKind {
    /// Parse a kind keyword as it appears in `CREATE TABLE`/`ALTER TABLE`
    /// and in `_schema.json`. Case-insensitive, matching the grammar's
    /// case-insensitive keyword handling.
    pub fn parse(s: &str) -> Result<ColumnKind> {
        match s.to_ascii_uppercase().as_str() {
            "INT" => Ok(ColumnKind::Int),
            "FLOAT" => Ok(ColumnKind::Float),
            "BOOL" => Ok(ColumnKind::Bool),
            "STRING" => Ok(ColumnKind::String),
            "TIMESTAMP" => Ok(ColumnKind::Timestamp),
            other => Err(GitDbError::UnsupportedType(other.to_string())),
        }
    }
}

/// A typed, in-memory row value.
///
/// Serializes losslessly to JSON (`Serialize` is unambiguous once the
/// variant is known), but deserializing back requires the column's kind —
/// a bare JSON string could be a `STRING` or a `TIMESTAMP` — so reading a
/// row back from disk goes through [`from_json`] with the schema in hand
/// rather than through `serde`'s `Deserialize`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    /// Render the value the way the predicate engine and join keys compare
    /// it: its "textual form". Whole-number floats render without a
    /// trailing `.0` so they canonicalize to the same key as an equal int
    /// (used by the join's key stringification, see §4.7).
    pub fn render(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Timestamp(t) => t.to_rfc3339(),
            Value::Null => "nil".to_string(),
        }
    }
}

/// Coerce a textual literal into a typed [`Value`] for the given kind.
pub fn coerce(text: &str, kind: ColumnKind) -> Result<Value> {
    let invalid = || GitDbError::InvalidLiteral {
        literal: text.to_string(),
        kind: kind.to_string(),
    };
    match kind {
        ColumnKind::Int => text.parse::<i64>().map(Value::Int).map_err(|_| invalid()),
        ColumnKind::Float => text.parse::<f64>().map(Value::Float).map_err(|_| invalid()),
        ColumnKind::Bool => match text {
            "true" | "t" | "T" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "F" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ColumnKind::Timestamp => DateTime::parse_from_rfc3339(text)
            .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
            .map_err(|_| invalid()),
        ColumnKind::String => Ok(Value::String(text.to_string())),
    }
}

/// Decode a raw JSON value into a typed [`Value`] according to `kind`.
///
/// Used when reading a row file back off disk, where the schema — not the
/// JSON shape — determines how an on-disk string or number should be
/// interpreted.
pub fn from_json(json: &serde_json::Value, kind: ColumnKind) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    match kind {
        ColumnKind::Int => json
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| invalid_json(json, kind)),
        ColumnKind::Float => json
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| invalid_json(json, kind)),
        ColumnKind::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid_json(json, kind)),
        ColumnKind::String => json
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| invalid_json(json, kind)),
        ColumnKind::Timestamp => json
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
            .ok_or_else(|| invalid_json(json, kind)),
    }
}

fn invalid_json(json: &serde_json::Value, kind: ColumnKind) -> GitDbError {
    GitDbError::InvalidLiteral {
        literal: json.to_string(),
        kind: kind.to_string(),
    }
}

/// The zero value for a column kind, used to back-fill columns missing from
/// an `INSERT` and columns added by `ALTER TABLE ADD COLUMN`.
pub fn zero(kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Int => Value::Int(0),
        ColumnKind::Float => Value::Float(0.0),
        ColumnKind::Bool => Value::Bool(false),
        ColumnKind::String => Value::String(String::new()),
        ColumnKind::Timestamp => Value::Timestamp(DateTime::<Utc>::from_timestamp(0, 0).unwrap()),
    }
}

/// A total order over [`Value`]s, used by `ORDER BY`.
///
/// Numeric kinds compare numerically with int/float mixing allowed.
/// Booleans order `false < true`. Timestamps compare chronologically.
/// Strings compare by code-point sequence. `Null` sorts first. Unrelated
/// mixed types fall back to comparing textual renderings, so the order
/// stays total even across heterogeneous columns.
pub fn less(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Less
}

fn compare(a: &Value, b: &Value) -> Ordering {
    use Value::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Int(x), Int(y)) => x.cmp(y),
        (Float(x), Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Int(x), Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Float(x), Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (Bool(x), Bool(y)) => x.cmp(y),
        (Timestamp(x), Timestamp(y)) => x.cmp(y),
        (String(x), String(y)) => x.cmp(y),
        _ => a.render().cmp(&b.render()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_int_rejects_non_numeric() {
        assert!(coerce("abc", ColumnKind::Int).is_err());
    }

    #[test]
    fn coerce_int_accepts_signed() {
        assert!(matches!(coerce("-42", ColumnKind::Int), Ok(Value::Int(-42))));
    }

    #[test]
    fn coerce_bool_variants() {
        for text in ["true", "t", "T", "1"] {
            assert!(matches!(coerce(text, ColumnKind::Bool), Ok(Value::Bool(true))));
        }
        for text in ["false", "f", "F", "0"] {
            assert!(matches!(coerce(text, ColumnKind::Bool), Ok(Value::Bool(false))));
        }
    }

    #[test]
    fn coerce_timestamp_rfc3339() {
        let v = coerce("2024-01-01T00:00:00Z", ColumnKind::Timestamp).unwrap();
        assert!(matches!(v, Value::Timestamp(_)));
    }

    #[test]
    fn coerce_string_is_identity() {
        assert!(matches!(coerce("hello", ColumnKind::String), Ok(Value::String(s)) if s == "hello"));
    }

    #[test]
    fn zero_values_per_kind() {
        assert!(matches!(zero(ColumnKind::Int), Value::Int(0)));
        assert!(matches!(zero(ColumnKind::Float), Value::Float(f) if f == 0.0));
        assert!(matches!(zero(ColumnKind::Bool), Value::Bool(false)));
        assert!(matches!(zero(ColumnKind::String), Value::String(s) if s.is_empty()));
    }

    #[test]
    fn less_orders_bools() {
        assert!(less(&Value::Bool(false), &Value::Bool(true)));
        assert!(!less(&Value::Bool(true), &Value::Bool(false)));
    }

    #[test]
    fn less_mixes_int_and_float() {
        assert!(less(&Value::Int(1), &Value::Float(1.5)));
        assert!(!less(&Value::Float(1.5), &Value::Int(1)));
    }

    #[test]
    fn less_nulls_sort_first() {
        assert!(less(&Value::Null, &Value::Int(0)));
        assert!(!less(&Value::Int(0), &Value::Null));
    }

    #[test]
    fn render_whole_number_float_has_no_trailing_zero() {
        assert_eq!(Value::Float(100.0).render(), "100");
        assert_eq!(Value::Int(100).render(), "100");
    }

    #[test]
    fn render_fractional_float_keeps_decimal() {
        assert_eq!(Value::Float(1.5).render(), "1.5");
    }

    #[test]
    fn from_json_decodes_per_kind() {
        let v = from_json(&serde_json::json!(42), ColumnKind::Int).unwrap();
        assert!(matches!(v, Value::Int(42)));
        let v = from_json(&serde_json::json!("hello"), ColumnKind::String).unwrap();
        assert!(matches!(v, Value::String(s) if s == "hello"));
        let v = from_json(&serde_json::json!("2024-01-01T00:00:00Z"), ColumnKind::Timestamp).unwrap();
        assert!(matches!(v, Value::Timestamp(_)));
    }

    #[test]
    fn from_json_null_is_null() {
        assert!(matches!(from_json(&serde_json::Value::Null, ColumnKind::Int).unwrap(), Value::Null));
    }
}
