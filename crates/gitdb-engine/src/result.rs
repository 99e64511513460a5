//! The shape of a statement's result and of a whole batch's result (§4.8,
//! §6): every statement produces either an acknowledgement or a sequence
//! of projected rows; a batch of one statement returns that result bare, a
//! batch of more than one returns the per-statement results as an array.

use serde::Serialize;
use serde_json::Value as Json;

/// What executing one statement produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatementResult {
    /// A DDL or mutation statement that doesn't return rows.
    Ack { status: &'static str },
    /// `SELECT`/`JOIN` output: a sequence of projected rows (possibly
    /// empty — an empty result set is not an error, §6).
    Rows(Vec<Json>),
}

impl StatementResult {
    pub fn ok() -> Self {
        StatementResult::Ack { status: "ok" }
    }
}

/// What `Engine::execute` returns for a whole batch: a single statement's
/// result serializes bare; more than one serializes as an array of
/// per-statement results, in order (§4.8).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecuteOutput {
    Single(StatementResult),
    Many(Vec<StatementResult>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_serializes_to_status_ok() {
        let json = serde_json::to_value(StatementResult::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }

    #[test]
    fn rows_serializes_as_bare_array() {
        let json = serde_json::to_value(StatementResult::Rows(vec![serde_json::json!({"id": "1"})]))
            .unwrap();
        assert_eq!(json, serde_json::json!([{"id": "1"}]));
    }

    #[test]
    fn single_output_serializes_bare_not_wrapped_in_array() {
        let json = serde_json::to_value(ExecuteOutput::Single(StatementResult::ok())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }

    #[test]
    fn many_output_serializes_as_array() {
        let json = serde_json::to_value(ExecuteOutput::Many(vec![
            StatementResult::ok(),
            StatementResult::ok(),
        ]))
        .unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);
    }
}
