//! The limited `WHERE` grammar (§4.3):
//!
//! ```text
//! predicate := conjunct ( " AND " conjunct )*
//! conjunct  := identifier ( " = " | " LIKE " ) literal
//! literal   := bareWord | "'" ... "'" | "\"" ... "\""
//! ```

use crate::row::Row;
use crate::value::Value;

/// Comparison operator recognized by a conjunct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Like,
}

/// A single `column OP literal` conjunct.
#[derive(Debug, Clone)]
pub struct Conjunct {
    pub column: String,
    pub op: Op,
    pub literal: String,
}

/// A conjunction of conjuncts. An empty predicate matches every row.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    pub conjuncts: Vec<Conjunct>,
}

/// Strip the quote/whitespace wrapping a literal carries as written in SQL
/// text: surrounding whitespace, then a single layer of `'`, `"`, or a
/// trailing `)`.
pub fn strip_literal(raw: &str) -> String {
    let mut s = raw.trim();
    s = s.trim_end_matches(')');
    s = s.trim();
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            s = &s[1..s.len() - 1];
        }
    }
    s.to_string()
}

/// Parse a `WHERE` clause body (the text after the `WHERE` keyword) into a
/// [`Predicate`]. An empty or whitespace-only clause yields the empty
/// (always-true) predicate.
pub fn parse(clause: &str) -> Option<Predicate> {
    let clause = clause.trim();
    if clause.is_empty() {
        return Some(Predicate::default());
    }

    let mut conjuncts = Vec::new();
    for part in split_and(clause) {
        conjuncts.push(parse_conjunct(part.trim())?);
    }
    Some(Predicate { conjuncts })
}

/// Split on `" AND "` case-insensitively without breaking literals that
/// happen to contain the word (the grammar has no quoting escape, so this
/// is a best-effort split on the keyword at the top level).
fn split_and(clause: &str) -> Vec<&str> {
    let upper = clause.to_ascii_uppercase();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    let bytes = upper.as_bytes();
    while idx + 5 <= bytes.len() {
        if &upper[idx..idx + 5] == " AND " {
            parts.push(&clause[start..idx]);
            start = idx + 5;
            idx += 5;
        } else {
            idx += 1;
        }
    }
    parts.push(&clause[start..]);
    parts
}

fn parse_conjunct(text: &str) -> Option<Conjunct> {
    let upper = text.to_ascii_uppercase();
    if let Some(pos) = upper.find(" LIKE ") {
        let column = text[..pos].trim().to_string();
        let literal = strip_literal(&text[pos + 6..]);
        return Some(Conjunct {
            column,
            op: Op::Like,
            literal,
        });
    }
    if let Some(pos) = text.find('=') {
        let column = text[..pos].trim().to_string();
        let literal = strip_literal(&text[pos + 1..]);
        return Some(Conjunct {
            column,
            op: Op::Eq,
            literal,
        });
    }
    None
}

/// Evaluate a predicate against a row, comparing the row's field's
/// *textual rendering* against the literal (§4.3, §9 open question: kept
/// as specified).
pub fn eval(predicate: &Predicate, row: &Row) -> bool {
    predicate
        .conjuncts
        .iter()
        .all(|c| eval_conjunct(c, row))
}

fn eval_conjunct(conjunct: &Conjunct, row: &Row) -> bool {
    let rendered = field_render(row, &conjunct.column);
    match conjunct.op {
        Op::Eq => rendered == conjunct.literal,
        Op::Like => like_match(&rendered, &conjunct.literal),
    }
}

fn field_render(row: &Row, column: &str) -> String {
    match column {
        "id" => row.id.clone(),
        "deleted" => row.deleted.to_string(),
        "created_at" => row.created_at.to_rfc3339(),
        "updated_at" => row
            .updated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| Value::Null.render()),
        "deleted_at" => row
            .deleted_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| Value::Null.render()),
        other => row
            .fields
            .get(other)
            .map(|v| v.render())
            .unwrap_or_else(|| Value::Null.render()),
    }
}

/// `%` matches any sequence of characters (including empty); every other
/// character matches itself. The match is anchored to the full string.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_rec(&text, &pattern)
}

fn like_rec(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => {
            like_rec(text, &pattern[1..])
                || (!text.is_empty() && like_rec(&text[1..], pattern))
        }
        Some(c) => text.first() == Some(c) && like_rec(&text[1..], &pattern[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use indexmap::IndexMap;

    fn row_with(fields: &[(&str, Value)]) -> Row {
        let mut map = IndexMap::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v.clone());
        }
        Row {
            id: "1".to_string(),
            deleted: false,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
            fields: map,
        }
    }

    #[test]
    fn empty_predicate_matches_everything() {
        let pred = parse("").unwrap();
        assert!(eval(&pred, &row_with(&[])));
    }

    #[test]
    fn eq_matches_rendered_value() {
        let pred = parse("name = 'Bob'").unwrap();
        assert!(eval(&pred, &row_with(&[("name", Value::String("Bob".into()))])));
        assert!(!eval(&pred, &row_with(&[("name", Value::String("Alice".into()))])));
    }

    #[test]
    fn eq_on_int_column_compares_textual_render() {
        let pred = parse("total = 100").unwrap();
        assert!(eval(&pred, &row_with(&[("total", Value::Int(100))])));
    }

    #[test]
    fn and_conjunction_requires_all() {
        let pred = parse("a = '1' AND b = '2'").unwrap();
        assert!(eval(
            &pred,
            &row_with(&[("a", Value::String("1".into())), ("b", Value::String("2".into()))])
        ));
        assert!(!eval(
            &pred,
            &row_with(&[("a", Value::String("1".into())), ("b", Value::String("x".into()))])
        ));
    }

    #[test]
    fn like_percent_matches_any_sequence() {
        let pred = parse("name LIKE 'Al%'").unwrap();
        assert!(eval(&pred, &row_with(&[("name", Value::String("Alice".into()))])));
        assert!(!eval(&pred, &row_with(&[("name", Value::String("Bob".into()))])));
    }

    #[test]
    fn like_is_anchored_full_string() {
        let pred = parse("name LIKE '%ice'").unwrap();
        assert!(eval(&pred, &row_with(&[("name", Value::String("Alice".into()))])));
        assert!(!eval(&pred, &row_with(&[("name", Value::String("Alicent".into()))])));
    }

    #[test]
    fn missing_field_renders_as_nil() {
        let pred = parse("ghost = 'nil'").unwrap();
        assert!(eval(&pred, &row_with(&[])));
    }

    #[test]
    fn strip_literal_removes_quotes_and_whitespace() {
        assert_eq!(strip_literal("  'Bob'  "), "Bob");
        assert_eq!(strip_literal("\"Bob\""), "Bob");
        assert_eq!(strip_literal("Bob)"), "Bob");
        assert_eq!(strip_literal("Bob"), "Bob");
    }
}
