//! Recursive-descent parsing of the closed statement grammar (§4.8).
//!
//! Each statement form is a short, disjoint production; the original
//! implementation's regex cascade is kept as a hand-written tokenizer for
//! maintainability (per spec.md §9's own recommendation), trying each
//! form in turn and returning `SyntaxError` when none match.

use gitdb_core::error::{GitDbError, Result};
use gitdb_core::predicate;

use crate::ast::{ColumnSpec, OrderDir, Projection, Statement};

/// Parse one statement fragment (already split off a `;`-batch and
/// trimmed).
pub fn parse_statement(stmt: &str) -> Result<Statement> {
    let stmt = stmt.trim();

    if let Some(rest) = strip_prefix_ci(stmt, "CREATE DATABASE ") {
        return Ok(Statement::CreateDatabase {
            name: ident(rest)?,
        });
    }
    if let Some(rest) = strip_prefix_ci(stmt, "DROP DATABASE ") {
        return Ok(Statement::DropDatabase { name: ident(rest)? });
    }
    if let Some(rest) = strip_prefix_ci(stmt, "USE DATABASE ") {
        return Ok(Statement::UseDatabase { name: ident(rest)? });
    }
    if let Some(rest) = strip_prefix_ci(stmt, "CREATE TABLE ") {
        return parse_create_table(rest);
    }
    if let Some(rest) = strip_prefix_ci(stmt, "DROP TABLE ") {
        return Ok(Statement::DropTable { table: ident(rest)? });
    }
    if let Some(rest) = strip_prefix_ci(stmt, "TRUNCATE TABLE ") {
        return Ok(Statement::TruncateTable {
            table: ident(rest)?,
        });
    }
    if let Some(rest) = strip_prefix_ci(stmt, "ALTER TABLE ") {
        return parse_alter_table(rest);
    }
    if let Some(rest) = strip_prefix_ci(stmt, "INSERT INTO ") {
        return parse_insert(rest);
    }
    if let Some(rest) = strip_prefix_ci(stmt, "UPDATE ") {
        return parse_update(rest);
    }
    if let Some(rest) = strip_prefix_ci(stmt, "DELETE FROM ") {
        return parse_delete(rest);
    }
    if let Some(rest) = strip_prefix_ci(stmt, "SELECT ") {
        return parse_select(rest);
    }

    Err(syntax_error(stmt))
}

fn syntax_error(stmt: &str) -> GitDbError {
    GitDbError::SyntaxError(stmt.to_string())
}

fn ident(s: &str) -> Result<String> {
    let trimmed = s.trim().trim_end_matches(';');
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return Err(syntax_error(s));
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive `starts_with`, returning the remainder (not trimmed).
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() < prefix.len() {
        return None;
    }
    if s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Case-insensitive substring search.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack_upper = haystack.to_ascii_uppercase();
    let needle_upper = needle.to_ascii_uppercase();
    haystack_upper.find(&needle_upper)
}

/// Split a list on `sep` at the top level — i.e. not inside a `'`/`"`
/// quoted span.
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in s.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == sep => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            None => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// Extract the first balanced `(...)` group, returning its inner text and
/// whatever trails the closing paren.
fn extract_parens(s: &str) -> Result<(String, String)> {
    let start = s.find('(').ok_or_else(|| syntax_error(s))?;
    let bytes: Vec<char> = s.chars().collect();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut end = None;
    for (i, ch) in bytes.iter().enumerate().skip(start) {
        match quote {
            Some(q) if *ch == q => quote = None,
            Some(_) => {}
            None if *ch == '\'' || *ch == '"' => quote = Some(*ch),
            None if *ch == '(' => depth += 1,
            None if *ch == ')' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            None => {}
        }
    }
    let end = end.ok_or_else(|| syntax_error(s))?;
    let inner: String = bytes[start + 1..end].iter().collect();
    let rest: String = bytes[end + 1..].iter().collect();
    Ok((inner, rest))
}

fn parse_column_spec(text: &str) -> Result<ColumnSpec> {
    let text = text.trim();
    let mut parts = text.split_whitespace();
    let name = parts.next().ok_or_else(|| syntax_error(text))?.to_string();
    let kind = parts.next().ok_or_else(|| syntax_error(text))?.to_string();
    if parts.next().is_some() {
        return Err(syntax_error(text));
    }
    Ok(ColumnSpec { name, kind })
}

fn parse_create_table(rest: &str) -> Result<Statement> {
    let table_end = rest.find('(').ok_or_else(|| syntax_error(rest))?;
    let table = ident(&rest[..table_end])?;
    let (inner, _tail) = extract_parens(&rest[table_end..])?;
    let columns = split_top_level(&inner, ',')
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| parse_column_spec(&s))
        .collect::<Result<Vec<_>>>()?;
    if columns.is_empty() {
        return Err(syntax_error(rest));
    }
    Ok(Statement::CreateTable { table, columns })
}

fn parse_alter_table(rest: &str) -> Result<Statement> {
    let add_pos = find_ci(rest, " ADD COLUMN ").ok_or_else(|| syntax_error(rest))?;
    let table = ident(&rest[..add_pos])?;
    let column_text = &rest[add_pos + " ADD COLUMN ".len()..];
    let column = parse_column_spec(column_text.trim_end_matches(';'))?;
    Ok(Statement::AlterAddColumn { table, column })
}

fn parse_insert(rest: &str) -> Result<Statement> {
    let table_end = rest.find('(').ok_or_else(|| syntax_error(rest))?;
    let table = ident(&rest[..table_end])?;
    let (columns_inner, after_columns) = extract_parens(&rest[table_end..])?;
    let columns: Vec<String> = split_top_level(&columns_inner, ',')
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let values_pos = find_ci(&after_columns, "VALUES").ok_or_else(|| syntax_error(rest))?;
    let (values_inner, _) = extract_parens(&after_columns[values_pos..])?;
    let values: Vec<String> = split_top_level(&values_inner, ',')
        .into_iter()
        .map(|s| predicate::strip_literal(&s))
        .collect();

    if columns.len() != values.len() {
        return Err(syntax_error(rest));
    }
    Ok(Statement::Insert {
        table,
        columns,
        values,
    })
}

fn parse_update(rest: &str) -> Result<Statement> {
    let set_pos = find_ci(rest, " SET ").ok_or_else(|| syntax_error(rest))?;
    let table = ident(&rest[..set_pos])?;
    let after_set = &rest[set_pos + 5..];
    let where_pos = find_ci(after_set, " WHERE ").ok_or_else(|| syntax_error(rest))?;
    let assignments_text = &after_set[..where_pos];
    let where_text = &after_set[where_pos + 7..];

    let assignments = split_top_level(assignments_text, ',')
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|part| {
            let eq = part.find('=').ok_or_else(|| syntax_error(&part))?;
            let col = part[..eq].trim().to_string();
            let lit = predicate::strip_literal(&part[eq + 1..]);
            Ok((col, lit))
        })
        .collect::<Result<Vec<_>>>()?;

    let filter = predicate::parse(where_text).ok_or_else(|| syntax_error(where_text))?;
    Ok(Statement::Update {
        table,
        assignments,
        filter,
    })
}

fn parse_delete(rest: &str) -> Result<Statement> {
    let where_pos = find_ci(rest, " WHERE ").ok_or_else(|| syntax_error(rest))?;
    let table = ident(&rest[..where_pos])?;
    let where_text = &rest[where_pos + 7..];
    let filter = predicate::parse(where_text).ok_or_else(|| syntax_error(where_text))?;
    Ok(Statement::Delete { table, filter })
}

/// Normalize a clause tail to have exactly one leading space when
/// non-empty, so keyword searches can uniformly look for " KEYWORD ".
fn pad(s: &str) -> String {
    let t = s.trim();
    if t.is_empty() {
        String::new()
    } else {
        format!(" {t}")
    }
}

fn parse_select(rest: &str) -> Result<Statement> {
    let (distinct, rest) = match strip_prefix_ci(rest, "DISTINCT ") {
        Some(r) => (true, r),
        None => (false, rest),
    };

    let from_pos = find_ci(rest, " FROM ").ok_or_else(|| syntax_error(rest))?;
    let cols_text = rest[..from_pos].trim();
    let projection = if cols_text == "*" {
        Projection::All
    } else {
        Projection::Columns(
            split_top_level(cols_text, ',')
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    };

    let after_from = rest[from_pos + 6..].trim();

    if let Some(join_pos) = find_ci(after_from, " JOIN ") {
        return parse_join(&after_from[..join_pos], &after_from[join_pos + 6..]);
    }

    let table_end = after_from
        .find(|c: char| c.is_whitespace())
        .unwrap_or(after_from.len());
    let table = ident(&after_from[..table_end])?;
    // Keep a single leading space on `tail` whenever it's non-empty, so
    // every keyword search below can consistently look for " KEYWORD ".
    let mut tail = pad(&after_from[table_end..]);

    let mut filter = predicate::Predicate::default();
    if let Some(where_pos) = find_ci(&tail, " WHERE ") {
        let order_pos = find_ci(&tail, " ORDER BY ");
        let limit_pos = find_ci(&tail, " LIMIT ");
        let offset_pos = find_ci(&tail, " OFFSET ");
        let end = [order_pos, limit_pos, offset_pos]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(tail.len());
        let where_text = tail[where_pos + 7..end].to_string();
        filter = predicate::parse(&where_text).ok_or_else(|| syntax_error(&where_text))?;
        tail = pad(&tail[end..]);
    } else if find_ci(&tail, "WHERE").is_some() {
        // `WHERE` present but not correctly spaced — malformed clause.
        return Err(syntax_error(&tail));
    }

    let mut order_by = None;
    if let Some(order_pos) = find_ci(&tail, " ORDER BY ") {
        let limit_pos = find_ci(&tail, " LIMIT ");
        let offset_pos = find_ci(&tail, " OFFSET ");
        let end = [limit_pos, offset_pos].into_iter().flatten().min().unwrap_or(tail.len());
        let order_text = tail[order_pos + 10..end].trim().to_string();
        let mut parts = order_text.split_whitespace();
        let column = parts.next().ok_or_else(|| syntax_error(&order_text))?.to_string();
        let dir = match parts.next().map(|s| s.to_ascii_uppercase()) {
            None => OrderDir::Asc,
            Some(d) if d == "ASC" => OrderDir::Asc,
            Some(d) if d == "DESC" => OrderDir::Desc,
            _ => return Err(syntax_error(&order_text)),
        };
        order_by = Some((column, dir));
        tail = pad(&tail[end..]);
    }

    let mut limit = None;
    if let Some(limit_pos) = find_ci(&tail, " LIMIT ") {
        let offset_pos = find_ci(&tail, " OFFSET ");
        let end = offset_pos.unwrap_or(tail.len());
        let n = tail[limit_pos + 7..end].trim().to_string();
        limit = Some(n.parse::<usize>().map_err(|_| syntax_error(&n))?);
        tail = pad(&tail[end..]);
    }

    let mut offset = None;
    if let Some(offset_pos) = find_ci(&tail, " OFFSET ") {
        let n = tail[offset_pos + 8..].trim().trim_end_matches(';').to_string();
        offset = Some(n.parse::<usize>().map_err(|_| syntax_error(&n))?);
    }

    Ok(Statement::Select {
        table,
        distinct,
        projection,
        filter,
        order_by,
        limit,
        offset,
    })
}

fn parse_join(left_table_text: &str, after_join: &str) -> Result<Statement> {
    let left_table = ident(left_table_text)?;
    let on_pos = find_ci(after_join, " ON ").ok_or_else(|| syntax_error(after_join))?;
    let right_table = ident(&after_join[..on_pos])?;
    let condition = after_join[on_pos + 4..].trim().trim_end_matches(';');
    let eq_pos = condition.find('=').ok_or_else(|| syntax_error(condition))?;
    let (left_qual, right_qual) = (condition[..eq_pos].trim(), condition[eq_pos + 1..].trim());
    let left_column = qualified_column(left_qual)?;
    let right_column = qualified_column(right_qual)?;
    Ok(Statement::Join {
        left_table,
        right_table,
        left_column,
        right_column,
    })
}

fn qualified_column(text: &str) -> Result<String> {
    let dot = text.find('.').ok_or_else(|| syntax_error(text))?;
    Ok(text[dot + 1..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_database() {
        assert!(matches!(
            parse_statement("CREATE DATABASE d").unwrap(),
            Statement::CreateDatabase { name } if name == "d"
        ));
    }

    #[test]
    fn parses_create_table_with_columns() {
        let stmt = parse_statement("CREATE TABLE t(x INT, y STRING)").unwrap();
        match stmt {
            Statement::CreateTable { table, columns } => {
                assert_eq!(table, "t");
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[0].name, "x");
                assert_eq!(columns[0].kind, "INT");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_alter_add_column() {
        let stmt = parse_statement("ALTER TABLE users ADD COLUMN nickname STRING").unwrap();
        match stmt {
            Statement::AlterAddColumn { table, column } => {
                assert_eq!(table, "users");
                assert_eq!(column.name, "nickname");
                assert_eq!(column.kind, "STRING");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_insert() {
        let stmt = parse_statement("INSERT INTO t (x) VALUES ('1')").unwrap();
        match stmt {
            Statement::Insert { table, columns, values } => {
                assert_eq!(table, "t");
                assert_eq!(columns, vec!["x"]);
                assert_eq!(values, vec!["1"]);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_update_with_where() {
        let stmt = parse_statement("UPDATE users SET nickname='bobby' WHERE name = 'Bob'").unwrap();
        match stmt {
            Statement::Update { table, assignments, filter } => {
                assert_eq!(table, "users");
                assert_eq!(assignments, vec![("nickname".to_string(), "bobby".to_string())]);
                assert_eq!(filter.conjuncts.len(), 1);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_delete() {
        let stmt = parse_statement("DELETE FROM users WHERE id='1'").unwrap();
        assert!(matches!(stmt, Statement::Delete { table, .. } if table == "users"));
    }

    #[test]
    fn parses_select_star() {
        let stmt = parse_statement("SELECT * FROM t").unwrap();
        match stmt {
            Statement::Select { table, projection, .. } => {
                assert_eq!(table, "t");
                assert_eq!(projection, Projection::All);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_select_with_all_clauses() {
        let stmt = parse_statement(
            "SELECT DISTINCT name FROM users WHERE x = '1' ORDER BY name DESC LIMIT 5 OFFSET 10",
        )
        .unwrap();
        match stmt {
            Statement::Select {
                distinct,
                projection,
                order_by,
                limit,
                offset,
                ..
            } => {
                assert!(distinct);
                assert_eq!(projection, Projection::Columns(vec!["name".to_string()]));
                assert_eq!(order_by, Some(("name".to_string(), OrderDir::Desc)));
                assert_eq!(limit, Some(5));
                assert_eq!(offset, Some(10));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_join() {
        let stmt = parse_statement("SELECT * FROM users JOIN orders ON users.id=orders.user_id").unwrap();
        match stmt {
            Statement::Join {
                left_table,
                right_table,
                left_column,
                right_column,
            } => {
                assert_eq!(left_table, "users");
                assert_eq!(right_table, "orders");
                assert_eq!(left_column, "id");
                assert_eq!(right_column, "user_id");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unrecognized_statement_is_syntax_error() {
        assert!(matches!(
            parse_statement("WHERE nickname IN (SELECT nickname FROM nicknames)"),
            Err(GitDbError::SyntaxError(_))
        ));
    }

    #[test]
    fn garbage_is_syntax_error() {
        assert!(matches!(parse_statement("BOGUS STATEMENT"), Err(GitDbError::SyntaxError(_))));
    }
}
