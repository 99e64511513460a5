//! The statement AST the parser produces and the executor consumes.

use gitdb_core::predicate::Predicate;

/// A raw `(name, kind)` pair as written in `CREATE TABLE`/`ALTER TABLE`.
/// Kind validation (§7 `UnsupportedType`) is deferred to the executor, so
/// the parser stays a pure syntax layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: String,
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

/// The column list a `SELECT` projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

/// One recognized statement form (§4.8). Anything that doesn't match one
/// of these is a `SyntaxError` at parse time.
#[derive(Debug, Clone)]
pub enum Statement {
    CreateDatabase {
        name: String,
    },
    DropDatabase {
        name: String,
    },
    UseDatabase {
        name: String,
    },
    CreateTable {
        table: String,
        columns: Vec<ColumnSpec>,
    },
    DropTable {
        table: String,
    },
    TruncateTable {
        table: String,
    },
    AlterAddColumn {
        table: String,
        column: ColumnSpec,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<String>,
    },
    Update {
        table: String,
        assignments: Vec<(String, String)>,
        filter: Predicate,
    },
    Delete {
        table: String,
        filter: Predicate,
    },
    Select {
        table: String,
        distinct: bool,
        projection: Projection,
        filter: Predicate,
        order_by: Option<(String, OrderDir)>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
    Join {
        left_table: String,
        right_table: String,
        left_column: String,
        right_column: String,
    },
}
