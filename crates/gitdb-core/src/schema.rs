//! Table schemas: an ordered sequence of user-declared columns.

use serde::{Deserialize, Serialize};

use crate::error::{GitDbError, Result};
use crate::value::ColumnKind;

/// A single declared column: `(name, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

/// An ordered, declaration-order sequence of columns for one table.
///
/// Persisted verbatim as `<table>/_schema.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema from columns, rejecting empty or duplicate names.
    pub fn new(columns: Vec<Column>) -> Result<Schema> {
        let mut seen = std::collections::HashSet::new();
        for col in &columns {
            if col.name.is_empty() {
                return Err(GitDbError::SyntaxError("empty column name".to_string()));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(GitDbError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column's kind by name.
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Append a column, rejecting a name collision.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(GitDbError::DuplicateColumn(column.name));
        }
        self.columns.push(column);
        Ok(())
    }
}
