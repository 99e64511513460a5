//! Error taxonomy for gitdb.

/// Errors surfaced to callers of the engine.
#[derive(Debug, thiserror::Error)]
pub enum GitDbError {
    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("unknown database: {0}")]
    UnknownDatabase(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("invalid literal {literal:?} for column kind {kind}")]
    InvalidLiteral { literal: String, kind: String },

    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("history store failure: {0}")]
    HistoryFailure(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for gitdb operations.
pub type Result<T> = std::result::Result<T, GitDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_column_message_contains_name() {
        let err = GitDbError::UnknownColumn("ghost".to_string());
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn invalid_literal_message_contains_kind_and_literal() {
        let err = GitDbError::InvalidLiteral {
            literal: "abc".to_string(),
            kind: "INT".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains("INT"));
    }
}
