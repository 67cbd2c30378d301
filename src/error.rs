use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("table {table} has no column {column}")]
    SchemaMismatch { table: String, column: String },

    #[error("row {row} has {found} values, expected {expected}")]
    RowArity {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("settings value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a single-record lookup came back empty.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("no record with {column} = {key:?}")]
    NotFound { column: String, key: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("table {table} has no key column {column}")]
    MissingKeyColumn { table: String, column: String },

    #[error("lookup failed: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LookupError {
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::NotFound { .. } => "not_found",
            LookupError::UnknownTable(_) => "unknown_table",
            LookupError::MissingKeyColumn { .. } => "missing_key_column",
            LookupError::Storage(_) => "storage_error",
        }
    }
}
