use thiserror::Error;

/// All possible errors raised by the table store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Table `{0}` already exists")]
    AlreadyExists(String),

    #[error("Table `{0}` not found")]
    NotFound(String),

    #[error("Row {index} has {actual} values, but `{table}` has {expected} columns")]
    Shape {
        table: String,
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid schema for `{table}`: {reason}")]
    Schema { table: String, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Refusing to update `{0}` without a condition")]
    MissingCondition(String),

    #[error("Column `{column}` does not exist in `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("No columns to update in `{0}`")]
    NoAssignments(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
