/// Error type for migration operations.
///
/// Per-element and per-record anomalies (malformed JSON, missing sub-fields,
/// duplicate dimension values) are recovered where they happen and never show up
/// here. Only broken preconditions and I/O reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A table the run depends on does not exist
    #[error("Schema not bootstrapped: table '{0}' is missing. Run 'init' first.")]
    SchemaNotBootstrapped(String),

    /// A junction or detail row referenced a company that was never created
    #[error("Company {0} does not exist; the companies stage must run first")]
    MissingRecord(i64),

    /// Reading raw input failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line of raw input is not a JSON object
    #[error("Invalid raw record on line {line}: {source}")]
    InvalidRawRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Cleanup refused because the staging table still holds unmigrated rows
    #[error("Refusing to drop staging table: {0} raw records have no company row")]
    UnmigratedRecords(i64),
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
