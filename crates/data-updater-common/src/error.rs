//! Error types for the data updater

use std::time::Duration;
use thiserror::Error;

/// Boxed provider error carried as the source of an [`UpdaterError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for data updater operations
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Failures of the row codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("File is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("File has no header line")]
    MissingHeader,

    #[error("Row on line {line} has {actual} columns, header has {expected}")]
    RowTooShort {
        line: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Column index {index} out of range for a row of {width} values")]
    IndexOutOfRange { index: usize, width: usize },

    #[error("Key column '{0}' not found in header")]
    UnknownColumn(String),

    #[error("Key column '{0}' is listed more than once")]
    DuplicateColumn(String),

    #[error("At least one key column is required")]
    NoKeyColumns,
}

/// Main error type for the data updater
///
/// One variant per failure origin. Provider failures keep the SDK error as their
/// source so the full chain is visible in logs.
#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file {key} could not be pulled from the {bucket} bucket")]
    ConfigFetch {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid trigger event: {0}")]
    InvalidEvent(String),

    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    #[error("Object store {operation} failed for s3://{bucket}/{key}")]
    ObjectStore {
        operation: &'static str,
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Table registry {operation} failed for table {table}")]
    TableRegistry {
        operation: &'static str,
        table: String,
        #[source]
        source: BoxError,
    },

    #[error("Table {table} was not queryable after {waited:?}")]
    TableWaitTimeout { table: String, waited: Duration },

    #[error("Row codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Bulk load into {table} stopped after {written} items, {failed} items not written")]
    BulkLoad {
        table: String,
        written: usize,
        failed: usize,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Table {table} partially updated: {applied} rows applied before key '{key}' failed")]
    Update {
        table: String,
        applied: usize,
        key: String,
        #[source]
        source: BoxError,
    },
}

impl UpdaterError {
    pub fn object_store(
        operation: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        UpdaterError::ObjectStore {
            operation,
            bucket: bucket.into(),
            key: key.into(),
            source: source.into(),
        }
    }

    pub fn table_registry(
        operation: &'static str,
        table: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        UpdaterError::TableRegistry {
            operation,
            table: table.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_provider_source_is_preserved() {
        let err = UpdaterError::object_store("copy", "final", "a.csv", "access denied");
        assert_eq!(err.to_string(), "Object store copy failed for s3://final/a.csv");
        assert_eq!(err.source().unwrap().to_string(), "access denied");
    }

    #[test]
    fn test_codec_error_converts() {
        let err: UpdaterError = CodecError::UnknownColumn("id".to_string()).into();
        assert!(matches!(err, UpdaterError::Codec(CodecError::UnknownColumn(_))));
        assert_eq!(err.to_string(), "Row codec error: Key column 'id' not found in header");
    }
}
