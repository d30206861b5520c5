//! Configuration management
//!
//! All settings are read once, at startup, into [`UpdaterConfig`] and passed down
//! explicitly. Nothing below the entrypoint touches the process environment.

use data_updater_common::{Result, UpdaterError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::table::dynamo::MAX_BATCH_WRITE_ITEMS;

// ============================================================================
// Defaults
// ============================================================================

/// Prefix prepended to the file stem to form the table name.
pub const DEFAULT_TABLE_PREFIX: &str = "data_updater_";

/// Default number of put items per batch write.
pub const DEFAULT_BATCH_CHUNK_SIZE: usize = MAX_BATCH_WRITE_ITEMS;

/// Default ceiling for a new table to become queryable, in seconds.
pub const DEFAULT_TABLE_WAIT_TIMEOUT_SECS: u64 = 300;

/// Default delay between table status polls, in milliseconds.
pub const DEFAULT_TABLE_POLL_INTERVAL_MS: u64 = 2_000;

/// How rows are laid out as table items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageLayout {
    /// One string attribute per header column
    #[default]
    Columns,
    /// The key attribute plus a single `record_value` attribute
    Record,
}

impl std::str::FromStr for StorageLayout {
    type Err = UpdaterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "columns" => Ok(StorageLayout::Columns),
            "record" => Ok(StorageLayout::Record),
            _ => Err(UpdaterError::Config(format!("Invalid storage layout: {}", s))),
        }
    }
}

impl std::fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageLayout::Columns => write!(f, "columns"),
            StorageLayout::Record => write!(f, "record"),
        }
    }
}

/// Data updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Bucket holding the ingestion rules document
    pub config_bucket: String,
    /// Key of the ingestion rules document
    pub config_file_name: String,
    /// Bucket processed files are moved to
    pub final_bucket: String,
    pub table_prefix: String,
    pub batch_chunk_size: usize,
    pub table_wait_timeout_secs: u64,
    pub table_poll_interval_ms: u64,
    pub layout: StorageLayout,
    /// Regenerate the full-table CSV in the final bucket after an incremental update
    pub export_on_update: bool,
    pub aws: AwsConfig,
}

/// AWS client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region override; the SDK default chain is used when unset
    pub region: Option<String>,
    /// Endpoint override for LocalStack or MinIO
    pub endpoint: Option<String>,
    /// Path-style S3 addressing (required by most local S3 emulators)
    pub path_style: bool,
}

impl UpdaterConfig {
    /// Configuration with the three required settings and defaults for the rest.
    pub fn new(
        config_bucket: impl Into<String>,
        config_file_name: impl Into<String>,
        final_bucket: impl Into<String>,
    ) -> Self {
        Self {
            config_bucket: config_bucket.into(),
            config_file_name: config_file_name.into(),
            final_bucket: final_bucket.into(),
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            batch_chunk_size: DEFAULT_BATCH_CHUNK_SIZE,
            table_wait_timeout_secs: DEFAULT_TABLE_WAIT_TIMEOUT_SECS,
            table_poll_interval_ms: DEFAULT_TABLE_POLL_INTERVAL_MS,
            layout: StorageLayout::default(),
            export_on_update: true,
            aws: AwsConfig::default(),
        }
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// `CONFIG_BUCKET`, `CONFIG_FILE_NAME` and `FINAL_BUCKET` are required.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::new(
            required("CONFIG_BUCKET")?,
            required("CONFIG_FILE_NAME")?,
            required("FINAL_BUCKET")?,
        );

        if let Ok(prefix) = std::env::var("TABLE_PREFIX") {
            config.table_prefix = prefix;
        }
        if let Some(size) = parsed("BATCH_CHUNK_SIZE")? {
            config.batch_chunk_size = size;
        }
        if let Some(secs) = parsed("TABLE_WAIT_TIMEOUT_SECS")? {
            config.table_wait_timeout_secs = secs;
        }
        if let Some(ms) = parsed("TABLE_POLL_INTERVAL_MS")? {
            config.table_poll_interval_ms = ms;
        }
        if let Ok(layout) = std::env::var("STORAGE_LAYOUT") {
            config.layout = layout.parse()?;
        }
        if let Some(export) = parsed("EXPORT_ON_UPDATE")? {
            config.export_on_update = export;
        }

        config.aws = AwsConfig {
            region: std::env::var("AWS_REGION").ok(),
            endpoint: std::env::var("AWS_ENDPOINT_URL").ok(),
            path_style: parsed("S3_PATH_STYLE")?.unwrap_or(false),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("CONFIG_BUCKET", &self.config_bucket),
            ("CONFIG_FILE_NAME", &self.config_file_name),
            ("FINAL_BUCKET", &self.final_bucket),
        ] {
            if value.trim().is_empty() {
                return Err(UpdaterError::Config(format!("{} cannot be empty", name)));
            }
        }

        if self.batch_chunk_size == 0 || self.batch_chunk_size > MAX_BATCH_WRITE_ITEMS {
            return Err(UpdaterError::Config(format!(
                "BATCH_CHUNK_SIZE must be between 1 and {}, got {}",
                MAX_BATCH_WRITE_ITEMS, self.batch_chunk_size
            )));
        }

        if self.table_wait_timeout_secs == 0 {
            return Err(UpdaterError::Config(
                "TABLE_WAIT_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.table_poll_interval_ms == 0 {
            return Err(UpdaterError::Config(
                "TABLE_POLL_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn table_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.table_wait_timeout_secs)
    }

    pub fn table_poll_interval(&self) -> Duration {
        Duration::from_millis(self.table_poll_interval_ms)
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| UpdaterError::Config(format!("{} must be set", name)))
}

fn parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| UpdaterError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
