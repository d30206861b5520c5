//! Ingestion rules document
//!
//! A JSON object fetched from the config bucket once per invocation:
//!
//! ```json
//! {
//!   "Files": {
//!     "prices.csv": { "PrimaryKey": "product_id" },
//!     "stock.csv":  { "PrimaryKey": ["warehouse", "product_id"] }
//!   }
//! }
//! ```

use data_updater_common::{Result, UpdaterError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

use crate::storage::ObjectStore;

/// Primary key columns, given either as one name or as an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    pub fn columns(&self) -> Vec<String> {
        match self {
            PrimaryKey::Single(column) => vec![column.clone()],
            PrimaryKey::Composite(columns) => columns.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRule {
    #[serde(rename = "PrimaryKey")]
    pub primary_key: PrimaryKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRules {
    #[serde(rename = "Files")]
    pub files: BTreeMap<String, FileRule>,
}

impl IngestionRules {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Rule for an object key, matched exactly.
    pub fn rule_for(&self, file_name: &str) -> Option<&FileRule> {
        self.files.get(file_name)
    }

    /// Fetch and parse the rules document.
    #[instrument(skip(store))]
    pub async fn fetch(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<Self> {
        let body = store.get(bucket, key).await.map_err(|e| {
            error!(error = %e, "Config file {} could not be pulled from the {} bucket", key, bucket);
            UpdaterError::ConfigFetch {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: Box::new(e),
            }
        })?;

        let rules = Self::from_slice(&body).inspect_err(|e| {
            error!(error = %e, "Config file {} is not a valid rules document", key);
        })?;

        debug!(files = rules.files.len(), "Ingestion rules loaded");

        Ok(rules)
    }
}
