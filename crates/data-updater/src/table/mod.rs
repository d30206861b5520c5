//! Key-value table registry
//!
//! [`TableRegistry`] covers everything the updater asks of the table service:
//! listing, creation, the queryable wait, batch puts, single-item updates and scans.
//! Items are flat maps of string attributes.

use async_trait::async_trait;
use data_updater_common::{Result, UpdaterError};
use std::collections::BTreeMap;

pub mod dynamo;
pub mod memory;

/// A table item: attribute name to string value
pub type Item = BTreeMap<String, String>;

/// Shortest and longest table names DynamoDB accepts.
const TABLE_NAME_LEN: std::ops::RangeInclusive<usize> = 3..=255;

#[async_trait]
pub trait TableRegistry: Send + Sync {
    /// Names of every table visible to the caller.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Create a table with a single string partition key.
    async fn create_table(&self, table: &str, key_attribute: &str) -> Result<()>;

    /// Resolve once the table accepts reads and writes.
    ///
    /// Implementations poll for as long as it takes; callers impose the ceiling.
    async fn wait_until_queryable(&self, table: &str) -> Result<()>;

    /// Put every item in one grouped request. Returns the number of items the
    /// service left unprocessed.
    async fn batch_write(&self, table: &str, items: Vec<Item>) -> Result<usize>;

    /// Upsert one item, overwriting each attribute in `updates`.
    async fn update_item(
        &self,
        table: &str,
        key_attribute: &str,
        key_value: &str,
        updates: &Item,
    ) -> Result<()>;

    /// Read every item, projected onto `attributes` (all attributes when empty).
    async fn scan(&self, table: &str, attributes: &[String]) -> Result<Vec<Item>>;
}

/// Check a derived name against DynamoDB's table naming rules.
pub fn validate_table_name(name: &str) -> Result<()> {
    if !TABLE_NAME_LEN.contains(&name.len()) {
        return Err(UpdaterError::InvalidTableName {
            name: name.to_string(),
            reason: format!(
                "length must be between {} and {} characters",
                TABLE_NAME_LEN.start(),
                TABLE_NAME_LEN.end()
            ),
        });
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(UpdaterError::InvalidTableName {
            name: name.to_string(),
            reason: format!("character '{}' is not allowed", c),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_names() {
        assert!(validate_table_name("data_updater_prices").is_ok());
        assert!(validate_table_name("data_updater_prices-2024.v1").is_ok());
    }

    #[test]
    fn test_invalid_table_names() {
        assert!(validate_table_name("ab").is_err());
        assert!(validate_table_name(&"a".repeat(256)).is_err());

        let err = validate_table_name("data_updater_reports/prices").unwrap_err();
        assert!(err.to_string().contains("'/'"));
        assert!(validate_table_name("data_updater_my prices").is_err());
    }
}
