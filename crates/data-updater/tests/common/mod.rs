//! Common test utilities for data updater integration tests
//!
//! Builds a [`DataUpdater`] over in-memory storage and tables with a fixed clock, so
//! every test can assert on the exact calls made and on archive keys.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use data_updater::config::{StorageLayout, UpdaterConfig};
use data_updater::storage::memory::{MemoryObjectStore, StoreCall};
use data_updater::table::memory::{MemoryTableRegistry, RegistryCall};
use data_updater::{DataUpdater, StagedObject};
use std::sync::Arc;

pub const STAGE_BUCKET: &str = "data-lake-stage";
pub const CONFIG_BUCKET: &str = "data-lake-config";
pub const RULES_KEY: &str = "data_updater_config.json";
pub const FINAL_BUCKET: &str = "data-lake-final";

pub const RULES: &str = r#"{
    "Files": {
        "prices.csv": { "PrimaryKey": "product_id" },
        "stock.csv": { "PrimaryKey": ["warehouse", "product_id"] }
    }
}"#;

/// 2024-03-01 09:05:42 UTC
pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 42).unwrap()
}

pub struct TestEnvironment {
    pub store: Arc<MemoryObjectStore>,
    pub registry: Arc<MemoryTableRegistry>,
    pub config: UpdaterConfig,
}

impl TestEnvironment {
    /// Rules document in place, no tables.
    pub fn new() -> Self {
        Self::with_registry(MemoryTableRegistry::new())
    }

    pub fn with_registry(registry: MemoryTableRegistry) -> Self {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert(CONFIG_BUCKET, RULES_KEY, RULES.as_bytes().to_vec());

        Self {
            store,
            registry: Arc::new(registry),
            config: UpdaterConfig::new(CONFIG_BUCKET, RULES_KEY, FINAL_BUCKET),
        }
    }

    pub fn layout(mut self, layout: StorageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.batch_chunk_size = size;
        self
    }

    /// Stage a file and return the object the notification would name.
    pub fn stage(&self, key: &str, content: &str) -> StagedObject {
        self.store
            .insert(STAGE_BUCKET, key, content.as_bytes().to_vec());
        StagedObject::new(STAGE_BUCKET, key)
    }

    pub fn updater(&self) -> DataUpdater {
        DataUpdater::new(
            self.config.clone(),
            self.store.clone(),
            self.registry.clone(),
        )
        .with_clock(fixed_clock)
    }

    pub fn table_calls(&self) -> Vec<RegistryCall> {
        self.registry.calls()
    }

    /// Table calls other than the existence check
    pub fn table_writes(&self) -> Vec<RegistryCall> {
        self.registry
            .calls()
            .into_iter()
            .filter(|c| !matches!(c, RegistryCall::ListTables))
            .collect()
    }

    /// Copy calls, i.e. relocations, as `(dest_bucket, dest_key)`
    pub fn relocations(&self) -> Vec<(String, String)> {
        self.store
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Copy {
                    dest_bucket,
                    dest_key,
                    ..
                } => Some((dest_bucket, dest_key)),
                _ => None,
            })
            .collect()
    }

    pub fn final_object(&self, key: &str) -> Option<String> {
        self.store
            .object(FINAL_BUCKET, key)
            .map(|body| String::from_utf8_lossy(&body).into_owned())
    }
}

/// `count` rows of `product_id;name;price`
pub fn prices_file(count: usize) -> String {
    let mut lines = vec!["product_id;name;price".to_string()];
    lines.extend((0..count).map(|i| format!("p-{i:03};item {i};{}.99", i + 1)));
    lines.join("\n")
}
