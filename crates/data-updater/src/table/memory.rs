//! In-memory table registry for tests and offline runs
//!
//! Records every call and can be told to fail specific operations, which is how the
//! partial-failure paths of the record writer are exercised.

use async_trait::async_trait;
use data_updater_common::{Result, UpdaterError};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Item, TableRegistry};

/// A call received by [`MemoryTableRegistry`], in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    ListTables,
    CreateTable { table: String, key_attribute: String },
    WaitUntilQueryable { table: String },
    BatchWrite { table: String, items: usize },
    UpdateItem { table: String, key: String },
    Scan { table: String },
}

struct MemoryTable {
    key_attribute: String,
    items: BTreeMap<String, Item>,
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, MemoryTable>,
    calls: Vec<RegistryCall>,
    batch_writes: usize,
    updates: usize,
    fail_batch_at: Option<usize>,
    unprocessed_batch_at: Option<usize>,
    fail_update_at: Option<usize>,
    never_queryable: bool,
}

#[derive(Default)]
pub struct MemoryTableRegistry {
    state: Mutex<State>,
}

impl MemoryTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing table without recording a call.
    pub fn with_table(self, table: &str, key_attribute: &str) -> Self {
        self.lock().tables.insert(
            table.to_string(),
            MemoryTable {
                key_attribute: key_attribute.to_string(),
                items: BTreeMap::new(),
            },
        );
        self
    }

    /// Seed an item into an existing table without recording a call.
    pub fn seed_item(&self, table: &str, item: Item) {
        let mut state = self.lock();
        if let Some(t) = state.tables.get_mut(table) {
            if let Some(key) = item.get(&t.key_attribute).cloned() {
                t.items.insert(key, item);
            }
        }
    }

    /// Make the `n`th batch write (0-based) fail outright.
    pub fn fail_batch_at(self, n: usize) -> Self {
        self.lock().fail_batch_at = Some(n);
        self
    }

    /// Make the `n`th batch write (0-based) report every item unprocessed.
    pub fn unprocessed_batch_at(self, n: usize) -> Self {
        self.lock().unprocessed_batch_at = Some(n);
        self
    }

    /// Make the `n`th update (0-based) fail.
    pub fn fail_update_at(self, n: usize) -> Self {
        self.lock().fail_update_at = Some(n);
        self
    }

    /// Newly created tables never become queryable.
    pub fn never_queryable(self) -> Self {
        self.lock().never_queryable = true;
        self
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.lock().calls.clone()
    }

    /// Items of `table` ordered by key
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.items.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn missing_table(operation: &'static str, table: &str) -> UpdaterError {
    UpdaterError::table_registry(operation, table, "ResourceNotFoundException: table not found")
}

#[async_trait]
impl TableRegistry for MemoryTableRegistry {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::ListTables);
        Ok(state.tables.keys().cloned().collect())
    }

    async fn create_table(&self, table: &str, key_attribute: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::CreateTable {
            table: table.to_string(),
            key_attribute: key_attribute.to_string(),
        });

        if state.tables.contains_key(table) {
            return Err(UpdaterError::table_registry(
                "create",
                table,
                "ResourceInUseException: table already exists",
            ));
        }

        state.tables.insert(
            table.to_string(),
            MemoryTable {
                key_attribute: key_attribute.to_string(),
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn wait_until_queryable(&self, table: &str) -> Result<()> {
        let never = {
            let mut state = self.lock();
            state.calls.push(RegistryCall::WaitUntilQueryable {
                table: table.to_string(),
            });
            state.never_queryable
        };

        if never {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn batch_write(&self, table: &str, items: Vec<Item>) -> Result<usize> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::BatchWrite {
            table: table.to_string(),
            items: items.len(),
        });

        let index = state.batch_writes;
        state.batch_writes += 1;

        if state.fail_batch_at == Some(index) {
            return Err(UpdaterError::table_registry(
                "batch write",
                table,
                "ProvisionedThroughputExceededException: injected failure",
            ));
        }
        if state.unprocessed_batch_at == Some(index) {
            return Ok(items.len());
        }

        let t = state
            .tables
            .get_mut(table)
            .ok_or_else(|| missing_table("batch write", table))?;

        // The whole request is rejected when two puts share a key
        let mut keys = std::collections::BTreeSet::new();
        if items
            .iter()
            .filter_map(|item| item.get(&t.key_attribute))
            .any(|key| !keys.insert(key))
        {
            return Err(UpdaterError::table_registry(
                "batch write",
                table,
                "ValidationException: Provided list of item keys contains duplicates",
            ));
        }

        for item in items {
            if let Some(key) = item.get(&t.key_attribute).cloned() {
                t.items.insert(key, item);
            }
        }
        Ok(0)
    }

    async fn update_item(
        &self,
        table: &str,
        key_attribute: &str,
        key_value: &str,
        updates: &Item,
    ) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::UpdateItem {
            table: table.to_string(),
            key: key_value.to_string(),
        });

        let index = state.updates;
        state.updates += 1;

        if state.fail_update_at == Some(index) {
            return Err(UpdaterError::table_registry(
                "update",
                table,
                "ConditionalCheckFailedException: injected failure",
            ));
        }

        let t = state
            .tables
            .get_mut(table)
            .ok_or_else(|| missing_table("update", table))?;
        let item = t.items.entry(key_value.to_string()).or_default();
        item.insert(key_attribute.to_string(), key_value.to_string());
        item.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn scan(&self, table: &str, attributes: &[String]) -> Result<Vec<Item>> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::Scan {
            table: table.to_string(),
        });

        let t = state
            .tables
            .get(table)
            .ok_or_else(|| missing_table("scan", table))?;

        Ok(t.items
            .values()
            .map(|item| {
                if attributes.is_empty() {
                    item.clone()
                } else {
                    item.iter()
                        .filter(|(name, _)| attributes.contains(name))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                }
            })
            .collect())
    }
}
