//! In-memory object store for tests and offline runs

use async_trait::async_trait;
use data_updater_common::{Result, UpdaterError};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::ObjectStore;

/// A call received by [`MemoryObjectStore`], in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get { bucket: String, key: String },
    Put { bucket: String, key: String },
    Copy {
        source_bucket: String,
        source_key: String,
        dest_bucket: String,
        dest_key: String,
    },
    Delete { bucket: String, key: String },
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), Vec<u8>>,
    calls: Vec<StoreCall>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call.
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.lock()
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Every key currently stored in `bucket`
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(operation: &'static str, bucket: &str, key: &str) -> UpdaterError {
    UpdaterError::object_store(operation, bucket, key, "NoSuchKey: object does not exist")
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get", bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Copy {
            source_bucket: source_bucket.to_string(),
            source_key: source_key.to_string(),
            dest_bucket: dest_bucket.to_string(),
            dest_key: dest_key.to_string(),
        });
        let body = state
            .objects
            .get(&(source_bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| not_found("copy", source_bucket, source_key))?;
        state
            .objects
            .insert((dest_bucket.to_string(), dest_key.to_string()), body);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        state
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
