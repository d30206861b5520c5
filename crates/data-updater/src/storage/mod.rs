//! Object storage
//!
//! [`ObjectStore`] is the narrow contract the pipeline needs from S3: fetch, put,
//! copy and delete. [`S3ObjectStore`] is the production implementation and
//! [`memory::MemoryObjectStore`] backs tests and offline runs.

use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client};
use data_updater_common::{Result, UpdaterError};
use tracing::{debug, error, info, instrument};

use crate::config::AwsConfig;

pub mod memory;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's full body.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Create or overwrite an object.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;

    /// Server-side copy, possibly across buckets.
    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Copy then delete the source. Not atomic: a failed delete leaves both copies.
    async fn move_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        self.copy(source_bucket, source_key, dest_bucket, dest_key)
            .await?;
        self.delete(source_bucket, source_key).await
    }
}

#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build the S3 client from shared SDK config, honouring path-style addressing.
    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, aws: &AwsConfig) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(aws.path_style)
            .build();

        debug!(path_style = aws.path_style, "S3 client initialized");

        Self::new(Client::from_conf(s3_config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        debug!("Downloading s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| UpdaterError::object_store("get", bucket, key, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| UpdaterError::object_store("read body", bucket, key, e))?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), bucket, key);

        Ok(data)
    }

    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/csv")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Object could not be put to the {} bucket", bucket);
                UpdaterError::object_store("put", bucket, key, e)
            })?;

        info!("Successfully uploaded to s3://{}/{}", bucket, key);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        let copy_source = format!("{}/{}", source_bucket, urlencoding::encode(source_key));

        self.client
            .copy_object()
            .copy_source(&copy_source)
            .bucket(dest_bucket)
            .key(dest_key)
            .send()
            .await
            .map_err(|e| UpdaterError::object_store("copy", source_bucket, source_key, e))?;

        info!(
            "Successfully copied s3://{}/{} to s3://{}/{}",
            source_bucket, source_key, dest_bucket, dest_key
        );

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| UpdaterError::object_store("delete", bucket, key, e))?;

        info!("Successfully deleted s3://{}/{}", bucket, key);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory::{MemoryObjectStore, StoreCall};

    #[tokio::test]
    async fn test_move_copies_then_deletes() {
        let store = MemoryObjectStore::new();
        store.insert("stage", "prices.csv", b"id;price".to_vec());

        store
            .move_object("stage", "prices.csv", "final", "prices.csv")
            .await
            .expect("move should succeed");

        assert!(store.object("stage", "prices.csv").is_none());
        assert_eq!(store.object("final", "prices.csv"), Some(b"id;price".to_vec()));
        assert!(matches!(
            store.calls().as_slice(),
            [StoreCall::Copy { .. }, StoreCall::Delete { .. }]
        ));
    }

    #[tokio::test]
    async fn test_move_missing_source_fails_without_delete() {
        let store = MemoryObjectStore::new();

        let err = store
            .move_object("stage", "absent.csv", "final", "absent.csv")
            .await
            .unwrap_err();

        assert!(matches!(err, UpdaterError::ObjectStore { operation: "copy", .. }));
        assert!(!store
            .calls()
            .iter()
            .any(|c| matches!(c, StoreCall::Delete { .. })));
    }
}
