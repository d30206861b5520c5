//! AWS client wiring

use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use tracing::info;

use crate::config::{AwsConfig, UpdaterConfig};
use crate::ingest::DataUpdater;
use crate::storage::S3ObjectStore;
use crate::table::dynamo::DynamoTableRegistry;

/// Shared SDK configuration from the default provider chain plus overrides.
pub async fn load_sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &aws.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;

    info!(
        region = ?sdk_config.region(),
        endpoint = ?aws.endpoint,
        "AWS configuration loaded"
    );

    sdk_config
}

/// A [`DataUpdater`] backed by S3 and DynamoDB.
pub async fn connect(config: UpdaterConfig) -> DataUpdater {
    let sdk_config = load_sdk_config(&config.aws).await;

    let store = S3ObjectStore::from_sdk_config(&sdk_config, &config.aws);
    let registry = DynamoTableRegistry::new(
        aws_sdk_dynamodb::Client::new(&sdk_config),
        config.table_poll_interval(),
    );

    DataUpdater::new(config, Arc::new(store), Arc::new(registry))
}
