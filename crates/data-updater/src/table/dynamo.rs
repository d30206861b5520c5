//! DynamoDB-backed table registry

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType, PutRequest,
        ScalarAttributeType, TableStatus, WriteRequest,
    },
    Client,
};
use data_updater_common::{Result, UpdaterError};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{Item, TableRegistry};

/// Items accepted by a single `BatchWriteItem` request.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

#[derive(Debug, Clone)]
pub struct DynamoTableRegistry {
    client: Client,
    poll_interval: Duration,
}

impl DynamoTableRegistry {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }
}

fn to_attributes(item: Item) -> HashMap<String, AttributeValue> {
    item.into_iter()
        .map(|(name, value)| (name, AttributeValue::S(value)))
        .collect()
}

fn from_attributes(attributes: HashMap<String, AttributeValue>) -> Item {
    attributes
        .into_iter()
        .filter_map(|(name, value)| match value {
            AttributeValue::S(s) => Some((name, s)),
            AttributeValue::N(n) => Some((name, n)),
            AttributeValue::Bool(b) => Some((name, b.to_string())),
            other => {
                debug!(attribute = %name, value = ?other, "Skipping non-scalar attribute");
                None
            },
        })
        .collect()
}

#[async_trait]
impl TableRegistry for DynamoTableRegistry {
    #[instrument(skip(self))]
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(|e| UpdaterError::table_registry("list", "*", e))?;

            names.extend(output.table_names.unwrap_or_default());

            start = output.last_evaluated_table_name;
            if start.is_none() {
                break;
            }
        }

        debug!(count = names.len(), "Listed tables");

        Ok(names)
    }

    #[instrument(skip(self))]
    async fn create_table(&self, table: &str, key_attribute: &str) -> Result<()> {
        let attribute = AttributeDefinition::builder()
            .attribute_name(key_attribute)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| UpdaterError::table_registry("create", table, e))?;

        let key = KeySchemaElement::builder()
            .attribute_name(key_attribute)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| UpdaterError::table_registry("create", table, e))?;

        self.client
            .create_table()
            .table_name(table)
            .billing_mode(BillingMode::PayPerRequest)
            .attribute_definitions(attribute)
            .key_schema(key)
            .send()
            .await
            .map_err(|e| UpdaterError::table_registry("create", table, e))?;

        info!(table, key_attribute, "Table creation requested");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn wait_until_queryable(&self, table: &str) -> Result<()> {
        loop {
            match self.client.describe_table().table_name(table).send().await {
                Ok(output) => {
                    let status = output.table.and_then(|t| t.table_status);
                    if status == Some(TableStatus::Active) {
                        return Ok(());
                    }
                    debug!(table, status = ?status, "Table not active yet");
                },
                Err(e)
                    if e.as_service_error()
                        .is_some_and(|s| s.is_resource_not_found_exception()) =>
                {
                    debug!(table, "Table not visible yet");
                },
                Err(e) => return Err(UpdaterError::table_registry("describe", table, e)),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    async fn batch_write(&self, table: &str, items: Vec<Item>) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut requests = Vec::with_capacity(items.len());
        for item in items {
            let put = PutRequest::builder()
                .set_item(Some(to_attributes(item)))
                .build()
                .map_err(|e| UpdaterError::table_registry("batch write", table, e))?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| UpdaterError::table_registry("batch write", table, e))?;

        let unprocessed = output
            .unprocessed_items
            .as_ref()
            .and_then(|pending| pending.get(table))
            .map(Vec::len)
            .unwrap_or(0);

        if unprocessed > 0 {
            warn!(table, unprocessed, "Batch write left items unprocessed");
        }

        Ok(unprocessed)
    }

    #[instrument(skip(self, updates), fields(attributes = updates.len()))]
    async fn update_item(
        &self,
        table: &str,
        key_attribute: &str,
        key_value: &str,
        updates: &Item,
    ) -> Result<()> {
        let mut request = self
            .client
            .update_item()
            .table_name(table)
            .key(key_attribute, AttributeValue::S(key_value.to_string()));

        if !updates.is_empty() {
            let mut assignments = Vec::with_capacity(updates.len());
            for (i, (name, value)) in updates.iter().enumerate() {
                request = request
                    .expression_attribute_names(format!("#a{i}"), name)
                    .expression_attribute_values(format!(":v{i}"), AttributeValue::S(value.clone()));
                assignments.push(format!("#a{i} = :v{i}"));
            }
            request = request.update_expression(format!("SET {}", assignments.join(", ")));
        }

        request
            .send()
            .await
            .map_err(|e| UpdaterError::table_registry("update", table, e))?;

        Ok(())
    }

    #[instrument(skip(self, attributes))]
    async fn scan(&self, table: &str, attributes: &[String]) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start.take());

            if !attributes.is_empty() {
                let mut projection = Vec::with_capacity(attributes.len());
                for (i, name) in attributes.iter().enumerate() {
                    request = request.expression_attribute_names(format!("#p{i}"), name);
                    projection.push(format!("#p{i}"));
                }
                request = request.projection_expression(projection.join(", "));
            }

            let output = request
                .send()
                .await
                .map_err(|e| UpdaterError::table_registry("scan", table, e))?;

            items.extend(output.items.unwrap_or_default().into_iter().map(from_attributes));

            start = output.last_evaluated_key;
            if start.is_none() {
                break;
            }
        }

        debug!(table, count = items.len(), "Scanned table");

        Ok(items)
    }
}
