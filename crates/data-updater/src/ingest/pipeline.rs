//! Per-file orchestration

use chrono::{DateTime, Utc};
use data_updater_common::codec;
use data_updater_common::{Result, UpdaterError};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::export::export_snapshot;
use super::lifecycle::{TableLifecycle, TableState};
use super::record::RecordLayout;
use super::relocation::{relocate, Destination};
use super::writer::RecordWriter;
use super::csv_stem;
use crate::config::UpdaterConfig;
use crate::event::StagedObject;
use crate::rules::IngestionRules;
use crate::storage::ObjectStore;
use crate::table::{validate_table_name, TableRegistry};

/// What processing one staged object did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a CSV file; nothing was touched
    Skipped,
    /// No ingestion rule matched; the file was archived as-is
    Archived { destination: String },
    /// A new table was created and bulk loaded
    Loaded {
        table: String,
        rows: usize,
        destination: String,
    },
    /// An existing table was updated row by row
    Updated {
        table: String,
        rows: usize,
        destination: String,
        exported: bool,
    },
}

/// Processes staged objects against an object store and a table registry
pub struct DataUpdater {
    config: UpdaterConfig,
    store: Arc<dyn ObjectStore>,
    registry: Arc<dyn TableRegistry>,
    clock: fn() -> DateTime<Utc>,
}

impl DataUpdater {
    pub fn new(
        config: UpdaterConfig,
        store: Arc<dyn ObjectStore>,
        registry: Arc<dyn TableRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            clock: Utc::now,
        }
    }

    /// Replace the clock used for archive timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Table name for a staged file: prefix plus the key without `.csv`.
    pub fn table_name(&self, file_name: &str) -> Result<String> {
        let name = format!("{}{}", self.config.table_prefix, csv_stem(file_name));
        validate_table_name(&name)?;
        Ok(name)
    }

    /// Run one staged object through the whole flow.
    ///
    /// The first failing step aborts; earlier table writes are not rolled back.
    #[instrument(skip(self), fields(bucket = %object.bucket, key = %object.key))]
    pub async fn process(&self, object: &StagedObject) -> Result<Outcome> {
        if !object.is_csv() {
            info!("File {} is not a CSV file, skipping", object.key);
            return Ok(Outcome::Skipped);
        }

        let rules = IngestionRules::fetch(
            self.store.as_ref(),
            &self.config.config_bucket,
            &self.config.config_file_name,
        )
        .await?;

        let Some(rule) = rules.rule_for(&object.key) else {
            warn!("File {} has no ingestion rule, archiving", object.key);
            let destination = relocate(
                self.store.as_ref(),
                object,
                &self.config.final_bucket,
                Destination::Archive((self.clock)()),
            )
            .await?;
            return Ok(Outcome::Archived { destination });
        };

        let table = self
            .table_name(&object.key)
            .inspect_err(|e| error!(error = %e, "File {} has no usable table name", object.key))?;

        let lifecycle =
            TableLifecycle::new(self.registry.as_ref(), self.config.table_wait_timeout());
        let state = lifecycle.check(&table).await?;

        let body = self
            .store
            .get(&object.bucket, &object.key)
            .await
            .inspect_err(|e| error!(error = %e, "File {} could not be read", object.key))?;

        let parsed = codec::parse(&body).map_err(|e| {
            error!(error = %e, "File {} could not be parsed", object.key);
            UpdaterError::from(e)
        })?;

        let record = RecordLayout::new(&parsed.header, &rule.primary_key.columns(), self.config.layout)
            .inspect_err(|e| error!(error = %e, "Key columns do not match the header of {}", object.key))?;

        info!(
            table = %table,
            ?state,
            rows = parsed.rows.len(),
            key_attribute = %record.key_attribute(),
            "File parsed"
        );

        let writer = RecordWriter::new(
            self.registry.as_ref(),
            &table,
            &record,
            self.config.batch_chunk_size,
        );

        match state {
            TableState::Missing => {
                lifecycle.create(&table, &record.key_attribute()).await?;
                let rows = writer.bulk_load(&parsed.rows).await?;
                let destination = relocate(
                    self.store.as_ref(),
                    object,
                    &self.config.final_bucket,
                    Destination::InPlace,
                )
                .await?;

                Ok(Outcome::Loaded {
                    table,
                    rows,
                    destination,
                })
            },
            TableState::Present => {
                let rows = writer.apply_updates(&parsed.rows).await?;

                if self.config.export_on_update {
                    export_snapshot(
                        self.registry.as_ref(),
                        self.store.as_ref(),
                        &record,
                        &table,
                        &self.config.final_bucket,
                        &object.key,
                    )
                    .await?;
                }

                let destination = relocate(
                    self.store.as_ref(),
                    object,
                    &self.config.final_bucket,
                    Destination::Archive((self.clock)()),
                )
                .await?;

                Ok(Outcome::Updated {
                    table,
                    rows,
                    destination,
                    exported: self.config.export_on_update,
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryObjectStore;
    use crate::table::memory::MemoryTableRegistry;

    fn updater(prefix: &str) -> DataUpdater {
        let mut config = UpdaterConfig::new("config", "rules.json", "final");
        config.table_prefix = prefix.to_string();
        DataUpdater::new(
            config,
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemoryTableRegistry::new()),
        )
    }

    #[test]
    fn test_table_name() {
        let updater = updater("data_updater_");
        assert_eq!(updater.table_name("prices.csv").unwrap(), "data_updater_prices");
        assert_eq!(updater.table_name("Stock.CSV").unwrap(), "data_updater_Stock");
    }

    #[test]
    fn test_invalid_table_name() {
        let updater = updater("data_updater_");
        let err = updater.table_name("daily prices.csv").unwrap_err();
        assert!(matches!(err, UpdaterError::InvalidTableName { .. }));

        assert!(self::updater("").table_name("ab.csv").is_err());
    }
}
