//! Record writer
//!
//! Bulk mode writes put items in sequential chunks. Incremental mode issues one
//! update per row, in file order. Neither mode is atomic: a failure leaves every
//! earlier chunk or update applied, and the error reports how far it got.

use data_updater_common::codec::Row;
use data_updater_common::{Result, UpdaterError};
use tracing::{debug, error, info, instrument};

use super::record::RecordLayout;
use crate::table::TableRegistry;

pub struct RecordWriter<'a> {
    registry: &'a dyn TableRegistry,
    table: &'a str,
    record: &'a RecordLayout,
    chunk_size: usize,
}

impl<'a> RecordWriter<'a> {
    pub fn new(
        registry: &'a dyn TableRegistry,
        table: &'a str,
        record: &'a RecordLayout,
        chunk_size: usize,
    ) -> Self {
        Self {
            registry,
            table,
            record,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Put one item per row. Returns the number of items written.
    #[instrument(skip(self, rows), fields(table = %self.table, rows = rows.len()))]
    pub async fn bulk_load(&self, rows: &[Row]) -> Result<usize> {
        let items = rows
            .iter()
            .map(|row| self.record.put_item(row))
            .collect::<Result<Vec<_>>>()?;

        let total = items.len();
        let mut written = 0;

        for (index, chunk) in items.chunks(self.chunk_size).enumerate() {
            let size = chunk.len();

            let unprocessed = match self.registry.batch_write(self.table, chunk.to_vec()).await {
                Ok(unprocessed) => unprocessed,
                Err(e) => {
                    error!(error = %e, chunk = index, written, "Batch write failed");
                    return Err(UpdaterError::BulkLoad {
                        table: self.table.to_string(),
                        written,
                        failed: total - written,
                        source: Some(Box::new(e)),
                    });
                },
            };

            written += size - unprocessed.min(size);

            if unprocessed > 0 {
                error!(chunk = index, unprocessed, written, "Batch write left items unprocessed");
                return Err(UpdaterError::BulkLoad {
                    table: self.table.to_string(),
                    written,
                    failed: total - written,
                    source: None,
                });
            }

            debug!(chunk = index, size, written, "Chunk written");
        }

        info!(written, "Bulk load complete");

        Ok(written)
    }

    /// Update one item per row. Returns the number of rows applied.
    #[instrument(skip(self, rows), fields(table = %self.table, rows = rows.len()))]
    pub async fn apply_updates(&self, rows: &[Row]) -> Result<usize> {
        let updates = rows
            .iter()
            .map(|row| self.record.update(row))
            .collect::<Result<Vec<_>>>()?;

        let key_attribute = self.record.key_attribute();

        for (applied, (key, attributes)) in updates.iter().enumerate() {
            if let Err(e) = self
                .registry
                .update_item(self.table, &key_attribute, key, attributes)
                .await
            {
                error!(error = %e, applied, key = %key, "Table {} could not be updated", self.table);
                return Err(UpdaterError::Update {
                    table: self.table.to_string(),
                    applied,
                    key: key.clone(),
                    source: Box::new(e),
                });
            }
        }

        info!(applied = updates.len(), "Incremental update complete");

        Ok(updates.len())
    }
}
