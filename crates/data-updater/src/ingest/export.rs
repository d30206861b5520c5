//! Full-table snapshot export
//!
//! After an incremental update the final bucket holds a regenerated CSV of the whole
//! table under the staged file's key, so downstream readers never see a partial delta.

use data_updater_common::codec::render;
use data_updater_common::Result;
use tracing::{error, info, instrument};

use super::record::RecordLayout;
use crate::storage::ObjectStore;
use crate::table::TableRegistry;

/// Scan `table`, render it in header order and put it to `bucket`/`key`.
///
/// Rows are sorted by record key. Returns the number of data rows written.
#[instrument(skip(registry, store, record))]
pub async fn export_snapshot(
    registry: &dyn TableRegistry,
    store: &dyn ObjectStore,
    record: &RecordLayout,
    table: &str,
    bucket: &str,
    key: &str,
) -> Result<usize> {
    let mut items = registry
        .scan(table, &record.projection())
        .await
        .inspect_err(|e| error!(error = %e, "Table {} could not be scanned", table))?;

    let key_attribute = record.key_attribute();
    items.sort_by(|a, b| a.get(&key_attribute).cmp(&b.get(&key_attribute)));

    let rows: Vec<Vec<String>> = items.iter().map(|item| record.to_row(item)).collect();
    let body = render(record.columns(), &rows);

    store
        .put(bucket, key, body.into_bytes())
        .await
        .inspect_err(|e| {
            error!(error = %e, "Updated file could not be put to the {} bucket", bucket);
        })?;

    info!(rows = rows.len(), "Snapshot exported");

    Ok(rows.len())
}
