//! Moving staged files into the final bucket

use chrono::{DateTime, Utc};
use data_updater_common::Result;
use tracing::{error, info, instrument};

use super::csv_stem;
use crate::event::StagedObject;
use crate::storage::ObjectStore;

/// Where a staged file ends up in the final bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Same key as the staged object, overwriting any previous version
    InPlace,
    /// Timestamped archive path, see [`archive_key`]
    Archive(DateTime<Utc>),
}

impl Destination {
    pub fn key_for(&self, file_name: &str) -> String {
        match self {
            Destination::InPlace => file_name.to_string(),
            Destination::Archive(at) => archive_key(file_name, *at),
        }
    }
}

/// `<stem>/<YYYY>/<MM>/<DD>/<HH>/<mm>/<file name>`
pub fn archive_key(file_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}",
        csv_stem(file_name),
        at.format("%Y/%m/%d/%H/%M"),
        file_name
    )
}

/// Move `object` to `final_bucket`. Returns the destination key.
#[instrument(skip(store), fields(bucket = %object.bucket, key = %object.key))]
pub async fn relocate(
    store: &dyn ObjectStore,
    object: &StagedObject,
    final_bucket: &str,
    destination: Destination,
) -> Result<String> {
    let dest_key = destination.key_for(&object.key);

    store
        .move_object(&object.bucket, &object.key, final_bucket, &dest_key)
        .await
        .inspect_err(|e| {
            error!(error = %e, "File {} could not be moved to the {} bucket", object.key, final_bucket);
        })?;

    info!(dest_bucket = %final_bucket, dest_key = %dest_key, "File relocated");

    Ok(dest_key)
}
