//! Trigger event decoding

use aws_lambda_events::event::s3::S3Event;
use data_updater_common::{Result, UpdaterError};

/// The staged object named by a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub bucket: String,
    pub key: String,
}

impl StagedObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Take the first record of an S3 notification; later records are ignored.
    pub fn from_event(event: &S3Event) -> Result<Self> {
        let record = event
            .records
            .first()
            .ok_or_else(|| UpdaterError::InvalidEvent("event has no records".to_string()))?;

        let bucket = record
            .s3
            .bucket
            .name
            .clone()
            .ok_or_else(|| UpdaterError::InvalidEvent("record has no bucket name".to_string()))?;

        let raw_key = record
            .s3
            .object
            .key
            .as_deref()
            .ok_or_else(|| UpdaterError::InvalidEvent("record has no object key".to_string()))?;

        Ok(Self::new(bucket, decode_key(raw_key)?))
    }

    /// Case-insensitive `.csv` extension check
    pub fn is_csv(&self) -> bool {
        self.key.to_lowercase().ends_with(".csv")
    }
}

/// S3 notifications URL-encode keys and turn spaces into `+`.
fn decode_key(raw: &str) -> Result<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|k| k.into_owned())
        .map_err(|e| UpdaterError::InvalidEvent(format!("object key '{}' is not valid: {}", raw, e)))
}
