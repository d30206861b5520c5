//! Lambda event handler

use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{Error, LambdaEvent};
use tracing::{error, info, instrument};

use crate::event::StagedObject;
use crate::ingest::{DataUpdater, Outcome};

/// Decode the notification and process its first record.
pub async fn handle_event(updater: &DataUpdater, event: &S3Event) -> anyhow::Result<Outcome> {
    if event.records.len() > 1 {
        info!(records = event.records.len(), "Only the first record is processed");
    }

    let object = StagedObject::from_event(event)?;
    let outcome = updater.process(&object).await?;

    Ok(outcome)
}

/// Entry point registered with the Lambda runtime.
///
/// Failures are logged with their full cause chain and returned, so the invocation
/// is reported as failed.
#[instrument(skip_all, fields(request_id = %event.context.request_id))]
pub async fn function_handler(
    updater: &DataUpdater,
    event: LambdaEvent<S3Event>,
) -> Result<(), Error> {
    match handle_event(updater, &event.payload).await {
        Ok(outcome) => {
            info!(?outcome, "Invocation complete");
            Ok(())
        },
        Err(e) => {
            error!(error = %format!("{:#}", e), "Invocation failed");
            Err(e.into())
        },
    }
}
