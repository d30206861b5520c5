//! Data Updater - Lambda entry point

use anyhow::Result;
use aws_lambda_events::event::s3::S3Event;
use data_updater_common::logging::{init_logging, LogConfig, LogFormat};
use lambda_runtime::{service_fn, LambdaEvent};
use std::sync::Arc;
use tracing::info;

use data_updater::{aws, config::UpdaterConfig, handler};

#[tokio::main]
async fn main() -> Result<()> {
    // CloudWatch gets one JSON object per line, no colours
    let log_config = LogConfig::builder()
        .format(LogFormat::Json)
        .filter_directives("data_updater=info,aws_config=warn,aws_smithy_runtime=warn")
        .ansi(false)
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_or(log_config)?;

    init_logging(&log_config)?;

    let config = UpdaterConfig::load()?;
    info!(
        config_bucket = %config.config_bucket,
        final_bucket = %config.final_bucket,
        layout = %config.layout,
        log_level = %log_config.level,
        log_format = %log_config.format,
        "Configuration loaded"
    );

    let updater = Arc::new(aws::connect(config).await);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<S3Event>| {
        let updater = Arc::clone(&updater);
        async move { handler::function_handler(&updater, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime stopped: {}", e))
}
