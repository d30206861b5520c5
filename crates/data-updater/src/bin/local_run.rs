//! Data Updater - local runner
//!
//! Runs the same processing as the Lambda function from a terminal, either against
//! real AWS resources or fully in memory.

use anyhow::{Context, Result};
use aws_lambda_events::event::s3::S3Event;
use clap::{Parser, Subcommand, ValueEnum};
use data_updater::config::{StorageLayout, UpdaterConfig};
use data_updater::ingest::csv_stem;
use data_updater::storage::memory::MemoryObjectStore;
use data_updater::table::memory::MemoryTableRegistry;
use data_updater::{aws, handler, rules::IngestionRules, DataUpdater, StagedObject};
use data_updater_common::codec::{self, DELIMITER};
use data_updater_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "data-updater-local")]
#[command(author, version, about = "Run the data updater outside Lambda")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Process against real S3 and DynamoDB, configured from the environment
    Aws {
        /// S3 notification JSON file
        #[arg(short, long, conflicts_with_all = ["bucket", "key"])]
        event: Option<PathBuf>,

        /// Staging bucket of the object to process
        #[arg(short, long, requires = "key")]
        bucket: Option<String>,

        /// Key of the object to process
        #[arg(short, long, requires = "bucket")]
        key: Option<String>,
    },

    /// Process a local file with in-memory storage and tables
    Offline {
        /// Ingestion rules JSON file
        #[arg(short, long)]
        rules: PathBuf,

        /// File to process; its name is used as the object key
        #[arg(short, long)]
        file: PathBuf,

        /// Treat the target table as already existing
        #[arg(long)]
        existing: bool,

        /// Item layout
        #[arg(long, value_enum, default_value_t = LayoutArg::Columns)]
        layout: LayoutArg,

        /// Items per batch write
        #[arg(long, default_value_t = 25)]
        chunk_size: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Columns,
    Record,
}

impl From<LayoutArg> for StorageLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Columns => StorageLayout::Columns,
            LayoutArg::Record => StorageLayout::Record,
        }
    }
}

const STAGE_BUCKET: &str = "stage";
const CONFIG_BUCKET: &str = "config";
const RULES_KEY: &str = "rules.json";
const FINAL_BUCKET: &str = "final";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .filter_directives("data_updater=debug,aws_config=warn,aws_smithy_runtime=warn")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_or(log_config)?;

    init_logging(&log_config)?;

    match cli.mode {
        Mode::Aws { event, bucket, key } => run_aws(event, bucket, key).await,
        Mode::Offline {
            rules,
            file,
            existing,
            layout,
            chunk_size,
        } => run_offline(&rules, &file, existing, layout.into(), chunk_size).await,
    }
}

async fn run_aws(event: Option<PathBuf>, bucket: Option<String>, key: Option<String>) -> Result<()> {
    let config = UpdaterConfig::load()?;
    let updater = aws::connect(config).await;

    let outcome = match (event, bucket, key) {
        (Some(path), _, _) => {
            let raw = std::fs::read(&path)
                .with_context(|| format!("Failed to read event file {}", path.display()))?;
            let event: S3Event = serde_json::from_slice(&raw)
                .with_context(|| format!("{} is not an S3 notification", path.display()))?;
            handler::handle_event(&updater, &event).await?
        },
        (None, Some(bucket), Some(key)) => updater.process(&StagedObject::new(bucket, key)).await?,
        _ => anyhow::bail!("Either --event or --bucket with --key is required"),
    };

    info!(?outcome, "Processing complete");
    Ok(())
}

async fn run_offline(
    rules_path: &Path,
    file_path: &Path,
    existing: bool,
    layout: StorageLayout,
    chunk_size: usize,
) -> Result<()> {
    let rules_body = std::fs::read(rules_path)
        .with_context(|| format!("Failed to read rules file {}", rules_path.display()))?;
    let body = std::fs::read(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .context("File name is not valid UTF-8")?
        .to_string();

    let mut config = UpdaterConfig::new(CONFIG_BUCKET, RULES_KEY, FINAL_BUCKET);
    config.layout = layout;
    config.batch_chunk_size = chunk_size;
    config.validate()?;

    let store = Arc::new(MemoryObjectStore::new());
    store.insert(CONFIG_BUCKET, RULES_KEY, rules_body.clone());
    store.insert(STAGE_BUCKET, &file_name, body);

    let table = format!("{}{}", config.table_prefix, csv_stem(&file_name));
    let mut registry = MemoryTableRegistry::new();

    if existing {
        let rules = IngestionRules::from_slice(&rules_body)?;
        let rule = rules
            .rule_for(&file_name)
            .with_context(|| format!("No ingestion rule for {}", file_name))?;
        let key_attribute = rule.primary_key.columns().join(&DELIMITER.to_string());
        registry = registry.with_table(&table, &key_attribute);
    }

    let registry = Arc::new(registry);
    let updater = DataUpdater::new(config, store.clone(), registry.clone());

    let outcome = updater
        .process(&StagedObject::new(STAGE_BUCKET, file_name))
        .await?;

    info!(?outcome, "Processing complete");

    println!("Outcome: {:?}", outcome);
    println!("\nTable calls:");
    for call in registry.calls() {
        println!("  {:?}", call);
    }
    println!("\nStore calls:");
    for call in store.calls() {
        println!("  {:?}", call);
    }

    let items = registry.items(&table);
    if let Some(first) = items.first() {
        let columns: Vec<String> = first.keys().cloned().collect();
        let rows: Vec<Vec<String>> = items
            .iter()
            .map(|item| {
                columns
                    .iter()
                    .map(|c| item.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        println!("\nTable {} ({} items):", table, items.len());
        println!("{}", codec::render(&columns, &rows));
    }

    Ok(())
}
