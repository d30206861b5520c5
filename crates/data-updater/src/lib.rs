//! Data Updater Library
//!
//! Event-driven loader that turns `;`-delimited files dropped into a staging bucket
//! into DynamoDB tables.
//!
//! # Overview
//!
//! For each staged object the updater:
//!
//! - **Checks the extension**: anything that is not `.csv` is ignored
//! - **Looks up the ingestion rules**: a JSON document naming each known file's key columns
//! - **Loads or updates the table**: a missing table is created and bulk loaded, an
//!   existing one is updated row by row
//! - **Relocates the file**: new tables keep the original key in the final bucket,
//!   updates and unknown files go to a timestamped archive path
//!
//! # Architecture
//!
//! External systems sit behind two traits, [`storage::ObjectStore`] and
//! [`table::TableRegistry`], with AWS implementations for production and in-memory
//! ones for tests and the offline runner. [`ingest::DataUpdater`] drives one file
//! through the flow; [`handler`] adapts it to the Lambda runtime.
//!
//! # Configuration
//!
//! See [`config::UpdaterConfig`]. The three required variables are `CONFIG_BUCKET`,
//! `CONFIG_FILE_NAME` and `FINAL_BUCKET`.

pub mod aws;
pub mod config;
pub mod event;
pub mod handler;
pub mod ingest;
pub mod rules;
pub mod storage;
pub mod table;

pub use config::UpdaterConfig;
pub use event::StagedObject;
pub use ingest::{DataUpdater, Outcome};
