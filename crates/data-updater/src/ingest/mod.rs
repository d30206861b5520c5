//! File ingestion
//!
//! The per-file flow, leaf first:
//!
//! - [`record`]: maps parsed rows onto table items for the configured layout
//! - [`lifecycle`]: table existence check and creation with a bounded wait
//! - [`writer`]: chunked bulk load for new tables, per-row updates for existing ones
//! - [`relocation`]: moves the staged file into the final bucket
//! - [`export`]: regenerates the full-table CSV after an update
//! - [`pipeline`]: ties the steps together for one staged object

pub mod export;
pub mod lifecycle;
pub mod pipeline;
pub mod record;
pub mod relocation;
pub mod writer;

pub use lifecycle::{TableLifecycle, TableState};
pub use pipeline::{DataUpdater, Outcome};
pub use record::RecordLayout;
pub use relocation::Destination;
pub use writer::RecordWriter;

/// Object key without its `.csv` extension (matched case-insensitively).
pub fn csv_stem(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(4);
    match (file_name.get(..split), file_name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".csv") => stem,
        _ => file_name,
    }
}
