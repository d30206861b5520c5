//! Data Updater Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the data updater workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`UpdaterError`] taxonomy and result alias
//! - **Row Codec**: `;`-delimited header/row parsing and record key/value composition
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use data_updater_common::codec::{self, KeyColumns};
//! use data_updater_common::Result;
//!
//! fn first_key(content: &[u8]) -> Result<Option<String>> {
//!     let file = codec::parse(content)?;
//!     let key = KeyColumns::resolve(&file.header, &["id".to_string()])?;
//!     match file.rows.first() {
//!         Some(row) => Ok(Some(key.compose(row)?)),
//!         None => Ok(None),
//!     }
//! }
//! ```

pub mod codec;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{BoxError, Result, UpdaterError};
