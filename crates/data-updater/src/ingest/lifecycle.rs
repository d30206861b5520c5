//! Table lifecycle: check, create, wait

use data_updater_common::{Result, UpdaterError};
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::table::TableRegistry;

/// Whether the target table existed when processing started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Missing,
    Present,
}

pub struct TableLifecycle<'a> {
    registry: &'a dyn TableRegistry,
    wait_timeout: Duration,
}

impl<'a> TableLifecycle<'a> {
    pub fn new(registry: &'a dyn TableRegistry, wait_timeout: Duration) -> Self {
        Self {
            registry,
            wait_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn check(&self, table: &str) -> Result<TableState> {
        let tables = self.registry.list_tables().await.inspect_err(|e| {
            error!(error = %e, "Tables could not be listed");
        })?;

        let state = if tables.iter().any(|t| t == table) {
            TableState::Present
        } else {
            TableState::Missing
        };

        info!(?state, "Table state checked");

        Ok(state)
    }

    /// Create the table and wait, at most `wait_timeout`, until it is queryable.
    ///
    /// Creation is attempted once; any failure aborts.
    #[instrument(skip(self))]
    pub async fn create(&self, table: &str, key_attribute: &str) -> Result<TableState> {
        self.registry
            .create_table(table, key_attribute)
            .await
            .inspect_err(|e| error!(error = %e, "Table {} could not be created", table))?;

        match tokio::time::timeout(self.wait_timeout, self.registry.wait_until_queryable(table))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                error!(waited = ?self.wait_timeout, "Table {} did not become queryable", table);
                return Err(UpdaterError::TableWaitTimeout {
                    table: table.to_string(),
                    waited: self.wait_timeout,
                });
            },
        }

        info!("Table is queryable");

        Ok(TableState::Present)
    }
}
