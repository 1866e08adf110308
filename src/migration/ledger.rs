//! History ledger: the persisted record of applied migrations

use crate::migration::{state_table, HistoryEntry, MigrationError};
use crate::{LifeError, LifeExecutor};
use may_postgres::Client;
use std::sync::Arc;

/// Read access to the migration history table
///
/// The ledger answers which migrations are applied. Writes are issued as SQL on the
/// caller's executor so they join whatever transaction the caller has open: the forward
/// path inserts a row in the migration's transaction, undo deletes a row in the revert
/// transaction.
pub trait HistoryLedger {
    /// Name of the history table
    fn table(&self) -> &str;

    /// Whether the history table has been created
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the catalog cannot be queried.
    fn exists(&self) -> Result<bool, MigrationError>;

    /// Every history row, ordered by `installed_rank`; the table must exist
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the table cannot be read.
    fn entries(&self) -> Result<Vec<HistoryEntry>, MigrationError>;

    /// Successfully applied rows, ordered by `installed_rank`
    ///
    /// A database that has never been migrated has no history table and no applied rows.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the table cannot be read.
    fn applied(&self) -> Result<Vec<HistoryEntry>, MigrationError> {
        if !self.exists()? {
            return Ok(Vec::new());
        }
        Ok(self.entries()?.into_iter().filter(|e| e.success).collect())
    }

    /// The most recently applied entry (greatest `installed_rank`), if any
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the table cannot be read.
    fn current(&self) -> Result<Option<HistoryEntry>, MigrationError> {
        Ok(self
            .applied()?
            .into_iter()
            .max_by_key(|entry| entry.installed_rank))
    }

    /// Create the history table if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the DDL fails.
    fn initialize(&self, executor: &dyn LifeExecutor) -> Result<(), MigrationError> {
        executor.batch_execute(&state_table::create_table_sql(self.table()))?;
        Ok(())
    }

    /// Insert a history row through `executor`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the INSERT fails.
    fn record(&self, executor: &dyn LifeExecutor, entry: &HistoryEntry) -> Result<(), MigrationError> {
        executor.execute(&state_table::insert_entry_sql(self.table(), entry))?;
        Ok(())
    }
}

/// History ledger stored in PostgreSQL, read through `may_postgres`
pub struct PostgresLedger {
    client: Arc<Client>,
    table: String,
}

impl PostgresLedger {
    pub fn new(client: Arc<Client>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

impl HistoryLedger for PostgresLedger {
    fn table(&self) -> &str {
        &self.table
    }

    fn exists(&self) -> Result<bool, MigrationError> {
        let sql = state_table::table_exists_sql(&self.table);
        let row = self
            .client
            .query_one(sql.as_str(), &[])
            .map_err(LifeError::PostgresError)?;
        let count: i32 = row.try_get(0).map_err(LifeError::PostgresError)?;
        Ok(count > 0)
    }

    fn entries(&self) -> Result<Vec<HistoryEntry>, MigrationError> {
        let sql = state_table::select_entries_sql(&self.table);
        let rows = self
            .client
            .query(sql.as_str(), &[])
            .map_err(LifeError::PostgresError)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(HistoryEntry::from_row(row)?);
        }

        Ok(entries)
    }
}
