//! Migrator - Core migration execution engine

use crate::migration::checksum::validate_checksum;
use crate::migration::undo::{undo_migrations, UndoReport, UndoRequest};
use crate::migration::{
    HistoryEntry, HistoryLedger, MigrationDefinition, MigrationError, MigrationInfo,
    MigrationRegistry, MigrationResolver, MigrationVersion, PendingMigration,
};
use crate::transaction::Transaction;
use crate::LifeExecutor;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// What undo needs from a migration engine
///
/// The ledger to read the current entry from, the connection the revert block runs on,
/// and the hook that turns a stored script identifier back into a migration.
pub trait MigrationRunner {
    fn ledger(&self) -> &dyn HistoryLedger;

    fn executor(&self) -> &dyn LifeExecutor;

    fn resolver(&self) -> &dyn MigrationResolver;
}

/// Core migration execution engine
///
/// Owns the connection, the history ledger and the registry of known migrations, and
/// runs forward migration, validation, status reporting and undo over them.
pub struct Migrator {
    executor: Box<dyn LifeExecutor>,
    ledger: Box<dyn HistoryLedger>,
    registry: MigrationRegistry,
    installed_by: String,
}

impl Migrator {
    pub fn new(
        executor: impl LifeExecutor + 'static,
        ledger: impl HistoryLedger + 'static,
        registry: MigrationRegistry,
    ) -> Self {
        Self {
            executor: Box::new(executor),
            ledger: Box::new(ledger),
            registry,
            installed_by: "lifeguard".to_string(),
        }
    }

    /// Value written to the history table's `installed_by` column
    #[must_use]
    pub fn with_installed_by(mut self, installed_by: impl Into<String>) -> Self {
        self.installed_by = installed_by.into();
        self
    }

    /// Get migration status (applied vs pending)
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the history table cannot be created or read.
    pub fn info(&self) -> Result<MigrationInfo, MigrationError> {
        self.ledger.initialize(self.executor.as_ref())?;

        let applied = self.ledger.applied()?;
        let current = applied.iter().max_by_key(|e| e.installed_rank).cloned();
        let pending = self
            .pending(&applied)
            .into_iter()
            .map(|definition| PendingMigration {
                script: definition.migration.script().to_string(),
                kind: definition.identity.kind,
                version: definition.identity.version.clone(),
                description: definition.identity.description.clone(),
                checksum: definition.migration.checksum(),
                reversible: definition.migration.as_atomic().is_some(),
            })
            .collect();

        Ok(MigrationInfo::new(applied, pending, current))
    }

    /// Check applied migrations against the registry
    ///
    /// # Errors
    ///
    /// - `MigrationError::MissingMigration` if an applied script is not registered
    /// - `MigrationError::ChecksumMismatch` if an applied versioned migration changed
    /// - `MigrationError::Database` if the history table cannot be read
    pub fn validate(&self) -> Result<(), MigrationError> {
        self.ledger.initialize(self.executor.as_ref())?;
        self.validate_applied(&self.ledger.applied()?)
    }

    /// Apply every pending migration
    ///
    /// Versioned migrations run in ascending version order, then repeatable migrations
    /// that are new or whose checksum changed. Each migration and its history row share
    /// one transaction unless the migration opts out.
    ///
    /// Returns the number of migrations applied.
    ///
    /// # Errors
    ///
    /// Validation errors as for [`Migrator::validate`], `MigrationError::OutOfOrder` if a
    /// pending version is not newer than the applied ones, and `MigrationError::Execution`
    /// if a migration fails. Migrations applied before the failing one stay applied.
    pub fn migrate(&self) -> Result<usize, MigrationError> {
        let executor = self.executor.as_ref();
        self.ledger.initialize(executor)?;

        let applied = self.ledger.applied()?;
        self.validate_applied(&applied)?;

        let mut next_rank = self
            .ledger
            .entries()?
            .iter()
            .map(|e| e.installed_rank)
            .max()
            .unwrap_or(0)
            + 1;
        let mut latest = latest_version(&applied);
        let pending = self.pending(&applied);

        if pending.is_empty() {
            log::info!("Schema is up to date. No migration necessary.");
            return Ok(0);
        }

        for definition in &pending {
            if let Some(version) = &definition.identity.version {
                if let Some(current) = latest.as_ref().filter(|current| version <= *current) {
                    return Err(MigrationError::OutOfOrder {
                        script: definition.migration.script().to_string(),
                        version: version.to_string(),
                        current: current.to_string(),
                    });
                }
                latest = Some(version.clone());
            }

            self.apply(definition, next_rank)?;
            next_rank += 1;
        }

        log::info!("Successfully applied {} migration(s)", pending.len());
        Ok(pending.len())
    }

    /// Revert the most recently applied migrations
    pub fn undo(&self, request: UndoRequest) -> UndoReport {
        undo_migrations(self, request)
    }

    fn apply(&self, definition: &MigrationDefinition, rank: i32) -> Result<(), MigrationError> {
        let migration = &definition.migration;
        let identity = &definition.identity;
        let script = migration.script();

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::forward_migration_span(script).entered();

        match &identity.version {
            Some(version) => log::info!(
                "Migrating schema to version {version} - {}",
                identity.description
            ),
            None => log::info!("Migrating schema with repeatable migration {}", identity.description),
        }

        let mut entry = HistoryEntry {
            installed_rank: rank,
            version: identity.version.as_ref().map(ToString::to_string),
            description: identity.description.clone(),
            kind: migration.kind_label().to_string(),
            script: script.to_string(),
            checksum: migration.checksum(),
            installed_by: self.installed_by.clone(),
            installed_on: Utc::now(),
            execution_time: 0,
            success: true,
        };

        let start = Instant::now();
        if migration.can_execute_in_transaction() {
            let transaction = Transaction::begin(self.executor.as_ref())
                .map_err(|e| MigrationError::execution(script, e))?;
            migration
                .migrate(transaction.executor())
                .map_err(|e| MigrationError::execution(script, e))?;
            entry.execution_time = elapsed_millis(start);
            self.ledger.record(transaction.executor(), &entry)?;
            transaction
                .commit()
                .map_err(|e| MigrationError::execution(script, e))?;
        } else {
            migration
                .migrate(self.executor.as_ref())
                .map_err(|e| MigrationError::execution(script, e))?;
            entry.execution_time = elapsed_millis(start);
            self.ledger.record(self.executor.as_ref(), &entry)?;
        }

        log::debug!("Applied {script} in {}ms", entry.execution_time);
        Ok(())
    }

    fn validate_applied(&self, applied: &[HistoryEntry]) -> Result<(), MigrationError> {
        for entry in applied {
            let Some(definition) = self.registry.get(&entry.script) else {
                return Err(MigrationError::MissingMigration {
                    script: entry.script.clone(),
                });
            };

            // Repeatable migrations are expected to change; they re-run instead
            if entry.version.is_none() {
                continue;
            }

            if let (Some(stored), Some(current)) = (entry.checksum, definition.migration.checksum()) {
                validate_checksum(stored, current).map_err(|(stored, current)| {
                    MigrationError::ChecksumMismatch {
                        script: entry.script.clone(),
                        stored,
                        current,
                    }
                })?;
            }
        }
        Ok(())
    }

    fn pending(&self, applied: &[HistoryEntry]) -> Vec<&MigrationDefinition> {
        let applied_scripts: HashSet<&str> = applied.iter().map(|e| e.script.as_str()).collect();

        let versioned = self
            .registry
            .versioned()
            .into_iter()
            .filter(|d| !applied_scripts.contains(d.migration.script()));

        let repeatable = self.registry.repeatable().into_iter().filter(|d| {
            let latest = applied
                .iter()
                .filter(|e| e.script == d.migration.script())
                .max_by_key(|e| e.installed_rank);
            match latest {
                None => true,
                Some(entry) => entry.checksum != d.migration.checksum(),
            }
        });

        versioned.chain(repeatable).collect()
    }
}

impl MigrationRunner for Migrator {
    fn ledger(&self) -> &dyn HistoryLedger {
        self.ledger.as_ref()
    }

    fn executor(&self) -> &dyn LifeExecutor {
        self.executor.as_ref()
    }

    fn resolver(&self) -> &dyn MigrationResolver {
        &self.registry
    }
}

fn latest_version(applied: &[HistoryEntry]) -> Option<MigrationVersion> {
    applied
        .iter()
        .filter_map(|e| e.version.as_deref())
        .filter_map(|v| MigrationVersion::parse(v).ok())
        .max()
}

fn elapsed_millis(start: Instant) -> i32 {
    i32::try_from(start.elapsed().as_millis()).unwrap_or(i32::MAX)
}
