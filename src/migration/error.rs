//! Migration-specific error types

use crate::migration::ExitStatus;
use crate::LifeError;
use thiserror::Error;

/// Migration-specific errors
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A migration identifier matches neither the versioned nor the repeatable pattern
    #[error("[FATAL] Invalid migration class name: {identifier}")]
    InvalidIdentity { identifier: String },

    /// The history ledger has no applied entries left
    #[error("No migrations left to undo")]
    NoMigrationsToUndo,

    /// The most recently applied migration has no down script
    #[error("Migration '{script}' is not an atomic migration and cannot be undone")]
    NotReversible { script: String },

    /// A migration script (or the revert-plus-cleanup block) failed to execute
    #[error("Migration '{script}' failed during execution: {source}")]
    Execution {
        script: String,
        #[source]
        source: LifeError,
    },

    /// The migration named by a history entry could not be resolved
    #[error("Failed to load migration '{script}': {reason}")]
    Load { script: String, reason: String },

    /// Reading or writing the history ledger failed
    #[error("Database error: {0}")]
    Database(#[from] LifeError),

    /// A migration with the same script identifier is already registered
    #[error("Migration '{script}' is already registered")]
    AlreadyRegistered { script: String },

    /// An applied migration's up script changed after it was applied
    #[error(
        "Migration '{script}' has been modified after being applied.\n\
         Stored checksum: {stored}\n\
         Current checksum: {current}"
    )]
    ChecksumMismatch {
        script: String,
        stored: i32,
        current: i32,
    },

    /// The history ledger references a migration that is not registered
    #[error(
        "Applied migration '{script}' is not registered.\n\
         Suggestion: ensure every applied migration is registered before running"
    )]
    MissingMigration { script: String },

    /// A pending versioned migration is older than the current schema version
    #[error("Migration '{script}' (version {version}) is older than the applied version {current}")]
    OutOfOrder {
        script: String,
        version: String,
        current: String,
    },

    /// An undo request must revert at least one migration
    #[error("Invalid undo count {0}: at least one migration must be requested")]
    InvalidUndoCount(u32),
}

impl MigrationError {
    /// Process exit status reported for this failure
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::Usage
    }

    pub(crate) fn execution(script: impl Into<String>, source: LifeError) -> Self {
        Self::Execution {
            script: script.into(),
            source,
        }
    }
}
