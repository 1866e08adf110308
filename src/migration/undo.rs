//! Undo: revert the most recently applied atomic migrations
//!
//! One undo step moves through these stages:
//!
//! 1. resolve the current history entry (none left is `NoMigrationsToUndo`)
//! 2. load the migration registered under its script identifier (`Load`), and require the
//!    atomic capability (`NotReversible`)
//! 3. run the down script and the history-row deletion as one transaction block
//!
//! Either both effects of step 3 apply or neither does. A failing block is rolled back
//! and surfaces as `Execution` with the driver's error attached.
//!
//! A multi-step undo runs steps strictly in sequence and stops at the first failure.
//! Steps that already committed stay committed.

use crate::migration::state_table::{delete_script_sql, quote_identifier};
use crate::migration::{ExitStatus, MigrationError, MigrationRunner};

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// How many migrations an undo invocation should revert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoRequest {
    count: u32,
}

impl UndoRequest {
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidUndoCount` when `count` is zero.
    pub fn new(count: u32) -> Result<Self, MigrationError> {
        if count == 0 {
            return Err(MigrationError::InvalidUndoCount(count));
        }
        Ok(Self { count })
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Default for UndoRequest {
    fn default() -> Self {
        Self { count: 1 }
    }
}

/// Result of a multi-step undo
#[derive(Debug)]
pub struct UndoReport {
    /// Worst status over the executed steps
    pub status: ExitStatus,
    /// Script identifiers reverted, in the order they were reverted
    pub reverted: Vec<String>,
    /// The failure that stopped the sequence, if any
    pub error: Option<MigrationError>,
}

impl UndoReport {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Build the revert-plus-cleanup block for one migration
///
/// ```text
/// BEGIN;
///   <down>;
///   DELETE FROM "<table>" WHERE "script"='<script>';
/// COMMIT;
/// ```
///
/// Trailing semicolons and whitespace on `down` are dropped so the block stays well formed.
#[must_use]
pub fn revert_statement(table: &str, script: &str, down: &str) -> String {
    let down = down.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!(
        "BEGIN;\n  {down};\n  {};\nCOMMIT;\n",
        delete_script_sql(table, script)
    )
}

/// Revert the most recently applied migration
///
/// # Errors
///
/// `NoMigrationsToUndo` when the ledger is empty, `Load` when the entry's migration is
/// not registered, `NotReversible` when it is forward-only, `Execution` when the revert
/// block fails (after rollback) and `Database` when the ledger cannot be read. The schema
/// and the ledger are unchanged in every error case.
pub fn undo_last_migration(runner: &dyn MigrationRunner) -> Result<ExitStatus, MigrationError> {
    undo_step(runner).map(|_| ExitStatus::Ok)
}

/// Revert up to `request.count()` migrations, newest first
///
/// Stops at the first failing step; the report's status is that step's status.
pub fn undo_migrations(runner: &dyn MigrationRunner, request: UndoRequest) -> UndoReport {
    let mut report = UndoReport {
        status: ExitStatus::Ok,
        reverted: Vec::new(),
        error: None,
    };

    for step in 1..=request.count() {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::undo_step_span(step, request.count()).entered();

        log::debug!("Undo step {step} of {}", request.count());
        match undo_step(runner) {
            Ok(script) => {
                report.status = report.status.combine(ExitStatus::Ok);
                report.reverted.push(script);
            }
            Err(e) => {
                log::error!("Undo step {step} of {} failed: {e}", request.count());
                report.status = report.status.combine(e.exit_status());
                report.error = Some(e);
                break;
            }
        }
    }

    report
}

fn undo_step(runner: &dyn MigrationRunner) -> Result<String, MigrationError> {
    let ledger = runner.ledger();

    log::debug!(
        "Resolving current migration from {}",
        quote_identifier(ledger.table())
    );
    let Some(current) = ledger.current()? else {
        log::warn!("⚠️  No migrations left to undo!");
        return Err(MigrationError::NoMigrationsToUndo);
    };

    log::debug!("Loading migration {}", current.script);
    let migration = runner.resolver().resolve(&current.script)?;
    let Some(atomic) = migration.as_atomic() else {
        log::warn!("💢 Migration {} is not an atomic migration", current.script);
        return Err(MigrationError::NotReversible {
            script: current.script,
        });
    };

    log::info!("Reverting {}", current.script);
    let sql = revert_statement(ledger.table(), &current.script, atomic.reverse_script());
    let executor = runner.executor();
    if let Err(e) = executor.batch_execute(&sql) {
        // The block may have stopped inside its own transaction
        if let Err(rollback) = executor.batch_execute("ROLLBACK") {
            log::debug!("Rollback after failed revert reported: {rollback}");
        }
        return Err(MigrationError::execution(current.script, e));
    }

    log::info!("Reverted {}", current.script);
    Ok(current.script)
}
