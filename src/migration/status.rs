//! Migration status reporting

use crate::migration::{HistoryEntry, MigrationKind, MigrationVersion};

/// Snapshot of applied and pending migrations
#[derive(Debug, Clone)]
pub struct MigrationInfo {
    /// Applied migrations (from the history table), oldest first
    pub applied: Vec<HistoryEntry>,

    /// Registered migrations that the next `migrate` would run, in execution order
    pub pending: Vec<PendingMigration>,

    /// The entry undo would revert next
    pub current: Option<HistoryEntry>,
}

/// A registered migration not yet applied (or a repeatable one whose checksum changed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub script: String,

    pub kind: MigrationKind,

    /// `None` for repeatable migrations
    pub version: Option<MigrationVersion>,

    pub description: String,

    pub checksum: Option<i32>,

    /// Whether undo can revert it once applied
    pub reversible: bool,
}

impl MigrationInfo {
    #[must_use]
    pub fn new(
        applied: Vec<HistoryEntry>,
        pending: Vec<PendingMigration>,
        current: Option<HistoryEntry>,
    ) -> Self {
        Self {
            applied,
            pending,
            current,
        }
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Highest applied version, if any versioned migration is applied
    #[must_use]
    pub fn latest_applied_version(&self) -> Option<MigrationVersion> {
        self.applied
            .iter()
            .filter_map(|e| e.version.as_deref())
            .filter_map(|v| MigrationVersion::parse(v).ok())
            .max()
    }

    /// Version the next `migrate` would apply first
    #[must_use]
    pub fn next_pending_version(&self) -> Option<&MigrationVersion> {
        self.pending.iter().find_map(|p| p.version.as_ref())
    }
}
