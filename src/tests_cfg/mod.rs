//! In-process test doubles for the executor and ledger seams

use crate::migration::{HistoryEntry, HistoryLedger, MigrationError};
use crate::{LifeError, LifeExecutor};
use chrono::Utc;
use std::cell::RefCell;
use std::rc::Rc;

/// Executor that records every statement and optionally fails on a substring
///
/// Clones share one statement log.
#[derive(Default, Clone)]
pub struct RecordingExecutor {
    statements: Rc<RefCell<Vec<String>>>,
    fail_on: Option<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail (with `LifeError::QueryError`) any statement containing `needle`
    pub fn failing_on(needle: &str) -> Self {
        Self {
            statements: Rc::default(),
            fail_on: Some(needle.to_string()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    fn run(&self, sql: &str) -> Result<(), LifeError> {
        self.statements.borrow_mut().push(sql.to_string());
        match &self.fail_on {
            Some(needle) if sql.contains(needle.as_str()) => Err(LifeError::QueryError(
                format!("syntax error at or near \"{needle}\""),
            )),
            _ => Ok(()),
        }
    }
}

impl LifeExecutor for RecordingExecutor {
    fn execute(&self, sql: &str) -> Result<u64, LifeError> {
        self.run(sql).map(|()| 0)
    }

    fn batch_execute(&self, sql: &str) -> Result<(), LifeError> {
        self.run(sql)
    }
}

/// Ledger over a fixed vector of entries
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RefCell<Vec<HistoryEntry>>,
}

impl InMemoryLedger {
    pub fn with_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: RefCell::new(entries),
        }
    }
}

impl HistoryLedger for InMemoryLedger {
    fn table(&self) -> &str {
        "flyway_schema_history"
    }

    fn exists(&self) -> Result<bool, MigrationError> {
        Ok(true)
    }

    fn entries(&self) -> Result<Vec<HistoryEntry>, MigrationError> {
        let mut entries = self.entries.borrow().clone();
        entries.sort_by_key(|e| e.installed_rank);
        Ok(entries)
    }
}

/// A successful history row
pub fn entry(rank: i32, version: Option<&str>, script: &str) -> HistoryEntry {
    let name = crate::migration::identity::simple_name(script);
    HistoryEntry {
        installed_rank: rank,
        version: version.map(ToString::to_string),
        description: name.to_string(),
        kind: crate::migration::record::TYPE_ATOMIC.to_string(),
        script: script.to_string(),
        checksum: None,
        installed_by: "tester".to_string(),
        installed_on: Utc::now(),
        execution_time: 1,
        success: true,
    }
}
