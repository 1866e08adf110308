//! Shared fixtures: an in-memory SQLite backend for both migration seams, and the
//! account-table migrations the tests apply and undo.

#![allow(dead_code)]

use lifeguard_atomic::migration::record::parse_timestamp;
use lifeguard_atomic::migration::state_table::select_entries_sql;
use lifeguard_atomic::migration::{
    AtomicMigration, HistoryEntry, HistoryLedger, Migration, MigrationError, MigrationRegistry,
    Migrator,
};
use lifeguard_atomic::{migration_script, LifeError, LifeExecutor};
use rusqlite::Connection;
use std::rc::Rc;

pub const HISTORY_TABLE: &str = "flyway_schema_history";

// ============================================================================
// SQLite backend
// ============================================================================

fn sqlite_error(e: rusqlite::Error) -> LifeError {
    LifeError::QueryError(e.to_string())
}

/// `LifeExecutor` over a shared SQLite connection
pub struct SqliteExecutor {
    conn: Rc<Connection>,
}

impl SqliteExecutor {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self { conn }
    }
}

impl LifeExecutor for SqliteExecutor {
    fn execute(&self, sql: &str) -> Result<u64, LifeError> {
        // rusqlite rejects more than one statement here
        self.conn
            .execute(sql, [])
            .map(|rows| rows as u64)
            .map_err(sqlite_error)
    }

    fn batch_execute(&self, sql: &str) -> Result<(), LifeError> {
        self.conn.execute_batch(sql).map_err(sqlite_error)
    }
}

/// `HistoryLedger` stored in the same SQLite database
pub struct SqliteLedger {
    conn: Rc<Connection>,
}

impl SqliteLedger {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self { conn }
    }
}

impl HistoryLedger for SqliteLedger {
    fn table(&self) -> &str {
        HISTORY_TABLE
    }

    fn exists(&self) -> Result<bool, MigrationError> {
        table_exists(&self.conn, HISTORY_TABLE).map_err(MigrationError::from)
    }

    fn entries(&self) -> Result<Vec<HistoryEntry>, MigrationError> {
        let mut stmt = self
            .conn
            .prepare(&select_entries_sql(HISTORY_TABLE))
            .map_err(sqlite_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<i32>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, i32>(8)?,
                    row.get::<_, bool>(9)?,
                ))
            })
            .map_err(sqlite_error)?;

        let mut entries = Vec::new();
        for row in rows {
            let (rank, version, description, kind, script, checksum, by, on, time, success) =
                row.map_err(sqlite_error)?;
            entries.push(HistoryEntry {
                installed_rank: rank,
                version,
                description,
                kind,
                script,
                checksum,
                installed_by: by,
                installed_on: parse_timestamp(&on)?,
                execution_time: time,
                success,
            });
        }
        Ok(entries)
    }
}

// ============================================================================
// Database helpers
// ============================================================================

pub fn sqlite() -> Rc<Connection> {
    Rc::new(Connection::open_in_memory().expect("open in-memory SQLite"))
}

pub fn migrator(conn: &Rc<Connection>, registry: MigrationRegistry) -> Migrator {
    Migrator::new(
        SqliteExecutor::new(Rc::clone(conn)),
        SqliteLedger::new(Rc::clone(conn)),
        registry,
    )
    .with_installed_by("tester")
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, LifeError> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
    .map_err(sqlite_error)
}

/// Column names of `table`, in declaration order
pub fn columns(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{table}\")"))
        .expect("prepare table_info");
    stmt.query_map([], |row| row.get::<_, String>(1))
        .expect("query table_info")
        .map(|name| name.expect("column name"))
        .collect()
}

/// Every schema object except the history table, as `type name`, with column lists for
/// tables
pub fn schema_snapshot(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare(
            "SELECT type, name FROM sqlite_master \
             WHERE name <> ?1 AND name NOT LIKE 'sqlite_%' ORDER BY type, name",
        )
        .expect("prepare schema snapshot");
    let objects: Vec<(String, String)> = stmt
        .query_map([HISTORY_TABLE], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query schema snapshot")
        .map(|row| row.expect("schema row"))
        .collect();

    objects
        .into_iter()
        .map(|(kind, name)| {
            if kind == "table" {
                format!("{kind} {name}({})", columns(conn, &name).join(", "))
            } else {
                format!("{kind} {name}")
            }
        })
        .collect()
}

/// Script column of every history row, in rank order
pub fn history_scripts(conn: &Rc<Connection>) -> Vec<String> {
    SqliteLedger::new(Rc::clone(conn))
        .entries()
        .expect("read history")
        .into_iter()
        .map(|entry| entry.script)
        .collect()
}

// ============================================================================
// Migrations
// ============================================================================

pub struct V001CreateAccountTable;

impl AtomicMigration for V001CreateAccountTable {
    migration_script!(V001CreateAccountTable);

    fn up(&self) -> &str {
        "CREATE TABLE account (\
           id INTEGER NOT NULL PRIMARY KEY, \
           username VARCHAR(50) NOT NULL, \
           password VARCHAR(100) NOT NULL\
         )"
    }

    fn down(&self) -> &str {
        "DROP TABLE account"
    }
}

pub struct V002AddCreatedAtToAccount;

impl AtomicMigration for V002AddCreatedAtToAccount {
    migration_script!(V002AddCreatedAtToAccount);

    fn up(&self) -> &str {
        "ALTER TABLE account ADD COLUMN created_at DATE"
    }

    fn down(&self) -> &str {
        "ALTER TABLE account DROP COLUMN created_at"
    }
}

/// Forward-only: legal in history, refused by undo
#[allow(non_camel_case_types)]
pub struct V003__CreateAuditTable;

impl Migration for V003__CreateAuditTable {
    migration_script!(V003__CreateAuditTable);

    fn migrate(&self, executor: &dyn LifeExecutor) -> Result<(), LifeError> {
        executor
            .execute("CREATE TABLE audit (id INTEGER NOT NULL, action TEXT NOT NULL)")
            .map(|_| ())
    }
}

pub struct V004AddEmailToAccount;

impl AtomicMigration for V004AddEmailToAccount {
    migration_script!(V004AddEmailToAccount);

    fn up(&self) -> &str {
        "ALTER TABLE account ADD COLUMN email VARCHAR(100)"
    }

    fn down(&self) -> &str {
        "ALTER TABLE account DROP COLUMN email;"
    }
}

/// Its down script drops the column and then hits a syntax error
pub struct V005AddLastLoginToAccount;

impl AtomicMigration for V005AddLastLoginToAccount {
    migration_script!(V005AddLastLoginToAccount);

    fn up(&self) -> &str {
        "ALTER TABLE account ADD COLUMN last_login DATE"
    }

    fn down(&self) -> &str {
        "ALTER TABLE account DROP COLUMN last_login;\n  ALTER TABL account RENAME TO gone"
    }
}

/// Creates a table, then fails; both must vanish with the transaction
pub struct V006HalfFinished;

impl Migration for V006HalfFinished {
    migration_script!(V006HalfFinished);

    fn migrate(&self, executor: &dyn LifeExecutor) -> Result<(), LifeError> {
        executor.execute("CREATE TABLE half_finished (id INTEGER)")?;
        executor.execute("INSERT INTO no_such_table VALUES (1)")?;
        Ok(())
    }
}

#[allow(non_camel_case_types)]
pub struct R__AccountNames;

impl AtomicMigration for R__AccountNames {
    migration_script!(R__AccountNames);

    fn up(&self) -> &str {
        "CREATE VIEW IF NOT EXISTS account_names AS SELECT username FROM account"
    }

    fn down(&self) -> &str {
        "DROP VIEW IF EXISTS account_names"
    }
}

/// Registry with `V001` and `V002`
pub fn account_registry() -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    registry
        .register_atomic(V001CreateAccountTable)
        .expect("register V001");
    registry
        .register_atomic(V002AddCreatedAtToAccount)
        .expect("register V002");
    registry
}
