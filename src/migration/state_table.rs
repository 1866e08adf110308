//! Migration history table management
//!
//! The column set matches Flyway's `flyway_schema_history`, so a database already tracked
//! by Flyway can be migrated and undone without conversion. All statements here are plain
//! SQL accepted by PostgreSQL and SQLite.

use crate::migration::HistoryEntry;

/// Quote an identifier (`"name"`), doubling embedded quotes
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal (`'text'`), doubling embedded quotes
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE TABLE IF NOT EXISTS` for the history table
#[must_use]
pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
    "installed_rank" INT NOT NULL PRIMARY KEY,
    "version" VARCHAR(50),
    "description" VARCHAR(200) NOT NULL,
    "type" VARCHAR(20) NOT NULL,
    "script" VARCHAR(1000) NOT NULL,
    "checksum" INT,
    "installed_by" VARCHAR(100) NOT NULL,
    "installed_on" TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    "execution_time" INT NOT NULL,
    "success" BOOLEAN NOT NULL
)"#,
        quote_identifier(table)
    )
}

/// Count (as `INT`) of tables named `table` in the current PostgreSQL schema
#[must_use]
pub fn table_exists_sql(table: &str) -> String {
    format!(
        "SELECT CAST(COUNT(*) AS INT) FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = {}",
        quote_literal(table)
    )
}

/// `SELECT` of every history row, oldest first, in `HistoryEntry::from_row` column order
#[must_use]
pub fn select_entries_sql(table: &str) -> String {
    format!(
        r#"SELECT "installed_rank", "version", "description", "type", "script", "checksum",
       "installed_by", CAST("installed_on" AS TEXT), "execution_time", "success"
FROM {}
ORDER BY "installed_rank" ASC"#,
        quote_identifier(table)
    )
}

/// `INSERT` of one history row; `installed_on` is left to the database clock
#[must_use]
pub fn insert_entry_sql(table: &str, entry: &HistoryEntry) -> String {
    let version = entry
        .version
        .as_deref()
        .map_or_else(|| "NULL".to_string(), quote_literal);
    let checksum = entry
        .checksum
        .map_or_else(|| "NULL".to_string(), |c| c.to_string());

    format!(
        r#"INSERT INTO {} ("installed_rank", "version", "description", "type", "script", "checksum", "installed_by", "execution_time", "success") VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {})"#,
        quote_identifier(table),
        entry.installed_rank,
        version,
        quote_literal(&entry.description),
        quote_literal(&entry.kind),
        quote_literal(&entry.script),
        checksum,
        quote_literal(&entry.installed_by),
        entry.execution_time,
        if entry.success { "TRUE" } else { "FALSE" },
    )
}

/// `DELETE` of every history row belonging to `script`
#[must_use]
pub fn delete_script_sql(table: &str, script: &str) -> String {
    format!(
        r#"DELETE FROM {} WHERE "script"={}"#,
        quote_identifier(table),
        quote_literal(script)
    )
}
