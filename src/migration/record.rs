//! `HistoryEntry` - Represents rows of the migration history table

use chrono::{DateTime, NaiveDateTime, Utc};

/// Value of the `type` column for atomic migrations
pub const TYPE_ATOMIC: &str = "ATOMIC";

/// Value of the `type` column for forward-only migrations
pub const TYPE_FORWARD: &str = "RUST";

/// One row of the migration history table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Monotonic application order
    pub installed_rank: i32,

    /// Version digits as written (`None` for repeatable migrations)
    pub version: Option<String>,

    pub description: String,

    /// Migration type (`ATOMIC` or `RUST`)
    pub kind: String,

    /// Identifier of the migration that produced this row
    pub script: String,

    pub checksum: Option<i32>,

    pub installed_by: String,

    /// When the migration was applied
    pub installed_on: DateTime<Utc>,

    /// Execution time in milliseconds
    pub execution_time: i32,

    /// Whether the migration completed successfully
    pub success: bool,
}

impl HistoryEntry {
    /// Create a `HistoryEntry` from a `may_postgres` row
    ///
    /// Expected column order: `installed_rank`, `version`, `description`, `type`, `script`,
    /// `checksum`, `installed_by`, `installed_on` (as text), `execution_time`, `success`
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if a column cannot be read or the timestamp cannot be parsed.
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, crate::LifeError> {
        let installed_on: String = row.try_get(7)?;

        Ok(Self {
            installed_rank: row.try_get(0)?,
            version: row.try_get(1)?,
            description: row.try_get(2)?,
            kind: row.try_get(3)?,
            script: row.try_get(4)?,
            checksum: row.try_get(5)?,
            installed_by: row.try_get(6)?,
            installed_on: parse_timestamp(&installed_on)?,
            execution_time: row.try_get(8)?,
            success: row.try_get(9)?,
        })
    }
}

/// Parse a timestamp as rendered by PostgreSQL (`CAST(ts AS TEXT)`) or SQLite
/// (`CURRENT_TIMESTAMP`)
///
/// # Errors
///
/// Returns `LifeError::ParseError` if no known format matches.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, crate::LifeError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            crate::LifeError::ParseError(format!(
                "Failed to parse timestamp '{text}': unrecognized format"
            ))
        })
}
