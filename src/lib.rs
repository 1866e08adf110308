//! # Lifeguard Atomic
//!
//! Reversible PostgreSQL migrations: every atomic migration carries an `up` and a `down`
//! script, and undo reverts the most recent one together with its history row in a single
//! transaction.
//!
//! See [README on GitHub](https://github.com/microscaler/lifeguard) for the wider project.

pub mod cli;
pub mod config;
pub mod connection;
pub mod executor;
mod macros;
pub mod migration;
pub mod transaction;

#[cfg(feature = "tracing")]
mod tracing_helpers;

#[cfg(test)]
mod tests_cfg;

pub use config::DatabaseConfig;
pub use connection::{connect, ConnectionError};
pub use executor::{LifeError, LifeExecutor, MayPostgresExecutor};
pub use migration::{
    AtomicMigration, ExitStatus, Migration, MigrationError, MigrationRegistry, Migrator,
    UndoRequest,
};
