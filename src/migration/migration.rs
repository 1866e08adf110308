//! Migration trait definitions

use crate::migration::checksum::calculate_checksum;
use crate::migration::{MigrationError, MigrationIdentity, MigrationVersion};
use crate::{LifeError, LifeExecutor};

/// A one-way migration
///
/// Forward-only migrations may appear in the history ledger next to atomic ones, but undo
/// refuses to touch them.
pub trait Migration: Send + Sync {
    /// Identifier stored in the history table's `script` column
    ///
    /// Usually written with [`migration_script!`](crate::migration_script). The last `::`
    /// segment must follow the `V<digits>Name` / `R<digits?>Name` naming convention.
    fn script(&self) -> &'static str;

    /// Checksum recorded for drift detection, if the migration has one
    fn checksum(&self) -> Option<i32> {
        None
    }

    /// Whether the runner may wrap this migration in a transaction
    fn can_execute_in_transaction(&self) -> bool {
        true
    }

    /// Apply the migration
    fn migrate(&self, executor: &dyn LifeExecutor) -> Result<(), LifeError>;
}

/// A reversible migration carrying both a forward and a reverse script
///
/// Each atomic migration is a type named after its identity whose `up()` and `down()`
/// return SQL text:
///
/// ```rust
/// use lifeguard_atomic::migration::AtomicMigration;
///
/// pub struct V001CreateAccountTable;
///
/// impl AtomicMigration for V001CreateAccountTable {
///     lifeguard_atomic::migration_script!(V001CreateAccountTable);
///
///     fn up(&self) -> &str {
///         "CREATE TABLE account (id INT NOT NULL, username VARCHAR(50) NOT NULL)"
///     }
///
///     fn down(&self) -> &str {
///         "DROP TABLE account"
///     }
/// }
///
/// let identity = V001CreateAccountTable.identity().unwrap();
/// assert_eq!(identity.description, "CreateAccountTable");
/// ```
pub trait AtomicMigration: Send + Sync {
    /// Forward script, executed as exactly one statement
    fn up(&self) -> &str;

    /// Reverse script, run by undo inside the same transaction as the history cleanup
    fn down(&self) -> &str;

    /// Identifier stored in the history table's `script` column
    ///
    /// Must stay the same for as long as the migration is in the history table.
    fn script(&self) -> &'static str;

    fn can_execute_in_transaction(&self) -> bool {
        true
    }

    /// Checksum of the `up` script
    fn checksum(&self) -> i32 {
        calculate_checksum(self.up())
    }

    /// Kind, version and description decoded from the type name
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidIdentity` if the name breaks the convention.
    fn identity(&self) -> Result<MigrationIdentity, MigrationError> {
        MigrationIdentity::from_script(self.script())
    }

    /// # Errors
    ///
    /// Returns `MigrationError::InvalidIdentity` if the name breaks the convention.
    fn description(&self) -> Result<String, MigrationError> {
        self.identity().map(|identity| identity.description)
    }

    /// `None` for repeatable migrations
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidIdentity` if the name breaks the convention.
    fn version(&self) -> Result<Option<MigrationVersion>, MigrationError> {
        self.identity().map(|identity| identity.version)
    }

    /// Run the `up` script as a single prepared statement
    ///
    /// # Errors
    ///
    /// Returns the driver's error unmodified, e.g. a syntax error for malformed SQL.
    fn execute(&self, executor: &dyn LifeExecutor) -> Result<(), LifeError> {
        executor.execute(self.up()).map(|_| ())
    }

    /// The `down` script, verbatim
    fn reverse_script(&self) -> &str {
        self.down()
    }
}
