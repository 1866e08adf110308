//! Migration registry: the table an application fills with its migrations
//!
//! History rows name migrations by script identifier. The registry maps those
//! identifiers back to migration values, and records at registration time whether each
//! one is atomic, so undo can refuse forward-only migrations without a runtime type test.

use crate::migration::{
    AtomicMigration, Migration, MigrationError, MigrationIdentity, MigrationKind,
};
use crate::{LifeError, LifeExecutor};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered migration with its capability attached
#[derive(Clone)]
pub enum RegisteredMigration {
    /// Has both `up` and `down`; can be undone
    Atomic(Arc<dyn AtomicMigration>),
    /// One-way migration
    Forward(Arc<dyn Migration>),
}

impl RegisteredMigration {
    pub fn script(&self) -> &'static str {
        match self {
            Self::Atomic(m) => m.script(),
            Self::Forward(m) => m.script(),
        }
    }

    pub fn checksum(&self) -> Option<i32> {
        match self {
            Self::Atomic(m) => Some(m.checksum()),
            Self::Forward(m) => m.checksum(),
        }
    }

    pub fn can_execute_in_transaction(&self) -> bool {
        match self {
            Self::Atomic(m) => m.can_execute_in_transaction(),
            Self::Forward(m) => m.can_execute_in_transaction(),
        }
    }

    /// Apply the migration's forward script
    ///
    /// # Errors
    ///
    /// Returns the driver error unmodified.
    pub fn migrate(&self, executor: &dyn LifeExecutor) -> Result<(), LifeError> {
        match self {
            Self::Atomic(m) => m.execute(executor),
            Self::Forward(m) => m.migrate(executor),
        }
    }

    /// The reversible capability, if this migration has one
    pub fn as_atomic(&self) -> Option<&Arc<dyn AtomicMigration>> {
        match self {
            Self::Atomic(m) => Some(m),
            Self::Forward(_) => None,
        }
    }

    /// Value of the history table's `type` column
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Atomic(_) => crate::migration::record::TYPE_ATOMIC,
            Self::Forward(_) => crate::migration::record::TYPE_FORWARD,
        }
    }
}

impl std::fmt::Debug for RegisteredMigration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atomic(m) => f.debug_tuple("Atomic").field(&m.script()).finish(),
            Self::Forward(m) => f.debug_tuple("Forward").field(&m.script()).finish(),
        }
    }
}

/// Resolves a history entry's script identifier to a migration
pub trait MigrationResolver {
    /// # Errors
    ///
    /// Returns `MigrationError::Load` if no migration answers to `script`.
    fn resolve(&self, script: &str) -> Result<RegisteredMigration, MigrationError>;
}

/// A registry entry: the migration plus its identity, parsed once at registration
#[derive(Debug, Clone)]
pub struct MigrationDefinition {
    pub migration: RegisteredMigration,
    pub identity: MigrationIdentity,
}

/// Registry of the migrations an application ships
///
/// # Example
///
/// ```rust
/// use lifeguard_atomic::migration::{AtomicMigration, MigrationRegistry};
///
/// pub struct V001CreateAccountTable;
///
/// impl AtomicMigration for V001CreateAccountTable {
///     lifeguard_atomic::migration_script!(V001CreateAccountTable);
///
///     fn up(&self) -> &str { "CREATE TABLE account (id INT NOT NULL)" }
///     fn down(&self) -> &str { "DROP TABLE account" }
/// }
///
/// let mut registry = MigrationRegistry::new();
/// registry.register_atomic(V001CreateAccountTable).unwrap();
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MigrationRegistry {
    migrations: HashMap<String, MigrationDefinition>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reversible migration
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidIdentity` if the migration's name breaks the
    /// naming convention and `MigrationError::AlreadyRegistered` if its script identifier
    /// is taken.
    pub fn register_atomic<M: AtomicMigration + 'static>(
        &mut self,
        migration: M,
    ) -> Result<(), MigrationError> {
        self.insert(RegisteredMigration::Atomic(Arc::new(migration)))
    }

    /// Register a one-way migration
    ///
    /// # Errors
    ///
    /// Same as [`MigrationRegistry::register_atomic`].
    pub fn register<M: Migration + 'static>(&mut self, migration: M) -> Result<(), MigrationError> {
        self.insert(RegisteredMigration::Forward(Arc::new(migration)))
    }

    fn insert(&mut self, migration: RegisteredMigration) -> Result<(), MigrationError> {
        let script = migration.script();
        let identity = MigrationIdentity::from_script(script)?;

        if self.is_registered(script) {
            return Err(MigrationError::AlreadyRegistered {
                script: script.to_string(),
            });
        }

        self.migrations.insert(
            script.to_string(),
            MigrationDefinition {
                migration,
                identity,
            },
        );
        Ok(())
    }

    /// Check if a migration is registered
    pub fn is_registered(&self, script: &str) -> bool {
        self.migrations.contains_key(script)
    }

    pub fn get(&self, script: &str) -> Option<&MigrationDefinition> {
        self.migrations.get(script)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Versioned migrations in ascending version order
    pub fn versioned(&self) -> Vec<&MigrationDefinition> {
        let mut versioned: Vec<_> = self
            .migrations
            .values()
            .filter(|d| d.identity.kind == MigrationKind::Versioned)
            .collect();
        versioned.sort_by(|a, b| {
            a.identity
                .version
                .cmp(&b.identity.version)
                .then_with(|| a.migration.script().cmp(b.migration.script()))
        });
        versioned
    }

    /// Repeatable migrations ordered by description
    pub fn repeatable(&self) -> Vec<&MigrationDefinition> {
        let mut repeatable: Vec<_> = self
            .migrations
            .values()
            .filter(|d| d.identity.is_repeatable())
            .collect();
        repeatable.sort_by(|a, b| {
            a.identity
                .description
                .cmp(&b.identity.description)
                .then_with(|| a.migration.script().cmp(b.migration.script()))
        });
        repeatable
    }
}

impl MigrationResolver for MigrationRegistry {
    fn resolve(&self, script: &str) -> Result<RegisteredMigration, MigrationError> {
        self.migrations
            .get(script)
            .map(|d| d.migration.clone())
            .ok_or_else(|| MigrationError::Load {
                script: script.to_string(),
                reason: "no migration is registered under this identifier".to_string(),
            })
    }
}
