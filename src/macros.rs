//! Macros for declaring migrations

/// Implements `script()` for a migration type from its module path and name
///
/// The identifier is stored in the history table and looked up again on undo. It is
/// `module_path!()` joined to the type's name as written, and does not depend on the
/// compiler version.
///
/// Use it inside an `impl AtomicMigration` or `impl Migration` block:
///
/// ```rust
/// use lifeguard_atomic::migration::AtomicMigration;
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
/// assert!(V001CreateAccountTable.script().ends_with("::V001CreateAccountTable"));
/// ```
#[macro_export]
macro_rules! migration_script {
    ($name:ident) => {
        fn script(&self) -> &'static str {
            concat!(module_path!(), "::", stringify!($name))
        }
    };
}
