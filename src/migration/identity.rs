//! Migration identity: kind, version and description derived from a migration's name
//!
//! Names follow the convention:
//!
//! - Versioned: `V<digits>[__]<Name>`, e.g. `V001CreateAccountTable`, `V2__AddIndex`
//! - Repeatable: `R[<digits>][__]<Name>`, e.g. `RRefreshViews`, `R001TestSeed`
//!
//! where `<Name>` starts with an uppercase ASCII letter followed by ASCII letters,
//! digits or underscores.

use crate::migration::MigrationError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

static VERSIONED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(V)([0-9]+)(__)?([A-Z][A-Za-z0-9_]*)$").expect("versioned pattern is valid")
});

static REPEATABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(R)([0-9]*)(__)?([A-Z][A-Za-z0-9_]*)$").expect("repeatable pattern is valid")
});

/// Whether a migration runs once at a fixed version or again whenever it changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationKind {
    Versioned,
    Repeatable,
}

/// Version of a versioned migration
///
/// Keeps the digits as written for display and compares them numerically, so
/// `001 == 1 < 2 < 10`.
#[derive(Debug, Clone)]
pub struct MigrationVersion {
    raw: String,
}

impl MigrationVersion {
    /// Build a version from its digit string
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidIdentity` if `digits` is empty or not all ASCII digits.
    pub fn parse(digits: &str) -> Result<Self, MigrationError> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MigrationError::InvalidIdentity {
                identifier: digits.to_string(),
            });
        }
        Ok(Self {
            raw: digits.to_string(),
        })
    }

    /// The digits exactly as they appear in the migration name
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn significant(&self) -> &str {
        let trimmed = self.raw.trim_start_matches('0');
        if trimmed.is_empty() {
            "0"
        } else {
            trimmed
        }
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for MigrationVersion {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for MigrationVersion {}

impl Hash for MigrationVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }
}

/// Kind, version and description decoded from a migration name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationIdentity {
    pub kind: MigrationKind,
    /// Always `None` for repeatable migrations
    pub version: Option<MigrationVersion>,
    pub description: String,
}

impl MigrationIdentity {
    /// Parse a migration name such as `V001CreateAccountTable`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidIdentity` carrying `identifier` when it matches
    /// neither naming pattern. This is fatal: a migration set containing such a name must
    /// not be executed.
    pub fn parse(identifier: &str) -> Result<Self, MigrationError> {
        let invalid = || MigrationError::InvalidIdentity {
            identifier: identifier.to_string(),
        };

        if identifier.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        // Repeatable is tested first: the kind comes from which pattern matched, never
        // from character positions.
        if let Some(caps) = REPEATABLE_PATTERN.captures(identifier) {
            let digits = group(&caps, 2);
            return Ok(Self {
                kind: MigrationKind::Repeatable,
                version: None,
                description: format!("{digits}{}", group(&caps, 4)),
            });
        }

        if let Some(caps) = VERSIONED_PATTERN.captures(identifier) {
            let version = MigrationVersion::parse(group(&caps, 2)).map_err(|_| invalid())?;
            return Ok(Self {
                kind: MigrationKind::Versioned,
                version: Some(version),
                description: group(&caps, 4).to_string(),
            });
        }

        Err(invalid())
    }

    /// Parse the identity from a script identifier such as `my_app::migrations::V001Init`
    ///
    /// Only the last path segment (the type's own name) carries the naming convention.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidIdentity` if the last segment is not a valid name.
    pub fn from_script(script: &str) -> Result<Self, MigrationError> {
        Self::parse(simple_name(script))
    }

    pub fn is_repeatable(&self) -> bool {
        self.kind == MigrationKind::Repeatable
    }
}

/// Last `::` segment of a type path
pub fn simple_name(script: &str) -> &str {
    script.rsplit("::").next().unwrap_or(script)
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}
