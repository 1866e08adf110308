//! Checksum calculation for migration scripts

use sha2::{Digest, Sha256};

/// Calculate the checksum of an `up` script
///
/// This is used to detect that a migration was edited after being applied. The history
/// table stores an integer, so the first four bytes of the SHA-256 digest are read as a
/// big-endian `i32`. The result depends on the script text alone.
#[must_use]
pub fn calculate_checksum(script: &str) -> i32 {
    let hash = Sha256::digest(script.as_bytes());
    i32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])
}

/// Validate a stored checksum against the current one
///
/// Returns `Ok(())` if checksums match, or both values if they don't.
pub fn validate_checksum(stored: i32, current: i32) -> Result<(), (i32, i32)> {
    if stored == current {
        Ok(())
    } else {
        Err((stored, current))
    }
}
