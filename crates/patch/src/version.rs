//! Display form of patch versions

use apx_errors::VersionError;
use apx_hash::{encode_version, DEFAULT_SEED_MASK};

pub use apx_hash::{DEFAULT_ENCODE_LENGTH, MAX_ENCODE_LENGTH};

/// Default separator between version segments
pub const DEFAULT_SEPARATOR: &str = "-";

/// Return `raw` unchanged, or its encoded display code when `encode` is set
///
/// # Errors
///
/// Returns `VersionError::InvalidLength` when encoding with a zero or
/// oversized `length`.
pub fn encode_patch_version(
    raw: &str,
    encode: bool,
    length: usize,
    separator: &str,
) -> Result<String, VersionError> {
    encode_patch_version_seeded(raw, encode, length, separator, DEFAULT_SEED_MASK)
}

/// [`encode_patch_version`] with an explicit hash seed
///
/// # Errors
///
/// Returns `VersionError::InvalidLength` when encoding with a zero or
/// oversized `length`.
pub fn encode_patch_version_seeded(
    raw: &str,
    encode: bool,
    length: usize,
    separator: &str,
    seed: u32,
) -> Result<String, VersionError> {
    if !encode {
        return Ok(raw.to_string());
    }
    encode_version(raw, separator, seed, length)
}
