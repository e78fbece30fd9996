//! Seeded version encoder
//!
//! Raw patch versions ("2024.11.03-1842-rc2") are unwieldy on screen. The
//! encoder hashes the separator-delimited segments with a seeded xxh3 and
//! renders the result in Crockford base32, so two builds sharing a raw
//! version always show the same short code on every platform.

use apx_errors::VersionError;
use xxhash_rust::xxh3::{xxh3_64_with_seed, Xxh3};

/// Seed used when callers do not pick one
pub const DEFAULT_SEED_MASK: u32 = 1 << 5;

/// Display length used when callers do not pick one
pub const DEFAULT_ENCODE_LENGTH: usize = 6;

/// Longest code the encoder will produce
pub const MAX_ENCODE_LENGTH: usize = 64;

/// Crockford base32: no I, L, O or U
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const BITS_PER_CHAR: u32 = 5;
const CHARS_PER_BLOCK: u32 = 64 / BITS_PER_CHAR;

/// Stable 64-bit hash of a raw version
///
/// Each segment is fed with its index and length so that moving a separator
/// changes the hash.
#[must_use]
pub fn version_hash(raw: &str, separator: &str, seed_mask: u32) -> u64 {
    let mut hasher = Xxh3::with_seed(u64::from(seed_mask));

    if separator.is_empty() {
        hasher.update(raw.as_bytes());
    } else {
        for (index, segment) in raw.split(separator).enumerate() {
            hasher.update(&(index as u64).to_le_bytes());
            hasher.update(&(segment.len() as u64).to_le_bytes());
            hasher.update(segment.as_bytes());
        }
    }
    hasher.update(separator.as_bytes());

    hasher.digest()
}

/// Encode a raw version into a display code of exactly `length` characters
///
/// # Errors
///
/// Returns `VersionError::InvalidLength` when `length` is zero or larger
/// than [`MAX_ENCODE_LENGTH`].
pub fn encode_version(
    raw: &str,
    separator: &str,
    seed_mask: u32,
    length: usize,
) -> Result<String, VersionError> {
    if length == 0 || length > MAX_ENCODE_LENGTH {
        return Err(VersionError::InvalidLength {
            length,
            max: MAX_ENCODE_LENGTH,
        });
    }

    let mut code = String::with_capacity(length);
    let mut block = version_hash(raw, separator, seed_mask);
    let mut round = 0u64;

    while code.len() < length {
        for position in 0..CHARS_PER_BLOCK {
            if code.len() == length {
                break;
            }
            #[allow(clippy::cast_possible_truncation)]
            let index = ((block >> (position * BITS_PER_CHAR)) & 0x1F) as usize;
            code.push(char::from(ALPHABET[index]));
        }

        // Chain the next block off the previous one for long codes
        round += 1;
        block = xxh3_64_with_seed(&block.to_le_bytes(), u64::from(seed_mask).wrapping_add(round));
    }

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_length() {
        let code = encode_version("1.0.0-20240101", "-", DEFAULT_SEED_MASK, 6).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_long_codes_extend_prefix() {
        let short = encode_version("1.2.3", "-", DEFAULT_SEED_MASK, 12).unwrap();
        let long = encode_version("1.2.3", "-", DEFAULT_SEED_MASK, 40).unwrap();
        assert_eq!(long.len(), 40);
        assert!(long.starts_with(&short));
    }

    #[test]
    fn test_rejects_bad_length() {
        assert!(matches!(
            encode_version("1.2.3", "-", DEFAULT_SEED_MASK, 0),
            Err(VersionError::InvalidLength { length: 0, .. })
        ));
        assert!(encode_version("1.2.3", "-", DEFAULT_SEED_MASK, MAX_ENCODE_LENGTH + 1).is_err());
    }

    #[test]
    fn test_seed_and_separator_matter() {
        let base = version_hash("1.2.3-rc1", "-", DEFAULT_SEED_MASK);
        assert_ne!(base, version_hash("1.2.3-rc1", "-", 7));
        assert_ne!(base, version_hash("1.2.3-rc1", ".", DEFAULT_SEED_MASK));
        assert_ne!(base, version_hash("1.2.3rc1-", "-", DEFAULT_SEED_MASK));
    }

    #[test]
    fn test_empty_separator_hashes_whole_string() {
        let a = version_hash("abc", "", DEFAULT_SEED_MASK);
        let b = version_hash("abc", "", DEFAULT_SEED_MASK);
        assert_eq!(a, b);
    }
}
