#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Hashing for apx
//!
//! Two unrelated jobs share this crate:
//! - BLAKE3 content hashes computed while assets are copied into the sandbox
//! - the seeded xxh3 version encoder that turns raw patch versions into
//!   short display codes (see [`version`])

use apx_errors::{Error, StorageError};
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub mod version;

pub use version::{
    encode_version, version_hash, DEFAULT_ENCODE_LENGTH, DEFAULT_SEED_MASK, MAX_ENCODE_LENGTH,
};

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// A BLAKE3 hash value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from hex string
    ///
    /// # Errors
    /// Returns an error if the input string is not valid hexadecimal or is not exactly 64 characters (32 bytes).
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| StorageError::CorruptedData {
            message: format!("invalid hex: {e}"),
        })?;

        if bytes.len() != 32 {
            return Err(StorageError::CorruptedData {
                message: format!("hash must be 32 bytes, got {}", bytes.len()),
            }
            .into());
        }

        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes);
        Ok(Self::from_bytes(array))
    }

    /// Compute hash while copying data to a writer
    ///
    /// # Errors
    /// Returns an error if reading from the reader or writing to the writer fails.
    pub async fn hash_and_copy<R, W>(mut reader: R, mut writer: W) -> Result<(Self, u64), Error>
    where
        R: AsyncReadExt + Unpin,
        W: AsyncWriteExt + Unpin,
    {
        let mut hasher = Hasher::new();
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut total_bytes = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }

            hasher.update(&buffer[..n]);
            writer.write_all(&buffer[..n]).await?;
            total_bytes += n as u64;
        }

        writer.flush().await?;
        Ok((Self::from_bytes(*hasher.finalize().as_bytes()), total_bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hash_of(data: &[u8]) -> ContentHash {
        let mut sink = Vec::new();
        ContentHash::hash_and_copy(data, &mut sink).await.unwrap().0
    }

    #[tokio::test]
    async fn test_hash_basics() {
        let hash = hash_of(b"hello world").await;

        // Known BLAKE3 hash of "hello world"
        let expected = "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24";
        assert_eq!(hash.to_hex(), expected);
        assert_eq!(ContentHash::from_hex(expected).unwrap(), hash);
    }

    #[tokio::test]
    async fn test_hash_serialization() {
        let hash = hash_of(b"test").await;
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let deserialized: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, deserialized);
    }

    #[tokio::test]
    async fn test_hash_and_copy() {
        let data = b"data to copy";
        let reader = std::io::Cursor::new(data);
        let mut writer = Vec::new();

        let (hash, bytes) = ContentHash::hash_and_copy(reader, &mut writer)
            .await
            .unwrap();

        assert_eq!(writer, data);
        assert_eq!(bytes, data.len() as u64);
        assert_eq!(hash, hash_of(data).await);
    }
}
