//! Download and package-transfer error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum DownloadError {
    #[error("package not found: {package}")]
    PackageNotFound { package: String },

    #[error("asset not found in mirror: {package}/{asset}")]
    SourceMissing { package: String, asset: String },

    #[error("failed to download {package}/{asset}: {message}")]
    AssetFailed {
        package: String,
        asset: String,
        message: String,
    },

    #[error("size mismatch for {asset}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        asset: String,
        expected: u64,
        actual: u64,
    },

    #[error("checksum mismatch for {asset}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    #[error("retries exhausted for {asset} after {attempts} attempts: {message}")]
    RetriesExhausted {
        asset: String,
        attempts: u32,
        message: String,
    },

    #[error("download worker stopped unexpectedly: {message}")]
    WorkerAborted { message: String },

    #[error("download cancelled")]
    Cancelled,
}

impl UserFacingError for DownloadError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound { .. } => {
                Some("Check the package name against the catalog (`apx info`).")
            }
            Self::SourceMissing { .. } => {
                Some("The mirror is missing a file listed in the catalog; refresh the mirror.")
            }
            Self::SizeMismatch { .. } | Self::ChecksumMismatch { .. } => {
                Some("The mirrored file does not match the catalog; run `apx repair`.")
            }
            Self::AssetFailed { .. } | Self::RetriesExhausted { .. } | Self::Cancelled => {
                Some("Retry the download; files fetched so far are kept.")
            }
            Self::WorkerAborted { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AssetFailed { .. }
                | Self::RetriesExhausted { .. }
                | Self::SizeMismatch { .. }
                | Self::WorkerAborted { .. }
                | Self::Cancelled
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::PackageNotFound { .. } => "download.package_not_found",
            Self::SourceMissing { .. } => "download.source_missing",
            Self::AssetFailed { .. } => "download.asset_failed",
            Self::SizeMismatch { .. } => "download.size_mismatch",
            Self::ChecksumMismatch { .. } => "download.checksum_mismatch",
            Self::RetriesExhausted { .. } => "download.retries_exhausted",
            Self::WorkerAborted { .. } => "download.worker_aborted",
            Self::Cancelled => "download.cancelled",
        };
        Some(code)
    }
}
