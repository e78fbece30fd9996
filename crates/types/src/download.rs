//! Download progress and result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Combined size of a set of pending downloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub total_count: u64,
    pub total_bytes: u64,
}

impl DownloadInfo {
    /// Nothing left to fetch
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Add one downloader's totals
    pub fn accumulate(&mut self, count: u64, bytes: u64) {
        self.total_count = self.total_count.saturating_add(count);
        self.total_bytes = self.total_bytes.saturating_add(bytes);
    }
}

/// Lifecycle state of a downloader operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Not started
    #[default]
    None,
    /// Transfer in flight
    Processing,
    /// Every pending file arrived
    Succeeded,
    /// Stopped on an error or a cancel
    Failed,
}

impl OperationStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    #[must_use]
    pub fn is_succeeded(self) -> bool {
        self == Self::Succeeded
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Absolute counters reported by a single downloader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProgress {
    pub total_count: u64,
    pub current_count: u64,
    pub total_bytes: u64,
    pub current_bytes: u64,
}

/// Session-wide progress with the current throughput estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedProgress {
    pub total_count: u64,
    pub current_count: u64,
    pub total_bytes: u64,
    pub current_bytes: u64,
    /// Smoothed throughput in bytes per second
    pub bytes_per_second: f64,
}

impl SpeedProgress {
    /// Byte progress as a percentage (0.0-100.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.current_bytes as f64 / self.total_bytes as f64) * 100.0
    }

    /// Format speed in human-readable units
    #[must_use]
    pub fn format_speed(&self) -> String {
        let speed = self.bytes_per_second;
        if speed > 1_000_000.0 {
            format!("{:.1} MB/s", speed / 1_000_000.0)
        } else if speed > 1_000.0 {
            format!("{:.1} KB/s", speed / 1_000.0)
        } else {
            format!("{speed:.0} B/s")
        }
    }
}

/// Failure detail handed to the error callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFailure {
    pub package: String,
    pub asset: String,
    pub message: String,
}

impl DownloadFailure {
    pub fn new(
        package: impl Into<String>,
        asset: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            asset: asset.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.package, self.asset, self.message)
    }
}
