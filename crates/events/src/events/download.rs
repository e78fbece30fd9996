use apx_types::OperationStatus;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Download session and per-package lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Combined download started with frozen totals
    SessionStarted {
        session_id: String,
        packages: usize,
        total_count: u64,
        total_bytes: u64,
    },

    /// Combined download had nothing to fetch
    NothingToFetch { session_id: String },

    /// A package downloader became the active one
    PackageStarted {
        session_id: String,
        package: String,
        index: usize,
        total_count: u64,
        total_bytes: u64,
    },

    /// A package downloader finished successfully
    PackageCompleted {
        session_id: String,
        package: String,
        index: usize,
    },

    /// A package downloader ended without success; the session stops here
    PackageFailed {
        session_id: String,
        package: String,
        index: usize,
        status: OperationStatus,
    },

    /// A single asset failed inside a package downloader
    AssetFailed {
        package: String,
        asset: String,
        failure: super::FailureContext,
    },

    /// Combined download finished
    SessionCompleted {
        session_id: String,
        success: bool,
        current_count: u64,
        current_bytes: u64,
        duration: Duration,
    },
}
