//! The downloader contract consumed by the orchestrator

use apx_types::{DownloadFailure, FileProgress, OperationStatus, SpeedProgress};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Receives a downloader's own absolute counters
pub type ProgressCallback = Arc<dyn Fn(FileProgress) + Send + Sync>;

/// Receives one failure report per failing asset
pub type ErrorCallback = Arc<dyn Fn(&DownloadFailure) + Send + Sync>;

/// Receives session-wide counters with the current speed
pub type SpeedProgressCallback = Arc<dyn Fn(&SpeedProgress) + Send + Sync>;

/// Pending transfer of one package's missing files
///
/// Implementations must invoke the progress callback sequentially, never
/// concurrently with itself, and must keep `current_count`/`current_bytes`
/// non-decreasing for the lifetime of the operation.
#[async_trait]
pub trait DownloaderOperation: Send {
    /// Package this downloader belongs to
    fn package_name(&self) -> &str;

    /// Number of files still to fetch
    fn total_download_count(&self) -> u64;

    /// Number of bytes still to fetch
    fn total_download_bytes(&self) -> u64;

    fn set_progress_callback(&mut self, callback: ProgressCallback);

    fn set_error_callback(&mut self, callback: ErrorCallback);

    /// Begin the transfer. Calling it twice has no further effect.
    fn start(&mut self);

    /// Suspend until the transfer is terminal and return the final status
    async fn wait(&mut self) -> OperationStatus;

    /// Current status without waiting
    fn status(&self) -> OperationStatus;
}

/// Caller-supplied callbacks for a combined download
#[derive(Clone, Default)]
pub struct DownloadCallbacks {
    pub on_progress: Option<SpeedProgressCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl DownloadCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive aggregated progress with speed
    #[must_use]
    pub fn on_progress(
        mut self,
        callback: impl Fn(&SpeedProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Receive per-asset failures
    #[must_use]
    pub fn on_error(
        mut self,
        callback: impl Fn(&DownloadFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for DownloadCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadCallbacks")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
