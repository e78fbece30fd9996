//! Sequential composition of downloaders into one session

use crate::downloader::{DownloadCallbacks, DownloaderOperation, ErrorCallback};
use crate::session::SessionState;
use apx_events::{
    AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext, SpeedConfig, SpeedSampler,
};
use apx_errors::DownloadError;
use apx_types::{DownloadFailure, DownloadInfo, FileProgress};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sum the totals of every present downloader without starting any
#[must_use]
pub fn combined_info(downloaders: &[Option<Box<dyn DownloaderOperation>>]) -> DownloadInfo {
    downloaders
        .iter()
        .flatten()
        .fold(DownloadInfo::default(), |mut info, downloader| {
            info.accumulate(
                downloader.total_download_count(),
                downloader.total_download_bytes(),
            );
            info
        })
}

/// Run `downloaders` one after another and stop at the first failure
///
/// Returns `true` when every present downloader succeeded, or immediately
/// when there is nothing to fetch. `None` entries are skipped.
pub async fn begin_combined_download(
    downloaders: Vec<Option<Box<dyn DownloaderOperation>>>,
    callbacks: DownloadCallbacks,
) -> bool {
    CombinedDownload::new(downloaders).run(callbacks).await
}

/// One combined download with its speed settings and optional event feed
pub struct CombinedDownload {
    downloaders: Vec<Option<Box<dyn DownloaderOperation>>>,
    info: DownloadInfo,
    speed: SpeedConfig,
    tx: Option<EventSender>,
}

impl EventEmitter for CombinedDownload {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl CombinedDownload {
    /// Freeze the session totals from the given downloaders
    #[must_use]
    pub fn new(downloaders: Vec<Option<Box<dyn DownloaderOperation>>>) -> Self {
        let info = combined_info(&downloaders);
        Self {
            downloaders,
            info,
            speed: SpeedConfig::default(),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_speed_config(mut self, speed: SpeedConfig) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: Option<EventSender>) -> Self {
        self.tx = tx;
        self
    }

    /// Totals frozen at construction
    #[must_use]
    pub fn info(&self) -> DownloadInfo {
        self.info
    }

    /// Drive the session to completion
    pub async fn run(mut self, callbacks: DownloadCallbacks) -> bool {
        let session_id = Uuid::new_v4().to_string();
        let info = self.info;

        if info.is_empty() {
            debug!(session = %session_id, "nothing to fetch");
            self.emit(AppEvent::Download(DownloadEvent::NothingToFetch {
                session_id,
            }));
            return true;
        }

        let present = self.downloaders.iter().flatten().count();
        info!(
            session = %session_id,
            packages = present,
            files = info.total_count,
            bytes = info.total_bytes,
            "combined download started"
        );
        self.emit(AppEvent::Download(DownloadEvent::SessionStarted {
            session_id: session_id.clone(),
            packages: present,
            total_count: info.total_count,
            total_bytes: info.total_bytes,
        }));

        let started = Instant::now();
        let session = Arc::new(Mutex::new(SessionState::new(
            info,
            SpeedSampler::new(self.speed.clone()),
        )));

        let downloaders = std::mem::take(&mut self.downloaders);
        let mut success = true;

        for (index, entry) in downloaders.into_iter().enumerate() {
            let Some(mut downloader) = entry else {
                continue;
            };
            let package = downloader.package_name().to_string();

            lock(&session).subscribe();
            downloader.set_progress_callback(self.progress_forwarder(
                &session,
                &session_id,
                callbacks.on_progress.clone(),
            ));
            if let Some(on_error) = self.error_forwarder(callbacks.on_error.clone()) {
                downloader.set_error_callback(on_error);
            }

            debug!(session = %session_id, package = %package, index, "starting downloader");
            self.emit(AppEvent::Download(DownloadEvent::PackageStarted {
                session_id: session_id.clone(),
                package: package.clone(),
                index,
                total_count: downloader.total_download_count(),
                total_bytes: downloader.total_download_bytes(),
            }));

            downloader.start();
            let status = downloader.wait().await;

            if status.is_succeeded() {
                self.emit(AppEvent::Download(DownloadEvent::PackageCompleted {
                    session_id: session_id.clone(),
                    package,
                    index,
                }));
            } else {
                warn!(
                    session = %session_id,
                    package = %package,
                    index,
                    %status,
                    "downloader did not succeed, stopping"
                );
                self.emit(AppEvent::Download(DownloadEvent::PackageFailed {
                    session_id: session_id.clone(),
                    package,
                    index,
                    status,
                }));
                success = false;
                break;
            }
        }

        let (current_count, current_bytes) = lock(&session).current();
        let duration = started.elapsed();
        info!(
            session = %session_id,
            success,
            files = current_count,
            bytes = current_bytes,
            elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "combined download finished"
        );
        self.emit(AppEvent::Download(DownloadEvent::SessionCompleted {
            session_id,
            success,
            current_count,
            current_bytes,
            duration,
        }));

        success
    }

    fn progress_forwarder(
        &self,
        session: &Arc<Mutex<SessionState>>,
        session_id: &str,
        on_progress: Option<crate::SpeedProgressCallback>,
    ) -> crate::ProgressCallback {
        let session = Arc::clone(session);
        let session_id = session_id.to_string();
        let tx = self.tx.clone();

        Arc::new(move |progress: FileProgress| {
            let update = lock(&session).observe(progress);
            tx.emit_progress(session_id.clone(), update);
            if let Some(callback) = &on_progress {
                callback(&update);
            }
        })
    }

    /// Pass failures through to the caller, reporting them as events too
    fn error_forwarder(&self, on_error: Option<ErrorCallback>) -> Option<ErrorCallback> {
        let tx = self.tx.clone();
        if tx.is_none() {
            return on_error;
        }

        Some(Arc::new(move |failure: &DownloadFailure| {
            let context = FailureContext::from_error(&DownloadError::AssetFailed {
                package: failure.package.clone(),
                asset: failure.asset.clone(),
                message: failure.message.clone(),
            });
            tx.emit(AppEvent::Download(DownloadEvent::AssetFailed {
                package: failure.package.clone(),
                asset: failure.asset.clone(),
                failure: context,
            }));
            if let Some(callback) = &on_error {
                callback(failure);
            }
        }))
    }
}

fn lock(session: &Mutex<SessionState>) -> std::sync::MutexGuard<'_, SessionState> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
