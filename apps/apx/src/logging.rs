//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so
//! the JSON log file carries the same information the terminal shows.

use apx_events::{AppEvent, DownloadEvent, EventMessage, GeneralEvent, ProgressEvent};
use tracing::{debug, error, info, warn};

/// Log an event at its own level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;

    match event {
        AppEvent::Download(download_event) => match download_event {
            DownloadEvent::SessionStarted {
                session_id,
                packages,
                total_count,
                total_bytes,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    session = %session_id,
                    packages,
                    total_count,
                    total_bytes,
                    "Combined download started"
                );
            }
            DownloadEvent::NothingToFetch { session_id } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    session = %session_id,
                    "Nothing to fetch"
                );
            }
            DownloadEvent::PackageStarted {
                session_id,
                package,
                index,
                total_count,
                total_bytes,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    session = %session_id,
                    package = %package,
                    index,
                    total_count,
                    total_bytes,
                    "Package download started"
                );
            }
            DownloadEvent::PackageCompleted {
                session_id,
                package,
                index,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    session = %session_id,
                    package = %package,
                    index,
                    "Package download completed"
                );
            }
            DownloadEvent::PackageFailed {
                session_id,
                package,
                index,
                status,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    session = %session_id,
                    package = %package,
                    index,
                    status = %status,
                    "Package download failed"
                );
            }
            DownloadEvent::AssetFailed {
                package,
                asset,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    package = %package,
                    asset = %asset,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Asset download failed"
                );
            }
            DownloadEvent::SessionCompleted {
                session_id,
                success,
                current_count,
                current_bytes,
                duration,
            } => {
                let elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                if *success {
                    info!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        session = %session_id,
                        current_count,
                        current_bytes,
                        elapsed_ms,
                        "Combined download completed"
                    );
                } else {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        session = %session_id,
                        current_count,
                        current_bytes,
                        elapsed_ms,
                        "Combined download stopped"
                    );
                }
            }
        },

        AppEvent::Progress(ProgressEvent::Updated {
            session_id,
            progress,
        }) => {
            debug!(
                source = meta.source.as_str(),
                session = %session_id,
                current_count = progress.current_count,
                total_count = progress.total_count,
                current_bytes = progress.current_bytes,
                total_bytes = progress.total_bytes,
                bytes_per_second = progress.bytes_per_second,
                "Progress"
            );
        }

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(source = meta.source.as_str(), context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(source = meta.source.as_str(), details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(source = meta.source.as_str(), context = ?context, "{message}");
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(source = meta.source.as_str(), operation = %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                info!(
                    source = meta.source.as_str(),
                    operation = %operation,
                    success,
                    "Operation completed"
                );
            }
            GeneralEvent::OperationFailed { operation, error } => {
                error!(
                    source = meta.source.as_str(),
                    operation = %operation,
                    error = %error,
                    "Operation failed"
                );
            }
        },
    }
}
