#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Combined package downloads for apx
//!
//! Downloaders for several packages are run strictly one after another.
//! Their counters are folded into one session-wide progress feed with a
//! smoothed speed, and the first failure stops the session. The crate also
//! ships a catalog-driven mirror package manager, the pause/cancel handle
//! downloaders observe, and the patch version display helpers.

mod catalog;
mod control;
mod downloader;
mod manager;
mod mirror;
mod orchestrator;
mod patcher;
mod retry;
mod session;
mod version;

pub use catalog::{Catalog, CatalogAsset, CatalogPackage};
pub use control::{PatchControl, PatchState};
pub use downloader::{
    DownloadCallbacks, DownloaderOperation, ErrorCallback, ProgressCallback, SpeedProgressCallback,
};
pub use manager::PackageManager;
pub use mirror::{MirrorDownloader, MirrorPackageManager};
pub use orchestrator::{begin_combined_download, combined_info, CombinedDownload};
pub use patcher::Patcher;
pub use retry::RetryPolicy;
pub use version::{
    encode_patch_version, encode_patch_version_seeded, DEFAULT_ENCODE_LENGTH, DEFAULT_SEPARATOR,
    MAX_ENCODE_LENGTH,
};
