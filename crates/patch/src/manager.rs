//! Package manager contract: handles, downloaders and local package state

use crate::control::PatchControl;
use crate::downloader::DownloaderOperation;
use apx_errors::Error;
use apx_types::{DownloadSelector, PackageHandle, ResolvedLimits};
use async_trait::async_trait;

/// Source of package handles and their downloaders
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Resolve a package by name
    fn package(&self, name: &str) -> Option<PackageHandle>;

    /// Every package this manager knows, in declaration order
    fn packages(&self) -> Vec<PackageHandle>;

    /// Build a downloader covering the selected assets that are not yet local
    ///
    /// Returns `None` when the package cannot be resolved.
    async fn downloader(
        &self,
        package: &PackageHandle,
        selector: &DownloadSelector,
        limits: ResolvedLimits,
        control: &PatchControl,
    ) -> Option<Box<dyn DownloaderOperation>>;

    /// Whether any asset of the package is present locally, complete or not
    ///
    /// # Errors
    ///
    /// Returns an error if local storage cannot be inspected.
    async fn has_local_files(&self, package: &PackageHandle) -> Result<bool, Error>;

    /// Bytes currently stored locally for the package
    ///
    /// # Errors
    ///
    /// Returns an error if local storage cannot be inspected.
    async fn local_size(&self, package: &PackageHandle) -> Result<u64, Error>;

    /// Remove the package's local files and return the bytes freed
    ///
    /// # Errors
    ///
    /// Returns an error if local files cannot be removed.
    async fn clear_local(&self, package: &PackageHandle) -> Result<u64, Error>;

    /// Applied patch versions, newest first
    fn patch_versions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Version of the application the packages belong to
    fn app_version(&self) -> Option<String> {
        None
    }
}
