//! Patcher facade over a package manager

use crate::control::PatchControl;
use crate::downloader::{DownloadCallbacks, DownloaderOperation};
use crate::manager::PackageManager;
use crate::orchestrator::{combined_info, CombinedDownload};
use crate::version::encode_patch_version_seeded;
use apx_config::{Config, VersionConfig};
use apx_errors::Error;
use apx_events::{EventEmitter, EventSender, SpeedConfig};
use apx_types::{DownloadInfo, DownloadLimits, DownloadSelector, PackageHandle, ResolvedLimits};
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point for fetching packages and reading the applied patch version
pub struct Patcher<M: PackageManager> {
    manager: Arc<M>,
    defaults: ResolvedLimits,
    speed: SpeedConfig,
    version: VersionConfig,
    control: PatchControl,
    tx: Option<EventSender>,
}

impl<M: PackageManager> EventEmitter for Patcher<M> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl<M: PackageManager> Patcher<M> {
    pub fn new(manager: Arc<M>, config: &Config) -> Self {
        Self {
            manager,
            defaults: config.download.limits(),
            speed: SpeedConfig::from(&config.progress),
            version: config.version.clone(),
            control: PatchControl::new(),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    /// Handle for pausing, resuming or cancelling the active download
    ///
    /// A cancel only stops the run it lands in; the next
    /// [`Patcher::begin_combined_download`] or [`Patcher::repair`] clears it.
    /// A pause set before a run is kept.
    #[must_use]
    pub fn control(&self) -> &PatchControl {
        &self.control
    }

    /// Resolve package names, keeping unknown names as `None`
    #[must_use]
    pub fn packages(&self, names: &[&str]) -> Vec<Option<PackageHandle>> {
        names.iter().map(|name| self.manager.package(name)).collect()
    }

    /// One downloader per package, in input order
    pub async fn downloaders(
        &self,
        packages: &[PackageHandle],
        selector: &DownloadSelector,
        limits: DownloadLimits,
    ) -> Vec<Option<Box<dyn DownloaderOperation>>> {
        let limits = limits.resolve(self.defaults);
        let mut downloaders = Vec::with_capacity(packages.len());
        for package in packages {
            let downloader = self
                .manager
                .downloader(package, selector, limits, &self.control)
                .await;
            if downloader.is_none() {
                debug!(package = %package, "package manager returned no downloader");
            }
            downloaders.push(downloader);
        }
        downloaders
    }

    /// Files and bytes still missing for `packages`, without fetching anything
    pub async fn combined_download_info(
        &self,
        packages: &[PackageHandle],
        selector: &DownloadSelector,
    ) -> DownloadInfo {
        let downloaders = self
            .downloaders(packages, selector, DownloadLimits::default())
            .await;
        combined_info(&downloaders)
    }

    /// Fetch every missing asset of `packages`, one package at a time
    pub async fn begin_combined_download(
        &self,
        packages: &[PackageHandle],
        selector: &DownloadSelector,
        limits: DownloadLimits,
        callbacks: DownloadCallbacks,
    ) -> bool {
        self.clear_cancel();
        let downloaders = self.downloaders(packages, selector, limits).await;
        self.begin_download(downloaders, callbacks).await
    }

    /// Run already-built downloaders with this patcher's speed settings
    pub async fn begin_download(
        &self,
        downloaders: Vec<Option<Box<dyn DownloaderOperation>>>,
        callbacks: DownloadCallbacks,
    ) -> bool {
        self.emit_operation_started("combined download");
        let success = CombinedDownload::new(downloaders)
            .with_speed_config(self.speed.clone())
            .with_event_sender(self.tx.clone())
            .run(callbacks)
            .await;
        self.emit_operation_completed("combined download", success);
        success
    }

    /// Remove local copies of `packages`, then fetch everything again
    ///
    /// # Errors
    ///
    /// Returns an error if local files cannot be removed; download failures
    /// are reported through the returned flag and `callbacks`.
    pub async fn repair(
        &self,
        packages: &[PackageHandle],
        selector: &DownloadSelector,
        limits: DownloadLimits,
        callbacks: DownloadCallbacks,
    ) -> Result<bool, Error> {
        self.clear_cancel();
        for package in packages {
            let freed = self.manager.clear_local(package).await?;
            info!(package = %package, freed, "cleared before repair");
        }
        Ok(self
            .begin_combined_download(packages, selector, limits, callbacks)
            .await)
    }

    fn clear_cancel(&self) {
        if self.control.is_cancelled() {
            debug!("clearing cancel left by a previous run");
            self.control.reset();
        }
    }

    /// Applied patch version formatted with the configured display settings
    ///
    /// # Errors
    ///
    /// Returns an error if the configured display length is invalid.
    pub fn patch_version(&self) -> Result<String, Error> {
        self.patch_version_with(
            self.version.encode,
            self.version.length,
            &self.version.separator,
        )
    }

    /// Applied patch version; empty when the manager reports none
    ///
    /// # Errors
    ///
    /// Returns an error if `encode` is set and `length` is invalid.
    pub fn patch_version_with(
        &self,
        encode: bool,
        length: usize,
        separator: &str,
    ) -> Result<String, Error> {
        let Some(raw) = self.manager.patch_versions().into_iter().next() else {
            return Ok(String::new());
        };
        Ok(encode_patch_version_seeded(
            &raw,
            encode,
            length,
            separator,
            self.version.seed,
        )?)
    }

    #[must_use]
    pub fn app_version(&self) -> Option<String> {
        self.manager.app_version()
    }
}
