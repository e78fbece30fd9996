//! Package manager backed by a catalog and a local mirror directory
//!
//! Assets are copied from `mirror/<package>/<path>` into
//! `sandbox/<package>/<path>`. An asset counts as local when the sandbox copy
//! exists with the catalog size; everything else is pending. Failed sandbox
//! writes surface as storage errors, so a full disk is not retried.

use crate::catalog::{Catalog, CatalogPackage};
use crate::control::PatchControl;
use crate::downloader::{DownloaderOperation, ErrorCallback, ProgressCallback};
use crate::manager::PackageManager;
use crate::retry::RetryPolicy;
use apx_config::Config;
use apx_errors::{DownloadError, Error, StorageError, UserFacingError};
use apx_hash::ContentHash;
use apx_types::{
    AssetInfo, DownloadFailure, DownloadSelector, FileProgress, OperationStatus, PackageHandle,
    ResolvedLimits,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Copies catalog assets from a mirror into the local sandbox
#[derive(Debug, Clone)]
pub struct MirrorPackageManager {
    catalog: Catalog,
    mirror: PathBuf,
    sandbox: PathBuf,
    retry: RetryPolicy,
}

impl MirrorPackageManager {
    pub fn new(catalog: Catalog, mirror: impl Into<PathBuf>, sandbox: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            mirror: mirror.into(),
            sandbox: sandbox.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build from configured paths, loading the catalog
    ///
    /// # Errors
    ///
    /// Returns an error if no mirror is configured or the catalog cannot be
    /// loaded.
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let mirror = config.mirror_path()?;
        let catalog = Catalog::load(&config.catalog_path()?).await?;
        Ok(Self::new(catalog, mirror, config.sandbox_path()))
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn sandbox(&self) -> &Path {
        &self.sandbox
    }

    /// Assets of `package` carrying any of `tags`
    #[must_use]
    pub fn asset_infos_by_tags(&self, package: &PackageHandle, tags: &[String]) -> Vec<AssetInfo> {
        self.catalog
            .package(package.name())
            .map(|p| p.asset_infos(&DownloadSelector::Tags(tags.to_vec())))
            .unwrap_or_default()
    }

    /// Assets of `package` matched by path or file name
    #[must_use]
    pub fn asset_infos_by_names(
        &self,
        package: &PackageHandle,
        names: &[String],
    ) -> Vec<AssetInfo> {
        self.catalog
            .package(package.name())
            .map(|p| p.asset_infos(&DownloadSelector::AssetNames(names.to_vec())))
            .unwrap_or_default()
    }

    fn catalog_package(&self, package: &PackageHandle) -> Result<&CatalogPackage, Error> {
        self.catalog.package(package.name()).ok_or_else(|| {
            DownloadError::PackageNotFound {
                package: package.name().to_string(),
            }
            .into()
        })
    }

    async fn pending_jobs(
        &self,
        package: &CatalogPackage,
        selector: &DownloadSelector,
    ) -> Vec<CopyJob> {
        let mut jobs = Vec::new();
        for asset in package.select(selector) {
            let dest = asset.location(&self.sandbox, &package.name);
            if is_local(&dest, asset.size).await {
                continue;
            }
            jobs.push(CopyJob {
                package: package.name.clone(),
                asset: asset.path.clone(),
                source: asset.location(&self.mirror, &package.name),
                dest,
                size: asset.size,
                hash: asset.hash.clone(),
            });
        }
        jobs
    }
}

#[async_trait]
impl PackageManager for MirrorPackageManager {
    fn package(&self, name: &str) -> Option<PackageHandle> {
        self.catalog
            .package(name)
            .map(|package| PackageHandle::new(&package.name))
    }

    fn packages(&self) -> Vec<PackageHandle> {
        self.catalog
            .packages
            .iter()
            .map(|package| PackageHandle::new(&package.name))
            .collect()
    }

    async fn downloader(
        &self,
        package: &PackageHandle,
        selector: &DownloadSelector,
        limits: ResolvedLimits,
        control: &PatchControl,
    ) -> Option<Box<dyn DownloaderOperation>> {
        let catalog_package = self.catalog.package(package.name())?;
        let jobs = self.pending_jobs(catalog_package, selector).await;
        debug!(
            package = %package,
            selector = %selector.describe(),
            pending = jobs.len(),
            "built mirror downloader"
        );
        Some(Box::new(MirrorDownloader::new(
            package.name(),
            jobs,
            limits,
            self.retry.clone(),
            control.clone(),
        )))
    }

    async fn has_local_files(&self, package: &PackageHandle) -> Result<bool, Error> {
        let catalog_package = self.catalog_package(package)?;
        for asset in &catalog_package.assets {
            let path = asset.location(&self.sandbox, &catalog_package.name);
            if matches!(fs::metadata(&path).await, Ok(meta) if meta.is_file()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn local_size(&self, package: &PackageHandle) -> Result<u64, Error> {
        let catalog_package = self.catalog_package(package)?;
        let mut total = 0u64;
        for asset in &catalog_package.assets {
            let path = asset.location(&self.sandbox, &catalog_package.name);
            if let Ok(meta) = fs::metadata(&path).await {
                if meta.is_file() {
                    total = total.saturating_add(meta.len());
                }
            }
        }
        Ok(total)
    }

    async fn clear_local(&self, package: &PackageHandle) -> Result<u64, Error> {
        let freed = self.local_size(package).await?;
        let dir = self.sandbox.join(package.name());
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(package = %package, freed, "cleared local files");
                Ok(freed)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(sandbox_error(&e, &dir)),
        }
    }

    fn patch_versions(&self) -> Vec<String> {
        self.catalog.patch_version.iter().cloned().collect()
    }

    fn app_version(&self) -> Option<String> {
        self.catalog.app_version.clone()
    }
}

async fn is_local(path: &Path, size: u64) -> bool {
    matches!(fs::metadata(path).await, Ok(meta) if meta.is_file() && meta.len() == size)
}

fn sandbox_error(err: &std::io::Error, path: &Path) -> Error {
    StorageError::from_io_with_path(err, path).into()
}

/// One pending asset copy
#[derive(Debug, Clone)]
struct CopyJob {
    package: String,
    asset: String,
    source: PathBuf,
    dest: PathBuf,
    size: u64,
    hash: Option<ContentHash>,
}

impl CopyJob {
    fn part_path(&self) -> PathBuf {
        let name = self
            .dest
            .file_name()
            .map_or_else(|| "asset".into(), |n| n.to_string_lossy().into_owned());
        self.dest.with_file_name(format!("{name}.part"))
    }

    async fn copy_once(&self) -> Result<u64, Error> {
        let source = match fs::File::open(&self.source).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DownloadError::SourceMissing {
                    package: self.package.clone(),
                    asset: self.asset.clone(),
                }
                .into());
            }
            Err(e) => return Err(Error::io_with_path(&e, &self.source)),
        };

        if let Some(parent) = self.dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| sandbox_error(&e, parent))?;
        }

        let part = self.part_path();
        let result = self.write_part(source, &part).await;
        if result.is_err() {
            let _ = fs::remove_file(&part).await;
        }
        let bytes = result?;

        fs::rename(&part, &self.dest)
            .await
            .map_err(|e| sandbox_error(&e, &self.dest))?;
        Ok(bytes)
    }

    async fn write_part(&self, source: fs::File, part: &Path) -> Result<u64, Error> {
        let writer = fs::File::create(part)
            .await
            .map_err(|e| sandbox_error(&e, part))?;
        let (hash, bytes) = ContentHash::hash_and_copy(source, writer).await?;

        if bytes != self.size {
            return Err(DownloadError::SizeMismatch {
                asset: self.asset.clone(),
                expected: self.size,
                actual: bytes,
            }
            .into());
        }
        if let Some(expected) = &self.hash {
            if &hash != expected {
                return Err(DownloadError::ChecksumMismatch {
                    asset: self.asset.clone(),
                    expected: expected.to_hex(),
                    actual: hash.to_hex(),
                }
                .into());
            }
        }
        Ok(bytes)
    }
}

/// Shared settings of one running transfer
struct Transfer {
    package: String,
    total_count: u64,
    total_bytes: u64,
    limits: ResolvedLimits,
    retry: RetryPolicy,
    control: PatchControl,
    on_progress: Option<ProgressCallback>,
    on_error: Option<ErrorCallback>,
}

impl Transfer {
    fn report_failure(&self, failure: &DownloadFailure) {
        warn!(package = %failure.package, asset = %failure.asset, "{}", failure.message);
        if let Some(callback) = &self.on_error {
            callback(failure);
        }
    }

    fn report_progress(&self, current_count: u64, current_bytes: u64) {
        if let Some(callback) = &self.on_progress {
            callback(FileProgress {
                total_count: self.total_count,
                current_count,
                total_bytes: self.total_bytes,
                current_bytes,
            });
        }
    }

    async fn copy_with_retry(&self, job: CopyJob) -> Result<u64, DownloadFailure> {
        let mut attempt = 0u32;
        loop {
            if let Err(e) = self.control.wait_runnable().await {
                return Err(self.failure(&job, &e));
            }

            match job.copy_once().await {
                Ok(bytes) => {
                    debug!(package = %job.package, asset = %job.asset, bytes, "asset copied");
                    return Ok(bytes);
                }
                Err(e) if e.is_retryable() && attempt < self.limits.failed_retry_count => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        asset = %job.asset,
                        attempt,
                        max = self.limits.failed_retry_count,
                        "copy failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if attempt > 0 => {
                    let exhausted = Error::from(DownloadError::RetriesExhausted {
                        asset: job.asset.clone(),
                        attempts: attempt + 1,
                        message: e.user_message().into_owned(),
                    });
                    return Err(self.failure(&job, &exhausted));
                }
                Err(e) => return Err(self.failure(&job, &e)),
            }
        }
    }

    fn failure(&self, job: &CopyJob, error: &Error) -> DownloadFailure {
        DownloadFailure::new(&self.package, &job.asset, error.user_message())
    }

    async fn run(self, jobs: Vec<CopyJob>) -> OperationStatus {
        let mut current_count = 0u64;
        let mut current_bytes = 0u64;

        let mut copies = stream::iter(jobs)
            .map(|job| {
                let size = job.size;
                let copy = self.copy_with_retry(job);
                async move { copy.await.map(|_| size) }
            })
            .buffer_unordered(self.limits.max_concurrency.max(1));

        loop {
            tokio::select! {
                biased;
                () = self.control.cancelled() => {
                    let failure = DownloadFailure::new(
                        &self.package,
                        "",
                        DownloadError::Cancelled.user_message(),
                    );
                    self.report_failure(&failure);
                    return OperationStatus::Failed;
                }
                next = copies.next() => match next {
                    None => return OperationStatus::Succeeded,
                    Some(Ok(size)) => {
                        current_count += 1;
                        current_bytes = current_bytes.saturating_add(size);
                        self.report_progress(current_count, current_bytes);
                    }
                    Some(Err(failure)) => {
                        self.report_failure(&failure);
                        return OperationStatus::Failed;
                    }
                }
            }
        }
    }
}

/// Downloader for the pending assets of one mirrored package
pub struct MirrorDownloader {
    package: String,
    jobs: Vec<CopyJob>,
    total_count: u64,
    total_bytes: u64,
    limits: ResolvedLimits,
    retry: RetryPolicy,
    control: PatchControl,
    on_progress: Option<ProgressCallback>,
    on_error: Option<ErrorCallback>,
    status: OperationStatus,
    task: Option<JoinHandle<OperationStatus>>,
}

impl MirrorDownloader {
    fn new(
        package: &str,
        jobs: Vec<CopyJob>,
        limits: ResolvedLimits,
        retry: RetryPolicy,
        control: PatchControl,
    ) -> Self {
        let total_count = jobs.len() as u64;
        let total_bytes = jobs
            .iter()
            .fold(0u64, |sum, job| sum.saturating_add(job.size));
        Self {
            package: package.to_string(),
            jobs,
            total_count,
            total_bytes,
            limits,
            retry,
            control,
            on_progress: None,
            on_error: None,
            status: OperationStatus::None,
            task: None,
        }
    }

    /// Relative paths of the assets this downloader will fetch
    #[must_use]
    pub fn pending_assets(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.asset.as_str()).collect()
    }

    fn abort_with(&mut self, message: String) {
        let failure = DownloadFailure::new(
            &self.package,
            "",
            DownloadError::WorkerAborted { message }.user_message(),
        );
        warn!(package = %self.package, "{}", failure.message);
        if let Some(callback) = &self.on_error {
            callback(&failure);
        }
        self.status = OperationStatus::Failed;
    }
}

#[async_trait]
impl DownloaderOperation for MirrorDownloader {
    fn package_name(&self) -> &str {
        &self.package
    }

    fn total_download_count(&self) -> u64 {
        self.total_count
    }

    fn total_download_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.on_progress = Some(callback);
    }

    fn set_error_callback(&mut self, callback: ErrorCallback) {
        self.on_error = Some(callback);
    }

    fn start(&mut self) {
        if self.status != OperationStatus::None {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.abort_with(e.to_string());
                return;
            }
        };

        let transfer = Transfer {
            package: self.package.clone(),
            total_count: self.total_count,
            total_bytes: self.total_bytes,
            limits: self.limits,
            retry: self.retry.clone(),
            control: self.control.clone(),
            on_progress: self.on_progress.clone(),
            on_error: self.on_error.clone(),
        };
        let jobs = std::mem::take(&mut self.jobs);

        self.status = OperationStatus::Processing;
        self.task = Some(runtime.spawn(transfer.run(jobs)));
    }

    async fn wait(&mut self) -> OperationStatus {
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(status) => self.status = status,
                Err(e) => self.abort_with(e.to_string()),
            }
        }
        self.status
    }

    fn status(&self) -> OperationStatus {
        self.status
    }
}
