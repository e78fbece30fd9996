//! Integration tests for the mirror package manager

#[cfg(test)]
mod tests {
    use apx_config::Config;
    use apx_hash::ContentHash;
    use apx_patch::*;
    use apx_types::{
        DownloadFailure, DownloadLimits, DownloadSelector, FileProgress, OperationStatus,
        PackageHandle, ResolvedLimits,
    };
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        mirror: std::path::PathBuf,
        sandbox: std::path::PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let mirror = root.path().join("mirror");
            let sandbox = root.path().join("sandbox");
            std::fs::create_dir_all(&mirror).unwrap();
            Self {
                _root: root,
                mirror,
                sandbox,
            }
        }

        fn put(&self, package: &str, path: &str, content: &[u8]) {
            let file = self.mirror.join(package).join(path);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, content).unwrap();
        }

        fn manager(&self, catalog: &str) -> MirrorPackageManager {
            MirrorPackageManager::new(
                Catalog::from_toml(catalog).unwrap(),
                &self.mirror,
                &self.sandbox,
            )
            .with_retry_policy(RetryPolicy::immediate())
        }
    }

    fn catalog(core_hash: Option<&ContentHash>) -> String {
        let hash_line = core_hash
            .map(|h| format!("hash = \"{}\"\n", h.to_hex()))
            .unwrap_or_default();
        format!(
            r#"
patch_version = "1.4.0-1289"
app_version = "1.4.0"

[[packages]]
name = "core"

[[packages.assets]]
path = "ui/atlas.bundle"
size = 5
tags = ["ui"]
{hash_line}
[[packages.assets]]
path = "audio/theme.bank"
size = 3
tags = ["audio"]

[[packages]]
name = "dlc"

[[packages.assets]]
path = "maps/island.pak"
size = 4
"#
        )
    }

    fn populate(fixture: &Fixture) {
        fixture.put("core", "ui/atlas.bundle", b"atlas");
        fixture.put("core", "audio/theme.bank", b"mus");
        fixture.put("dlc", "maps/island.pak", b"isle");
    }

    fn handles(names: &[&str]) -> Vec<PackageHandle> {
        names.iter().map(|n| PackageHandle::new(*n)).collect()
    }

    fn read(path: &Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_then_nothing_pending() {
        let fixture = Fixture::new();
        populate(&fixture);
        let manager = Arc::new(fixture.manager(&catalog(None)));
        let patcher = Patcher::new(Arc::clone(&manager), &Config::default());
        let packages = handles(&["core", "dlc"]);

        let info = patcher
            .combined_download_info(&packages, &DownloadSelector::All)
            .await;
        assert_eq!((info.total_count, info.total_bytes), (3, 12));

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let callbacks =
            DownloadCallbacks::new().on_progress(move |p| sink.lock().unwrap().push(*p));

        let ok = patcher
            .begin_combined_download(
                &packages,
                &DownloadSelector::All,
                DownloadLimits::new(2, 0),
                callbacks,
            )
            .await;
        assert!(ok);

        let last = *updates.lock().unwrap().last().unwrap();
        assert_eq!((last.current_count, last.current_bytes), (3, 12));
        assert_eq!(
            read(&fixture.sandbox.join("core/ui/atlas.bundle")),
            b"atlas".to_vec()
        );
        assert!(!fixture.sandbox.join("core/ui/atlas.bundle.part").exists());

        let again = patcher
            .combined_download_info(&packages, &DownloadSelector::All)
            .await;
        assert!(again.is_empty());
        assert!(manager.has_local_files(&packages[0]).await.unwrap());
        assert_eq!(manager.local_size(&packages[0]).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_selectors_narrow_pending_set() {
        let fixture = Fixture::new();
        populate(&fixture);
        let manager = fixture.manager(&catalog(None));
        let core = PackageHandle::new("core");
        let control = PatchControl::new();

        let by_tag = manager
            .downloader(
                &core,
                &DownloadSelector::tags(["audio"]),
                ResolvedLimits::default(),
                &control,
            )
            .await
            .unwrap();
        assert_eq!(by_tag.total_download_count(), 1);
        assert_eq!(by_tag.total_download_bytes(), 3);

        let infos = manager.asset_infos_by_names(&core, &["atlas.bundle".to_string()]);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].path, "ui/atlas.bundle");
        assert_eq!(
            manager.asset_infos_by_tags(&core, &["ui".to_string()]),
            infos
        );

        assert!(manager
            .downloader(
                &PackageHandle::new("unknown"),
                &DownloadSelector::All,
                ResolvedLimits::default(),
                &control,
            )
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_source_fails_once_and_keeps_progress() {
        let fixture = Fixture::new();
        fixture.put("core", "ui/atlas.bundle", b"atlas");
        fixture.put("core", "audio/theme.bank", b"mus");
        let manager = Arc::new(fixture.manager(&catalog(None)));
        let patcher = Patcher::new(manager, &Config::default());

        let failures: Arc<Mutex<Vec<DownloadFailure>>> = Arc::default();
        let sink = Arc::clone(&failures);
        let callbacks =
            DownloadCallbacks::new().on_error(move |f| sink.lock().unwrap().push(f.clone()));

        let ok = patcher
            .begin_combined_download(
                &handles(&["core", "dlc"]),
                &DownloadSelector::All,
                DownloadLimits::new(1, 2),
                callbacks,
            )
            .await;
        assert!(!ok);

        let failures = failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].package, "dlc");
        assert_eq!(failures[0].asset, "maps/island.pak");
        assert!(fixture.sandbox.join("core/audio/theme.bank").exists());
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_rejected() {
        let fixture = Fixture::new();
        populate(&fixture);
        let wrong = ContentHash::from_hex(&"00".repeat(32)).unwrap();
        let manager = fixture.manager(&catalog(Some(&wrong)));
        let control = PatchControl::new();

        let mut downloader = manager
            .downloader(
                &PackageHandle::new("core"),
                &DownloadSelector::tags(["ui"]),
                ResolvedLimits::default(),
                &control,
            )
            .await
            .unwrap();
        downloader.start();
        assert_eq!(downloader.wait().await, OperationStatus::Failed);
        assert!(!fixture.sandbox.join("core/ui/atlas.bundle").exists());
        assert!(!fixture.sandbox.join("core/ui/atlas.bundle.part").exists());
    }

    #[tokio::test]
    async fn test_cancel_stops_run_and_next_fetch_resumes() {
        let fixture = Fixture::new();
        populate(&fixture);
        let manager = Arc::new(fixture.manager(&catalog(None)));
        let patcher = Patcher::new(Arc::clone(&manager), &Config::default());
        let packages = handles(&["core"]);

        let errors = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&errors);
        let control = patcher.control().clone();
        let callbacks = DownloadCallbacks::new()
            .on_progress(move |_| control.cancel())
            .on_error(move |_| *sink.lock().unwrap() += 1);

        let ok = patcher
            .begin_combined_download(
                &packages,
                &DownloadSelector::All,
                DownloadLimits::new(1, 0),
                callbacks,
            )
            .await;
        assert!(!ok);
        assert_eq!(*errors.lock().unwrap(), 1);
        assert!(patcher.control().is_cancelled());
        assert_eq!(
            patcher
                .combined_download_info(&packages, &DownloadSelector::All)
                .await
                .total_count,
            1
        );

        let ok = patcher
            .begin_combined_download(
                &packages,
                &DownloadSelector::All,
                DownloadLimits::new(1, 0),
                DownloadCallbacks::default(),
            )
            .await;
        assert!(ok);
        assert!(!patcher.control().is_cancelled());
        assert_eq!(manager.local_size(&packages[0]).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_partial_package_counts_as_local() {
        let fixture = Fixture::new();
        populate(&fixture);
        let manager = Arc::new(fixture.manager(&catalog(None)));
        let patcher = Patcher::new(Arc::clone(&manager), &Config::default());
        let core = handles(&["core"]);

        assert!(!manager.has_local_files(&core[0]).await.unwrap());

        assert!(
            patcher
                .begin_combined_download(
                    &core,
                    &DownloadSelector::tags(["audio"]),
                    DownloadLimits::default(),
                    DownloadCallbacks::default(),
                )
                .await
        );

        assert!(manager.has_local_files(&core[0]).await.unwrap());
        assert_eq!(manager.local_size(&core[0]).await.unwrap(), 3);
        let pending = patcher
            .combined_download_info(&core, &DownloadSelector::All)
            .await;
        assert_eq!((pending.total_count, pending.total_bytes), (1, 5));
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_within_retries() {
        let fixture = Fixture::new();
        // Short copy until the mirror catches up
        fixture.put("core", "ui/atlas.bundle", b"atl");
        let manager = fixture
            .manager(&catalog(None))
            .with_retry_policy(RetryPolicy {
                initial_delay: Duration::from_millis(400),
                max_delay: Duration::from_millis(400),
                backoff_multiplier: 1.0,
                jitter_factor: 0.0,
            });
        let control = PatchControl::new();

        let mut downloader = manager
            .downloader(
                &PackageHandle::new("core"),
                &DownloadSelector::tags(["ui"]),
                ResolvedLimits {
                    max_concurrency: 1,
                    failed_retry_count: 2,
                },
                &control,
            )
            .await
            .unwrap();
        let errors = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&errors);
        downloader.set_error_callback(Arc::new(move |_: &DownloadFailure| {
            *sink.lock().unwrap() += 1;
        }));

        let started = Instant::now();
        downloader.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fixture.put("core", "ui/atlas.bundle", b"atlas");

        assert_eq!(downloader.wait().await, OperationStatus::Succeeded);
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(*errors.lock().unwrap(), 0);
        assert_eq!(
            read(&fixture.sandbox.join("core/ui/atlas.bundle")),
            b"atlas".to_vec()
        );
    }

    #[tokio::test]
    async fn test_persistent_failure_gives_up_after_retries() {
        let fixture = Fixture::new();
        fixture.put("core", "ui/atlas.bundle", b"atl");
        let manager = Arc::new(fixture.manager(&catalog(None)));
        let patcher = Patcher::new(manager, &Config::default());

        let failures: Arc<Mutex<Vec<DownloadFailure>>> = Arc::default();
        let sink = Arc::clone(&failures);
        let callbacks =
            DownloadCallbacks::new().on_error(move |f| sink.lock().unwrap().push(f.clone()));

        let ok = patcher
            .begin_combined_download(
                &handles(&["core"]),
                &DownloadSelector::tags(["ui"]),
                DownloadLimits::new(1, 2),
                callbacks,
            )
            .await;
        assert!(!ok);

        let failures = failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].asset, "ui/atlas.bundle");
        assert!(failures[0].message.contains("retries exhausted"));
        assert!(failures[0].message.contains("after 3 attempts"));
        assert!(!fixture.sandbox.join("core/ui/atlas.bundle").exists());
        assert!(!fixture.sandbox.join("core/ui/atlas.bundle.part").exists());
    }

    #[tokio::test]
    async fn test_pause_holds_running_downloader_until_resume() {
        let fixture = Fixture::new();
        populate(&fixture);
        let manager = fixture.manager(&catalog(None));
        let control = PatchControl::new();
        control.pause();

        let mut downloader = manager
            .downloader(
                &PackageHandle::new("core"),
                &DownloadSelector::All,
                ResolvedLimits::default(),
                &control,
            )
            .await
            .unwrap();
        let updates = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&updates);
        downloader.set_progress_callback(Arc::new(move |_: FileProgress| {
            *sink.lock().unwrap() += 1;
        }));

        downloader.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(downloader.status(), OperationStatus::Processing);
        assert_eq!(*updates.lock().unwrap(), 0);
        assert!(!fixture.sandbox.join("core/ui/atlas.bundle").exists());

        control.resume();
        assert_eq!(downloader.wait().await, OperationStatus::Succeeded);
        assert_eq!(*updates.lock().unwrap(), 2);
        assert!(fixture.sandbox.join("core/audio/theme.bank").exists());
    }

    #[tokio::test]
    async fn test_repair_refetches_everything() {
        let fixture = Fixture::new();
        populate(&fixture);
        let manager = Arc::new(fixture.manager(&catalog(None)));
        let patcher = Patcher::new(Arc::clone(&manager), &Config::default());
        let packages = handles(&["dlc"]);

        assert!(
            patcher
                .begin_combined_download(
                    &packages,
                    &DownloadSelector::All,
                    DownloadLimits::default(),
                    DownloadCallbacks::default(),
                )
                .await
        );

        let target = fixture.sandbox.join("dlc/maps/island.pak");
        std::fs::write(&target, b"bad!").unwrap();
        assert!(patcher
            .combined_download_info(&packages, &DownloadSelector::All)
            .await
            .is_empty());

        let ok = patcher
            .repair(
                &packages,
                &DownloadSelector::All,
                DownloadLimits::default(),
                DownloadCallbacks::default(),
            )
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(read(&target), b"isle".to_vec());

        assert_eq!(manager.clear_local(&packages[0]).await.unwrap(), 4);
        assert!(!manager.has_local_files(&packages[0]).await.unwrap());
        assert_eq!(manager.clear_local(&packages[0]).await.unwrap(), 0);
    }

    #[test]
    fn test_catalog_versions() {
        let fixture = Fixture::new();
        let manager = Arc::new(fixture.manager(&catalog(None)));
        assert_eq!(manager.patch_versions(), vec!["1.4.0-1289".to_string()]);

        let patcher = Patcher::new(manager, &Config::default());
        assert_eq!(patcher.app_version().as_deref(), Some("1.4.0"));
        assert_eq!(
            patcher.patch_version_with(false, 6, "-").unwrap(),
            "1.4.0-1289"
        );
    }
}
