//! Integration tests for config

#[cfg(test)]
mod tests {
    use apx_config::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[download]
max_concurrency = 8
failed_retry_count = 1

[progress]
speed_window = 5

[version]
length = 8
separator = "_"

[paths]
mirror = "/srv/mirror"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.download.max_concurrency, 8);
        assert_eq!(config.download.failed_retry_count, 1);
        assert_eq!(config.progress.speed_window, 5);
        assert!((config.progress.ema_alpha - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.version.length, 8);
        assert_eq!(config.version.separator, "_");
        assert_eq!(config.version.seed, 32);
        assert!(config.version.encode);
        assert_eq!(
            config.catalog_path().unwrap(),
            PathBuf::from("/srv/mirror/catalog.toml")
        );
    }

    #[tokio::test]
    async fn test_invalid_file_values_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[progress]\nema_alpha = 4.0").unwrap();

        let result = Config::load_from_file(temp_file.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/apx.toml")).await;
        assert!(matches!(
            result,
            Err(apx_errors::Error::Config(apx_errors::ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let limits = config.download.limits();
        assert_eq!(limits.max_concurrency, 4);
        assert_eq!(limits.failed_retry_count, 3);
        assert!(config.mirror_path().is_err());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("APX_MAX_CONCURRENCY", "16");
        std::env::set_var("APX_RETRY_COUNT", "0");
        std::env::set_var("APX_SANDBOX", "/tmp/apx-sandbox");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.download.max_concurrency, 16);
        assert_eq!(config.download.failed_retry_count, 0);
        assert_eq!(config.sandbox_path(), PathBuf::from("/tmp/apx-sandbox"));

        // Clean up
        std::env::remove_var("APX_MAX_CONCURRENCY");
        std::env::remove_var("APX_RETRY_COUNT");
        std::env::remove_var("APX_SANDBOX");
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("APX_MAX_CONCURRENCY", "many");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        // Clean up
        std::env::remove_var("APX_MAX_CONCURRENCY");
    }
}
