//! Integration tests for error types

#[cfg(test)]
mod tests {
    use apx_errors::*;

    #[test]
    fn test_error_conversion() {
        let download_err = DownloadError::PackageNotFound {
            package: "dlc_music".into(),
        };
        let err: Error = download_err.into();
        assert!(matches!(err, Error::Download(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DownloadError::AssetFailed {
            package: "core".into(),
            asset: "ui/atlas.bundle".into(),
            message: "connection reset".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to download core/ui/atlas.bundle: connection reset"
        );
    }

    #[test]
    fn test_error_clone() {
        let err = StorageError::PathNotFound {
            path: "/tmp/sandbox".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
    }

    #[test]
    fn test_user_facing_codes() {
        let err: Error = DownloadError::Cancelled.into();
        assert_eq!(err.user_code(), Some("download.cancelled"));
        assert!(err.is_retryable());

        let err: Error = VersionError::InvalidLength { length: 0, max: 64 }.into();
        assert_eq!(err.user_code(), Some("version.invalid_length"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_storage_from_io_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = StorageError::from_io_with_path(&io_err, std::path::Path::new("/x/y"));
        assert!(matches!(err, StorageError::PathNotFound { ref path } if path == "/x/y"));
    }

    #[test]
    fn test_storage_full_maps_to_disk_full() {
        let io_err = std::io::Error::new(std::io::ErrorKind::StorageFull, "no space left");
        let err = StorageError::from_io_with_path(&io_err, std::path::Path::new("/sandbox/core"));
        assert!(matches!(err, StorageError::DiskFull { ref path } if path == "/sandbox/core"));
        let err: Error = err.into();
        assert!(!err.is_retryable());
    }
}
