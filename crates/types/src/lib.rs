#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the apx asset patcher
//!
//! This crate provides the value types shared by the orchestrator, the
//! package managers that feed it and the front-ends that render its progress.

pub mod download;
pub mod package;

// Re-export commonly used types
pub use download::{DownloadFailure, DownloadInfo, FileProgress, OperationStatus, SpeedProgress};
pub use package::{AssetInfo, DownloadLimits, DownloadSelector, PackageHandle, ResolvedLimits};
