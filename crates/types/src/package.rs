//! Package-related type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a named remote content package
///
/// Handles are cheap to clone and carry no transfer state; the package
/// manager that issued the handle owns everything behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageHandle {
    name: String,
}

impl PackageHandle {
    /// Create a new package handle
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Package name as registered with the package manager
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identifies a single asset inside a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetInfo {
    pub package: String,
    pub path: String,
}

impl AssetInfo {
    pub fn new(package: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for AssetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.path)
    }
}

/// Which assets of a package a downloader should cover
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum DownloadSelector {
    /// Every asset the package lists
    #[default]
    All,
    /// Assets carrying at least one of the tags
    Tags(Vec<String>),
    /// Assets matched by path or file name
    AssetNames(Vec<String>),
    /// Exactly the listed assets
    AssetInfos(Vec<AssetInfo>),
}

impl DownloadSelector {
    /// Select assets by tag
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tags(tags.into_iter().map(Into::into).collect())
    }

    /// Select assets by name
    pub fn asset_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AssetNames(names.into_iter().map(Into::into).collect())
    }

    /// Short label for logs and events
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Tags(tags) => format!("tags[{}]", tags.join(",")),
            Self::AssetNames(names) => format!("names[{}]", names.len()),
            Self::AssetInfos(infos) => format!("assets[{}]", infos.len()),
        }
    }
}

/// Per-downloader transfer limits; `None` falls back to the manager default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLimits {
    pub max_concurrency: Option<usize>,
    pub failed_retry_count: Option<u32>,
}

impl DownloadLimits {
    #[must_use]
    pub fn new(max_concurrency: usize, failed_retry_count: u32) -> Self {
        Self {
            max_concurrency: Some(max_concurrency),
            failed_retry_count: Some(failed_retry_count),
        }
    }

    /// Fill unset limits from the given defaults
    #[must_use]
    pub fn resolve(self, defaults: ResolvedLimits) -> ResolvedLimits {
        ResolvedLimits {
            max_concurrency: self
                .max_concurrency
                .unwrap_or(defaults.max_concurrency)
                .max(1),
            failed_retry_count: self
                .failed_retry_count
                .unwrap_or(defaults.failed_retry_count),
        }
    }
}

/// Limits with every value decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLimits {
    pub max_concurrency: usize,
    pub failed_retry_count: u32,
}

impl Default for ResolvedLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            failed_retry_count: 3,
        }
    }
}
