//! TOML catalog of packages and their assets
//!
//! ```toml
//! patch_version = "1.4.0-1289"
//! app_version = "1.4.0"
//!
//! [[packages]]
//! name = "core"
//!
//! [[packages.assets]]
//! path = "ui/atlas.bundle"
//! size = 1048576
//! tags = ["ui", "startup"]
//! hash = "af1349b9..."
//! ```

use apx_errors::{ConfigError, Error, StorageError};
use apx_hash::ContentHash;
use apx_types::{AssetInfo, DownloadSelector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub patch_version: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub packages: Vec<CatalogPackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPackage {
    pub name: String,
    #[serde(default)]
    pub assets: Vec<CatalogAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAsset {
    /// Relative path inside the package
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
}

impl Catalog {
    /// Parse a catalog and check every asset path
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed, a package name is not a
    /// single directory name, an asset path escapes its package directory,
    /// or a package name or asset path is declared twice.
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let catalog: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;
        Self::from_toml(&content)
    }

    #[must_use]
    pub fn package(&self, name: &str) -> Option<&CatalogPackage> {
        self.packages.iter().find(|package| package.name == name)
    }

    fn validate(&self) -> Result<(), Error> {
        let mut names = HashSet::new();
        for package in &self.packages {
            package_dir(&package.name)?;
            if !names.insert(package.name.as_str()) {
                return Err(duplicate("package", &package.name));
            }

            let mut paths = HashSet::new();
            for asset in &package.assets {
                relative_path(&asset.path)?;
                if !paths.insert(asset.path.as_str()) {
                    return Err(duplicate("asset", &format!("{}/{}", package.name, asset.path)));
                }
            }
        }
        Ok(())
    }
}

impl CatalogPackage {
    /// Assets matched by `selector`, in catalog order
    #[must_use]
    pub fn select(&self, selector: &DownloadSelector) -> Vec<&CatalogAsset> {
        self.assets
            .iter()
            .filter(|asset| match selector {
                DownloadSelector::All => true,
                DownloadSelector::Tags(tags) => asset.has_any_tag(tags),
                DownloadSelector::AssetNames(names) => {
                    names.iter().any(|name| asset.matches_name(name))
                }
                DownloadSelector::AssetInfos(infos) => infos
                    .iter()
                    .any(|info| info.package == self.name && info.path == asset.path),
            })
            .collect()
    }

    #[must_use]
    pub fn asset_infos(&self, selector: &DownloadSelector) -> Vec<AssetInfo> {
        self.select(selector)
            .into_iter()
            .map(|asset| AssetInfo::new(&self.name, &asset.path))
            .collect()
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.assets
            .iter()
            .fold(0u64, |sum, asset| sum.saturating_add(asset.size))
    }
}

impl CatalogAsset {
    /// Final path component
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Matches by full relative path or by file name
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.path == name || self.file_name() == name
    }

    #[must_use]
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }

    /// Location of this asset under `root/package`
    #[must_use]
    pub fn location(&self, root: &Path, package: &str) -> PathBuf {
        root.join(package).join(&self.path)
    }
}

/// A package name must be exactly one plain directory name
fn package_dir(name: &str) -> Result<(), Error> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid_path(name)),
    }
}

/// An asset path is one or more plain names below its package directory
fn relative_path(path: &str) -> Result<(), Error> {
    let mut components = Path::new(path).components().peekable();
    if components.peek().is_none() || !components.all(|c| matches!(c, Component::Normal(_))) {
        return Err(invalid_path(path));
    }
    Ok(())
}

fn invalid_path(path: &str) -> Error {
    StorageError::InvalidPath {
        path: path.to_string(),
    }
    .into()
}

fn duplicate(kind: &str, name: &str) -> Error {
    ConfigError::Invalid {
        message: format!("{kind} `{name}` is declared more than once in the catalog"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
patch_version = "1.4.0-1289"

[[packages]]
name = "core"

[[packages.assets]]
path = "ui/atlas.bundle"
size = 10
tags = ["ui"]

[[packages.assets]]
path = "audio/theme.bank"
size = 20
tags = ["audio", "startup"]
"#;

    #[test]
    fn selects_by_tag_and_name() {
        let catalog = Catalog::from_toml(CATALOG).unwrap();
        let core = catalog.package("core").unwrap();

        assert_eq!(core.select(&DownloadSelector::All).len(), 2);
        assert_eq!(core.select(&DownloadSelector::tags(["startup"]))[0].path, "audio/theme.bank");
        assert_eq!(core.select(&DownloadSelector::asset_names(["atlas.bundle"])).len(), 1);
        assert_eq!(core.select(&DownloadSelector::asset_names(["ui/atlas.bundle"])).len(), 1);
        assert!(core.select(&DownloadSelector::tags(["video"])).is_empty());
        assert_eq!(core.total_bytes(), 30);
    }

    #[test]
    fn selects_by_asset_info_within_package() {
        let catalog = Catalog::from_toml(CATALOG).unwrap();
        let core = catalog.package("core").unwrap();
        let selector = DownloadSelector::AssetInfos(vec![
            AssetInfo::new("core", "ui/atlas.bundle"),
            AssetInfo::new("other", "audio/theme.bank"),
        ]);
        let selected = core.select(&selector);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].path, "ui/atlas.bundle");
    }

    #[test]
    fn rejects_escaping_paths() {
        let bad = r#"
[[packages]]
name = "core"

[[packages.assets]]
path = "../outside"
size = 1
"#;
        assert!(Catalog::from_toml(bad).is_err());
    }

    fn single_package(name: &str, path: &str) -> String {
        format!(
            "[[packages]]\nname = {name:?}\n\n[[packages.assets]]\npath = {path:?}\nsize = 1\n"
        )
    }

    #[test]
    fn package_name_must_be_one_directory() {
        for name in [".", "..", "", "a/b", "/abs", "./core"] {
            let result = Catalog::from_toml(&single_package(name, "file.bin"));
            assert!(
                matches!(result, Err(Error::Storage(StorageError::InvalidPath { .. }))),
                "accepted package name {name:?}"
            );
        }
        assert!(Catalog::from_toml(&single_package("core", "file.bin")).is_ok());
    }

    #[test]
    fn asset_path_needs_a_plain_name() {
        for path in [".", "./", "", "ui/../..", "/etc/passwd", "./ui/atlas.bundle"] {
            assert!(
                Catalog::from_toml(&single_package("core", path)).is_err(),
                "accepted asset path {path:?}"
            );
        }
        assert!(Catalog::from_toml(&single_package("core", "ui/atlas.bundle")).is_ok());
    }

    #[test]
    fn rejects_duplicate_packages_and_assets() {
        let twice = format!(
            "{}\n{}",
            single_package("core", "a.bin"),
            single_package("core", "b.bin")
        );
        assert!(matches!(
            Catalog::from_toml(&twice),
            Err(Error::Config(ConfigError::Invalid { .. }))
        ));

        let same_asset = r#"
[[packages]]
name = "core"

[[packages.assets]]
path = "a.bin"
size = 1

[[packages.assets]]
path = "a.bin"
size = 2
"#;
        assert!(matches!(
            Catalog::from_toml(same_asset),
            Err(Error::Config(ConfigError::Invalid { .. }))
        ));
    }
}
