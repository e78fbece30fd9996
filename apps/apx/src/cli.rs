//! Command line interface definition

use apx_types::{DownloadLimits, DownloadSelector};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// apx - fetch and repair patch packages from a mirror
#[derive(Parser)]
#[command(name = "apx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch, repair and inspect patch packages from a mirror")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the apx log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory packages are copied from
    #[arg(long, global = true, value_name = "DIR")]
    pub mirror: Option<PathBuf>,

    /// Directory packages are copied into
    #[arg(long, global = true, value_name = "DIR")]
    pub sandbox: Option<PathBuf>,

    /// Catalog file (default: <mirror>/catalog.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,
}

/// Which packages and assets a command applies to
#[derive(Args, Debug, Clone)]
pub struct Selection {
    /// Package names (empty = every package in the catalog)
    pub packages: Vec<String>,

    /// Only assets carrying one of these tags
    #[arg(long, value_delimiter = ',', conflicts_with = "asset")]
    pub tag: Vec<String>,

    /// Only assets with these paths or file names
    #[arg(long, value_delimiter = ',')]
    pub asset: Vec<String>,
}

impl Selection {
    pub fn selector(&self) -> DownloadSelector {
        if !self.tag.is_empty() {
            DownloadSelector::Tags(self.tag.clone())
        } else if !self.asset.is_empty() {
            DownloadSelector::AssetNames(self.asset.clone())
        } else {
            DownloadSelector::All
        }
    }
}

/// Per-downloader transfer limits
#[derive(Args, Debug, Clone, Copy)]
pub struct LimitArgs {
    /// Files copied in parallel within one package
    #[arg(short = 'j', long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Retries for a failed file before the package fails
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

impl LimitArgs {
    pub fn limits(self) -> DownloadLimits {
        DownloadLimits {
            max_concurrency: self.max_concurrency,
            failed_retry_count: self.retries,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show how many files and bytes are still missing
    Info {
        #[command(flatten)]
        selection: Selection,
    },

    /// Download missing files, one package after another
    #[command(alias = "check")]
    Fetch {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Remove local copies and download everything again
    Repair {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Show which packages are complete locally
    #[command(alias = "st")]
    Status {
        /// Package names (empty = every package in the catalog)
        packages: Vec<String>,
    },

    /// Remove local copies of packages
    Clear {
        /// Package names (empty = every package in the catalog)
        packages: Vec<String>,
    },

    /// Show the applied patch version
    Version {
        /// Show the raw version instead of the display code
        #[arg(long)]
        raw: bool,

        /// Display code length
        #[arg(long, value_name = "N")]
        length: Option<usize>,

        /// Separator between version segments
        #[arg(long, value_name = "SEP")]
        separator: Option<String>,
    },
}
