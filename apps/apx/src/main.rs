//! apx - fetch and repair patch packages from a mirror
//!
//! The CLI resolves packages against the mirror catalog and drives the
//! combined download through the patch crate, rendering its events.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::{CommandResult, OutputRenderer, PendingRow, StatusRow};
use crate::error::CliError;
use crate::events::EventHandler;
use apx_config::Config;
use apx_events::EventReceiver;
use apx_patch::{DownloadCallbacks, MirrorPackageManager, PackageManager, Patcher};
use apx_types::{DownloadSelector, PackageHandle};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info, warn};

type MirrorPatcher = Patcher<MirrorPackageManager>;

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting apx v{}", env!("CARGO_PKG_VERSION"));

    // File config (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);

    let manager = MirrorPackageManager::from_config(&config).await?;

    let (event_sender, event_receiver) = apx_events::channel();
    let patcher = Patcher::new(Arc::new(manager), &config).with_event_sender(event_sender);

    // First ctrl-c cancels the running download; files already copied stay
    let control = patcher.control().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            control.cancel();
        }
    });

    let colors = !cli.global.json && console::Term::stdout().features().colors_supported();
    let renderer = OutputRenderer::new(cli.global.json, colors);
    let mut event_handler = EventHandler::new(colors, cli.global.json);

    let result =
        execute_command_with_events(cli.command, &patcher, event_receiver, &mut event_handler)
            .await?;
    event_handler.finish();

    renderer.render_result(&result)?;

    if let CommandResult::Fetch {
        success: false,
        repaired,
        packages,
    } = result
    {
        return Err(CliError::Incomplete { packages, repaired });
    }

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    patcher: &MirrorPatcher,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, patcher));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(&event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    patcher: &MirrorPatcher,
) -> Result<CommandResult, CliError> {
    match command {
        Commands::Info { selection } => {
            let packages = resolve_packages(patcher, &selection.packages)?;
            pending_report(patcher, &packages, &selection.selector()).await
        }

        Commands::Fetch { selection, limits } => {
            let packages = resolve_packages(patcher, &selection.packages)?;
            let success = patcher
                .begin_combined_download(
                    &packages,
                    &selection.selector(),
                    limits.limits(),
                    DownloadCallbacks::default(),
                )
                .await;
            Ok(CommandResult::Fetch {
                success,
                repaired: false,
                packages: names(&packages),
            })
        }

        Commands::Repair { selection, limits } => {
            let packages = resolve_packages(patcher, &selection.packages)?;
            let success = patcher
                .repair(
                    &packages,
                    &selection.selector(),
                    limits.limits(),
                    DownloadCallbacks::default(),
                )
                .await?;
            Ok(CommandResult::Fetch {
                success,
                repaired: true,
                packages: names(&packages),
            })
        }

        Commands::Status { packages } => {
            let packages = resolve_packages(patcher, &packages)?;
            let manager = patcher.manager();
            let mut rows = Vec::with_capacity(packages.len());
            for package in &packages {
                let pending = patcher
                    .combined_download_info(std::slice::from_ref(package), &DownloadSelector::All)
                    .await;
                rows.push(StatusRow {
                    package: package.name().to_string(),
                    has_local_files: manager.has_local_files(package).await?,
                    local_bytes: manager.local_size(package).await?,
                    pending_count: pending.total_count,
                });
            }
            Ok(CommandResult::Status { packages: rows })
        }

        Commands::Clear { packages } => {
            let packages = resolve_packages(patcher, &packages)?;
            let mut freed = Vec::with_capacity(packages.len());
            for package in &packages {
                let bytes = patcher.manager().clear_local(package).await?;
                freed.push(PendingRow {
                    package: package.name().to_string(),
                    total_count: 0,
                    total_bytes: bytes,
                });
            }
            Ok(CommandResult::Clear { freed })
        }

        Commands::Version {
            raw,
            length,
            separator,
        } => {
            let patch_version = if raw || length.is_some() || separator.is_some() {
                let defaults = apx_config::VersionConfig::default();
                patcher.patch_version_with(
                    !raw,
                    length.unwrap_or(defaults.length),
                    separator.as_deref().unwrap_or(&defaults.separator),
                )?
            } else {
                patcher.patch_version()?
            };
            Ok(CommandResult::Version {
                patch_version,
                app_version: patcher.app_version(),
            })
        }
    }
}

/// Per-package and combined pending work
async fn pending_report(
    patcher: &MirrorPatcher,
    packages: &[PackageHandle],
    selector: &DownloadSelector,
) -> Result<CommandResult, CliError> {
    let mut rows = Vec::with_capacity(packages.len());
    for package in packages {
        let info = patcher
            .combined_download_info(std::slice::from_ref(package), selector)
            .await;
        rows.push(PendingRow {
            package: package.name().to_string(),
            total_count: info.total_count,
            total_bytes: info.total_bytes,
        });
    }
    let total = patcher.combined_download_info(packages, selector).await;
    Ok(CommandResult::Info {
        packages: rows,
        total_count: total.total_count,
        total_bytes: total.total_bytes,
    })
}

/// Resolve names against the catalog; no names means every package
fn resolve_packages(
    patcher: &MirrorPatcher,
    requested: &[String],
) -> Result<Vec<PackageHandle>, CliError> {
    if requested.is_empty() {
        return Ok(patcher.manager().packages());
    }

    let names: Vec<&str> = requested.iter().map(String::as_str).collect();
    let resolved = patcher.packages(&names);
    let unknown: Vec<String> = names
        .iter()
        .zip(&resolved)
        .filter(|(_, handle)| handle.is_none())
        .map(|(name, _)| (*name).to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(CliError::UnknownPackages(unknown));
    }
    Ok(resolved.into_iter().flatten().collect())
}

fn names(packages: &[PackageHandle]) -> Vec<String> {
    packages.iter().map(|p| p.name().to_string()).collect()
}

/// CLI flags take precedence over file and environment settings
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(mirror) = &global.mirror {
        config.paths.mirror = Some(mirror.clone());
    }
    if let Some(sandbox) = &global.sandbox {
        config.paths.sandbox = Some(sandbox.clone());
    }
    if let Some(catalog) = &global.catalog {
        config.paths.catalog = Some(catalog.clone());
    }
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("apx")
        .join("logs")
}

fn default_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        let log_dir = log_dir();
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }

        let log_file = log_dir.join(format!(
            "apx-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(default_filter("info,apx=debug,apx_patch=debug"))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // Keep stdout clean for the JSON result
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(default_filter("warn"))
            .init();
    }
}
