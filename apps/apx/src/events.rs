//! Event handling and progress display

use crate::display::format_bytes;
use crate::logging::log_event_with_tracing;
use apx_events::{AppEvent, DownloadEvent, EventMessage, GeneralEvent, ProgressEvent};
use apx_types::SpeedProgress;
use console::{style, Term};

/// Renders download events on stderr while a command runs
pub struct EventHandler {
    term: Term,
    colors: bool,
    /// Suppress terminal output (JSON mode); events are still logged
    quiet: bool,
    progress_visible: bool,
}

impl EventHandler {
    pub fn new(colors: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors,
            quiet,
            progress_visible: false,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: &EventMessage) {
        log_event_with_tracing(message);
        if self.quiet {
            return;
        }

        match &message.event {
            AppEvent::Download(event) => self.handle_download(event),
            AppEvent::Progress(ProgressEvent::Updated { progress, .. }) => {
                self.show_progress(progress);
            }
            AppEvent::General(GeneralEvent::Warning { message, .. }) => {
                self.show_status(&format!("warning: {message}"));
            }
            AppEvent::General(GeneralEvent::Error { message, .. }) => {
                self.show_error(message);
            }
            AppEvent::General(_) => {}
        }
    }

    /// Clear any progress line before final output
    pub fn finish(&mut self) {
        if self.progress_visible {
            let _ = self.term.clear_line();
            self.progress_visible = false;
        }
    }

    fn handle_download(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::SessionStarted {
                packages,
                total_count,
                total_bytes,
                ..
            } => {
                self.show_status(&format!(
                    "Fetching {total_count} files ({}) from {packages} package(s)",
                    format_bytes(*total_bytes)
                ));
            }
            DownloadEvent::NothingToFetch { .. } => {
                self.show_status("Everything is up to date");
            }
            DownloadEvent::PackageStarted {
                package,
                total_count,
                total_bytes,
                ..
            } => {
                if *total_count > 0 {
                    self.show_status(&format!(
                        "{} {package}: {total_count} files ({})",
                        self.paint_cyan("==>"),
                        format_bytes(*total_bytes)
                    ));
                }
            }
            DownloadEvent::PackageCompleted { .. } => {}
            DownloadEvent::PackageFailed { package, status, .. } => {
                self.show_error(&format!("{package} ended as {status}"));
            }
            DownloadEvent::AssetFailed {
                package,
                asset,
                failure,
            } => {
                let mut line = format!("{package}/{asset}: {}", failure.message);
                if let Some(hint) = &failure.hint {
                    line.push_str(&format!(" ({hint})"));
                }
                self.show_error(&line);
            }
            DownloadEvent::SessionCompleted {
                success,
                current_count,
                current_bytes,
                duration,
                ..
            } => {
                let summary = format!(
                    "{current_count} files, {} in {:.1}s",
                    format_bytes(*current_bytes),
                    duration.as_secs_f64()
                );
                if *success {
                    self.show_status(&format!("{} {summary}", self.paint_green("done")));
                } else {
                    self.show_error(&format!("stopped after {summary}"));
                }
            }
        }
    }

    fn show_progress(&mut self, progress: &SpeedProgress) {
        let line = format!(
            "[{:>5.1}%] {}/{} files  {}/{}  {}",
            progress.percentage(),
            progress.current_count,
            progress.total_count,
            format_bytes(progress.current_bytes),
            format_bytes(progress.total_bytes),
            progress.format_speed()
        );
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&line);
        self.progress_visible = true;
    }

    fn show_status(&mut self, message: &str) {
        self.finish();
        let _ = self.term.write_line(message);
    }

    fn show_error(&mut self, message: &str) {
        let line = if self.colors {
            style(format!("error: {message}")).red().to_string()
        } else {
            format!("error: {message}")
        };
        self.show_status(&line);
    }

    fn paint_cyan(&self, text: &str) -> String {
        if self.colors {
            style(text).cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_green(&self, text: &str) -> String {
        if self.colors {
            style(text).green().to_string()
        } else {
            text.to_string()
        }
    }
}
