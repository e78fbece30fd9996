//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::Style;
use serde::Serialize;
use std::io;

/// Pending work for one package
#[derive(Debug, Clone, Serialize)]
pub struct PendingRow {
    pub package: String,
    pub total_count: u64,
    pub total_bytes: u64,
}

/// Local state of one package
#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub package: String,
    pub has_local_files: bool,
    pub local_bytes: u64,
    pub pending_count: u64,
}

/// Outcome of a command, rendered as a table or as JSON
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandResult {
    Info {
        packages: Vec<PendingRow>,
        total_count: u64,
        total_bytes: u64,
    },
    Fetch {
        success: bool,
        repaired: bool,
        packages: Vec<String>,
    },
    Status {
        packages: Vec<StatusRow>,
    },
    Clear {
        freed: Vec<PendingRow>,
    },
    Version {
        patch_version: String,
        app_version: Option<String>,
    },
}

impl CommandResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    colors: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors: bool) -> Self {
        Self {
            json_output,
            colors,
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = result.to_json().map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Info {
                packages,
                total_count,
                total_bytes,
            } => {
                self.render_pending(packages, *total_count, *total_bytes);
            }
            CommandResult::Fetch {
                success,
                repaired,
                packages,
            } => self.render_fetch(*success, *repaired, packages),
            CommandResult::Status { packages } => self.render_status(packages),
            CommandResult::Clear { freed } => self.render_clear(freed),
            CommandResult::Version {
                patch_version,
                app_version,
            } => {
                if patch_version.is_empty() {
                    println!("No patch applied");
                } else {
                    println!("{}", self.bold(patch_version));
                }
                if let Some(app) = app_version {
                    println!("App version: {app}");
                }
            }
        }
        Ok(())
    }

    fn render_pending(&self, packages: &[PendingRow], total_count: u64, total_bytes: u64) {
        if total_count == 0 {
            println!("Everything is up to date.");
            return;
        }

        let mut table = new_table(&["Package", "Files", "Size"]);
        for row in packages {
            table.add_row(vec![
                Cell::new(&row.package),
                Cell::new(row.total_count),
                Cell::new(format_bytes(row.total_bytes)),
            ]);
        }
        table.add_row(vec![
            Cell::new("total").add_attribute(Attribute::Bold),
            Cell::new(total_count).add_attribute(Attribute::Bold),
            Cell::new(format_bytes(total_bytes)).add_attribute(Attribute::Bold),
        ]);
        println!("{table}");
    }

    fn render_fetch(&self, success: bool, repaired: bool, packages: &[String]) {
        let verb = if repaired { "Repaired" } else { "Fetched" };
        if success {
            println!("{verb} {}", packages.join(", "));
        } else {
            println!("{} {}", self.red("Incomplete:"), packages.join(", "));
        }
    }

    fn render_status(&self, packages: &[StatusRow]) {
        let mut table = new_table(&["Package", "Local", "Size", "Missing"]);
        for row in packages {
            let state = if row.pending_count == 0 {
                Cell::new("complete").fg(Color::Green)
            } else if row.has_local_files {
                Cell::new("partial").fg(Color::Yellow)
            } else {
                Cell::new("absent").fg(Color::Red)
            };
            table.add_row(vec![
                Cell::new(&row.package),
                state,
                Cell::new(format_bytes(row.local_bytes)),
                Cell::new(row.pending_count),
            ]);
        }
        println!("{table}");
    }

    fn render_clear(&self, freed: &[PendingRow]) {
        let total: u64 = freed.iter().map(|row| row.total_bytes).sum();
        for row in freed {
            println!("Cleared {}: {}", row.package, format_bytes(row.total_bytes));
        }
        println!("{} {}", self.bold("Freed"), format_bytes(total));
    }

    fn bold(&self, text: &str) -> String {
        if self.colors {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn red(&self, text: &str) -> String {
        if self.colors {
            Style::new().red().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

/// Format a byte count in human-readable units
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
